//! Loading-focused tests for command tables
//!
//! Tests for single files, environment overlays, module directories and parse failures.

#[cfg(test)]
mod loading_tests {
    use std::path::Path;

    use proptest::prelude::*;

    use crate::config::{
        collect_module_files, overlay_path, CommandSpec, CommandTable, Loader, MergePolicy,
        Severity,
    };
    use crate::error::ConfigError;
    use crate::{Error, Result};

    fn write(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(Error::from)
    }

    #[test]
    fn test_env_overlay_replaces_command() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(
            &dir.path().join("demo.yaml"),
            "commands:\n  system:\n    description: System tools\n    command: echo base\n",
        )?;
        write(
            &dir.path().join("demo.dev.yaml"),
            "commands:\n  system:\n    command: echo override\n",
        )?;

        let loaded = Loader::new(dir.path()).load("demo.yaml", Some("dev"))?;
        let system = loaded.table.get("system");
        assert_eq!(system.map(|s| s.command.as_str()), Some("echo override"));
        assert_eq!(
            system.map(|s| s.description.as_str()),
            Some("System tools"),
            "overlay without a description must keep the base description"
        );
        assert_eq!(
            system.map(|s| s.origin.module.as_str()),
            Some("@env:dev")
        );
        assert!(loaded
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Info && d.message.contains("demo.dev.yaml")));
        Ok(())
    }

    #[test]
    fn test_missing_overlay_is_not_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(
            &dir.path().join("demo.yaml"),
            "commands:\n  system:\n    command: echo base\n",
        )?;

        let loaded = Loader::new(dir.path()).load("demo.yaml", Some("prod"))?;
        assert_eq!(
            loaded.table.get("system").map(|s| s.command.as_str()),
            Some("echo base")
        );
        assert!(loaded.diagnostics.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_config_is_not_found() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let result = Loader::new(dir.path()).load("absent.yaml", None);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::NotFound { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(
            &dir.path().join("bad.yaml"),
            "commands:\n  system:\n    command: [unclosed\n",
        )?;

        let result = Loader::new(dir.path()).load("bad.yaml", None);
        match result {
            Err(Error::Config(ConfigError::Parse { path, .. })) => {
                assert!(path.ends_with("bad.yaml"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_empty_file_loads_empty_table() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(&dir.path().join("empty.yaml"), "")?;
        let loaded = Loader::new(dir.path()).load("empty.yaml", None)?;
        assert!(loaded.table.is_empty());
        Ok(())
    }

    #[test]
    fn test_module_directory_merges_new_commands() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(
            &dir.path().join("demo.yaml"),
            "commands:\n  system:\n    command: echo base\n",
        )?;
        write(
            &dir.path().join("deploy.conf/001_deploy.yaml"),
            "commands:\n  deploy:\n    description: Deploy\n    command: echo deploy\n",
        )?;

        let loader = Loader::new(dir.path());
        let base = loader.load("demo.yaml", None)?;
        assert!(base.table.get("deploy").is_none());

        let modules = loader.load("deploy.conf", None)?;
        let deploy = modules.table.get("deploy");
        assert_eq!(deploy.map(|s| s.command.as_str()), Some("echo deploy"));
        assert_eq!(
            deploy.map(|s| s.origin.module.as_str()),
            Some("deploy.conf")
        );
        assert!(modules
            .diagnostics
            .iter()
            .all(|d| d.severity == Severity::Info));
        Ok(())
    }

    #[test]
    fn test_module_override_produces_conflict() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(
            &dir.path().join("deploy.conf/100_base.yaml"),
            "commands:\n  deploy:\n    command: echo base\n",
        )?;
        write(
            &dir.path().join("deploy.conf/200_override.yaml"),
            "commands:\n  deploy:\n    command: echo override\n",
        )?;

        let result = Loader::new(dir.path()).load("deploy.conf", None);
        match result {
            Err(Error::Config(ConfigError::Conflict {
                name,
                existing,
                incoming,
            })) => {
                assert_eq!(name, "deploy");
                assert!(existing.file.ends_with("100_base.yaml"));
                assert!(incoming.file.ends_with("200_override.yaml"));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_permissive_module_policy_warns_and_applies() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(
            &dir.path().join("mods/a.yaml"),
            "commands:\n  deploy:\n    command: echo base\n",
        )?;
        write(
            &dir.path().join("mods/b.yaml"),
            "commands:\n  deploy:\n    command: echo override\n",
        )?;

        let loaded = Loader::new(dir.path())
            .with_module_policy(MergePolicy::Permissive)
            .load("mods", None)?;
        assert_eq!(
            loaded.table.get("deploy").map(|s| s.command.as_str()),
            Some("echo override")
        );
        assert!(loaded
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning));
        Ok(())
    }

    #[test]
    fn test_module_directory_skips_scripts_subtree() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("mods");
        write(&root.join("b.yml"), "commands: {}\n")?;
        write(&root.join("nested/a.YAML"), "commands: {}\n")?;
        write(&root.join("Scripts/ignored.yaml"), "not: [valid\n")?;
        write(&root.join("nested/scripts/also_ignored.yaml"), "x")?;
        write(&root.join("notes.txt"), "ignored")?;

        let files = collect_module_files(&root)?;
        assert_eq!(files, vec![root.join("b.yml"), root.join("nested/a.YAML")]);
        Ok(())
    }

    #[test]
    fn test_empty_module_directory_is_not_found() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("mods/scripts"))?;
        let result = Loader::new(dir.path()).load("mods", None);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::NotFound { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_loaded_table_is_validated() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(
            &dir.path().join("demo.yaml"),
            "commands:\n  broken:\n    description: nothing to run\n",
        )?;
        let result = Loader::new(dir.path()).load("demo.yaml", None);
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::Validation { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_overlay_path_naming() {
        assert_eq!(
            overlay_path(Path::new("/cfg/demo.yaml"), "dev"),
            Path::new("/cfg/demo.dev.yaml")
        );
        assert_eq!(
            overlay_path(Path::new("/cfg/commands"), "ci"),
            Path::new("/cfg/commands.ci")
        );
    }

    #[test]
    fn test_absolute_path_ignores_base_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("demo.yaml");
        write(&path, "commands:\n  a:\n    command: echo a\n")?;
        let loaded = Loader::new("/nonexistent-base").load(&path, None)?;
        assert_eq!(loaded.table.len(), 1);
        Ok(())
    }

    /// YAML for module `index`; every module redefines `shared` with its own alias and description
    fn module_yaml(index: usize, description: &str) -> String {
        format!(
            "commands:\n  shared:\n    alias: a{index}\n    description: {description}\n    \
             command: echo shared\n  own{index}:\n    command: echo {index}\n"
        )
    }

    /// Recreate `<root>/mods` writing the modules in `order`, then load it
    fn load_created_in_order(
        root: &Path,
        descriptions: &[String],
        order: &[usize],
    ) -> Result<CommandTable> {
        let mods = root.join("mods");
        if mods.exists() {
            std::fs::remove_dir_all(&mods)?;
        }
        for &index in order {
            write(
                &mods.join(format!("{index:03}_module.yaml")),
                &module_yaml(index, &descriptions[index]),
            )?;
        }
        Loader::new(root).load("mods", None).map(|loaded| loaded.table)
    }

    fn descriptions_and_order() -> impl Strategy<Value = (Vec<String>, Vec<usize>)> {
        prop::collection::vec("Desc [a-z]{1,8}", 2..5).prop_flat_map(|descriptions| {
            let indices: Vec<usize> = (0..descriptions.len()).collect();
            (Just(descriptions), Just(indices).prop_shuffle())
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Property: a module directory loads to the same table whatever order its files
        /// were created in, and the last file by path wins alias and description
        #[test]
        fn prop_module_load_ignores_creation_order(
            (descriptions, order) in descriptions_and_order(),
        ) {
            let dir = tempfile::tempdir().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let sorted: Vec<usize> = (0..descriptions.len()).collect();

            let in_sorted_order = load_created_in_order(dir.path(), &descriptions, &sorted)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let in_shuffled_order = load_created_in_order(dir.path(), &descriptions, &order)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(&in_sorted_order, &in_shuffled_order);

            let last = descriptions.len() - 1;
            let shared = in_shuffled_order.get("shared");
            let expected_alias = format!("a{last}");
            prop_assert_eq!(shared.and_then(CommandSpec::alias), Some(expected_alias.as_str()));
            prop_assert_eq!(
                shared.map(|s| s.description.as_str()),
                Some(descriptions[last].as_str())
            );
            prop_assert_eq!(in_shuffled_order.len(), descriptions.len() + 1);
        }
    }
}
