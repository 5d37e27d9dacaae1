//! Validation-focused tests for command tables

#[cfg(test)]
mod validation_tests {
    use proptest::prelude::*;

    use crate::config::validate::validate_command_spec;
    use crate::config::CommandTable;
    use crate::error::ConfigError;
    use crate::Error;

    fn parse(yaml: &str) -> CommandTable {
        serde_yaml::from_str(yaml).unwrap_or_default()
    }

    fn validation_target(result: crate::Result<()>) -> Option<String> {
        match result {
            Err(Error::Config(ConfigError::Validation { name, .. })) => Some(name),
            _ => None,
        }
    }

    #[test]
    fn test_valid_table_passes() {
        let table = parse(
            r"
commands:
  system:
    alias: sys
    description: System tools
    command: echo system
    actions:
      update:
        alias: up
        description: Update the system
        command: echo update
  codex:
    description: Talk to codex
    command: echo codex
",
        );
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_missing_command_and_actions_fails() {
        let table = parse("commands:\n  broken:\n    description: nothing\n");
        assert_eq!(
            validation_target(table.validate()),
            Some("broken".to_string())
        );
    }

    #[test]
    fn test_actions_without_default_command_pass() {
        let table = parse("commands:\n  deploy:\n    actions:\n      run:\n        command: echo run\n");
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_empty_action_command_fails() {
        let table = parse("commands:\n  deploy:\n    actions:\n      run:\n        description: x\n");
        assert_eq!(
            validation_target(table.validate()),
            Some("deploy.run".to_string())
        );
    }

    #[test]
    fn test_command_alias_conflict_fails() {
        let table = parse(
            "commands:\n  first:\n    alias: dup\n    command: echo foo\n  second:\n    alias: dup\n    command: echo bar\n",
        );
        assert_eq!(
            validation_target(table.validate()),
            Some("second".to_string())
        );
    }

    #[test]
    fn test_alias_shadowing_another_command_fails() {
        let table = parse(
            "commands:\n  first:\n    alias: second\n    command: echo foo\n  second:\n    command: echo bar\n",
        );
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_action_alias_conflict_fails() {
        let table = parse(
            "commands:\n  demo:\n    command: echo ok\n    actions:\n      run:\n        alias: dup\n        command: echo run\n      exec:\n        alias: dup\n        command: echo exec\n",
        );
        let spec = table.get("demo").cloned().unwrap_or_default();
        assert!(validate_command_spec("demo", &spec).is_err());
    }

    #[test]
    fn test_action_alias_reused_across_commands_passes() {
        let table = parse(
            "commands:\n  a:\n    actions:\n      run:\n        alias: r\n        command: echo a\n  b:\n    actions:\n      run:\n        alias: r\n        command: echo b\n",
        );
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_whitespace_in_names_fails() {
        let table = parse("commands:\n  'two words':\n    command: echo x\n");
        assert!(table.validate().is_err());

        let table = parse(
            "commands:\n  ok:\n    actions:\n      'bad action':\n        command: echo x\n",
        );
        assert_eq!(
            validation_target(table.validate()),
            Some("ok.bad action".to_string())
        );

        let table = parse("commands:\n  ok:\n    alias: 'a b'\n    command: echo x\n");
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_empty_command_name_fails() {
        let table = parse("commands:\n  '':\n    command: echo x\n");
        assert!(table.validate().is_err());
    }

    proptest! {
        /// Property: any name containing whitespace is rejected
        #[test]
        fn prop_names_with_whitespace_rejected(left in "[a-z]{1,6}", ws in "[ \t]{1,2}", right in "[a-z]{1,6}") {
            let name = format!("{left}{ws}{right}");
            let mut table = CommandTable::new();
            table.insert(name, crate::config::CommandSpec {
                command: "echo x".to_string(),
                ..crate::config::CommandSpec::default()
            });
            prop_assert!(table.validate().is_err());
        }

        /// Property: a command with at least one valid action passes regardless of its default
        #[test]
        fn prop_action_makes_command_invocable(default in "( |echo [a-z]{1,4})?") {
            let mut spec = crate::config::CommandSpec {
                command: default,
                ..crate::config::CommandSpec::default()
            };
            spec.actions.insert("run".to_string(), crate::config::ActionSpec {
                command: "echo run".to_string(),
                ..crate::config::ActionSpec::default()
            });
            prop_assert!(validate_command_spec("cmd", &spec).is_ok());
        }
    }
}
