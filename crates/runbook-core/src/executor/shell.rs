//! Shell command-line composition
//!
//! The configured command is trusted shell syntax and is passed through
//! verbatim. Only the caller's extra arguments are quoted, one token each.

use std::borrow::Cow;

/// Target shell for quoting and invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ShellDialect {
    /// `/bin/sh -c`
    Posix,
    /// `cmd.exe /C`
    Cmd,
}

impl ShellDialect {
    /// Dialect of the platform this binary was built for
    pub const fn native() -> Self {
        if cfg!(windows) {
            Self::Cmd
        } else {
            Self::Posix
        }
    }

    /// Quote one argument so the shell sees it as a single literal token
    pub fn quote(self, arg: &str) -> Cow<'_, str> {
        match self {
            Self::Posix => shell_words::quote(arg),
            Self::Cmd => quote_cmd(arg),
        }
    }

    /// Program and arguments that run `command_line` under this shell
    pub fn invocation(self, command_line: &str) -> (&'static str, Vec<String>) {
        match self {
            Self::Posix => ("/bin/sh", vec!["-c".to_string(), command_line.to_string()]),
            Self::Cmd => ("cmd.exe", vec!["/C".to_string(), command_line.to_string()]),
        }
    }
}

/// `<base> <quoted args...>`, or `base` unchanged when there are no args
pub fn build_command_line(base: &str, args: &[String], dialect: ShellDialect) -> String {
    if args.is_empty() {
        return base.to_string();
    }
    let quoted: Vec<Cow<'_, str>> = args.iter().map(|arg| dialect.quote(arg)).collect();
    format!("{base} {}", quoted.join(" "))
}

const CMD_SPECIAL: &[char] = &['&', '|', '<', '>', '^', '(', ')', '%', '!', '"', ','];

fn quote_cmd(arg: &str) -> Cow<'_, str> {
    let needs_quoting =
        arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || CMD_SPECIAL.contains(&c));
    if !needs_quoting {
        return Cow::Borrowed(arg);
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0usize;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                // Backslashes before a quote are doubled, then the quote is escaped.
                quoted.extend(std::iter::repeat('\\').take(backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.extend(std::iter::repeat('\\').take(backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }
    quoted.extend(std::iter::repeat('\\').take(backslashes * 2));
    quoted.push('"');
    Cow::Owned(quoted)
}
