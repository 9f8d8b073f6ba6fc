//! `hitscheck completions`: shell completion scripts.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Args;
use clap_complete::{Shell, generate};

/// Arguments for `hitscheck completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Print the completion script for `shell` to stdout.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn run_completions(shell: Shell, command: &mut clap::Command) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_completions(shell, command, &mut out)
        .with_context(|| format!("failed to write {shell} completions"))
}

/// Render completions for `command` under its own name.
fn write_completions(
    shell: Shell,
    command: &mut clap::Command,
    out: &mut dyn Write,
) -> io::Result<()> {
    let bin_name = command.get_name().to_string();
    generate(shell, command, bin_name, out);
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, Command};

    fn sample() -> Command {
        Command::new("hitscheck").subcommand(
            Command::new("run").arg(Arg::new("max-iter").long("max-iter")),
        )
    }

    #[test]
    fn script_registers_binary_name_and_flags() {
        let mut buf: Vec<u8> = Vec::new();
        write_completions(Shell::Bash, &mut sample(), &mut buf).expect("write to vec");
        let script = String::from_utf8(buf).expect("utf8");
        assert!(script.contains("hitscheck"));
        assert!(script.contains("--max-iter"));
    }

    #[test]
    fn every_shell_renders() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell, Shell::Elvish] {
            let mut buf: Vec<u8> = Vec::new();
            write_completions(shell, &mut sample(), &mut buf).expect("write to vec");
            assert!(!buf.is_empty(), "{shell} produced nothing");
        }
    }
}
