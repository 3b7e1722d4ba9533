//! `diffcov completions <shell>` - print a completion script, or with
//! `--instructions` explain where to put it.

use std::io::Write;

use clap::Command;
use colored::Colorize;
use serde::Serialize;

use crate::output::{OutputConfig, OutputFormat, Outputter, TableDisplay};

const BIN_NAME: &str = "diffcov";

/// Shells a completion script can be generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

impl Shell {
    fn name(self) -> &'static str {
        match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
            Shell::PowerShell => "powershell",
        }
    }

    /// Where the generated script is expected to live.
    fn install_hint(self) -> (&'static str, &'static str) {
        match self {
            Shell::Bash => (
                "~/.local/share/bash-completion/completions/diffcov",
                "eval \"$(diffcov completions bash)\"  # or in ~/.bashrc",
            ),
            Shell::Zsh => (
                "~/.zfunc/_diffcov",
                "fpath=(~/.zfunc $fpath)  # in ~/.zshrc, before compinit",
            ),
            Shell::Fish => ("~/.config/fish/completions/diffcov.fish", ""),
            Shell::PowerShell => (
                "",
                "Invoke-Expression (& diffcov completions powershell | Out-String)  # in $PROFILE",
            ),
        }
    }
}

impl std::fmt::Display for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Shell> for clap_complete::Shell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
        }
    }
}

/// Installation steps for one shell
#[derive(Debug, Serialize)]
pub struct CompletionInstructions {
    pub shell: String,
    pub instructions: Vec<String>,
}

impl CompletionInstructions {
    fn for_shell(shell: Shell) -> Self {
        let (target, setup) = shell.install_hint();
        let mut instructions = Vec::new();
        if !target.is_empty() {
            instructions.push(format!("diffcov completions {} > {}", shell, target));
        }
        if !setup.is_empty() {
            instructions.push(setup.to_string());
        }
        Self {
            shell: shell.to_string(),
            instructions,
        }
    }
}

impl TableDisplay for CompletionInstructions {
    fn to_table(&self) -> String {
        let mut out = format!(
            "{} completions for {}\n\n{}\n",
            BIN_NAME.cyan().bold(),
            self.shell.yellow(),
            "Installation:".cyan().bold()
        );
        for line in &self.instructions {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Write the completion script for `shell` to `out`.
pub fn write_completions(shell: Shell, cmd: &mut Command, out: &mut dyn Write) {
    clap_complete::generate(clap_complete::Shell::from(shell), cmd, BIN_NAME, out);
}

/// Print installation instructions for `shell`.
pub fn run(shell: Shell, format: OutputFormat, compact: bool) {
    CompletionInstructions::for_shell(shell).print(&OutputConfig::detect(format, None, compact));
}
