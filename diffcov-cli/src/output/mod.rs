//! Output formatting module for diffcov CLI
//!
//! Provides unified output formatting across commands with support for
//! table (human-readable), json (machine-readable) and tree (hierarchical
//! coverage) formats.
//!
//! Automatically detects TTY context to adjust colors and truncation behavior.

use clap::ValueEnum;
use serde::Serialize;
use std::io::IsTerminal;
use std::str::FromStr;

mod json;
mod table;
mod tree;

pub use self::json::JsonOutput;
pub use self::table::TableOutput;
pub use self::tree::{TreeNode, TreeOutput};

/// Output format for CLI results
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format (default)
    #[default]
    Table,
    /// JSON format for machine consumption
    Json,
    /// Tree format for hierarchical data
    Tree,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "tree" => Ok(OutputFormat::Tree),
            _ => Err(format!("Unknown output format: '{}'", s)),
        }
    }
}

/// How a report is rendered.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub colors: bool,
    /// Wrap tables and clip source lines to the terminal width.
    pub truncate: bool,
    /// Fixed width; the terminal width is used when unset.
    pub width: Option<usize>,
    /// Borderless tables, single-line JSON.
    pub compact: bool,
}

impl OutputConfig {
    /// Settings for stdout: colors and truncation only on a TTY, unless
    /// `color_override` forces colors either way.
    pub fn detect(format: OutputFormat, color_override: Option<bool>, compact: bool) -> Self {
        let is_tty = std::io::stdout().is_terminal();
        Self {
            format,
            colors: color_override.unwrap_or(is_tty),
            truncate: is_tty,
            width: None,
            compact,
        }
    }

    /// No colors, no truncation.
    pub fn plain(format: OutputFormat) -> Self {
        Self {
            format,
            colors: false,
            truncate: false,
            width: None,
            compact: false,
        }
    }

    pub fn effective_width(&self) -> usize {
        self.width.unwrap_or_else(|| {
            terminal_size::terminal_size()
                .map(|(w, _)| w.0 as usize)
                .unwrap_or(80)
        })
    }

    pub fn use_colors(&self) -> bool {
        self.colors
    }

    pub fn should_truncate(&self) -> bool {
        self.truncate
    }
}

/// A result that can be rendered in every [`OutputFormat`].
pub trait Outputter: Serialize + Sized {
    fn to_table(&self, config: &OutputConfig) -> String;

    fn to_json(&self, config: &OutputConfig) -> String {
        JsonOutput::format(self, config)
    }

    /// Falls back to the table rendering.
    fn to_tree(&self, config: &OutputConfig) -> String {
        self.to_table(config)
    }

    fn render(&self, config: &OutputConfig) -> String {
        match config.format {
            OutputFormat::Table => self.to_table(config),
            OutputFormat::Json => self.to_json(config),
            OutputFormat::Tree => self.to_tree(config),
        }
    }

    /// Render and write to stdout.
    fn print(&self, config: &OutputConfig) {
        println!("{}", self.render(config));
    }
}

/// Types whose table rendering needs no runtime configuration.
pub trait TableDisplay: Serialize {
    /// Convert to table format string
    fn to_table(&self) -> String;
}

impl<T: TableDisplay + Serialize> Outputter for T {
    fn to_table(&self, _config: &OutputConfig) -> String {
        TableDisplay::to_table(self)
    }
}

/// Truncate a string to a maximum width with ellipsis
pub fn truncate(s: &str, max_width: usize) -> String {
    if s.chars().count() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let truncated: String = s.chars().take(max_width - 3).collect();
        format!("{}...", truncated)
    }
}

/// `12.3%`, or `n/a` when the percentage is undefined.
pub fn format_percent(percent: Option<f64>) -> String {
    match percent {
        Some(p) => format!("{:.1}%", p),
        None => "n/a".to_string(),
    }
}
