//! Configuration loading from `.diffcovrc.toml`.
//!
//! The file lives in the repository root and is optional; every setting has
//! a default and command-line flags override it.
//!
//! # Example Configuration
//!
//! ```toml
//! [diff]
//! exclude = ["\\.pb\\.go$", "^example.com/m/mocks/"]
//! compare_branch = "origin/main"
//! test_file_suffix = "_test.go"
//! module_path = "example.com/m"
//!
//! [output]
//! format = "table"
//! color = true
//!
//! [check]
//! coverage_baseline = 80.0
//! ```

use serde::Deserialize;
use std::path::Path;

/// Name of the configuration file in the repository root.
pub const CONFIG_FILE: &str = ".diffcovrc.toml";

/// Branch compared against when neither flag nor config names one.
pub const DEFAULT_COMPARE_BRANCH: &str = "origin/master";

/// Root configuration structure loaded from `.diffcovrc.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct DiffcovConfig {
    /// Inputs of the diff coverage run.
    #[serde(default)]
    pub diff: DiffSettings,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,

    /// Pass/fail policy.
    #[serde(default)]
    pub check: CheckSettings,
}

/// `[diff]` section.
#[derive(Debug, Deserialize, Default)]
pub struct DiffSettings {
    /// Regular expressions matched against cover-profile file names.
    ///
    /// Matching files are left out of the report. Patterns given with
    /// `--exclude` are appended to these.
    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub compare_branch: Option<String>,

    /// File-name suffix marking a test file, compared case-insensitively.
    #[serde(default)]
    pub test_file_suffix: Option<String>,

    /// Root of the coverage tree; defaults to the `module` of `go.mod`.
    #[serde(default)]
    pub module_path: Option<String>,
}

/// `[output]` section.
///
/// Distinct from the runtime `OutputConfig` in the output module, which
/// handles actual rendering.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Valid values: `table`, `json`, `tree`
    #[serde(default)]
    pub format: Option<String>,

    /// Defaults to `true` when stdout is a TTY.
    #[serde(default)]
    pub color: Option<bool>,
}

/// `[check]` section.
#[derive(Debug, Deserialize, Default)]
pub struct CheckSettings {
    /// Minimum coverage percent; a lower result fails the command.
    #[serde(default)]
    pub coverage_baseline: Option<f64>,
}

impl DiffcovConfig {
    /// Load configuration from `.diffcovrc.toml` in the given directory.
    ///
    /// Missing file means defaults. Read and parse errors are logged as
    /// warnings and also fall back to defaults.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE, e);
                }
            }
        }
        Self::default()
    }

    /// Config patterns followed by `extra`.
    pub fn excludes(&self, extra: &[String]) -> Vec<String> {
        let mut patterns = self.diff.exclude.clone();
        patterns.extend(extra.iter().cloned());
        patterns
    }

    pub fn compare_branch(&self) -> &str {
        self.diff
            .compare_branch
            .as_deref()
            .unwrap_or(DEFAULT_COMPARE_BRANCH)
    }

    pub fn test_file_suffix(&self) -> Option<&str> {
        self.diff.test_file_suffix.as_deref()
    }

    pub fn module_path(&self) -> Option<&str> {
        self.diff.module_path.as_deref()
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Returns the configured value, or `None` to use auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    pub fn coverage_baseline(&self) -> Option<f64> {
        self.check.coverage_baseline
    }
}
