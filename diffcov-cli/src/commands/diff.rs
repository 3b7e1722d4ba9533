//! Diff command - coverage of the lines changed since a branch
//!
//! Reads a Go cover profile, obtains the changes (from `git diff` or a patch
//! file), runs the diff coverage engine and renders the report.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use clap::Args;
use colored::Colorize;
use diffcov_core::{
    parse_patch, parse_profiles, AnnotationParser, CommentAnnotationParser, DiffCoverage,
    DiffCoverageConfig, DiffCoverageReport, NoAnnotations, DEFAULT_TEST_FILE_SUFFIX,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::config::DiffcovConfig;
use crate::output::{
    format_percent, truncate, OutputConfig, OutputFormat, Outputter, TableOutput,
    TreeNode, TreeOutput,
};

static GO_MODULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*module\s+("[^"]+"|\S+)"#).unwrap());

/// Arguments of `diffcov diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Repository root (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Go cover profile (`go test -coverprofile`)
    #[arg(short = 'c', long)]
    pub cover_profile: PathBuf,

    /// Branch or commit to compare HEAD against
    #[arg(short = 'b', long)]
    pub compare_branch: Option<String>,

    /// Read the unified diff from this file instead of running git
    #[arg(long)]
    pub diff_file: Option<PathBuf>,

    /// Regular expression of profile file names to leave out (repeatable)
    #[arg(short = 'e', long)]
    pub exclude: Vec<String>,

    /// Module path shown as the root of the coverage tree
    #[arg(long)]
    pub module_path: Option<String>,

    /// File-name suffix marking a test file
    #[arg(long)]
    pub test_file_suffix: Option<String>,

    /// Fail when coverage is below this percent
    #[arg(long)]
    pub coverage_baseline: Option<f64>,

    /// Do not read ignore annotations from changed files
    #[arg(long)]
    pub no_annotations: bool,
}

/// Check failures reported after the report has been printed.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("diff coverage {coverage:.1}% is below baseline {baseline:.1}%")]
    BelowBaseline { coverage: f64, baseline: f64 },
}

/// Rendered result of `diffcov diff`.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    pub module_path: String,
    #[serde(flatten)]
    pub report: DiffCoverageReport,
    pub coverage_baseline: Option<f64>,
}

impl DiffReport {
    fn summary_table(&self, config: &OutputConfig) -> String {
        let stats = &self.report.statistics;
        let mut pairs = vec![
            ("Compared branch", stats.compared_branch.clone()),
            ("Module", self.module_path.clone()),
            ("Files", stats.coverage_profiles.len().to_string()),
            ("Total lines", stats.total_lines.to_string()),
            ("Ignored lines", stats.ignored_lines.to_string()),
            ("Effective lines", stats.effective_lines.to_string()),
            ("Covered lines", stats.covered_lines.to_string()),
            ("Violation lines", stats.violation_lines.to_string()),
            ("Coverage", format_percent(stats.coverage_percent)),
        ];
        if let Some(baseline) = self.coverage_baseline {
            pairs.push(("Baseline", format_percent(Some(baseline))));
        }
        TableOutput::format_key_value(&pairs, config)
    }

    fn files_table(&self, config: &OutputConfig) -> String {
        let rows: Vec<Vec<String>> = self
            .report
            .statistics
            .coverage_profiles
            .iter()
            .map(|p| {
                vec![
                    p.file_name.clone(),
                    p.effective_lines.to_string(),
                    p.covered_lines.to_string(),
                    p.ignored_lines.to_string(),
                    format_percent(Some(p.coverage_percent())),
                ]
            })
            .collect();
        TableOutput::from_rows(
            &["File", "Effective", "Covered", "Ignored", "Coverage"],
            &rows,
            &[1, 2, 3, 4],
            config,
        )
    }

    /// Every changed section holding violations, with its source text.
    fn violations(&self, config: &OutputConfig) -> String {
        let use_colors = config.use_colors();
        let max_text = config.effective_width().saturating_sub(10);
        let mut output = String::new();

        for profile in &self.report.statistics.coverage_profiles {
            if profile.violation_lines.is_empty() {
                continue;
            }
            let header = format!("{} ({} lines)", profile.file_name, profile.violation_lines.len());
            if use_colors {
                output.push_str(&format!("\n{}\n", header.yellow().bold()));
            } else {
                output.push_str(&format!("\n{}\n", header));
            }

            for section in &profile.violation_sections {
                for (offset, text) in section.contents.iter().enumerate() {
                    let line = section.start_line + offset as u32;
                    let text = if config.should_truncate() {
                        truncate(text, max_text)
                    } else {
                        text.clone()
                    };
                    let violated = section.violation_lines.contains(&line);
                    let rendered = match (violated, use_colors) {
                        (true, true) => format!("{:>6} ! {}", line, text).red().to_string(),
                        (true, false) => format!("{:>6} ! {}", line, text),
                        (false, true) => format!("{:>6} | {}", line, text).dimmed().to_string(),
                        (false, false) => format!("{:>6} | {}", line, text),
                    };
                    output.push_str(&rendered);
                    output.push('\n');
                }
                if section.contents.is_empty() {
                    let lines: Vec<String> =
                        section.violation_lines.iter().map(u32::to_string).collect();
                    output.push_str(&format!("  lines {}\n", lines.join(", ")));
                }
            }
        }
        output
    }
}

impl Outputter for DiffReport {
    fn to_table(&self, config: &OutputConfig) -> String {
        let title = if config.use_colors() {
            "DIFF COVERAGE".cyan().bold().to_string()
        } else {
            "DIFF COVERAGE".to_string()
        };
        let mut output = format!("{}\n{}\n", title, self.summary_table(config));
        if !self.report.statistics.coverage_profiles.is_empty() {
            output.push_str(&format!("\n{}\n", self.files_table(config)));
            output.push_str(&self.violations(config));
        }
        output.trim_end().to_string()
    }

    fn to_tree(&self, config: &OutputConfig) -> String {
        let nodes: Vec<TreeNode> = self
            .report
            .nodes
            .iter()
            .map(|n| TreeNode {
                label: if n.depth == 0 { n.path.clone() } else { n.name.clone() },
                detail: format!(
                    "{} ({}/{}, {} violations)",
                    format_percent(n.totals.coverage_percent()),
                    n.totals.covered_lines,
                    n.totals.effective_lines,
                    n.totals.violation_lines
                ),
                depth: n.depth,
                is_branch: !n.is_leaf,
            })
            .collect();
        TreeOutput::from_nodes(&nodes, config)
    }
}

/// Run the diff command
pub fn run(args: &DiffArgs, format: Option<OutputFormat>, compact: bool) -> anyhow::Result<()> {
    let config = DiffcovConfig::load(&args.path);

    // CLI flag > config default > Table
    let format = format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default()
    });
    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let profile_text = fs::read_to_string(&args.cover_profile)
        .with_context(|| format!("Failed to read cover profile {}", args.cover_profile.display()))?;
    let profiles = parse_profiles(&profile_text).context("Failed to parse cover profile")?;

    let compared_branch = args
        .compare_branch
        .clone()
        .unwrap_or_else(|| config.compare_branch().to_string());

    let patch = match &args.diff_file {
        Some(file) => fs::read_to_string(file)
            .with_context(|| format!("Failed to read diff file {}", file.display()))?,
        None => git_diff(&args.path, &compared_branch)?,
    };
    let changes = parse_patch(&patch).context("Failed to parse diff")?;
    tracing::debug!(profiles = profiles.len(), changes = changes.len(), "inputs loaded");

    let module_path = resolve_module_path(args.module_path.as_deref(), &config, &args.path);
    let engine_config = DiffCoverageConfig {
        excludes: config.excludes(&args.exclude),
        compared_branch,
        repository_path: args.path.clone(),
        module_path: module_path.clone(),
        test_file_suffix: args
            .test_file_suffix
            .clone()
            .or_else(|| config.test_file_suffix().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_TEST_FILE_SUFFIX.to_string()),
    };

    let report = if args.no_annotations {
        generate(profiles, changes, engine_config, NoAnnotations)?
    } else {
        generate(profiles, changes, engine_config, CommentAnnotationParser)?
    };

    let coverage_baseline = args.coverage_baseline.or(config.coverage_baseline());
    let coverage = report.statistics.coverage_percent;
    let result = DiffReport {
        module_path,
        report,
        coverage_baseline,
    };

    result.print(&OutputConfig::detect(format, config.use_color(), compact));

    check_baseline(coverage, coverage_baseline)?;
    Ok(())
}

fn generate<P: AnnotationParser>(
    profiles: Vec<diffcov_core::CoverProfile>,
    changes: Vec<diffcov_core::Change>,
    config: DiffCoverageConfig,
    parser: P,
) -> anyhow::Result<DiffCoverageReport> {
    let report = DiffCoverage::new(profiles, changes, config, parser)?.generate()?;
    Ok(report)
}

/// Fails when both values are known and coverage is below the baseline.
fn check_baseline(coverage: Option<f64>, baseline: Option<f64>) -> Result<(), CheckError> {
    match (coverage, baseline) {
        (Some(coverage), Some(baseline)) if coverage < baseline => {
            Err(CheckError::BelowBaseline { coverage, baseline })
        }
        _ => Ok(()),
    }
}

/// Unified diff of `HEAD` against `branch`, without context lines.
fn git_diff(repo: &Path, branch: &str) -> anyhow::Result<String> {
    let output = Command::new("git")
        .current_dir(repo)
        .args([
            "diff",
            "--no-color",
            "--no-ext-diff",
            "-M",
            "--unified=0",
            branch,
            "HEAD",
        ])
        .output()
        .context("Failed to run git")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git diff failed: {}", stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Flag, then config, then the `module` directive of `go.mod`, then the
/// repository directory name.
fn resolve_module_path(flag: Option<&str>, config: &DiffcovConfig, repo: &Path) -> String {
    if let Some(path) = flag.or(config.module_path()) {
        return path.to_string();
    }
    if let Some(module) = read_go_module(repo) {
        return module;
    }
    repo.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_default()
}

fn read_go_module(repo: &Path) -> Option<String> {
    let content = fs::read_to_string(repo.join("go.mod")).ok()?;
    let caps = GO_MODULE.captures(&content)?;
    Some(caps[1].trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_baseline() {
        assert!(check_baseline(Some(50.0), Some(80.0)).is_err());
        assert!(check_baseline(Some(80.0), Some(80.0)).is_ok());
        assert!(check_baseline(None, Some(80.0)).is_ok());
        assert!(check_baseline(Some(10.0), None).is_ok());
    }

    #[test]
    fn test_baseline_message() {
        let err = check_baseline(Some(50.0), Some(80.0)).unwrap_err();
        assert_eq!(err.to_string(), "diff coverage 50.0% is below baseline 80.0%");
    }

    #[test]
    fn test_resolve_module_path_precedence() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("go.mod"), "// comment\nmodule example.com/m\n\ngo 1.22\n").unwrap();
        let config: DiffcovConfig = toml::from_str("[diff]\nmodule_path = \"from/config\"\n").unwrap();

        assert_eq!(resolve_module_path(Some("from/flag"), &config, dir.path()), "from/flag");
        assert_eq!(resolve_module_path(None, &config, dir.path()), "from/config");
        assert_eq!(
            resolve_module_path(None, &DiffcovConfig::default(), dir.path()),
            "example.com/m"
        );
    }

    #[test]
    fn test_resolve_module_path_falls_back_to_dir_name() {
        let dir = TempDir::new().unwrap();
        let repo = dir.path().join("myrepo");
        fs::create_dir(&repo).unwrap();
        assert_eq!(resolve_module_path(None, &DiffcovConfig::default(), &repo), "myrepo");
    }

    #[test]
    fn test_quoted_module_directive() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("go.mod"), "module \"example.com/quoted\"\n").unwrap();
        assert_eq!(read_go_module(dir.path()).as_deref(), Some("example.com/quoted"));
    }
}
