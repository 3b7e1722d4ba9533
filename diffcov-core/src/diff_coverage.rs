//! The diff coverage run: filter, match, roll up.

use std::path::PathBuf;

use regex::Regex;
use serde::Serialize;

use crate::annotation::AnnotationParser;
use crate::error::{DiffCoverageError, Result};
use crate::filter::{check_test_files, compile_excludes, filter_profiles, find_change};
use crate::locator::sort_blocks;
use crate::matcher::{match_modified_file, match_new_file};
use crate::tree::{CoverageTree, NodeInfo};
use crate::types::{ChangeMode, Change, CoverProfile, CoverageProfile, Statistics};

/// Default test-file naming convention.
pub const DEFAULT_TEST_FILE_SUFFIX: &str = "_test.go";

/// Inputs of one run besides profiles and changes.
#[derive(Clone, Debug)]
pub struct DiffCoverageConfig {
    /// Regular expressions; matching profile paths are dropped.
    pub excludes: Vec<String>,
    /// Label passed through into [`Statistics::compared_branch`].
    pub compared_branch: String,
    /// Root against which change paths are resolved.
    pub repository_path: PathBuf,
    /// Root label of the coverage tree.
    pub module_path: String,
    /// File-name suffix that marks a test file, compared case-insensitively.
    pub test_file_suffix: String,
}

impl Default for DiffCoverageConfig {
    fn default() -> Self {
        Self {
            excludes: Vec::new(),
            compared_branch: String::new(),
            repository_path: PathBuf::from("."),
            module_path: String::new(),
            test_file_suffix: DEFAULT_TEST_FILE_SUFFIX.to_string(),
        }
    }
}

/// Output of [`DiffCoverage::generate`].
#[derive(Clone, Debug, Serialize)]
pub struct DiffCoverageReport {
    pub statistics: Statistics,
    /// Every coverage tree node in pre-order.
    pub nodes: Vec<NodeInfo>,
}

/// A validated diff coverage run.
pub struct DiffCoverage<P> {
    profiles: Vec<CoverProfile>,
    changes: Vec<Change>,
    excludes: Vec<Regex>,
    config: DiffCoverageConfig,
    parser: P,
}

impl<P: AnnotationParser> DiffCoverage<P> {
    /// Validate inputs.
    ///
    /// Fails on the first invalid exclusion pattern, or on the first changed
    /// file whose directory holds no test file. Blocks are sorted here once.
    pub fn new(
        mut profiles: Vec<CoverProfile>,
        changes: Vec<Change>,
        config: DiffCoverageConfig,
        parser: P,
    ) -> Result<Self> {
        let excludes = compile_excludes(&config.excludes)?;
        check_test_files(&changes, &config.repository_path, &config.test_file_suffix)?;

        for profile in &mut profiles {
            sort_blocks(&mut profile.blocks);
        }

        Ok(Self {
            profiles,
            changes,
            excludes,
            config,
            parser,
        })
    }

    pub fn config(&self) -> &DiffCoverageConfig {
        &self.config
    }

    /// Compute per-file coverage, the coverage tree and run statistics.
    pub fn generate(&self) -> Result<DiffCoverageReport> {
        let profiles = filter_profiles(self.profiles.clone(), &self.excludes, &self.changes);
        tracing::debug!(
            profiles = profiles.len(),
            changes = self.changes.len(),
            "matching profiles"
        );

        let mut tree = CoverageTree::new(&self.config.module_path);
        let mut coverage_profiles = Vec::new();

        for profile in &profiles {
            let Some(change) = find_change(profile, &self.changes) else {
                continue;
            };
            if let Some(result) = self.match_file(profile, change)? {
                coverage_profiles.push(result.clone());
                tree.insert(result);
            }
        }

        tree.collect();
        let totals = tree.statistics();

        let statistics = Statistics {
            compared_branch: self.config.compared_branch.clone(),
            total_lines: totals.total_lines,
            effective_lines: totals.effective_lines,
            ignored_lines: totals.ignored_lines,
            covered_lines: totals.covered_lines,
            coverage_percent: totals.coverage_percent(),
            violation_lines: totals.violation_lines,
            coverage_profiles,
        };

        tracing::info!(
            files = statistics.coverage_profiles.len(),
            effective = statistics.effective_lines,
            covered = statistics.covered_lines,
            violations = statistics.violation_lines,
            "diff coverage computed"
        );

        Ok(DiffCoverageReport {
            statistics,
            nodes: tree.all(),
        })
    }

    fn match_file(&self, profile: &CoverProfile, change: &Change) -> Result<Option<CoverageProfile>> {
        if matches!(change.mode, ChangeMode::Rename | ChangeMode::Delete) {
            tracing::debug!(file = %change.file_name, mode = change.mode.as_str(), "skipped");
            return Ok(None);
        }

        let source = self.config.repository_path.join(&change.file_name);
        let ignore = self
            .parser
            .parse(&source, profile)
            .map_err(|source| DiffCoverageError::Annotation {
                file: change.file_name.clone(),
                source,
            })?;

        if ignore.as_ref().is_some_and(|i| i.is_file_ignore()) {
            tracing::debug!(file = %change.file_name, "ignored by file annotation");
            return Ok(None);
        }

        let result = match change.mode {
            ChangeMode::New => match_new_file(change, &profile.blocks, ignore.as_ref()),
            _ => match_modified_file(change, &profile.blocks, ignore.as_ref()),
        };
        Ok(result)
    }
}
