//! Data models shared by the diff coverage engine.
//!
//! Inputs (coverage blocks, diff changes) are read-only for one run; outputs
//! (per-file coverage profiles and run statistics) are created once and never
//! mutated afterwards.

use serde::{Deserialize, Serialize};

/// A contiguous instrumented code unit with a statement and execution count.
///
/// Lines and columns are 1-based, columns count bytes. Several blocks can start
/// on the same line, e.g. a closure literal passed as a call argument.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionBlock {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub num_statements: u32,
    pub execution_count: u64,
}

impl ExecutionBlock {
    pub fn new(
        start_line: u32,
        start_col: u32,
        end_line: u32,
        end_col: u32,
        num_statements: u32,
        execution_count: u64,
    ) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
            num_statements,
            execution_count,
        }
    }

    /// Whether `line` lies within `[start_line, end_line]`.
    pub fn spans(&self, line: u32) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    pub fn is_covered(&self) -> bool {
        self.execution_count > 0
    }

    /// Iterate every line number the block touches.
    pub fn lines(&self) -> std::ops::RangeInclusive<u32> {
        self.start_line..=self.end_line
    }
}

/// Coverage data for a single source file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverProfile {
    /// File name as recorded by the coverage tool (usually module-qualified).
    pub file_name: String,
    /// Counting mode (`set`, `count` or `atomic`).
    pub mode: String,
    pub blocks: Vec<ExecutionBlock>,
}

impl CoverProfile {
    pub fn new(file_name: impl Into<String>, blocks: Vec<ExecutionBlock>) -> Self {
        Self {
            file_name: file_name.into(),
            mode: "set".to_string(),
            blocks,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }
}

/// One contiguous run of changed lines in a file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSection {
    pub start_line: u32,
    pub end_line: u32,
    /// Literal text of every line in `[start_line, end_line]`.
    pub contents: Vec<String>,
}

impl DiffSection {
    pub fn new(start_line: u32, end_line: u32, contents: Vec<String>) -> Self {
        Self {
            start_line,
            end_line,
            contents,
        }
    }

    /// Text of `line`, or the empty string when the section has no content for it.
    pub fn line_text(&self, line: u32) -> &str {
        line.checked_sub(self.start_line)
            .and_then(|offset| self.contents.get(offset as usize))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// How a file changed between the compared branch and HEAD.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeMode {
    New,
    Modify,
    Rename,
    Delete,
}

impl ChangeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeMode::New => "new",
            ChangeMode::Modify => "modify",
            ChangeMode::Rename => "rename",
            ChangeMode::Delete => "delete",
        }
    }
}

/// A changed file with its changed sections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Repository-relative path, `/`-separated.
    pub file_name: String,
    pub mode: ChangeMode,
    pub sections: Vec<DiffSection>,
}

impl Change {
    pub fn new(file_name: impl Into<String>, mode: ChangeMode, sections: Vec<DiffSection>) -> Self {
        Self {
            file_name: file_name.into(),
            mode,
            sections,
        }
    }
}

/// A changed section that contains at least one violation line.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationSection {
    pub start_line: u32,
    pub end_line: u32,
    pub contents: Vec<String>,
    pub violation_lines: Vec<u32>,
}

/// Diff coverage result for one file.
///
/// Only produced when `effective_lines > 0`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageProfile {
    pub file_name: String,
    pub total_lines: u64,
    pub effective_lines: u64,
    pub ignored_lines: u64,
    pub covered_lines: u64,
    /// Sorted ascending, duplicate-free.
    pub violation_lines: Vec<u32>,
    pub violation_sections: Vec<ViolationSection>,
}

impl CoverageProfile {
    /// Covered / effective as a percentage.
    pub fn coverage_percent(&self) -> f64 {
        percent(self.covered_lines, self.effective_lines).unwrap_or(0.0)
    }
}

/// Running totals carried by every coverage tree node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageTotals {
    pub total_lines: u64,
    pub effective_lines: u64,
    pub ignored_lines: u64,
    pub covered_lines: u64,
    pub violation_lines: u64,
}

impl CoverageTotals {
    pub fn from_profile(profile: &CoverageProfile) -> Self {
        Self {
            total_lines: profile.total_lines,
            effective_lines: profile.effective_lines,
            ignored_lines: profile.ignored_lines,
            covered_lines: profile.covered_lines,
            violation_lines: profile.violation_lines.len() as u64,
        }
    }

    pub fn coverage_percent(&self) -> Option<f64> {
        percent(self.covered_lines, self.effective_lines)
    }
}

impl std::ops::AddAssign for CoverageTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.total_lines += rhs.total_lines;
        self.effective_lines += rhs.effective_lines;
        self.ignored_lines += rhs.ignored_lines;
        self.covered_lines += rhs.covered_lines;
        self.violation_lines += rhs.violation_lines;
    }
}

/// Aggregate result of one diff coverage run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub compared_branch: String,
    pub total_lines: u64,
    pub effective_lines: u64,
    pub ignored_lines: u64,
    pub covered_lines: u64,
    /// `None` when no effective lines were found.
    pub coverage_percent: Option<f64>,
    pub violation_lines: u64,
    pub coverage_profiles: Vec<CoverageProfile>,
}

fn percent(covered: u64, effective: u64) -> Option<f64> {
    if effective == 0 {
        None
    } else {
        Some(covered as f64 / effective as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_spans() {
        let block = ExecutionBlock::new(5, 2, 8, 3, 4, 0);
        assert!(!block.spans(4));
        assert!(block.spans(5));
        assert!(block.spans(8));
        assert!(!block.spans(9));
        assert!(!block.is_covered());
        assert_eq!(block.lines().count(), 4);
    }

    #[test]
    fn test_line_text_out_of_range() {
        let section = DiffSection::new(10, 12, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(section.line_text(10), "a");
        assert_eq!(section.line_text(11), "b");
        assert_eq!(section.line_text(12), "");
        assert_eq!(section.line_text(3), "");
    }

    #[test]
    fn test_totals_add_assign() {
        let mut totals = CoverageTotals::default();
        totals += CoverageTotals {
            total_lines: 4,
            effective_lines: 3,
            ignored_lines: 1,
            covered_lines: 2,
            violation_lines: 1,
        };
        totals += CoverageTotals {
            total_lines: 1,
            effective_lines: 1,
            ignored_lines: 0,
            covered_lines: 1,
            violation_lines: 0,
        };
        assert_eq!(totals.total_lines, 5);
        assert_eq!(totals.effective_lines, 4);
        assert_eq!(totals.covered_lines, 3);
        assert_eq!(totals.coverage_percent(), Some(75.0));
    }

    #[test]
    fn test_percent_without_effective_lines() {
        assert_eq!(CoverageTotals::default().coverage_percent(), None);
    }

    #[test]
    fn test_change_mode_serializes_lowercase() {
        let json = serde_json::to_string(&ChangeMode::Modify).unwrap();
        assert_eq!(json, "\"modify\"");
        assert_eq!(ChangeMode::Rename.as_str(), "rename");
    }
}
