//! Per-file matching of changed lines against coverage blocks.
//!
//! New files are judged block by block (every statement is new). Modified
//! files are judged line by line: each changed line is attributed to the block
//! owning it via [`find_block`].

use std::collections::{BTreeSet, HashSet};

use crate::annotation::IgnoreProfile;
use crate::locator::find_block;
use crate::types::{Change, CoverageProfile, DiffSection, ExecutionBlock, ViolationSection};

/// Running counters for one file.
#[derive(Debug, Default)]
struct Tally {
    total: u64,
    effective: u64,
    covered: u64,
}

impl Tally {
    fn into_profile(
        self,
        change: &Change,
        violation_lines: Vec<u32>,
        violation_sections: Vec<ViolationSection>,
    ) -> Option<CoverageProfile> {
        if self.effective == 0 {
            tracing::debug!(file = %change.file_name, "no effective lines");
            return None;
        }
        Some(CoverageProfile {
            file_name: change.file_name.clone(),
            total_lines: self.total,
            effective_lines: self.effective,
            ignored_lines: self.total - self.effective,
            covered_lines: self.covered,
            violation_lines,
            violation_sections,
        })
    }
}

fn is_ignored(ignore: Option<&IgnoreProfile>, block: &ExecutionBlock) -> bool {
    ignore.is_some_and(|p| p.ignores(block))
}

/// Coverage of a newly added file.
///
/// Counts statements rather than lines: a block contributes its statement
/// count to the totals. `blocks` must be sorted.
pub fn match_new_file(
    change: &Change,
    blocks: &[ExecutionBlock],
    ignore: Option<&IgnoreProfile>,
) -> Option<CoverageProfile> {
    let mut tally = Tally::default();
    let mut ignored_lines = HashSet::new();
    let mut violations = BTreeSet::new();

    for block in blocks {
        let statements = u64::from(block.num_statements);
        tally.total += statements;

        if is_ignored(ignore, block) {
            ignored_lines.extend(block.lines());
            continue;
        }

        tally.effective += statements;
        if block.is_covered() {
            tally.covered += statements;
        } else {
            violations.extend(block.lines().filter(|l| !ignored_lines.contains(l)));
        }
    }

    let violation_lines: Vec<u32> = violations.into_iter().collect();
    let section = whole_file_section(change, blocks, violation_lines.clone());
    tally.into_profile(change, violation_lines, vec![section])
}

fn whole_file_section(
    change: &Change,
    blocks: &[ExecutionBlock],
    violation_lines: Vec<u32>,
) -> ViolationSection {
    match change.sections.first() {
        Some(section) => ViolationSection {
            start_line: section.start_line,
            end_line: section.end_line,
            contents: section.contents.clone(),
            violation_lines,
        },
        None => ViolationSection {
            start_line: 1,
            end_line: blocks.iter().map(|b| b.end_line).max().unwrap_or(1),
            contents: Vec::new(),
            violation_lines,
        },
    }
}

/// Coverage of a modified file.
///
/// Counts changed lines that can be attributed to a block. `blocks` must be
/// sorted.
pub fn match_modified_file(
    change: &Change,
    blocks: &[ExecutionBlock],
    ignore: Option<&IgnoreProfile>,
) -> Option<CoverageProfile> {
    let mut tally = Tally::default();
    let mut ignored_lines = HashSet::new();
    let mut violation_lines = Vec::new();
    let mut violation_sections = Vec::new();

    for section in &change.sections {
        let violations = match_section(section, blocks, ignore, &mut ignored_lines, &mut tally);
        if violations.is_empty() {
            continue;
        }
        violation_lines.extend_from_slice(&violations);
        violation_sections.push(ViolationSection {
            start_line: section.start_line,
            end_line: section.end_line,
            contents: section.contents.clone(),
            violation_lines: violations,
        });
    }

    // sections of one change are disjoint but not guaranteed to be ordered
    violation_lines.sort_unstable();
    violation_lines.dedup();
    tally.into_profile(change, violation_lines, violation_sections)
}

/// Judge every line of one section; returns its violation lines.
///
/// `ignored_lines` is shared across the sections of one file: a line already
/// claimed by an ignored block is not counted again when another block shares it.
fn match_section(
    section: &DiffSection,
    blocks: &[ExecutionBlock],
    ignore: Option<&IgnoreProfile>,
    ignored_lines: &mut HashSet<u32>,
    tally: &mut Tally,
) -> Vec<u32> {
    let mut violations = Vec::new();

    for line in section.start_line..=section.end_line {
        let Some(block) = find_block(blocks, line, section.line_text(line)) else {
            tracing::trace!(line, "no block owns line");
            continue;
        };

        tally.total += 1;
        if is_ignored(ignore, block) {
            ignored_lines.extend(block.lines());
            continue;
        }
        if ignored_lines.contains(&line) {
            continue;
        }

        tally.effective += 1;
        if block.is_covered() {
            tally.covered += 1;
        } else {
            violations.push(line);
        }
    }

    violations
}
