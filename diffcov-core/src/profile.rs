//! Reader for the Go text cover-profile format.
//!
//! ```text
//! mode: set
//! example.com/m/api/server.go:10.34,12.16 2 1
//! ```
//!
//! Each block line is `file:startLine.startCol,endLine.endCol numStmt count`.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ProfileParseError;
use crate::locator::sort_blocks;
use crate::types::{CoverProfile, ExecutionBlock};

static BLOCK_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+):([0-9]+)\.([0-9]+),([0-9]+)\.([0-9]+) ([0-9]+) ([0-9]+)$").unwrap()
});

const MODES: &[&str] = &["set", "count", "atomic"];

/// Parse profile text into per-file profiles sorted by file name.
///
/// Blocks of each file are sorted by start position; duplicate blocks are
/// merged (counts OR-ed in `set` mode, summed otherwise).
pub fn parse_profiles(input: &str) -> Result<Vec<CoverProfile>, ProfileParseError> {
    let mut mode: Option<String> = None;
    let mut files: BTreeMap<String, Vec<ExecutionBlock>> = BTreeMap::new();

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();
        if line.is_empty() {
            continue;
        }

        if mode.is_none() {
            mode = Some(parse_mode(line, line_no)?);
            continue;
        }

        let (file, block) = parse_block(line, line_no)?;
        files.entry(file).or_default().push(block);
    }

    let Some(mode) = mode else {
        return Ok(Vec::new());
    };

    Ok(files
        .into_iter()
        .map(|(file_name, mut blocks)| {
            sort_blocks(&mut blocks);
            let blocks = merge_duplicates(blocks, &mode);
            CoverProfile::new(file_name, blocks).with_mode(mode.clone())
        })
        .collect())
}

fn parse_mode(line: &str, line_no: usize) -> Result<String, ProfileParseError> {
    let mode = line
        .strip_prefix("mode:")
        .map(str::trim)
        .ok_or_else(|| ProfileParseError {
            line: line_no,
            message: format!("expected mode line, got {:?}", line),
        })?;
    if !MODES.contains(&mode) {
        return Err(ProfileParseError {
            line: line_no,
            message: format!("unknown mode {:?}", mode),
        });
    }
    Ok(mode.to_string())
}

fn parse_block(line: &str, line_no: usize) -> Result<(String, ExecutionBlock), ProfileParseError> {
    let malformed = |message: String| ProfileParseError {
        line: line_no,
        message,
    };
    let caps = BLOCK_LINE
        .captures(line)
        .ok_or_else(|| malformed(format!("malformed block {:?}", line)))?;

    let num = |i: usize| {
        caps[i]
            .parse::<u64>()
            .map_err(|e| malformed(format!("field {:?}: {}", &caps[i], e)))
    };
    let narrow = |i: usize| {
        num(i).and_then(|v| {
            u32::try_from(v).map_err(|_| malformed(format!("field {:?} out of range", &caps[i])))
        })
    };

    let block = ExecutionBlock::new(
        narrow(2)?,
        narrow(3)?,
        narrow(4)?,
        narrow(5)?,
        narrow(6)?,
        num(7)?,
    );
    Ok((caps[1].to_string(), block))
}

/// Merge adjacent blocks with identical positions. `blocks` must be sorted.
fn merge_duplicates(blocks: Vec<ExecutionBlock>, mode: &str) -> Vec<ExecutionBlock> {
    let mut merged: Vec<ExecutionBlock> = Vec::with_capacity(blocks.len());
    for block in blocks {
        match merged.last_mut() {
            Some(last) if same_position(last, &block) => {
                if mode == "set" {
                    last.execution_count |= block.execution_count;
                } else {
                    last.execution_count += block.execution_count;
                }
            }
            _ => merged.push(block),
        }
    }
    merged
}

fn same_position(a: &ExecutionBlock, b: &ExecutionBlock) -> bool {
    a.start_line == b.start_line
        && a.start_col == b.start_col
        && a.end_line == b.end_line
        && a.end_col == b.end_col
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = "\
mode: set
example.com/m/api/server.go:20.2,22.16 2 0
example.com/m/api/server.go:10.34,12.16 2 1
example.com/m/main.go:5.13,7.2 1 1
";

    #[test]
    fn test_parse_profiles() {
        let profiles = parse_profiles(PROFILE).unwrap();
        assert_eq!(profiles.len(), 2);

        let server = &profiles[0];
        assert_eq!(server.file_name, "example.com/m/api/server.go");
        assert_eq!(server.mode, "set");
        assert_eq!(server.blocks.len(), 2);
        assert_eq!(server.blocks[0], ExecutionBlock::new(10, 34, 12, 16, 2, 1));
        assert_eq!(server.blocks[1].start_line, 20);

        assert_eq!(profiles[1].file_name, "example.com/m/main.go");
    }

    #[test]
    fn test_merge_set_mode() {
        let input = "mode: set\nm/a.go:1.1,2.2 1 0\nm/a.go:1.1,2.2 1 1\nm/a.go:1.1,2.2 1 0\n";
        let profiles = parse_profiles(input).unwrap();
        assert_eq!(profiles[0].blocks.len(), 1);
        assert_eq!(profiles[0].blocks[0].execution_count, 1);
    }

    #[test]
    fn test_merge_count_mode() {
        let input = "mode: count\nm/a.go:1.1,2.2 1 3\nm/a.go:1.1,2.2 1 4\n";
        let profiles = parse_profiles(input).unwrap();
        assert_eq!(profiles[0].mode, "count");
        assert_eq!(profiles[0].blocks[0].execution_count, 7);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_profiles("").unwrap().is_empty());
        assert!(parse_profiles("mode: atomic\n").unwrap().is_empty());
    }

    #[test]
    fn test_missing_mode() {
        let err = parse_profiles("m/a.go:1.1,2.2 1 0\n").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.contains("expected mode line"));
    }

    #[test]
    fn test_unknown_mode() {
        let err = parse_profiles("mode: sometimes\n").unwrap_err();
        assert!(err.message.contains("unknown mode"));
    }

    #[test]
    fn test_malformed_block() {
        let err = parse_profiles("mode: set\n\nm/a.go:1.1-2.2 1 0\n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_file_name_with_colon() {
        let profiles = parse_profiles("mode: set\nC:/src/m/a.go:1.1,2.2 1 0\n").unwrap();
        assert_eq!(profiles[0].file_name, "C:/src/m/a.go");
    }
}
