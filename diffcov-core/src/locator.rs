//! Block lookup: which instrumented block owns a changed line.
//!
//! Diff line ranges are coarser than instrumentation granularity. Several
//! blocks can open on one line (`run(func() { ... })`), so ownership is
//! decided by binary search on the start line followed by a backward scan
//! that disambiguates by column.

use crate::types::ExecutionBlock;

/// Sort blocks by `(start_line, start_col)`.
///
/// Must be applied once per file before any call to [`find_block`].
pub fn sort_blocks(blocks: &mut [ExecutionBlock]) {
    blocks.sort_by(|a, b| {
        a.start_line
            .cmp(&b.start_line)
            .then(a.start_col.cmp(&b.start_col))
    });
}

/// Find the block that owns `line`.
///
/// `blocks` must already be sorted with [`sort_blocks`]. `text` is the literal
/// content of the line; a block starting on `line` only owns it when the text
/// reaches past the block's start column.
///
/// Returns `None` for comments, blank lines and declaration-only lines.
pub fn find_block<'a>(
    blocks: &'a [ExecutionBlock],
    line: u32,
    text: &str,
) -> Option<&'a ExecutionBlock> {
    let idx = blocks.partition_point(|b| b.start_line < line);

    if idx == blocks.len() {
        let last = blocks.last()?;
        return owns(last, line, text).then_some(last);
    }

    blocks[..=idx].iter().rev().find(|b| owns(b, line, text))
}

fn owns(block: &ExecutionBlock, line: u32, text: &str) -> bool {
    if !block.spans(line) {
        return false;
    }
    // a block opening on this line past the visible text belongs to a later line
    block.start_line != line || text.len() > block.start_col as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(start_line: u32, start_col: u32, end_line: u32, count: u64) -> ExecutionBlock {
        ExecutionBlock::new(start_line, start_col, end_line, 2, 1, count)
    }

    #[test]
    fn test_sort_blocks() {
        let mut blocks = vec![block(10, 5, 12, 0), block(3, 2, 4, 1), block(10, 2, 10, 1)];
        sort_blocks(&mut blocks);
        let starts: Vec<_> = blocks.iter().map(|b| (b.start_line, b.start_col)).collect();
        assert_eq!(starts, vec![(3, 2), (10, 2), (10, 5)]);
    }

    #[test]
    fn test_empty_blocks() {
        assert_eq!(find_block(&[], 1, "x := 1"), None);
    }

    #[test]
    fn test_line_inside_block() {
        let blocks = vec![block(1, 10, 5, 1), block(7, 2, 9, 0)];
        let found = find_block(&blocks, 3, "\tx := 1").unwrap();
        assert_eq!(found.start_line, 1);
        let found = find_block(&blocks, 8, "\ty := 2").unwrap();
        assert_eq!(found.start_line, 7);
    }

    #[test]
    fn test_gap_between_blocks() {
        let blocks = vec![block(1, 10, 5, 1), block(7, 2, 9, 0)];
        assert_eq!(find_block(&blocks, 6, "// comment"), None);
    }

    #[test]
    fn test_past_last_block() {
        let blocks = vec![block(1, 10, 5, 1), block(7, 2, 9, 0)];
        assert_eq!(find_block(&blocks, 10, "}"), None);
        assert_eq!(find_block(&blocks, 8, "\tz++").unwrap().start_line, 7);
    }

    #[test]
    fn test_past_end_only_probes_last_block() {
        // line 10 is inside the outer block but after every block start
        let blocks = vec![block(1, 10, 50, 1), block(3, 2, 5, 0)];
        assert_eq!(find_block(&blocks, 10, "\tx++"), None);
    }

    #[test]
    fn test_same_line_rule_on_block_start() {
        // the second block opens at column 20 of line 7
        let blocks = vec![block(1, 10, 5, 1), block(7, 20, 9, 0)];
        assert_eq!(find_block(&blocks, 7, "func f() {"), None);
        let long = "func f() { return compute(1, 2) }";
        assert_eq!(find_block(&blocks, 7, long).unwrap().start_line, 7);
    }

    #[test]
    fn test_block_starting_past_text_falls_back() {
        // outer body spans 1..10; a closure opens on line 4 at column 30
        let blocks = vec![block(1, 12, 10, 1), block(4, 30, 6, 0)];
        let short = "\tdo(func() {";
        let found = find_block(&blocks, 4, short).unwrap();
        assert_eq!(found.start_line, 1);
        assert!(found.is_covered());
    }

    #[test]
    fn test_inline_closure_owns_line() {
        let blocks = vec![block(1, 12, 10, 1), block(4, 14, 4, 0)];
        let line = "\trun(func() { return 1 }())";
        let found = find_block(&blocks, 4, line).unwrap();
        assert_eq!(found.start_col, 14);
        assert!(!found.is_covered());
    }

    #[test]
    fn test_later_block_wins_when_both_span() {
        let blocks = vec![block(1, 12, 10, 1), block(3, 2, 5, 0)];
        let found = find_block(&blocks, 4, "\t\tx++").unwrap();
        assert_eq!(found.start_line, 3);
    }

    #[test]
    fn test_first_block_opening_on_line_is_preferred() {
        let blocks = vec![block(2, 5, 2, 1), block(2, 8, 2, 0)];
        let found = find_block(&blocks, 2, "\tif ok { return }").unwrap();
        assert_eq!(found.start_col, 5);
    }
}
