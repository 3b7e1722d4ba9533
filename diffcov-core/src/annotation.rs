//! Ignore annotations.
//!
//! The engine consumes annotations through [`AnnotationParser`]. The bundled
//! [`CommentAnnotationParser`] understands two source comments:
//!
//! ```text
//! //+diffcov:ignore:file    exclude the whole file from diff coverage
//! //+diffcov:ignore:block   exclude the next brace-delimited block
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::error::BoxError;
use crate::types::{CoverProfile, ExecutionBlock};

static IGNORE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"//\s*\+diffcov:ignore:(file|block)\b").unwrap());

/// Scope of an ignore annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreType {
    /// The whole file is excluded from diff coverage.
    File,
    /// Only `ignored_blocks` are excluded from effective counting.
    Block,
}

/// Parsed ignore annotations for one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IgnoreProfile {
    pub ignore_type: IgnoreType,
    pub ignored_blocks: HashSet<ExecutionBlock>,
}

impl IgnoreProfile {
    pub fn file(blocks: &[ExecutionBlock]) -> Self {
        Self {
            ignore_type: IgnoreType::File,
            ignored_blocks: blocks.iter().copied().collect(),
        }
    }

    pub fn blocks(blocks: impl IntoIterator<Item = ExecutionBlock>) -> Self {
        Self {
            ignore_type: IgnoreType::Block,
            ignored_blocks: blocks.into_iter().collect(),
        }
    }

    pub fn is_file_ignore(&self) -> bool {
        self.ignore_type == IgnoreType::File
    }

    pub fn ignores(&self, block: &ExecutionBlock) -> bool {
        self.ignored_blocks.contains(block)
    }
}

/// Source of ignore annotations for changed files.
pub trait AnnotationParser {
    /// Parse annotations of the file at `source` against its coverage blocks.
    ///
    /// `Ok(None)` means the file carries no annotations.
    fn parse(&self, source: &Path, profile: &CoverProfile)
        -> Result<Option<IgnoreProfile>, BoxError>;
}

/// Parser that never reports annotations.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAnnotations;

impl AnnotationParser for NoAnnotations {
    fn parse(
        &self,
        _source: &Path,
        _profile: &CoverProfile,
    ) -> Result<Option<IgnoreProfile>, BoxError> {
        Ok(None)
    }
}

/// Errors raised by [`CommentAnnotationParser`].
#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: ignore block annotation is not followed by a block")]
    MissingBlock { line: u32 },
}

/// Reads `//+diffcov:ignore:*` comments from source files.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommentAnnotationParser;

impl CommentAnnotationParser {
    /// Parse annotations from in-memory source text.
    pub fn parse_source(
        &self,
        source: &str,
        blocks: &[ExecutionBlock],
    ) -> Result<Option<IgnoreProfile>, AnnotationError> {
        let lines: Vec<&str> = source.lines().collect();
        let mut ranges = Vec::new();
        let mut lex = Lex::Code;

        for (idx, line) in lines.iter().enumerate() {
            let line_start = lex;
            // markers only count inside line comments
            let LineEnd::Comment(at) = lex.scan(line.as_bytes(), |_| false) else {
                continue;
            };
            let Some(caps) = IGNORE_MARKER.captures(&line[at..]) else {
                continue;
            };
            if &caps[1] == "file" {
                return Ok(Some(IgnoreProfile::file(blocks)));
            }

            let marker_line = idx as u32 + 1;
            let end = block_end(&lines, idx, line_start)
                .ok_or(AnnotationError::MissingBlock { line: marker_line })?;
            ranges.push((marker_line, end));
        }

        if ranges.is_empty() {
            return Ok(None);
        }

        let ignored = blocks.iter().copied().filter(|b| {
            ranges
                .iter()
                .any(|&(start, end)| start <= b.start_line && b.start_line <= end)
        });
        Ok(Some(IgnoreProfile::blocks(ignored)))
    }
}

impl AnnotationParser for CommentAnnotationParser {
    fn parse(
        &self,
        source: &Path,
        profile: &CoverProfile,
    ) -> Result<Option<IgnoreProfile>, BoxError> {
        let text = fs::read_to_string(source).map_err(|e| AnnotationError::Read {
            path: source.display().to_string(),
            source: e,
        })?;
        Ok(self.parse_source(&text, &profile.blocks)?)
    }
}

/// Go lexer state carried across lines.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    BlockComment,
    RawString,
}

/// How a scanned line ended.
enum LineEnd {
    /// The brace callback asked to stop.
    Stopped,
    /// A line comment starts at this byte offset.
    Comment(usize),
    Eol,
}

impl Lex {
    /// Advance over one line, calling `on_brace` with every `{` and `}` that
    /// is code. Scanning stops as soon as `on_brace` returns `true`.
    fn scan(&mut self, bytes: &[u8], mut on_brace: impl FnMut(u8) -> bool) -> LineEnd {
        let mut i = 0;
        while i < bytes.len() {
            match *self {
                Lex::BlockComment => {
                    if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                        *self = Lex::Code;
                        i += 1;
                    }
                }
                Lex::RawString => {
                    if bytes[i] == b'`' {
                        *self = Lex::Code;
                    }
                }
                Lex::Code => match bytes[i] {
                    b'/' if bytes.get(i + 1) == Some(&b'/') => return LineEnd::Comment(i),
                    b'/' if bytes.get(i + 1) == Some(&b'*') => {
                        *self = Lex::BlockComment;
                        i += 1;
                    }
                    b'`' => *self = Lex::RawString,
                    quote @ (b'"' | b'\'') => i = skip_quoted(bytes, i, quote),
                    brace @ (b'{' | b'}') => {
                        if on_brace(brace) {
                            return LineEnd::Stopped;
                        }
                    }
                    _ => {}
                },
            }
            i += 1;
        }
        LineEnd::Eol
    }
}

/// Line (1-based) of the brace closing the first block opened on the marker
/// line (before the marker comment) or on any later line. `state` is the
/// lexer state at the start of the marker line.
///
/// Returns `None` when no block opens; an unclosed block ends at the last line.
fn block_end(lines: &[&str], start_idx: usize, mut state: Lex) -> Option<u32> {
    let mut depth = 0usize;
    let mut opened = false;

    for (idx, line) in lines.iter().enumerate().skip(start_idx) {
        let end = state.scan(line.as_bytes(), |brace| match brace {
            b'{' => {
                depth += 1;
                opened = true;
                false
            }
            _ if opened => {
                depth = depth.saturating_sub(1);
                depth == 0
            }
            _ => false,
        });
        match end {
            LineEnd::Stopped => return Some(idx as u32 + 1),
            // the rest of the marker line is the marker itself
            LineEnd::Comment(_) | LineEnd::Eol => {}
        }
    }

    opened.then_some(lines.len() as u32)
}

/// Index of the closing quote of the literal starting at `open`.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8) -> usize {
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b if b == quote => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn blk(start_line: u32, end_line: u32) -> ExecutionBlock {
        ExecutionBlock::new(start_line, 2, end_line, 2, 1, 0)
    }

    #[test]
    fn test_no_annotations() {
        let src = "package foo\n\nfunc f() {\n\tx := 1\n}\n";
        let parsed = CommentAnnotationParser
            .parse_source(src, &[blk(3, 5)])
            .unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_file_ignore() {
        let src = "//+diffcov:ignore:file\npackage foo\n\nfunc f() {\n}\n";
        let blocks = [blk(4, 5), blk(7, 9)];
        let parsed = CommentAnnotationParser
            .parse_source(src, &blocks)
            .unwrap()
            .unwrap();
        assert!(parsed.is_file_ignore());
        assert_eq!(parsed.ignored_blocks.len(), 2);
    }

    #[test]
    fn test_block_ignore_covers_nested_blocks() {
        let src = "\
package foo

//+diffcov:ignore:block
func ignored() {
\tif x {
\t\ty()
\t}
}

func kept() {
\tz()
}
";
        let blocks = [blk(4, 5), blk(5, 7), blk(7, 8), blk(10, 12)];
        let parsed = CommentAnnotationParser
            .parse_source(src, &blocks)
            .unwrap()
            .unwrap();
        assert_eq!(parsed.ignore_type, IgnoreType::Block);
        assert!(parsed.ignores(&blk(4, 5)));
        assert!(parsed.ignores(&blk(5, 7)));
        assert!(parsed.ignores(&blk(7, 8)));
        assert!(!parsed.ignores(&blk(10, 12)));
    }

    #[test]
    fn test_block_ignore_skips_braces_in_literals() {
        let src = "\
func f() { //+diffcov:ignore:block
\tif a {
\t\ts := \"}\"
\t\tr := '}'
\t\t// }
\t\t/* } */
\t\tq := `
}`
\t}
}
func g() {
}
";
        let blocks = [blk(1, 10), blk(2, 9), blk(11, 12)];
        let parsed = CommentAnnotationParser
            .parse_source(src, &blocks)
            .unwrap()
            .unwrap();
        assert!(parsed.ignores(&blk(1, 10)));
        assert!(parsed.ignores(&blk(2, 9)));
        assert!(!parsed.ignores(&blk(11, 12)));
    }

    #[test]
    fn test_block_marker_without_block() {
        let src = "x := 1\n//+diffcov:ignore:block\n";
        let err = CommentAnnotationParser
            .parse_source(src, &[blk(1, 1)])
            .unwrap_err();
        assert!(matches!(err, AnnotationError::MissingBlock { line: 2 }));
    }

    #[test]
    fn test_markers_in_literals_are_not_annotations() {
        let src = "\
package foo

var s = \"//+diffcov:ignore:file\"
var t = `
//+diffcov:ignore:block
`

/* //+diffcov:ignore:file */
func f() {
\tx()
}
";
        let parsed = CommentAnnotationParser
            .parse_source(src, &[blk(9, 11)])
            .unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn test_block_marker_after_multiline_comment() {
        let src = "\
/* setup
*/ func f() { //+diffcov:ignore:block
\tx()
}
func g() {
}
";
        let blocks = [blk(2, 4), blk(5, 6)];
        let parsed = CommentAnnotationParser
            .parse_source(src, &blocks)
            .unwrap()
            .unwrap();
        assert!(parsed.ignores(&blk(2, 4)));
        assert!(!parsed.ignores(&blk(5, 6)));
    }

    #[test]
    fn test_file_marker_wins() {
        let src = "//+diffcov:ignore:block\nfunc f() {\n}\n//+diffcov:ignore:file\n";
        let parsed = CommentAnnotationParser
            .parse_source(src, &[blk(2, 3)])
            .unwrap()
            .unwrap();
        assert!(parsed.is_file_ignore());
    }

    #[test]
    fn test_parse_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"//+diffcov:ignore:file\npackage foo\n")
            .unwrap();
        let profile = CoverProfile::new("example.com/foo/foo.go", vec![blk(3, 4)]);
        let parsed = CommentAnnotationParser
            .parse(file.path(), &profile)
            .unwrap()
            .unwrap();
        assert!(parsed.is_file_ignore());
    }

    #[test]
    fn test_parse_missing_file() {
        let profile = CoverProfile::new("foo.go", vec![]);
        let err = CommentAnnotationParser
            .parse(Path::new("/nonexistent/diffcov/foo.go"), &profile)
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/diffcov/foo.go"));
    }

    #[test]
    fn test_no_annotations_parser() {
        let profile = CoverProfile::new("foo.go", vec![blk(1, 2)]);
        assert!(NoAnnotations
            .parse(Path::new("foo.go"), &profile)
            .unwrap()
            .is_none());
    }
}
