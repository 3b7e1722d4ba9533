//! Reader for `git diff` unified output.
//!
//! Only the post-image matters: added lines are grouped into runs of
//! consecutive line numbers, one [`DiffSection`] per run.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PatchParseError;
use crate::types::{Change, ChangeMode, DiffSection};

static HUNK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@@ -[0-9]+(?:,[0-9]+)? \+([0-9]+)(?:,[0-9]+)? @@").unwrap());

/// A file being assembled from its headers and hunks.
#[derive(Debug)]
struct FilePatch {
    old_path: Option<String>,
    new_path: Option<String>,
    mode: ChangeMode,
    sections: Vec<DiffSection>,
    /// Next post-image line number, set by a hunk header.
    cursor: Option<u32>,
}

impl FilePatch {
    fn from_header(line: &str) -> Self {
        let (old_path, new_path) = header_paths(line);
        Self {
            old_path,
            new_path,
            mode: ChangeMode::Modify,
            sections: Vec::new(),
            cursor: None,
        }
    }

    fn add_line(&mut self, text: &str) {
        let Some(line) = self.cursor else {
            return;
        };
        match self.sections.last_mut() {
            Some(section) if section.end_line + 1 == line => {
                section.end_line = line;
                section.contents.push(text.to_string());
            }
            _ => self
                .sections
                .push(DiffSection::new(line, line, vec![text.to_string()])),
        }
        self.cursor = Some(line + 1);
    }

    fn into_change(self) -> Option<Change> {
        let file_name = match self.mode {
            ChangeMode::Delete => self.old_path.or(self.new_path),
            _ => self.new_path.or(self.old_path),
        }?;
        Some(Change::new(file_name, self.mode, self.sections))
    }
}

/// Parse unified diff text into one [`Change`] per file, in patch order.
pub fn parse_patch(input: &str) -> Result<Vec<Change>, PatchParseError> {
    let mut changes = Vec::new();
    let mut current: Option<FilePatch> = None;

    for (idx, line) in input.lines().enumerate() {
        if line.starts_with("diff --git ") {
            if let Some(change) = current.take().and_then(FilePatch::into_change) {
                changes.push(change);
            }
            current = Some(FilePatch::from_header(line));
            continue;
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if file.cursor.is_none() || line.starts_with("@@") {
            parse_header_line(file, line, idx + 1)?;
            continue;
        }

        match line.as_bytes().first() {
            Some(b'+') => file.add_line(&line[1..]),
            Some(b'-') | Some(b'\\') => {}
            _ => {
                if let Some(cursor) = file.cursor.as_mut() {
                    *cursor += 1;
                }
            }
        }
    }

    if let Some(change) = current.and_then(FilePatch::into_change) {
        changes.push(change);
    }
    Ok(changes)
}

/// Extended headers before the first hunk, and hunk headers.
fn parse_header_line(file: &mut FilePatch, line: &str, line_no: usize) -> Result<(), PatchParseError> {
    if line.starts_with("@@") {
        let caps = HUNK_HEADER.captures(line).ok_or_else(|| PatchParseError {
            line: line_no,
            message: format!("malformed hunk header {:?}", line),
        })?;
        let start = caps[1].parse::<u32>().map_err(|e| PatchParseError {
            line: line_no,
            message: format!("hunk start {:?}: {}", &caps[1], e),
        })?;
        file.cursor = Some(start);
    } else if line.starts_with("new file mode") {
        file.mode = ChangeMode::New;
    } else if line.starts_with("deleted file mode") {
        file.mode = ChangeMode::Delete;
    } else if let Some(path) = line.strip_prefix("rename from ") {
        file.mode = ChangeMode::Rename;
        file.old_path = Some(unquote(path));
    } else if let Some(path) = line.strip_prefix("rename to ") {
        file.mode = ChangeMode::Rename;
        file.new_path = Some(unquote(path));
    } else if let Some(path) = line.strip_prefix("--- ") {
        if let Some(path) = strip_side(path, "a/") {
            file.old_path = Some(path);
        }
    } else if let Some(path) = line.strip_prefix("+++ ") {
        if let Some(path) = strip_side(path, "b/") {
            file.new_path = Some(path);
        }
    }
    Ok(())
}

/// `a/x.go` → `x.go`; `/dev/null` → `None`.
fn strip_side(path: &str, prefix: &str) -> Option<String> {
    let path = path.split('\t').next().unwrap_or(path);
    if path == "/dev/null" {
        return None;
    }
    let path = unquote(path);
    Some(path.strip_prefix(prefix).unwrap_or(path.as_str()).to_string())
}

/// Decode a C-quoted path, as git prints names with non-ASCII or control
/// bytes (`"caf\303\251.go"`). Unquoted paths are returned as is.
fn unquote(path: &str) -> String {
    let inner = match path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(inner) => inner.as_bytes(),
        None => return path.to_string(),
    };

    let mut out = Vec::with_capacity(inner.len());
    let mut i = 0;
    while i < inner.len() {
        if inner[i] != b'\\' || i + 1 == inner.len() {
            out.push(inner[i]);
            i += 1;
            continue;
        }
        let escape = inner[i + 1];
        i += 2;
        let byte = match escape {
            b'a' => 0x07,
            b'b' => 0x08,
            b't' => b'\t',
            b'n' => b'\n',
            b'v' => 0x0b,
            b'f' => 0x0c,
            b'r' => b'\r',
            b'0'..=b'7' => {
                let mut value = u32::from(escape - b'0');
                let mut digits = 1;
                while digits < 3 && i < inner.len() && (b'0'..=b'7').contains(&inner[i]) {
                    value = value * 8 + u32::from(inner[i] - b'0');
                    i += 1;
                    digits += 1;
                }
                value as u8
            }
            other => other,
        };
        out.push(byte);
    }

    let decoded = String::from_utf8_lossy(&out).into_owned();
    tracing::trace!(quoted = path, decoded = %decoded, "unquoted path");
    decoded
}

/// Byte length of the quoted token at the start of `s`, quotes included.
fn quoted_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Paths from `diff --git a/<old> b/<new>`, used when no `---`/`+++` lines
/// follow (binary files, pure renames, mode changes).
fn header_paths(line: &str) -> (Option<String>, Option<String>) {
    let rest = line.trim_start_matches("diff --git ");
    let split = if rest.starts_with('"') {
        quoted_len(rest).map(|n| (&rest[..n], rest[n..].trim_start()))
    } else {
        rest.find(" b/")
            .or_else(|| rest.find(" \"b/"))
            .map(|i| (&rest[..i], &rest[i + 1..]))
    };
    match split {
        Some((old, new)) => (strip_side(old, "a/"), strip_side(new, "b/")),
        None => {
            tracing::debug!(header = line, "unrecognized diff header paths");
            (None, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATCH: &str = "\
diff --git a/api/server.go b/api/server.go
index 1111111..2222222 100644
--- a/api/server.go
+++ b/api/server.go
@@ -4,0 +5 @@ func serve() {
+\tlog.Println(\"start\")
@@ -9,2 +10,3 @@ func serve() {
-\treturn nil
-}
+\tif err != nil {
+\t\treturn err
+\t}
diff --git a/api/handler.go b/api/handler.go
new file mode 100644
index 0000000..3333333
--- /dev/null
+++ b/api/handler.go
@@ -0,0 +1,3 @@
+package api
+
+func handle() {}
diff --git a/old/util.go b/old/util.go
deleted file mode 100644
index 4444444..0000000
--- a/old/util.go
+++ /dev/null
@@ -1,2 +0,0 @@
-package old
-func util() {}
diff --git a/pkg/a.go b/pkg/b.go
similarity index 100%
rename from pkg/a.go
rename to pkg/b.go
";

    #[test]
    fn test_parse_patch_modes_and_names() {
        let changes = parse_patch(PATCH).unwrap();
        let summary: Vec<_> = changes
            .iter()
            .map(|c| (c.file_name.as_str(), c.mode))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("api/server.go", ChangeMode::Modify),
                ("api/handler.go", ChangeMode::New),
                ("old/util.go", ChangeMode::Delete),
                ("pkg/b.go", ChangeMode::Rename),
            ]
        );
    }

    #[test]
    fn test_sections_of_modified_file() {
        let changes = parse_patch(PATCH).unwrap();
        let server = &changes[0];
        assert_eq!(server.sections.len(), 2);
        assert_eq!(server.sections[0], DiffSection::new(5, 5, vec!["\tlog.Println(\"start\")".into()]));
        assert_eq!(server.sections[1].start_line, 10);
        assert_eq!(server.sections[1].end_line, 12);
        assert_eq!(server.sections[1].contents[1], "\t\treturn err");
    }

    #[test]
    fn test_new_file_is_one_section() {
        let changes = parse_patch(PATCH).unwrap();
        let handler = &changes[1];
        assert_eq!(handler.sections.len(), 1);
        assert_eq!(handler.sections[0].start_line, 1);
        assert_eq!(handler.sections[0].end_line, 3);
        assert_eq!(handler.sections[0].contents[1], "");
    }

    #[test]
    fn test_deleted_and_renamed_have_no_sections() {
        let changes = parse_patch(PATCH).unwrap();
        assert!(changes[2].sections.is_empty());
        assert!(changes[3].sections.is_empty());
    }

    #[test]
    fn test_context_lines_split_sections() {
        let patch = "\
diff --git a/x.go b/x.go
--- a/x.go
+++ b/x.go
@@ -1,4 +1,5 @@
 package x
+// one

+// two
+// three
\\ No newline at end of file
";
        let changes = parse_patch(patch).unwrap();
        let sections = &changes[0].sections;
        assert_eq!(sections.len(), 2);
        assert_eq!((sections[0].start_line, sections[0].end_line), (2, 2));
        assert_eq!((sections[1].start_line, sections[1].end_line), (4, 5));
    }

    #[test]
    fn test_binary_file_uses_header_paths() {
        let patch = "\
diff --git a/img/logo.png b/img/logo.png
new file mode 100644
index 0000000..5555555
Binary files /dev/null and b/img/logo.png differ
";
        let changes = parse_patch(patch).unwrap();
        assert_eq!(changes[0].file_name, "img/logo.png");
        assert_eq!(changes[0].mode, ChangeMode::New);
        assert!(changes[0].sections.is_empty());
    }

    #[test]
    fn test_quoted_non_ascii_paths() {
        let patch = r#"diff --git "a/caf\303\251.go" "b/caf\303\251.go"
--- "a/caf\303\251.go"
+++ "b/caf\303\251.go"
@@ -1,0 +2 @@
+x := 1
diff --git "a/\303\251t\303\251.png" "b/\303\251t\303\251.png"
new file mode 100644
Binary files /dev/null and "b/\303\251t\303\251.png" differ
diff --git a/old name.go "b/n\303\251w.go"
similarity index 100%
rename from old name.go
rename to "n\303\251w.go"
"#;
        let changes = parse_patch(patch).unwrap();
        let names: Vec<_> = changes.iter().map(|c| c.file_name.as_str()).collect();
        assert_eq!(names, vec!["café.go", "été.png", "néw.go"]);
        assert_eq!(changes[0].sections[0].start_line, 2);
        assert_eq!(changes[2].mode, ChangeMode::Rename);
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote("plain/x.go"), "plain/x.go");
        assert_eq!(unquote(r#""a\tb\"c\\d""#), "a\tb\"c\\d");
        assert_eq!(unquote(r#""\303\251""#), "é");
    }

    #[test]
    fn test_malformed_hunk_header() {
        let patch = "diff --git a/x.go b/x.go\n--- a/x.go\n+++ b/x.go\n@@ bogus @@\n";
        let err = parse_patch(patch).unwrap_err();
        assert_eq!(err.line, 4);
    }

    #[test]
    fn test_empty_patch() {
        assert!(parse_patch("").unwrap().is_empty());
    }
}
