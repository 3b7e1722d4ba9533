//! Error types for diffcov-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for diff coverage operations.
pub type Result<T> = std::result::Result<T, DiffCoverageError>;

/// Boxed error returned by pluggable collaborators such as annotation parsers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that abort a diff coverage run.
///
/// All of them are deterministic input defects; no partial result is returned.
#[derive(Error, Debug)]
pub enum DiffCoverageError {
    /// An exclusion pattern failed to compile.
    #[error("compile pattern {pattern}: {source}")]
    InvalidPattern {
        /// The offending pattern as supplied.
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A changed file's directory holds no test file.
    #[error("no test files in {}", directory.display())]
    NoTestFiles {
        /// Directory that was listed.
        directory: PathBuf,
    },

    /// Listing a changed file's directory failed.
    #[error("read directory {}: {source}", directory.display())]
    ReadDir {
        directory: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The annotation parser rejected a changed file.
    #[error("parse ignore annotations for {file}: {source}")]
    Annotation {
        /// Repository-relative name of the changed file.
        file: String,
        #[source]
        source: BoxError,
    },
}

/// Error produced while reading a text cover profile.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("cover profile line {line}: {message}")]
pub struct ProfileParseError {
    /// 1-based line number in the profile.
    pub line: usize,
    pub message: String,
}

/// Error produced while reading unified diff output.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("patch line {line}: {message}")]
pub struct PatchParseError {
    /// 1-based line number in the patch.
    pub line: usize,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DiffCoverageError::NoTestFiles {
            directory: PathBuf::from("/repo/pkg/foo"),
        };
        assert_eq!(err.to_string(), "no test files in /repo/pkg/foo");

        let source = regex::Regex::new("(").unwrap_err();
        let err = DiffCoverageError::InvalidPattern {
            pattern: "(".to_string(),
            source,
        };
        assert!(err.to_string().starts_with("compile pattern ("));

        let err = ProfileParseError {
            line: 3,
            message: "bad block".to_string(),
        };
        assert_eq!(err.to_string(), "cover profile line 3: bad block");
    }

    #[test]
    fn test_annotation_error_keeps_source() {
        let inner: BoxError = "unbalanced braces".into();
        let err = DiffCoverageError::Annotation {
            file: "pkg/foo.go".to_string(),
            source: inner,
        };
        assert!(err.to_string().contains("pkg/foo.go"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
