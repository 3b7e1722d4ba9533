//! diffcov core - diff coverage engine.
//!
//! Given a test coverage profile and the diff between a branch and `HEAD`,
//! computes how many of the *changed* lines are exercised by tests and which
//! are not, per file and rolled up into a tree keyed by path segments.
//!
//! # Features
//!
//! - **Block locator**: column-aware attribution of a line to the block owning it
//! - **Two matching strategies**: statement counting for new files, line counting for modified ones
//! - **Ignore annotations**: `//+diffcov:ignore:file` and `//+diffcov:ignore:block`
//! - **Input adapters**: Go cover profiles and `git diff` unified output
//!
//! # Usage
//!
//! ```no_run
//! use diffcov_core::{parse_patch, parse_profiles, CommentAnnotationParser, DiffCoverage, DiffCoverageConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let profiles = parse_profiles(&std::fs::read_to_string("coverage.out")?)?;
//! let changes = parse_patch(&std::fs::read_to_string("changes.patch")?)?;
//! let config = DiffCoverageConfig {
//!     module_path: "example.com/m".to_string(),
//!     ..Default::default()
//! };
//! let report = DiffCoverage::new(profiles, changes, config, CommentAnnotationParser)?.generate()?;
//! println!("{:?}", report.statistics.coverage_percent);
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod diff_coverage;
pub mod error;
pub mod filter;
pub mod locator;
pub mod matcher;
pub mod patch;
pub mod profile;
pub mod tree;
pub mod types;

pub use annotation::{AnnotationParser, CommentAnnotationParser, IgnoreProfile, IgnoreType, NoAnnotations};
pub use diff_coverage::{DiffCoverage, DiffCoverageConfig, DiffCoverageReport, DEFAULT_TEST_FILE_SUFFIX};
pub use error::{DiffCoverageError, PatchParseError, ProfileParseError, Result};
pub use patch::parse_patch;
pub use profile::parse_profiles;
pub use tree::{CoverageTree, NodeInfo};
pub use types::*;
