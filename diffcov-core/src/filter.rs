//! Profile filtering and the test-file precondition.
//!
//! Profiles are matched to changes by path suffix: a profile belongs to the
//! first change whose repository-relative path is a suffix of the profile's
//! (usually module-qualified) path. An unrelated file whose path happens to
//! end with a changed path (`foo/bar.go` vs `other/foo/bar.go`) is attributed
//! to that change as well.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{DiffCoverageError, Result};
use crate::types::{Change, CoverProfile};

/// Compile exclusion patterns, failing on the first invalid one.
pub fn compile_excludes(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| DiffCoverageError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

/// Whether `profile_path` belongs to `change_path`.
pub fn belongs_to(profile_path: &str, change_path: &str) -> bool {
    profile_path.ends_with(change_path)
}

/// First change the profile belongs to.
pub fn find_change<'a>(profile: &CoverProfile, changes: &'a [Change]) -> Option<&'a Change> {
    changes
        .iter()
        .find(|c| belongs_to(&profile.file_name, &c.file_name))
}

/// First profile that belongs to the change.
pub fn find_profile<'a>(change: &Change, profiles: &'a [CoverProfile]) -> Option<&'a CoverProfile> {
    profiles
        .iter()
        .find(|p| belongs_to(&p.file_name, &change.file_name))
}

/// Drop profiles matching any exclusion pattern, then profiles with no change.
pub fn filter_profiles(
    profiles: Vec<CoverProfile>,
    excludes: &[Regex],
    changes: &[Change],
) -> Vec<CoverProfile> {
    profiles
        .into_iter()
        .filter(|p| match excludes.iter().find(|re| re.is_match(&p.file_name)) {
            Some(re) => {
                tracing::debug!(file = %p.file_name, pattern = %re, "excluded by pattern");
                false
            }
            None => true,
        })
        .filter(|p| {
            let changed = find_change(p, changes).is_some();
            if !changed {
                tracing::trace!(file = %p.file_name, "no matching change");
            }
            changed
        })
        .collect()
}

/// Directory of each changed file must contain at least one test file.
///
/// Fails on the first changed file whose directory has none.
pub fn check_test_files(changes: &[Change], repository: &Path, suffix: &str) -> Result<()> {
    for change in changes {
        let path = repository.join(&change.file_name);
        let directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| repository.to_path_buf());

        if !has_test_file(&directory, suffix)? {
            return Err(DiffCoverageError::NoTestFiles { directory });
        }
    }
    Ok(())
}

/// Whether `directory` directly contains a file whose name ends with `suffix`,
/// ignoring case.
pub fn has_test_file(directory: &Path, suffix: &str) -> Result<bool> {
    let read_err = |source| DiffCoverageError::ReadDir {
        directory: PathBuf::from(directory),
        source,
    };
    let suffix = suffix.to_lowercase();

    for entry in fs::read_dir(directory).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        if entry.file_type().map_err(read_err)?.is_dir() {
            continue;
        }
        if entry
            .file_name()
            .to_string_lossy()
            .to_lowercase()
            .ends_with(&suffix)
        {
            return Ok(true);
        }
    }
    Ok(false)
}
