//! Candidate discovery.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::GraderConfig;
use crate::error::{GraderError, Result};

/// One submission directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct CandidateDescriptor {
    /// Directory name, used as the candidate's display name.
    pub name: String,

    /// Path of the directory.
    pub path: PathBuf,
}

impl CandidateDescriptor {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Resolve a path relative to the candidate root.
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.path.join(relative)
    }
}

/// List the candidate directories directly under `root`, sorted by name.
///
/// Hidden, reserved-prefix and environment directories are skipped, as are
/// plain files and names that are not valid UTF-8.
pub fn discover(root: &Path, config: &GraderConfig) -> Result<Vec<CandidateDescriptor>> {
    let entries = std::fs::read_dir(root).map_err(|source| GraderError::Root {
        path: root.to_path_buf(),
        source,
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if config.is_excluded(&name) {
            continue;
        }
        candidates.push(CandidateDescriptor::new(name, entry.path()));
    }

    candidates.sort();
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_filters_and_sorts() {
        let root = tempfile::tempdir().unwrap();
        for dir in ["zoe", "alice", ".git", "__pycache__", "venv", "env", "bob"] {
            fs::create_dir(root.path().join(dir)).unwrap();
        }
        fs::write(root.path().join("README.md"), "not a candidate").unwrap();

        let found = discover(root.path(), &GraderConfig::default()).unwrap();
        let names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "zoe"]);
        assert_eq!(found[0].path, root.path().join("alice"));
    }

    #[test]
    fn test_discover_empty_root() {
        let root = tempfile::tempdir().unwrap();
        let found = discover(root.path(), &GraderConfig::default()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_discover_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("nope");
        let err = discover(&missing, &GraderConfig::default()).unwrap_err();
        assert!(matches!(err, GraderError::Root { .. }));
    }

    #[test]
    fn test_join_resolves_inside_candidate() {
        let candidate = CandidateDescriptor::new("alice", "/subs/alice");
        assert_eq!(candidate.join(".gitignore"), PathBuf::from("/subs/alice/.gitignore"));
    }
}
