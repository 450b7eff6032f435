//! Search result entries.

use serde::{Deserialize, Serialize};

/// Path value the index uses for files at the repository root.
const ROOT_PATH: &str = ".";

/// One stored item returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Repository key
    pub repo: String,

    /// Folder path within the repository (`.` for the root)
    pub path: String,

    /// File name
    pub name: String,

    /// SHA-1 computed by the repository for the stored file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_sha1: Option<String>,
}

impl IndexEntry {
    pub fn new(
        repo: impl Into<String>,
        path: impl Into<String>,
        name: impl Into<String>,
        actual_sha1: Option<String>,
    ) -> Self {
        Self {
            repo: repo.into(),
            path: path.into(),
            name: name.into(),
            actual_sha1,
        }
    }

    /// Full location of the item: `repo/path/name`.
    pub fn located_path(&self) -> String {
        let path = self.path.trim_matches('/');
        if path.is_empty() || path == ROOT_PATH {
            format!("{}/{}", self.repo, self.name)
        } else {
            format!("{}/{}/{}", self.repo, path, self.name)
        }
    }
}
