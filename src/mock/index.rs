//! Mock artifact index backed by an in-memory catalog

use buildinfo_index::{BuildProperties, IndexEntry, IndexError, MatchField, SearchQuery};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::failure::{FailureConfig, FailureInjector, IndexOperation};
use crate::reconcile::ArtifactIndex;

/// A stored item: the entry the index reports plus its `sha256` property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItem {
    #[serde(flatten)]
    pub entry: IndexEntry,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl StoredItem {
    pub fn new(entry: IndexEntry) -> Self {
        Self { entry, sha256: None }
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    fn field(&self, field: MatchField) -> Option<&str> {
        match field {
            MatchField::Sha256Property => self.sha256.as_deref(),
            MatchField::ActualSha1 => self.entry.actual_sha1.as_deref(),
        }
    }

    fn matches(&self, query: &SearchQuery) -> bool {
        query.criteria().iter().any(|criterion| {
            self.field(criterion.field)
                .map_or(false, |candidate| criterion.matches(criterion.field, candidate))
        })
    }
}

/// One recorded `set_properties` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyWrite {
    pub path: String,
    pub properties: String,
}

#[derive(Debug, Default)]
struct IndexState {
    items: Vec<StoredItem>,
    queries: Vec<String>,
    writes: Vec<PropertyWrite>,
    failures: FailureInjector,
}

/// Thread-safe in-process index. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockArtifactIndex {
    state: Arc<Mutex<IndexState>>,
}

impl MockArtifactIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = StoredItem>) -> Self {
        let index = Self::new();
        index.lock().items.extend(items);
        index
    }

    /// Load a catalog: a JSON array of stored items
    pub fn from_catalog_file(path: &Path) -> Result<Self, IndexError> {
        let json = fs::read_to_string(path).map_err(|e| {
            IndexError::Unavailable(format!("cannot read catalog {}: {}", path.display(), e))
        })?;
        let items: Vec<StoredItem> = serde_json::from_str(&json)?;
        Ok(Self::with_items(items))
    }

    // A poisoned lock only means another test thread panicked; the state is
    // still usable for assertions.
    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Query strings received, in order
    pub fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    /// Property writes received, in order
    pub fn writes(&self) -> Vec<PropertyWrite> {
        self.lock().writes.clone()
    }

    pub fn inject_failure(&self, op: IndexOperation, config: FailureConfig) {
        self.lock().failures.inject(op, config);
    }
}

impl ArtifactIndex for MockArtifactIndex {
    fn search(&self, query: &str) -> Result<Vec<IndexEntry>, IndexError> {
        let mut state = self.lock();
        state.queries.push(query.to_string());

        if let Some(failure) = state.failures.check(IndexOperation::Search) {
            return Err(IndexError::Unavailable(failure.message.clone()));
        }

        let parsed = SearchQuery::parse(query)?;
        Ok(state
            .items
            .iter()
            .filter(|item| item.matches(&parsed))
            .map(|item| item.entry.clone())
            .collect())
    }

    fn set_properties(&self, path: &str, properties: &BuildProperties) -> Result<(), IndexError> {
        let mut state = self.lock();

        if let Some(failure) = state.failures.check(IndexOperation::SetProperties) {
            return Err(IndexError::PropertyWrite {
                path: path.to_string(),
                reason: failure.message.clone(),
            });
        }

        if !state.items.iter().any(|item| item.entry.located_path() == path) {
            return Err(IndexError::PropertyWrite {
                path: path.to_string(),
                reason: "no such item".to_string(),
            });
        }

        state.writes.push(PropertyWrite {
            path: path.to_string(),
            properties: properties.to_string(),
        });
        Ok(())
    }
}
