//! Artifacts, dependencies, modules and the identity-keyed set holding them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;

/// Composite identity `(name, type, sha1)`.
///
/// Entries with equal keys are the same logical entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub name: String,
    pub kind: Option<String>,
    pub sha1: Option<String>,
}

/// Types that can live in an [`IdentitySet`].
pub trait Identified {
    fn identity(&self) -> IdentityKey;
}

/// Produced file recorded in a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
}

impl Artifact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            sha1: None,
            sha256: None,
            md5: None,
        }
    }

    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_sha1(mut self, sha1: impl Into<String>) -> Self {
        self.sha1 = Some(sha1.into());
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    pub fn with_md5(mut self, md5: impl Into<String>) -> Self {
        self.md5 = Some(md5.into());
        self
    }
}

impl Identified for Artifact {
    fn identity(&self) -> IdentityKey {
        IdentityKey {
            name: self.name.clone(),
            kind: self.kind.clone(),
            sha1: self.sha1.clone(),
        }
    }
}

/// Consumed file recorded in a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl Dependency {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            sha1: None,
            sha256: None,
            md5: None,
            scopes: Vec::new(),
        }
    }

    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_sha1(mut self, sha1: impl Into<String>) -> Self {
        self.sha1 = Some(sha1.into());
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.push(scope.into());
        self
    }
}

impl Identified for Dependency {
    fn identity(&self) -> IdentityKey {
        IdentityKey {
            name: self.id.clone(),
            kind: self.kind.clone(),
            sha1: self.sha1.clone(),
        }
    }
}

/// Build-on-build edge. Repeats are legitimate and kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDependency {
    pub name: String,
    pub number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl BuildDependency {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
            started: None,
            url: None,
        }
    }
}

/// Group of artifacts and dependencies published under one id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,

    #[serde(default)]
    pub artifacts: Vec<Artifact>,

    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Module {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            artifacts: Vec::new(),
            dependencies: Vec::new(),
        }
    }
}

/// Insertion-ordered set keyed by [`IdentityKey`], first write wins.
///
/// Inserting an entry whose key is already present is a no-op; the stored
/// value is never replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySet<T> {
    items: Vec<T>,
    keys: HashSet<IdentityKey>,
}

impl<T> Default for IdentitySet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            keys: HashSet::new(),
        }
    }
}

impl<T: Identified> IdentitySet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless an entry with the same identity exists.
    ///
    /// Returns true if the item was added.
    pub fn insert(&mut self, item: T) -> bool {
        if !self.keys.insert(item.identity()) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.keys.contains(key)
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&T> {
        if !self.contains(key) {
            return None;
        }
        self.items.iter().find(|item| &item.identity() == key)
    }
}

impl<T> IdentitySet<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Identified> Extend<T> for IdentitySet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<T: Identified> FromIterator<T> for IdentitySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a, T> IntoIterator for &'a IdentitySet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize> Serialize for IdentitySet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + Identified> Deserialize<'de> for IdentitySet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}
