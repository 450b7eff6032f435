//! Search query mini-language.
//!
//! A query is a single disjunction of field matches followed by the list of
//! fields to return:
//!
//! ```text
//! items.find({"$or":[{"@sha256":{"$match":"<hex>"}},...]}).include("name","repo","path","actual_sha1")
//! ```

use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::IndexError;

const FIND_PREFIX: &str = "items.find(";
const INCLUDE_INFIX: &str = ").include(";
const OR_KEY: &str = "$or";
const MATCH_KEY: &str = "$match";

/// Fields requested for every result entry.
pub const DEFAULT_INCLUDE: &[&str] = &["name", "repo", "path", "actual_sha1"];

/// Field a criterion matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchField {
    /// The `sha256` property stored on registry blobs.
    Sha256Property,
    /// The checksum the repository computed for the stored file.
    ActualSha1,
}

impl MatchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256Property => "@sha256",
            Self::ActualSha1 => "actual_sha1",
        }
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchField {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "@sha256" => Ok(Self::Sha256Property),
            "actual_sha1" => Ok(Self::ActualSha1),
            other => Err(IndexError::MalformedQuery(format!(
                "unsupported match field '{}'",
                other
            ))),
        }
    }
}

/// One `{field: {"$match": value}}` term of the disjunction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCriterion {
    pub field: MatchField,
    pub value: String,
}

impl MatchCriterion {
    pub fn new(field: MatchField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    /// Exact-value match; wildcards are not used by this crate.
    pub fn matches(&self, field: MatchField, candidate: &str) -> bool {
        self.field == field && self.value == candidate
    }
}

/// Disjunctive search query over the artifact index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    criteria: Vec<MatchCriterion>,
    include: Vec<String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchQuery {
    /// Empty query returning the default field set.
    pub fn new() -> Self {
        Self {
            criteria: Vec::new(),
            include: DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Add a criterion to the disjunction.
    pub fn or_match(mut self, field: MatchField, value: impl Into<String>) -> Self {
        self.push(MatchCriterion::new(field, value));
        self
    }

    pub fn push(&mut self, criterion: MatchCriterion) {
        self.criteria.push(criterion);
    }

    pub fn criteria(&self) -> &[MatchCriterion] {
        &self.criteria
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Render the query text sent to the index.
    pub fn to_query_string(&self) -> String {
        let terms: Vec<Value> = self
            .criteria
            .iter()
            .map(|c| json!({ c.field.as_str(): { MATCH_KEY: c.value } }))
            .collect();
        let find = json!({ OR_KEY: terms });

        let include = self
            .include
            .iter()
            .map(|f| Value::String(f.clone()).to_string())
            .collect::<Vec<_>>()
            .join(",");

        format!("{}{}{}{})", FIND_PREFIX, find, INCLUDE_INFIX, include)
    }

    /// Parse query text produced by [`SearchQuery::to_query_string`].
    pub fn parse(text: &str) -> Result<Self, IndexError> {
        let body = text
            .trim()
            .strip_prefix(FIND_PREFIX)
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| IndexError::MalformedQuery("expected items.find(...)".to_string()))?;

        let (find_text, include_text) = body
            .rsplit_once(INCLUDE_INFIX)
            .ok_or_else(|| IndexError::MalformedQuery("missing .include(...)".to_string()))?;

        let find: Map<String, Value> = serde_json::from_str(find_text)?;
        let terms = find
            .get(OR_KEY)
            .and_then(Value::as_array)
            .ok_or_else(|| IndexError::MalformedQuery(format!("missing '{}' array", OR_KEY)))?;

        let mut criteria = Vec::with_capacity(terms.len());
        for term in terms {
            criteria.push(Self::parse_term(term)?);
        }

        let include: Vec<String> = serde_json::from_str(&format!("[{}]", include_text))?;

        Ok(Self { criteria, include })
    }

    fn parse_term(term: &Value) -> Result<MatchCriterion, IndexError> {
        let object = term
            .as_object()
            .filter(|o| o.len() == 1)
            .ok_or_else(|| IndexError::MalformedQuery(format!("bad term: {}", term)))?;

        // Length checked above.
        let (field, matcher) = object
            .iter()
            .next()
            .ok_or_else(|| IndexError::MalformedQuery(format!("bad term: {}", term)))?;

        let value = matcher
            .get(MATCH_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                IndexError::MalformedQuery(format!("term for '{}' has no {}", field, MATCH_KEY))
            })?;

        Ok(MatchCriterion::new(field.parse()?, value))
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}
