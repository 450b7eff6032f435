//! Artifact Index Types
//!
//! Defines what the build-info core exchanges with an artifact repository's
//! index: the search query mini-language, the result entries it returns, and
//! the build property string written back onto matched entries.

pub mod entry;
pub mod error;
pub mod properties;
pub mod query;

pub use entry::IndexEntry;
pub use error::IndexError;
pub use properties::BuildProperties;
pub use query::{MatchCriterion, MatchField, SearchQuery, DEFAULT_INCLUDE};
