//! In-process artifact index
//!
//! A configurable stand-in for a real artifact index, used by tests and by
//! the CLI when search results come from a file.
//!
//! - `search`: parses the query text and matches stored items by their
//!   `sha256` property or computed sha1
//! - `set_properties`: records every write against a stored item's path
//!
//! Both operations support failure injection.

mod failure;
mod index;

pub use failure::{FailureConfig, FailureInjector, IndexOperation};
pub use index::{MockArtifactIndex, PropertyWrite, StoredItem};
