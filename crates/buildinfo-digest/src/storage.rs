//! Digest ↔ storage file name mapping.

use crate::{Digest, SEPARATOR};

/// Separator replacing `:` in storage names.
pub const STORAGE_SEPARATOR: &str = "__";

/// Storage name of the manifest document. An image stores exactly one.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Map a digest to a filesystem-safe name: `algorithm__hex`.
///
/// Self-hash digests always map to `manifest.json` regardless of their hex.
pub fn to_storage_name(digest: &Digest) -> String {
    if digest.is_self_hash() {
        return MANIFEST_FILE_NAME.to_string();
    }
    format!("{}{}{}", digest.algorithm(), STORAGE_SEPARATOR, digest.value())
}

/// Inverse of [`to_storage_name`]: replace the first `__` with `:`.
///
/// Names without `__` are returned unchanged.
pub fn from_storage_name(name: &str) -> String {
    name.replacen(STORAGE_SEPARATOR, &SEPARATOR.to_string(), 1)
}
