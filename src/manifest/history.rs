//! Dependent-layer counting from the image config `history`.

use serde::Deserialize;

use super::ManifestError;

/// Substring of `created_by` that marks the instruction setting the entrypoint.
pub const ENTRYPOINT_MARKER: &str = "ENTRYPOINT";

#[derive(Debug, Deserialize)]
struct ImageConfigDocument {
    history: Option<Vec<HistoryEntry>>,
}

#[derive(Debug, Default, Deserialize)]
struct HistoryEntry {
    #[serde(default)]
    created_by: Option<String>,

    #[serde(default)]
    empty_layer: Option<bool>,
}

impl HistoryEntry {
    fn is_entrypoint(&self) -> bool {
        self.created_by
            .as_deref()
            .is_some_and(|c| c.contains(ENTRYPOINT_MARKER))
    }

    fn is_empty_layer(&self) -> bool {
        self.empty_layer.unwrap_or(false)
    }
}

/// Count the history entries that carry dependency content.
///
/// Scanning from the newest entry backward, every entry down to and including
/// the most recent `ENTRYPOINT` instruction is dropped. Past that point only
/// entries flagged `empty_layer` are dropped. Without any `ENTRYPOINT` entry
/// the count is zero.
pub fn meaningful_layer_count(image_config: &str) -> Result<usize, ManifestError> {
    let doc: ImageConfigDocument = serde_json::from_str(image_config)?;
    let history = doc
        .history
        .ok_or_else(|| ManifestError::Malformed("history".to_string()))?;

    let mut count = history.len();
    let mut after_last_entrypoint = true;

    for entry in history.iter().rev() {
        if after_last_entrypoint {
            count -= 1;
        } else if entry.is_empty_layer() {
            count -= 1;
        }

        if entry.is_entrypoint() {
            after_last_entrypoint = false;
        }
    }

    Ok(count)
}
