//! Build identity properties written onto matched index entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between properties.
const PROPERTY_SEPARATOR: char = '|';

/// `build.name=<name>|build.number=<number>|build.timestamp=<epoch-millis>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProperties {
    pub name: String,
    pub number: String,
    pub timestamp_millis: i64,
}

impl BuildProperties {
    pub fn new(name: impl Into<String>, number: impl Into<String>, timestamp_millis: i64) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
            timestamp_millis,
        }
    }

    /// Key/value pairs in write order.
    pub fn pairs(&self) -> [(&'static str, String); 3] {
        [
            ("build.name", self.name.clone()),
            ("build.number", self.number.clone()),
            ("build.timestamp", self.timestamp_millis.to_string()),
        ]
    }
}

impl fmt::Display for BuildProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs().iter().enumerate() {
            if i > 0 {
                write!(f, "{}", PROPERTY_SEPARATOR)?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}
