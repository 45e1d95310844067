use serde::{Deserialize, Serialize};
use std::fmt;

/// One unit of work handed to the upload worker: an opaque resource locator.
///
/// The intake never looks inside it; equality is plain value equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItem(String);

impl WorkItem {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for WorkItem {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WorkItem {
    fn from(s: String) -> Self {
        Self(s)
    }
}
