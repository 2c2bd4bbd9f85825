//! Newtype wrappers for identifiers to ensure type safety.

use std::fmt;
use uuid::Uuid;

use crate::MARKER_PREFIX;

/// Unique identifier for a single render run.
///
/// Generated once per `render` invocation. It tags the run's log lines and
/// names the marker file, so concurrent or past runs never share a marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunId(String);

impl RunId {
    /// Create a new RunId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random RunId.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the completion marker for this run.
    pub fn marker_file_name(&self) -> String {
        format!("{}{}", MARKER_PREFIX, self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
