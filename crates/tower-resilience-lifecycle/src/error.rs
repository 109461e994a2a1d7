//! Errors produced by component lifecycle orchestration.

use std::error::Error as StdError;
use std::fmt;

/// A component's failure, tagged with the name it registered under.
#[derive(Debug)]
pub struct ComponentError {
    pub(crate) name: String,
    pub(crate) source: Box<dyn StdError + Send + Sync>,
}

impl ComponentError {
    /// Wraps `source` with the name of the component that returned it.
    pub fn new(name: impl Into<String>, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }

    /// The name of the component that failed.
    pub fn component_name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component \"{}\" failed: {}", self.name, self.source)
    }
}

impl StdError for ComponentError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}
