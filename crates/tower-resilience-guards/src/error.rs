//! Configuration errors shared by the inbound guards.

use std::fmt;

/// A configuration value rejected at construction time.
///
/// Every guard in this crate validates its configuration up front (§4.5,
/// §4.7): an invalid CIDR, an empty origin allow-list, or a zero body cap
/// is a programmer error caught before the guard ever sees a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub(crate) String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid guard configuration: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}
