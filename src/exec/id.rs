//! Exec instance identifier type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;

/// Length of the abbreviated form shown in logs.
const SHORT_LEN: usize = 12;

/// Opaque identifier of a server-side exec instance.
///
/// The engine assigns these (typically 64 hex characters). The client only
/// checks that the value can be embedded in a request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExecId(String);

impl ExecId {
    /// Create an ExecId, rejecting empty values and values containing
    /// whitespace or `/`.
    pub fn new(id: impl Into<String>) -> Result<Self, ExecError> {
        let id = id.into();
        if id.is_empty() || id.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(ExecError::InvalidExecId(id));
        }
        Ok(Self(id))
    }

    /// Get the raw string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form, as printed by the engine's CLI.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(SHORT_LEN) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for ExecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ExecId {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ExecId {
    type Error = ExecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExecId> for String {
    fn from(id: ExecId) -> Self {
        id.0
    }
}

impl AsRef<str> for ExecId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
