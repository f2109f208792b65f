use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why an external lookup produced nothing.
///
/// All three kinds degrade the same way for the caller (the field stays
/// absent); the tag exists so failures can be aggregated and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Parse,
    NotFound,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "network_error",
            ErrorKind::Parse => "parse_error",
            ErrorKind::NotFound => "not_found",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {detail}")]
pub struct LookupError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl LookupError {
    pub fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Network,
            detail: detail.into(),
        }
    }

    pub fn parse(detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            detail: detail.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            detail: detail.into(),
        }
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LookupError::parse(err.to_string())
        } else {
            LookupError::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, LookupError};

    #[test]
    fn json_errors_are_parse_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let lookup: LookupError = err.into();
        assert_eq!(lookup.kind, ErrorKind::Parse);
    }

    #[test]
    fn display_uses_taxonomy_names() {
        let err = LookupError::not_found("no entity for slug");
        assert_eq!(err.to_string(), "not_found: no entity for slug");
    }
}
