use crate::constants::{DEFAULT_DOCUMENT_NAME, DOCUMENT_EXTENSION};
use std::fmt;

/// Strip everything except ASCII letters, digits, `_` and `-`.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Base name of the emitted document. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentName(String);

impl DocumentName {
    pub fn new(raw: &str) -> Self {
        let sanitized = sanitize_name(raw);
        if sanitized.is_empty() {
            log::warn!(
                "Output name {:?} has no usable characters, using {}",
                raw,
                DEFAULT_DOCUMENT_NAME
            );
            return Self::default();
        }
        Self(sanitized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `<name>.pdf`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, DOCUMENT_EXTENSION)
    }
}

impl Default for DocumentName {
    fn default() -> Self {
        Self(DEFAULT_DOCUMENT_NAME.to_string())
    }
}

impl fmt::Display for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
