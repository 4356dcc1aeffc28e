use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Distinct placeholders found per sheet. Sheets with no placeholders are
/// absent from the map.
pub type PlaceholderMap = BTreeMap<String, BTreeSet<String>>;

/// Replacement values keyed by block code, then by placeholder text.
/// Only the first value of each candidate list is ever applied.
pub type ReplacementTable = HashMap<String, HashMap<String, Vec<String>>>;

/// Template-specific errors
#[derive(Debug, Clone)]
pub struct TemplateError {
    pub message: String,
    pub error_type: TemplateErrorType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateErrorType {
    InvalidFormat,
    ReadError,
    WriteError,
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TemplateError {}

impl TemplateError {
    pub fn new(message: impl Into<String>, error_type: TemplateErrorType) -> Self {
        TemplateError {
            message: message.into(),
            error_type,
        }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        TemplateError::new(message, TemplateErrorType::InvalidFormat)
    }

    pub fn read_error(message: impl Into<String>) -> Self {
        TemplateError::new(message, TemplateErrorType::ReadError)
    }

    pub fn write_error(message: impl Into<String>) -> Self {
        TemplateError::new(message, TemplateErrorType::WriteError)
    }
}
