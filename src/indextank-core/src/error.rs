use std::collections::BTreeMap;
use thiserror::Error;

/// Maximum length of a document identifier, in UTF-8 bytes.
pub const MAX_DOCID_BYTES: usize = 1024;

/// Input rejected on the client side before anything is sent
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("document id must not be empty")]
    DocumentIdEmpty,

    #[error("document id is {len} bytes, limit is {MAX_DOCID_BYTES}")]
    DocumentIdTooLong { len: usize },

    #[error("{name} must be a finite number")]
    NonFiniteValue { name: String },

    #[error("invalid API URL: {0}")]
    InvalidApiUrl(String),
}

/// The server answered a batch call with a different number of outcomes than
/// items submitted, so positions can no longer be matched up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("batch response has {returned} outcomes for {submitted} submitted items")]
pub struct BatchConsistencyError {
    pub submitted: usize,
    pub returned: usize,
}

/// Check a document id against the service's identifier constraints.
pub fn validate_docid(docid: &str) -> Result<(), ValidationError> {
    if docid.is_empty() {
        return Err(ValidationError::DocumentIdEmpty);
    }
    if docid.len() > MAX_DOCID_BYTES {
        return Err(ValidationError::DocumentIdTooLong { len: docid.len() });
    }
    Ok(())
}

/// Scoring variables must be finite; serde_json would encode NaN and
/// infinities as `null`.
pub fn validate_variables(variables: &BTreeMap<u32, f64>) -> Result<(), ValidationError> {
    match variables.iter().find(|(_, value)| !value.is_finite()) {
        Some((slot, _)) => Err(ValidationError::NonFiniteValue {
            name: format!("variable{}", slot),
        }),
        None => Ok(()),
    }
}
