use thiserror::Error;

/// Errors raised by the store collaborators (relational persistence,
/// reference-data lookup, remote legacy source).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entity not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("{0}")]
    Internal(String),
}

/// Fatal conversion errors.
///
/// Any of these aborts the phase that raised it; during the prepare phase
/// that means the whole conversion for the record.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The legacy JSON violates structural expectations, e.g. a cyclic
    /// organization parent chain or a non-object where one is required.
    #[error("malformed legacy data at {path}: {detail}")]
    MalformedInput { path: String, detail: String },

    /// A resolved entity's stored fields disagree with supplied fields.
    /// The stored row is left untouched.
    #[error("conflicting value for field '{field}': {detail}")]
    Conflict { field: String, detail: String },

    /// A required field is absent or has the wrong type.
    #[error("cannot map legacy field at {path}: {detail}")]
    Mapping { path: String, detail: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ConversionError {
    pub fn malformed(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedInput {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn mapping(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Mapping {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn conflict(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Conflict {
            field: field.into(),
            detail: detail.into(),
        }
    }
}

/// A collected, non-fatal post-process failure attached to one legacy
/// entry. Sibling entries keep processing.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EntryError {
    /// Dotted path of the offending legacy entry,
    /// e.g. `research_dataset.creator[2]`.
    pub path: String,
    pub detail: String,
}

impl EntryError {
    pub fn new(path: impl Into<String>, error: &ConversionError) -> Self {
        Self {
            path: path.into(),
            detail: error.to_string(),
        }
    }
}
