use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("No record with id {id} in the {index} index")]
    BadIndex { index: &'static str, id: i64 },

    #[error("Invalid argument: {0}")]
    InvalidArg(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Cursor exhausted")]
    Done,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn feature(id: i64) -> Self {
        StoreError::BadIndex {
            index: "feature",
            id,
        }
    }

    pub(crate) fn feature_set(id: i64) -> Self {
        StoreError::BadIndex {
            index: "feature set",
            id,
        }
    }

    /// True for the `BadIndex` kind
    pub fn is_bad_index(&self) -> bool {
        matches!(self, StoreError::BadIndex { .. })
    }

    /// True for the `Unsupported` kind
    pub fn is_unsupported(&self) -> bool {
        matches!(self, StoreError::Unsupported(_))
    }
}

impl From<toml::de::Error> for StoreError {
    fn from(e: toml::de::Error) -> Self {
        StoreError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Config(e.to_string())
    }
}

impl From<validator::ValidationErrors> for StoreError {
    fn from(e: validator::ValidationErrors) -> Self {
        StoreError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
