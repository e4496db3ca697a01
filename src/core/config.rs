//! Store configuration
//!
//! Both configs deserialize from TOML or JSON with every field optional
//! (missing fields take their defaults) and are validated after loading.
//!
//! ```toml
//! wildcard = "*"
//! pattern_cache_capacity = 64
//! modification_flags = 65537   # FEATURESET_FEATURE_INSERT only
//! visibility_flags = 3
//! ```

use crate::error::Result;
use crate::flags::{ModificationFlags, VisibilityFlags};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::{Validate, ValidationError};

pub const DEFAULT_WILDCARD: char = '%';
pub const DEFAULT_PATTERN_CACHE_CAPACITY: usize = 256;
pub const DEFAULT_MAX_CLIENT_QUERY_ROWS: usize = 10_000;

fn validate_wildcard(wildcard: &char) -> std::result::Result<(), ValidationError> {
    if wildcard.is_whitespace() || wildcard.is_control() {
        return Err(ValidationError::new("wildcard_must_be_printable"));
    }
    Ok(())
}

/// Configuration for a gated in-memory store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StoreConfig {
    pub modification_flags: ModificationFlags,
    pub visibility_flags: VisibilityFlags,
    #[validate(custom(function = "validate_wildcard"))]
    pub wildcard: char,
    #[validate(range(min = 1))]
    pub pattern_cache_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            modification_flags: ModificationFlags::ALL,
            visibility_flags: VisibilityFlags::ALL,
            wildcard: DEFAULT_WILDCARD,
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: StoreConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` file, or TOML for any other extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        if is_json(path) {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }
}

/// Configuration for the caching layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CachingConfig {
    /// Client queries matching more rows than this are rejected
    #[validate(range(min = 1))]
    pub max_client_query_rows: usize,
    /// Compiled patterns kept for snapshot queries; the wildcard itself
    /// always comes from the backing store
    #[validate(range(min = 1))]
    pub pattern_cache_capacity: usize,
}

impl Default for CachingConfig {
    fn default() -> Self {
        CachingConfig {
            max_client_query_rows: DEFAULT_MAX_CLIENT_QUERY_ROWS,
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
        }
    }
}

impl CachingConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: CachingConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: CachingConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        if is_json(path) {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
