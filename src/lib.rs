//! # feature-store - In-memory geospatial feature store
//!
//! `feature-store` keeps named, styled, attributed geometries ("features")
//! grouped into provider-tagged feature sets, and answers filtered queries
//! over them:
//!
//! - **Mutation gate**: capability flags, read-only feature sets, nested
//!   bulk modifications, and coalesced change notification
//! - **Storage engine**: id, name, set-membership, and quadtree spatial
//!   indices kept in lockstep, with generation-stamped visibility overrides
//! - **Caching layer**: serves viewport queries from a slower backing store
//!   while materializing an in-memory snapshot for everything else
//!
//! ## Quick Start
//!
//! ```rust
//! use feature_store::{
//!     collect_features, FeatureDataStore, FeatureDefinition, FeatureQueryParameters,
//!     FeatureSetDefinition, Geometry, Result, StoreBuilder,
//! };
//!
//! # fn main() -> Result<()> {
//! let store = StoreBuilder::new().build()?;
//!
//! let roads = store.insert_feature_set(FeatureSetDefinition::new("kml", "overlay", "roads"))?;
//! let route = store.insert_feature(FeatureDefinition::new(
//!     roads.id,
//!     "Route 66",
//!     Geometry::point(-118.24, 34.05)?,
//! ))?;
//! assert_eq!(route.version, 1);
//!
//! let mut cursor = store.query_features(&FeatureQueryParameters::new().feature_names(["Route%"]))?;
//! let rows = collect_features(cursor.as_mut())?;
//! assert_eq!(rows[0].id, route.id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Caching a slower store
//!
//! ```rust
//! use feature_store::{
//!     CachingConfig, CachingFeatureStore, Envelope, FeatureDataStore, FeatureQueryParameters,
//!     Geometry, Result, StoreBuilder,
//! };
//!
//! # fn main() -> Result<()> {
//! let backing = StoreBuilder::new().build()?;
//! let cache = CachingFeatureStore::with_config(
//!     backing,
//!     CachingConfig { max_client_query_rows: 5_000, ..CachingConfig::default() },
//! )?;
//!
//! // a viewport query goes to the backing store and fills the snapshot
//! let viewport = FeatureQueryParameters::new()
//!     .spatial_filter(Geometry::rectangle(Envelope::new(-10.0, -10.0, 10.0, 10.0))?)
//!     .resolution(f64::NAN, 20.0);
//! let mut cursor = cache.query_features(&viewport)?;
//! while cursor.move_to_next()? {}
//! drop(cursor);
//!
//! assert!(cache.has_snapshot());
//! # Ok(())
//! # }
//! ```

pub mod core;

// Re-export core modules so crate:: paths inside core resolve
#[allow(unused_imports)]
pub(crate) use crate::core::{caching, config, cursor, engine, error, flags, gate, model, store};

pub use crate::core::wildcard;

pub use crate::core::{
    caching::{CacheStats, CachingFeatureStore, MaterializingCursor},
    config::{CachingConfig, StoreConfig},
    cursor::{
        collect_feature_sets, collect_features, FeatureCursor, FeatureCursorPtr, FeatureSetCursor,
        FeatureSetCursorPtr, SnapshotCursor,
    },
    engine::MemoryEngine,
    error::{Result, StoreError},
    flags::{ModificationFlags, VisibilityFlags},
    gate::{GatedStore, StoreEngine},
    model::{
        AltitudeMode, AttributeSet, AttributeUpdate, AttributeValue, Envelope, Feature,
        FeatureDefinition, FeatureId, FeatureQueryParameters, FeatureSet, FeatureSetDefinition,
        FeatureSetId, FeatureSetQueryParameters, FeatureSetUpdate, FeatureUpdate, Geometry,
        GeometryType, LineString, Point, Polygon, Style,
    },
    store::{ContentChangedListener, FeatureDataStore, ListenerPtr},
    wildcard::WildcardMatcher,
};

use std::path::Path;
use tracing::info;
use validator::Validate;

/// The gated in-memory store
pub type MemoryFeatureStore = GatedStore<MemoryEngine>;

/// Builder for a [`MemoryFeatureStore`]
///
/// # Examples
///
/// ```rust
/// use feature_store::{FeatureDataStore, ModificationFlags, StoreBuilder};
///
/// # fn main() -> feature_store::Result<()> {
/// let store = StoreBuilder::new()
///     .modification_flags(ModificationFlags::FEATURESET_INSERT | ModificationFlags::FEATURESET_FEATURE_INSERT)
///     .wildcard('*')
///     .build()?;
/// assert!(!store.modification_flags().contains(ModificationFlags::FEATURESET_DELETE));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    config: StoreConfig,
}

impl StoreBuilder {
    /// A builder with every capability enabled and `%` as the wildcard
    pub fn new() -> Self {
        StoreBuilder {
            config: StoreConfig::default(),
        }
    }

    /// Start from a loaded configuration
    pub fn from_config(config: StoreConfig) -> Self {
        StoreBuilder { config }
    }

    /// Start from a TOML or JSON configuration file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_config(StoreConfig::load(path)?))
    }

    pub fn modification_flags(mut self, flags: ModificationFlags) -> Self {
        self.config.modification_flags = flags;
        self
    }

    pub fn visibility_flags(mut self, flags: VisibilityFlags) -> Self {
        self.config.visibility_flags = flags;
        self
    }

    /// Wildcard character for name, provider, and type patterns
    pub fn wildcard(mut self, wildcard: char) -> Self {
        self.config.wildcard = wildcard;
        self
    }

    /// How many compiled patterns to keep
    pub fn pattern_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.pattern_cache_capacity = capacity;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Validate the configuration and build an empty store
    pub fn build(self) -> Result<MemoryFeatureStore> {
        self.config.validate()?;
        info!(
            "Building feature store (wildcard '{}', modification flags {})",
            self.config.wildcard, self.config.modification_flags
        );
        Ok(GatedStore::new(MemoryEngine::new(), &self.config))
    }
}
