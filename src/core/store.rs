//! Public feature store contract
//!
//! Implemented by the gated in-memory store and by the caching layer, and
//! required of any backing store the caching layer wraps.

use crate::cursor::{FeatureCursorPtr, FeatureSetCursorPtr};
use crate::error::Result;
use crate::flags::{ModificationFlags, VisibilityFlags};
use crate::model::{
    Feature, FeatureDefinition, FeatureId, FeatureQueryParameters, FeatureSet,
    FeatureSetDefinition, FeatureSetId, FeatureSetQueryParameters, FeatureSetUpdate,
    FeatureUpdate,
};
use std::sync::Arc;

/// Receives coalesced "content changed" notifications
///
/// Called after the store lock is released, so implementations may query
/// the store they are handed.
pub trait ContentChangedListener: Send + Sync {
    fn on_content_changed(&self, store: &dyn FeatureDataStore);
}

pub type ListenerPtr = Arc<dyn ContentChangedListener>;

/// Identity comparison for registered listeners
pub(crate) fn same_listener(a: &ListenerPtr, b: &ListenerPtr) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Feature and feature-set CRUD, query, and visibility contract
pub trait FeatureDataStore: Send + Sync {
    fn modification_flags(&self) -> ModificationFlags;
    fn visibility_flags(&self) -> VisibilityFlags;
    /// Character that matches any run in name, provider, and type patterns
    fn wildcard(&self) -> char;

    /// Register a listener; adding the same listener twice is a no-op
    fn add_content_changed_listener(&self, listener: ListenerPtr);
    fn remove_content_changed_listener(&self, listener: &ListenerPtr);

    /// Open a (nestable) bulk modification region
    fn begin_bulk_modification(&self) -> Result<()>;
    /// Close the innermost region; the outermost close dispatches once
    fn end_bulk_modification(&self, successful: bool) -> Result<()>;
    fn is_in_bulk_modification(&self) -> bool;

    // feature sets
    fn insert_feature_set(&self, def: FeatureSetDefinition) -> Result<FeatureSet>;
    fn update_feature_set(&self, fsid: FeatureSetId, update: &FeatureSetUpdate) -> Result<()>;
    fn delete_feature_set(&self, fsid: FeatureSetId) -> Result<()>;
    fn delete_feature_sets(&self, params: &FeatureSetQueryParameters) -> Result<()>;
    fn delete_all_feature_sets(&self) -> Result<()>;
    fn get_feature_set(&self, fsid: FeatureSetId) -> Result<FeatureSet>;
    fn query_feature_sets(&self, params: &FeatureSetQueryParameters) -> Result<FeatureSetCursorPtr>;
    fn query_feature_sets_count(&self, params: &FeatureSetQueryParameters) -> Result<usize>;

    // features
    fn insert_feature(&self, def: FeatureDefinition) -> Result<Feature>;
    fn update_feature(&self, fid: FeatureId, update: &FeatureUpdate) -> Result<()>;
    fn delete_feature(&self, fid: FeatureId) -> Result<()>;
    fn delete_features(&self, params: &FeatureQueryParameters) -> Result<()>;
    fn delete_all_features(&self, fsid: FeatureSetId) -> Result<()>;
    fn get_feature(&self, fid: FeatureId) -> Result<Feature>;
    fn query_features(&self, params: &FeatureQueryParameters) -> Result<FeatureCursorPtr>;
    fn query_features_count(&self, params: &FeatureQueryParameters) -> Result<usize>;

    // visibility
    fn set_feature_visible(&self, fid: FeatureId, visible: bool) -> Result<()>;
    fn set_features_visible(&self, params: &FeatureQueryParameters, visible: bool) -> Result<()>;
    fn is_feature_visible(&self, fid: FeatureId) -> Result<bool>;
    fn set_feature_set_visible(&self, fsid: FeatureSetId, visible: bool) -> Result<()>;
    fn set_feature_sets_visible(
        &self,
        params: &FeatureSetQueryParameters,
        visible: bool,
    ) -> Result<()>;
    fn is_feature_set_visible(&self, fsid: FeatureSetId) -> Result<bool>;

    // read-only
    fn set_feature_set_read_only(&self, fsid: FeatureSetId, read_only: bool) -> Result<()>;
    fn set_feature_sets_read_only(
        &self,
        params: &FeatureSetQueryParameters,
        read_only: bool,
    ) -> Result<()>;
    fn is_feature_set_read_only(&self, fsid: FeatureSetId) -> Result<bool>;
    fn is_feature_read_only(&self, fid: FeatureId) -> Result<bool>;

    // lifecycle
    fn is_available(&self) -> bool;
    fn refresh(&self) -> Result<()>;
    fn close(&self) -> Result<()>;
}
