//! Query parameter descriptors
//!
//! Empty collections mean "no constraint". Resolution bounds use NaN (or 0)
//! for "unbounded". String filters are wildcard patterns.

use super::geometry::{Geometry, GeometryType};
use super::record::{FeatureId, FeatureSetId};

/// True if `value` is a usable resolution threshold (not NaN, not zero)
pub fn is_valid_resolution(value: f64) -> bool {
    value != 0.0 && !value.is_nan()
}

/// Parameters for feature queries
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureQueryParameters {
    pub feature_ids: Vec<FeatureId>,
    pub feature_names: Vec<String>,
    pub feature_set_ids: Vec<FeatureSetId>,
    /// Owning feature-set name patterns
    pub feature_sets: Vec<String>,
    pub providers: Vec<String>,
    pub types: Vec<String>,
    pub geometry_types: Vec<GeometryType>,
    pub spatial_filter: Option<Geometry>,
    pub min_resolution: f64,
    pub max_resolution: f64,
    pub visible_only: bool,
    pub offset: usize,
    /// `None` is unlimited
    pub limit: Option<usize>,
}

impl Default for FeatureQueryParameters {
    fn default() -> Self {
        FeatureQueryParameters {
            feature_ids: Vec::new(),
            feature_names: Vec::new(),
            feature_set_ids: Vec::new(),
            feature_sets: Vec::new(),
            providers: Vec::new(),
            types: Vec::new(),
            geometry_types: Vec::new(),
            spatial_filter: None,
            min_resolution: f64::NAN,
            max_resolution: f64::NAN,
            visible_only: false,
            offset: 0,
            limit: None,
        }
    }
}

impl FeatureQueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feature_ids<I: IntoIterator<Item = FeatureId>>(mut self, ids: I) -> Self {
        self.feature_ids = ids.into_iter().collect();
        self
    }

    pub fn feature_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn feature_set_ids<I: IntoIterator<Item = FeatureSetId>>(mut self, ids: I) -> Self {
        self.feature_set_ids = ids.into_iter().collect();
        self
    }

    pub fn feature_sets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_sets = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn geometry_types<I: IntoIterator<Item = GeometryType>>(mut self, types: I) -> Self {
        self.geometry_types = types.into_iter().collect();
        self
    }

    pub fn spatial_filter(mut self, geometry: Geometry) -> Self {
        self.spatial_filter = Some(geometry);
        self
    }

    pub fn resolution(mut self, min_resolution: f64, max_resolution: f64) -> Self {
        self.min_resolution = min_resolution;
        self.max_resolution = max_resolution;
        self
    }

    pub fn visible_only(mut self, visible_only: bool) -> Self {
        self.visible_only = visible_only;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True if filtering needs a lookup into the owning feature set
    pub fn has_set_scoped_filter(&self) -> bool {
        !self.feature_sets.is_empty()
            || !self.providers.is_empty()
            || !self.types.is_empty()
            || is_valid_resolution(self.min_resolution)
            || is_valid_resolution(self.max_resolution)
            || self.visible_only
    }

    /// True if either resolution bound is set and finite
    pub fn has_finite_resolution_bound(&self) -> bool {
        let finite = |v: f64| is_valid_resolution(v) && v.is_finite();
        finite(self.min_resolution) || finite(self.max_resolution)
    }
}

/// Parameters for feature-set queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSetQueryParameters {
    pub ids: Vec<FeatureSetId>,
    pub names: Vec<String>,
    pub providers: Vec<String>,
    pub types: Vec<String>,
    pub visible_only: bool,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl FeatureSetQueryParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids<I: IntoIterator<Item = FeatureSetId>>(mut self, ids: I) -> Self {
        self.ids = ids.into_iter().collect();
        self
    }

    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn providers<I, S>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.providers = providers.into_iter().map(Into::into).collect();
        self
    }

    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn visible_only(mut self, visible_only: bool) -> Self {
        self.visible_only = visible_only;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
