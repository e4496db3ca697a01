//! Feature and feature-set records
//!
//! Records are plain values. The store never mutates a record in place:
//! every change builds a new value and swaps it into the id index.

use super::attributes::{AltitudeMode, AttributeSet, AttributeUpdate, Style};
use super::geometry::Geometry;
use serde::{Deserialize, Serialize};

pub type FeatureId = i64;
pub type FeatureSetId = i64;

/// A named, versioned, geometry-bearing record owned by a feature set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub feature_set_id: FeatureSetId,
    pub name: String,
    pub geometry: Geometry,
    pub altitude_mode: AltitudeMode,
    pub extrude: f64,
    pub style: Option<Style>,
    pub attributes: AttributeSet,
    /// Starts at 1, bumped by every successful update
    pub version: i64,
    /// The feature's own visibility flag; see `visible_generation`
    pub visible: bool,
    /// Logical clock value stamped when `visible` was last set explicitly
    pub visible_generation: i64,
}

/// Input for inserting a feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDefinition {
    /// `None` lets the store assign the next free id
    pub id: Option<FeatureId>,
    pub feature_set_id: FeatureSetId,
    pub name: String,
    pub geometry: Geometry,
    pub altitude_mode: AltitudeMode,
    pub extrude: f64,
    pub style: Option<Style>,
    pub attributes: AttributeSet,
    /// `None` starts the record at version 1
    pub version: Option<i64>,
}

impl FeatureDefinition {
    pub fn new<S: Into<String>>(feature_set_id: FeatureSetId, name: S, geometry: Geometry) -> Self {
        FeatureDefinition {
            id: None,
            feature_set_id,
            name: name.into(),
            geometry,
            altitude_mode: AltitudeMode::default(),
            extrude: 0.0,
            style: None,
            attributes: AttributeSet::new(),
            version: None,
        }
    }

    pub fn with_id(mut self, id: FeatureId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeSet) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_altitude(mut self, altitude_mode: AltitudeMode, extrude: f64) -> Self {
        self.altitude_mode = altitude_mode;
        self.extrude = extrude;
        self
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }
}

/// A named group of features sharing provider/type metadata and
/// display-resolution thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub id: FeatureSetId,
    pub provider: String,
    pub kind: String,
    pub name: String,
    /// NaN or 0 means unbounded
    pub min_resolution: f64,
    /// NaN or 0 means unbounded
    pub max_resolution: f64,
    pub version: i64,
    pub visible: bool,
    pub visible_generation: i64,
    pub read_only: bool,
}

/// Input for inserting a feature set
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSetDefinition {
    pub id: Option<FeatureSetId>,
    pub provider: String,
    pub kind: String,
    pub name: String,
    pub min_resolution: f64,
    pub max_resolution: f64,
    pub version: Option<i64>,
}

impl FeatureSetDefinition {
    pub fn new<P, K, N>(provider: P, kind: K, name: N) -> Self
    where
        P: Into<String>,
        K: Into<String>,
        N: Into<String>,
    {
        FeatureSetDefinition {
            id: None,
            provider: provider.into(),
            kind: kind.into(),
            name: name.into(),
            min_resolution: f64::NAN,
            max_resolution: f64::NAN,
            version: None,
        }
    }

    pub fn with_id(mut self, id: FeatureSetId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_resolution(mut self, min_resolution: f64, max_resolution: f64) -> Self {
        self.min_resolution = min_resolution;
        self.max_resolution = max_resolution;
        self
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }
}

/// Fields to change on a feature; absent fields are copied from the
/// stored record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureUpdate {
    pub name: Option<String>,
    pub geometry: Option<Geometry>,
    pub altitude: Option<(AltitudeMode, f64)>,
    /// `Some(None)` clears the style
    pub style: Option<Option<Style>>,
    pub attributes: Option<(AttributeSet, AttributeUpdate)>,
}

impl FeatureUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn altitude(mut self, altitude_mode: AltitudeMode, extrude: f64) -> Self {
        self.altitude = Some((altitude_mode, extrude));
        self
    }

    pub fn style(mut self, style: Option<Style>) -> Self {
        self.style = Some(style);
        self
    }

    pub fn attributes(mut self, attributes: AttributeSet, mode: AttributeUpdate) -> Self {
        self.attributes = Some((attributes, mode));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.geometry.is_none()
            && self.altitude.is_none()
            && self.style.is_none()
            && self.attributes.is_none()
    }

    /// Build the replacement record for `old`, bumping its version
    pub(crate) fn apply(&self, old: &Feature) -> Feature {
        let attributes = match &self.attributes {
            Some((attrs, AttributeUpdate::Replace)) => attrs.clone(),
            Some((attrs, AttributeUpdate::AddOrReplace)) => {
                let mut merged = old.attributes.clone();
                merged.merge(attrs);
                merged
            }
            None => old.attributes.clone(),
        };
        let (altitude_mode, extrude) = self.altitude.unwrap_or((old.altitude_mode, old.extrude));

        Feature {
            id: old.id,
            feature_set_id: old.feature_set_id,
            name: self.name.clone().unwrap_or_else(|| old.name.clone()),
            geometry: self.geometry.clone().unwrap_or_else(|| old.geometry.clone()),
            altitude_mode,
            extrude,
            style: self.style.clone().unwrap_or_else(|| old.style.clone()),
            attributes,
            version: old.version + 1,
            visible: old.visible,
            visible_generation: old.visible_generation,
        }
    }
}

/// Fields to change on a feature set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSetUpdate {
    pub name: Option<String>,
    pub resolution: Option<(f64, f64)>,
}

impl FeatureSetUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn resolution(mut self, min_resolution: f64, max_resolution: f64) -> Self {
        self.resolution = Some((min_resolution, max_resolution));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.resolution.is_none()
    }

    pub(crate) fn apply(&self, old: &FeatureSet) -> FeatureSet {
        let (min_resolution, max_resolution) = self
            .resolution
            .unwrap_or((old.min_resolution, old.max_resolution));
        FeatureSet {
            name: self.name.clone().unwrap_or_else(|| old.name.clone()),
            min_resolution,
            max_resolution,
            version: old.version + 1,
            ..old.clone()
        }
    }
}
