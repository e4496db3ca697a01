//! Record model: features, feature sets, their value types and query
//! descriptors. Pure data, no store behavior.

pub mod attributes;
pub mod geometry;
pub mod query;
pub mod record;

pub use attributes::{AltitudeMode, AttributeSet, AttributeUpdate, AttributeValue, Style};
pub use geometry::{Envelope, Geometry, GeometryType, LineString, Point, Polygon};
pub use query::{is_valid_resolution, FeatureQueryParameters, FeatureSetQueryParameters};
pub use record::{
    Feature, FeatureDefinition, FeatureId, FeatureSet, FeatureSetDefinition, FeatureSetId,
    FeatureSetUpdate, FeatureUpdate,
};
