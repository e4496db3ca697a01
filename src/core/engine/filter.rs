//! Row predicates shared by the query paths

use crate::model::{is_valid_resolution, Feature, FeatureSet};

/// Stored minimum must not exceed the requested minimum
pub fn filter_min_resolution(stored: f64, requested: f64) -> bool {
    !is_valid_resolution(stored) || !is_valid_resolution(requested) || stored <= requested
}

/// Stored maximum must cover the requested maximum
pub fn filter_max_resolution(stored: f64, requested: f64) -> bool {
    !is_valid_resolution(stored) || !is_valid_resolution(requested) || stored >= requested
}

/// True if a feature set's display thresholds are compatible with a query
pub fn resolution_compatible(set: &FeatureSet, min_resolution: f64, max_resolution: f64) -> bool {
    filter_min_resolution(set.min_resolution, min_resolution)
        && filter_max_resolution(set.max_resolution, max_resolution)
}

/// Effective visibility of `feature` inside `set`
///
/// The set's flag wins only when it was stamped after the feature's own.
pub fn effective_visibility(feature: &Feature, set: &FeatureSet) -> bool {
    if set.visible_generation > feature.visible_generation {
        set.visible
    } else {
        feature.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AltitudeMode, AttributeSet, Geometry};

    fn set(min: f64, max: f64) -> FeatureSet {
        FeatureSet {
            id: 1,
            provider: "p".into(),
            kind: "t".into(),
            name: "s".into(),
            min_resolution: min,
            max_resolution: max,
            version: 1,
            visible: true,
            visible_generation: 0,
            read_only: false,
        }
    }

    fn feature(visible: bool, generation: i64) -> Feature {
        Feature {
            id: 1,
            feature_set_id: 1,
            name: "f".into(),
            geometry: Geometry::point(0.0, 0.0).unwrap(),
            altitude_mode: AltitudeMode::ClampToGround,
            extrude: 0.0,
            style: None,
            attributes: AttributeSet::new(),
            version: 1,
            visible,
            visible_generation: generation,
        }
    }

    #[test]
    fn test_unbounded_sides_always_pass() {
        assert!(resolution_compatible(&set(f64::NAN, f64::NAN), 10.0, 1.0));
        assert!(resolution_compatible(&set(0.0, 0.0), 10.0, 1.0));
        assert!(resolution_compatible(&set(5000.0, 1.0), f64::NAN, 0.0));
    }

    #[test]
    fn test_threshold_overlap() {
        let s = set(100.0, 10.0);
        assert!(resolution_compatible(&s, 200.0, 5.0));
        assert!(!resolution_compatible(&s, 50.0, 5.0));
        assert!(!resolution_compatible(&s, 200.0, 20.0));
    }

    #[test]
    fn test_effective_visibility() {
        let mut s = set(f64::NAN, f64::NAN);
        let f = feature(false, 3);

        s.visible_generation = 3;
        assert!(!effective_visibility(&f, &s)); // tie: feature wins
        s.visible_generation = 4;
        assert!(effective_visibility(&f, &s));
    }
}
