//! In-memory multi-index storage engine
//!
//! Records live in two canonical id indices (`BTreeMap<id, Arc<_>>`). Every
//! other structure (name indices, the spatial quadtree, per-set membership)
//! holds ids only and is updated in the same `&mut self` call as the id
//! index, so the indices never disagree once a primitive returns.
//!
//! Records are immutable values: an update builds a new record and swaps
//! the map entry. Visibility and read-only toggles go through
//! `Arc::make_mut`, so rows already handed to an open cursor never change.

pub mod filter;
pub mod index;
pub mod quadtree;

pub use index::NameIndex;
pub use quadtree::SpatialIndex;

use crate::error::{Result, StoreError};
use crate::gate::StoreEngine;
use crate::model::{
    Feature, FeatureDefinition, FeatureId, FeatureQueryParameters, FeatureSet,
    FeatureSetDefinition, FeatureSetId, FeatureSetQueryParameters, FeatureSetUpdate,
    FeatureUpdate,
};
use crate::wildcard::WildcardMatcher;
use ahash::AHashSet;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

use filter::{effective_visibility, resolution_compatible};

#[derive(Debug, Clone)]
struct SetRecord {
    current: Arc<FeatureSet>,
    members: BTreeSet<FeatureId>,
}

/// The in-memory engine behind [`MemoryFeatureStore`](crate::MemoryFeatureStore)
#[derive(Debug)]
pub struct MemoryEngine {
    features: BTreeMap<FeatureId, Arc<Feature>>,
    feature_sets: BTreeMap<FeatureSetId, SetRecord>,
    feature_names: NameIndex,
    feature_set_names: NameIndex,
    spatial: SpatialIndex,
    next_feature_id: FeatureId,
    next_feature_set_id: FeatureSetId,
    /// Logical clock for visibility stamps
    visible_generation: i64,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        MemoryEngine::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        MemoryEngine {
            features: BTreeMap::new(),
            feature_sets: BTreeMap::new(),
            feature_names: NameIndex::new(),
            feature_set_names: NameIndex::new(),
            spatial: SpatialIndex::default(),
            next_feature_id: 1,
            next_feature_set_id: 1,
            visible_generation: 1,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn feature_set_count(&self) -> usize {
        self.feature_sets.len()
    }

    /// Pick the id for a new record and advance the next-free counter.
    ///
    /// The counter always points at a free id: it is bumped past explicit
    /// ids that land on it and skips occupied ids when advancing.
    fn allocate_id<V>(
        index: &BTreeMap<i64, V>,
        next: &mut i64,
        requested: Option<i64>,
        kind: &str,
    ) -> Result<i64> {
        let id = match requested {
            None => *next,
            Some(id) if id == *next => id,
            Some(id) => {
                if index.contains_key(&id) {
                    return Err(StoreError::InvalidArg(format!(
                        "{} id {} already exists",
                        kind, id
                    )));
                }
                return Ok(id);
            }
        };
        loop {
            *next += 1;
            if !index.contains_key(&*next) {
                break;
            }
        }
        Ok(id)
    }

    fn tick(&mut self) -> i64 {
        let generation = self.visible_generation;
        self.visible_generation += 1;
        generation
    }

    fn set_record(&self, fsid: FeatureSetId) -> Result<&SetRecord> {
        self.feature_sets
            .get(&fsid)
            .ok_or_else(|| StoreError::feature_set(fsid))
    }

    fn install_feature_set(&mut self, record: FeatureSet) -> Arc<FeatureSet> {
        let record = Arc::new(record);
        self.feature_set_names.insert(&record.name, record.id);
        self.feature_sets.insert(
            record.id,
            SetRecord {
                current: record.clone(),
                members: BTreeSet::new(),
            },
        );
        record
    }

    fn install_feature(&mut self, record: Feature) -> Result<Arc<Feature>> {
        let set = self
            .feature_sets
            .get_mut(&record.feature_set_id)
            .ok_or_else(|| StoreError::feature_set(record.feature_set_id))?;
        set.members.insert(record.id);

        let record = Arc::new(record);
        self.feature_names.insert(&record.name, record.id);
        self.spatial.insert(record.id, record.geometry.envelope());
        self.features.insert(record.id, record.clone());
        Ok(record)
    }

    /// Four-way removal of a feature; `None` if the id is unknown
    fn remove_feature(&mut self, fid: FeatureId) -> Option<Arc<Feature>> {
        let record = self.features.remove(&fid)?;
        self.spatial.remove(fid);
        self.feature_names.remove(&record.name, fid);
        if let Some(set) = self.feature_sets.get_mut(&record.feature_set_id) {
            set.members.remove(&fid);
        }
        Some(record)
    }

    /// Insert a copy of an existing record, keeping its id, version and
    /// visibility stamp. Used to seed and mirror cache snapshots.
    pub fn restore_feature_set(&mut self, record: &FeatureSet) -> Result<Arc<FeatureSet>> {
        if self.feature_sets.contains_key(&record.id) {
            return Err(StoreError::InvalidArg(format!(
                "feature set id {} already exists",
                record.id
            )));
        }
        Self::allocate_id(
            &self.feature_sets,
            &mut self.next_feature_set_id,
            Some(record.id),
            "feature set",
        )?;
        self.visible_generation = self.visible_generation.max(record.visible_generation + 1);
        Ok(self.install_feature_set(record.clone()))
    }

    /// Feature counterpart of [`restore_feature_set`](Self::restore_feature_set)
    pub fn restore_feature(&mut self, record: &Feature) -> Result<Arc<Feature>> {
        self.set_record(record.feature_set_id)?;
        if self.features.contains_key(&record.id) {
            return Err(StoreError::InvalidArg(format!(
                "feature id {} already exists",
                record.id
            )));
        }
        Self::allocate_id(
            &self.features,
            &mut self.next_feature_id,
            Some(record.id),
            "feature",
        )?;
        self.visible_generation = self.visible_generation.max(record.visible_generation + 1);
        self.install_feature(record.clone())
    }

    fn feature_candidates(
        &self,
        params: &FeatureQueryParameters,
        matcher: &WildcardMatcher,
    ) -> Vec<FeatureId> {
        if !params.feature_ids.is_empty() {
            let mut ids = params.feature_ids.clone();
            ids.sort_unstable();
            ids.dedup();
            return ids;
        }

        let mut ids: Vec<FeatureId> = if !params.feature_set_ids.is_empty() {
            params
                .feature_set_ids
                .iter()
                .filter_map(|fsid| self.feature_sets.get(fsid))
                .flat_map(|set| set.members.iter().copied())
                .collect()
        } else if !params.feature_names.is_empty()
            && !params.feature_names.iter().any(|n| matcher.is_pattern(n))
        {
            params
                .feature_names
                .iter()
                .flat_map(|name| self.feature_names.get(name))
                .collect()
        } else if let Some(region) = &params.spatial_filter {
            self.spatial.query(&region.envelope())
        } else {
            // id index is already ordered
            return self.features.keys().copied().collect();
        };
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn accepts_feature(
        &self,
        feature: &Feature,
        params: &FeatureQueryParameters,
        matcher: &WildcardMatcher,
    ) -> Result<bool> {
        if !params.feature_set_ids.is_empty()
            && !params.feature_set_ids.contains(&feature.feature_set_id)
        {
            return Ok(false);
        }
        if !params.geometry_types.is_empty()
            && !params.geometry_types.contains(&feature.geometry.geometry_type())
        {
            return Ok(false);
        }
        if let Some(region) = &params.spatial_filter {
            if !region.envelope().intersects(&feature.geometry.envelope()) {
                return Ok(false);
            }
        }
        if !matcher.matches_any(&params.feature_names, &feature.name)? {
            return Ok(false);
        }

        if params.has_set_scoped_filter() {
            let set = &self.set_record(feature.feature_set_id)?.current;
            if !resolution_compatible(set, params.min_resolution, params.max_resolution) {
                return Ok(false);
            }
            if params.visible_only && !effective_visibility(feature, set) {
                return Ok(false);
            }
            if !matcher.matches_any(&params.feature_sets, &set.name)?
                || !matcher.matches_any(&params.providers, &set.provider)?
                || !matcher.matches_any(&params.types, &set.kind)?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Feature sets come back in the order the caller listed ids or names;
    /// only the full scan is in id order
    fn feature_set_candidates(
        &self,
        params: &FeatureSetQueryParameters,
        matcher: &WildcardMatcher,
    ) -> Vec<FeatureSetId> {
        let listed: Box<dyn Iterator<Item = FeatureSetId> + '_> = if !params.ids.is_empty() {
            Box::new(params.ids.iter().copied())
        } else if !params.names.is_empty() && !params.names.iter().any(|n| matcher.is_pattern(n)) {
            Box::new(
                params
                    .names
                    .iter()
                    .flat_map(|name| self.feature_set_names.get(name)),
            )
        } else {
            return self.feature_sets.keys().copied().collect();
        };
        let mut seen = AHashSet::new();
        listed.filter(|fsid| seen.insert(*fsid)).collect()
    }

    fn accepts_feature_set(
        &self,
        set: &FeatureSet,
        params: &FeatureSetQueryParameters,
        matcher: &WildcardMatcher,
    ) -> Result<bool> {
        Ok((!params.visible_only || set.visible)
            && matcher.matches_any(&params.names, &set.name)?
            && matcher.matches_any(&params.providers, &set.provider)?
            && matcher.matches_any(&params.types, &set.kind)?)
    }

    /// Check that every secondary index agrees with the id indices
    pub fn verify_indices(&self) -> Result<()> {
        let broken = |what: String| Err(StoreError::Internal(what));

        if self.feature_names.len() != self.features.len() {
            return broken("feature name index size mismatch".into());
        }
        if self.feature_set_names.len() != self.feature_sets.len() {
            return broken("feature set name index size mismatch".into());
        }
        for (name, id) in self.feature_names.iter() {
            match self.features.get(&id) {
                Some(f) if f.name == name => {}
                _ => return broken(format!("stale feature name entry {} -> {}", name, id)),
            }
        }
        for (name, id) in self.feature_set_names.iter() {
            match self.feature_sets.get(&id) {
                Some(s) if s.current.name == name => {}
                _ => return broken(format!("stale feature set name entry {} -> {}", name, id)),
            }
        }

        let mut members = 0;
        for (fsid, set) in &self.feature_sets {
            for fid in &set.members {
                match self.features.get(fid) {
                    Some(f) if f.feature_set_id == *fsid => members += 1,
                    _ => return broken(format!("stale member {} in set {}", fid, fsid)),
                }
            }
        }
        if members != self.features.len() {
            return broken("membership does not cover every feature".into());
        }

        for (fid, feature) in &self.features {
            if !self.feature_sets.contains_key(&feature.feature_set_id) {
                return broken(format!("feature {} has no owning set", fid));
            }
            let indexed = self.spatial.contains(*fid);
            if indexed == feature.geometry.envelope().is_empty() {
                return broken(format!("spatial entry mismatch for feature {}", fid));
            }
        }
        if self.features.contains_key(&self.next_feature_id)
            || self.feature_sets.contains_key(&self.next_feature_set_id)
        {
            return broken("next free id is occupied".into());
        }
        Ok(())
    }
}

fn page<T>(
    rows: impl Iterator<Item = Result<Option<Arc<T>>>>,
    offset: usize,
    limit: Option<usize>,
) -> Result<Vec<Arc<T>>> {
    let limit = limit.unwrap_or(usize::MAX);
    let mut out = Vec::new();
    if limit == 0 {
        return Ok(out);
    }
    let mut skip = offset;
    for row in rows {
        let Some(row) = row? else {
            continue;
        };
        if skip > 0 {
            skip -= 1;
            continue;
        }
        out.push(row);
        if out.len() == limit {
            break;
        }
    }
    Ok(out)
}

impl StoreEngine for MemoryEngine {
    fn insert_feature_set(&mut self, def: FeatureSetDefinition) -> Result<Arc<FeatureSet>> {
        let id = Self::allocate_id(
            &self.feature_sets,
            &mut self.next_feature_set_id,
            def.id,
            "feature set",
        )?;
        debug!("Inserting feature set {} '{}'", id, def.name);
        Ok(self.install_feature_set(FeatureSet {
            id,
            provider: def.provider,
            kind: def.kind,
            name: def.name,
            min_resolution: def.min_resolution,
            max_resolution: def.max_resolution,
            version: def.version.unwrap_or(1),
            visible: true,
            visible_generation: 0,
            read_only: false,
        }))
    }

    fn update_feature_set(&mut self, fsid: FeatureSetId, update: &FeatureSetUpdate) -> Result<()> {
        let record = self
            .feature_sets
            .get_mut(&fsid)
            .ok_or_else(|| StoreError::feature_set(fsid))?;
        let old = record.current.clone();
        let new = Arc::new(update.apply(&old));
        self.feature_set_names.rename(&old.name, &new.name, fsid);
        record.current = new;
        Ok(())
    }

    fn delete_feature_set(&mut self, fsid: FeatureSetId) -> Result<()> {
        let members: Vec<FeatureId> = self.set_record(fsid)?.members.iter().copied().collect();
        for fid in members {
            self.remove_feature(fid);
        }
        if let Some(record) = self.feature_sets.remove(&fsid) {
            self.feature_set_names.remove(&record.current.name, fsid);
        }
        debug!("Deleted feature set {}", fsid);
        Ok(())
    }

    fn delete_all_feature_sets(&mut self) -> Result<()> {
        self.features.clear();
        self.feature_sets.clear();
        self.feature_names.clear();
        self.feature_set_names.clear();
        self.spatial.clear();
        Ok(())
    }

    fn get_feature_set(&self, fsid: FeatureSetId) -> Result<Arc<FeatureSet>> {
        Ok(self.set_record(fsid)?.current.clone())
    }

    fn query_feature_sets(
        &self,
        params: &FeatureSetQueryParameters,
        matcher: &WildcardMatcher,
    ) -> Result<Vec<Arc<FeatureSet>>> {
        let candidates = self.feature_set_candidates(params, matcher);
        let rows = candidates.into_iter().map(|fsid| {
            let Some(record) = self.feature_sets.get(&fsid) else {
                return Ok(None);
            };
            let accepted = self.accepts_feature_set(&record.current, params, matcher)?;
            Ok(accepted.then(|| record.current.clone()))
        });
        page(rows, params.offset, params.limit)
    }

    fn insert_feature(&mut self, def: FeatureDefinition) -> Result<Arc<Feature>> {
        self.set_record(def.feature_set_id)?;
        let id = Self::allocate_id(&self.features, &mut self.next_feature_id, def.id, "feature")?;
        self.install_feature(Feature {
            id,
            feature_set_id: def.feature_set_id,
            name: def.name,
            geometry: def.geometry,
            altitude_mode: def.altitude_mode,
            extrude: def.extrude,
            style: def.style,
            attributes: def.attributes,
            version: def.version.unwrap_or(1),
            visible: true,
            visible_generation: 0,
        })
    }

    fn update_feature(&mut self, fid: FeatureId, update: &FeatureUpdate) -> Result<()> {
        let old = self.get_feature(fid)?;
        let new = Arc::new(update.apply(&old));

        if old.name != new.name {
            self.feature_names.rename(&old.name, &new.name, fid);
        }
        if update.geometry.is_some() {
            self.spatial.insert(fid, new.geometry.envelope());
        }
        self.features.insert(fid, new);
        Ok(())
    }

    fn delete_feature(&mut self, fid: FeatureId) -> Result<()> {
        self.remove_feature(fid)
            .map(|_| ())
            .ok_or_else(|| StoreError::feature(fid))
    }

    fn delete_all_features(&mut self, fsid: FeatureSetId) -> Result<()> {
        let members: Vec<FeatureId> = self.set_record(fsid)?.members.iter().copied().collect();
        for fid in members {
            self.remove_feature(fid);
        }
        Ok(())
    }

    fn get_feature(&self, fid: FeatureId) -> Result<Arc<Feature>> {
        self.features
            .get(&fid)
            .cloned()
            .ok_or_else(|| StoreError::feature(fid))
    }

    fn query_features(
        &self,
        params: &FeatureQueryParameters,
        matcher: &WildcardMatcher,
    ) -> Result<Vec<Arc<Feature>>> {
        let candidates = self.feature_candidates(params, matcher);
        let rows = candidates.into_iter().map(|fid| {
            let Some(feature) = self.features.get(&fid) else {
                return Ok(None);
            };
            let accepted = self.accepts_feature(feature, params, matcher)?;
            Ok(accepted.then(|| feature.clone()))
        });
        page(rows, params.offset, params.limit)
    }

    fn set_features_visible(&mut self, fids: &[FeatureId], visible: bool) -> Result<()> {
        if let Some(missing) = fids.iter().find(|fid| !self.features.contains_key(fid)) {
            return Err(StoreError::feature(*missing));
        }
        // one stamp for the whole batch
        let generation = self.tick();
        for fid in fids {
            if let Some(entry) = self.features.get_mut(fid) {
                let feature = Arc::make_mut(entry);
                feature.visible = visible;
                feature.visible_generation = generation;
            }
        }
        Ok(())
    }

    fn set_feature_sets_visible(&mut self, fsids: &[FeatureSetId], visible: bool) -> Result<()> {
        if let Some(missing) = fsids.iter().find(|id| !self.feature_sets.contains_key(id)) {
            return Err(StoreError::feature_set(*missing));
        }
        let generation = self.tick();
        for fsid in fsids {
            if let Some(record) = self.feature_sets.get_mut(fsid) {
                let set = Arc::make_mut(&mut record.current);
                set.visible = visible;
                set.visible_generation = generation;
            }
        }
        Ok(())
    }

    fn is_feature_visible(&self, fid: FeatureId) -> Result<bool> {
        let feature = self.get_feature(fid)?;
        let set = &self.set_record(feature.feature_set_id)?.current;
        Ok(effective_visibility(&feature, set))
    }

    fn is_feature_set_visible(&self, fsid: FeatureSetId) -> Result<bool> {
        Ok(self.set_record(fsid)?.current.visible)
    }

    fn set_feature_sets_read_only(&mut self, fsids: &[FeatureSetId], read_only: bool) -> Result<()> {
        if let Some(missing) = fsids.iter().find(|id| !self.feature_sets.contains_key(id)) {
            return Err(StoreError::feature_set(*missing));
        }
        for fsid in fsids {
            if let Some(record) = self.feature_sets.get_mut(fsid) {
                Arc::make_mut(&mut record.current).read_only = read_only;
            }
        }
        Ok(())
    }

    fn is_feature_set_read_only(&self, fsid: FeatureSetId) -> Result<bool> {
        Ok(self.set_record(fsid)?.current.read_only)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Envelope, Geometry, GeometryType};

    fn engine_with_set() -> (MemoryEngine, FeatureSetId) {
        let mut engine = MemoryEngine::new();
        let set = engine
            .insert_feature_set(FeatureSetDefinition::new("kml", "overlay", "roads"))
            .unwrap();
        (engine, set.id)
    }

    fn point(fsid: FeatureSetId, name: &str, x: f64, y: f64) -> FeatureDefinition {
        FeatureDefinition::new(fsid, name, Geometry::point(x, y).unwrap())
    }

    fn ids(rows: &[Arc<Feature>]) -> Vec<FeatureId> {
        rows.iter().map(|f| f.id).collect()
    }

    #[test]
    fn test_id_assignment_skips_explicit_ids() {
        let (mut engine, fsid) = engine_with_set();
        let a = engine.insert_feature(point(fsid, "a", 0.0, 0.0)).unwrap();
        assert_eq!(a.id, 1);

        // explicit id on the counter bumps it
        engine.insert_feature(point(fsid, "b", 0.0, 0.0).with_id(2)).unwrap();
        engine.insert_feature(point(fsid, "c", 0.0, 0.0).with_id(4)).unwrap();
        let d = engine.insert_feature(point(fsid, "d", 0.0, 0.0)).unwrap();
        assert_eq!(d.id, 3);
        let e = engine.insert_feature(point(fsid, "e", 0.0, 0.0)).unwrap();
        assert_eq!(e.id, 5);

        let err = engine.insert_feature(point(fsid, "x", 0.0, 0.0).with_id(4)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidArg(_)));
        engine.verify_indices().unwrap();
    }

    #[test]
    fn test_insert_into_missing_set_changes_nothing() {
        let mut engine = MemoryEngine::new();
        let err = engine.insert_feature(point(42, "a", 0.0, 0.0)).unwrap_err();
        assert!(err.is_bad_index());
        assert_eq!(engine.feature_count(), 0);
        // counter untouched
        let (mut engine, fsid) = engine_with_set();
        assert_eq!(engine.insert_feature(point(fsid, "a", 0.0, 0.0)).unwrap().id, 1);
    }

    #[test]
    fn test_rename_relocates_name_entry() {
        let (mut engine, fsid) = engine_with_set();
        let f = engine.insert_feature(point(fsid, "old", 1.0, 1.0)).unwrap();
        engine.update_feature(f.id, &FeatureUpdate::new().name("new")).unwrap();

        let m = WildcardMatcher::default();
        let by_old = engine
            .query_features(&FeatureQueryParameters::new().feature_names(["old"]), &m)
            .unwrap();
        let by_new = engine
            .query_features(&FeatureQueryParameters::new().feature_names(["new"]), &m)
            .unwrap();
        assert!(by_old.is_empty());
        assert_eq!(ids(&by_new), vec![f.id]);
        assert_eq!(engine.get_feature(f.id).unwrap().version, 2);
        engine.verify_indices().unwrap();
    }

    #[test]
    fn test_geometry_update_moves_spatial_entry() {
        let (mut engine, fsid) = engine_with_set();
        let f = engine.insert_feature(point(fsid, "mover", 10.0, 10.0)).unwrap();
        engine
            .update_feature(
                f.id,
                &FeatureUpdate::new().geometry(Geometry::point(-100.0, -40.0).unwrap()),
            )
            .unwrap();

        let m = WildcardMatcher::default();
        let near_old = FeatureQueryParameters::new()
            .spatial_filter(Geometry::rectangle(Envelope::new(9.0, 9.0, 11.0, 11.0)).unwrap());
        let near_new = FeatureQueryParameters::new()
            .spatial_filter(Geometry::rectangle(Envelope::new(-101.0, -41.0, -99.0, -39.0)).unwrap());
        assert!(engine.query_features(&near_old, &m).unwrap().is_empty());
        assert_eq!(ids(&engine.query_features(&near_new, &m).unwrap()), vec![f.id]);
    }

    #[test]
    fn test_spatial_filter_on_id_path() {
        let (mut engine, fsid) = engine_with_set();
        let a = engine.insert_feature(point(fsid, "a", 0.0, 0.0)).unwrap();
        let b = engine.insert_feature(point(fsid, "b", 50.0, 50.0)).unwrap();

        let params = FeatureQueryParameters::new()
            .feature_ids([a.id, b.id])
            .spatial_filter(Geometry::rectangle(Envelope::new(-1.0, -1.0, 1.0, 1.0)).unwrap());
        let rows = engine.query_features(&params, &WildcardMatcher::default()).unwrap();
        assert_eq!(ids(&rows), vec![a.id]);
    }

    #[test]
    fn test_wildcard_names_fall_back_to_scan() {
        let (mut engine, fsid) = engine_with_set();
        engine.insert_feature(point(fsid, "road 1", 0.0, 0.0)).unwrap();
        engine.insert_feature(point(fsid, "road 2", 0.0, 0.0)).unwrap();
        engine.insert_feature(point(fsid, "river", 0.0, 0.0)).unwrap();

        let rows = engine
            .query_features(
                &FeatureQueryParameters::new().feature_names(["road%"]),
                &WildcardMatcher::default(),
            )
            .unwrap();
        assert_eq!(ids(&rows), vec![1, 2]);
    }

    #[test]
    fn test_geometry_type_filter() {
        let (mut engine, fsid) = engine_with_set();
        engine.insert_feature(point(fsid, "p", 0.0, 0.0)).unwrap();
        engine
            .insert_feature(FeatureDefinition::new(
                fsid,
                "area",
                Geometry::rectangle(Envelope::new(0.0, 0.0, 1.0, 1.0)).unwrap(),
            ))
            .unwrap();

        let rows = engine
            .query_features(
                &FeatureQueryParameters::new().geometry_types([GeometryType::Polygon]),
                &WildcardMatcher::default(),
            )
            .unwrap();
        assert_eq!(ids(&rows), vec![2]);
    }

    #[test]
    fn test_set_scoped_filters() {
        let mut engine = MemoryEngine::new();
        let coarse = engine
            .insert_feature_set(
                FeatureSetDefinition::new("ogr", "shp", "coast").with_resolution(10000.0, 100.0),
            )
            .unwrap();
        let fine = engine
            .insert_feature_set(FeatureSetDefinition::new("kml", "overlay", "trails"))
            .unwrap();
        engine.insert_feature(point(coarse.id, "c", 0.0, 0.0)).unwrap();
        engine.insert_feature(point(fine.id, "f", 0.0, 0.0)).unwrap();
        let m = WildcardMatcher::default();

        let by_provider = engine
            .query_features(&FeatureQueryParameters::new().providers(["og%"]), &m)
            .unwrap();
        assert_eq!(ids(&by_provider), vec![1]);

        // stored max 100 does not reach the requested 1000
        let zoomed = engine
            .query_features(&FeatureQueryParameters::new().resolution(f64::NAN, 1000.0), &m)
            .unwrap();
        assert_eq!(ids(&zoomed), vec![2]);

        let by_set_name = engine
            .query_features(&FeatureQueryParameters::new().feature_sets(["trails"]), &m)
            .unwrap();
        assert_eq!(ids(&by_set_name), vec![2]);
    }

    #[test]
    fn test_visibility_batch_uses_one_generation() {
        let (mut engine, fsid) = engine_with_set();
        engine.insert_feature(point(fsid, "a", 0.0, 0.0)).unwrap();
        engine.insert_feature(point(fsid, "b", 0.0, 0.0)).unwrap();
        engine.set_features_visible(&[1, 2], false).unwrap();

        let a = engine.get_feature(1).unwrap();
        let b = engine.get_feature(2).unwrap();
        assert_eq!(a.visible_generation, b.visible_generation);
        assert!(!engine.is_feature_visible(1).unwrap());

        engine.set_feature_sets_visible(&[fsid], true).unwrap();
        assert!(engine.is_feature_visible(2).unwrap());
    }

    #[test]
    fn test_visibility_batch_with_unknown_id_is_atomic() {
        let (mut engine, fsid) = engine_with_set();
        engine.insert_feature(point(fsid, "a", 0.0, 0.0)).unwrap();
        assert!(engine.set_features_visible(&[1, 99], false).unwrap_err().is_bad_index());
        assert!(engine.get_feature(1).unwrap().visible);
    }

    #[test]
    fn test_snapshot_rows_survive_toggles() {
        let (mut engine, fsid) = engine_with_set();
        engine.insert_feature(point(fsid, "a", 0.0, 0.0)).unwrap();
        let held = engine.get_feature(1).unwrap();
        engine.set_features_visible(&[1], false).unwrap();
        assert!(held.visible);
        assert!(!engine.get_feature(1).unwrap().visible);
    }

    #[test]
    fn test_feature_set_query_paths() {
        let mut engine = MemoryEngine::new();
        for name in ["alpha", "beta", "alpha"] {
            engine
                .insert_feature_set(FeatureSetDefinition::new("p", "t", name))
                .unwrap();
        }
        let m = WildcardMatcher::default();

        let exact = engine
            .query_feature_sets(&FeatureSetQueryParameters::new().names(["alpha"]), &m)
            .unwrap();
        assert_eq!(exact.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 3]);

        let by_id = engine
            .query_feature_sets(&FeatureSetQueryParameters::new().ids([3, 1, 3]), &m)
            .unwrap();
        assert_eq!(by_id.iter().map(|s| s.id).collect::<Vec<_>>(), vec![3, 1]);

        let by_name = engine
            .query_feature_sets(&FeatureSetQueryParameters::new().names(["beta", "alpha"]), &m)
            .unwrap();
        assert_eq!(by_name.iter().map(|s| s.id).collect::<Vec<_>>(), vec![2, 1, 3]);

        let pattern = engine
            .query_feature_sets(&FeatureSetQueryParameters::new().names(["%a"]), &m)
            .unwrap();
        assert_eq!(pattern.len(), 3);

        let paged = engine
            .query_feature_sets(&FeatureSetQueryParameters::new().offset(1).limit(1), &m)
            .unwrap();
        assert_eq!(paged[0].id, 2);

        engine.set_feature_sets_visible(&[2], false).unwrap();
        let visible = engine
            .query_feature_sets(&FeatureSetQueryParameters::new().visible_only(true), &m)
            .unwrap();
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn test_limit_zero_returns_nothing() {
        let (mut engine, fsid) = engine_with_set();
        engine.insert_feature(point(fsid, "a", 0.0, 0.0)).unwrap();
        let rows = engine
            .query_features(&FeatureQueryParameters::new().limit(0), &WildcardMatcher::default())
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_cascade_delete() {
        let (mut engine, fsid) = engine_with_set();
        engine.insert_feature(point(fsid, "a", 0.0, 0.0)).unwrap();
        engine.insert_feature(point(fsid, "b", 5.0, 5.0)).unwrap();
        engine.delete_feature_set(fsid).unwrap();

        assert_eq!(engine.feature_count(), 0);
        assert!(engine.get_feature(1).unwrap_err().is_bad_index());
        engine.verify_indices().unwrap();
        assert!(engine.delete_feature_set(fsid).unwrap_err().is_bad_index());
    }

    #[test]
    fn test_restore_keeps_identity_and_advances_clock() {
        let (mut source, fsid) = engine_with_set();
        source.insert_feature(point(fsid, "a", 0.0, 0.0).with_version(7)).unwrap();
        source.set_features_visible(&[1], false).unwrap();

        let mut copy = MemoryEngine::new();
        copy.restore_feature_set(&source.get_feature_set(fsid).unwrap()).unwrap();
        let original = source.get_feature(1).unwrap();
        copy.restore_feature(&original).unwrap();

        assert_eq!(*copy.get_feature(1).unwrap(), *original);
        assert!(!copy.is_feature_visible(1).unwrap());
        // a later set-level toggle still overrides the restored stamp
        copy.set_feature_sets_visible(&[fsid], true).unwrap();
        assert!(copy.is_feature_visible(1).unwrap());
        // fresh ids continue past the restored ones
        assert_eq!(copy.insert_feature(point(fsid, "b", 0.0, 0.0)).unwrap().id, 2);
        copy.verify_indices().unwrap();
    }
}
