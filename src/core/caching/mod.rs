//! Read-through / write-through cache in front of a backing store
//!
//! Viewport queries (a spatial filter plus at least one finite resolution
//! bound) go to the backing store and are wrapped in a
//! [`MaterializingCursor`]; every row the caller reads is copied into a
//! fresh [`MemoryEngine`], which becomes the cache snapshot when the cursor
//! is dropped. Every other feature query is served from the snapshot alone,
//! and yields nothing until the first snapshot is installed.
//!
//! Mutations go to the backing store first and are replayed against the
//! snapshot only after they succeed. Batch mutations are resolved to ids on
//! the backing store first, so paging picks the same rows in both places. A
//! replay that fails is not reported to the caller; it is logged and counted
//! in [`CacheStats::mirror_failures`]. A snapshot whose build overlapped a
//! mutation is discarded rather than installed.

mod cursor;
mod stats;

pub use cursor::MaterializingCursor;
pub use stats::CacheStats;

use crate::config::CachingConfig;
use crate::cursor::{FeatureCursorPtr, FeatureSetCursorPtr, SnapshotCursor};
use crate::engine::MemoryEngine;
use crate::error::Result;
use crate::flags::{ModificationFlags, VisibilityFlags};
use crate::gate::StoreEngine;
use crate::model::{
    Feature, FeatureDefinition, FeatureId, FeatureQueryParameters, FeatureSet,
    FeatureSetDefinition, FeatureSetId, FeatureSetQueryParameters, FeatureSetUpdate,
    FeatureUpdate,
};
use crate::store::{FeatureDataStore, ListenerPtr};
use crate::wildcard::WildcardMatcher;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use validator::Validate;

#[derive(Default)]
struct CacheState {
    snapshot: Option<MemoryEngine>,
    /// Set by `refresh`; the stale snapshot keeps serving until replaced
    dirty: bool,
    closed: bool,
    /// Bumped by every mutation that reaches the backing store
    epoch: u64,
}

/// State shared with outstanding materializing cursors
pub(crate) struct Shared {
    state: Mutex<CacheState>,
    stats: Mutex<CacheStats>,
}

impl Shared {
    fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Swap in a freshly built snapshot, unless a mutation went through
    /// after `seeded_at`
    pub(crate) fn install(&self, engine: MemoryEngine, seeded_at: u64) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        if state.epoch != seeded_at {
            debug!(
                "Discarding cache snapshot seeded at epoch {} (now {})",
                seeded_at, state.epoch
            );
            state.dirty = true;
            drop(state);
            self.stats.lock().record_snapshot_discarded();
            return;
        }
        debug!(
            "Installing cache snapshot ({} feature sets, {} features)",
            engine.feature_set_count(),
            engine.feature_count()
        );
        state.snapshot = Some(engine);
        state.dirty = false;
        drop(state);
        self.stats.lock().record_snapshot_installed();
    }
}

/// A [`FeatureDataStore`] that caches viewport queries against a slower
/// backing store
pub struct CachingFeatureStore<C: FeatureDataStore> {
    client: C,
    shared: Arc<Shared>,
    config: CachingConfig,
    matcher: WildcardMatcher,
}

impl<C: FeatureDataStore> CachingFeatureStore<C> {
    pub fn new(client: C) -> Self {
        Self::build(client, CachingConfig::default())
    }

    pub fn with_config(client: C, config: CachingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(client, config))
    }

    fn build(client: C, config: CachingConfig) -> Self {
        debug!(
            "Creating caching store (client query ceiling {}, wildcard '{}')",
            config.max_client_query_rows,
            client.wildcard()
        );
        let matcher = WildcardMatcher::new(client.wildcard(), config.pattern_cache_capacity);
        CachingFeatureStore {
            client,
            shared: Arc::new(Shared {
                state: Mutex::new(CacheState::default()),
                stats: Mutex::new(CacheStats::new()),
            }),
            matcher,
            config,
        }
    }

    /// The backing store
    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &CachingConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.shared.stats.lock().clone()
    }

    pub fn has_snapshot(&self) -> bool {
        self.shared.state.lock().snapshot.is_some()
    }

    /// True between `refresh` and the next snapshot install
    pub fn is_dirty(&self) -> bool {
        self.shared.state.lock().dirty
    }

    /// Features held by the current snapshot, if any
    pub fn snapshot_feature_count(&self) -> Option<usize> {
        self.shared
            .state
            .lock()
            .snapshot
            .as_ref()
            .map(MemoryEngine::feature_count)
    }

    fn is_client_query(params: &FeatureQueryParameters) -> bool {
        params.spatial_filter.is_some() && params.has_finite_resolution_bound()
    }

    fn query_client(&self, params: &FeatureQueryParameters) -> Result<FeatureCursorPtr> {
        self.shared.stats.lock().record_client_query();

        let count = self.client.query_features_count(params)?;
        if count > self.config.max_client_query_rows {
            warn!(
                "Client query matches {} features, over the ceiling of {}; returning no rows",
                count, self.config.max_client_query_rows
            );
            self.shared.stats.lock().record_rejected_client_query();
            return Ok(Box::new(SnapshotCursor::<Feature>::empty()));
        }

        let seeded_at = self.shared.epoch();
        let mut engine = MemoryEngine::new();
        let mut sets = self
            .client
            .query_feature_sets(&FeatureSetQueryParameters::new())?;
        while sets.move_to_next()? {
            engine.restore_feature_set(sets.get()?)?;
        }

        let inner = self.client.query_features(params)?;
        Ok(Box::new(MaterializingCursor::new(
            inner,
            engine,
            seeded_at,
            self.shared.clone(),
        )))
    }

    fn query_snapshot(&self, params: &FeatureQueryParameters) -> Result<Vec<Arc<Feature>>> {
        self.shared.stats.lock().record_cache_query();
        let state = self.shared.state.lock();
        match state.snapshot.as_ref() {
            Some(engine) => engine.query_features(params, &self.matcher),
            None => Ok(Vec::new()),
        }
    }

    /// Replay a mutation that already succeeded on the backing store
    fn mirror(&self, what: &str, f: impl FnOnce(&mut MemoryEngine) -> Result<()>) {
        let result = {
            let mut state = self.shared.state.lock();
            state.epoch = state.epoch.wrapping_add(1);
            match state.snapshot.as_mut() {
                Some(engine) => f(engine),
                None => return,
            }
        };
        if let Err(e) = result {
            warn!("Failed to mirror {} into cache snapshot: {}", what, e);
            self.shared.stats.lock().record_mirror_failure();
        }
    }

    /// Like [`mirror`](Self::mirror), skipped when the snapshot never
    /// materialized the feature
    fn mirror_feature(
        &self,
        what: &str,
        fid: FeatureId,
        f: impl FnOnce(&mut MemoryEngine) -> Result<()>,
    ) {
        self.mirror(what, |engine| {
            if engine.get_feature(fid).is_err() {
                return Ok(());
            }
            f(engine)
        })
    }

    /// Ids the backing store selects for a batch mutation
    fn client_feature_ids(&self, params: &FeatureQueryParameters) -> Result<Vec<FeatureId>> {
        let mut cursor = self.client.query_features(params)?;
        let mut ids = Vec::new();
        while cursor.move_to_next()? {
            ids.push(cursor.get()?.id);
        }
        Ok(ids)
    }

    fn client_feature_set_ids(
        &self,
        params: &FeatureSetQueryParameters,
    ) -> Result<Vec<FeatureSetId>> {
        let mut cursor = self.client.query_feature_sets(params)?;
        let mut ids = Vec::new();
        while cursor.move_to_next()? {
            ids.push(cursor.get()?.id);
        }
        Ok(ids)
    }
}

/// The subset of `fids` the snapshot materialized
fn held_features(engine: &MemoryEngine, fids: &[FeatureId]) -> Vec<FeatureId> {
    fids.iter()
        .copied()
        .filter(|fid| engine.get_feature(*fid).is_ok())
        .collect()
}

fn held_feature_sets(engine: &MemoryEngine, fsids: &[FeatureSetId]) -> Vec<FeatureSetId> {
    fsids
        .iter()
        .copied()
        .filter(|fsid| engine.get_feature_set(*fsid).is_ok())
        .collect()
}

impl<C: FeatureDataStore> FeatureDataStore for CachingFeatureStore<C> {
    fn modification_flags(&self) -> ModificationFlags {
        self.client.modification_flags()
    }

    fn visibility_flags(&self) -> VisibilityFlags {
        self.client.visibility_flags()
    }

    fn wildcard(&self) -> char {
        self.client.wildcard()
    }

    fn add_content_changed_listener(&self, listener: ListenerPtr) {
        self.client.add_content_changed_listener(listener)
    }

    fn remove_content_changed_listener(&self, listener: &ListenerPtr) {
        self.client.remove_content_changed_listener(listener)
    }

    fn begin_bulk_modification(&self) -> Result<()> {
        self.client.begin_bulk_modification()
    }

    fn end_bulk_modification(&self, successful: bool) -> Result<()> {
        self.client.end_bulk_modification(successful)
    }

    fn is_in_bulk_modification(&self) -> bool {
        self.client.is_in_bulk_modification()
    }

    fn insert_feature_set(&self, def: FeatureSetDefinition) -> Result<FeatureSet> {
        let inserted = self.client.insert_feature_set(def)?;
        self.mirror("feature set insert", |engine| {
            engine.restore_feature_set(&inserted).map(|_| ())
        });
        Ok(inserted)
    }

    fn update_feature_set(&self, fsid: FeatureSetId, update: &FeatureSetUpdate) -> Result<()> {
        self.client.update_feature_set(fsid, update)?;
        self.mirror("feature set update", |engine| {
            engine.update_feature_set(fsid, update)
        });
        Ok(())
    }

    fn delete_feature_set(&self, fsid: FeatureSetId) -> Result<()> {
        self.client.delete_feature_set(fsid)?;
        self.mirror("feature set delete", |engine| engine.delete_feature_set(fsid));
        Ok(())
    }

    fn delete_feature_sets(&self, params: &FeatureSetQueryParameters) -> Result<()> {
        let fsids = self.client_feature_set_ids(params)?;
        self.client.delete_feature_sets(params)?;
        self.mirror("feature set batch delete", |engine| {
            for fsid in held_feature_sets(engine, &fsids) {
                engine.delete_feature_set(fsid)?;
            }
            Ok(())
        });
        Ok(())
    }

    fn delete_all_feature_sets(&self) -> Result<()> {
        self.client.delete_all_feature_sets()?;
        self.mirror("delete of all feature sets", |engine| {
            engine.delete_all_feature_sets()
        });
        Ok(())
    }

    fn get_feature_set(&self, fsid: FeatureSetId) -> Result<FeatureSet> {
        self.client.get_feature_set(fsid)
    }

    fn query_feature_sets(&self, params: &FeatureSetQueryParameters) -> Result<FeatureSetCursorPtr> {
        self.client.query_feature_sets(params)
    }

    fn query_feature_sets_count(&self, params: &FeatureSetQueryParameters) -> Result<usize> {
        self.client.query_feature_sets_count(params)
    }

    fn insert_feature(&self, def: FeatureDefinition) -> Result<Feature> {
        let inserted = self.client.insert_feature(def)?;
        self.mirror("feature insert", |engine| {
            engine.restore_feature(&inserted).map(|_| ())
        });
        Ok(inserted)
    }

    fn update_feature(&self, fid: FeatureId, update: &FeatureUpdate) -> Result<()> {
        self.client.update_feature(fid, update)?;
        self.mirror_feature("feature update", fid, |engine| {
            engine.update_feature(fid, update)
        });
        Ok(())
    }

    fn delete_feature(&self, fid: FeatureId) -> Result<()> {
        self.client.delete_feature(fid)?;
        self.mirror_feature("feature delete", fid, |engine| engine.delete_feature(fid));
        Ok(())
    }

    fn delete_features(&self, params: &FeatureQueryParameters) -> Result<()> {
        let fids = self.client_feature_ids(params)?;
        self.client.delete_features(params)?;
        self.mirror("feature batch delete", |engine| {
            for fid in held_features(engine, &fids) {
                engine.delete_feature(fid)?;
            }
            Ok(())
        });
        Ok(())
    }

    fn delete_all_features(&self, fsid: FeatureSetId) -> Result<()> {
        self.client.delete_all_features(fsid)?;
        self.mirror("delete of all features", |engine| {
            engine.delete_all_features(fsid)
        });
        Ok(())
    }

    fn get_feature(&self, fid: FeatureId) -> Result<Feature> {
        self.client.get_feature(fid)
    }

    fn query_features(&self, params: &FeatureQueryParameters) -> Result<FeatureCursorPtr> {
        if Self::is_client_query(params) {
            return self.query_client(params);
        }
        let rows = self.query_snapshot(params)?;
        Ok(Box::new(SnapshotCursor::new(rows)))
    }

    fn query_features_count(&self, params: &FeatureQueryParameters) -> Result<usize> {
        if Self::is_client_query(params) {
            return self.client.query_features_count(params);
        }
        Ok(self.query_snapshot(params)?.len())
    }

    fn set_feature_visible(&self, fid: FeatureId, visible: bool) -> Result<()> {
        self.client.set_feature_visible(fid, visible)?;
        self.mirror_feature("feature visibility", fid, |engine| {
            engine.set_features_visible(&[fid], visible)
        });
        Ok(())
    }

    fn set_features_visible(&self, params: &FeatureQueryParameters, visible: bool) -> Result<()> {
        let fids = self.client_feature_ids(params)?;
        self.client.set_features_visible(params, visible)?;
        self.mirror("feature batch visibility", |engine| {
            let held = held_features(engine, &fids);
            engine.set_features_visible(&held, visible)
        });
        Ok(())
    }

    fn is_feature_visible(&self, fid: FeatureId) -> Result<bool> {
        self.client.is_feature_visible(fid)
    }

    fn set_feature_set_visible(&self, fsid: FeatureSetId, visible: bool) -> Result<()> {
        self.client.set_feature_set_visible(fsid, visible)?;
        self.mirror("feature set visibility", |engine| {
            engine.set_feature_sets_visible(&[fsid], visible)
        });
        Ok(())
    }

    fn set_feature_sets_visible(
        &self,
        params: &FeatureSetQueryParameters,
        visible: bool,
    ) -> Result<()> {
        let fsids = self.client_feature_set_ids(params)?;
        self.client.set_feature_sets_visible(params, visible)?;
        self.mirror("feature set batch visibility", |engine| {
            let held = held_feature_sets(engine, &fsids);
            engine.set_feature_sets_visible(&held, visible)
        });
        Ok(())
    }

    fn is_feature_set_visible(&self, fsid: FeatureSetId) -> Result<bool> {
        self.client.is_feature_set_visible(fsid)
    }

    fn set_feature_set_read_only(&self, fsid: FeatureSetId, read_only: bool) -> Result<()> {
        self.client.set_feature_set_read_only(fsid, read_only)?;
        self.mirror("feature set read-only", |engine| {
            engine.set_feature_sets_read_only(&[fsid], read_only)
        });
        Ok(())
    }

    fn set_feature_sets_read_only(
        &self,
        params: &FeatureSetQueryParameters,
        read_only: bool,
    ) -> Result<()> {
        let fsids = self.client_feature_set_ids(params)?;
        self.client.set_feature_sets_read_only(params, read_only)?;
        self.mirror("feature set batch read-only", |engine| {
            let held = held_feature_sets(engine, &fsids);
            engine.set_feature_sets_read_only(&held, read_only)
        });
        Ok(())
    }

    fn is_feature_set_read_only(&self, fsid: FeatureSetId) -> Result<bool> {
        self.client.is_feature_set_read_only(fsid)
    }

    fn is_feature_read_only(&self, fid: FeatureId) -> Result<bool> {
        self.client.is_feature_read_only(fid)
    }

    fn is_available(&self) -> bool {
        self.client.is_available()
    }

    fn refresh(&self) -> Result<()> {
        self.client.refresh()?;
        self.shared.state.lock().dirty = true;
        info!("Caching store refreshed; snapshot marked dirty");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.client.close()?;
        let mut state = self.shared.state.lock();
        state.snapshot = None;
        state.closed = true;
        info!("Caching store closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::cursor::collect_features;
    use crate::gate::GatedStore;
    use crate::model::{Envelope, Geometry};

    type Client = GatedStore<MemoryEngine>;

    fn client_with_points(n: usize) -> (Client, FeatureSetId) {
        let client = GatedStore::new(MemoryEngine::new(), &StoreConfig::default());
        let set = client
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s"))
            .unwrap();
        for i in 0..n {
            let x = i as f64;
            client
                .insert_feature(FeatureDefinition::new(
                    set.id,
                    format!("f{}", i),
                    Geometry::point(x, x).unwrap(),
                ))
                .unwrap();
        }
        (client, set.id)
    }

    fn viewport() -> FeatureQueryParameters {
        FeatureQueryParameters::new()
            .spatial_filter(Geometry::rectangle(Envelope::new(-180.0, -90.0, 180.0, 90.0)).unwrap())
            .resolution(f64::NAN, 10.0)
    }

    fn drain(store: &impl FeatureDataStore, params: &FeatureQueryParameters) -> Vec<FeatureId> {
        let mut cursor = store.query_features(params).unwrap();
        collect_features(cursor.as_mut())
            .unwrap()
            .iter()
            .map(|f| f.id)
            .collect()
    }

    #[test]
    fn test_classification() {
        assert!(CachingFeatureStore::<Client>::is_client_query(&viewport()));
        let no_bound = FeatureQueryParameters::new()
            .spatial_filter(Geometry::point(0.0, 0.0).unwrap());
        assert!(!CachingFeatureStore::<Client>::is_client_query(&no_bound));
        let no_region = FeatureQueryParameters::new().resolution(100.0, 1.0);
        assert!(!CachingFeatureStore::<Client>::is_client_query(&no_region));
    }

    #[test]
    fn test_cache_query_before_snapshot_is_empty() {
        let (client, _) = client_with_points(3);
        let cache = CachingFeatureStore::new(client);
        assert!(drain(&cache, &FeatureQueryParameters::new()).is_empty());
        assert!(!cache.has_snapshot());
        assert_eq!(cache.stats().cache_queries, 1);
    }

    #[test]
    fn test_drained_client_query_installs_snapshot() {
        let (client, _) = client_with_points(3);
        let cache = CachingFeatureStore::new(client);

        assert_eq!(drain(&cache, &viewport()), vec![1, 2, 3]);
        assert_eq!(cache.snapshot_feature_count(), Some(3));

        // served without the backing store
        cache.client().close().unwrap();
        assert_eq!(drain(&cache, &FeatureQueryParameters::new()), vec![1, 2, 3]);

        let stats = cache.stats();
        assert_eq!(stats.client_queries, 1);
        assert_eq!(stats.snapshots_installed, 1);
    }

    #[test]
    fn test_abandoned_cursor_installs_partial_snapshot() {
        let (client, _) = client_with_points(5);
        let cache = CachingFeatureStore::new(client);
        {
            let mut cursor = cache.query_features(&viewport()).unwrap();
            assert!(cursor.move_to_next().unwrap());
            assert!(cursor.move_to_next().unwrap());
        }
        assert_eq!(cache.snapshot_feature_count(), Some(2));
    }

    #[test]
    fn test_ceiling_rejects_large_client_query() {
        let (client, _) = client_with_points(4);
        let config = CachingConfig {
            max_client_query_rows: 3,
            ..CachingConfig::default()
        };
        let cache = CachingFeatureStore::with_config(client, config).unwrap();
        assert!(drain(&cache, &viewport()).is_empty());
        assert_eq!(cache.stats().rejected_client_queries, 1);
        assert!(!cache.has_snapshot());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (client, _) = client_with_points(0);
        let config = CachingConfig {
            max_client_query_rows: 0,
            ..CachingConfig::default()
        };
        assert!(CachingFeatureStore::with_config(client, config).is_err());
    }

    #[test]
    fn test_mutations_mirror_into_snapshot() {
        let (client, fsid) = client_with_points(2);
        let cache = CachingFeatureStore::new(client);
        drain(&cache, &viewport());

        let added = cache
            .insert_feature(FeatureDefinition::new(
                fsid,
                "new",
                Geometry::point(9.0, 9.0).unwrap(),
            ))
            .unwrap();
        cache
            .update_feature(1, &FeatureUpdate::new().name("renamed"))
            .unwrap();
        cache.delete_feature(2).unwrap();

        let names: Vec<String> = {
            let mut cursor = cache.query_features(&FeatureQueryParameters::new()).unwrap();
            collect_features(cursor.as_mut())
                .unwrap()
                .into_iter()
                .map(|f| f.name)
                .collect()
        };
        assert_eq!(names, vec!["renamed".to_string(), "new".to_string()]);
        assert_eq!(cache.get_feature(added.id).unwrap().name, "new");
        assert_eq!(cache.stats().mirror_failures, 0);
    }

    #[test]
    fn test_failed_client_mutation_is_not_mirrored() {
        let (client, fsid) = client_with_points(1);
        let cache = CachingFeatureStore::new(client);
        drain(&cache, &viewport());
        cache.set_feature_set_read_only(fsid, true).unwrap();

        assert!(cache.delete_feature(1).unwrap_err().is_unsupported());
        assert_eq!(cache.snapshot_feature_count(), Some(1));
    }

    #[test]
    fn test_mirror_failure_is_counted() {
        let (client, fsid) = client_with_points(1);
        let cache = CachingFeatureStore::new(client);
        drain(&cache, &viewport());

        // a set created behind the cache's back is unknown to the snapshot
        let hidden = cache
            .client()
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "hidden"))
            .unwrap();
        cache.update_feature_set(hidden.id, &FeatureSetUpdate::new().name("x")).unwrap();
        assert_eq!(cache.stats().mirror_failures, 1);

        // features the snapshot never saw are skipped, not failures
        let outside = cache
            .client()
            .insert_feature(FeatureDefinition::new(fsid, "o", Geometry::point(1.0, 1.0).unwrap()))
            .unwrap();
        cache.set_feature_visible(outside.id, false).unwrap();
        assert_eq!(cache.stats().mirror_failures, 1);
    }

    #[test]
    fn test_mutation_during_materialization_discards_build() {
        let (client, _) = client_with_points(3);
        let cache = CachingFeatureStore::new(client);
        drain(&cache, &viewport());

        let mut cursor = cache.query_features(&viewport()).unwrap();
        while cursor.move_to_next().unwrap() {}
        cache.delete_feature(1).unwrap();
        let added = cache
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "late"))
            .unwrap();
        drop(cursor);

        // the older snapshot already holds both mutations
        assert_eq!(drain(&cache, &FeatureQueryParameters::new()), vec![2, 3]);
        assert!(cache.client().get_feature(1).unwrap_err().is_bad_index());
        assert!(cache.is_dirty());
        let stats = cache.stats();
        assert_eq!(stats.snapshots_installed, 1);
        assert_eq!(stats.snapshots_discarded, 1);

        cache
            .insert_feature(FeatureDefinition::new(
                added.id,
                "in late set",
                Geometry::point(0.5, 0.5).unwrap(),
            ))
            .unwrap();
        assert_eq!(cache.stats().mirror_failures, 0);
        assert_eq!(cache.snapshot_feature_count(), Some(3));

        // an undisturbed build installs again
        drain(&cache, &viewport());
        assert!(!cache.is_dirty());
        assert_eq!(cache.stats().snapshots_installed, 2);
    }

    #[test]
    fn test_first_build_discarded_leaves_no_snapshot() {
        let (client, _) = client_with_points(3);
        let cache = CachingFeatureStore::new(client);

        let mut cursor = cache.query_features(&viewport()).unwrap();
        while cursor.move_to_next().unwrap() {}
        cache.delete_feature(1).unwrap();
        drop(cursor);

        assert!(!cache.has_snapshot());
        assert!(drain(&cache, &FeatureQueryParameters::new()).is_empty());
    }

    #[test]
    fn test_paged_batch_mutations_follow_client_rows() {
        let (client, _) = client_with_points(4);
        let cache = CachingFeatureStore::new(client);
        let partial = FeatureQueryParameters::new()
            .spatial_filter(Geometry::rectangle(Envelope::new(1.5, 1.5, 3.5, 3.5)).unwrap())
            .resolution(f64::NAN, 10.0);
        assert_eq!(drain(&cache, &partial), vec![3, 4]);

        // the client's first match is a feature the snapshot never held
        cache
            .delete_features(&FeatureQueryParameters::new().limit(1))
            .unwrap();
        assert!(cache.client().get_feature(1).unwrap_err().is_bad_index());
        assert_eq!(drain(&cache, &FeatureQueryParameters::new()), vec![3, 4]);

        // client rows are now 2, 3, 4; the second one is hidden
        cache
            .set_features_visible(&FeatureQueryParameters::new().offset(1).limit(1), false)
            .unwrap();
        assert!(!cache.client().is_feature_visible(3).unwrap());
        assert_eq!(
            drain(&cache, &FeatureQueryParameters::new().visible_only(true)),
            vec![4]
        );
        assert_eq!(cache.stats().mirror_failures, 0);
    }

    #[test]
    fn test_refresh_and_close() {
        let (client, _) = client_with_points(2);
        let cache = CachingFeatureStore::new(client);
        drain(&cache, &viewport());

        cache.refresh().unwrap();
        assert!(cache.is_dirty());
        assert_eq!(drain(&cache, &FeatureQueryParameters::new()).len(), 2);
        drain(&cache, &viewport());
        assert!(!cache.is_dirty());

        cache.close().unwrap();
        assert!(!cache.has_snapshot());
        assert!(!cache.is_available());
    }
}
