//! Capability-gated mutation front end
//!
//! [`GatedStore`] owns an engine behind a single `parking_lot::Mutex`. Each
//! public call checks the store's capability flags, takes the lock once,
//! consults the read-only cache, and runs the engine primitive. Change
//! notifications are coalesced: a successful mutation only marks the store
//! dirty, and listeners run after the lock is released once no bulk
//! modification is open.

use crate::config::StoreConfig;
use crate::cursor::{FeatureCursorPtr, FeatureSetCursorPtr, SnapshotCursor};
use crate::error::{Result, StoreError};
use crate::flags::{ModificationFlags, VisibilityFlags};
use crate::model::{
    Feature, FeatureDefinition, FeatureId, FeatureQueryParameters, FeatureSet,
    FeatureSetDefinition, FeatureSetId, FeatureSetQueryParameters, FeatureSetUpdate,
    FeatureUpdate,
};
use crate::store::{same_listener, FeatureDataStore, ListenerPtr};
use crate::wildcard::WildcardMatcher;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Mutation and query primitives a gated store delegates to
///
/// Implementations assume the caller holds the store lock and has already
/// checked capabilities and read-only state. A primitive that fails must
/// leave every index unchanged.
pub trait StoreEngine: Send {
    fn insert_feature_set(&mut self, def: FeatureSetDefinition) -> Result<Arc<FeatureSet>>;
    fn update_feature_set(&mut self, fsid: FeatureSetId, update: &FeatureSetUpdate) -> Result<()>;
    /// Cascades to every member feature
    fn delete_feature_set(&mut self, fsid: FeatureSetId) -> Result<()>;
    fn delete_all_feature_sets(&mut self) -> Result<()>;
    fn get_feature_set(&self, fsid: FeatureSetId) -> Result<Arc<FeatureSet>>;
    fn query_feature_sets(
        &self,
        params: &FeatureSetQueryParameters,
        matcher: &WildcardMatcher,
    ) -> Result<Vec<Arc<FeatureSet>>>;

    fn insert_feature(&mut self, def: FeatureDefinition) -> Result<Arc<Feature>>;
    fn update_feature(&mut self, fid: FeatureId, update: &FeatureUpdate) -> Result<()>;
    fn delete_feature(&mut self, fid: FeatureId) -> Result<()>;
    fn delete_all_features(&mut self, fsid: FeatureSetId) -> Result<()>;
    fn get_feature(&self, fid: FeatureId) -> Result<Arc<Feature>>;
    fn query_features(
        &self,
        params: &FeatureQueryParameters,
        matcher: &WildcardMatcher,
    ) -> Result<Vec<Arc<Feature>>>;

    /// Stamp every listed feature with one new visibility generation
    fn set_features_visible(&mut self, fids: &[FeatureId], visible: bool) -> Result<()>;
    fn set_feature_sets_visible(&mut self, fsids: &[FeatureSetId], visible: bool) -> Result<()>;
    fn is_feature_visible(&self, fid: FeatureId) -> Result<bool>;
    fn is_feature_set_visible(&self, fsid: FeatureSetId) -> Result<bool>;

    fn set_feature_sets_read_only(&mut self, fsids: &[FeatureSetId], read_only: bool) -> Result<()>;
    fn is_feature_set_read_only(&self, fsid: FeatureSetId) -> Result<bool>;
}

/// Everything guarded by the store lock
struct GateState<E> {
    engine: E,
    bulk_depth: u32,
    content_changed: bool,
    /// Lazily filled from the engine; dropped on delete and on toggles
    read_only: AHashMap<FeatureSetId, bool>,
    closed: bool,
}

impl<E: StoreEngine> GateState<E> {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(StoreError::IllegalState("store is closed".into()));
        }
        Ok(())
    }

    fn check_not_read_only(&mut self, fsid: FeatureSetId) -> Result<()> {
        let read_only = match self.read_only.get(&fsid) {
            Some(cached) => *cached,
            None => {
                let value = self.engine.is_feature_set_read_only(fsid)?;
                self.read_only.insert(fsid, value);
                value
            }
        };
        if read_only {
            return Err(StoreError::Unsupported(format!(
                "feature set {} is read-only",
                fsid
            )));
        }
        Ok(())
    }

    fn check_feature_not_read_only(&mut self, fid: FeatureId) -> Result<()> {
        let fsid = self.engine.get_feature(fid)?.feature_set_id;
        self.check_not_read_only(fsid)
    }

    /// True if listeners should be notified now; clears the dirty flag
    fn take_dispatch(&mut self, force: bool) -> bool {
        if self.bulk_depth == 0 && (self.content_changed || force) {
            self.content_changed = false;
            return true;
        }
        false
    }

    fn feature_set_ids(
        &self,
        params: &FeatureSetQueryParameters,
        matcher: &WildcardMatcher,
    ) -> Result<Vec<FeatureSetId>> {
        Ok(self
            .engine
            .query_feature_sets(params, matcher)?
            .iter()
            .map(|s| s.id)
            .collect())
    }
}

/// A feature store enforcing capability flags, read-only sets, and
/// coalesced change notification around a [`StoreEngine`]
pub struct GatedStore<E: StoreEngine + 'static> {
    state: Mutex<GateState<E>>,
    listeners: Mutex<Vec<ListenerPtr>>,
    modification_flags: ModificationFlags,
    visibility_flags: VisibilityFlags,
    matcher: WildcardMatcher,
}

impl<E: StoreEngine + 'static> GatedStore<E> {
    pub fn new(engine: E, config: &StoreConfig) -> Self {
        debug!(
            "Creating gated store (modification flags {}, visibility flags {})",
            config.modification_flags, config.visibility_flags
        );
        GatedStore {
            state: Mutex::new(GateState {
                engine,
                bulk_depth: 0,
                content_changed: false,
                read_only: AHashMap::new(),
                closed: false,
            }),
            listeners: Mutex::new(Vec::new()),
            modification_flags: config.modification_flags,
            visibility_flags: config.visibility_flags,
            matcher: WildcardMatcher::new(config.wildcard, config.pattern_cache_capacity),
        }
    }

    pub fn matcher(&self) -> &WildcardMatcher {
        &self.matcher
    }

    /// Run `f` against the engine under the lock, without dispatching
    pub fn with_engine<T>(&self, f: impl FnOnce(&E) -> T) -> Result<T> {
        let state = self.state.lock();
        state.ensure_open()?;
        Ok(f(&state.engine))
    }

    fn check_modification(&self, required: ModificationFlags) -> Result<()> {
        if !self.modification_flags.contains(required) {
            return Err(StoreError::Unsupported(format!(
                "modification {} not supported (flags {})",
                required, self.modification_flags
            )));
        }
        Ok(())
    }

    fn check_visibility(&self, required: VisibilityFlags) -> Result<()> {
        if !self.visibility_flags.contains(required) {
            return Err(StoreError::Unsupported(format!(
                "visibility setting {} not supported (flags {})",
                required, self.visibility_flags
            )));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&GateState<E>, &WildcardMatcher) -> Result<T>) -> Result<T> {
        let state = self.state.lock();
        state.ensure_open()?;
        f(&*state, &self.matcher)
    }

    /// Run one mutation under the lock, then dispatch outside it
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut GateState<E>, &WildcardMatcher) -> Result<T>,
    ) -> Result<T> {
        let (result, dispatch) = {
            let mut state = self.state.lock();
            state.ensure_open()?;
            let result = f(&mut *state, &self.matcher);
            if result.is_ok() {
                state.content_changed = true;
            }
            (result, state.take_dispatch(false))
        };
        if dispatch {
            self.dispatch_content_changed();
        }
        result
    }

    fn dispatch_content_changed(&self) {
        // snapshot so listeners may add or remove listeners
        let listeners: Vec<ListenerPtr> = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_content_changed(self);
        }
    }
}

impl<E: StoreEngine + 'static> fmt::Debug for GatedStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatedStore")
            .field("modification_flags", &self.modification_flags)
            .field("visibility_flags", &self.visibility_flags)
            .field("wildcard", &self.matcher.wildcard())
            .finish_non_exhaustive()
    }
}

impl<E: StoreEngine + 'static> FeatureDataStore for GatedStore<E> {
    fn modification_flags(&self) -> ModificationFlags {
        self.modification_flags
    }

    fn visibility_flags(&self) -> VisibilityFlags {
        self.visibility_flags
    }

    fn wildcard(&self) -> char {
        self.matcher.wildcard()
    }

    fn add_content_changed_listener(&self, listener: ListenerPtr) {
        let mut listeners = self.listeners.lock();
        if !listeners.iter().any(|l| same_listener(l, &listener)) {
            listeners.push(listener);
        }
    }

    fn remove_content_changed_listener(&self, listener: &ListenerPtr) {
        self.listeners.lock().retain(|l| !same_listener(l, listener));
    }

    fn begin_bulk_modification(&self) -> Result<()> {
        self.check_modification(ModificationFlags::BULK_MODIFICATIONS)?;
        let mut state = self.state.lock();
        state.ensure_open()?;
        state.bulk_depth += 1;
        debug!("Begin bulk modification (depth {})", state.bulk_depth);
        Ok(())
    }

    fn end_bulk_modification(&self, successful: bool) -> Result<()> {
        let dispatch = {
            let mut state = self.state.lock();
            if state.bulk_depth == 0 {
                return Err(StoreError::IllegalState(
                    "end_bulk_modification without matching begin".into(),
                ));
            }
            state.bulk_depth -= 1;
            debug!(
                "End bulk modification (depth {}, successful {})",
                state.bulk_depth, successful
            );
            state.take_dispatch(successful)
        };
        if dispatch {
            self.dispatch_content_changed();
        }
        Ok(())
    }

    fn is_in_bulk_modification(&self) -> bool {
        self.state.lock().bulk_depth > 0
    }

    fn insert_feature_set(&self, def: FeatureSetDefinition) -> Result<FeatureSet> {
        self.check_modification(ModificationFlags::FEATURESET_INSERT)?;
        self.mutate(|state, _| {
            let inserted = state.engine.insert_feature_set(def)?;
            state.read_only.remove(&inserted.id);
            Ok(inserted.as_ref().clone())
        })
    }

    fn update_feature_set(&self, fsid: FeatureSetId, update: &FeatureSetUpdate) -> Result<()> {
        self.check_modification(ModificationFlags::FEATURESET_UPDATE)?;
        if update.is_empty() {
            return Err(StoreError::InvalidArg("empty feature set update".into()));
        }
        if update.name.is_some() {
            self.check_modification(ModificationFlags::FEATURESET_NAME)?;
        }
        if update.resolution.is_some() {
            self.check_modification(ModificationFlags::FEATURESET_DISPLAY_THRESHOLDS)?;
        }
        self.mutate(|state, _| {
            state.check_not_read_only(fsid)?;
            state.engine.update_feature_set(fsid, update)
        })
    }

    fn delete_feature_set(&self, fsid: FeatureSetId) -> Result<()> {
        self.check_modification(ModificationFlags::FEATURESET_DELETE)?;
        self.mutate(|state, _| {
            state.check_not_read_only(fsid)?;
            state.engine.delete_feature_set(fsid)?;
            state.read_only.remove(&fsid);
            Ok(())
        })
    }

    fn delete_feature_sets(&self, params: &FeatureSetQueryParameters) -> Result<()> {
        self.check_modification(ModificationFlags::FEATURESET_DELETE)?;
        self.mutate(|state, matcher| {
            let fsids = state.feature_set_ids(params, matcher)?;
            for fsid in &fsids {
                state.check_not_read_only(*fsid)?;
            }
            for fsid in fsids {
                state.engine.delete_feature_set(fsid)?;
                state.read_only.remove(&fsid);
            }
            Ok(())
        })
    }

    fn delete_all_feature_sets(&self) -> Result<()> {
        self.check_modification(ModificationFlags::FEATURESET_DELETE)?;
        self.mutate(|state, matcher| {
            for fsid in state.feature_set_ids(&FeatureSetQueryParameters::new(), matcher)? {
                state.check_not_read_only(fsid)?;
            }
            state.engine.delete_all_feature_sets()?;
            state.read_only.clear();
            Ok(())
        })
    }

    fn get_feature_set(&self, fsid: FeatureSetId) -> Result<FeatureSet> {
        self.read(|state, _| Ok(state.engine.get_feature_set(fsid)?.as_ref().clone()))
    }

    fn query_feature_sets(&self, params: &FeatureSetQueryParameters) -> Result<FeatureSetCursorPtr> {
        self.read(|state, matcher| {
            let rows = state.engine.query_feature_sets(params, matcher)?;
            Ok(Box::new(SnapshotCursor::new(rows)) as FeatureSetCursorPtr)
        })
    }

    fn query_feature_sets_count(&self, params: &FeatureSetQueryParameters) -> Result<usize> {
        self.read(|state, matcher| Ok(state.engine.query_feature_sets(params, matcher)?.len()))
    }

    fn insert_feature(&self, def: FeatureDefinition) -> Result<Feature> {
        self.check_modification(ModificationFlags::FEATURESET_FEATURE_INSERT)?;
        self.mutate(|state, _| {
            state.check_not_read_only(def.feature_set_id)?;
            Ok(state.engine.insert_feature(def)?.as_ref().clone())
        })
    }

    fn update_feature(&self, fid: FeatureId, update: &FeatureUpdate) -> Result<()> {
        self.check_modification(ModificationFlags::FEATURESET_FEATURE_UPDATE)?;
        if update.is_empty() {
            return Err(StoreError::InvalidArg("empty feature update".into()));
        }
        if update.name.is_some() {
            self.check_modification(ModificationFlags::FEATURE_NAME)?;
        }
        if update.geometry.is_some() || update.altitude.is_some() {
            self.check_modification(ModificationFlags::FEATURE_GEOMETRY)?;
        }
        if update.style.is_some() {
            self.check_modification(ModificationFlags::FEATURE_STYLE)?;
        }
        if update.attributes.is_some() {
            self.check_modification(ModificationFlags::FEATURE_ATTRIBUTES)?;
        }
        self.mutate(|state, _| {
            state.check_feature_not_read_only(fid)?;
            state.engine.update_feature(fid, update)
        })
    }

    fn delete_feature(&self, fid: FeatureId) -> Result<()> {
        self.check_modification(ModificationFlags::FEATURESET_FEATURE_DELETE)?;
        self.mutate(|state, _| {
            state.check_feature_not_read_only(fid)?;
            state.engine.delete_feature(fid)
        })
    }

    fn delete_features(&self, params: &FeatureQueryParameters) -> Result<()> {
        self.check_modification(ModificationFlags::FEATURESET_FEATURE_DELETE)?;
        self.mutate(|state, matcher| {
            let rows = state.engine.query_features(params, matcher)?;
            let owners: BTreeSet<FeatureSetId> = rows.iter().map(|f| f.feature_set_id).collect();
            for fsid in owners {
                state.check_not_read_only(fsid)?;
            }
            for feature in rows {
                state.engine.delete_feature(feature.id)?;
            }
            Ok(())
        })
    }

    fn delete_all_features(&self, fsid: FeatureSetId) -> Result<()> {
        self.check_modification(ModificationFlags::FEATURESET_FEATURE_DELETE)?;
        self.mutate(|state, _| {
            state.check_not_read_only(fsid)?;
            state.engine.delete_all_features(fsid)
        })
    }

    fn get_feature(&self, fid: FeatureId) -> Result<Feature> {
        self.read(|state, _| Ok(state.engine.get_feature(fid)?.as_ref().clone()))
    }

    fn query_features(&self, params: &FeatureQueryParameters) -> Result<FeatureCursorPtr> {
        self.read(|state, matcher| {
            let rows = state.engine.query_features(params, matcher)?;
            Ok(Box::new(SnapshotCursor::new(rows)) as FeatureCursorPtr)
        })
    }

    fn query_features_count(&self, params: &FeatureQueryParameters) -> Result<usize> {
        self.read(|state, matcher| Ok(state.engine.query_features(params, matcher)?.len()))
    }

    fn set_feature_visible(&self, fid: FeatureId, visible: bool) -> Result<()> {
        self.check_visibility(VisibilityFlags::FEATURE)?;
        self.mutate(|state, _| state.engine.set_features_visible(&[fid], visible))
    }

    fn set_features_visible(&self, params: &FeatureQueryParameters, visible: bool) -> Result<()> {
        self.check_visibility(VisibilityFlags::FEATURE)?;
        self.mutate(|state, matcher| {
            let fids: Vec<FeatureId> = state
                .engine
                .query_features(params, matcher)?
                .iter()
                .map(|f| f.id)
                .collect();
            state.engine.set_features_visible(&fids, visible)
        })
    }

    fn is_feature_visible(&self, fid: FeatureId) -> Result<bool> {
        self.read(|state, _| state.engine.is_feature_visible(fid))
    }

    fn set_feature_set_visible(&self, fsid: FeatureSetId, visible: bool) -> Result<()> {
        self.check_visibility(VisibilityFlags::FEATURESET)?;
        self.mutate(|state, _| state.engine.set_feature_sets_visible(&[fsid], visible))
    }

    fn set_feature_sets_visible(
        &self,
        params: &FeatureSetQueryParameters,
        visible: bool,
    ) -> Result<()> {
        self.check_visibility(VisibilityFlags::FEATURESET)?;
        self.mutate(|state, matcher| {
            let fsids = state.feature_set_ids(params, matcher)?;
            state.engine.set_feature_sets_visible(&fsids, visible)
        })
    }

    fn is_feature_set_visible(&self, fsid: FeatureSetId) -> Result<bool> {
        self.read(|state, _| state.engine.is_feature_set_visible(fsid))
    }

    fn set_feature_set_read_only(&self, fsid: FeatureSetId, read_only: bool) -> Result<()> {
        self.check_modification(ModificationFlags::FEATURESET_READONLY)?;
        self.mutate(|state, _| {
            state.engine.set_feature_sets_read_only(&[fsid], read_only)?;
            state.read_only.remove(&fsid);
            Ok(())
        })
    }

    fn set_feature_sets_read_only(
        &self,
        params: &FeatureSetQueryParameters,
        read_only: bool,
    ) -> Result<()> {
        self.check_modification(ModificationFlags::FEATURESET_READONLY)?;
        self.mutate(|state, matcher| {
            let fsids = state.feature_set_ids(params, matcher)?;
            state.engine.set_feature_sets_read_only(&fsids, read_only)?;
            for fsid in fsids {
                state.read_only.remove(&fsid);
            }
            Ok(())
        })
    }

    fn is_feature_set_read_only(&self, fsid: FeatureSetId) -> Result<bool> {
        self.read(|state, _| state.engine.is_feature_set_read_only(fsid))
    }

    fn is_feature_read_only(&self, fid: FeatureId) -> Result<bool> {
        self.read(|state, _| {
            let fsid = state.engine.get_feature(fid)?.feature_set_id;
            state.engine.is_feature_set_read_only(fsid)
        })
    }

    fn is_available(&self) -> bool {
        !self.state.lock().closed
    }

    fn refresh(&self) -> Result<()> {
        self.read(|_, _| Ok(()))
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.closed {
            debug!("Closing gated store");
            state.closed = true;
            state.read_only.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use crate::model::Geometry;
    use crate::store::ContentChangedListener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl ContentChangedListener for Counter {
        fn on_content_changed(&self, _store: &dyn FeatureDataStore) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn store_with(flags: ModificationFlags) -> GatedStore<MemoryEngine> {
        let config = StoreConfig {
            modification_flags: flags,
            ..StoreConfig::default()
        };
        GatedStore::new(MemoryEngine::new(), &config)
    }

    fn listen(store: &GatedStore<MemoryEngine>) -> Arc<Counter> {
        let counter = Arc::new(Counter::default());
        store.add_content_changed_listener(counter.clone());
        counter
    }

    fn def(fsid: FeatureSetId) -> FeatureDefinition {
        FeatureDefinition::new(fsid, "f", Geometry::point(0.0, 0.0).unwrap())
    }

    #[test]
    fn test_debug_shows_configuration() {
        let config = StoreConfig {
            wildcard: '*',
            ..StoreConfig::default()
        };
        let store = GatedStore::new(MemoryEngine::new(), &config);
        assert_eq!(store.wildcard(), '*');
        let shown = format!("{:?}", store);
        assert!(shown.starts_with("GatedStore"));
        assert!(shown.contains("wildcard: '*'"));
    }

    #[test]
    fn test_missing_flag_is_unsupported() {
        let store = store_with(ModificationFlags::FEATURESET_INSERT);
        let set = store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s"))
            .unwrap();
        assert!(store.insert_feature(def(set.id)).unwrap_err().is_unsupported());
        assert!(store.delete_feature_set(set.id).unwrap_err().is_unsupported());
        assert!(store.begin_bulk_modification().unwrap_err().is_unsupported());
    }

    #[test]
    fn test_per_field_update_flags() {
        let store = store_with(
            ModificationFlags::FEATURESET_INSERT
                | ModificationFlags::FEATURESET_FEATURE_INSERT
                | ModificationFlags::FEATURESET_FEATURE_UPDATE
                | ModificationFlags::FEATURE_NAME,
        );
        let set = store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s"))
            .unwrap();
        let f = store.insert_feature(def(set.id)).unwrap();

        store.update_feature(f.id, &FeatureUpdate::new().name("ok")).unwrap();
        let err = store
            .update_feature(f.id, &FeatureUpdate::new().style(None))
            .unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(store.get_feature(f.id).unwrap().version, 2);
    }

    #[test]
    fn test_empty_update_is_invalid() {
        let store = store_with(ModificationFlags::ALL);
        let set = store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s"))
            .unwrap();
        let f = store.insert_feature(def(set.id)).unwrap();
        assert!(matches!(
            store.update_feature(f.id, &FeatureUpdate::new()),
            Err(StoreError::InvalidArg(_))
        ));
    }

    #[test]
    fn test_visibility_flags() {
        let config = StoreConfig {
            visibility_flags: VisibilityFlags::FEATURESET,
            ..StoreConfig::default()
        };
        let store = GatedStore::new(MemoryEngine::new(), &config);
        let set = store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s"))
            .unwrap();
        let f = store.insert_feature(def(set.id)).unwrap();
        assert!(store.set_feature_visible(f.id, false).unwrap_err().is_unsupported());
        store.set_feature_set_visible(set.id, false).unwrap();
    }

    #[test]
    fn test_each_mutation_dispatches_once() {
        let store = store_with(ModificationFlags::ALL);
        let counter = listen(&store);
        let set = store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s"))
            .unwrap();
        store.insert_feature(def(set.id)).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        // failures do not notify
        assert!(store.delete_feature(999).is_err());
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_duplicate_listener_is_noop() {
        let store = store_with(ModificationFlags::ALL);
        let counter = Arc::new(Counter::default());
        let listener: ListenerPtr = counter.clone();
        store.add_content_changed_listener(listener.clone());
        store.add_content_changed_listener(listener.clone());
        store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s"))
            .unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        store.remove_content_changed_listener(&listener);
        store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s2"))
            .unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bulk_nesting() {
        let store = store_with(ModificationFlags::ALL);
        let counter = listen(&store);

        store.begin_bulk_modification().unwrap();
        store.begin_bulk_modification().unwrap();
        store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s"))
            .unwrap();
        store.end_bulk_modification(true).unwrap();
        assert!(store.is_in_bulk_modification());
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
        store.end_bulk_modification(true).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        assert!(matches!(
            store.end_bulk_modification(true),
            Err(StoreError::IllegalState(_))
        ));
    }

    #[test]
    fn test_successful_empty_bulk_still_dispatches() {
        let store = store_with(ModificationFlags::ALL);
        let counter = listen(&store);
        store.begin_bulk_modification().unwrap();
        store.end_bulk_modification(true).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        store.begin_bulk_modification().unwrap();
        store.end_bulk_modification(false).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_only_blocks_feature_mutation() {
        let store = store_with(ModificationFlags::ALL);
        let set = store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s"))
            .unwrap();
        let f = store.insert_feature(def(set.id)).unwrap();
        store.set_feature_set_read_only(set.id, true).unwrap();

        assert!(store.insert_feature(def(set.id)).unwrap_err().is_unsupported());
        assert!(store.delete_feature(f.id).unwrap_err().is_unsupported());
        assert!(store.is_feature_read_only(f.id).unwrap());
        // visibility is not a content mutation
        store.set_feature_visible(f.id, false).unwrap();

        store.set_feature_set_read_only(set.id, false).unwrap();
        store.delete_feature(f.id).unwrap();
    }

    #[test]
    fn test_read_only_cache_dropped_on_delete() {
        let store = store_with(ModificationFlags::ALL);
        let set = store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s"))
            .unwrap();
        store.set_feature_set_read_only(set.id, true).unwrap();
        assert!(store.insert_feature(def(set.id)).is_err()); // caches verdict
        store.set_feature_set_read_only(set.id, false).unwrap();
        store.delete_feature_set(set.id).unwrap();

        // reuse the id
        let again = store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s").with_id(set.id))
            .unwrap();
        store.insert_feature(def(again.id)).unwrap();
    }

    #[test]
    fn test_listener_may_query_store() {
        struct Reader(AtomicUsize);
        impl ContentChangedListener for Reader {
            fn on_content_changed(&self, store: &dyn FeatureDataStore) {
                let n = store
                    .query_feature_sets_count(&FeatureSetQueryParameters::new())
                    .unwrap();
                self.0.store(n, Ordering::SeqCst);
            }
        }
        let store = store_with(ModificationFlags::ALL);
        let reader = Arc::new(Reader(AtomicUsize::new(0)));
        store.add_content_changed_listener(reader.clone());
        store
            .insert_feature_set(FeatureSetDefinition::new("p", "t", "s"))
            .unwrap();
        assert_eq!(reader.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_closed_store_rejects_calls() {
        let store = store_with(ModificationFlags::ALL);
        store.close().unwrap();
        assert!(!store.is_available());
        assert!(matches!(
            store.insert_feature_set(FeatureSetDefinition::new("p", "t", "s")),
            Err(StoreError::IllegalState(_))
        ));
        assert!(matches!(
            store.query_features_count(&FeatureQueryParameters::new()),
            Err(StoreError::IllegalState(_))
        ));
    }
}
