//! Cursor that builds the next cache snapshot while it is consumed

use super::Shared;
use crate::cursor::{FeatureCursor, FeatureCursorPtr};
use crate::engine::MemoryEngine;
use crate::error::Result;
use crate::model::Feature;
use std::sync::Arc;
use tracing::debug;

/// Wraps a backing-store cursor; every row the caller advances over is
/// copied into a private engine, which replaces the layer's snapshot when
/// the cursor is dropped. If a mutation went through the layer in the
/// meantime the engine is thrown away and the layer is marked dirty.
pub struct MaterializingCursor {
    inner: FeatureCursorPtr,
    engine: Option<MemoryEngine>,
    /// Mutation epoch when the engine was seeded
    seeded_at: u64,
    shared: Arc<Shared>,
}

impl MaterializingCursor {
    pub(crate) fn new(
        inner: FeatureCursorPtr,
        engine: MemoryEngine,
        seeded_at: u64,
        shared: Arc<Shared>,
    ) -> Self {
        MaterializingCursor {
            inner,
            engine: Some(engine),
            seeded_at,
            shared,
        }
    }
}

impl FeatureCursor for MaterializingCursor {
    fn move_to_next(&mut self) -> Result<bool> {
        if !self.inner.move_to_next()? {
            return Ok(false);
        }
        let row = self.inner.get()?;
        if let Some(engine) = self.engine.as_mut() {
            if let Err(e) = engine.restore_feature(row) {
                debug!("Skipping feature {} in snapshot: {}", row.id, e);
            }
        }
        Ok(true)
    }

    fn get(&self) -> Result<&Feature> {
        self.inner.get()
    }
}

impl Drop for MaterializingCursor {
    fn drop(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.shared.install(engine, self.seeded_at);
        }
    }
}
