//! Forward-only result cursors
//!
//! A query captures its result rows into a snapshot vector while the store
//! lock is held; the returned cursor then iterates that snapshot without
//! touching the store. Later mutations never show through an open cursor.

use crate::error::{Result, StoreError};
use crate::model::{Feature, FeatureSet};
use std::sync::Arc;

/// Pull-based cursor over feature rows
pub trait FeatureCursor: Send {
    /// Advance to the next row; `Ok(false)` once exhausted
    fn move_to_next(&mut self) -> Result<bool>;

    /// Current row; `IllegalState` before the first advance, `Done` after
    /// the last
    fn get(&self) -> Result<&Feature>;
}

/// Pull-based cursor over feature-set rows
pub trait FeatureSetCursor: Send {
    fn move_to_next(&mut self) -> Result<bool>;

    fn get(&self) -> Result<&FeatureSet>;
}

pub type FeatureCursorPtr = Box<dyn FeatureCursor>;
pub type FeatureSetCursorPtr = Box<dyn FeatureSetCursor>;

/// Cursor over a vector captured at query time
pub struct SnapshotCursor<T> {
    rows: Vec<Arc<T>>,
    /// `None` until the first advance
    position: Option<usize>,
}

impl<T> SnapshotCursor<T> {
    pub fn new(rows: Vec<Arc<T>>) -> Self {
        SnapshotCursor {
            rows,
            position: None,
        }
    }

    pub fn empty() -> Self {
        SnapshotCursor::new(Vec::new())
    }

    /// Rows in the snapshot, regardless of position
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn advance(&mut self) -> bool {
        let next = self.position.map_or(0, |p| (p + 1).min(self.rows.len()));
        self.position = Some(next);
        next < self.rows.len()
    }

    fn current(&self) -> Result<&T> {
        match self.position {
            None => Err(StoreError::IllegalState(
                "cursor read before move_to_next".into(),
            )),
            Some(p) => self.rows.get(p).map(|row| row.as_ref()).ok_or(StoreError::Done),
        }
    }
}

impl FeatureCursor for SnapshotCursor<Feature> {
    fn move_to_next(&mut self) -> Result<bool> {
        Ok(self.advance())
    }

    fn get(&self) -> Result<&Feature> {
        self.current()
    }
}

impl FeatureSetCursor for SnapshotCursor<FeatureSet> {
    fn move_to_next(&mut self) -> Result<bool> {
        Ok(self.advance())
    }

    fn get(&self) -> Result<&FeatureSet> {
        self.current()
    }
}

/// Drain a feature cursor into owned records
pub fn collect_features(cursor: &mut dyn FeatureCursor) -> Result<Vec<Feature>> {
    let mut out = Vec::new();
    while cursor.move_to_next()? {
        out.push(cursor.get()?.clone());
    }
    Ok(out)
}

/// Drain a feature-set cursor into owned records
pub fn collect_feature_sets(cursor: &mut dyn FeatureSetCursor) -> Result<Vec<FeatureSet>> {
    let mut out = Vec::new();
    while cursor.move_to_next()? {
        out.push(cursor.get()?.clone());
    }
    Ok(out)
}
