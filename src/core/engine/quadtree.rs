//! Region quadtree over feature envelopes
//!
//! Each entry lives in the deepest node whose bounds fully contain its
//! envelope; entries straddling a split line stay in the parent. Entries
//! outside the root bounds are kept in an overflow list so nothing is lost.

use crate::model::{Envelope, FeatureId};
use ahash::AHashMap;

const NODE_CAPACITY: usize = 16;
const MAX_DEPTH: u8 = 12;

#[derive(Debug)]
struct Node {
    bounds: Envelope,
    depth: u8,
    entries: Vec<(FeatureId, Envelope)>,
    children: Option<Box<[Node; 4]>>,
}

impl Node {
    fn new(bounds: Envelope, depth: u8) -> Self {
        Node {
            bounds,
            depth,
            entries: Vec::new(),
            children: None,
        }
    }

    fn quadrants(&self) -> [Envelope; 4] {
        let b = &self.bounds;
        let mid_x = (b.min_x + b.max_x) / 2.0;
        let mid_y = (b.min_y + b.max_y) / 2.0;
        [
            Envelope::new(b.min_x, b.min_y, mid_x, mid_y),
            Envelope::new(mid_x, b.min_y, b.max_x, mid_y),
            Envelope::new(b.min_x, mid_y, mid_x, b.max_y),
            Envelope::new(mid_x, mid_y, b.max_x, b.max_y),
        ]
    }

    fn child_for(&mut self, envelope: &Envelope) -> Option<&mut Node> {
        self.children
            .as_mut()?
            .iter_mut()
            .find(|child| child.bounds.contains(envelope))
    }

    fn insert(&mut self, id: FeatureId, envelope: Envelope) {
        if let Some(child) = self.child_for(&envelope) {
            child.insert(id, envelope);
            return;
        }
        self.entries.push((id, envelope));
        if self.children.is_none() && self.entries.len() > NODE_CAPACITY && self.depth < MAX_DEPTH {
            self.split();
        }
    }

    fn split(&mut self) {
        let [a, b, c, d] = self.quadrants();
        let depth = self.depth + 1;
        self.children = Some(Box::new([
            Node::new(a, depth),
            Node::new(b, depth),
            Node::new(c, depth),
            Node::new(d, depth),
        ]));

        let entries = std::mem::take(&mut self.entries);
        for (id, envelope) in entries {
            match self.child_for(&envelope) {
                Some(child) => child.insert(id, envelope),
                None => self.entries.push((id, envelope)),
            }
        }
    }

    fn remove(&mut self, id: FeatureId, envelope: &Envelope) -> bool {
        if let Some(child) = self.child_for(envelope) {
            if child.remove(id, envelope) {
                return true;
            }
        }
        match self.entries.iter().position(|(eid, _)| *eid == id) {
            Some(pos) => {
                self.entries.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    fn query(&self, region: &Envelope, out: &mut Vec<FeatureId>) {
        if !self.bounds.intersects(region) {
            return;
        }
        out.extend(
            self.entries
                .iter()
                .filter(|(_, envelope)| envelope.intersects(region))
                .map(|(id, _)| *id),
        );
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(region, out);
            }
        }
    }
}

/// Spatial index from feature id to envelope
#[derive(Debug)]
pub struct SpatialIndex {
    root: Node,
    overflow: Vec<(FeatureId, Envelope)>,
    /// Envelope each id was indexed under, for removal
    envelopes: AHashMap<FeatureId, Envelope>,
}

impl SpatialIndex {
    pub fn new(bounds: Envelope) -> Self {
        SpatialIndex {
            root: Node::new(bounds, 0),
            overflow: Vec::new(),
            envelopes: AHashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.envelopes.contains_key(&id)
    }

    /// Index `id` under `envelope`, replacing any previous entry
    pub fn insert(&mut self, id: FeatureId, envelope: Envelope) {
        self.remove(id);
        if envelope.is_empty() {
            // empty geometries have no footprint to query
            return;
        }
        if self.root.bounds.contains(&envelope) {
            self.root.insert(id, envelope);
        } else {
            self.overflow.push((id, envelope));
        }
        self.envelopes.insert(id, envelope);
    }

    pub fn remove(&mut self, id: FeatureId) -> bool {
        let Some(envelope) = self.envelopes.remove(&id) else {
            return false;
        };
        if self.root.remove(id, &envelope) {
            return true;
        }
        match self.overflow.iter().position(|(eid, _)| *eid == id) {
            Some(pos) => {
                self.overflow.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Ids whose envelope intersects `region`, in no particular order
    pub fn query(&self, region: &Envelope) -> Vec<FeatureId> {
        let mut out = Vec::new();
        if region.is_empty() {
            return out;
        }
        self.root.query(region, &mut out);
        out.extend(
            self.overflow
                .iter()
                .filter(|(_, envelope)| envelope.intersects(region))
                .map(|(id, _)| *id),
        );
        out
    }

    pub fn clear(&mut self) {
        let bounds = self.root.bounds;
        self.root = Node::new(bounds, 0);
        self.overflow.clear();
        self.envelopes.clear();
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        SpatialIndex::new(Envelope::WORLD)
    }
}
