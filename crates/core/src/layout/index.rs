//! Spatial index over boxes and clusters.
//!
//! Thin keyed layer over [`Plane`]: entries are tagged with their
//! [`EntityRef`] so callers can filter hits by kind, and removal goes by
//! entity instead of by plane slot.

use rustc_hash::FxHashMap;

use crate::utils::{HasBBox, Plane, Rect};

use super::elements::EntityRef;

/// An indexed rectangle tagged with the entity it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    pub entity: EntityRef,
    pub bbox: Rect,
}

impl HasBBox for IndexEntry {
    fn x0(&self) -> f64 {
        self.bbox.0
    }
    fn y0(&self) -> f64 {
        self.bbox.1
    }
    fn x1(&self) -> f64 {
        self.bbox.2
    }
    fn y1(&self) -> f64 {
        self.bbox.3
    }
}

/// Dynamic R-tree index over the active boxes and clusters.
#[derive(Default)]
pub struct SpatialIndex {
    plane: Plane<IndexEntry>,
    slots: FxHashMap<EntityRef, usize>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-inserts entries. Entities already present are skipped.
    pub fn load(&mut self, entries: impl IntoIterator<Item = IndexEntry>) {
        let fresh: Vec<IndexEntry> = entries
            .into_iter()
            .filter(|e| !self.slots.contains_key(&e.entity))
            .collect();
        let start = self.plane.extend(fresh.iter().copied());
        for (offset, entry) in fresh.iter().enumerate() {
            self.slots.insert(entry.entity, start + offset);
        }
    }

    /// Inserts one entity. Returns false if it was already indexed.
    pub fn insert(&mut self, entity: EntityRef, bbox: Rect) -> bool {
        if self.slots.contains_key(&entity) {
            return false;
        }
        let slot = self.plane.add(IndexEntry { entity, bbox });
        self.slots.insert(entity, slot);
        true
    }

    /// Removes one entity. Returns false if it was not indexed.
    pub fn remove(&mut self, entity: EntityRef) -> bool {
        match self.slots.remove(&entity) {
            Some(slot) => self.plane.remove_by_id(slot),
            None => false,
        }
    }

    /// All indexed entities whose rectangle intersects `bbox`, edges
    /// inclusive, in insertion order.
    pub fn search(&self, bbox: Rect) -> Vec<IndexEntry> {
        self.plane.find(bbox).into_iter().copied().collect()
    }

    /// Like [`search`](Self::search) but returns only the entity tags.
    pub fn search_entities(&self, bbox: Rect) -> Vec<EntityRef> {
        self.plane.find(bbox).into_iter().map(|e| e.entity).collect()
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        self.slots.contains_key(&entity)
    }

    /// The indexed rectangle of an entity.
    pub fn bbox_of(&self, entity: EntityRef) -> Option<Rect> {
        let slot = *self.slots.get(&entity)?;
        self.plane.get(slot).map(|e| e.bbox)
    }

    pub fn len(&self) -> usize {
        self.plane.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plane.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.plane.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::elements::{BoxId, ClusterId};

    fn entry(i: usize, bbox: Rect) -> IndexEntry {
        IndexEntry {
            entity: EntityRef::Box(BoxId::new(i)),
            bbox,
        }
    }

    #[test]
    fn test_load_search_remove() {
        let mut index = SpatialIndex::new();
        index.load(vec![
            entry(0, (0.0, 0.0, 10.0, 10.0)),
            entry(1, (10.0, 0.0, 20.0, 10.0)),
            entry(2, (50.0, 50.0, 60.0, 60.0)),
        ]);
        let cluster = EntityRef::Cluster(ClusterId::new(0));
        assert!(index.insert(cluster, (0.0, 0.0, 20.0, 10.0)));
        assert!(!index.insert(cluster, (0.0, 0.0, 20.0, 10.0)));

        let hits = index.search_entities((10.0, 5.0, 12.0, 6.0));
        assert_eq!(
            hits,
            vec![
                EntityRef::Box(BoxId::new(0)),
                EntityRef::Box(BoxId::new(1)),
                cluster
            ]
        );

        assert!(index.remove(EntityRef::Box(BoxId::new(0))));
        assert!(!index.remove(EntityRef::Box(BoxId::new(0))));
        assert!(index.remove(cluster));
        assert_eq!(
            index.search_entities((10.0, 5.0, 12.0, 6.0)),
            vec![EntityRef::Box(BoxId::new(1))]
        );
        assert_eq!(index.len(), 2);
        assert!(index.contains(EntityRef::Box(BoxId::new(2))));
        assert_eq!(
            index.bbox_of(EntityRef::Box(BoxId::new(2))),
            Some((50.0, 50.0, 60.0, 60.0))
        );
    }
}
