//! Mutable clustering state shared by the phases of one run.
//!
//! Holds the box arena, the active box and cluster sets, the spatial index
//! that mirrors them, the box-level neighbour graph and the active relation
//! set. Every membership change goes through the methods here so the index
//! and the relation maps on both endpoints stay in step.

use indexmap::{IndexMap, IndexSet};

use crate::error::{ClusterError, Result};
use crate::utils::{HasBBox, Rect, bbox_area, bbox2str};

use super::super::elements::{BoxId, Cluster, ClusterId, EntityRef, PageBox, Relation, RelationKey};
use super::super::index::{IndexEntry, SpatialIndex};
use super::super::params::ClusteringParams;
use super::super::records::PageSize;
use super::queue::RelationQueue;

pub struct ClusteringState {
    pub(crate) params: ClusteringParams,
    pub(crate) page: PageSize,
    /// Every input box, addressed by `BoxId`. Never shrinks.
    pub(crate) boxes: Vec<PageBox>,
    /// Boxes that are neither removed containers nor cluster members. Order
    /// is not meaningful; callers that need input order sort.
    pub(crate) active_boxes: IndexSet<BoxId>,
    /// Boxes dropped by container removal, in removal order.
    pub(crate) containers: Vec<BoxId>,
    /// Committed clusters.
    pub(crate) clusters: IndexMap<ClusterId, Cluster>,
    pub(crate) index: SpatialIndex,
    /// Box-level neighbour graph from discovery. Read-only afterwards.
    pub(crate) direct: IndexMap<RelationKey, Relation>,
    /// Active relations between active entities. Pop order comes from the
    /// queue, so removal does not preserve insertion order.
    pub(crate) relations: IndexMap<RelationKey, Relation>,
    pub(crate) queue: RelationQueue,
    next_cluster_id: ClusterId,
}

impl ClusteringState {
    /// Creates the state and bulk-loads every box into the index.
    pub fn new(page: PageSize, boxes: Vec<PageBox>, params: ClusteringParams) -> Self {
        let mut index = SpatialIndex::new();
        index.load(boxes.iter().map(|b| IndexEntry {
            entity: b.entity(),
            bbox: b.bbox(),
        }));
        let active_boxes = boxes.iter().map(|b| b.id()).collect();
        Self {
            params,
            page,
            boxes,
            active_boxes,
            containers: Vec::new(),
            clusters: IndexMap::new(),
            index,
            direct: IndexMap::new(),
            relations: IndexMap::new(),
            queue: RelationQueue::new(),
            next_cluster_id: ClusterId::new(0),
        }
    }

    pub fn params(&self) -> &ClusteringParams {
        &self.params
    }

    pub fn page(&self) -> PageSize {
        self.page
    }

    pub fn boxes(&self) -> &[PageBox] {
        &self.boxes
    }

    pub fn page_box(&self, id: BoxId) -> &PageBox {
        &self.boxes[id.index()]
    }

    pub fn active_boxes(&self) -> impl Iterator<Item = BoxId> + '_ {
        self.active_boxes.iter().copied()
    }

    /// Active boxes in input order.
    pub fn sorted_active_boxes(&self) -> Vec<BoxId> {
        let mut ids: Vec<BoxId> = self.active_boxes().collect();
        ids.sort_unstable();
        ids
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    pub fn relation(&self, key: &RelationKey) -> Option<&Relation> {
        self.relations.get(key)
    }

    /// Direct box-box relation from discovery, if the two boxes are neighbours.
    pub fn direct_relation(&self, a: BoxId, b: BoxId) -> Option<&Relation> {
        self.direct
            .get(&RelationKey::new(EntityRef::Box(a), EntityRef::Box(b)))
    }

    pub(crate) fn next_cluster_id(&self) -> ClusterId {
        self.next_cluster_id
    }

    pub(crate) fn allocate_cluster_id(&mut self) -> ClusterId {
        let id = self.next_cluster_id;
        self.next_cluster_id = id.next();
        id
    }

    /// Current rectangle of an active entity.
    pub fn entity_bbox(&self, entity: EntityRef) -> Option<Rect> {
        match entity {
            EntityRef::Box(id) if self.active_boxes.contains(&id) => Some(self.page_box(id).bbox()),
            EntityRef::Cluster(id) => self.clusters.get(&id).map(|c| c.bbox()),
            EntityRef::Box(_) => None,
        }
    }

    pub fn is_active(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Box(id) => self.active_boxes.contains(&id),
            EntityRef::Cluster(id) => self.clusters.contains_key(&id),
        }
    }

    /// The active entity a box is currently represented by: its cluster, the
    /// box itself, or None for removed containers.
    pub fn owner_of(&self, id: BoxId) -> Option<EntityRef> {
        if let Some(cid) = self.page_box(id).cluster()
            && self.clusters.contains_key(&cid)
        {
            return Some(EntityRef::Cluster(cid));
        }
        self.active_boxes
            .contains(&id)
            .then_some(EntityRef::Box(id))
    }

    /// Member boxes of an entity: the box itself or the cluster's members.
    pub fn members_of(&self, entity: EntityRef) -> Vec<BoxId> {
        match entity {
            EntityRef::Box(id) => vec![id],
            EntityRef::Cluster(id) => self
                .clusters
                .get(&id)
                .map(|c| c.members().collect())
                .unwrap_or_default(),
        }
    }

    /// Sum of active box areas over the page area.
    pub fn density(&self) -> f64 {
        let page_area = self.page.area();
        if page_area <= 0.0 {
            return 0.0;
        }
        let boxes_area: f64 = self
            .active_boxes
            .iter()
            .map(|id| bbox_area(self.page_box(*id).bbox()))
            .sum();
        boxes_area / page_area
    }

    /// Drops an active box from the active set and the index.
    pub(crate) fn deactivate_box(&mut self, id: BoxId) -> bool {
        if !self.active_boxes.swap_remove(&id) {
            return false;
        }
        let removed = self.index.remove(EntityRef::Box(id));
        debug_assert!(removed, "active box {} missing from index", id.index());
        self.drop_relations_of(EntityRef::Box(id));
        true
    }

    /// Drops a committed cluster from the cluster set, the index and the
    /// relation set. Its members keep their (now dangling) back-reference
    /// until the caller re-points them.
    pub(crate) fn remove_cluster(&mut self, id: ClusterId) -> Option<Cluster> {
        self.drop_relations_of(EntityRef::Cluster(id));
        let cluster = self.clusters.shift_remove(&id)?;
        let removed = self.index.remove(EntityRef::Cluster(id));
        debug_assert!(removed, "cluster {} missing from index", id.value());
        Some(cluster)
    }

    /// Commits a cluster: back-references, index and cluster set.
    pub(crate) fn insert_cluster(&mut self, cluster: Cluster) {
        let id = cluster.id();
        for member in cluster.members() {
            self.boxes[member.index()].cluster = Some(id);
        }
        self.index.insert(EntityRef::Cluster(id), cluster.bbox());
        self.clusters.insert(id, cluster);
    }

    /// Adds a relation to the active set and registers it on both endpoints.
    pub(crate) fn insert_relation(&mut self, relation: Relation) {
        let key = relation.key;
        self.register(key.first(), key.second(), key);
        self.register(key.second(), key.first(), key);
        self.queue.push(key, relation.similarity);
        self.relations.insert(key, relation);
    }

    /// Removes a relation from the active set and from both endpoints.
    pub(crate) fn remove_relation(&mut self, key: &RelationKey) -> Option<Relation> {
        let relation = self.relations.swap_remove(key)?;
        self.queue.remove(key);
        self.unregister(key.first(), key.second());
        self.unregister(key.second(), key.first());
        Some(relation)
    }

    fn drop_relations_of(&mut self, entity: EntityRef) {
        let keys: Vec<RelationKey> = match entity {
            EntityRef::Box(id) => self.boxes[id.index()].relations.values().copied().collect(),
            EntityRef::Cluster(id) => self
                .clusters
                .get(&id)
                .map(|c| c.relations.values().copied().collect())
                .unwrap_or_default(),
        };
        for key in keys {
            self.remove_relation(&key);
        }
    }

    fn register(&mut self, on: EntityRef, other: EntityRef, key: RelationKey) {
        match on {
            EntityRef::Box(id) => {
                self.boxes[id.index()].relations.insert(other, key);
            }
            EntityRef::Cluster(id) => {
                if let Some(c) = self.clusters.get_mut(&id) {
                    c.relations.insert(other, key);
                }
            }
        }
    }

    fn unregister(&mut self, on: EntityRef, other: EntityRef) {
        match on {
            EntityRef::Box(id) => {
                self.boxes[id.index()].relations.swap_remove(&other);
            }
            EntityRef::Cluster(id) => {
                if let Some(c) = self.clusters.get_mut(&id) {
                    c.relations.swap_remove(&other);
                }
            }
        }
    }

    /// Verifies that the index mirrors the active sets exactly and that
    /// cluster membership and bounds are consistent.
    pub fn check_index_sync(&self) -> Result<()> {
        let expected = self.active_boxes.len() + self.clusters.len();
        if self.index.len() != expected {
            return Err(ClusterError::IndexDesync(format!(
                "index holds {} entries, expected {} ({} boxes, {} clusters)",
                self.index.len(),
                expected,
                self.active_boxes.len(),
                self.clusters.len()
            )));
        }

        for id in &self.active_boxes {
            let b = self.page_box(*id);
            if b.cluster().is_some() {
                return Err(ClusterError::IndexDesync(format!(
                    "active box {} still belongs to a cluster",
                    b.key()
                )));
            }
            if self.index.bbox_of(b.entity()) != Some(b.bbox()) {
                return Err(ClusterError::IndexDesync(format!(
                    "active box {} not indexed at {}",
                    b.key(),
                    bbox2str(b.bbox())
                )));
            }
        }

        let mut owner: Vec<Option<ClusterId>> = vec![None; self.boxes.len()];
        for cluster in self.clusters.values() {
            if self.index.bbox_of(cluster.entity()) != Some(cluster.bbox()) {
                return Err(ClusterError::IndexDesync(format!(
                    "cluster {} not indexed at {}",
                    cluster.id().value(),
                    bbox2str(cluster.bbox())
                )));
            }
            let mut envelope = cluster.clone();
            envelope.recompute_bounds(&self.boxes);
            if envelope.bbox() != cluster.bbox() {
                return Err(ClusterError::IndexDesync(format!(
                    "cluster {} bounds {} differ from member envelope {}",
                    cluster.id().value(),
                    bbox2str(cluster.bbox()),
                    bbox2str(envelope.bbox())
                )));
            }
            for member in cluster.members() {
                let slot = &mut owner[member.index()];
                if slot.is_some() || self.page_box(member).cluster() != Some(cluster.id()) {
                    return Err(ClusterError::IndexDesync(format!(
                        "box {} has inconsistent cluster membership",
                        self.page_box(member).key()
                    )));
                }
                *slot = Some(cluster.id());
            }
        }
        Ok(())
    }
}
