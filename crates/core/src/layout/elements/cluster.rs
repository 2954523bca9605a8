//! Cluster - a flat group of boxes with an envelope rectangle.

use indexmap::{IndexMap, IndexSet};

use crate::utils::{HasBBox, INF_F64, bbox_union};

use super::component::Component;
use super::entity::{BoxId, ClusterId, EntityRef};
use super::pagebox::PageBox;
use super::relation::RelationKey;

/// A merged group of boxes.
///
/// Members are box ids into the page arena; clusters never nest. The bounds
/// are always the exact envelope of the members.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub(crate) id: ClusterId,
    pub(crate) component: Component,
    pub(crate) members: IndexSet<BoxId>,
    /// Active relations, keyed by the entity on the other end.
    pub(crate) relations: IndexMap<EntityRef, RelationKey>,
}

impl Cluster {
    /// Creates an empty cluster. Its bounds are inverted until a box is added.
    pub fn new(id: ClusterId) -> Self {
        Self {
            id,
            component: Component::new((INF_F64, INF_F64, -INF_F64, -INF_F64)),
            members: IndexSet::new(),
            relations: IndexMap::new(),
        }
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::Cluster(self.id)
    }

    pub fn members(&self) -> impl Iterator<Item = BoxId> + '_ {
        self.members.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: BoxId) -> bool {
        self.members.contains(&id)
    }

    pub fn relations(&self) -> impl Iterator<Item = (EntityRef, RelationKey)> + '_ {
        self.relations.iter().map(|(e, k)| (*e, *k))
    }

    /// Adds a box and grows the envelope. Returns false if already a member.
    pub fn add_box(&mut self, b: &PageBox) -> bool {
        if !self.members.insert(b.id) {
            return false;
        }
        let grown = bbox_union(self.component.bbox(), b.bbox());
        self.component.set_bbox(grown);
        true
    }

    /// Flattens another cluster's members into this one.
    pub fn add_cluster(&mut self, other: &Cluster, boxes: &[PageBox]) -> usize {
        other
            .members()
            .filter(|id| self.add_box(&boxes[id.index()]))
            .count()
    }

    /// Recomputes the envelope from scratch from the member boxes.
    pub fn recompute_bounds(&mut self, boxes: &[PageBox]) {
        let bbox = self
            .members
            .iter()
            .map(|id| boxes[id.index()].bbox())
            .fold((INF_F64, INF_F64, -INF_F64, -INF_F64), bbox_union);
        self.component.set_bbox(bbox);
    }
}

impl_has_bbox_delegate!(Cluster, component);
