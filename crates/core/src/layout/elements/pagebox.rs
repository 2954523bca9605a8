//! PageBox - leaf visual primitive extracted from a page.

use indexmap::IndexMap;

use crate::utils::Rect;

use super::super::selector::Direction;
use super::color::Color;
use super::component::Component;
use super::entity::{BoxId, ClusterId, EntityRef};
use super::relation::RelationKey;

/// A rectangular visual primitive with a color.
#[derive(Debug, Clone)]
pub struct PageBox {
    pub(crate) id: BoxId,
    /// Stable external identity (record id, or derived from geometry+color).
    pub(crate) key: String,
    pub(crate) component: Component,
    pub(crate) color: Color,
    /// Largest absolute distance among the current direct neighbours.
    pub(crate) max_neighbour_distance: f64,
    /// Owning cluster, if any.
    pub(crate) cluster: Option<ClusterId>,
    /// Direct neighbours found by discovery, with the direction they lie in.
    pub(crate) direct: IndexMap<BoxId, Direction>,
    /// Active relations, keyed by the entity on the other end.
    pub(crate) relations: IndexMap<EntityRef, RelationKey>,
}

impl PageBox {
    pub fn new(id: BoxId, key: impl Into<String>, bbox: Rect, color: Color) -> Self {
        Self {
            id,
            key: key.into(),
            component: Component::new(bbox),
            color,
            max_neighbour_distance: 0.0,
            cluster: None,
            direct: IndexMap::new(),
            relations: IndexMap::new(),
        }
    }

    /// Identity derived from geometry and color, used when the input carries
    /// no id.
    pub fn derive_key(bbox: Rect, color: Color) -> String {
        let (x0, y0, x1, y1) = bbox;
        format!(
            "{x0}-{y0}-{x1}-{y1}-{:02x}{:02x}{:02x}",
            color.r, color.g, color.b
        )
    }

    pub fn id(&self) -> BoxId {
        self.id
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::Box(self.id)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn cluster(&self) -> Option<ClusterId> {
        self.cluster
    }

    pub fn max_neighbour_distance(&self) -> f64 {
        self.max_neighbour_distance
    }

    pub fn direct_neighbours(&self) -> impl Iterator<Item = (BoxId, Direction)> + '_ {
        self.direct.iter().map(|(id, dir)| (*id, *dir))
    }

    pub fn relations(&self) -> impl Iterator<Item = (EntityRef, RelationKey)> + '_ {
        self.relations.iter().map(|(e, k)| (*e, *k))
    }

    /// Raises the neighbour-distance normalizer; never lowers it.
    pub(crate) fn bump_max_neighbour_distance(&mut self, distance: f64) {
        if distance.is_finite() && distance > self.max_neighbour_distance {
            self.max_neighbour_distance = distance;
        }
    }

    /// Records a direct neighbour found by discovery.
    pub(crate) fn add_direct(&mut self, other: BoxId, direction: Direction, distance: f64) {
        self.direct.entry(other).or_insert(direction);
        self.bump_max_neighbour_distance(distance);
    }

    /// True if the box has direct neighbours and all of them lie above or
    /// below it.
    pub fn has_only_vertical_neighbours(&self) -> bool {
        !self.direct.is_empty() && self.direct.values().all(|d| d.is_vertical())
    }
}

impl_has_bbox_delegate!(PageBox, component);
