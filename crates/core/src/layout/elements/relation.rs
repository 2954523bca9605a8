//! Scored adjacency edges between entities.

use crate::utils::Rect;

use super::super::selector::{Direction, relate};
use super::entity::EntityRef;

/// Canonical identity of a relation: the endpoints in ascending order.
///
/// `RelationKey::new(a, b) == RelationKey::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationKey {
    first: EntityRef,
    second: EntityRef,
}

impl RelationKey {
    pub fn new(a: EntityRef, b: EntityRef) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    pub fn first(&self) -> EntityRef {
        self.first
    }

    pub fn second(&self) -> EntityRef {
        self.second
    }
}

/// An edge between two entities.
///
/// `direction` is where the second endpoint of the key lies relative to the
/// first. `similarity` is a dissimilarity-ordered score in [0, 1]: 0 merges
/// first, 1 never merges.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub key: RelationKey,
    pub direction: Direction,
    pub absolute_distance: f64,
    pub similarity: f64,
}

impl Relation {
    /// Builds the canonical relation between two rectangles. The similarity
    /// starts at 1 until scored.
    pub fn between(a: EntityRef, a_rect: Rect, b: EntityRef, b_rect: Rect) -> Self {
        let key = RelationKey::new(a, b);
        let (first_rect, second_rect) = if key.first() == a {
            (a_rect, b_rect)
        } else {
            (b_rect, a_rect)
        };
        let (direction, absolute_distance) = relate(first_rect, second_rect);
        Self {
            key,
            direction,
            absolute_distance,
            similarity: 1.0,
        }
    }

    /// Direction of the other endpoint as seen from `from`.
    pub fn direction_from(&self, from: EntityRef) -> Direction {
        if from == self.key.first() {
            self.direction
        } else {
            self.direction.opposite()
        }
    }

    pub fn is_vertical(&self) -> bool {
        self.direction.is_vertical()
    }
}
