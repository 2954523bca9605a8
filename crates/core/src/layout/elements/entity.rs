//! Entity identifiers and the Box/Cluster sum type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a box in the page arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoxId(usize);

impl BoxId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

/// Monotonic cluster identifier, independent of the cluster's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(u64);

impl ClusterId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Any entity that can be indexed or related: a box or a cluster.
///
/// Boxes order before clusters, which fixes the canonical endpoint order of
/// relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityRef {
    Box(BoxId),
    Cluster(ClusterId),
}

impl EntityRef {
    pub fn is_cluster(self) -> bool {
        matches!(self, EntityRef::Cluster(_))
    }

    pub fn as_box(self) -> Option<BoxId> {
        match self {
            EntityRef::Box(id) => Some(id),
            EntityRef::Cluster(_) => None,
        }
    }
}

impl From<BoxId> for EntityRef {
    fn from(id: BoxId) -> Self {
        EntityRef::Box(id)
    }
}

impl From<ClusterId> for EntityRef {
    fn from(id: ClusterId) -> Self {
        EntityRef::Cluster(id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Box(id) => write!(f, "box#{}", id.index()),
            EntityRef::Cluster(id) => write!(f, "cluster#{}", id.value()),
        }
    }
}
