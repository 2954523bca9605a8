//! Base component with bounding box.

use std::hash::Hash;

use crate::utils::{HasBBox, Rect, bbox_area};

/// Base component with a bounding box (left, top, right, bottom).
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub(crate) x0: f64,
    pub(crate) y0: f64,
    pub(crate) x1: f64,
    pub(crate) y1: f64,
}

impl Component {
    pub fn new(bbox: Rect) -> Self {
        let (x0, y0, x1, y1) = bbox;
        Self { x0, y0, x1, y1 }
    }

    pub fn set_bbox(&mut self, bbox: Rect) {
        let (x0, y0, x1, y1) = bbox;
        self.x0 = x0;
        self.y0 = y0;
        self.x1 = x1;
        self.y1 = y1;
    }

    pub fn bbox(&self) -> Rect {
        (self.x0, self.y0, self.x1, self.y1)
    }

    pub fn area(&self) -> f64 {
        bbox_area(self.bbox())
    }

    /// Returns true if the horizontal projections overlap by more than a point.
    pub fn is_hoverlap(&self, other: &Component) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1
    }

    /// Returns the horizontal gap to another component, 0 if they overlap.
    pub fn hdistance(&self, other: &Component) -> f64 {
        (other.x0 - self.x1).max(self.x0 - other.x1).max(0.0)
    }

    /// Returns true if the vertical projections overlap by more than a point.
    pub fn is_voverlap(&self, other: &Component) -> bool {
        self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Returns the vertical gap to another component, 0 if they overlap.
    pub fn vdistance(&self, other: &Component) -> f64 {
        (other.y0 - self.y1).max(self.y0 - other.y1).max(0.0)
    }
}

impl HasBBox for Component {
    fn x0(&self) -> f64 {
        self.x0
    }
    fn y0(&self) -> f64 {
        self.y0
    }
    fn x1(&self) -> f64 {
        self.x1
    }
    fn y1(&self) -> f64 {
        self.y1
    }
}

impl Eq for Component {}

impl Hash for Component {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.x0.to_bits().hash(state);
        self.y0.to_bits().hash(state);
        self.x1.to_bits().hash(state);
        self.y1.to_bits().hash(state);
    }
}
