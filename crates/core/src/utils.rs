//! Geometry helpers and the Plane spatial structure.
//!
//! Provides:
//! - Rectangle type and the `HasBBox` accessor trait
//! - Rectangle arithmetic (union, area, shrink, intersection)
//! - Plane: bulk-loaded + dynamic R-tree for overlap queries

use geo_index::rtree::sort::HilbertSort;
use geo_index::rtree::{RTree as GeoRTree, RTreeBuilder, RTreeIndex};
use rstar::{AABB, RTree, RTreeObject};

/// Floating-point infinity for bounding box calculations.
pub const INF_F64: f64 = f64::MAX;

/// Small epsilon for floating-point comparisons.
pub const EPSILON: f64 = 1e-9;

/// A rectangle defined by (left, top, right, bottom) in page coordinates.
/// The y axis grows downwards, so `top <= bottom` for a valid rectangle.
pub type Rect = (f64, f64, f64, f64);

/// Compares two floats for approximate equality.
#[inline]
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// Trait for objects that have a bounding box.
pub trait HasBBox {
    fn x0(&self) -> f64;
    fn y0(&self) -> f64;
    fn x1(&self) -> f64;
    fn y1(&self) -> f64;

    fn bbox(&self) -> Rect {
        (self.x0(), self.y0(), self.x1(), self.y1())
    }

    fn width(&self) -> f64 {
        self.x1() - self.x0()
    }

    fn height(&self) -> f64 {
        self.y1() - self.y0()
    }

    fn area(&self) -> f64 {
        bbox_area(self.bbox())
    }
}

impl HasBBox for Rect {
    fn x0(&self) -> f64 {
        self.0
    }
    fn y0(&self) -> f64 {
        self.1
    }
    fn x1(&self) -> f64 {
        self.2
    }
    fn y1(&self) -> f64 {
        self.3
    }
}

/// Calculate area of a bounding box. Inverted boxes have zero area.
pub fn bbox_area(bbox: Rect) -> f64 {
    let w = (bbox.2 - bbox.0).max(0.0);
    let h = (bbox.3 - bbox.1).max(0.0);
    w * h
}

/// Calculate union of two bounding boxes.
pub const fn bbox_union(a: Rect, b: Rect) -> Rect {
    (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3))
}

/// Envelope of a sequence of rectangles, or `None` for an empty sequence.
pub fn get_bound<I: IntoIterator<Item = Rect>>(rects: I) -> Option<Rect> {
    rects.into_iter().reduce(bbox_union)
}

/// Shrinks a rectangle by `amount` on every side.
///
/// A side shorter than `2 * amount` collapses onto its center line instead of
/// inverting.
pub fn shrink_rect(bbox: Rect, amount: f64) -> Rect {
    let (mut x0, mut y0, mut x1, mut y1) = bbox;
    if x1 - x0 > 2.0 * amount {
        x0 += amount;
        x1 -= amount;
    } else {
        let cx = (x0 + x1) / 2.0;
        x0 = cx;
        x1 = cx;
    }
    if y1 - y0 > 2.0 * amount {
        y0 += amount;
        y1 -= amount;
    } else {
        let cy = (y0 + y1) / 2.0;
        y0 = cy;
        y1 = cy;
    }
    (x0, y0, x1, y1)
}

/// Inclusive intersection test: rectangles sharing only an edge intersect.
#[inline]
pub fn bbox_intersects(a: Rect, b: Rect) -> bool {
    a.0 <= b.2 && b.0 <= a.2 && a.1 <= b.3 && b.1 <= a.3
}

/// Formats a bounding box for log output.
pub fn bbox2str(bbox: Rect) -> String {
    let (x0, y0, x1, y1) = bbox;
    format!("{x0:.3},{y0:.3},{x1:.3},{y1:.3}")
}

#[derive(Clone)]
struct PlaneNode {
    id: usize,
    bbox: Rect,
}

impl PartialEq for PlaneNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl RTreeObject for PlaneNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.bbox.0, self.bbox.1], [self.bbox.2, self.bbox.3])
    }
}

/// A set-like data structure for objects placed on a plane.
///
/// Uses a static geo-index R-tree for the initial bulk-loaded items and a
/// dynamic rstar R-tree for incremental inserts. Items are stored in insertion
/// order, and ids are stable (id == seq index). Removal tombstones the slot.
pub struct Plane<T> {
    /// Items in insertion order (id == index)
    seq: Vec<T>,
    /// Cached bbox per item (used for removal)
    bboxes: Vec<Rect>,
    /// Active ids
    alive: Vec<bool>,
    alive_count: usize,
    /// Static spatial index for bulk-loaded items
    static_tree: Option<GeoRTree<f64>>,
    /// Count of items in the static tree (ids 0..static_count)
    static_count: usize,
    /// Dynamic spatial index (id + bbox only)
    dynamic_tree: RTree<PlaneNode>,
}

impl<T: HasBBox> Default for Plane<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HasBBox> Plane<T> {
    pub fn new() -> Self {
        Self {
            seq: Vec::new(),
            bboxes: Vec::new(),
            alive: Vec::new(),
            alive_count: 0,
            static_tree: None,
            static_count: 0,
            dynamic_tree: RTree::new(),
        }
    }

    /// Adds multiple objects to the plane and returns the id of the first one.
    ///
    /// The first bulk load into an empty plane builds the static tree; later
    /// batches go into the dynamic tree.
    pub fn extend(&mut self, objs: impl IntoIterator<Item = T>) -> usize {
        let start_idx = self.seq.len();
        let items: Vec<T> = objs.into_iter().collect();
        if items.is_empty() {
            return start_idx;
        }

        self.seq.reserve(items.len());
        self.bboxes.reserve(items.len());
        self.alive.reserve(items.len());

        let mut nodes = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let id = start_idx + i;
            let bbox = item.bbox();
            self.seq.push(item);
            self.bboxes.push(bbox);
            self.alive.push(true);
            self.alive_count += 1;
            nodes.push((id, bbox));
        }

        if start_idx == 0 && self.static_tree.is_none() && self.dynamic_tree.size() == 0 {
            let mut builder: RTreeBuilder<f64> = RTreeBuilder::new(nodes.len() as u32);
            for (_id, bbox) in &nodes {
                builder.add(bbox.0, bbox.1, bbox.2, bbox.3);
            }
            self.static_tree = Some(builder.finish::<HilbertSort>());
            self.static_count = nodes.len();
        } else {
            for (id, bbox) in nodes {
                self.dynamic_tree.insert(PlaneNode { id, bbox });
            }
        }
        start_idx
    }

    /// Adds an object to the plane (indexed immediately) and returns its id.
    pub fn add(&mut self, obj: T) -> usize {
        let id = self.seq.len();
        let bbox = obj.bbox();
        self.seq.push(obj);
        self.bboxes.push(bbox);
        self.alive.push(true);
        self.alive_count += 1;
        self.dynamic_tree.insert(PlaneNode { id, bbox });
        id
    }

    /// Removes an object by id. Returns false if the id is unknown or dead.
    pub fn remove_by_id(&mut self, id: usize) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.alive[id] = false;
        self.alive_count = self.alive_count.saturating_sub(1);

        // Static entries are filtered through `alive` on every query.
        if id < self.static_count {
            return true;
        }

        let bbox = self.bboxes[id];
        self.dynamic_tree.remove(&PlaneNode { id, bbox }).is_some()
    }

    #[inline]
    pub fn is_alive(&self, id: usize) -> bool {
        self.alive.get(id).copied().unwrap_or(false)
    }

    pub fn get(&self, id: usize) -> Option<&T> {
        if self.is_alive(id) {
            self.seq.get(id)
        } else {
            None
        }
    }

    /// Finds objects that intersect the given bounding box (edges inclusive).
    pub fn find(&self, bbox: Rect) -> Vec<&T> {
        self.find_with_indices(bbox)
            .into_iter()
            .map(|(_, obj)| obj)
            .collect()
    }

    /// Finds objects that intersect the given bounding box, returning
    /// (index, object) pairs ordered by index.
    pub fn find_with_indices(&self, bbox: Rect) -> Vec<(usize, &T)> {
        let (x0, y0, x1, y1) = bbox;
        let mut result = Vec::with_capacity(16);

        if let Some(tree) = &self.static_tree {
            for id in tree.search(x0, y0, x1, y1) {
                let id = id as usize;
                if id >= self.static_count || !self.alive[id] {
                    continue;
                }
                if bbox_intersects(self.bboxes[id], bbox) {
                    result.push((id, &self.seq[id]));
                }
            }
        }

        let env = AABB::from_corners([x0, y0], [x1, y1]);
        for node in self.dynamic_tree.locate_in_envelope_intersecting(&env) {
            if !self.is_alive(node.id) {
                continue;
            }
            if bbox_intersects(self.bboxes[node.id], bbox) {
                result.push((node.id, &self.seq[node.id]));
            }
        }

        // Tree traversal order is not stable across inserts; callers rely on
        // deterministic results.
        result.sort_unstable_by_key(|(id, _)| *id);
        result
    }

    /// Returns the number of active objects in the plane.
    pub fn len(&self) -> usize {
        self.alive_count
    }

    /// Returns true if the plane is empty.
    pub fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    /// Returns an iterator over all active objects with their indices.
    pub fn iter_with_indices(&self) -> impl Iterator<Item = (usize, &T)> {
        self.seq
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_alive(*i))
    }

    /// Returns an iterator over all active objects in the plane.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.iter_with_indices().map(|(_, obj)| obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shrink_rect_regular() {
        assert_eq!(shrink_rect((0.0, 0.0, 10.0, 4.0), 1.0), (1.0, 1.0, 9.0, 3.0));
    }

    #[test]
    fn test_shrink_rect_collapses_thin_side() {
        let r = shrink_rect((0.0, 0.0, 1.0, 10.0), 1.0);
        assert_eq!(r, (0.5, 1.0, 0.5, 9.0));
    }

    #[test]
    fn test_bbox_intersects_edges_inclusive() {
        assert!(bbox_intersects((0.0, 0.0, 1.0, 1.0), (1.0, 0.0, 2.0, 1.0)));
        assert!(!bbox_intersects((0.0, 0.0, 1.0, 1.0), (1.5, 0.0, 2.0, 1.0)));
    }

    #[test]
    fn test_get_bound() {
        assert_eq!(get_bound(Vec::<Rect>::new()), None);
        let rects = vec![(0.0, 5.0, 2.0, 6.0), (1.0, 1.0, 4.0, 2.0)];
        assert_eq!(get_bound(rects), Some((0.0, 1.0, 4.0, 6.0)));
    }

    #[test]
    fn test_plane_static_and_dynamic_find() {
        let mut plane: Plane<Rect> = Plane::new();
        plane.extend(vec![(0.0, 0.0, 10.0, 10.0), (20.0, 0.0, 30.0, 10.0)]);
        let dynamic = plane.add((10.0, 0.0, 20.0, 10.0));

        let hits: Vec<usize> = plane
            .find_with_indices((10.0, 5.0, 10.0, 5.0))
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(hits, vec![0, dynamic]);

        assert!(plane.remove_by_id(0));
        assert!(!plane.remove_by_id(0));
        assert!(plane.remove_by_id(dynamic));
        assert!(plane.find((10.0, 5.0, 10.0, 5.0)).is_empty());
        assert_eq!(plane.len(), 1);
    }
}
