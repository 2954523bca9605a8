//! Directional selectors over rectangles.
//!
//! Classifies the relative position of two rectangles, measures the gap
//! between them and produces the growing search strips used by neighbour
//! discovery.

use serde::{Deserialize, Serialize};

use crate::utils::{HasBBox, Rect};

use super::elements::Component;

/// Relative position of one rectangle with respect to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Right,
    Down,
    Left,
    Up,
    Other,
}

impl Direction {
    /// The directions neighbour discovery searches in.
    pub const SEARCH: [Direction; 4] = [
        Direction::Right,
        Direction::Down,
        Direction::Left,
        Direction::Up,
    ];

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Right => Direction::Left,
            Direction::Left => Direction::Right,
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::Other => Direction::Other,
        }
    }
}

/// Classifies where `b` lies relative to `a`.
///
/// Rectangles whose projections overlap on exactly one axis and are disjoint
/// or adjacent on the other get a cardinal direction; everything else
/// (diagonal, overlapping) is `Other`.
pub fn classify(a: Rect, b: Rect) -> Direction {
    let ca = Component::new(a);
    let cb = Component::new(b);
    match (ca.is_hoverlap(&cb), ca.is_voverlap(&cb)) {
        (false, true) => {
            if b.0 >= a.2 {
                Direction::Right
            } else {
                Direction::Left
            }
        }
        (true, false) => {
            if b.1 >= a.3 {
                Direction::Down
            } else {
                Direction::Up
            }
        }
        _ => Direction::Other,
    }
}

/// Gap between `a` and `b` along the axis of `direction`.
///
/// For `Other` this is the larger of the two axis gaps, which is 0 for
/// overlapping rectangles.
pub fn absolute_distance(a: Rect, b: Rect, direction: Direction) -> f64 {
    let gap = match direction {
        Direction::Right => b.0 - a.2,
        Direction::Left => a.0 - b.2,
        Direction::Down => b.1 - a.3,
        Direction::Up => a.1 - b.3,
        Direction::Other => {
            let ca = Component::new(a);
            let cb = Component::new(b);
            ca.hdistance(&cb).max(ca.vdistance(&cb))
        }
    };
    gap.max(0.0)
}

/// Direction and absolute distance from `a` to `b` in one call.
pub fn relate(a: Rect, b: Rect) -> (Direction, f64) {
    let direction = classify(a, b);
    (direction, absolute_distance(a, b, direction))
}

/// Growing search strips starting at one edge of a rectangle.
///
/// Each step extends the strip outwards by `step`; the last strip yielded is
/// the one that reaches the page boundary.
#[derive(Debug, Clone)]
pub struct SearchStrip {
    origin: Rect,
    direction: Direction,
    step: f64,
    page: (f64, f64),
    extent: f64,
    done: bool,
}

impl SearchStrip {
    /// Creates a strip iterator. `page` is (width, height).
    pub fn new(origin: &impl HasBBox, direction: Direction, step: f64, page: (f64, f64)) -> Self {
        Self {
            origin: origin.bbox(),
            direction,
            step,
            page,
            extent: 0.0,
            done: direction == Direction::Other || step <= 0.0,
        }
    }
}

impl Iterator for SearchStrip {
    type Item = Rect;

    fn next(&mut self) -> Option<Rect> {
        if self.done {
            return None;
        }
        self.extent += self.step;
        let (x0, y0, x1, y1) = self.origin;
        let (page_w, page_h) = self.page;
        let strip = match self.direction {
            Direction::Right => {
                let end = x1 + self.extent;
                self.done = end >= page_w;
                (x1, y0, end.min(page_w).max(x1), y1)
            }
            Direction::Left => {
                let start = x0 - self.extent;
                self.done = start <= 0.0;
                (start.max(0.0).min(x0), y0, x0, y1)
            }
            Direction::Down => {
                let end = y1 + self.extent;
                self.done = end >= page_h;
                (x0, y1, x1, end.min(page_h).max(y1))
            }
            Direction::Up => {
                let start = y0 - self.extent;
                self.done = start <= 0.0;
                (x0, start.max(0.0).min(y0), x1, y0)
            }
            Direction::Other => unreachable!("Other strips are never started"),
        };
        Some(strip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_cardinal() {
        let a = (10.0, 10.0, 20.0, 20.0);
        assert_eq!(classify(a, (25.0, 12.0, 30.0, 18.0)), Direction::Right);
        assert_eq!(classify(a, (0.0, 12.0, 5.0, 18.0)), Direction::Left);
        assert_eq!(classify(a, (12.0, 25.0, 18.0, 30.0)), Direction::Down);
        assert_eq!(classify(a, (12.0, 0.0, 18.0, 5.0)), Direction::Up);
    }

    #[test]
    fn test_classify_adjacent_and_other() {
        let a = (10.0, 10.0, 20.0, 20.0);
        // Touching on the right edge
        assert_eq!(classify(a, (20.0, 10.0, 30.0, 20.0)), Direction::Right);
        // Diagonal
        assert_eq!(classify(a, (25.0, 25.0, 30.0, 30.0)), Direction::Other);
        // Overlapping
        assert_eq!(classify(a, (15.0, 15.0, 30.0, 30.0)), Direction::Other);
        // Corner contact only
        assert_eq!(classify(a, (20.0, 20.0, 30.0, 30.0)), Direction::Other);
    }

    #[test]
    fn test_relate_is_mirrored() {
        let a = (10.0, 10.0, 20.0, 20.0);
        let b = (12.0, 32.0, 18.0, 40.0);
        let (ab, d_ab) = relate(a, b);
        let (ba, d_ba) = relate(b, a);
        assert_eq!(ab, Direction::Down);
        assert_eq!(ba, ab.opposite());
        assert_eq!(d_ab, 12.0);
        assert_eq!(d_ab, d_ba);
    }

    #[test]
    fn test_strip_grows_until_page_edge() {
        let origin = (10.0, 10.0, 20.0, 20.0);
        let strips: Vec<Rect> = SearchStrip::new(&origin, Direction::Right, 100.0, (250.0, 100.0))
            .collect();
        assert_eq!(
            strips,
            vec![
                (20.0, 10.0, 120.0, 20.0),
                (20.0, 10.0, 220.0, 20.0),
                (20.0, 10.0, 250.0, 20.0),
            ]
        );
    }

    #[test]
    fn test_strip_up_clamps_at_zero() {
        let origin = (10.0, 60.0, 20.0, 70.0);
        let strips: Vec<Rect> =
            SearchStrip::new(&origin, Direction::Up, 50.0, (100.0, 100.0)).collect();
        assert_eq!(strips, vec![(10.0, 10.0, 20.0, 60.0), (10.0, 0.0, 20.0, 60.0)]);
    }
}
