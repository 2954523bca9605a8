//! Similarity scoring between boxes and clusters.
//!
//! Scores are dissimilarities in [0, 1]: 0 means "merge first", 1 means
//! "never merge". A score combines relative distance, shape and color.

use crate::utils::{EPSILON, HasBBox};

use super::super::elements::{BoxId, EntityRef, PageBox};
use super::state::ClusteringState;

/// Absolute distance normalized by one box's neighbour-distance scale.
///
/// A zero scale only ever happens when every neighbour of the box touches
/// it, so any positive gap is as far as it gets.
fn normalize(distance: f64, scale: f64) -> f64 {
    if distance <= 0.0 {
        0.0
    } else if scale <= EPSILON {
        1.0
    } else {
        distance / scale
    }
}

/// Mean of the distance normalized by each box's own scale.
pub fn relative_distance(distance: f64, a: &PageBox, b: &PageBox) -> f64 {
    let from_a = normalize(distance, a.max_neighbour_distance());
    let from_b = normalize(distance, b.max_neighbour_distance());
    (from_a + from_b) / 2.0
}

/// Long side over short side; at least 1.
fn aspect_ratio(b: &impl HasBBox) -> f64 {
    let w = b.width().abs().max(EPSILON);
    let h = b.height().abs().max(EPSILON);
    if w >= h { w / h } else { h / w }
}

/// Shape dissimilarity: mean of the aspect-ratio and area disparities,
/// at most 1.
pub fn shape_similarity(a: &impl HasBBox, b: &impl HasBBox) -> f64 {
    let (ra, rb) = (aspect_ratio(a), aspect_ratio(b));
    let (max_ratio, min_ratio) = if ra >= rb { (ra, rb) } else { (rb, ra) };
    let denominator = (max_ratio * max_ratio - 1.0) / max_ratio;
    let ratio_term = if denominator <= EPSILON {
        0.0
    } else {
        (max_ratio - min_ratio) / denominator
    };

    let (area_a, area_b) = (a.area(), b.area());
    let max_area = area_a.max(area_b);
    let area_term = if max_area <= EPSILON {
        0.0
    } else {
        1.0 - area_a.min(area_b) / max_area
    };

    ((ratio_term + area_term) / 2.0).clamp(0.0, 1.0)
}

/// Color dissimilarity in [0, 1].
pub fn color_similarity(a: &PageBox, b: &PageBox) -> f64 {
    a.color().distance(b.color())
}

/// Combines a relative distance with shape and color.
///
/// Touching boxes (relative distance <= 0) score 0, boxes at or beyond their
/// neighbour scale score 1.
pub fn combine(relative: f64, a: &PageBox, b: &PageBox) -> f64 {
    if relative <= 0.0 {
        0.0
    } else if relative >= 1.0 {
        1.0
    } else {
        ((relative + shape_similarity(a, b) + color_similarity(a, b)) / 3.0).clamp(0.0, 1.0)
    }
}

/// Box-to-box similarity for boxes `distance` apart.
pub fn box_similarity(a: &PageBox, b: &PageBox, distance: f64) -> f64 {
    combine(relative_distance(distance, a, b), a, b)
}

/// Similarity of a vertically related pair scored once with each box's own
/// scale, averaged.
pub fn bidirectional_similarity(a: &PageBox, b: &PageBox, distance: f64) -> f64 {
    let from_a = combine(normalize(distance, a.max_neighbour_distance()), a, b);
    let from_b = combine(normalize(distance, b.max_neighbour_distance()), a, b);
    (from_a + from_b) / 2.0
}

/// Similarity of two directly related member boxes, or None if they are not
/// neighbours.
pub fn pair_similarity(state: &ClusteringState, a: BoxId, b: BoxId) -> Option<f64> {
    let relation = state.direct_relation(a, b)?;
    let (box_a, box_b) = (state.page_box(a), state.page_box(b));
    if relation.is_vertical()
        && box_a.has_only_vertical_neighbours()
        && box_b.has_only_vertical_neighbours()
    {
        return Some(bidirectional_similarity(
            box_a,
            box_b,
            relation.absolute_distance,
        ));
    }
    Some(relation.similarity)
}

/// Sum and count of direct relations between `member` and `others`.
fn accumulate(state: &ClusteringState, member: BoxId, others: &[BoxId]) -> (f64, usize) {
    others
        .iter()
        .filter_map(|other| pair_similarity(state, member, *other))
        .fold((0.0, 0), |(sum, n), s| (sum + s, n + 1))
}

/// Similarity between two active entities.
///
/// Box pairs use their direct relation. When a cluster is involved the score
/// is the mean over every directly related member pair. Cluster pairs walk the
/// members of the second cluster against the first. Entities with no related
/// member pair score 1.
pub fn entity_similarity(state: &ClusteringState, a: EntityRef, b: EntityRef) -> f64 {
    let (sum, cardinality) = match (a, b) {
        (EntityRef::Box(x), EntityRef::Box(y)) => {
            return state
                .direct_relation(x, y)
                .map(|r| r.similarity)
                .unwrap_or(1.0);
        }
        (EntityRef::Cluster(_), EntityRef::Box(x)) | (EntityRef::Box(x), EntityRef::Cluster(_)) => {
            let cluster = if a.is_cluster() { a } else { b };
            accumulate(state, x, &state.members_of(cluster))
        }
        (EntityRef::Cluster(_), EntityRef::Cluster(_)) => {
            let forward = state.members_of(a);
            state
                .members_of(b)
                .into_iter()
                .map(|member| accumulate(state, member, &forward))
                .fold((0.0, 0), |(s, n), (ds, dn)| (s + ds, n + dn))
        }
    };
    if cardinality == 0 {
        return 1.0;
    }
    (sum / cardinality as f64).clamp(0.0, 1.0)
}
