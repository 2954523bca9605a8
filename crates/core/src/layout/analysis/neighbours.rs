//! Neighbour discovery.
//!
//! For every active box and each cardinal direction, a search strip grows
//! outward from the box edge until it hits at least one box lying in that
//! direction or reaches the page boundary. The nearest hits (ties kept)
//! become direct neighbours.

use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::debug;

use crate::utils::{EPSILON, HasBBox};

use super::super::elements::{BoxId, EntityRef, PageBox, Relation, RelationKey};
use super::super::index::SpatialIndex;
use super::super::selector::{Direction, SearchStrip, absolute_distance, classify};
use super::similarity::box_similarity;
use super::state::ClusteringState;

/// Nearest boxes found in one direction, with their absolute distance.
pub type NeighbourHits = SmallVec<[(BoxId, f64); 4]>;

/// Finds the nearest boxes in `direction` from `origin`.
///
/// Reads only the index and the box arena, so it is safe to run for many
/// boxes in parallel against a frozen index.
pub fn find_direct_neighbours(
    index: &SpatialIndex,
    boxes: &[PageBox],
    origin: &PageBox,
    direction: Direction,
    step: f64,
    page: (f64, f64),
) -> NeighbourHits {
    let origin_bbox = origin.bbox();
    for strip in SearchStrip::new(origin, direction, step, page) {
        let hits: NeighbourHits = index
            .search_entities(strip)
            .into_iter()
            .filter_map(EntityRef::as_box)
            .filter(|id| *id != origin.id())
            .filter_map(|id| {
                let bbox = boxes[id.index()].bbox();
                (classify(origin_bbox, bbox) == direction)
                    .then(|| (id, absolute_distance(origin_bbox, bbox, direction)))
            })
            .collect();
        if hits.is_empty() {
            continue;
        }

        let nearest = hits
            .iter()
            .map(|(_, d)| *d)
            .fold(f64::INFINITY, f64::min);
        return hits
            .into_iter()
            .filter(|(_, d)| *d - nearest <= EPSILON)
            .collect();
    }
    NeighbourHits::new()
}

/// Discovers direct neighbours for every active box, records the box-level
/// relations on both sides and scores them.
///
/// Returns the number of direct relations found.
pub fn discover_neighbours(state: &mut ClusteringState) -> usize {
    let active = state.sorted_active_boxes();
    let page = (state.page.width, state.page.height);
    let (lateral, vertical) = (state.params.lateral_step, state.params.vertical_step);

    let search = |id: &BoxId| -> Vec<(Direction, NeighbourHits)> {
        let origin = &state.boxes[id.index()];
        Direction::SEARCH
            .iter()
            .map(|dir| {
                let step = if dir.is_horizontal() { lateral } else { vertical };
                let hits =
                    find_direct_neighbours(&state.index, &state.boxes, origin, *dir, step, page);
                (*dir, hits)
            })
            .collect()
    };
    let found: Vec<Vec<(Direction, NeighbourHits)>> = if state.params.parallel_discovery {
        active.par_iter().map(search).collect()
    } else {
        active.iter().map(search).collect()
    };

    // Applied in input order so relation order is independent of scheduling.
    for (id, per_direction) in active.iter().zip(found) {
        for (direction, hits) in per_direction {
            for (other, distance) in hits {
                record_direct(state, *id, other, direction, distance);
            }
        }
    }

    let keys: Vec<_> = state.direct.keys().copied().collect();
    for key in &keys {
        let (Some(a), Some(b)) = (key.first().as_box(), key.second().as_box()) else {
            continue;
        };
        let distance = state.direct[key].absolute_distance;
        let similarity = box_similarity(state.page_box(a), state.page_box(b), distance);
        if let Some(relation) = state.direct.get_mut(key) {
            relation.similarity = similarity;
        }
    }

    let relations: Vec<Relation> = state.direct.values().cloned().collect();
    for relation in relations {
        state.insert_relation(relation);
    }

    debug!(
        boxes = active.len(),
        relations = keys.len(),
        "neighbour discovery finished"
    );
    keys.len()
}

fn record_direct(
    state: &mut ClusteringState,
    from: BoxId,
    to: BoxId,
    direction: Direction,
    distance: f64,
) {
    let (a, b) = (EntityRef::Box(from), EntityRef::Box(to));
    let from_bbox = state.page_box(from).bbox();
    let to_bbox = state.page_box(to).bbox();
    state
        .direct
        .entry(RelationKey::new(a, b))
        .or_insert_with(|| Relation::between(a, from_bbox, b, to_bbox));

    state.boxes[from.index()].add_direct(to, direction, distance);
    state.boxes[to.index()].add_direct(from, direction.opposite(), distance);
}
