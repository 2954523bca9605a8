//! Container removal.
//!
//! Boxes whose interior overlaps several other boxes are structural wrappers
//! (page backgrounds, layout divs) rather than visual units. They are dropped
//! before neighbour discovery.

use tracing::{debug, trace};

use crate::utils::{HasBBox, shrink_rect};

use super::super::elements::BoxId;
use super::state::ClusteringState;

/// Number of other indexed entities intersecting the shrunk rectangle of `id`.
pub fn overlapping_count(state: &ClusteringState, id: BoxId) -> usize {
    let query = shrink_rect(state.page_box(id).bbox(), state.params.shrink);
    state
        .index
        .search_entities(query)
        .into_iter()
        .filter(|e| e.as_box() != Some(id))
        .count()
}

/// Runs one removal pass per entry of `params.container_limits`.
///
/// Returns the removed boxes in removal order.
pub fn remove_containers(state: &mut ClusteringState) -> Vec<BoxId> {
    let limits = state.params.container_limits.clone();
    let mut removed = Vec::new();
    for (pass, limit) in limits.into_iter().enumerate() {
        let candidates = state.sorted_active_boxes();
        let before = removed.len();
        for id in candidates {
            let count = overlapping_count(state, id);
            if count > limit {
                trace!(
                    box_id = state.page_box(id).key(),
                    overlapping = count,
                    pass,
                    "removing container box"
                );
                state.deactivate_box(id);
                removed.push(id);
            }
        }
        debug!(pass, limit, removed = removed.len() - before, "container pass");
    }
    state.containers.extend(removed.iter().copied());
    removed
}
