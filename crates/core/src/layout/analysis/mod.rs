//! Clustering analysis - neighbour discovery and greedy merging
//!
//! Contains the phases of one clustering run:
//! - Container removal
//! - Neighbour discovery and relation scoring
//! - The greedy merge loop with overlap absorption

mod clustering;
mod containers;
mod neighbours;
mod queue;
mod similarity;
mod state;

pub use clustering::{
    CandidateSnapshot, ClusteringManager, ClusteringStats, Segmentation, Termination,
    cluster_boxes,
};
pub use containers::{overlapping_count, remove_containers};
pub use neighbours::{NeighbourHits, discover_neighbours, find_direct_neighbours};
pub use queue::{QueueEntry, RelationQueue};
pub use similarity::{
    bidirectional_similarity, box_similarity, color_similarity, combine, entity_similarity,
    pair_similarity, relative_distance, shape_similarity,
};
pub use state::ClusteringState;
