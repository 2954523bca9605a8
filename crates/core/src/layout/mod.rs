//! Box clustering engine.
//!
//! This module contains:
//! - Page box, cluster and relation types
//! - Directional geometry (direction classification, search strips)
//! - The spatial index over boxes and clusters
//! - Clustering parameters (ClusteringParams)
//! - Neighbour discovery, similarity scoring and the merge loop
//! - JSON records for input pages and output segmentations

pub mod analysis;
pub mod elements;
pub mod index;
pub mod params;
pub mod records;
pub mod selector;

pub use params::*;

pub use elements::*;

pub use analysis::*;

pub use index::{IndexEntry, SpatialIndex};
pub use records::{
    BoxRecord, ClusterRecord, PageInput, PageSize, SegmentRecord, SegmentationDocument,
};
pub use selector::{Direction, SearchStrip, absolute_distance, classify};
