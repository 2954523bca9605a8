//! boxclust - groups the rectangular visual primitives of a rendered page
//! into visually coherent segments.

pub mod api;
pub mod error;
pub mod layout;
pub mod utils;

pub use api::high_level;

pub use error::{ClusterError, Result};
