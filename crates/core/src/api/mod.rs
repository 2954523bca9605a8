//! High-level API module for box segmentation.
//!
//! # Example
//!
//! ```ignore
//! use boxclust_core::api::{segment_json, SegmentOptions};
//!
//! let json = std::fs::read_to_string("page.json")?;
//! let doc = segment_json(&json, None)?;
//! ```

pub mod high_level;

pub use high_level::{
    DEFAULT_SEGM_TAG, SegmentOptions, segment_json, segment_page, segment_pages, segment_to_fp,
};
