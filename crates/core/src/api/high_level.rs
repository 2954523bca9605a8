//! High-level segmentation API.
//!
//! Provides the main public entry points:
//! - `segment_page()` - Cluster the boxes of one page
//! - `segment_json()` - JSON page document in, segmentation document out
//! - `segment_pages()` - Cluster many pages on a rayon pool

use std::io::{Read, Write};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{ClusterError, Result};
use crate::layout::{
    ClusteringManager, ClusteringParams, PageInput, Segmentation, SegmentationDocument,
};

/// Tag written into the `segm` field of cluster records by default.
pub const DEFAULT_SEGM_TAG: &str = "boxclust";

pub(crate) fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Options for segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOptions {
    /// Clustering parameters. None uses default ClusteringParams.
    pub params: Option<ClusteringParams>,

    /// Implementation tag for cluster records.
    pub segm: String,

    /// Worker threads for `segment_pages`. None uses available parallelism.
    pub threads: Option<usize>,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            params: None,
            segm: DEFAULT_SEGM_TAG.to_string(),
            threads: None,
        }
    }
}

impl SegmentOptions {
    fn params(&self) -> ClusteringParams {
        self.params.clone().unwrap_or_default()
    }
}

/// Clusters the boxes of one page.
///
/// Validates the parameters and every input record first, runs the engine
/// and verifies the final index state.
pub fn segment_page(input: &PageInput, params: &ClusteringParams) -> Result<Segmentation> {
    params.validate()?;
    let boxes = input.to_page_boxes()?;
    debug!(
        boxes = boxes.len(),
        width = input.page.width,
        height = input.page.height,
        "segmenting page"
    );
    ClusteringManager::new(input.page, boxes, params.clone()).run()
}

/// Parses a page document, clusters it and returns the output document.
pub fn segment_json(json: &str, options: Option<SegmentOptions>) -> Result<SegmentationDocument> {
    let options = options.unwrap_or_default();
    let input = PageInput::from_json(json)?;
    let seg = segment_page(&input, &options.params())?;
    Ok(SegmentationDocument::from_segmentation(&seg, &options.segm))
}

/// Reads a page document from `reader` and writes the segmentation as pretty
/// JSON to `writer`.
pub fn segment_to_fp<R: Read, W: Write>(
    reader: R,
    writer: &mut W,
    options: Option<SegmentOptions>,
) -> Result<SegmentationDocument> {
    let options = options.unwrap_or_default();
    let input = PageInput::from_reader(reader)?;
    let seg = segment_page(&input, &options.params())?;
    let doc = SegmentationDocument::from_segmentation(&seg, &options.segm);
    serde_json::to_writer_pretty(&mut *writer, &doc)?;
    writeln!(writer)?;
    Ok(doc)
}

/// Clusters several pages in parallel. Results keep the input order.
pub fn segment_pages(
    inputs: &[PageInput],
    options: Option<SegmentOptions>,
) -> Result<Vec<SegmentationDocument>> {
    let options = options.unwrap_or_default();
    let params = options.params();
    params.validate()?;
    let thread_count = options.threads.unwrap_or_else(default_thread_count).max(1);
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .map_err(|e| ClusterError::ThreadPool(e.to_string()))?;

    let results: Vec<Result<SegmentationDocument>> = pool.install(|| {
        inputs
            .par_iter()
            .map(|input| {
                segment_page(input, &params)
                    .map(|seg| SegmentationDocument::from_segmentation(&seg, &options.segm))
            })
            .collect()
    });
    results.into_iter().collect()
}
