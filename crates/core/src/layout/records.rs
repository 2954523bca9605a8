//! JSON records for input pages and output segmentations.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};
use crate::utils::{HasBBox, Rect, approx_eq};

use super::analysis::{ClusteringStats, Segmentation};
use super::elements::{BoxId, Cluster, Color, PageBox};

/// Tolerance when checking explicit width/height against the edges.
const SIZE_TOLERANCE: f64 = 1e-6;

/// Page dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn validate(&self) -> Result<()> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(ClusterError::InvalidPage {
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// One input box, or a residual box in the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxRecord {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl BoxRecord {
    pub fn new(bbox: Rect, color: Color) -> Self {
        let (left, top, right, bottom) = bbox;
        Self {
            left,
            top,
            right,
            bottom,
            width: None,
            height: None,
            color,
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn bbox(&self) -> Rect {
        (self.left, self.top, self.right, self.bottom)
    }

    /// The record id, or the key derived from geometry and color.
    pub fn key(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| PageBox::derive_key(self.bbox(), self.color))
    }

    /// Checks the geometry and returns the rectangle.
    pub fn validate(&self) -> Result<Rect> {
        let invalid = |reason: String| ClusterError::InvalidBox {
            id: self.key(),
            reason,
        };
        let bbox = self.bbox();
        let (x0, y0, x1, y1) = bbox;
        if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
            return Err(invalid("non-finite coordinate".into()));
        }
        if x1 < x0 || y1 < y0 {
            return Err(invalid(format!("inverted rectangle {x0},{y0},{x1},{y1}")));
        }
        if let Some(w) = self.width
            && !approx_eq(w, x1 - x0, SIZE_TOLERANCE)
        {
            return Err(invalid(format!("width {w} does not match edges")));
        }
        if let Some(h) = self.height
            && !approx_eq(h, y1 - y0, SIZE_TOLERANCE)
        {
            return Err(invalid(format!("height {h} does not match edges")));
        }
        Ok(bbox)
    }

    pub fn to_page_box(&self, id: BoxId) -> Result<PageBox> {
        let bbox = self.validate()?;
        Ok(PageBox::new(id, self.key(), bbox, self.color))
    }

    /// Output record of a box, with derived size and its key as id.
    pub fn from_page_box(b: &PageBox) -> Self {
        Self {
            width: Some(b.width()),
            height: Some(b.height()),
            id: Some(b.key().to_string()),
            ..Self::new(b.bbox(), b.color())
        }
    }
}

/// One committed cluster in the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
    /// Tag of the implementation that produced the cluster.
    pub segm: String,
    /// Keys of the member boxes.
    #[serde(default)]
    pub members: Vec<String>,
}

impl ClusterRecord {
    pub fn from_cluster(cluster: &Cluster, boxes: &[PageBox], segm: &str) -> Self {
        let (left, top, right, bottom) = cluster.bbox();
        Self {
            left,
            top,
            right,
            bottom,
            width: cluster.width(),
            height: cluster.height(),
            segm: segm.to_string(),
            members: cluster
                .members()
                .map(|id| boxes[id.index()].key().to_string())
                .collect(),
        }
    }

    pub fn bbox(&self) -> Rect {
        (self.left, self.top, self.right, self.bottom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SegmentRecord {
    Cluster(ClusterRecord),
    Box(BoxRecord),
}

impl SegmentRecord {
    pub fn bbox(&self) -> Rect {
        match self {
            SegmentRecord::Cluster(c) => c.bbox(),
            SegmentRecord::Box(b) => b.bbox(),
        }
    }
}

/// Input document: a page and its boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInput {
    pub page: PageSize,
    pub boxes: Vec<BoxRecord>,
}

impl PageInput {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Validates the page and every box and builds the box arena.
    ///
    /// Explicit ids must be unique.
    pub fn to_page_boxes(&self) -> Result<Vec<PageBox>> {
        self.page.validate()?;
        if let Some(dup) = self.boxes.iter().filter_map(|b| b.id.as_deref()).duplicates().next() {
            return Err(ClusterError::InvalidBox {
                id: dup.to_string(),
                reason: "duplicate id".into(),
            });
        }
        self.boxes
            .iter()
            .enumerate()
            .map(|(i, record)| record.to_page_box(BoxId::new(i)))
            .collect()
    }
}

/// Output document: clusters first in commit order, then residual boxes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationDocument {
    pub page: PageSize,
    pub segments: Vec<SegmentRecord>,
    #[serde(default)]
    pub stats: ClusteringStats,
}

impl SegmentationDocument {
    pub fn from_segmentation(seg: &Segmentation, segm: &str) -> Self {
        let clusters = seg
            .clusters
            .iter()
            .map(|c| SegmentRecord::Cluster(ClusterRecord::from_cluster(c, &seg.boxes, segm)));
        let residual = seg
            .residual_boxes()
            .map(|b| SegmentRecord::Box(BoxRecord::from_page_box(b)));
        Self {
            page: seg.page,
            segments: clusters.chain(residual).collect(),
            stats: seg.stats.clone(),
        }
    }

    pub fn clusters(&self) -> impl Iterator<Item = &ClusterRecord> {
        self.segments.iter().filter_map(|s| match s {
            SegmentRecord::Cluster(c) => Some(c),
            SegmentRecord::Box(_) => None,
        })
    }

    pub fn boxes(&self) -> impl Iterator<Item = &BoxRecord> {
        self.segments.iter().filter_map(|s| match s {
            SegmentRecord::Box(b) => Some(b),
            SegmentRecord::Cluster(_) => None,
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
