//! Entity types for box clustering.
//!
//! Contains:
//! - Component: base type for objects with bounding boxes
//! - Color: RGB color of a box
//! - PageBox: leaf visual primitive
//! - Cluster: flat group of boxes with an envelope
//! - Relation: scored edge between two entities
//! - EntityRef: Box/Cluster sum type used by the index and relations

/// Implements HasBBox trait by delegating to a field.
///
/// # Field access mode
/// Use when the field has direct `.x0`, `.y0`, `.x1`, `.y1` fields:
/// ```ignore
/// impl_has_bbox_delegate!(PageBox, component);
/// // expands to: self.component.x0
/// ```
macro_rules! impl_has_bbox_delegate {
    ($type:ty, $field:ident) => {
        impl crate::utils::HasBBox for $type {
            fn x0(&self) -> f64 {
                self.$field.x0
            }
            fn y0(&self) -> f64 {
                self.$field.y0
            }
            fn x1(&self) -> f64 {
                self.$field.x1
            }
            fn y1(&self) -> f64 {
                self.$field.y1
            }
        }
    };
}

pub(crate) use impl_has_bbox_delegate;

mod cluster;
mod color;
mod component;
mod entity;
mod pagebox;
mod relation;

pub use cluster::Cluster;
pub use color::Color;
pub use component::Component;
pub use entity::{BoxId, ClusterId, EntityRef};
pub use pagebox::PageBox;
pub use relation::{Relation, RelationKey};
