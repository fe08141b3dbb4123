//! Data models for the annotation core.

mod label;
mod store;
mod taxonomy;

pub use label::{Arity, Label, POINT_HIT_RADIUS, Point};
pub use store::{LabelStore, PointRef};
pub use taxonomy::Taxonomy;
