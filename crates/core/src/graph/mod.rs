//! Earth Engine computation graphs.
//!
//! Images, collections and geometries are built locally as a tree of
//! [`Value`] nodes and shipped to the platform as an [`Expression`]. The
//! platform evaluates the graph; this crate never touches pixels.

mod geometry;
mod image;
mod value;

pub use geometry::Geometry;
pub use image::{Image, ImageCollection};
pub use value::{Expression, Value};
