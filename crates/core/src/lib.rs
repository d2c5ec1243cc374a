//! # geefetch core
//!
//! Local building blocks for fetching Earth Engine composites.
//!
//! This crate provides:
//! - `PeriodGenerator`: recurring date periods over a range
//! - `FeatureCollection`: area of interest read from GeoJSON
//! - `graph`: computation graphs for images, collections and geometries
//! - `imagery`: per-sensor cloud masking, band scaling and spectral indices
//!
//! Nothing here performs network I/O; see `geefetch-cloud` for that.

pub mod error;
pub mod graph;
pub mod imagery;
pub mod period;
pub mod vector;

pub use error::{Error, Result};
pub use period::{iter_periods, DateRange, EndMode, Period, PeriodGenerator, PeriodSpec};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::graph::{Expression, Geometry, Image, ImageCollection, Value};
    pub use crate::imagery::{Aggregation, IndexRegistry, Sensor};
    pub use crate::period::{DateRange, EndMode, Period, PeriodGenerator, PeriodSpec};
    pub use crate::vector::{Bounds, Feature, FeatureCollection};
}
