//! Imagery selection and compositing
//!
//! Per-sensor recipes for building cloud-masked collections, extracting
//! scaled bands and computing spectral indices:
//! - [`sentinel2`]: Sentinel-2 surface reflectance masked with Cloud Score+
//! - [`landsat8`]: Landsat 8 Collection 2 surface reflectance masked with QA_PIXEL
//! - [`IndexRegistry`]: named index lookup shared by both sensors

mod indices;
pub mod landsat8;
pub mod sentinel2;

use std::fmt;
use std::str::FromStr;

pub use indices::{IndexRegistry, SpectralIndex};

use crate::error::{Error, Result};
use crate::graph::{Geometry, Image, ImageCollection};
use crate::period::Period;

/// Name of the observation count band.
pub const COUNT_BAND: &str = "COUNT";

/// Bilinear-resample `band` to `scale` meters in its own projection.
///
/// The output band is named `{band}_{scale}m`, e.g. `B11_10m`.
pub fn resample_band(image: &Image, band: &str, scale: f64) -> Image {
    let selected = image.select(&[band]);
    let name = format!("{band}_{scale}m");
    selected
        .resample("bilinear")
        .reproject(selected.projection(), scale)
        .rename(&[name.as_str()])
}

/// Supported optical sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sensor {
    #[default]
    Sentinel2,
    Landsat8,
}

impl Sensor {
    pub fn name(&self) -> &'static str {
        match self {
            Sensor::Sentinel2 => "sentinel2",
            Sensor::Landsat8 => "landsat8",
        }
    }

    /// Cloud-masked images over `region` acquired during `period`.
    ///
    /// `cloud_score_threshold` only applies to Sentinel-2.
    pub fn cloudless_images(
        &self,
        region: &Geometry,
        period: &Period,
        cloud_score_threshold: f64,
    ) -> ImageCollection {
        match self {
            Sensor::Sentinel2 => sentinel2::cloudless_images(region, period, cloud_score_threshold),
            Sensor::Landsat8 => landsat8::cloudless_images(region, period),
        }
    }

    /// Extract one band with its physical scaling applied.
    pub fn band(&self, image: &Image, name: &str) -> Result<Image> {
        match self {
            Sensor::Sentinel2 => sentinel2::band(image, name),
            Sensor::Landsat8 => landsat8::band(image, name),
        }
    }

    /// Band names accepted by [`band`](Self::band).
    pub fn bands(&self) -> Vec<&'static str> {
        match self {
            Sensor::Sentinel2 => sentinel2::bands(),
            Sensor::Landsat8 => landsat8::bands(),
        }
    }

    /// Check that every name is a band of this sensor.
    pub fn validate_bands<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let known = self.bands();
        match names.into_iter().find(|n| !known.contains(n)) {
            Some(name) => Err(Error::UnknownBand {
                name: name.to_string(),
                sensor: self.name(),
            }),
            None => Ok(()),
        }
    }

    pub fn indices(&self) -> IndexRegistry {
        match self {
            Sensor::Sentinel2 => sentinel2::indices(),
            Sensor::Landsat8 => landsat8::indices(),
        }
    }

    /// Band used to count valid observations.
    pub fn count_source_band(&self) -> &'static str {
        match self {
            Sensor::Sentinel2 => "B2",
            Sensor::Landsat8 => "SR_B2",
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Sensor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sentinel2" | "sentinel-2" | "s2" => Ok(Sensor::Sentinel2),
            "landsat8" | "landsat-8" | "l8" => Ok(Sensor::Landsat8),
            _ => Err(Error::InvalidParameter {
                name: "sensor",
                value: s.to_string(),
                reason: "expected sentinel2 or landsat8".to_string(),
            }),
        }
    }
}

/// Per-pixel reducer used to build a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    Median,
    Mean,
}

impl Aggregation {
    pub fn apply(&self, images: &ImageCollection) -> Image {
        match self {
            Aggregation::Median => images.median(),
            Aggregation::Mean => images.mean(),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Aggregation::Median => "median",
            Aggregation::Mean => "mean",
        })
    }
}

impl FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "median" => Ok(Aggregation::Median),
            "mean" => Ok(Aggregation::Mean),
            _ => Err(Error::InvalidParameter {
                name: "aggr-fn",
                value: s.to_string(),
                reason: "expected median or mean".to_string(),
            }),
        }
    }
}

/// Number of unmasked observations per pixel of `band`, as band `COUNT`.
///
/// Pixels with no observation are 0 instead of masked.
pub fn count_band(images: &ImageCollection, band: &str) -> Image {
    images
        .select(&[band])
        .count()
        .unmask(0.0)
        .rename(&[COUNT_BAND])
}
