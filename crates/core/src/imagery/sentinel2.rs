//! Sentinel-2 surface reflectance
//!
//! Images come from the harmonized L2A collection. Clouds are masked with
//! the Cloud Score+ `cs_cdf` band: a pixel is kept when its score is at
//! least the threshold (1.0 = clear, 0.0 = fully occluded).

use super::{resample_band, IndexRegistry};
use crate::error::{Error, Result};
use crate::graph::{Geometry, Image, ImageCollection};
use crate::period::Period;

pub const COLLECTION: &str = "COPERNICUS/S2_SR_HARMONIZED";
pub const CLOUD_SCORE_COLLECTION: &str = "GOOGLE/CLOUD_SCORE_PLUS/V1/S2_HARMONIZED";
pub const CLOUD_SCORE_BAND: &str = "cs_cdf";
pub const DEFAULT_CLOUD_SCORE_THRESHOLD: f64 = 0.65;

/// Reflectance bands, stored as DN × 10000.
const REFLECTANCE_BANDS: &[&str] = &[
    "B1", "B2", "B3", "B4", "B5", "B6", "B7", "B8", "B8A", "B9", "B11", "B12",
];

/// Water vapour and aerosol optical thickness, stored as DN × 1000.
const ATMOSPHERIC_BANDS: &[&str] = &["WVP", "AOT"];

/// Classification, true color and QA bands, returned unscaled.
const RAW_BANDS: &[&str] = &[
    "SCL",
    "TCI_R",
    "TCI_G",
    "TCI_B",
    "MSK_CLDPRB",
    "MSK_SNWPRB",
    "QA10",
    "QA20",
    "QA60",
];

/// Cloud-masked images intersecting `region` during `period`.
pub fn cloudless_images(region: &Geometry, period: &Period, threshold: f64) -> ImageCollection {
    let scores = ImageCollection::load(CLOUD_SCORE_COLLECTION);
    ImageCollection::load(COLLECTION)
        .filter_bounds(region)
        .filter_date(period.start, period.exclusive_end())
        .link_collection(&scores, &[CLOUD_SCORE_BAND])
        .map(|image| image.update_mask(&image.select(&[CLOUD_SCORE_BAND]).gte(threshold)))
}

/// Extract `band` scaled to physical units.
pub fn band(image: &Image, band: &str) -> Result<Image> {
    if REFLECTANCE_BANDS.contains(&band) {
        Ok(image.select(&[band]).multiply(0.0001).to_float())
    } else if ATMOSPHERIC_BANDS.contains(&band) {
        Ok(image.select(&[band]).multiply(0.001).to_float())
    } else if RAW_BANDS.contains(&band) {
        Ok(image.select(&[band]))
    } else {
        Err(Error::UnknownBand {
            name: band.to_string(),
            sensor: "sentinel2",
        })
    }
}

pub fn bands() -> Vec<&'static str> {
    REFLECTANCE_BANDS
        .iter()
        .chain(ATMOSPHERIC_BANDS)
        .chain(RAW_BANDS)
        .copied()
        .collect()
}

/// Normalized difference of `first` and `second` after bringing `coarse`
/// (one of the two) to 10 m.
fn nd_10m(image: &Image, first: &str, second: &str, coarse: &str, name: &str) -> Image {
    let resampled = format!("{coarse}_10m");
    let pick = |b: &str| if b == coarse { resampled.clone() } else { b.to_string() };
    let (a, b) = (pick(first), pick(second));
    image
        .add_bands(&resample_band(image, coarse, 10.0))
        .normalized_difference(&a, &b)
        .rename(&[name])
}

// ---------------------------------------------------------------------------
// Indices
// ---------------------------------------------------------------------------

/// Index registry for Sentinel-2 composites.
///
/// | name       | formula                     | output band |
/// |------------|-----------------------------|-------------|
/// | NDVI       | (B8 - B4) / (B8 + B4)       | NDVI        |
/// | NDWIv      | (B8 - B11) / (B8 + B11)     | NDWIv       |
/// | NDWIw      | (B3 - B8) / (B3 + B8)       | NDWIw       |
/// | Redness    | (B5 - B3) / (B5 + B3)       | RI          |
/// | NBR        | (B8 - B12) / (B8 + B12)     | NBR         |
/// | Brightness | sqrt(B4² + B8²)             | BI          |
///
/// 20 m bands (B5, B11, B12) are resampled to 10 m first.
pub fn indices() -> IndexRegistry {
    IndexRegistry::new()
        // -1..0 water and clouds, 0.2..0.3 grassland, 0.6..0.8 forest
        .with("NDVI", |img: &Image| {
            img.normalized_difference("B8", "B4").rename(&["NDVI"])
        })
        // Gao (1996), vegetation water content
        .with("NDWIv", |img: &Image| nd_10m(img, "B8", "B11", "B11", "NDWIv"))
        // McFeeters (1996), open water above 0.2
        .with("NDWIw", |img: &Image| {
            img.normalized_difference("B3", "B8").rename(&["NDWIw"])
        })
        .with("Redness", |img: &Image| nd_10m(img, "B5", "B3", "B5", "RI"))
        // Normalized Burn Ratio
        .with("NBR", |img: &Image| nd_10m(img, "B8", "B12", "B12", "NBR"))
        .with("Brightness", |img: &Image| {
            let red = img.select(&["B4"]);
            let nir = img.select(&["B8"]);
            red.pow(2.0).plus(&nir.pow(2.0)).sqrt().rename(&["BI"])
        })
}
