//! Landsat 8 Collection 2 Level-2 surface reflectance
//!
//! Cloud and cloud shadow pixels are masked with the `QA_PIXEL` bit flags.
//! Masked images keep only the `SR_B*` bands, already converted to
//! reflectance.

use super::IndexRegistry;
use crate::error::{Error, Result};
use crate::graph::{Geometry, Image, ImageCollection};
use crate::period::Period;

pub const COLLECTION: &str = "LANDSAT/LC08/C02/T1_L2";
pub const QA_BAND: &str = "QA_PIXEL";

const CLOUD_BIT: i64 = 1 << 3;
const CLOUD_SHADOW_BIT: i64 = 1 << 4;

// Collection 2 surface reflectance scaling
const SR_SCALE: f64 = 0.0000275;
const SR_OFFSET: f64 = -0.2;

const SR_BANDS: &[&str] = &["SR_B1", "SR_B2", "SR_B3", "SR_B4", "SR_B5", "SR_B6", "SR_B7"];

/// Cloud-masked reflectance images intersecting `region` during `period`.
pub fn cloudless_images(region: &Geometry, period: &Period) -> ImageCollection {
    ImageCollection::load(COLLECTION)
        .filter_bounds(region)
        .filter_date(period.start, period.exclusive_end())
        .map(|image| {
            let qa = image.select(&[QA_BAND]);
            let clear = qa
                .bitwise_and(CLOUD_BIT)
                .equals(0.0)
                .and(&qa.bitwise_and(CLOUD_SHADOW_BIT).equals(0.0));
            image
                .select(SR_BANDS)
                .multiply(SR_SCALE)
                .plus(&Image::constant(SR_OFFSET))
                .update_mask(&clear)
                .copy_properties(&image, &["system:time_start"])
        })
}

/// Extract `band` as float reflectance.
pub fn band(image: &Image, band: &str) -> Result<Image> {
    if SR_BANDS.contains(&band) {
        Ok(image.select(&[band]).to_float())
    } else {
        Err(Error::UnknownBand {
            name: band.to_string(),
            sensor: "landsat8",
        })
    }
}

pub fn bands() -> Vec<&'static str> {
    SR_BANDS.to_vec()
}

/// Index registry for Landsat 8 composites: NDVI, NBR and NDWIw.
pub fn indices() -> IndexRegistry {
    IndexRegistry::new()
        .with("NDVI", |img: &Image| {
            img.normalized_difference("SR_B5", "SR_B4").rename(&["NDVI"])
        })
        .with("NBR", |img: &Image| {
            img.normalized_difference("SR_B5", "SR_B7").rename(&["NBR"])
        })
        .with("NDWIw", |img: &Image| {
            img.normalized_difference("SR_B3", "SR_B5").rename(&["NDWIw"])
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Expression, Value};
    use chrono::NaiveDate;

    #[test]
    fn mask_reads_qa_of_each_image() {
        let period = Period::new(
            NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 7, 1).unwrap(),
        );
        let col = cloudless_images(&Geometry::point(0.0, 0.0), &period);
        let expr = Expression::new(col.value());

        let body = &expr.values["1"]["functionInvocationValue"];
        assert_eq!(body["functionName"], "Element.copyProperties");
        let json = serde_json::to_string(&expr.values["1"]).unwrap();
        assert!(json.contains("QA_PIXEL"));
        assert!(json.contains("_MAPPING_VAR_0_0"));
        assert!(json.contains("Image.bitwiseAnd"));
    }

    #[test]
    fn only_reflectance_bands_are_known() {
        assert!(band(&Image::load("X"), "SR_B4").is_ok());
        assert!(matches!(
            band(&Image::load("X"), "QA_PIXEL"),
            Err(Error::UnknownBand { sensor: "landsat8", .. })
        ));
    }

    #[test]
    fn ndvi_uses_landsat_band_names() {
        let out = indices().apply("NDVI", &Image::load("X")).unwrap();
        let nd = out.value().argument("input").unwrap();
        assert_eq!(
            nd.argument("bandNames"),
            Some(&Value::strings(&["SR_B5", "SR_B4"]))
        );
        assert!(!indices().contains("Redness"));
    }
}
