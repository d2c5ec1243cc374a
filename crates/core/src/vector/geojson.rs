//! Minimal GeoJSON reader.

use std::path::Path;

use geo_types::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use serde::Deserialize;

use super::reproject::SourceCrs;
use super::{AttributeValue, Feature, FeatureCollection};
use crate::error::{Error, Result};

#[derive(Deserialize)]
struct FeatureCollectionDoc {
    features: Vec<FeatureDoc>,
}

#[derive(Deserialize)]
struct FeatureDoc {
    #[serde(default)]
    id: Option<serde_json::Value>,
    geometry: Option<GeometryDoc>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct GeometryDoc {
    #[serde(rename = "type")]
    type_: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

/// Read an AOI from a GeoJSON file.
pub fn read_geojson(path: impl AsRef<Path>) -> Result<FeatureCollection> {
    let text = std::fs::read_to_string(path)?;
    read_geojson_str(&text)
}

/// Parse a GeoJSON `FeatureCollection`, `Feature` or bare geometry.
///
/// A legacy `crs` member naming a UTM zone (EPSG 326xx/327xx) is converted
/// to WGS84. Fails with [`Error::EmptyAoi`] when no feature carries a
/// geometry.
pub fn read_geojson_str(text: &str) -> Result<FeatureCollection> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let crs = source_crs(&value)?;

    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| Error::UnsupportedGeometry("GeoJSON object without 'type'".into()))?
        .to_string();

    let mut fc = FeatureCollection::new();
    match kind.as_str() {
        "FeatureCollection" => {
            let doc: FeatureCollectionDoc = serde_json::from_value(value)?;
            for feature in doc.features {
                fc.push(convert_feature(feature)?);
            }
        }
        "Feature" => {
            let doc: FeatureDoc = serde_json::from_value(value)?;
            fc.push(convert_feature(doc)?);
        }
        _ => {
            let doc: GeometryDoc = serde_json::from_value(value)?;
            fc.push(Feature::new(convert_geometry(&doc)?));
        }
    }

    if fc.geometries().next().is_none() {
        return Err(Error::EmptyAoi);
    }
    for geometry in fc.features.iter_mut().filter_map(|f| f.geometry.as_mut()) {
        crs.to_wgs84(geometry);
    }
    Ok(fc)
}

/// CRS named by the legacy `crs` member; WGS84 when absent.
fn source_crs(value: &serde_json::Value) -> Result<SourceCrs> {
    let name = value
        .get("crs")
        .and_then(|c| c.get("properties"))
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str());
    match name {
        None => Ok(SourceCrs::Wgs84),
        Some(n) => SourceCrs::from_name(n).ok_or_else(|| Error::InvalidParameter {
            name: "crs",
            value: n.to_string(),
            reason: "area of interest must be in WGS84 or UTM (EPSG:326xx/327xx)".into(),
        }),
    }
}

fn convert_feature(doc: FeatureDoc) -> Result<Feature> {
    let mut feature = match doc.geometry {
        Some(g) => Feature::new(convert_geometry(&g)?),
        None => Feature {
            geometry: None,
            properties: Default::default(),
            id: None,
        },
    };
    feature.id = doc.id.map(|id| match id {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    });
    for (key, value) in doc.properties.unwrap_or_default() {
        feature.set_property(key, AttributeValue::from(&value));
    }
    Ok(feature)
}

fn convert_geometry(doc: &GeometryDoc) -> Result<Geometry<f64>> {
    match doc.type_.as_str() {
        "Point" => {
            let c: Vec<f64> = serde_json::from_value(doc.coordinates.clone())?;
            Ok(Geometry::Point(Point::from(coord(&c)?)))
        }
        "Polygon" => {
            let rings: Vec<Vec<Vec<f64>>> = serde_json::from_value(doc.coordinates.clone())?;
            Ok(Geometry::Polygon(polygon(&rings)?))
        }
        "MultiPolygon" => {
            let polys: Vec<Vec<Vec<Vec<f64>>>> =
                serde_json::from_value(doc.coordinates.clone())?;
            let polys = polys
                .iter()
                .map(|rings| polygon(rings))
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::MultiPolygon(MultiPolygon::new(polys)))
        }
        other => Err(Error::UnsupportedGeometry(format!(
            "{other} (expected Point, Polygon or MultiPolygon)"
        ))),
    }
}

fn coord(c: &[f64]) -> Result<Coord<f64>> {
    match c {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(Error::UnsupportedGeometry(format!(
            "position with {} ordinates",
            c.len()
        ))),
    }
}

fn ring(points: &[Vec<f64>]) -> Result<LineString<f64>> {
    points
        .iter()
        .map(|p| coord(p))
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon<f64>> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| Error::UnsupportedGeometry("polygon without rings".into()))?;
    let interiors = interiors
        .iter()
        .map(|r| ring(r))
        .collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(ring(exterior)?, interiors))
}
