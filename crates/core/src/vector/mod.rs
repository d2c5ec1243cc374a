//! Vector data structures for the area of interest.
//!
//! The AOI is read from GeoJSON into a [`FeatureCollection`] of `geo-types`
//! geometries in WGS84 longitude/latitude; UTM input is converted. Only the geometry kinds
//! the export pipeline can send to Earth Engine are accepted: Point, Polygon
//! and MultiPolygon.

mod geojson;
mod reproject;

pub use geojson::{read_geojson, read_geojson_str};
pub use reproject::{utm_to_wgs84, SourceCrs};

use geo::BoundingRect;
use geo_types::{Geometry, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<&serde_json::Value> for AttributeValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s.clone()),
            other => Self::String(other.to_string()),
        }
    }
}

/// Axis-aligned bounds `[west, south, east, north]` in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Smallest bounds containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Bounds::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Set an attribute
    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    /// Get an attribute
    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Bounds of the geometry, if it has one.
    pub fn bounds(&self) -> Option<Bounds> {
        self.geometry
            .as_ref()
            .and_then(|g| g.bounding_rect())
            .map(Bounds::from)
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Geometries of all features that have one.
    pub fn geometries(&self) -> impl Iterator<Item = &Geometry<f64>> {
        self.features.iter().filter_map(|f| f.geometry.as_ref())
    }

    /// Bounds of each feature with a geometry, in feature order.
    pub fn feature_bounds(&self) -> Vec<Bounds> {
        self.features.iter().filter_map(Feature::bounds).collect()
    }

    /// Bounds over every feature, or `None` when no feature has a geometry.
    pub fn total_bounds(&self) -> Option<Bounds> {
        self.feature_bounds()
            .into_iter()
            .reduce(|acc, b| acc.union(&b))
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo_types::{point, polygon};

    #[test]
    fn total_bounds_spans_all_features() {
        let mut fc = FeatureCollection::new();
        fc.push(Feature::new(Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ])));
        fc.push(Feature::new(Geometry::Point(point!(x: 3.0, y: -2.0))));

        let b = fc.total_bounds().unwrap();
        assert_relative_eq!(b.west, 0.0);
        assert_relative_eq!(b.south, -2.0);
        assert_relative_eq!(b.east, 3.0);
        assert_relative_eq!(b.north, 1.0);
        assert_eq!(fc.feature_bounds().len(), 2);
    }

    #[test]
    fn empty_collection_has_no_bounds() {
        assert!(FeatureCollection::new().total_bounds().is_none());
    }

    #[test]
    fn attribute_from_json() {
        assert_eq!(
            AttributeValue::from(&serde_json::json!(3)),
            AttributeValue::Int(3)
        );
        assert_eq!(
            AttributeValue::from(&serde_json::json!("a")),
            AttributeValue::String("a".into())
        );
        assert_eq!(
            AttributeValue::from(&serde_json::json!([1, 2])),
            AttributeValue::String("[1,2]".into())
        );
    }
}
