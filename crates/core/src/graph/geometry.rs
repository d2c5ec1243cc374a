//! Geometry nodes built from `geo-types` values.

use geo_types::{Geometry as GeoGeometry, LineString, Polygon};
use serde_json::json;

use super::value::Value;
use crate::error::{Error, Result};
use crate::vector::{Bounds, FeatureCollection};

/// A server-side geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry(Value);

impl Geometry {
    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn point(x: f64, y: f64) -> Self {
        Self(Value::invoke(
            "GeometryConstructors.Point",
            [("coordinates", Value::constant(json!([x, y])))],
        ))
    }

    pub fn polygon(polygon: &Polygon<f64>) -> Self {
        Self(Value::invoke(
            "GeometryConstructors.Polygon",
            [("coordinates", Value::constant(polygon_coordinates(polygon)))],
        ))
    }

    pub fn multi_polygon(polygons: &[Polygon<f64>]) -> Self {
        let coords: Vec<serde_json::Value> = polygons.iter().map(polygon_coordinates).collect();
        Self(Value::invoke(
            "GeometryConstructors.MultiPolygon",
            [("coordinates", Value::constant(coords))],
        ))
    }

    /// Planar rectangle covering `bounds`.
    pub fn rectangle(bounds: &Bounds) -> Self {
        Self(Value::invoke(
            "GeometryConstructors.Rectangle",
            [
                (
                    "coordinates",
                    Value::constant(json!([
                        [bounds.west, bounds.south],
                        [bounds.east, bounds.north]
                    ])),
                ),
                ("geodesic", Value::from(false)),
            ],
        ))
    }

    /// Heterogeneous collection of geometries.
    pub fn multi_geometry(parts: Vec<Geometry>) -> Self {
        Self(Value::invoke(
            "GeometryConstructors.MultiGeometry",
            [(
                "geometries",
                Value::Array(parts.into_iter().map(Geometry::into_value).collect()),
            )],
        ))
    }

    /// Convert a `geo-types` geometry (Point, Polygon, MultiPolygon).
    pub fn from_geo(geometry: &GeoGeometry<f64>) -> Result<Self> {
        match geometry {
            GeoGeometry::Point(p) => Ok(Self::point(p.x(), p.y())),
            GeoGeometry::Polygon(p) => Ok(Self::polygon(p)),
            GeoGeometry::MultiPolygon(mp) => Ok(Self::multi_polygon(&mp.0)),
            other => Err(Error::UnsupportedGeometry(format!(
                "{} cannot be sent to Earth Engine",
                geometry_name(other)
            ))),
        }
    }

    /// Union of every geometry of the area of interest.
    pub fn from_aoi(aoi: &FeatureCollection) -> Result<Self> {
        let mut parts = aoi
            .geometries()
            .map(Self::from_geo)
            .collect::<Result<Vec<_>>>()?;
        match parts.len() {
            0 => Err(Error::EmptyAoi),
            1 => Ok(parts.remove(0)),
            _ => Ok(Self::multi_geometry(parts)),
        }
    }
}

fn ring_coordinates(ring: &LineString<f64>) -> serde_json::Value {
    ring.coords().map(|c| json!([c.x, c.y])).collect()
}

fn polygon_coordinates(polygon: &Polygon<f64>) -> serde_json::Value {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_coordinates)
        .collect()
}

fn geometry_name(g: &GeoGeometry<f64>) -> &'static str {
    match g {
        GeoGeometry::Line(_) => "Line",
        GeoGeometry::LineString(_) => "LineString",
        GeoGeometry::MultiPoint(_) => "MultiPoint",
        GeoGeometry::MultiLineString(_) => "MultiLineString",
        GeoGeometry::GeometryCollection(_) => "GeometryCollection",
        GeoGeometry::Rect(_) => "Rect",
        GeoGeometry::Triangle(_) => "Triangle",
        _ => "geometry",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::Feature;
    use geo_types::{line_string, polygon};

    #[test]
    fn polygon_keeps_holes() {
        let p = polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 4.0)],
            interiors: [[(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0)]],
        );
        let g = Geometry::polygon(&p);
        match g.value().argument("coordinates") {
            Some(Value::Constant(c)) => {
                assert_eq!(c.as_array().unwrap().len(), 2);
                assert_eq!(c[0][0], json!([0.0, 0.0]));
            }
            other => panic!("unexpected coordinates: {other:?}"),
        }
    }

    #[test]
    fn aoi_with_several_features_becomes_multi_geometry() {
        let mut fc = FeatureCollection::new();
        fc.push(Feature::new(GeoGeometry::Point(geo_types::point!(x: 1.0, y: 2.0))));
        fc.push(Feature::new(GeoGeometry::Point(geo_types::point!(x: 3.0, y: 4.0))));
        let g = Geometry::from_aoi(&fc).unwrap();
        assert_eq!(
            g.value().function_name(),
            Some("GeometryConstructors.MultiGeometry")
        );
    }

    #[test]
    fn rejects_line_strings() {
        let ls = GeoGeometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]);
        assert!(matches!(
            Geometry::from_geo(&ls),
            Err(Error::UnsupportedGeometry(_))
        ));
    }
}
