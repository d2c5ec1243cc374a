//! UTM → WGS84 conversion for AOIs given in projected coordinates
//! (Snyder 1987, USGS Prof. Paper 1395, pp. 63-64).
//!
//! Covers EPSG 326xx (UTM North) and 327xx (UTM South).

use geo::MapCoordsInPlace;
use geo_types::{Coord, Geometry};

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0;
const F: f64 = 1.0 / 298.257_223_563;
const E2: f64 = 2.0 * F - F * F;
const E_PRIME2: f64 = E2 / (1.0 - E2);
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// CRS of an input AOI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCrs {
    Wgs84,
    Utm { zone: u32, north: bool },
}

impl SourceCrs {
    /// Recognise a CRS name such as `EPSG:32719`, `urn:ogc:def:crs:EPSG::4326`
    /// or `urn:ogc:def:crs:OGC:1.3:CRS84`.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.ends_with("CRS84") {
            return Some(Self::Wgs84);
        }
        let code: u32 = name.rsplit(':').next()?.trim().parse().ok()?;
        Self::from_epsg(code)
    }

    pub fn from_epsg(epsg: u32) -> Option<Self> {
        match epsg {
            4326 => Some(Self::Wgs84),
            32601..=32660 => Some(Self::Utm {
                zone: epsg - 32600,
                north: true,
            }),
            32701..=32760 => Some(Self::Utm {
                zone: epsg - 32700,
                north: false,
            }),
            _ => None,
        }
    }

    /// Convert `geometry` to longitude/latitude in place.
    pub fn to_wgs84(self, geometry: &mut Geometry<f64>) {
        if let Self::Utm { zone, north } = self {
            geometry.map_coords_in_place(|c| {
                let (x, y) = utm_to_wgs84(c.x, c.y, zone, north);
                Coord { x, y }
            });
        }
    }
}

/// UTM (easting, northing) in metres to WGS84 (longitude, latitude) in degrees.
pub fn utm_to_wgs84(easting: f64, northing: f64, zone: u32, north: bool) -> (f64, f64) {
    let x = easting - FALSE_EASTING;
    let y = if north {
        northing
    } else {
        northing - FALSE_NORTHING_SOUTH
    };
    let lon0 = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();

    let e4 = E2 * E2;
    let e6 = e4 * E2;
    let m = y / K0;
    let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

    // Footpoint latitude (Snyder eq. 3-26)
    let sqrt_1_e2 = (1.0 - E2).sqrt();
    let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin1 = phi1.sin();
    let cos1 = phi1.cos();
    let tan1 = phi1.tan();
    let c1 = E_PRIME2 * cos1 * cos1;
    let t1 = tan1 * tan1;
    let w = 1.0 - E2 * sin1 * sin1;
    let n1 = A / w.sqrt();
    let r1 = A * (1.0 - E2) / w.powf(1.5);
    let d = x / (n1 * K0);

    // Snyder eqs. 8-17, 8-18
    let lat = phi1
        - (n1 * tan1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d.powi(4)
                    / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * E_PRIME2
                    - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);
    let lon = lon0
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1)
                * d.powi(5)
                / 120.0)
            / cos1;

    (lon.to_degrees(), lat.to_degrees())
}
