//! Coordinate reference system detection and reprojection.
//!
//! Containment tests only make sense when points and polygons share a CRS.
//! Establishment coordinates are always WGS84 longitude/latitude, so every
//! boundary layer is brought into WGS84 before it is indexed. Layers in a
//! CRS we cannot reproject are rejected instead of being joined silently
//! in the wrong units.

use std::f64::consts::FRAC_PI_2;
use std::str::FromStr;

use geo::{BoundingRect, Coord, MapCoords, MultiPolygon};

use crate::SpatialError;

/// Semi-major axis of the WGS84 ellipsoid, used as the sphere radius by Web
/// Mercator.
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// A supported coordinate reference system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Crs {
    /// Geographic longitude/latitude on WGS84 (`EPSG:4326`, `OGC:CRS84`).
    #[default]
    Wgs84,
    /// Spherical Web Mercator in metres (`EPSG:3857`).
    WebMercator,
}

impl FromStr for Crs {
    type Err = SpatialError;

    /// Accepts `EPSG:<code>`, OGC URNs (`urn:ogc:def:crs:EPSG::4326`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84`) and bare codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Ok(Self::Wgs84);
        }

        let code = upper.rsplit(':').next().unwrap_or_default();
        match code {
            "4326" => Ok(Self::Wgs84),
            "3857" | "900913" => Ok(Self::WebMercator),
            _ => Err(SpatialError::UnsupportedCrs {
                crs: s.trim().to_string(),
            }),
        }
    }
}

impl Crs {
    /// Reprojects a polygon into WGS84 longitude/latitude.
    #[must_use]
    pub fn to_wgs84(self, polygon: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        match self {
            Self::Wgs84 => polygon.clone(),
            Self::WebMercator => polygon.map_coords(web_mercator_to_wgs84),
        }
    }
}

/// Reads the legacy `crs` member of a `GeoJSON` object, e.g.
/// `{"type": "name", "properties": {"name": "EPSG:3857"}}`.
#[must_use]
pub fn declared_crs_name(foreign_members: Option<&geojson::JsonObject>) -> Option<&str> {
    foreign_members?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()
}

/// Resolves the CRS of a layer: an explicit override wins, then the
/// declaration in the file, then the `GeoJSON` default of WGS84.
///
/// # Errors
///
/// Returns [`SpatialError::UnsupportedCrs`] if the chosen CRS cannot be
/// reprojected.
pub fn resolve_crs(
    override_name: Option<&str>,
    declared_name: Option<&str>,
) -> Result<Crs, SpatialError> {
    override_name
        .or(declared_name)
        .map_or(Ok(Crs::Wgs84), Crs::from_str)
}

/// Checks that a polygon lies within geographic coordinate bounds. A layer
/// in projected units with no CRS declaration fails here.
///
/// # Errors
///
/// Returns [`SpatialError::CoordinatesOutOfRange`] naming `label`.
pub fn ensure_geographic(polygon: &MultiPolygon<f64>, label: &str) -> Result<(), SpatialError> {
    let Some(rect) = polygon.bounding_rect() else {
        return Ok(());
    };
    let (min, max) = (rect.min(), rect.max());
    if min.x < -180.0 || max.x > 180.0 || min.y < -90.0 || max.y > 90.0 {
        return Err(SpatialError::CoordinatesOutOfRange {
            feature: label.to_string(),
            min_x: min.x,
            min_y: min.y,
            max_x: max.x,
            max_y: max.y,
        });
    }
    Ok(())
}

fn web_mercator_to_wgs84(c: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (c.x / WEB_MERCATOR_RADIUS).to_degrees(),
        y: 2.0f64
            .mul_add((c.y / WEB_MERCATOR_RADIUS).exp().atan(), -FRAC_PI_2)
            .to_degrees(),
    }
}
