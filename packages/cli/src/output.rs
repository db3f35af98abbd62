//! Dashboard artifact serialisation.
//!
//! Non-finite numbers have no JSON representation and are written as
//! `null`.

use geo::{MultiPolygon, Point};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use serde::Serialize;
use tourism_map_analytics_models::{Kpi, MunicipalityKpiRow};
use tourism_map_config::DensityScale;
use tourism_map_density::DensityGrid;

/// Converts KPI rows into a `GeoJSON` feature collection, one feature per
/// municipality. Rows without a boundary get a null geometry.
#[must_use]
pub fn municipality_collection(rows: &[MunicipalityKpiRow]) -> FeatureCollection {
    let features = rows
        .iter()
        .map(|row| {
            let mut properties = JsonObject::new();
            properties.insert("NAME_D".to_string(), JsonValue::from(row.name_de.as_str()));
            properties.insert("NAME_I".to_string(), JsonValue::from(row.name_it.as_str()));
            properties.insert(
                "population".to_string(),
                row.population.map_or(JsonValue::Null, JsonValue::from),
            );
            for kpi in Kpi::all() {
                properties.insert(kpi.to_string(), number(kpi.value(row)));
            }

            Feature {
                bbox: None,
                geometry: row.boundary.as_ref().map(geometry),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Everything the density map needs, in one JSON document.
#[derive(Debug, Serialize)]
pub struct DensityBundle<'a> {
    /// Establishment coordinates as `[longitude, latitude]`.
    pub establishments: Vec<[f64; 2]>,
    /// Region outline.
    pub region: Geometry,
    pub scale: DensityScale,
    pub resolution: usize,
    pub lat_grid: Vec<&'a [f64]>,
    pub lon_grid: Vec<&'a [f64]>,
    pub z_grid: Vec<Vec<Option<f64>>>,
}

impl<'a> DensityBundle<'a> {
    #[must_use]
    pub fn new(
        establishments: &[Point<f64>],
        region: &MultiPolygon<f64>,
        grid: &'a DensityGrid,
    ) -> Self {
        Self {
            establishments: establishments.iter().map(|p| [p.x(), p.y()]).collect(),
            region: geometry(region),
            scale: grid.scale(),
            resolution: grid.resolution(),
            lat_grid: grid.latitude_rows().collect(),
            lon_grid: grid.longitude_rows().collect(),
            z_grid: grid
                .value_rows()
                .map(|row| row.iter().map(|v| v.is_finite().then_some(*v)).collect())
                .collect(),
        }
    }
}

fn geometry(polygon: &MultiPolygon<f64>) -> Geometry {
    Geometry::new(geojson::Value::from(polygon))
}

fn number(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number)
}
