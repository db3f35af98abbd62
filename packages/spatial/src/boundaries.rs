//! Municipality and region boundary loading from `GeoJSON`.

use std::collections::BTreeSet;
use std::path::Path;

use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject, JsonValue};
use tourism_map_config::{BoundaryConfig, RegionConfig};

use crate::SpatialError;
use crate::crs::{Crs, declared_crs_name, ensure_geographic, resolve_crs};

/// One municipality boundary with its resident population.
#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityPolygon {
    /// German name (`NAME_D`), the municipality key.
    pub name_de: String,
    /// Italian name (`NAME_I`).
    pub name_it: String,
    /// Resident population, if the layer provides one.
    pub population: Option<u64>,
    /// Boundary polygon(s).
    pub boundary: MultiPolygon<f64>,
}

/// A set of municipality polygons sharing one CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityLayer {
    /// CRS of every polygon in the layer.
    pub crs: Crs,
    /// Municipalities, unique by German name.
    pub municipalities: Vec<MunicipalityPolygon>,
}

/// Reads and parses a municipality boundary file.
///
/// # Errors
///
/// Returns [`SpatialError`] if the file cannot be read, is not a `GeoJSON`
/// `FeatureCollection`, declares an unsupported CRS, or has polygons
/// outside geographic bounds after reprojection.
pub fn load_municipalities(
    path: &Path,
    config: &BoundaryConfig,
) -> Result<MunicipalityLayer, SpatialError> {
    log::info!("Loading municipality boundaries from {}", path.display());
    let contents = read_file(path)?;
    parse_municipalities(&contents, config)
}

/// Parses a municipality `FeatureCollection` into a WGS84 layer.
///
/// Features without a polygon geometry, a German name or an Italian name
/// are skipped with a warning. Duplicate German names keep the first feature.
///
/// # Errors
///
/// See [`load_municipalities`].
pub fn parse_municipalities(
    contents: &str,
    config: &BoundaryConfig,
) -> Result<MunicipalityLayer, SpatialError> {
    let collection = parse_feature_collection(contents)?;
    let crs = resolve_crs(
        config.crs.as_deref(),
        declared_crs_name(collection.foreign_members.as_ref()),
    )?;
    if crs != Crs::Wgs84 {
        log::info!("Reprojecting municipality boundaries from {crs:?} to WGS84");
    }

    let mut seen = BTreeSet::new();
    let mut municipalities = Vec::with_capacity(collection.features.len());
    let mut skipped = 0usize;
    let mut duplicates = 0usize;

    for (i, feature) in collection.features.iter().enumerate() {
        let Some(name_de) = string_property(feature, &config.name_de_property) else {
            log::warn!(
                "Skipping municipality feature {i}: missing '{}'",
                config.name_de_property
            );
            skipped += 1;
            continue;
        };
        let Some(name_it) = string_property(feature, &config.name_it_property) else {
            log::warn!(
                "Skipping municipality '{name_de}': missing '{}'",
                config.name_it_property
            );
            skipped += 1;
            continue;
        };
        let Some(boundary) = feature_multipolygon(feature) else {
            log::warn!("Skipping municipality '{name_de}': no polygon geometry");
            skipped += 1;
            continue;
        };
        if !seen.insert(name_de.clone()) {
            log::debug!("Dropping duplicate municipality '{name_de}'");
            duplicates += 1;
            continue;
        }

        let boundary = crs.to_wgs84(&boundary);
        ensure_geographic(&boundary, &name_de)?;

        let population = population_property(feature, &config.population_property);
        if population.is_none() {
            log::debug!(
                "Municipality '{name_de}' has no usable '{}'",
                config.population_property
            );
        }

        municipalities.push(MunicipalityPolygon {
            name_de,
            name_it,
            population,
            boundary,
        });
    }

    if duplicates > 0 {
        log::info!("Dropped {duplicates} duplicate municipality features");
    }
    if skipped > 0 {
        log::warn!("Skipped {skipped} unusable municipality features");
    }
    log::info!("Loaded {} municipalities", municipalities.len());

    Ok(MunicipalityLayer {
        crs: Crs::Wgs84,
        municipalities,
    })
}

/// Reads a region boundary file and selects the region polygon.
///
/// # Errors
///
/// Returns [`SpatialError`] if the file cannot be read or parsed, or
/// [`SpatialError::RegionNotFound`] if no feature matches the selector.
pub fn load_region(path: &Path, config: &RegionConfig) -> Result<MultiPolygon<f64>, SpatialError> {
    log::info!("Loading region boundary from {}", path.display());
    let contents = read_file(path)?;
    parse_region(&contents, config)
}

/// Selects the first feature whose `config.property` equals
/// `config.value`, or the first polygon feature when no property is set.
/// The result is reprojected to WGS84.
///
/// # Errors
///
/// See [`load_region`].
pub fn parse_region(contents: &str, config: &RegionConfig) -> Result<MultiPolygon<f64>, SpatialError> {
    let collection = parse_feature_collection(contents)?;
    let crs = resolve_crs(
        config.crs.as_deref(),
        declared_crs_name(collection.foreign_members.as_ref()),
    )?;

    let selector = config
        .property
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| (p, config.value.as_deref().unwrap_or_default()));

    let region = collection
        .features
        .iter()
        .filter(|f| {
            selector.is_none_or(|(property, value)| {
                string_property(f, property).is_some_and(|v| v == value)
            })
        })
        .find_map(feature_multipolygon)
        .ok_or_else(|| {
            let (property, value) = selector.unwrap_or(("<none>", ""));
            SpatialError::RegionNotFound {
                property: property.to_string(),
                value: value.to_string(),
            }
        })?;

    let region = crs.to_wgs84(&region);
    ensure_geographic(&region, "region")?;
    Ok(region)
}

fn read_file(path: &Path) -> Result<String, SpatialError> {
    std::fs::read_to_string(path).map_err(|e| SpatialError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn parse_feature_collection(contents: &str) -> Result<FeatureCollection, SpatialError> {
    match contents.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        GeoJson::Feature(_) | GeoJson::Geometry(_) => Err(SpatialError::Conversion {
            message: "expected a GeoJSON FeatureCollection".to_string(),
        }),
    }
}

/// Converts a feature's geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn feature_multipolygon(feature: &Feature) -> Option<MultiPolygon<f64>> {
    let geom = feature.geometry.clone()?;
    let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

fn property<'a>(feature: &'a Feature, name: &str) -> Option<&'a JsonValue> {
    feature
        .properties
        .as_ref()
        .and_then(|props: &JsonObject| props.get(name))
}

/// Reads a property as text. Numbers are accepted and formatted.
fn string_property(feature: &Feature, name: &str) -> Option<String> {
    match property(feature, name)? {
        JsonValue::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a population count. Accepts integers, integral floats and
/// numeric strings.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn population_property(feature: &Feature, name: &str) -> Option<u64> {
    let value = match property(feature, name)? {
        JsonValue::Number(n) => {
            if let Some(v) = n.as_u64() {
                return Some(v);
            }
            n.as_f64()?
        }
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    use geo::{Area, Contains, Point};

    use crate::{SpatialIndex, join_municipalities};

    fn square_ring(min: (f64, f64), max: (f64, f64)) -> String {
        format!(
            "[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]",
            x0 = min.0,
            y0 = min.1,
            x1 = max.0,
            y1 = max.1,
        )
    }

    fn municipality_feature(name: &str, population: &str, ring: &str) -> String {
        format!(
            r#"{{"type":"Feature","properties":{{"NAME_D":"{name}","NAME_I":"{name}_it","BW_WOHNBEV":{population}}},"geometry":{{"type":"Polygon","coordinates":{ring}}}}}"#
        )
    }

    fn collection(features: &[String], crs: Option<&str>) -> String {
        let crs = crs.map_or_else(String::new, |name| {
            format!(r#""crs":{{"type":"name","properties":{{"name":"{name}"}}}},"#)
        });
        format!(
            r#"{{"type":"FeatureCollection",{crs}"features":[{}]}}"#,
            features.join(",")
        )
    }

    /// Web Mercator x/y for a WGS84 lon/lat.
    fn to_mercator(lon: f64, lat: f64) -> (f64, f64) {
        let r = 6_378_137.0_f64;
        let x = r * lon.to_radians();
        let y = r * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }

    #[test]
    fn parses_names_population_and_geometry() {
        let json = collection(
            &[
                municipality_feature("Bozen", "107000", &square_ring((11.0, 46.0), (11.5, 46.5))),
                municipality_feature("Meran", "\"41000.0\"", &square_ring((11.5, 46.0), (12.0, 46.5))),
            ],
            None,
        );
        let layer = parse_municipalities(&json, &BoundaryConfig::default()).unwrap();

        assert_eq!(layer.crs, Crs::Wgs84);
        assert_eq!(layer.municipalities.len(), 2);
        assert_eq!(layer.municipalities[0].name_it, "Bozen_it");
        assert_eq!(layer.municipalities[0].population, Some(107_000));
        assert_eq!(layer.municipalities[1].population, Some(41_000));
        assert!(layer.municipalities[0].boundary.contains(&Point::new(11.2, 46.2)));
    }

    #[test]
    fn duplicate_names_keep_first_feature() {
        let json = collection(
            &[
                municipality_feature("Bozen", "100", &square_ring((11.0, 46.0), (11.5, 46.5))),
                municipality_feature("Bozen", "200", &square_ring((12.0, 46.0), (12.5, 46.5))),
            ],
            None,
        );
        let layer = parse_municipalities(&json, &BoundaryConfig::default()).unwrap();
        assert_eq!(layer.municipalities.len(), 1);
        assert_eq!(layer.municipalities[0].population, Some(100));
    }

    #[test]
    fn skips_features_without_name_or_polygon() {
        let json = collection(
            &[
                r#"{"type":"Feature","properties":{"NAME_I":"x"},"geometry":null}"#.to_string(),
                r#"{"type":"Feature","properties":{"NAME_D":"Punkt"},"geometry":{"type":"Point","coordinates":[11.0,46.0]}}"#.to_string(),
                municipality_feature("Bozen", "null", &square_ring((11.0, 46.0), (11.5, 46.5))),
            ],
            None,
        );
        let layer = parse_municipalities(&json, &BoundaryConfig::default()).unwrap();
        assert_eq!(layer.municipalities.len(), 1);
        assert_eq!(layer.municipalities[0].population, None);
    }

    #[test]
    fn skips_features_without_italian_name() {
        let json = collection(
            &[
                format!(
                    r#"{{"type":"Feature","properties":{{"NAME_D":"Jenesien","NAME_I":"  ","BW_WOHNBEV":3000}},"geometry":{{"type":"Polygon","coordinates":{}}}}}"#,
                    square_ring((11.0, 46.0), (11.5, 46.5))
                ),
                format!(
                    r#"{{"type":"Feature","properties":{{"NAME_D":"Ritten","BW_WOHNBEV":8000}},"geometry":{{"type":"Polygon","coordinates":{}}}}}"#,
                    square_ring((11.5, 46.0), (12.0, 46.5))
                ),
                municipality_feature("Bozen", "107000", &square_ring((12.0, 46.0), (12.5, 46.5))),
            ],
            None,
        );
        let layer = parse_municipalities(&json, &BoundaryConfig::default()).unwrap();
        let names: Vec<&str> = layer.municipalities.iter().map(|m| m.name_de.as_str()).collect();
        assert_eq!(names, ["Bozen"]);
        assert!(layer.municipalities.iter().all(|m| !m.name_it.is_empty()));
    }

    #[test]
    fn undeclared_projected_layer_is_rejected() {
        let json = collection(
            &[municipality_feature(
                "Bozen",
                "100",
                &square_ring((600_000.0, 5_100_000.0), (700_000.0, 5_200_000.0)),
            )],
            None,
        );
        assert!(matches!(
            parse_municipalities(&json, &BoundaryConfig::default()),
            Err(SpatialError::CoordinatesOutOfRange { feature, .. }) if feature == "Bozen"
        ));
    }

    #[test]
    fn unsupported_declared_crs_is_rejected() {
        let json = collection(
            &[municipality_feature("Bozen", "100", &square_ring((11.0, 46.0), (11.5, 46.5)))],
            Some("EPSG:25832"),
        );
        assert!(matches!(
            parse_municipalities(&json, &BoundaryConfig::default()),
            Err(SpatialError::UnsupportedCrs { .. })
        ));
    }

    #[test]
    fn web_mercator_layer_joins_like_wgs84() {
        let wgs84 = collection(
            &[
                municipality_feature("Bozen", "100", &square_ring((11.0, 46.0), (11.5, 46.5))),
                municipality_feature("Meran", "100", &square_ring((11.5, 46.0), (12.0, 46.5))),
            ],
            None,
        );
        let (ax, ay) = to_mercator(11.0, 46.0);
        let (bx, by) = to_mercator(11.5, 46.5);
        let (cx, cy) = to_mercator(12.0, 46.5);
        let mercator = collection(
            &[
                municipality_feature("Bozen", "100", &square_ring((ax, ay), (bx, by))),
                municipality_feature("Meran", "100", &square_ring((bx, ay), (cx, cy))),
            ],
            Some("urn:ogc:def:crs:EPSG::3857"),
        );

        let config = BoundaryConfig::default();
        let a = SpatialIndex::new(parse_municipalities(&wgs84, &config).unwrap()).unwrap();
        let b = SpatialIndex::new(parse_municipalities(&mercator, &config).unwrap()).unwrap();

        let points = [(11.2, 46.2), (11.7, 46.3), (10.0, 46.0), (11.49, 46.49)];
        for (lng, lat) in points {
            assert_eq!(
                a.lookup(lng, lat).map(|m| m.name_de.as_str()),
                b.lookup(lng, lat).map(|m| m.name_de.as_str()),
                "lookup differs at ({lng}, {lat})"
            );
        }
        assert!(join_municipalities(Vec::new(), &b).unwrap().is_empty());
    }

    #[test]
    fn region_selected_by_property() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"SIGLA":"TN"},"geometry":{"type":"Polygon","coordinates":[[[10,45],[11,45],[11,46],[10,46],[10,45]]]}},
            {"type":"Feature","properties":{"SIGLA":"BZ"},"geometry":{"type":"Polygon","coordinates":[[[10,46],[12,46],[12,47],[10,47],[10,46]]]}}
        ]}"#;
        let region = parse_region(json, &RegionConfig::default()).unwrap();
        assert!((region.unsigned_area() - 2.0).abs() < 1e-9);

        let first = parse_region(
            json,
            &RegionConfig {
                property: None,
                value: None,
                crs: None,
            },
        )
        .unwrap();
        assert!((first.unsigned_area() - 1.0).abs() < 1e-9);

        let missing = parse_region(
            json,
            &RegionConfig {
                property: Some("SIGLA".to_string()),
                value: Some("XX".to_string()),
                crs: None,
            },
        );
        assert!(matches!(missing, Err(SpatialError::RegionNotFound { .. })));
    }

    #[test]
    fn rejects_non_collection_input() {
        let json = r#"{"type":"Point","coordinates":[11.0,46.0]}"#;
        assert!(matches!(
            parse_region(json, &RegionConfig::default()),
            Err(SpatialError::Conversion { .. })
        ));
    }

    #[test]
    fn missing_file_names_path() {
        let err = load_region(Path::new("/nonexistent/region.geojson"), &RegionConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/region.geojson"));
    }
}
