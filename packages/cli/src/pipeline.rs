//! Pipeline stages.
//!
//! Each stage reads its inputs from the paths in [`PipelineConfig`],
//! computes its artifact in memory, and only then writes it. [`run_all`]
//! computes every artifact before writing any of them, so a failure late in
//! the run leaves no partial output behind.

use std::path::Path;
use std::time::Instant;

use geo::{MultiPolygon, Point};
use serde::Serialize;
use thiserror::Error;
use tourism_map_analytics::AnalyticsError;
use tourism_map_analytics_models::MunicipalityKpiRow;
use tourism_map_config::PipelineConfig;
use tourism_map_density::{DensityError, DensityEstimator, DensityGrid};
use tourism_map_establishment_models::EstablishmentRecord;
use tourism_map_ingest::IngestError;
use tourism_map_ingest::categories::decompose_categories;
use tourism_map_ingest::clean::Cleaner;
use tourism_map_ingest::load::{
    load_parsed_establishments, load_prepared_establishments, load_room_info,
    write_prepared_establishments,
};
use tourism_map_ingest::rooms::merge_room_info;
use tourism_map_spatial::boundaries::{load_municipalities, load_region};
use tourism_map_spatial::{SpatialError, SpatialIndex, join_municipalities};

use crate::output::{DensityBundle, municipality_collection};

/// Errors from any pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    Density(#[from] DensityError),

    /// An artifact could not be serialised.
    #[error("Failed to serialise {path}: {source}")]
    Json {
        /// Output path.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// An artifact could not be written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Cleans, categorises, joins and enriches the parsed establishments, then
/// writes the prepared table.
///
/// # Errors
///
/// Returns [`PipelineError`] if any input cannot be read or a merge check
/// fails.
pub fn prepare(config: &PipelineConfig) -> Result<Vec<EstablishmentRecord>, PipelineError> {
    let records = prepare_records(config)?;
    write_prepared_establishments(&config.paths.prepared_establishments, &records)?;
    Ok(records)
}

/// Aggregates the prepared table into per-municipality KPIs and writes them
/// as `GeoJSON`.
///
/// # Errors
///
/// Returns [`PipelineError`] if the prepared table or boundaries cannot be
/// read, aggregation fails, or the output cannot be written.
pub fn municipalities(config: &PipelineConfig) -> Result<(), PipelineError> {
    let records = load_prepared_establishments(&config.paths.prepared_establishments)?;
    let rows = municipality_rows(config, &records)?;
    write_municipalities(&config.paths.municipality_output(), &rows)
}

/// Estimates establishment density over the region and writes the bundle.
///
/// # Errors
///
/// Returns [`PipelineError`] if the prepared table or region cannot be
/// read, estimation fails, or the output cannot be written.
pub fn density(config: &PipelineConfig) -> Result<(), PipelineError> {
    let records = load_prepared_establishments(&config.paths.prepared_establishments)?;
    let (points, region, grid) = density_grid(config, &records)?;
    write_density(&config.paths.density_output(), &points, &region, &grid)
}

/// Runs every stage, writing outputs only once all of them succeeded.
///
/// # Errors
///
/// Returns the first [`PipelineError`] encountered.
pub fn run_all(config: &PipelineConfig) -> Result<(), PipelineError> {
    let start = Instant::now();

    log::info!("[1/3] Preparing establishments...");
    let records = prepare_records(config)?;
    log::info!("[2/3] Aggregating municipality KPIs...");
    let rows = municipality_rows(config, &records)?;
    log::info!("[3/3] Estimating density...");
    let (points, region, grid) = density_grid(config, &records)?;

    write_prepared_establishments(&config.paths.prepared_establishments, &records)?;
    write_municipalities(&config.paths.municipality_output(), &rows)?;
    write_density(&config.paths.density_output(), &points, &region, &grid)?;

    log::info!("Pipeline complete in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn prepare_records(config: &PipelineConfig) -> Result<Vec<EstablishmentRecord>, PipelineError> {
    let parsed = load_parsed_establishments(&config.paths.parsed_establishments)?;
    let (records, report) = Cleaner::new(config.cleaning.clone()).clean(parsed);
    log::info!(
        "Cleaning kept {} of {} rows ({} duplicates, {} without coordinates, {} outliers)",
        report.output,
        report.input,
        report.duplicates,
        report.missing_coordinates,
        report.outliers
    );

    let records = decompose_categories(records)?;

    let layer = load_municipalities(&config.paths.municipalities, &config.municipalities)?;
    let index = SpatialIndex::new(layer)?;
    let records = join_municipalities(records, &index)?;

    let rooms = load_room_info(&config.paths.room_info)?;
    let records = merge_room_info(records, &rooms, &config.cleaning.reduced_id_suffix)?;

    Ok(records)
}

fn municipality_rows(
    config: &PipelineConfig,
    records: &[EstablishmentRecord],
) -> Result<Vec<MunicipalityKpiRow>, PipelineError> {
    let layer = load_municipalities(&config.paths.municipalities, &config.municipalities)?;
    Ok(tourism_map_analytics::aggregate(records, &layer.municipalities)?)
}

fn density_grid(
    config: &PipelineConfig,
    records: &[EstablishmentRecord],
) -> Result<(Vec<Point<f64>>, MultiPolygon<f64>, DensityGrid), PipelineError> {
    let region = load_region(&config.paths.region, &config.region)?;
    let points: Vec<Point<f64>> = records
        .iter()
        .map(|r| Point::new(r.longitude, r.latitude))
        .collect();
    let grid = DensityEstimator::new(config.density.clone()).estimate(&points, &region)?;
    Ok((points, region, grid))
}

fn write_municipalities(path: &Path, rows: &[MunicipalityKpiRow]) -> Result<(), PipelineError> {
    write_json(path, &municipality_collection(rows))?;
    log::info!("Wrote {} municipalities to {}", rows.len(), path.display());
    Ok(())
}

fn write_density(
    path: &Path,
    points: &[Point<f64>],
    region: &MultiPolygon<f64>,
    grid: &DensityGrid,
) -> Result<(), PipelineError> {
    write_json(path, &DensityBundle::new(points, region, grid))?;
    log::info!("Wrote density grid to {}", path.display());
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let io_err = |e| PipelineError::Io {
        path: path.display().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string(value).map_err(|e| PipelineError::Json {
        path: path.display().to_string(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use tourism_map_config::{CleaningConfig, DensityConfig, PathsConfig};

    const PARSED_CSV: &str = "\
Id,Name,City,AccoCategoryId,AccoRoomInfo,HasApartment,IsGastronomy,LocationInfo,Altitude,Latitude,Longitude,file
A_REDUCED,Hotel A,Bozen,3sstars,2.0,False,False,Bozen,262.0,46.20,11.20,page_0.json
B,Hotel B,Bozen,2stars,1.0,False,True,Bozen,262.0,46.25,11.25,page_0.json
B,Hotel B,Bozen,2stars,1.0,False,True,Bozen,262.0,46.25,11.25,page_1.json
C,Hof C,Meran,3flowers,,True,False,Meran,325.0,46.22,11.70,page_1.json
D,Camping D,Meran,Not categorized,,,,Meran,325.0,46.30,11.75,page_2.json
E,Nowhere,,2suns,,,,,,46.26,11.30,page_2.json
F,No position,,3stars,,,,,,,,page_2.json
";

    const ROOMS_CSV: &str = "\
Id,TotalRooms,MaxOccupancy
A,10.0,20.0
B,5,12
C,3,
";

    fn municipalities_geojson() -> String {
        let feature = |name: &str, it: &str, pop: u64, x0: f64, x1: f64| {
            format!(
                r#"{{"type":"Feature","properties":{{"NAME_D":"{name}","NAME_I":"{it}","BW_WOHNBEV":{pop}}},"geometry":{{"type":"Polygon","coordinates":[[[{x0},46.0],[{x1},46.0],[{x1},46.5],[{x0},46.5],[{x0},46.0]]]}}}}"#
            )
        };
        format!(
            r#"{{"type":"FeatureCollection","features":[{},{}]}}"#,
            feature("Bozen", "Bolzano", 2000, 11.0, 11.28),
            feature("Meran", "Merano", 4000, 11.5, 12.0),
        )
    }

    const REGION_GEOJSON: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","properties":{"SIGLA":"BZ"},"geometry":{"type":"Polygon","coordinates":[[[11.0,46.0],[12.0,46.0],[12.0,46.5],[11.0,46.5],[11.0,46.0]]]}}
    ]}"#;

    fn fixture(name: &str) -> PipelineConfig {
        let dir = std::env::temp_dir().join(format!("tourism_map_pipeline_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let write = |file: &str, contents: &str| -> PathBuf {
            let path = dir.join(file);
            std::fs::write(&path, contents).unwrap();
            path
        };

        PipelineConfig {
            paths: PathsConfig {
                parsed_establishments: write("parsed.csv", PARSED_CSV),
                room_info: write("rooms.csv", ROOMS_CSV),
                prepared_establishments: dir.join("prepared/accommodations_cleaned.csv"),
                municipalities: write("municipalities.geojson", &municipalities_geojson()),
                region: write("region.geojson", REGION_GEOJSON),
                output_dir: dir.join("dashboard"),
            },
            // Five points can never reach |z| = 3, so nothing is an outlier.
            cleaning: CleaningConfig {
                zscore_threshold: 3.0,
                ..CleaningConfig::default()
            },
            density: DensityConfig {
                resolution: 10,
                ..DensityConfig::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn prepare_cleans_joins_and_enriches() {
        let config = fixture("prepare");
        let records = prepare(&config).unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["A", "B", "C", "D", "E"], "duplicate and position-less rows dropped");

        let a = &records[0];
        assert_eq!(a.municipality(), Some(("Bozen", "Bolzano")));
        assert_eq!(a.total_rooms, Some(10), "reduced id matched full room info");
        assert_eq!(a.category_rating.map(|r| r.to_string()).as_deref(), Some("3S"));
        assert_eq!(records[2].max_occupancy, None);
        assert_eq!(records[4].municipality(), None, "E lies between the polygons");

        let reloaded = load_prepared_establishments(&config.paths.prepared_establishments).unwrap();
        assert_eq!(reloaded, records);
    }

    #[test]
    fn municipalities_stage_writes_one_feature_per_municipality() {
        let config = fixture("municipalities");
        prepare(&config).unwrap();
        municipalities(&config).unwrap();

        let contents = std::fs::read_to_string(config.paths.municipality_output()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);

        let bozen = &features[0]["properties"];
        assert_eq!(bozen["NAME_D"], "Bozen");
        assert_eq!(bozen["nr_establishments"], 2.0);
        assert_eq!(bozen["nr_establishments_per_thousand_pop"], 1.0);
        assert_eq!(bozen["total_occupancy"], 32.0);
        assert_eq!(bozen["share_stars"], 100.0);
    }

    #[test]
    fn run_all_writes_every_artifact() {
        let config = fixture("all");
        run_all(&config).unwrap();

        assert!(config.paths.prepared_establishments.exists());
        assert!(config.paths.municipality_output().exists());

        let contents = std::fs::read_to_string(config.paths.density_output()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(json["resolution"], 10);
        assert_eq!(json["establishments"].as_array().unwrap().len(), 5);
        assert_eq!(json["z_grid"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn staged_and_single_runs_agree_without_italian_name() {
        let config = fixture("italian_name");
        let geojson = municipalities_geojson().replace(r#""NAME_I":"Merano","#, "");
        std::fs::write(&config.paths.municipalities, geojson).unwrap();

        run_all(&config).unwrap();
        let read_output = || -> serde_json::Value {
            let contents = std::fs::read_to_string(config.paths.municipality_output()).unwrap();
            serde_json::from_str(&contents).unwrap()
        };
        let single = read_output();
        std::fs::remove_file(config.paths.municipality_output()).unwrap();
        std::fs::remove_file(&config.paths.prepared_establishments).unwrap();

        let records = prepare(&config).unwrap();
        assert!(records.iter().all(|r| r.name_de.is_some() == r.name_it.is_some()));
        municipalities(&config).unwrap();
        let staged = read_output();

        assert_eq!(single, staged);
        let features = staged["features"].as_array().unwrap();
        assert_eq!(features.len(), 1, "Meran has no Italian name and is not loaded");
        assert_eq!(features[0]["properties"]["NAME_D"], "Bozen");
    }

    #[test]
    fn failed_run_leaves_no_outputs() {
        let mut config = fixture("failure");
        config.paths.region = config.paths.output_dir.join("missing.geojson");

        assert!(matches!(
            run_all(&config),
            Err(PipelineError::Spatial(SpatialError::Io { .. }))
        ));
        assert!(!config.paths.prepared_establishments.exists());
        assert!(!config.paths.municipality_output().exists());
    }
}
