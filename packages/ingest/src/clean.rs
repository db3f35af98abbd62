//! Deduplication and GPS outlier rejection.
//!
//! The outlier filter is a statistical heuristic, not a geographic bound:
//! a record is rejected only when its latitude and its longitude are both
//! far from the mean of the whole table. Its main job is catching
//! placeholder coordinates such as `(0, 0)` that sit well away from the
//! real distribution of establishments.

use std::collections::BTreeSet;

use tourism_map_config::CleaningConfig;
use tourism_map_establishment_models::{EstablishmentRecord, ParsedEstablishment};

/// Row counts removed by each cleaning step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningReport {
    /// Rows read.
    pub input: usize,
    /// Exact duplicates dropped.
    pub duplicates: usize,
    /// Rows dropped for a missing latitude or longitude.
    pub missing_coordinates: usize,
    /// Rows rejected as GPS outliers.
    pub outliers: usize,
    /// Rows remaining.
    pub output: usize,
}

/// Cleans a parsed establishment table according to a [`CleaningConfig`].
#[derive(Debug, Clone)]
pub struct Cleaner {
    config: CleaningConfig,
}

impl Cleaner {
    #[must_use]
    pub const fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    /// Runs deduplication, coordinate checks and outlier rejection.
    #[must_use]
    pub fn clean(&self, rows: Vec<ParsedEstablishment>) -> (Vec<EstablishmentRecord>, CleaningReport) {
        let input = rows.len();

        let (rows, duplicates) = deduplicate(rows);
        log::info!("Number of duplicates: {duplicates}");

        let before = rows.len();
        let records: Vec<EstablishmentRecord> = rows
            .into_iter()
            .filter_map(ParsedEstablishment::into_record)
            .collect();
        let missing_coordinates = before - records.len();
        if missing_coordinates > 0 {
            log::warn!("Dropped {missing_coordinates} establishments without GPS coordinates");
        }

        let (records, outliers) = remove_gps_outliers(records, self.config.zscore_threshold);
        log::info!("Number of invalid GPS coordinates: {outliers}");

        let report = CleaningReport {
            input,
            duplicates,
            missing_coordinates,
            outliers,
            output: records.len(),
        };
        (records, report)
    }
}

/// Drops rows whose business columns exactly match an earlier row. The
/// provenance column is ignored, and the first occurrence is kept.
///
/// Returns the remaining rows and the number dropped.
#[must_use]
pub fn deduplicate(rows: Vec<ParsedEstablishment>) -> (Vec<ParsedEstablishment>, usize) {
    let keep: Vec<bool> = {
        let mut seen = BTreeSet::new();
        rows.iter().map(|row| seen.insert(row.dedup_key())).collect()
    };

    let before = rows.len();
    let kept: Vec<ParsedEstablishment> = rows
        .into_iter()
        .zip(keep)
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect();
    let dropped = before - kept.len();

    (kept, dropped)
}

/// Rejects records whose latitude and longitude z-scores both reach
/// `threshold` in absolute value.
///
/// Z-scores use the population standard deviation. When a coordinate has no
/// spread its z-scores are undefined and nothing is rejected.
///
/// Returns the remaining records and the number rejected.
#[must_use]
pub fn remove_gps_outliers(
    records: Vec<EstablishmentRecord>,
    threshold: f64,
) -> (Vec<EstablishmentRecord>, usize) {
    let latitudes: Vec<f64> = records.iter().map(|r| r.latitude).collect();
    let longitudes: Vec<f64> = records.iter().map(|r| r.longitude).collect();
    let lat_z = zscores(&latitudes);
    let lng_z = zscores(&longitudes);

    let before = records.len();
    let kept: Vec<EstablishmentRecord> = records
        .into_iter()
        .zip(lat_z.into_iter().zip(lng_z))
        .filter_map(|(record, (lat, lng))| {
            let outlier = lat.abs() >= threshold && lng.abs() >= threshold;
            if outlier {
                log::debug!(
                    "Rejecting {} at ({}, {}) as GPS outlier",
                    record.id,
                    record.latitude,
                    record.longitude
                );
            }
            (!outlier).then_some(record)
        })
        .collect();
    let rejected = before - kept.len();

    (kept, rejected)
}

/// Standard scores of `values` (population standard deviation, ddof = 0).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn zscores(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    values.iter().map(|v| (v - mean) / std_dev).collect()
}
