#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Municipality KPI aggregation.
//!
//! Groups spatially joined establishments by municipality, computes counts,
//! room and occupancy totals and category shares, and attaches resident
//! population and boundary geometry to derive per-capita rates.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tourism_map_analytics_models::{CategoryCounts, MunicipalityKpiRow};
use tourism_map_establishment_models::EstablishmentRecord;
use tourism_map_spatial::MunicipalityPolygon;

/// Errors that can occur during aggregation.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// One German name is paired with more than one Italian name.
    #[error("Municipality '{name_de}' appears under several Italian names: {names_it:?}")]
    NonUniqueMunicipality {
        /// The ambiguous German name.
        name_de: String,
        /// Every Italian name it was seen with.
        names_it: Vec<String>,
    },

    /// The aggregated table does not have one row per German name in the
    /// joined establishments.
    #[error("Expected {expected} municipality rows, got {actual}")]
    MunicipalityCountMismatch {
        /// Distinct German names in the joined data.
        expected: usize,
        /// Rows produced.
        actual: usize,
    },
}

/// Running totals for one municipality.
#[derive(Debug, Default)]
struct Accumulator {
    count: u64,
    total_occupancy: i64,
    total_rooms: i64,
    occupancy_reported: u64,
    categories: CategoryCounts,
}

impl Accumulator {
    fn add(&mut self, record: &EstablishmentRecord) {
        self.count += 1;
        if let Some(occupancy) = record.max_occupancy {
            self.total_occupancy += occupancy;
            self.occupancy_reported += 1;
        }
        self.total_rooms += record.total_rooms.unwrap_or(0);
        self.categories.add(&record.category().indicators());
    }
}

/// Computes one KPI row per municipality present in `records`.
///
/// Establishments without a municipality are ignored. Population and
/// boundary are taken from the polygon with the same German name; when
/// there is none, per-capita rates are NaN and the boundary is empty. A
/// population of zero yields infinite or NaN rates, which are kept.
///
/// Rows are ordered by German name.
///
/// # Errors
///
/// Returns [`AnalyticsError::NonUniqueMunicipality`] if a German name is not
/// a unique key, or [`AnalyticsError::MunicipalityCountMismatch`] if the
/// row count differs from the number of distinct German names in `records`,
/// which happens when a record has a German name but no Italian one.
pub fn aggregate(
    records: &[EstablishmentRecord],
    municipalities: &[MunicipalityPolygon],
) -> Result<Vec<MunicipalityKpiRow>, AnalyticsError> {
    let mut groups: BTreeMap<(&str, &str), Accumulator> = BTreeMap::new();
    let mut unassigned = 0usize;
    for record in records {
        match record.municipality() {
            Some(key) => groups.entry(key).or_default().add(record),
            None => unassigned += 1,
        }
    }
    if unassigned > 0 {
        log::info!("{unassigned} establishments have no municipality and are not aggregated");
    }

    let mut names: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for &(name_de, name_it) in groups.keys() {
        names.entry(name_de).or_default().push(name_it);
    }
    if let Some((name_de, names_it)) = names.iter().find(|(_, it)| it.len() > 1) {
        return Err(AnalyticsError::NonUniqueMunicipality {
            name_de: (*name_de).to_string(),
            names_it: names_it.iter().map(|s| (*s).to_string()).collect(),
        });
    }

    let mut polygons: BTreeMap<&str, &MunicipalityPolygon> = BTreeMap::new();
    for m in municipalities {
        polygons.entry(m.name_de.as_str()).or_insert(m);
    }

    let rows: Vec<MunicipalityKpiRow> = groups
        .into_iter()
        .map(|((name_de, name_it), acc)| {
            let polygon = polygons.get(name_de).copied();
            if polygon.is_none() {
                log::warn!("No population polygon for municipality '{name_de}'");
            }
            build_row(name_de, name_it, acc, polygon)
        })
        .collect();

    let expected: BTreeSet<&str> = records.iter().filter_map(|r| r.name_de.as_deref()).collect();
    if rows.len() != expected.len() {
        return Err(AnalyticsError::MunicipalityCountMismatch {
            expected: expected.len(),
            actual: rows.len(),
        });
    }

    log::info!("Aggregated KPIs for {} municipalities", rows.len());
    Ok(rows)
}

#[allow(clippy::cast_precision_loss)]
fn build_row(
    name_de: &str,
    name_it: &str,
    acc: Accumulator,
    polygon: Option<&MunicipalityPolygon>,
) -> MunicipalityKpiRow {
    let population = polygon.and_then(|p| p.population);
    let per_thousand = |value: f64| {
        population.map_or(f64::NAN, |population| value / (population as f64 / 1000.0))
    };

    MunicipalityKpiRow {
        name_de: name_de.to_string(),
        name_it: name_it.to_string(),
        nr_establishments: acc.count,
        total_occupancy: acc.total_occupancy,
        total_nr_rooms: acc.total_rooms,
        avg_occupancy: acc.total_occupancy as f64 / acc.occupancy_reported as f64,
        nr_establishments_per_thousand_pop: per_thousand(acc.count as f64),
        total_occupancy_per_thousand_pop: per_thousand(acc.total_occupancy as f64),
        total_nr_rooms_per_thousand_pop: per_thousand(acc.total_rooms as f64),
        shares: acc.categories.into_shares(acc.count),
        population,
        boundary: polygon.map(|p| p.boundary.clone()),
    }
}
