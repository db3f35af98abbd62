#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for municipality attribution.
//!
//! Loads municipality polygons from `GeoJSON`, reprojects them to WGS84,
//! builds an R-tree over their envelopes, and assigns each establishment
//! to the municipality containing it.

pub mod boundaries;
pub mod crs;

use geo::{Area, Contains, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;
use tourism_map_establishment_models::EstablishmentRecord;

pub use boundaries::{MunicipalityLayer, MunicipalityPolygon};
pub use crs::Crs;

/// Errors that can occur during spatial operations.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// I/O error reading a boundary file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },

    /// The layer declares a CRS that cannot be reprojected to WGS84.
    #[error("Unsupported coordinate reference system '{crs}'")]
    UnsupportedCrs {
        /// The declared CRS name.
        crs: String,
    },

    /// A layer was handed to the index without being reprojected first.
    #[error("Boundary layer is in {found:?}, expected WGS84")]
    CrsMismatch {
        /// CRS of the rejected layer.
        found: Crs,
    },

    /// A polygon's coordinates are not valid longitude/latitude.
    #[error(
        "Feature '{feature}' has coordinates outside WGS84 bounds \
         ([{min_x}, {min_y}] to [{max_x}, {max_y}]); is its CRS declared?"
    )]
    CoordinatesOutOfRange {
        /// Name of the offending feature.
        feature: String,
        /// Minimum x (longitude).
        min_x: f64,
        /// Minimum y (latitude).
        min_y: f64,
        /// Maximum x (longitude).
        max_x: f64,
        /// Maximum y (latitude).
        max_y: f64,
    },

    /// No feature in the region file matched the configured selector.
    #[error("No region feature with {property} = {value}")]
    RegionNotFound {
        /// Property that was matched.
        property: String,
        /// Value that was expected.
        value: String,
    },

    /// The spatial join changed the number of rows.
    #[error("Row count changed during spatial join: expected {expected}, got {actual}")]
    RowCountMismatch {
        /// Input row count.
        expected: usize,
        /// Output row count.
        actual: usize,
    },
}

/// A municipality polygon stored in the R-tree.
struct BoundaryEntry {
    /// Index into [`SpatialIndex::municipalities`].
    idx: usize,
    area: f64,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over municipality polygons.
///
/// Constructed once per run from a WGS84 [`MunicipalityLayer`]; provides
/// point-in-polygon lookups for the spatial join.
pub struct SpatialIndex {
    municipalities: Vec<MunicipalityPolygon>,
    tree: RTree<BoundaryEntry>,
}

impl SpatialIndex {
    /// Builds the R-tree for a layer.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::CrsMismatch`] if the layer has not been
    /// reprojected to WGS84.
    pub fn new(layer: MunicipalityLayer) -> Result<Self, SpatialError> {
        if layer.crs != Crs::Wgs84 {
            return Err(SpatialError::CrsMismatch { found: layer.crs });
        }

        let entries = layer
            .municipalities
            .iter()
            .enumerate()
            .map(|(idx, m)| BoundaryEntry {
                idx,
                area: m.boundary.unsigned_area(),
                envelope: compute_envelope(&m.boundary),
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::info!("Loaded {} municipalities into spatial index", tree.size());

        Ok(Self {
            municipalities: layer.municipalities,
            tree,
        })
    }

    /// All indexed municipalities, in load order.
    #[must_use]
    pub fn municipalities(&self) -> &[MunicipalityPolygon] {
        &self.municipalities
    }

    /// Look up the municipality containing a point.
    ///
    /// Boundaries should tile the region, but where polygons overlap the
    /// smallest area wins, with the German name breaking exact ties, so
    /// the answer never depends on load order.
    #[must_use]
    pub fn lookup(&self, lng: f64, lat: f64) -> Option<&MunicipalityPolygon> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        let mut best: Option<(&BoundaryEntry, &MunicipalityPolygon)> = None;

        for entry in self.tree.locate_in_envelope_intersecting(&query_env) {
            let candidate = &self.municipalities[entry.idx];
            if !candidate.boundary.contains(&point) {
                continue;
            }
            match best {
                None => best = Some((entry, candidate)),
                Some((current, current_m)) => {
                    let smaller = entry
                        .area
                        .total_cmp(&current.area)
                        .then_with(|| candidate.name_de.cmp(&current_m.name_de))
                        .is_lt();
                    if smaller {
                        best = Some((entry, candidate));
                    }
                }
            }
        }

        best.map(|(_, m)| m)
    }
}

/// Assigns each establishment the municipality whose polygon contains it.
///
/// This is a left join: establishments outside every polygon keep null
/// municipality names and are not dropped.
///
/// # Errors
///
/// Returns [`SpatialError::RowCountMismatch`] if the output row count
/// differs from the input.
pub fn join_municipalities(
    records: Vec<EstablishmentRecord>,
    index: &SpatialIndex,
) -> Result<Vec<EstablishmentRecord>, SpatialError> {
    let expected = records.len();
    let mut unmatched = 0usize;

    let joined: Vec<EstablishmentRecord> = records
        .into_iter()
        .map(|mut record| {
            match index.lookup(record.longitude, record.latitude) {
                Some(m) => {
                    record.name_de = Some(m.name_de.clone());
                    record.name_it = Some(m.name_it.clone());
                }
                None => {
                    record.name_de = None;
                    record.name_it = None;
                    unmatched += 1;
                }
            }
            record
        })
        .collect();

    if joined.len() != expected {
        return Err(SpatialError::RowCountMismatch {
            expected,
            actual: joined.len(),
        });
    }

    if unmatched > 0 {
        log::warn!("{unmatched} of {expected} establishments fall outside every municipality");
    }
    log::info!(
        "Joined {} establishments to municipalities",
        expected - unmatched
    );

    Ok(joined)
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
