#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Establishment density surface.
//!
//! Fits a Gaussian kernel density to establishment coordinates and
//! evaluates it on a regular latitude/longitude grid spanning the region's
//! bounding box. Grid points outside the region polygon are masked as NaN.

pub mod kde;

use geo::{BoundingRect, Contains, MultiPolygon, Point};
use thiserror::Error;
use tourism_map_config::{DensityConfig, DensityScale};

pub use kde::GaussianKde;

/// Errors that can occur during density estimation.
#[derive(Debug, Error)]
pub enum DensityError {
    /// No establishments to fit.
    #[error("Cannot estimate density from an empty sample")]
    EmptySample,

    /// The kernel bandwidth is not a positive finite number.
    #[error("Invalid bandwidth {bandwidth}: expected a positive number")]
    InvalidBandwidth {
        /// The rejected bandwidth.
        bandwidth: f64,
    },

    /// The grid has no points.
    #[error("Grid resolution must be at least 1")]
    InvalidResolution,

    /// The region polygon has no bounding box.
    #[error("Region polygon is empty")]
    EmptyRegion,
}

/// A square density grid in row-major order.
///
/// Row `i` shares one latitude and column `j` shares one longitude, both
/// ascending. Values outside the region are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    resolution: usize,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    values: Vec<f64>,
    scale: DensityScale,
}

impl DensityGrid {
    /// Number of grid points per axis.
    #[must_use]
    pub const fn resolution(&self) -> usize {
        self.resolution
    }

    #[must_use]
    pub const fn scale(&self) -> DensityScale {
        self.scale
    }

    #[inline]
    #[must_use]
    pub fn latitude(&self, row: usize, col: usize) -> f64 {
        self.latitudes[row * self.resolution + col]
    }

    #[inline]
    #[must_use]
    pub fn longitude(&self, row: usize, col: usize) -> f64 {
        self.longitudes[row * self.resolution + col]
    }

    #[inline]
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.resolution + col]
    }

    /// Latitude grid, one slice per row.
    pub fn latitude_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.latitudes.chunks(self.resolution)
    }

    /// Longitude grid, one slice per row.
    pub fn longitude_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.longitudes.chunks(self.resolution)
    }

    /// Masked values, one slice per row.
    pub fn value_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.resolution)
    }

    /// Number of grid points inside the region.
    #[must_use]
    pub fn masked_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }
}

/// Computes density grids according to a [`DensityConfig`].
#[derive(Debug, Clone)]
pub struct DensityEstimator {
    config: DensityConfig,
}

impl DensityEstimator {
    #[must_use]
    pub const fn new(config: DensityConfig) -> Self {
        Self { config }
    }

    /// Estimates the density of `establishments` (x = longitude,
    /// y = latitude) over `region`.
    ///
    /// # Errors
    ///
    /// Returns [`DensityError`] for an empty sample, an invalid bandwidth or
    /// resolution, or a region without extent.
    pub fn estimate(
        &self,
        establishments: &[Point<f64>],
        region: &MultiPolygon<f64>,
    ) -> Result<DensityGrid, DensityError> {
        let n = self.config.resolution;
        if n == 0 {
            return Err(DensityError::InvalidResolution);
        }
        let bounds = region.bounding_rect().ok_or(DensityError::EmptyRegion)?;
        let kde = GaussianKde::fit(establishments.to_vec(), self.config.bandwidth)?;

        log::info!(
            "Estimating density of {} establishments on a {n}x{n} grid (bandwidth {})",
            kde.len(),
            self.config.bandwidth
        );

        let lat_axis = linspace(bounds.min().y, bounds.max().y, n);
        let lon_axis = linspace(bounds.min().x, bounds.max().x, n);

        let mut latitudes = Vec::with_capacity(n * n);
        let mut longitudes = Vec::with_capacity(n * n);
        let mut values = Vec::with_capacity(n * n);
        for &lat in &lat_axis {
            for &lon in &lon_axis {
                latitudes.push(lat);
                longitudes.push(lon);

                let point = Point::new(lon, lat);
                let value = if region.contains(&point) {
                    let log_density = kde.log_density(point);
                    match self.config.scale {
                        DensityScale::LogDensity => log_density,
                        DensityScale::Density => log_density.exp(),
                    }
                } else {
                    f64::NAN
                };
                values.push(value);
            }
        }

        let grid = DensityGrid {
            resolution: n,
            latitudes,
            longitudes,
            values,
            scale: self.config.scale,
        };
        log::info!(
            "Density grid has {} of {} points inside the region",
            grid.masked_count(),
            n * n
        );
        Ok(grid)
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
#[allow(clippy::cast_precision_loss)]
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n)
        .map(|i| {
            if i == n - 1 {
                end
            } else {
                (i as f64).mul_add(step, start)
            }
        })
        .collect()
}
