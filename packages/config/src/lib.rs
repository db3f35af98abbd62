#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline configuration.
//!
//! All file locations, cleaning thresholds, boundary attribute names and
//! density parameters live in a single [`PipelineConfig`] that is built
//! once per run and handed to each stage. The reference values are
//! embedded at compile time from `default.toml` and used when no config
//! file is given. A user-supplied TOML file only needs to contain the keys
//! it overrides; omitted keys come from the `Default` impls, which mirror
//! `default.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Embedded reference configuration.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../default.toml");

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`PipelineConfig`].
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value parsed but is outside its valid range.
    #[error("Invalid config value for {key}: {message}")]
    Invalid {
        /// Dotted key of the offending value.
        key: &'static str,
        /// Description of what went wrong.
        message: String,
    },
}

/// Top-level configuration for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input and output file locations.
    pub paths: PathsConfig,
    /// Deduplication and outlier filter settings.
    pub cleaning: CleaningConfig,
    /// Municipality boundary attribute names.
    pub municipalities: BoundaryConfig,
    /// Region boundary selection.
    pub region: RegionConfig,
    /// Kernel density estimation parameters.
    pub density: DensityConfig,
}

impl PipelineConfig {
    /// Parses a configuration from TOML, filling missing keys with the
    /// reference defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or a value is out of
    /// range.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses the embedded `default.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded file is malformed.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
    }

    /// Loads a configuration file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading pipeline config from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks that numeric parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.cleaning.zscore_threshold.is_finite() || self.cleaning.zscore_threshold < 0.0 {
            return Err(ConfigError::Invalid {
                key: "cleaning.zscore_threshold",
                message: format!(
                    "expected a non-negative number, got {}",
                    self.cleaning.zscore_threshold
                ),
            });
        }
        if !self.density.bandwidth.is_finite() || self.density.bandwidth <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "density.bandwidth",
                message: format!("expected a positive number, got {}", self.density.bandwidth),
            });
        }
        if self.density.resolution == 0 {
            return Err(ConfigError::Invalid {
                key: "density.resolution",
                message: "expected at least 1 grid point per axis".to_string(),
            });
        }
        Ok(())
    }
}

/// Input and output file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Parsed establishment table (one row per API entry).
    pub parsed_establishments: PathBuf,
    /// Room totals per establishment.
    pub room_info: PathBuf,
    /// Cleaned, joined, enriched establishment table written by `prepare`.
    pub prepared_establishments: PathBuf,
    /// Municipality boundaries with resident population (`GeoJSON`).
    pub municipalities: PathBuf,
    /// Region boundaries (`GeoJSON`), filtered by [`RegionConfig`].
    pub region: PathBuf,
    /// Directory for dashboard artifacts.
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            parsed_establishments: PathBuf::from("data/prepared_data/accommodations_parsed.csv"),
            room_info: PathBuf::from("data/prepared_data/accommodation_rooms.csv"),
            prepared_establishments: PathBuf::from(
                "data/prepared_data/accommodations_cleaned.csv",
            ),
            municipalities: PathBuf::from(
                "data/raw_data/shapefiles/OfficialResidentPopulation_polygon.geojson",
            ),
            region: PathBuf::from("data/raw_data/shapefiles/ProvCM01012021_g_WGS84.geojson"),
            output_dir: PathBuf::from("data/dashboard_data"),
        }
    }
}

impl PathsConfig {
    /// Output path of the per-municipality KPI table.
    #[must_use]
    pub fn municipality_output(&self) -> PathBuf {
        self.output_dir.join("municipality.geojson")
    }

    /// Output path of the density bundle.
    #[must_use]
    pub fn density_output(&self) -> PathBuf {
        self.output_dir.join("density.json")
    }
}

/// Deduplication and outlier filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Absolute z-score both coordinates must reach for a record to be
    /// rejected as a GPS outlier.
    pub zscore_threshold: f64,
    /// Identifier suffix stripped before merging with room info.
    pub reduced_id_suffix: String,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            zscore_threshold: 0.5,
            reduced_id_suffix: "_REDUCED".to_string(),
        }
    }
}

/// Attribute names of the municipality boundary layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    /// Property holding the German municipality name.
    pub name_de_property: String,
    /// Property holding the Italian municipality name.
    pub name_it_property: String,
    /// Property holding the resident population.
    pub population_property: String,
    /// Coordinate reference system of the layer, overriding any `crs`
    /// member in the file (e.g. `"EPSG:3857"`).
    pub crs: Option<String>,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            name_de_property: "NAME_D".to_string(),
            name_it_property: "NAME_I".to_string(),
            population_property: "BW_WOHNBEV".to_string(),
            crs: None,
        }
    }
}

/// Selects the region polygon out of a multi-feature boundary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Property to match; `None` selects the first feature.
    pub property: Option<String>,
    /// Value the property must equal.
    pub value: Option<String>,
    /// Coordinate reference system override, as in [`BoundaryConfig::crs`].
    pub crs: Option<String>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            property: Some("SIGLA".to_string()),
            value: Some("BZ".to_string()),
            crs: None,
        }
    }
}

/// How density values are reported.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DensityScale {
    /// Natural log of the estimated density (the kernel fit's score).
    #[default]
    LogDensity,
    /// The estimated density itself.
    Density,
}

/// Kernel density estimation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    /// Gaussian kernel bandwidth in coordinate degrees.
    pub bandwidth: f64,
    /// Number of grid points per axis.
    pub resolution: usize,
    /// Output scale of the density values.
    pub scale: DensityScale,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            bandwidth: 0.03,
            resolution: 200,
            scale: DensityScale::LogDensity,
        }
    }
}
