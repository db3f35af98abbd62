#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tourism establishment record types and accommodation category taxonomy.
//!
//! Column names follow the tourism open data API vocabulary (`Id`,
//! `AccoCategoryId`, `Latitude`, ...) and the municipality shapefile
//! attributes (`NAME_D`, `NAME_I`) so that the CSV files read and written by
//! the pipeline stay compatible with the raw exports.

pub mod category;
pub mod parsing;

use serde::{Deserialize, Serialize};

pub use category::{
    AccommodationCategory, CategoryIndicators, CategoryParseError, CategoryRating, CategoryType,
};

/// Suffix carried by identifiers of reduced-detail API entries.
pub const REDUCED_ID_SUFFIX: &str = "_REDUCED";

/// Strips `suffix` from an establishment identifier so that reduced and full
/// entries for the same establishment share one merge key.
#[must_use]
pub fn normalize_id<'a>(id: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() {
        return id;
    }
    id.strip_suffix(suffix).unwrap_or(id)
}

/// One row of the parsed establishment table, before cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEstablishment {
    /// API identifier, possibly carrying [`REDUCED_ID_SUFFIX`].
    #[serde(rename = "Id")]
    pub id: String,
    /// Establishment name (German).
    #[serde(rename = "Name", default, deserialize_with = "parsing::optional_string")]
    pub name: Option<String>,
    /// City name (German).
    #[serde(rename = "City", default, deserialize_with = "parsing::optional_string")]
    pub city: Option<String>,
    /// Compound category code, e.g. `"3sstars"`.
    #[serde(
        rename = "AccoCategoryId",
        default,
        deserialize_with = "parsing::optional_string"
    )]
    pub category_code: Option<String>,
    /// Number of room entries listed for the establishment.
    #[serde(
        rename = "AccoRoomInfo",
        default,
        deserialize_with = "parsing::optional_int"
    )]
    pub room_entries: Option<i64>,
    #[serde(
        rename = "HasApartment",
        default,
        deserialize_with = "parsing::optional_bool"
    )]
    pub has_apartment: Option<bool>,
    #[serde(
        rename = "IsGastronomy",
        default,
        deserialize_with = "parsing::optional_bool"
    )]
    pub is_gastronomy: Option<bool>,
    /// Tourism region name.
    #[serde(
        rename = "LocationInfo",
        default,
        deserialize_with = "parsing::optional_string"
    )]
    pub region: Option<String>,
    #[serde(
        rename = "Altitude",
        default,
        deserialize_with = "parsing::optional_float"
    )]
    pub altitude: Option<f64>,
    #[serde(
        rename = "Latitude",
        default,
        deserialize_with = "parsing::optional_float"
    )]
    pub latitude: Option<f64>,
    #[serde(
        rename = "Longitude",
        default,
        deserialize_with = "parsing::optional_float"
    )]
    pub longitude: Option<f64>,
    /// Provenance: the API page file this row was parsed from. Not part of
    /// the deduplication key.
    #[serde(rename = "file", default, deserialize_with = "parsing::optional_string")]
    pub file: Option<String>,
}

/// Every business column of a [`ParsedEstablishment`], i.e. all columns
/// except the provenance column. Floats compare by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DedupKey<'a> {
    id: &'a str,
    name: Option<&'a str>,
    city: Option<&'a str>,
    category_code: Option<&'a str>,
    room_entries: Option<i64>,
    has_apartment: Option<bool>,
    is_gastronomy: Option<bool>,
    region: Option<&'a str>,
    altitude: Option<u64>,
    latitude: Option<u64>,
    longitude: Option<u64>,
}

impl ParsedEstablishment {
    /// Returns the deduplication key of this row.
    #[must_use]
    pub fn dedup_key(&self) -> DedupKey<'_> {
        DedupKey {
            id: &self.id,
            name: self.name.as_deref(),
            city: self.city.as_deref(),
            category_code: self.category_code.as_deref(),
            room_entries: self.room_entries,
            has_apartment: self.has_apartment,
            is_gastronomy: self.is_gastronomy,
            region: self.region.as_deref(),
            altitude: self.altitude.map(f64::to_bits),
            latitude: self.latitude.map(f64::to_bits),
            longitude: self.longitude.map(f64::to_bits),
        }
    }

    /// Converts into a cleaned-pipeline record.
    ///
    /// Returns `None` if either coordinate is missing.
    #[must_use]
    pub fn into_record(self) -> Option<EstablishmentRecord> {
        let latitude = self.latitude?;
        let longitude = self.longitude?;
        Some(EstablishmentRecord {
            id: self.id,
            name: self.name,
            city: self.city,
            category_code: self.category_code,
            category_rating: None,
            category_type: None,
            region: self.region,
            altitude: self.altitude,
            latitude,
            longitude,
            has_apartment: self.has_apartment,
            is_gastronomy: self.is_gastronomy,
            name_de: None,
            name_it: None,
            total_rooms: None,
            max_occupancy: None,
        })
    }
}

/// Room totals for one establishment, from the room-info table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    /// Establishment identifier (already normalised by the room-info export).
    #[serde(rename = "Id")]
    pub id: String,
    /// Sum of room quantities.
    #[serde(
        rename = "TotalRooms",
        default,
        deserialize_with = "parsing::optional_int"
    )]
    pub total_rooms: Option<i64>,
    /// Sum of room quantity times per-room maximum occupancy.
    #[serde(
        rename = "MaxOccupancy",
        default,
        deserialize_with = "parsing::optional_int"
    )]
    pub max_occupancy: Option<i64>,
}

/// A cleaned tourism establishment.
///
/// Category, municipality and room columns start empty and are filled by
/// the decomposition, spatial join, and room merge stages respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstablishmentRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default, deserialize_with = "parsing::optional_string")]
    pub name: Option<String>,
    #[serde(rename = "City", default, deserialize_with = "parsing::optional_string")]
    pub city: Option<String>,
    #[serde(
        rename = "AccoCategoryId",
        default,
        deserialize_with = "parsing::optional_string"
    )]
    pub category_code: Option<String>,
    #[serde(rename = "AccoCategoryRating", default)]
    pub category_rating: Option<CategoryRating>,
    #[serde(rename = "AccoCategoryType", default)]
    pub category_type: Option<CategoryType>,
    #[serde(
        rename = "LocationInfo",
        default,
        deserialize_with = "parsing::optional_string"
    )]
    pub region: Option<String>,
    #[serde(
        rename = "Altitude",
        default,
        deserialize_with = "parsing::optional_float"
    )]
    pub altitude: Option<f64>,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(
        rename = "HasApartment",
        default,
        deserialize_with = "parsing::optional_bool"
    )]
    pub has_apartment: Option<bool>,
    #[serde(
        rename = "IsGastronomy",
        default,
        deserialize_with = "parsing::optional_bool"
    )]
    pub is_gastronomy: Option<bool>,
    /// German municipality name, set by the spatial join.
    #[serde(rename = "NAME_D", default, deserialize_with = "parsing::optional_string")]
    pub name_de: Option<String>,
    /// Italian municipality name, set by the spatial join.
    #[serde(rename = "NAME_I", default, deserialize_with = "parsing::optional_string")]
    pub name_it: Option<String>,
    #[serde(
        rename = "TotalRooms",
        default,
        deserialize_with = "parsing::optional_int"
    )]
    pub total_rooms: Option<i64>,
    #[serde(
        rename = "MaxOccupancy",
        default,
        deserialize_with = "parsing::optional_int"
    )]
    pub max_occupancy: Option<i64>,
}

impl EstablishmentRecord {
    /// Returns the decomposed category of this record.
    #[must_use]
    pub const fn category(&self) -> AccommodationCategory {
        AccommodationCategory::from_parts(self.category_rating, self.category_type)
    }

    /// Returns the `(German, Italian)` municipality name pair, if the record
    /// was matched to a municipality.
    #[must_use]
    pub fn municipality(&self) -> Option<(&str, &str)> {
        Some((self.name_de.as_deref()?, self.name_it.as_deref()?))
    }
}
