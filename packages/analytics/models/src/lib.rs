#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Municipality KPI result types.
//!
//! A [`MunicipalityKpiRow`] holds every KPI for one municipality. The
//! [`Kpi`] enum is the catalogue of those columns with the display label
//! and number format the dashboard shows for each.

use geo::MultiPolygon;
use strum::EnumCount;
use strum_macros::{AsRefStr, Display, EnumString};
use tourism_map_establishment_models::{CategoryIndicators, CategoryRating, CategoryType};

/// Per-municipality indicator counts, one counter per rating and type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    /// Establishments per [`CategoryRating`], indexed by
    /// [`CategoryRating::index`].
    pub ratings: [u64; CategoryRating::COUNT],
    /// Establishments per [`CategoryType`], indexed by
    /// [`CategoryType::index`].
    pub types: [u64; CategoryType::COUNT],
}

impl CategoryCounts {
    /// Adds one establishment's indicators.
    pub fn add(&mut self, indicators: &CategoryIndicators) {
        for (count, set) in self.ratings.iter_mut().zip(indicators.ratings) {
            *count += u64::from(set);
        }
        for (count, set) in self.types.iter_mut().zip(indicators.types) {
            *count += u64::from(set);
        }
    }

    /// Converts counts to percentages of `total` establishments.
    ///
    /// Consumes the counts so a share can never be rescaled twice. A
    /// `total` of zero yields NaN shares.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn into_shares(self, total: u64) -> CategoryShares {
        let total = total as f64;
        let pct = |count: u64| count as f64 / total * 100.0;
        CategoryShares {
            ratings: self.ratings.map(pct),
            types: self.types.map(pct),
        }
    }
}

/// Rating and type shares in percent of a municipality's establishments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryShares {
    ratings: [f64; CategoryRating::COUNT],
    types: [f64; CategoryType::COUNT],
}

impl CategoryShares {
    /// Share of establishments with `rating`.
    #[must_use]
    pub const fn rating(&self, rating: CategoryRating) -> f64 {
        self.ratings[rating.index()]
    }

    /// Share of establishments of type `kind`.
    #[must_use]
    pub const fn kind(&self, kind: CategoryType) -> f64 {
        self.types[kind.index()]
    }

    /// Sum of all rating shares, i.e. the categorised share in percent.
    #[must_use]
    pub fn rating_total(&self) -> f64 {
        self.ratings.iter().sum()
    }
}

/// KPIs of one municipality.
#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalityKpiRow {
    /// German name (`NAME_D`).
    pub name_de: String,
    /// Italian name (`NAME_I`).
    pub name_it: String,
    pub nr_establishments: u64,
    /// Sum of maximum occupancy; establishments without a value count as 0.
    pub total_occupancy: i64,
    /// Sum of total rooms; establishments without a value count as 0.
    pub total_nr_rooms: i64,
    /// Mean maximum occupancy over establishments that report one; NaN if
    /// none do.
    pub avg_occupancy: f64,
    pub nr_establishments_per_thousand_pop: f64,
    pub total_occupancy_per_thousand_pop: f64,
    pub total_nr_rooms_per_thousand_pop: f64,
    pub shares: CategoryShares,
    /// Resident population, if a population polygon matched.
    pub population: Option<u64>,
    /// Boundary of the matching population polygon.
    pub boundary: Option<MultiPolygon<f64>>,
}

/// How a KPI value is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiFormat {
    /// Thousands-separated number, e.g. `1,234`.
    Grouped,
    /// One decimal place, e.g. `12.3`.
    OneDecimal,
    /// Percentage with two decimal places, e.g. `45.67%`.
    Percent,
}

impl KpiFormat {
    /// Formats `value` for display. Non-finite values are shown as `nan`,
    /// `inf` or `-inf`.
    #[must_use]
    pub fn format(self, value: f64) -> String {
        if !value.is_finite() {
            return format!("{value}").to_ascii_lowercase();
        }
        match self {
            Self::Grouped => group_thousands(&format!("{value}")),
            Self::OneDecimal => format!("{value:.1}"),
            Self::Percent => format!("{value:.2}%"),
        }
    }
}

fn group_thousands(formatted: &str) -> String {
    let (sign, digits) = formatted
        .strip_prefix('-')
        .map_or(("", formatted), |rest| ("-", rest));
    let (int, frac) = digits.split_once('.').map_or((digits, None), |(i, f)| (i, Some(f)));

    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// The KPI catalogue. Serialised names are the output column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Kpi {
    NrEstablishments,
    NrEstablishmentsPerThousandPop,
    TotalOccupancy,
    TotalNrRooms,
    TotalNrRoomsPerThousandPop,
    AvgOccupancy,
    TotalOccupancyPerThousandPop,
    #[strum(serialize = "share_1_rating")]
    Share1Rating,
    #[strum(serialize = "share_2_rating")]
    Share2Rating,
    #[strum(serialize = "share_3_rating")]
    Share3Rating,
    #[strum(serialize = "share_3s_rating")]
    Share3SRating,
    #[strum(serialize = "share_4_rating")]
    Share4Rating,
    #[strum(serialize = "share_4s_rating")]
    Share4SRating,
    #[strum(serialize = "share_5_rating")]
    Share5Rating,
    ShareStars,
    ShareSuns,
    ShareFlowers,
}

impl Kpi {
    /// Returns all variants of this enum, in dashboard order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::NrEstablishments,
            Self::NrEstablishmentsPerThousandPop,
            Self::TotalOccupancy,
            Self::TotalNrRooms,
            Self::TotalNrRoomsPerThousandPop,
            Self::AvgOccupancy,
            Self::TotalOccupancyPerThousandPop,
            Self::Share1Rating,
            Self::Share2Rating,
            Self::Share3Rating,
            Self::Share3SRating,
            Self::Share4Rating,
            Self::Share4SRating,
            Self::Share5Rating,
            Self::ShareStars,
            Self::ShareSuns,
            Self::ShareFlowers,
        ]
    }

    /// Display label shown in the dashboard.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NrEstablishments => "Number of Tourism Establishments",
            Self::NrEstablishmentsPerThousandPop => {
                "Number of Tourism Establishments per 1,000 Inhabitants"
            }
            Self::TotalOccupancy => "Total Occupancy",
            Self::TotalNrRooms => "Total Number of Rooms",
            Self::TotalNrRoomsPerThousandPop => "Number of Rooms per 1,000 Inhabitants",
            Self::AvgOccupancy => "Mean Occupancy of Tourism Establishments",
            Self::TotalOccupancyPerThousandPop => "Total Occupancy per 1,000 Inhabitants",
            Self::Share1Rating => "Share of Establishments with Rating 1",
            Self::Share2Rating => "Share of Establishments with Rating 2",
            Self::Share3Rating => "Share of Establishments with Rating 3",
            Self::Share3SRating => "Share of Establishments with Rating 3S",
            Self::Share4Rating => "Share of Establishments with Rating 4",
            Self::Share4SRating => "Share of Establishments with Rating 4S",
            Self::Share5Rating => "Share of Establishments with Rating 5",
            Self::ShareStars => "Share of Stars Establishments",
            Self::ShareSuns => "Share of Suns Establishments",
            Self::ShareFlowers => "Share of Flowers Establishments",
        }
    }

    #[must_use]
    pub const fn format(self) -> KpiFormat {
        match self {
            Self::NrEstablishments
            | Self::NrEstablishmentsPerThousandPop
            | Self::TotalOccupancy
            | Self::TotalNrRooms
            | Self::TotalNrRoomsPerThousandPop
            | Self::TotalOccupancyPerThousandPop => KpiFormat::Grouped,
            Self::AvgOccupancy => KpiFormat::OneDecimal,
            _ => KpiFormat::Percent,
        }
    }

    /// Looks up a KPI by its display label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::all().iter().copied().find(|kpi| kpi.label() == label)
    }

    /// Extracts this KPI's value from a row.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value(self, row: &MunicipalityKpiRow) -> f64 {
        match self {
            Self::NrEstablishments => row.nr_establishments as f64,
            Self::NrEstablishmentsPerThousandPop => row.nr_establishments_per_thousand_pop,
            Self::TotalOccupancy => row.total_occupancy as f64,
            Self::TotalNrRooms => row.total_nr_rooms as f64,
            Self::TotalNrRoomsPerThousandPop => row.total_nr_rooms_per_thousand_pop,
            Self::AvgOccupancy => row.avg_occupancy,
            Self::TotalOccupancyPerThousandPop => row.total_occupancy_per_thousand_pop,
            Self::Share1Rating => row.shares.rating(CategoryRating::One),
            Self::Share2Rating => row.shares.rating(CategoryRating::Two),
            Self::Share3Rating => row.shares.rating(CategoryRating::Three),
            Self::Share3SRating => row.shares.rating(CategoryRating::ThreeSuperior),
            Self::Share4Rating => row.shares.rating(CategoryRating::Four),
            Self::Share4SRating => row.shares.rating(CategoryRating::FourSuperior),
            Self::Share5Rating => row.shares.rating(CategoryRating::Five),
            Self::ShareStars => row.shares.kind(CategoryType::Stars),
            Self::ShareSuns => row.shares.kind(CategoryType::Suns),
            Self::ShareFlowers => row.shares.kind(CategoryType::Flowers),
        }
    }

    /// Formats this KPI's value from a row for display.
    #[must_use]
    pub fn display_value(self, row: &MunicipalityKpiRow) -> String {
        self.format().format(self.value(row))
    }
}
