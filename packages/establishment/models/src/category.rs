//! Accommodation category taxonomy.
//!
//! The tourism API encodes an establishment's classification as a single
//! compound code such as `"3sstars"` or `"2flowers"`: a rank prefix followed
//! by an award type. This module parses those codes into a fixed set of
//! [`CategoryRating`] and [`CategoryType`] variants so that every downstream
//! counter is known at compile time.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumCount, EnumString};

/// Category code used by the API for establishments without a classification.
pub const UNCATEGORIZED_CODE: &str = "Not categorized";

/// Maps singular award types from the API vocabulary to their canonical
/// plural form.
pub const CATEGORY_TYPE_PLURALS: &[(&str, &str)] =
    &[("flower", "flowers"), ("star", "stars"), ("sun", "suns")];

/// Rating tier of a classified establishment.
///
/// The `S` tiers ("superior") are encoded in the API with a two-character
/// rank prefix, e.g. `"4sstars"`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumCount,
)]
pub enum CategoryRating {
    #[serde(rename = "1")]
    #[strum(serialize = "1")]
    One,
    #[serde(rename = "2")]
    #[strum(serialize = "2")]
    Two,
    #[serde(rename = "3")]
    #[strum(serialize = "3")]
    Three,
    #[serde(rename = "3S")]
    #[strum(serialize = "3S")]
    ThreeSuperior,
    #[serde(rename = "4")]
    #[strum(serialize = "4")]
    Four,
    #[serde(rename = "4S")]
    #[strum(serialize = "4S")]
    FourSuperior,
    #[serde(rename = "5")]
    #[strum(serialize = "5")]
    Five,
}

impl CategoryRating {
    /// Returns all variants of this enum, in indicator column order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::One,
            Self::Two,
            Self::Three,
            Self::ThreeSuperior,
            Self::Four,
            Self::FourSuperior,
            Self::Five,
        ]
    }

    /// Position of this rating in [`Self::all()`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Parses a raw rank prefix such as `"4s"` or `"3"`.
    #[must_use]
    pub fn from_rank(rank: &str) -> Option<Self> {
        Self::from_str(&title_case(rank.trim())).ok()
    }
}

/// Award type of a classified establishment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumCount,
)]
pub enum CategoryType {
    /// Hotels and similar establishments.
    Stars,
    /// Campsites.
    Suns,
    /// Farm stays ("Roter Hahn").
    Flowers,
}

impl CategoryType {
    /// Returns all variants of this enum, in indicator column order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Stars, Self::Suns, Self::Flowers]
    }

    /// Position of this type in [`Self::all()`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Parses a raw API award type, accepting both the singular and the
    /// plural vocabulary (`"flower"`, `"flowers"`).
    #[must_use]
    pub fn from_api_type(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_ascii_lowercase();
        let plural = CATEGORY_TYPE_PLURALS
            .iter()
            .find(|(singular, _)| *singular == lower)
            .map_or(lower.as_str(), |(_, plural)| plural);

        Self::from_str(&title_case(plural)).ok()
    }
}

/// A decomposed accommodation category code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccommodationCategory {
    /// The establishment carries no classification.
    Uncategorized,
    /// A rating tier paired with its award type.
    Classified {
        /// Rating tier, e.g. `4S`.
        rating: CategoryRating,
        /// Award type, e.g. `Stars`.
        kind: CategoryType,
    },
}

impl AccommodationCategory {
    /// Returns the rating tier, if classified.
    #[must_use]
    pub const fn rating(self) -> Option<CategoryRating> {
        match self {
            Self::Uncategorized => None,
            Self::Classified { rating, .. } => Some(rating),
        }
    }

    /// Returns the award type, if classified.
    #[must_use]
    pub const fn kind(self) -> Option<CategoryType> {
        match self {
            Self::Uncategorized => None,
            Self::Classified { kind, .. } => Some(kind),
        }
    }

    /// Rebuilds a category from its two decomposed columns.
    ///
    /// Both halves are required for a classification; a lone rating or type
    /// is treated as uncategorised.
    #[must_use]
    pub const fn from_parts(rating: Option<CategoryRating>, kind: Option<CategoryType>) -> Self {
        match (rating, kind) {
            (Some(rating), Some(kind)) => Self::Classified { rating, kind },
            _ => Self::Uncategorized,
        }
    }

    /// One-hot indicators for this category.
    #[must_use]
    pub fn indicators(self) -> CategoryIndicators {
        let mut indicators = CategoryIndicators::default();
        if let Self::Classified { rating, kind } = self {
            indicators.ratings[rating.index()] = true;
            indicators.types[kind.index()] = true;
        }
        indicators
    }
}

impl FromStr for AccommodationCategory {
    type Err = CategoryParseError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let code = code.trim();
        if code == UNCATEGORIZED_CODE {
            return Ok(Self::Uncategorized);
        }

        // Superior tiers ("3s", "4s") are the only two-character ranks.
        let rank_len = if code.contains("ss") { 2 } else { 1 };
        let (Some(rank), Some(kind)) = (code.get(..rank_len), code.get(rank_len..)) else {
            return Err(CategoryParseError::Malformed {
                code: code.to_string(),
            });
        };
        if kind.is_empty() {
            return Err(CategoryParseError::Malformed {
                code: code.to_string(),
            });
        }

        let rating =
            CategoryRating::from_rank(rank).ok_or_else(|| CategoryParseError::UnknownRating {
                code: code.to_string(),
                rank: rank.to_string(),
            })?;
        let kind =
            CategoryType::from_api_type(kind).ok_or_else(|| CategoryParseError::UnknownType {
                code: code.to_string(),
                kind: kind.to_string(),
            })?;

        Ok(Self::Classified { rating, kind })
    }
}

/// Fixed one-hot indicator columns for a single establishment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryIndicators {
    /// One flag per [`CategoryRating::all()`] entry.
    pub ratings: [bool; <CategoryRating as strum::EnumCount>::COUNT],
    /// One flag per [`CategoryType::all()`] entry.
    pub types: [bool; <CategoryType as strum::EnumCount>::COUNT],
}

/// Error returned when a category code cannot be decomposed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryParseError {
    /// The code is too short to contain a rank and a type.
    #[error("malformed category code '{code}'")]
    Malformed {
        /// The offending code.
        code: String,
    },

    /// The rank prefix is not a known rating tier.
    #[error("unknown rating '{rank}' in category code '{code}'")]
    UnknownRating {
        /// The offending code.
        code: String,
        /// The extracted rank prefix.
        rank: String,
    },

    /// The type suffix is not a known award type.
    #[error("unknown type '{kind}' in category code '{code}'")]
    UnknownType {
        /// The offending code.
        code: String,
        /// The extracted type suffix.
        kind: String,
    },
}

/// Capitalises the first letter of every alphabetic run and lowercases the
/// rest, so `"4s"` becomes `"4S"` and `"stars"` becomes `"Stars"`.
#[must_use]
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(code: &str) -> AccommodationCategory {
        code.parse().unwrap()
    }

    #[test]
    fn superior_rank_uses_two_characters() {
        assert_eq!(
            parse("4sstars"),
            AccommodationCategory::Classified {
                rating: CategoryRating::FourSuperior,
                kind: CategoryType::Stars,
            }
        );
        assert_eq!(CategoryRating::FourSuperior.to_string(), "4S");
        assert_eq!(CategoryType::Stars.to_string(), "Stars");
    }

    #[test]
    fn plain_rank_uses_one_character() {
        assert_eq!(
            parse("3stars"),
            AccommodationCategory::Classified {
                rating: CategoryRating::Three,
                kind: CategoryType::Stars,
            }
        );
    }

    #[test]
    fn not_categorized_has_no_parts() {
        let category = parse("Not categorized");
        assert_eq!(category, AccommodationCategory::Uncategorized);
        assert_eq!(category.rating(), None);
        assert_eq!(category.kind(), None);
        assert_eq!(category.indicators(), CategoryIndicators::default());
    }

    #[test]
    fn singular_types_are_pluralised() {
        assert_eq!(parse("1flower").kind(), Some(CategoryType::Flowers));
        assert_eq!(parse("2flowers").kind(), Some(CategoryType::Flowers));
        assert_eq!(parse("1sun").kind(), Some(CategoryType::Suns));
        assert_eq!(parse("1star").kind(), Some(CategoryType::Stars));
        assert_eq!(parse("3ssuns").rating(), Some(CategoryRating::ThreeSuperior));
    }

    #[test]
    fn every_rating_and_type_combination_parses() {
        let ranks = ["1", "2", "3", "3s", "4", "4s", "5"];
        for (rank, expected) in ranks.iter().zip(CategoryRating::all()) {
            for kind in CategoryType::all() {
                let kind_code = kind.as_ref().to_ascii_lowercase();
                // Superior ranks are only detectable through the "ss" digraph.
                if rank.ends_with('s') && !kind_code.starts_with('s') {
                    continue;
                }
                let code = format!("{rank}{kind_code}");
                assert_eq!(
                    parse(&code),
                    AccommodationCategory::Classified {
                        rating: *expected,
                        kind: *kind,
                    },
                    "failed to parse {code}"
                );
            }
        }
    }

    #[test]
    fn rejects_unknown_codes() {
        assert!(matches!(
            "9stars".parse::<AccommodationCategory>(),
            Err(CategoryParseError::UnknownRating { .. })
        ));
        assert!(matches!(
            "3moons".parse::<AccommodationCategory>(),
            Err(CategoryParseError::UnknownType { .. })
        ));
        assert!(matches!(
            "3".parse::<AccommodationCategory>(),
            Err(CategoryParseError::Malformed { .. })
        ));
        assert!(matches!(
            "".parse::<AccommodationCategory>(),
            Err(CategoryParseError::Malformed { .. })
        ));
    }

    #[test]
    fn indicators_flag_exactly_one_rating_and_type() {
        let indicators = parse("4sstars").indicators();
        assert_eq!(indicators.ratings.iter().filter(|x| **x).count(), 1);
        assert_eq!(indicators.types.iter().filter(|x| **x).count(), 1);
        assert!(indicators.ratings[CategoryRating::FourSuperior.index()]);
        assert!(indicators.types[CategoryType::Stars.index()]);
    }

    #[test]
    fn index_matches_all_order() {
        for (i, rating) in CategoryRating::all().iter().enumerate() {
            assert_eq!(rating.index(), i);
        }
        for (i, kind) in CategoryType::all().iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn title_case_matches_python_semantics() {
        assert_eq!(title_case("4s"), "4S");
        assert_eq!(title_case("stars"), "Stars");
        assert_eq!(title_case("FLOWERS"), "Flowers");
    }
}
