//! Category decomposition.
//!
//! Parses each establishment's compound category code and merges the
//! resulting rating and type back onto the table by identifier.

use std::collections::BTreeMap;

use tourism_map_establishment_models::{AccommodationCategory, EstablishmentRecord};

use crate::IngestError;

/// Classifies a single category code.
///
/// Missing codes and codes outside the known taxonomy are treated as
/// uncategorised; the latter are logged since they usually mean the API
/// vocabulary has grown.
#[must_use]
pub fn classify(code: Option<&str>) -> AccommodationCategory {
    let Some(code) = code else {
        return AccommodationCategory::Uncategorized;
    };
    match code.parse() {
        Ok(category) => category,
        Err(e) => {
            log::warn!("Treating establishment as uncategorised: {e}");
            AccommodationCategory::Uncategorized
        }
    }
}

/// Fills `category_rating` and `category_type` for every record.
///
/// The decomposed columns are keyed by establishment identifier, so a
/// duplicated identifier would fan out into extra rows on merge. That is
/// reported as [`IngestError::RowCountMismatch`] instead.
///
/// # Errors
///
/// Returns [`IngestError::RowCountMismatch`] if identifiers are not unique.
pub fn decompose_categories(
    mut records: Vec<EstablishmentRecord>,
) -> Result<Vec<EstablishmentRecord>, IngestError> {
    let expected = records.len();

    let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &records {
        *occurrences.entry(record.id.as_str()).or_default() += 1;
    }
    // Each row matches every indicator row sharing its identifier.
    let actual: usize = records
        .iter()
        .map(|r| occurrences.get(r.id.as_str()).copied().unwrap_or(0))
        .sum();
    if actual != expected {
        return Err(IngestError::RowCountMismatch {
            stage: "category decomposition",
            expected,
            actual,
        });
    }

    let mut uncategorized = 0usize;
    for record in &mut records {
        let category = classify(record.category_code.as_deref());
        if category == AccommodationCategory::Uncategorized {
            uncategorized += 1;
        }
        record.category_rating = category.rating();
        record.category_type = category.kind();
    }

    log::info!(
        "Decomposed categories for {expected} establishments ({uncategorized} uncategorised)"
    );

    Ok(records)
}
