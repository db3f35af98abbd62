//! Room and occupancy enrichment.

use std::collections::BTreeMap;

use tourism_map_establishment_models::{EstablishmentRecord, RoomInfo, normalize_id};

use crate::IngestError;

/// Left-joins room totals onto `records` by identifier.
///
/// Identifiers on both sides have `reduced_suffix` stripped first, so a
/// reduced API entry picks up the rooms of its full counterpart. The
/// normalised identifier replaces the original one on each record.
///
/// # Errors
///
/// Returns [`IngestError::RowCountMismatch`] if the room-info table holds
/// more than one row for a matched identifier.
pub fn merge_room_info(
    mut records: Vec<EstablishmentRecord>,
    rooms: &[RoomInfo],
    reduced_suffix: &str,
) -> Result<Vec<EstablishmentRecord>, IngestError> {
    let expected = records.len();

    let mut by_id: BTreeMap<&str, Vec<&RoomInfo>> = BTreeMap::new();
    for room in rooms {
        by_id
            .entry(normalize_id(&room.id, reduced_suffix))
            .or_default()
            .push(room);
    }

    for record in &mut records {
        let normalized = normalize_id(&record.id, reduced_suffix);
        if normalized.len() != record.id.len() {
            record.id = normalized.to_string();
        }
    }

    // A left join keeps unmatched rows once and repeats matched rows per hit.
    let actual: usize = records
        .iter()
        .map(|r| by_id.get(r.id.as_str()).map_or(1, Vec::len))
        .sum();
    if actual != expected {
        return Err(IngestError::RowCountMismatch {
            stage: "room info merge",
            expected,
            actual,
        });
    }

    let mut matched = 0usize;
    for record in &mut records {
        if let Some(room) = by_id.get(record.id.as_str()).and_then(|hits| hits.first()) {
            record.total_rooms = room.total_rooms;
            record.max_occupancy = room.max_occupancy;
            matched += 1;
        }
    }

    log::info!("Merged room info for {matched} of {expected} establishments");

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tourism_map_establishment_models::{ParsedEstablishment, REDUCED_ID_SUFFIX};

    fn record(id: &str) -> EstablishmentRecord {
        ParsedEstablishment {
            id: id.to_string(),
            name: None,
            city: None,
            category_code: None,
            room_entries: None,
            has_apartment: None,
            is_gastronomy: None,
            region: None,
            altitude: None,
            latitude: Some(46.5),
            longitude: Some(11.3),
            file: None,
        }
        .into_record()
        .unwrap()
    }

    fn room(id: &str, total_rooms: i64, max_occupancy: i64) -> RoomInfo {
        RoomInfo {
            id: id.to_string(),
            total_rooms: Some(total_rooms),
            max_occupancy: Some(max_occupancy),
        }
    }

    #[test]
    fn reduced_entries_reconcile_with_full_ids() {
        let records = merge_room_info(
            vec![record("ABC_REDUCED"), record("DEF"), record("GHI")],
            &[room("ABC", 10, 25), room("DEF", 4, 8)],
            REDUCED_ID_SUFFIX,
        )
        .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "ABC");
        assert_eq!(records[0].total_rooms, Some(10));
        assert_eq!(records[0].max_occupancy, Some(25));
        assert_eq!(records[1].total_rooms, Some(4));
        assert_eq!(records[2].total_rooms, None, "unmatched rows keep null rooms");
    }

    #[test]
    fn duplicate_room_keys_abort_the_merge() {
        let result = merge_room_info(
            vec![record("ABC"), record("DEF")],
            &[room("ABC", 10, 25), room("ABC_REDUCED", 9, 20)],
            REDUCED_ID_SUFFIX,
        );
        assert!(matches!(
            result,
            Err(IngestError::RowCountMismatch {
                expected: 2,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn duplicate_keys_without_matches_are_harmless() {
        let records = merge_room_info(
            vec![record("XYZ")],
            &[room("ABC", 10, 25), room("ABC", 9, 20)],
            REDUCED_ID_SUFFIX,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_rooms, None);
    }
}
