//! CSV readers and writers for the establishment tables.

use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use tourism_map_establishment_models::{EstablishmentRecord, ParsedEstablishment, RoomInfo};

use crate::IngestError;

/// Reads the parsed establishment table.
///
/// # Errors
///
/// Returns [`IngestError::Csv`] if the file cannot be opened or any row is
/// malformed.
pub fn load_parsed_establishments(path: &Path) -> Result<Vec<ParsedEstablishment>, IngestError> {
    let rows = read_csv_file(path)?;
    log::info!(
        "Loaded {} parsed establishments from {}",
        rows.len(),
        path.display()
    );
    Ok(rows)
}

/// Reads the room-info table.
///
/// # Errors
///
/// Returns [`IngestError::Csv`] if the file cannot be opened or any row is
/// malformed.
pub fn load_room_info(path: &Path) -> Result<Vec<RoomInfo>, IngestError> {
    let rows = read_csv_file(path)?;
    log::info!("Loaded {} room-info rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Reads a prepared establishment table written by
/// [`write_prepared_establishments`].
///
/// # Errors
///
/// Returns [`IngestError::Csv`] if the file cannot be opened or any row is
/// malformed.
pub fn load_prepared_establishments(path: &Path) -> Result<Vec<EstablishmentRecord>, IngestError> {
    let rows = read_csv_file(path)?;
    log::info!(
        "Loaded {} prepared establishments from {}",
        rows.len(),
        path.display()
    );
    Ok(rows)
}

/// Writes the prepared establishment table, creating the parent directory
/// if needed.
///
/// # Errors
///
/// Returns [`IngestError`] if the directory or file cannot be written.
pub fn write_prepared_establishments(
    path: &Path,
    records: &[EstablishmentRecord],
) -> Result<(), IngestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| IngestError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let csv_error = |source| IngestError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for record in records {
        writer.serialize(record).map_err(csv_error)?;
    }
    writer.flush().map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;

    log::info!(
        "Wrote {} prepared establishments to {}",
        records.len(),
        path.display()
    );
    Ok(())
}

fn read_csv_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, IngestError> {
    let file = std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    read_csv(file, &path.display().to_string())
}

/// Deserializes every row of a headed CSV stream. `label` names the source
/// in error messages.
///
/// # Errors
///
/// Returns [`IngestError::Csv`] on the first malformed row.
pub fn read_csv<T: DeserializeOwned>(reader: impl Read, label: &str) -> Result<Vec<T>, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new().from_reader(reader);
    csv_reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| IngestError::Csv {
            path: label.to_string(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use tourism_map_establishment_models::{CategoryRating, CategoryType};

    fn sample_record() -> EstablishmentRecord {
        EstablishmentRecord {
            id: "ABC".to_string(),
            name: Some("Hotel Post".to_string()),
            city: Some("Bozen".to_string()),
            category_code: Some("4sstars".to_string()),
            category_rating: Some(CategoryRating::FourSuperior),
            category_type: Some(CategoryType::Stars),
            region: None,
            altitude: Some(262.0),
            latitude: 46.4983,
            longitude: 11.3548,
            has_apartment: Some(false),
            is_gastronomy: None,
            name_de: Some("Bozen".to_string()),
            name_it: Some("Bolzano".to_string()),
            total_rooms: Some(40),
            max_occupancy: None,
        }
    }

    #[test]
    fn prepared_table_survives_a_write_and_read() {
        let dir = std::env::temp_dir().join(format!("tourism_map_ingest_{}", std::process::id()));
        let path = dir.join("prepared.csv");
        let records = vec![sample_record()];

        write_prepared_establishments(&path, &records).unwrap();
        let loaded = load_prepared_establishments(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(loaded, records);
    }

    #[test]
    fn reads_room_info_with_float_counts() {
        let data = "Id,TotalRooms,MaxOccupancy\nABC,12.0,30\nDEF,,\n";
        let rooms: Vec<RoomInfo> = read_csv(data.as_bytes(), "rooms").unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].total_rooms, Some(12));
        assert_eq!(rooms[0].max_occupancy, Some(30));
        assert_eq!(rooms[1].total_rooms, None);
    }

    #[test]
    fn malformed_row_is_an_error() {
        let data = "Id,Latitude,Longitude\nABC,46.5\n";
        let result: Result<Vec<EstablishmentRecord>, _> = read_csv(data.as_bytes(), "bad.csv");
        assert!(matches!(result, Err(IngestError::Csv { path, .. }) if path == "bad.csv"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_room_info(Path::new("/nonexistent/tourism_map/rooms.csv"));
        assert!(matches!(result, Err(IngestError::Io { .. })));
    }
}
