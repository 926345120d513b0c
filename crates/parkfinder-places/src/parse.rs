//! Conversion of raw nearby-search records into [`Park`] values.
//!
//! A record missing any required field is skipped; one bad record never
//! fails the batch.

use parkfinder_core::{meters_to_miles, Coordinate, Location, Park};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParkParseError {
    #[error("park record is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Parses one search record, computing its distance from `reference`.
///
/// Required: `id` (or legacy `place_id`), `name`, `geometry.location.lat`,
/// `geometry.location.lng`, `vicinity`. Optional: `photos[0].photo_reference`.
///
/// # Errors
///
/// Returns [`ParkParseError::MissingField`] naming the first required field
/// that is absent or has the wrong JSON type.
pub fn parse_park(record: &Value, reference: &Location) -> Result<Park, ParkParseError> {
    let id = str_field(record, "id")
        .or_else(|| str_field(record, "place_id"))
        .ok_or(ParkParseError::MissingField("id"))?;
    let name = str_field(record, "name").ok_or(ParkParseError::MissingField("name"))?;

    let location = record.get("geometry").and_then(|g| g.get("location"));
    let lat = location
        .and_then(|l| l.get("lat"))
        .and_then(Value::as_f64)
        .ok_or(ParkParseError::MissingField("geometry.location.lat"))?;
    let lng = location
        .and_then(|l| l.get("lng"))
        .and_then(Value::as_f64)
        .ok_or(ParkParseError::MissingField("geometry.location.lng"))?;

    let vicinity = str_field(record, "vicinity").ok_or(ParkParseError::MissingField("vicinity"))?;

    let photo_reference = record
        .get("photos")
        .and_then(Value::as_array)
        .and_then(|photos| photos.first())
        .and_then(|photo| str_field(photo, "photo_reference"));

    let coordinate = Coordinate::new(lat, lng);
    let distance_miles = meters_to_miles(coordinate.distance_to(&reference.coordinate));

    Ok(Park {
        id,
        name,
        coordinate,
        vicinity,
        distance_miles,
        photo_reference,
    })
}

/// Parses a batch of search records, dropping the malformed ones.
#[must_use]
pub fn parse_parks(records: &[Value], reference: &Location) -> Vec<Park> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match parse_park(record, reference) {
            Ok(park) => Some(park),
            Err(e) => {
                tracing::debug!(index, error = %e, "skipping malformed park record");
                None
            }
        })
        .collect()
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
