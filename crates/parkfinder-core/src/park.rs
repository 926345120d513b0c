//! Park entities and the search snapshot used to decide when to re-query.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// A park parsed from one places-search record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Park {
    /// Places id (`id`, or the legacy `place_id`).
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    /// Short, incomplete address returned by nearby search.
    pub vicinity: String,
    /// Distance from the reference location at parse time, in miles.
    pub distance_miles: f64,
    pub photo_reference: Option<String>,
}

/// Parameters of the park search that produced the current park set.
///
/// Replaced wholesale when the next search's results are applied; never
/// mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParkSearchInformation {
    pub center: Coordinate,
    pub search_radius_meters: u32,
    pub map_zoom: f32,
}

/// Whether a place reports itself open right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenStatus {
    Yes,
    No,
    #[default]
    Unknown,
}

impl OpenStatus {
    #[must_use]
    pub fn from_open_now(open_now: Option<bool>) -> Self {
        match open_now {
            Some(true) => OpenStatus::Yes,
            Some(false) => OpenStatus::No,
            None => OpenStatus::Unknown,
        }
    }
}

/// The kinds of detail a park details view can show, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InformationKind {
    Name,
    Open,
    Address,
    Phone,
    Website,
    Attributions,
}

/// Extended information about one park, resolved from its id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkDetails {
    pub place_id: String,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub phone_number: Option<String>,
    pub website: Option<String>,
    pub open_now: OpenStatus,
    pub attributions: Vec<String>,
    /// Carried over from the [`Park`] the details were looked up for.
    pub photo_reference: Option<String>,
}

impl ParkDetails {
    /// The information kinds that have something to show, in display order.
    #[must_use]
    pub fn information_kinds(&self) -> Vec<InformationKind> {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|s| !s.is_empty());

        let mut kinds = Vec::new();
        if present(&self.name) {
            kinds.push(InformationKind::Name);
        }
        if self.open_now != OpenStatus::Unknown {
            kinds.push(InformationKind::Open);
        }
        if present(&self.formatted_address) {
            kinds.push(InformationKind::Address);
        }
        if present(&self.phone_number) {
            kinds.push(InformationKind::Phone);
        }
        if present(&self.website) {
            kinds.push(InformationKind::Website);
        }
        if self.attributions.iter().any(|a| !a.is_empty()) {
            kinds.push(InformationKind::Attributions);
        }
        kinds
    }

    /// Phone number reduced to its decimal digits, for dialing.
    #[must_use]
    pub fn dial_digits(&self) -> Option<String> {
        let digits: String = self
            .phone_number
            .as_deref()?
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        if digits.is_empty() {
            None
        } else {
            Some(digits)
        }
    }
}
