//! The park-search seam used by the map session.

use std::future::Future;

use parkfinder_core::{Location, Park, ParkSearchInformation};

use crate::client::PlacesClient;
use crate::error::PlacesError;
use crate::parse::parse_parks;

/// Something that can find parks around a search center.
///
/// Implemented by [`PlacesClient`]; tests substitute in-memory fakes.
pub trait NearbySearch: Send + Sync {
    /// Finds parks within `info.search_radius_meters` of `info.center`, with
    /// distances measured from `reference`.
    fn search_parks(
        &self,
        info: ParkSearchInformation,
        reference: Location,
    ) -> impl Future<Output = Result<Vec<Park>, PlacesError>> + Send;
}

impl NearbySearch for PlacesClient {
    async fn search_parks(
        &self,
        info: ParkSearchInformation,
        reference: Location,
    ) -> Result<Vec<Park>, PlacesError> {
        let records = self
            .search_nearby(info.center, info.search_radius_meters)
            .await?;
        let parks = parse_parks(&records, &reference);
        tracing::info!(
            center = %info.center,
            radius_meters = info.search_radius_meters,
            records = records.len(),
            parks = parks.len(),
            "park search complete"
        );
        Ok(parks)
    }
}
