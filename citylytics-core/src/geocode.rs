use std::sync::Arc;

use crate::{
    model::{CityTarget, Coordinates, Place},
    notice::Notifier,
    provider::Geocoder,
};

/// Lookup helpers on top of a [`Geocoder`]. Failures and empty results are
/// reported as warnings and surface as `None`, never as errors.
#[derive(Debug, Clone)]
pub struct GeocodingClient {
    geocoder: Arc<dyn Geocoder>,
    notifier: Notifier,
}

impl GeocodingClient {
    pub fn new(geocoder: Arc<dyn Geocoder>, notifier: Notifier) -> Self {
        Self { geocoder, notifier }
    }

    /// Best match for an address, or `None` with a warning naming the query.
    pub async fn lookup_address(&self, query: &str) -> Option<Place> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        match self.geocoder.search(query).await {
            Ok(places) => {
                let best = places.into_iter().next();
                if best.is_none() {
                    tracing::warn!(query, "No geocoding results");
                    self.notifier.warn(format!("Could not find location for \"{query}\"."));
                }
                best
            }
            Err(err) => {
                tracing::error!(query, error = %format!("{err:#}"), "Geocoding failed");
                self.notifier.warn(format!("Could not find location for \"{query}\"."));
                None
            }
        }
    }

    /// Resolve a city name into a [`CityTarget`] with a short display name.
    pub async fn lookup_city(&self, query: &str) -> Option<CityTarget> {
        let place = self.lookup_address(query).await?;
        let target = city_target_from_place(&place, query.trim());
        tracing::info!(city = %target.display_name, search = %target.search_name, "Resolved city");
        Some(target)
    }

    /// Human-readable name for a coordinate; falls back to the raw coordinates.
    pub async fn reverse_label(&self, at: Coordinates) -> String {
        match self.geocoder.reverse(at).await {
            Ok(place) => place.display_name,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "Reverse geocoding failed");
                self.notifier.warn("Could not determine address for current location.");
                at.to_string()
            }
        }
    }
}

pub fn city_target_from_place(place: &Place, query: &str) -> CityTarget {
    let address = place.address.as_ref();

    let display_name = address
        .and_then(|a| {
            a.city
                .clone()
                .or_else(|| a.town.clone())
                .or_else(|| a.village.clone())
                .or_else(|| a.state.clone())
        })
        .or_else(|| place.name.clone())
        .unwrap_or_else(|| query.to_string());

    let country = address
        .and_then(|a| a.country_code.as_deref())
        .map(str::to_uppercase)
        .unwrap_or_default();

    let search_name = if country.is_empty() {
        display_name.clone()
    } else {
        format!("{display_name}, {country}")
    };

    CityTarget { display_name, search_name, coordinates: place.coordinates }
}
