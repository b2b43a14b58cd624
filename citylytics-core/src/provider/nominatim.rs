use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};

use crate::{
    error::{UpstreamError, truncate_body},
    model::{Coordinates, Place, PlaceAddress},
};

use super::{Geocoder, ServiceId};

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// OpenStreetMap Nominatim client. Nominatim's usage policy requires an
/// identifying `User-Agent` and at most one request per second; clones share
/// the same request spacing.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    http: Client,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl NominatimGeocoder {
    pub fn new(user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build Nominatim HTTP client")?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
            last_request: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Waits out the rest of `MIN_REQUEST_INTERVAL` since the previous request.
    /// The lock is held while sleeping so concurrent callers queue up.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + MIN_REQUEST_INTERVAL;
            if Instant::now() < ready_at {
                tracing::debug!("Spacing out Nominatim requests");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_body(
        &self,
        path: &str,
        what: &'static str,
        query: &[(&str, &str)],
    ) -> Result<String, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        self.throttle().await;

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("format", "json"), ("addressdetails", "1")])
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: ServiceId::Nominatim,
                what,
                source,
            })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: ServiceId::Nominatim,
                what,
                source,
            })?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: ServiceId::Nominatim,
                what,
                status,
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str) -> Result<Vec<Place>> {
        tracing::debug!(query, "Nominatim search");
        let body = self.get_body("/search", "search", &[("q", query), ("limit", "1")]).await?;
        Ok(parse_search(&body)?)
    }

    async fn reverse(&self, at: Coordinates) -> Result<Place> {
        let lat = format!("{:.6}", at.lat);
        let lon = format!("{:.6}", at.lon);
        tracing::debug!(%lat, %lon, "Nominatim reverse lookup");
        let body = self
            .get_body("/reverse", "reverse", &[("lat", lat.as_str()), ("lon", lon.as_str())])
            .await?;
        Ok(parse_reverse(&body)?)
    }
}

#[derive(Debug, Deserialize)]
struct NmPlace {
    lat: String,
    lon: String,
    display_name: String,
    name: Option<String>,
    address: Option<NmAddress>,
}

#[derive(Debug, Deserialize)]
struct NmAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NmReverse {
    Found(NmPlace),
    Failed { error: String },
}

impl NmPlace {
    fn into_place(self) -> Option<Place> {
        let lat = self.lat.trim().parse().ok()?;
        let lon = self.lon.trim().parse().ok()?;

        Some(Place {
            display_name: self.display_name,
            name: self.name.filter(|n| !n.is_empty()),
            coordinates: Coordinates::new(lat, lon),
            address: self.address.map(|a| PlaceAddress {
                city: a.city,
                town: a.town,
                village: a.village,
                state: a.state,
                country_code: a.country_code,
            }),
        })
    }
}

pub(crate) fn parse_search(body: &str) -> Result<Vec<Place>, UpstreamError> {
    let parsed: Vec<NmPlace> = serde_json::from_str(body).map_err(|source| UpstreamError::Decode {
        service: ServiceId::Nominatim,
        what: "search",
        source,
    })?;

    // Entries with unparseable coordinates are useless for routing or weather.
    Ok(parsed.into_iter().filter_map(NmPlace::into_place).collect())
}

pub(crate) fn parse_reverse(body: &str) -> Result<Place, UpstreamError> {
    let what = "reverse";
    let parsed: NmReverse = serde_json::from_str(body)
        .map_err(|source| UpstreamError::Decode { service: ServiceId::Nominatim, what, source })?;

    match parsed {
        NmReverse::Found(place) => place
            .into_place()
            .ok_or(UpstreamError::Empty { service: ServiceId::Nominatim, what }),
        NmReverse::Failed { error } => {
            tracing::debug!(%error, "Nominatim reverse lookup found nothing");
            Err(UpstreamError::Empty { service: ServiceId::Nominatim, what })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn requests_are_spaced_one_second_apart() {
        let geocoder = NominatimGeocoder::new("CityLyticsTest/1.0").expect("client");
        let shared = geocoder.clone();
        let started = Instant::now();

        geocoder.throttle().await;
        assert_eq!(started.elapsed(), Duration::ZERO);

        shared.throttle().await;
        assert!(started.elapsed() >= MIN_REQUEST_INTERVAL);

        tokio::time::sleep(Duration::from_secs(5)).await;
        let idle = Instant::now();
        geocoder.throttle().await;
        assert_eq!(idle.elapsed(), Duration::ZERO);
    }

    const SEARCH_BODY: &str = r#"[{
        "place_id": 1,
        "lat": "13.0836939",
        "lon": "80.270186",
        "name": "Chennai",
        "display_name": "Chennai, Chennai District, Tamil Nadu, 600001, India",
        "address": {
            "city": "Chennai",
            "state": "Tamil Nadu",
            "country": "India",
            "country_code": "in"
        }
    }]"#;

    #[test]
    fn parses_search_result() {
        let places = parse_search(SEARCH_BODY).expect("valid body");
        assert_eq!(places.len(), 1);

        let place = &places[0];
        assert_eq!(place.name.as_deref(), Some("Chennai"));
        assert!((place.coordinates.lat - 13.0836939).abs() < 1e-9);
        let address = place.address.as_ref().expect("address details");
        assert_eq!(address.city.as_deref(), Some("Chennai"));
        assert_eq!(address.country_code.as_deref(), Some("in"));
    }

    #[test]
    fn empty_search_is_not_an_error() {
        assert!(parse_search("[]").expect("valid body").is_empty());
    }

    #[test]
    fn search_skips_unparseable_coordinates() {
        let body = r#"[{"lat": "north", "lon": "1.0", "display_name": "Nowhere"}]"#;
        assert!(parse_search(body).expect("valid body").is_empty());
    }

    #[test]
    fn parses_reverse_result() {
        let body = r#"{"lat": "51.5007", "lon": "-0.1246", "display_name": "Westminster, London"}"#;
        let place = parse_reverse(body).expect("valid body");
        assert_eq!(place.display_name, "Westminster, London");
        assert!(place.address.is_none());
    }

    #[test]
    fn reverse_error_payload_is_empty_error() {
        let err = parse_reverse(r#"{"error": "Unable to geocode"}"#).unwrap_err();
        assert!(matches!(err, UpstreamError::Empty { .. }));
    }
}
