use crate::{
    Config,
    model::{AirQuality, Coordinates, Place, RouteSummary, Weather},
    provider::{
        nominatim::NominatimGeocoder, openweather::OpenWeatherProvider, osrm::OsrmRouteEngine,
    },
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod nominatim;
pub mod openweather;
pub mod osrm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    OpenWeather,
    Nominatim,
    Osrm,
}

impl ServiceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::OpenWeather => "openweather",
            ServiceId::Nominatim => "nominatim",
            ServiceId::Osrm => "osrm",
        }
    }

    pub const fn all() -> &'static [ServiceId] {
        &[ServiceId::OpenWeather, ServiceId::Nominatim, ServiceId::Osrm]
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, ServiceId::OpenWeather)
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ServiceId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ServiceId::OpenWeather),
            "nominatim" => Ok(ServiceId::Nominatim),
            "osrm" => Ok(ServiceId::Osrm),
            _ => Err(anyhow::anyhow!(
                "Unknown service '{value}'. Supported services: openweather, nominatim, osrm."
            )),
        }
    }
}

/// Source of current air-quality and weather readings for a coordinate.
#[async_trait]
pub trait ConditionsProvider: Send + Sync + Debug {
    /// Whether the credential precondition holds. When false no request is made.
    fn is_configured(&self) -> bool;

    async fn air_quality(&self, at: Coordinates) -> anyhow::Result<AirQuality>;

    async fn current_weather(&self, at: Coordinates) -> anyhow::Result<Weather>;
}

/// Forward and reverse address lookup.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Best matches for a free-text query, best first. Empty when nothing matched.
    async fn search(&self, query: &str) -> anyhow::Result<Vec<Place>>;

    async fn reverse(&self, at: Coordinates) -> anyhow::Result<Place>;
}

#[async_trait]
pub trait RouteEngine: Send + Sync + Debug {
    async fn route(&self, from: Coordinates, to: Coordinates) -> anyhow::Result<RouteSummary>;
}

/// Build the OpenWeather provider. A missing key still yields a provider; it
/// reports `is_configured() == false` so callers skip the network.
pub fn conditions_provider_from_config(config: &Config) -> Arc<dyn ConditionsProvider> {
    let api_key = config.api_key(ServiceId::OpenWeather).unwrap_or_default();
    let mut provider = OpenWeatherProvider::new(api_key);
    if let Some(url) = config.base_url(ServiceId::OpenWeather) {
        provider = provider.with_base_url(url);
    }
    Arc::new(provider)
}

pub fn geocoder_from_config(config: &Config) -> anyhow::Result<Arc<dyn Geocoder>> {
    let mut geocoder = NominatimGeocoder::new(&config.user_agent)?;
    if let Some(url) = config.base_url(ServiceId::Nominatim) {
        geocoder = geocoder.with_base_url(url);
    }
    Ok(Arc::new(geocoder))
}

pub fn route_engine_from_config(config: &Config) -> anyhow::Result<Arc<dyn RouteEngine>> {
    let mut engine = OsrmRouteEngine::new(&config.user_agent)?;
    if let Some(url) = config.base_url(ServiceId::Osrm) {
        engine = engine.with_base_url(url);
    }
    Ok(Arc::new(engine))
}
