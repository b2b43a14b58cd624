use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    config::api_key_is_usable,
    error::{UpstreamError, truncate_body},
    model::{AirQuality, Coordinates, Weather},
};

use super::{ConditionsProvider, ServiceId};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_body(
        &self,
        path: &str,
        what: &'static str,
        at: Coordinates,
        extra: &[(&str, &str)],
    ) -> Result<String, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        let lat = at.lat.to_string();
        let lon = at.lon.to_string();

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .query(extra)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: ServiceId::OpenWeather,
                what,
                source,
            })?;

        let status = res.status();
        tracing::debug!(%status, what, "OpenWeather response");

        let body = res
            .text()
            .await
            .map_err(|source| UpstreamError::Transport {
                service: ServiceId::OpenWeather,
                what,
                source,
            })?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: ServiceId::OpenWeather,
                what,
                status,
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl ConditionsProvider for OpenWeatherProvider {
    fn is_configured(&self) -> bool {
        api_key_is_usable(&self.api_key)
    }

    async fn air_quality(&self, at: Coordinates) -> Result<AirQuality> {
        let body = self.get_body("/data/2.5/air_pollution", "air pollution", at, &[]).await?;
        Ok(parse_air_pollution(&body)?)
    }

    async fn current_weather(&self, at: Coordinates) -> Result<Weather> {
        let body = self
            .get_body("/data/2.5/weather", "current weather", at, &[("units", "metric")])
            .await?;
        Ok(parse_current_weather(&body)?)
    }
}

#[derive(Debug, Deserialize)]
struct OwAirMain {
    aqi: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct OwComponents {
    pm2_5: Option<f64>,
    pm10: Option<f64>,
    co: Option<f64>,
    no2: Option<f64>,
    o3: Option<f64>,
    so2: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwAirEntry {
    main: Option<OwAirMain>,
    #[serde(default)]
    components: OwComponents,
}

#[derive(Debug, Deserialize)]
struct OwAirResponse {
    #[serde(default)]
    list: Vec<OwAirEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    #[serde(default)]
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
}

pub(crate) fn parse_air_pollution(body: &str) -> Result<AirQuality, UpstreamError> {
    let what = "air pollution";
    let parsed: OwAirResponse = serde_json::from_str(body)
        .map_err(|source| UpstreamError::Decode { service: ServiceId::OpenWeather, what, source })?;

    let entry = parsed
        .list
        .into_iter()
        .next()
        .ok_or(UpstreamError::Empty { service: ServiceId::OpenWeather, what })?;

    let c = entry.components;
    Ok(AirQuality {
        index: entry.main.and_then(|m| m.aqi),
        pm2_5: c.pm2_5,
        pm10: c.pm10,
        co: c.co,
        no2: c.no2,
        o3: c.o3,
        so2: c.so2,
    })
}

pub(crate) fn parse_current_weather(body: &str) -> Result<Weather, UpstreamError> {
    let what = "current weather";
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|source| UpstreamError::Decode { service: ServiceId::OpenWeather, what, source })?;

    // A response without a condition entry is not a usable observation.
    let condition = parsed
        .weather
        .into_iter()
        .next()
        .ok_or(UpstreamError::Empty { service: ServiceId::OpenWeather, what })?;

    Ok(Weather {
        temperature_c: parsed.main.temp,
        feels_like_c: parsed.main.feels_like,
        description: condition.description,
        icon_code: condition.icon,
        humidity_pct: parsed.main.humidity,
        wind_speed_mps: parsed.wind.speed,
        location_name: parsed.name,
    })
}
