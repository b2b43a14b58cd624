use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lat: {:.4}, Lon: {:.4}", self.lat, self.lon)
    }
}

/// The place the dashboard is currently showing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityTarget {
    /// Short name shown to the user, e.g. "Chennai".
    pub display_name: String,
    /// Name used for provider searches, e.g. "Chennai, IN".
    pub search_name: String,
    pub coordinates: Coordinates,
}

impl CityTarget {
    pub fn new(
        display_name: impl Into<String>,
        search_name: impl Into<String>,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            search_name: search_name.into(),
            coordinates,
        }
    }
}

impl Default for CityTarget {
    fn default() -> Self {
        Self::new("Chennai", "Chennai, IN", Coordinates::new(13.0827, 80.2707))
    }
}

/// Normalized air-pollution reading. Every field is independently optional
/// because the provider omits components it has no measurement for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    /// Provider's coarse 1..=5 index.
    pub index: Option<u8>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub co: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub description: Option<String>,
    pub icon_code: Option<String>,
    pub humidity_pct: Option<u8>,
    pub wind_speed_mps: Option<f64>,
    /// Location name as reported by the provider; may differ from the query.
    pub location_name: Option<String>,
}

/// Result of one fan-out to the conditions provider. Either half may be
/// missing independently of the other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalReadings {
    pub air_quality: Option<AirQuality>,
    pub weather: Option<Weather>,
}

impl ExternalReadings {
    pub fn is_empty(&self) -> bool {
        self.air_quality.is_none() && self.weather.is_none()
    }
}

/// Locally generated metrics that have no free upstream source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticBlock {
    pub energy_today_kwh: u32,
    pub total_vehicles: u32,
    pub renewable_percent: f64,
    pub energy_by_district: BTreeMap<String, u32>,
    /// Day-over-day change, in whole percent.
    pub vehicle_change_percent: i32,
    pub energy_change_percent: i32,
}

impl SyntheticBlock {
    pub fn district_total_kwh(&self) -> u32 {
        self.energy_by_district.values().sum()
    }

    /// Share of generation that is not renewable.
    pub fn fossil_percent(&self) -> f64 {
        (100.0 - self.renewable_percent).max(0.0)
    }
}

/// One merged refresh-cycle result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub city: String,
    /// Provider index projected onto the 0..500 display scale.
    pub display_aqi: Option<u32>,
    pub air_quality: Option<AirQuality>,
    pub weather: Option<Weather>,
    pub synthetic: SyntheticBlock,
}

impl Snapshot {
    /// Minute-resolution bucket label, local time.
    pub fn time_label(&self) -> String {
        self.captured_at.with_timezone(&Local).format("%H:%M").to_string()
    }

    pub fn pm2_5(&self) -> Option<f64> {
        self.air_quality.as_ref().and_then(|aq| aq.pm2_5)
    }

    pub fn co(&self) -> Option<f64> {
        self.air_quality.as_ref().and_then(|aq| aq.co)
    }

    pub fn temperature_c(&self) -> Option<f64> {
        self.weather.as_ref().and_then(|w| w.temperature_c)
    }

    pub fn weather_description(&self) -> Option<&str> {
        self.weather.as_ref().and_then(|w| w.description.as_deref())
    }

    pub fn weather_icon(&self) -> Option<&str> {
        self.weather.as_ref().and_then(|w| w.icon_code.as_deref())
    }
}

/// A geocoder match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub display_name: String,
    pub name: Option<String>,
    pub coordinates: Coordinates,
    pub address: Option<PlaceAddress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub state: Option<String>,
    pub country_code: Option<String>,
}

/// Distance/time summary returned by a routing engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_m: f64,
    pub duration_s: f64,
}
