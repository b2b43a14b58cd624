//! Fan-out to the conditions provider.

use std::sync::Arc;

use crate::{
    Config,
    aqi::to_display_aqi,
    model::{Coordinates, ExternalReadings},
    notice::Notifier,
    provider::{ConditionsProvider, conditions_provider_from_config},
};

/// Issues the air-quality and weather calls together and reports each half
/// separately. A failed half becomes `None` plus a transient warning; the
/// other half is unaffected.
#[derive(Debug, Clone)]
pub struct ExternalDataClient {
    provider: Arc<dyn ConditionsProvider>,
    notifier: Notifier,
}

impl ExternalDataClient {
    pub fn new(provider: Arc<dyn ConditionsProvider>, notifier: Notifier) -> Self {
        Self { provider, notifier }
    }

    pub fn from_config(config: &Config, notifier: Notifier) -> Self {
        Self::new(conditions_provider_from_config(config), notifier)
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// Message shown once at startup when the credential is missing.
    pub fn report_missing_credential(&self) {
        if !self.is_configured() {
            let msg = "OpenWeatherMap API key is missing or invalid. Real-time weather and AQI \
                       data will not load. Run `citylytics configure openweather`.";
            tracing::error!("{msg}");
            self.notifier.persistent_error(msg);
        }
    }

    pub async fn fetch(&self, at: Coordinates) -> ExternalReadings {
        if !self.provider.is_configured() {
            tracing::warn!("API key missing; skipping air quality and weather requests");
            return ExternalReadings::default();
        }

        tracing::debug!(lat = at.lat, lon = at.lon, "Fetching air quality and weather");

        let (air, weather) =
            tokio::join!(self.provider.air_quality(at), self.provider.current_weather(at));

        let air_quality = match air {
            Ok(aq) => Some(aq),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "Air quality fetch failed");
                self.notifier.warn("Could not fetch Air Quality data. Check API key or network.");
                None
            }
        };

        let weather = match weather {
            Ok(w) => Some(w),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "Weather fetch failed");
                self.notifier.warn("Could not fetch Weather data. Check API key or network.");
                None
            }
        };

        let readings = ExternalReadings { air_quality, weather };
        if readings.is_empty() {
            tracing::error!("Total failure fetching air quality and weather data");
        }
        readings
    }

    /// Air-quality call alone, projected onto the 0..500 display scale. Used
    /// where only a city-wide AQI is needed, such as route estimates.
    pub async fn current_display_aqi(&self, at: Coordinates) -> Option<u32> {
        if !self.provider.is_configured() {
            return None;
        }

        match self.provider.air_quality(at).await {
            Ok(aq) => to_display_aqi(aq.index, &mut rand::thread_rng()),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "Air quality fetch failed");
                self.notifier.warn("Could not fetch Air Quality data. Check API key or network.");
                None
            }
        }
    }
}
