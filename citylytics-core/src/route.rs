//! Route lookup between two places and a rough air-quality estimate for it.

use std::sync::Arc;
use thiserror::Error;

use crate::{
    geocode::GeocodingClient,
    model::{Coordinates, RouteSummary},
    provider::RouteEngine,
};

/// Routes longer than this get a small exposure bump.
pub const LONG_ROUTE_M: f64 = 15_000.0;
pub const MAX_ESTIMATED_AQI: u32 = 500;

#[derive(Debug, Clone, PartialEq)]
pub enum Waypoint {
    Address(String),
    Coordinates(Coordinates),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub from: Coordinates,
    pub to: Coordinates,
    pub summary: RouteSummary,
    pub estimated_aqi: Option<u32>,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Please enter both start and destination locations.")]
    MissingInput,
    #[error("Could not find location for start: \"{0}\"")]
    StartNotFound(String),
    #[error("Could not find location for destination: \"{0}\"")]
    DestinationNotFound(String),
    #[error("Could not find a route. Check addresses or connectivity.")]
    Engine(#[source] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct RoutePlanner {
    geocoding: GeocodingClient,
    engine: Arc<dyn RouteEngine>,
}

impl RoutePlanner {
    pub fn new(geocoding: GeocodingClient, engine: Arc<dyn RouteEngine>) -> Self {
        Self { geocoding, engine }
    }

    /// Resolve both ends, ask the engine for a route, and scale `city_aqi`
    /// into an along-route estimate.
    pub async fn plan(
        &self,
        start: &Waypoint,
        destination: &Waypoint,
        city_aqi: Option<u32>,
    ) -> Result<RoutePlan, RouteError> {
        let from = match start {
            Waypoint::Coordinates(c) => *c,
            Waypoint::Address(a) if a.trim().is_empty() => return Err(RouteError::MissingInput),
            Waypoint::Address(a) => self
                .geocoding
                .lookup_address(a)
                .await
                .map(|p| p.coordinates)
                .ok_or_else(|| RouteError::StartNotFound(a.trim().to_string()))?,
        };

        let to = match destination {
            Waypoint::Coordinates(c) => *c,
            Waypoint::Address(a) if a.trim().is_empty() => return Err(RouteError::MissingInput),
            Waypoint::Address(a) => self
                .geocoding
                .lookup_address(a)
                .await
                .map(|p| p.coordinates)
                .ok_or_else(|| RouteError::DestinationNotFound(a.trim().to_string()))?,
        };

        tracing::info!(?from, ?to, "Requesting route");
        let summary = self.engine.route(from, to).await.map_err(RouteError::Engine)?;

        Ok(RoutePlan { from, to, summary, estimated_aqi: estimate_route_aqi(&summary, city_aqi) })
    }
}

/// City-wide AQI used as a proxy for the route; long trips add 5%.
pub fn estimate_route_aqi(summary: &RouteSummary, city_aqi: Option<u32>) -> Option<u32> {
    let aqi = city_aqi?;
    if summary.distance_m > LONG_ROUTE_M {
        Some(((f64::from(aqi) * 1.05).round() as u32).min(MAX_ESTIMATED_AQI))
    } else {
        Some(aqi)
    }
}

/// `1h 05m` for trips of an hour or more, `12m 07s` otherwise.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "N/A".to_string();
    }

    let total = seconds.floor() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m {secs:02}s")
    }
}

pub fn format_distance_km(meters: f64) -> String {
    format!("{:.1} km", meters / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geocode::tests::{MockGeocoder, pune},
        notice::Notifier,
    };
    use anyhow::anyhow;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct FixedEngine(Option<RouteSummary>);

    #[async_trait]
    impl RouteEngine for FixedEngine {
        async fn route(
            &self,
            _from: Coordinates,
            _to: Coordinates,
        ) -> anyhow::Result<RouteSummary> {
            self.0.ok_or_else(|| anyhow!("no route"))
        }
    }

    fn planner(summary: Option<RouteSummary>) -> RoutePlanner {
        let geocoding = GeocodingClient::new(
            Arc::new(MockGeocoder { places: vec![pune()], fail: false }),
            Notifier::silent(),
        );
        RoutePlanner::new(geocoding, Arc::new(FixedEngine(summary)))
    }

    const LONG: RouteSummary = RouteSummary { distance_m: 18_000.0, duration_s: 1500.0 };

    #[test]
    fn estimate_keeps_short_routes_and_bumps_long_ones() {
        let short = RouteSummary { distance_m: 5_000.0, duration_s: 600.0 };
        assert_eq!(estimate_route_aqi(&short, Some(120)), Some(120));
        assert_eq!(estimate_route_aqi(&LONG, Some(120)), Some(126));
        assert_eq!(estimate_route_aqi(&LONG, Some(490)), Some(500));
        assert_eq!(estimate_route_aqi(&LONG, None), None);
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(3725.0), "1h 02m");
        assert_eq!(format_duration(727.9), "12m 07s");
        assert_eq!(format_duration(0.0), "0m 00s");
        assert_eq!(format_duration(-1.0), "N/A");
        assert_eq!(format_duration(f64::NAN), "N/A");
    }

    #[test]
    fn distance_formatting() {
        assert_eq!(format_distance_km(18_250.4), "18.3 km");
    }

    #[tokio::test]
    async fn plans_between_coordinates_and_address() {
        let planner = planner(Some(LONG));

        let plan = planner
            .plan(
                &Waypoint::Coordinates(Coordinates::new(18.6, 73.7)),
                &Waypoint::Address("Pune".into()),
                Some(100),
            )
            .await
            .expect("route");

        assert_eq!(plan.to, pune().coordinates);
        assert_eq!(plan.estimated_aqi, Some(105));
    }

    #[tokio::test]
    async fn unknown_start_is_reported() {
        let err = planner(Some(LONG))
            .plan(&Waypoint::Address("Atlantis".into()), &Waypoint::Address("Pune".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::StartNotFound(ref s) if s == "Atlantis"));
    }

    #[tokio::test]
    async fn unknown_destination_is_reported() {
        let err = planner(Some(LONG))
            .plan(&Waypoint::Address("Pune".into()), &Waypoint::Address("Atlantis".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::DestinationNotFound(_)));
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let err = planner(Some(LONG))
            .plan(&Waypoint::Address(" ".into()), &Waypoint::Address("Pune".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::MissingInput));
    }

    #[tokio::test]
    async fn engine_failure_is_wrapped() {
        let err = planner(None)
            .plan(&Waypoint::Address("Pune".into()), &Waypoint::Address("Pune".into()), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::Engine(_)));
    }
}
