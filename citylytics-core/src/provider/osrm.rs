use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{UpstreamError, truncate_body},
    model::{Coordinates, RouteSummary},
};

use super::{RouteEngine, ServiceId};

/// Public OSRM demo server, the default backend of most web routing widgets.
pub const DEFAULT_BASE_URL: &str = "https://router.project-osrm.org";

#[derive(Debug, Clone)]
pub struct OsrmRouteEngine {
    base_url: String,
    http: Client,
}

impl OsrmRouteEngine {
    pub fn new(user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("Failed to build OSRM HTTP client")?;

        Ok(Self { base_url: DEFAULT_BASE_URL.to_string(), http })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl RouteEngine for OsrmRouteEngine {
    async fn route(&self, from: Coordinates, to: Coordinates) -> Result<RouteSummary> {
        let what = "route";
        // OSRM takes lon,lat pairs.
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.base_url, from.lon, from.lat, to.lon, to.lat
        );

        let res = self
            .http
            .get(&url)
            .query(&[("overview", "false")])
            .send()
            .await
            .map_err(|source| UpstreamError::Transport { service: ServiceId::Osrm, what, source })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| UpstreamError::Transport { service: ServiceId::Osrm, what, source })?;

        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: ServiceId::Osrm,
                what,
                status,
                body: truncate_body(&body),
            }
            .into());
        }

        Ok(parse_route(&body)?)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

pub(crate) fn parse_route(body: &str) -> Result<RouteSummary, UpstreamError> {
    let what = "route";
    let parsed: OsrmResponse = serde_json::from_str(body)
        .map_err(|source| UpstreamError::Decode { service: ServiceId::Osrm, what, source })?;

    if parsed.code != "Ok" {
        tracing::debug!(code = %parsed.code, "OSRM returned no route");
        return Err(UpstreamError::Empty { service: ServiceId::Osrm, what });
    }

    // First route is OSRM's preferred one; alternatives follow it.
    parsed
        .routes
        .first()
        .map(|r| RouteSummary { distance_m: r.distance, duration_s: r.duration })
        .ok_or(UpstreamError::Empty { service: ServiceId::Osrm, what })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_route() {
        let body = r#"{"code": "Ok", "routes": [
            {"distance": 18250.4, "duration": 1630.2, "legs": []},
            {"distance": 20000.0, "duration": 1500.0, "legs": []}
        ], "waypoints": []}"#;

        let summary = parse_route(body).expect("valid body");
        assert_eq!(summary.distance_m, 18250.4);
        assert_eq!(summary.duration_s, 1630.2);
    }

    #[test]
    fn no_route_code_is_empty_error() {
        let err = parse_route(r#"{"code": "NoRoute", "routes": []}"#).unwrap_err();
        assert!(matches!(err, UpstreamError::Empty { .. }));
    }
}
