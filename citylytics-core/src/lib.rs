//! Core library for the CityLytics dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Clients for the air-quality/weather, geocoding and routing services
//! - Synthetic city metrics and the rolling pollution series
//! - The refresh orchestrator that ties them together
//!
//! It is used by `citylytics-cli`, but rendering is left to whichever
//! [`PresentationSink`] the caller supplies.

pub mod aqi;
pub mod client;
pub mod config;
pub mod error;
pub mod geocode;
pub mod model;
pub mod notice;
pub mod orchestrator;
pub mod provider;
pub mod route;
pub mod series;
pub mod sink;
pub mod synthetic;

pub use aqi::AqiCategory;
pub use client::ExternalDataClient;
pub use config::{Config, ServiceConfig};
pub use error::UpstreamError;
pub use geocode::GeocodingClient;
pub use model::{
    AirQuality, CityTarget, Coordinates, ExternalReadings, Place, RouteSummary, Snapshot,
    SyntheticBlock, Weather,
};
pub use notice::{Notice, NoticeLevel, Notifier};
pub use orchestrator::{
    CycleOutcome, CycleState, OrchestratorSettings, RefreshOrchestrator, Trigger,
};
pub use provider::{ConditionsProvider, Geocoder, RouteEngine, ServiceId};
pub use route::{RoutePlan, RoutePlanner, Waypoint};
pub use series::RollingSeries;
pub use sink::PresentationSink;
pub use synthetic::SyntheticMetricsGenerator;
