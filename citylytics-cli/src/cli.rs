use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use citylytics_core::{
    CityTarget, Config, CycleOutcome, ExternalDataClient, GeocodingClient, Notifier,
    OrchestratorSettings, RefreshOrchestrator, RoutePlanner, ServiceId, Waypoint,
    aqi::AqiCategory,
    model::Coordinates,
    provider::{geocoder_from_config, route_engine_from_config},
    route::{RouteError, format_distance_km, format_duration},
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::console::{ConsoleSink, flush_notices, print_notices};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citylytics", version, about = "City air quality, weather and energy dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials or endpoints for a service.
    Configure {
        /// Service short name: "openweather", "nominatim" or "osrm".
        service: String,
    },

    /// Run one refresh cycle for a city and print it.
    Show {
        /// City name; defaults to the configured city.
        city: Option<String>,
    },

    /// Keep refreshing until Ctrl-C. Type a city name and press Enter to switch.
    Watch {
        city: Option<String>,

        /// Refresh interval in seconds, overriding the config file.
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Look up coordinates for an address.
    Geocode { address: String },

    /// Look up the address for coordinates.
    Reverse {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },

    /// Find a route and estimate air quality along it.
    Route { from: String, to: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Configure { service } => configure(&mut config, &service),
            Command::Show { city } => {
                let target = resolve_city(&config, city.as_deref()).await?;
                let (notifier, mut rx) = Notifier::channel();
                let app = App::new(&config, target, notifier)?;
                app.orchestrator.start().await;
                app.orchestrator.shutdown();
                flush_notices(&mut rx);
                Ok(())
            }
            Command::Watch { city, interval } => {
                if let Some(secs) = interval {
                    config.refresh_interval_secs = secs;
                }
                watch(&config, city.as_deref()).await
            }
            Command::Geocode { address } => {
                let (notifier, rx) = Notifier::channel();
                tokio::spawn(print_notices(rx));
                let geocoding = GeocodingClient::new(geocoder_from_config(&config)?, notifier);
                match geocoding.lookup_address(&address).await {
                    Some(place) => {
                        println!("{}", place.display_name);
                        println!("{}", place.coordinates);
                        Ok(())
                    }
                    None => bail!("No location found for \"{address}\""),
                }
            }
            Command::Reverse { lat, lon } => {
                let geocoding =
                    GeocodingClient::new(geocoder_from_config(&config)?, Notifier::silent());
                println!("{}", geocoding.reverse_label(Coordinates::new(lat, lon)).await);
                Ok(())
            }
            Command::Route { from, to } => route(&config, from, to).await,
        }
    }
}

/// Everything a refresh needs, wired from config.
struct App {
    orchestrator: RefreshOrchestrator,
}

impl App {
    fn new(config: &Config, city: Option<CityTarget>, notifier: Notifier) -> anyhow::Result<Self> {
        let client = ExternalDataClient::from_config(config, notifier.clone());
        let geocoding = GeocodingClient::new(geocoder_from_config(config)?, notifier.clone());

        let mut builder = RefreshOrchestrator::builder(client, Arc::new(ConsoleSink))
            .settings(OrchestratorSettings::from(config))
            .geocoding(geocoding)
            .notifier(notifier);
        if let Some(city) = city {
            builder = builder.city(city);
        }

        Ok(Self { orchestrator: builder.build() })
    }
}

/// Geocode the requested city, or the configured default. `None` keeps the
/// built-in default city.
async fn resolve_city(
    config: &Config,
    requested: Option<&str>,
) -> anyhow::Result<Option<CityTarget>> {
    let Some(name) = requested.or(config.default_city.as_deref()) else {
        return Ok(None);
    };

    let geocoding = GeocodingClient::new(geocoder_from_config(config)?, Notifier::silent());
    let city = geocoding
        .lookup_city(name)
        .await
        .with_context(|| format!("Could not find city: \"{name}\""))?;
    Ok(Some(city))
}

async fn watch(config: &Config, city: Option<&str>) -> anyhow::Result<()> {
    let target = resolve_city(config, city).await?;
    let (notifier, rx) = Notifier::channel();
    tokio::spawn(print_notices(rx));
    let app = App::new(config, target, notifier)?;
    app.orchestrator.start().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
            line = lines.next_line() => {
                match line.context("Failed to read from stdin")? {
                    Some(input) if !input.trim().is_empty() => {
                        let outcome = app.orchestrator.change_city_by_name(&input).await;
                        if outcome == Some(CycleOutcome::Skipped) {
                            eprintln!(
                                "A refresh is already running; \
                                 the new city loads on the next cycle."
                            );
                        }
                    }
                    Some(_) => {}
                    // stdin closed; keep refreshing on the timer until Ctrl-C.
                    None => {
                        tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
                        break;
                    }
                }
            }
        }
    }

    app.orchestrator.shutdown();
    Ok(())
}

async fn route(config: &Config, from: String, to: String) -> anyhow::Result<()> {
    if from.trim().is_empty() || to.trim().is_empty() {
        return Err(RouteError::MissingInput.into());
    }

    let (notifier, mut rx) = Notifier::channel();
    let geocoding = GeocodingClient::new(geocoder_from_config(config)?, notifier.clone());
    let planner = RoutePlanner::new(geocoding.clone(), route_engine_from_config(config)?);
    let client = ExternalDataClient::from_config(config, notifier);

    // The start lookup serves both the city-wide AQI and the route itself.
    let Some(start) = geocoding.lookup_city(&from).await else {
        flush_notices(&mut rx);
        return Err(RouteError::StartNotFound(from.trim().to_string()).into());
    };
    let city_aqi = client.current_display_aqi(start.coordinates).await;

    let planned = planner
        .plan(&Waypoint::Coordinates(start.coordinates), &Waypoint::Address(to), city_aqi)
        .await;
    flush_notices(&mut rx);
    let plan = planned?;

    println!("From: {}", start.display_name);
    println!(
        "Distance: {}, Time: {}",
        format_distance_km(plan.summary.distance_m),
        format_duration(plan.summary.duration_s)
    );
    println!(
        "Est. Avg AQI along route: {} ({})",
        plan.estimated_aqi.map_or_else(|| "N/A".to_string(), |v| v.to_string()),
        AqiCategory::from_value(plan.estimated_aqi)
    );
    Ok(())
}

fn configure(config: &mut Config, service: &str) -> anyhow::Result<()> {
    let id = ServiceId::try_from(service)?;

    match id {
        ServiceId::OpenWeather => {
            let key = inquire::Password::new("OpenWeatherMap API key:")
                .without_confirmation()
                .prompt()
                .context("Failed to read API key")?;
            if !citylytics_core::config::api_key_is_usable(&key) {
                bail!("The API key must not be empty.");
            }
            config.upsert_api_key(id, key.trim().to_string());
        }
        ServiceId::Nominatim => {
            let agent = inquire::Text::new("User-Agent for geocoding requests:")
                .with_default(&config.user_agent)
                .with_help_message(
                    "Nominatim asks for an identifying client, \
                     e.g. `MyDashboard/1.0 (me@example.com)`",
                )
                .prompt()
                .context("Failed to read user agent")?;
            config.user_agent = agent;
        }
        ServiceId::Osrm => {
            let url = inquire::Text::new("OSRM base URL:")
                .with_default(citylytics_core::provider::osrm::DEFAULT_BASE_URL)
                .prompt()
                .context("Failed to read base URL")?;
            config.services.entry(id.as_str().to_string()).or_default().base_url = Some(url);
        }
    }

    let interval = inquire::CustomType::<u64>::new("Refresh interval (seconds):")
        .with_default(config.refresh_interval_secs)
        .prompt()
        .context("Failed to read refresh interval")?;
    config.refresh_interval_secs = interval.max(1);

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
