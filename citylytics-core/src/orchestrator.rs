//! The periodic fetch → merge → publish → reschedule loop.

use anyhow::anyhow;
use chrono::Utc;
use rand::{SeedableRng, rngs::StdRng};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::task::JoinHandle;

use crate::{
    Config,
    aqi::to_display_aqi,
    client::ExternalDataClient,
    geocode::GeocodingClient,
    model::{CityTarget, ExternalReadings, Snapshot},
    notice::Notifier,
    series::{AppendOutcome, CHANNEL_CO, CHANNEL_PM2_5, RollingSeries},
    sink::PresentationSink,
    synthetic::SyntheticMetricsGenerator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Fetching,
    Merging,
    Publishing,
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    Timer,
    /// User-initiated, e.g. a city change.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Published,
    /// Publishing failed and the sink was cleared instead.
    Degraded,
    /// Another cycle was in flight; this trigger was dropped.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub refresh_interval: Duration,
    pub max_data_points: usize,
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            refresh_interval: config.refresh_interval(),
            max_data_points: config.max_data_points,
        }
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        (&Config::default()).into()
    }
}

struct CycleData {
    phase: CycleState,
    city: CityTarget,
    /// Bumped on every city change so an in-flight cycle for the old city
    /// does not write into the fresh series.
    city_generation: u64,
    series: RollingSeries,
    latest: Option<Snapshot>,
    rng: StdRng,
}

struct ScheduledRefresh {
    id: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    client: ExternalDataClient,
    geocoding: Option<GeocodingClient>,
    generator: SyntheticMetricsGenerator,
    sink: Arc<dyn PresentationSink>,
    notifier: Notifier,
    refresh_interval: Duration,
    fetching: AtomicBool,
    next_timer_id: AtomicU64,
    data: Mutex<CycleData>,
    timer: Mutex<Option<ScheduledRefresh>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let slot = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = slot.take() {
            pending.handle.abort();
        }
    }
}

/// Releases the in-flight flag however the cycle ends, including when the
/// cycle future is dropped mid-fetch.
struct FetchGate<'a> {
    inner: &'a Inner,
}

impl<'a> FetchGate<'a> {
    fn acquire(inner: &'a Inner) -> Option<Self> {
        inner
            .fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { inner })
    }
}

impl Drop for FetchGate<'_> {
    fn drop(&mut self) {
        lock(&self.inner.data).phase = CycleState::Idle;
        self.inner.fetching.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

pub struct OrchestratorBuilder {
    client: ExternalDataClient,
    sink: Arc<dyn PresentationSink>,
    settings: OrchestratorSettings,
    geocoding: Option<GeocodingClient>,
    generator: SyntheticMetricsGenerator,
    notifier: Notifier,
    city: CityTarget,
    rng: Option<StdRng>,
}

impl OrchestratorBuilder {
    pub fn settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn geocoding(mut self, geocoding: GeocodingClient) -> Self {
        self.geocoding = Some(geocoding);
        self
    }

    pub fn generator(mut self, generator: SyntheticMetricsGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn city(mut self, city: CityTarget) -> Self {
        self.city = city;
        self
    }

    /// Fixed seed for reproducible synthetic values.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    pub fn build(self) -> RefreshOrchestrator {
        let data = CycleData {
            phase: CycleState::Idle,
            city: self.city,
            city_generation: 0,
            series: RollingSeries::pollution(self.settings.max_data_points),
            latest: None,
            rng: self.rng.unwrap_or_else(StdRng::from_entropy),
        };

        RefreshOrchestrator {
            inner: Arc::new(Inner {
                client: self.client,
                geocoding: self.geocoding,
                generator: self.generator,
                sink: self.sink,
                notifier: self.notifier,
                refresh_interval: self.settings.refresh_interval,
                fetching: AtomicBool::new(false),
                next_timer_id: AtomicU64::new(0),
                data: Mutex::new(data),
                timer: Mutex::new(None),
            }),
        }
    }
}

/// Owns the refresh state: current city, pollution series, last snapshot and
/// the pending timer. Cheap to clone; clones share the same state.
///
/// At most one cycle runs at a time. Triggers arriving while a cycle is in
/// flight are dropped, not queued. Every completed cycle, manual or not,
/// replaces the pending timer with a fresh one.
#[derive(Clone)]
pub struct RefreshOrchestrator {
    inner: Arc<Inner>,
}

impl RefreshOrchestrator {
    pub fn builder(
        client: ExternalDataClient,
        sink: Arc<dyn PresentationSink>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            client,
            sink,
            settings: OrchestratorSettings::default(),
            geocoding: None,
            generator: SyntheticMetricsGenerator::default(),
            notifier: Notifier::silent(),
            city: CityTarget::default(),
            rng: None,
        }
    }

    pub fn state(&self) -> CycleState {
        lock(&self.inner.data).phase
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.fetching.load(Ordering::Acquire)
    }

    pub fn city(&self) -> CityTarget {
        lock(&self.inner.data).city.clone()
    }

    pub fn latest(&self) -> Option<Snapshot> {
        lock(&self.inner.data).latest.clone()
    }

    pub fn series(&self) -> RollingSeries {
        lock(&self.inner.data).series.clone()
    }

    pub fn has_pending_timer(&self) -> bool {
        lock(&self.inner.timer).as_ref().is_some_and(|t| !t.handle.is_finished())
    }

    /// First cycle after startup. Warns once if the API key is missing.
    pub async fn start(&self) -> CycleOutcome {
        self.inner.client.report_missing_credential();
        self.request_refresh(Trigger::Startup).await
    }

    /// Run one cycle unless one is already in flight.
    pub async fn request_refresh(&self, trigger: Trigger) -> CycleOutcome {
        let Some(_gate) = FetchGate::acquire(&self.inner) else {
            tracing::warn!(?trigger, "Data fetch already in progress. Skipping this request.");
            return CycleOutcome::Skipped;
        };

        let (city, generation) = {
            let mut data = lock(&self.inner.data);
            data.phase = CycleState::Fetching;
            (data.city.clone(), data.city_generation)
        };
        tracing::info!(city = %city.display_name, ?trigger, "Fetching all data");

        let readings = self.inner.client.fetch(city.coordinates).await;

        // A panic while merging or rendering must not skip rescheduling, or the
        // timer-driven loop stops for good.
        let published = panic::catch_unwind(AssertUnwindSafe(|| {
            self.merge_and_publish(&city, generation, readings)
        }))
        .unwrap_or_else(|payload| Err(anyhow!("publish panicked: {}", panic_message(&*payload))));

        let outcome = match published {
            Ok(()) => CycleOutcome::Published,
            Err(err) => {
                tracing::error!(
                    error = %format!("{err:#}"),
                    "Error publishing refresh; clearing dashboard"
                );
                self.inner
                    .notifier
                    .error(format!("Error fetching latest data for {}.", city.display_name));
                let sink = &self.inner.sink;
                if panic::catch_unwind(AssertUnwindSafe(|| sink.render_cleared())).is_err() {
                    tracing::error!("Clearing the dashboard panicked");
                }
                CycleOutcome::Degraded
            }
        };

        self.schedule_next(trigger);
        outcome
    }

    /// Switch to a new city. History belongs to the old city, so the series
    /// and last snapshot are dropped before the manual refresh.
    pub async fn change_city(&self, city: CityTarget) -> CycleOutcome {
        {
            let mut data = lock(&self.inner.data);
            tracing::info!(
                from = %data.city.display_name,
                to = %city.display_name,
                "Changing city"
            );
            data.city = city;
            data.city_generation += 1;
            data.series.clear();
            data.latest = None;
        }
        self.request_refresh(Trigger::Manual).await
    }

    /// Geocode `query` and switch to it. `None` when the lookup failed; city,
    /// series and timer are then left as they were.
    pub async fn change_city_by_name(&self, query: &str) -> Option<CycleOutcome> {
        let Some(geocoding) = &self.inner.geocoding else {
            tracing::error!("City lookup requested but no geocoder is configured");
            self.inner.notifier.error("City lookup is unavailable.");
            return None;
        };

        self.inner.notifier.info(format!("Looking up city: {}...", query.trim()));
        match geocoding.lookup_city(query).await {
            Some(city) => Some(self.change_city(city).await),
            None => {
                self.inner.notifier.error(format!(
                    "Could not find city: \"{}\". Please try a different name or format \
                     (e.g., \"City, Country\").",
                    query.trim()
                ));
                None
            }
        }
    }

    /// Cancel the pending timer. The orchestrator stays usable; the next
    /// completed cycle schedules a new one.
    pub fn shutdown(&self) {
        if let Some(pending) = lock(&self.inner.timer).take() {
            pending.handle.abort();
            tracing::debug!("Automatic refresh cancelled");
        }
    }

    fn merge_and_publish(
        &self,
        city: &CityTarget,
        generation: u64,
        readings: ExternalReadings,
    ) -> anyhow::Result<()> {
        let (snapshot, series) = {
            let mut data = lock(&self.inner.data);
            data.phase = CycleState::Merging;

            let synthetic =
                self.inner.generator.generate(&mut data.rng, readings.weather.as_ref());
            let index = readings.air_quality.as_ref().and_then(|aq| aq.index);
            let display_aqi = to_display_aqi(index, &mut data.rng);

            let snapshot = Snapshot {
                captured_at: Utc::now(),
                city: city.display_name.clone(),
                display_aqi,
                air_quality: readings.air_quality,
                weather: readings.weather,
                synthetic,
            };
            tracing::debug!(?snapshot, "Combined real and synthetic data");

            data.phase = CycleState::Publishing;
            if data.city_generation == generation {
                let label = snapshot.time_label();
                let samples = [(CHANNEL_PM2_5, snapshot.pm2_5()), (CHANNEL_CO, snapshot.co())];
                match data.series.append(&label, &samples) {
                    AppendOutcome::Skipped => {
                        tracing::debug!("No PM2.5 or CO value this cycle; series unchanged")
                    }
                    outcome => tracing::debug!(?outcome, %label, "Pollution series updated"),
                }
                data.latest = Some(snapshot.clone());
            } else {
                tracing::info!(
                    city = %city.display_name,
                    "City changed during fetch; result not recorded"
                );
            }

            (snapshot, data.series.clone())
        };

        self.inner.sink.render(&snapshot, &series)
    }

    fn schedule_next(&self, trigger: Trigger) {
        lock(&self.inner.data).phase = CycleState::Scheduled;

        let interval = self.inner.refresh_interval;
        let id = self.inner.next_timer_id.fetch_add(1, Ordering::Relaxed);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let Some(inner) = weak.upgrade() else { return };
            {
                // Detach our own handle so the cycle we start cannot abort us.
                let mut slot = lock(&inner.timer);
                if slot.as_ref().is_some_and(|t| t.id == id) {
                    slot.take();
                }
            }
            RefreshOrchestrator { inner }.request_refresh(Trigger::Timer).await;
        });

        if let Some(previous) = lock(&self.inner.timer).replace(ScheduledRefresh { id, handle }) {
            previous.handle.abort();
        }

        if trigger == Trigger::Manual {
            tracing::info!("Manual update complete. Automatic refresh timer reset.");
        }
        tracing::info!(
            minutes = interval.as_secs_f64() / 60.0,
            "Next automatic data refresh scheduled"
        );
    }
}
