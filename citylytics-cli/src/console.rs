use anyhow::Context;
use chrono::Local;
use citylytics_core::{AqiCategory, Notice, PresentationSink, RollingSeries, Snapshot};
use std::io::{self, Write};
use tokio::sync::mpsc::UnboundedReceiver;

/// Prints each refresh as a block of text on stdout. Write failures (a closed
/// pipe, a full disk) come back as errors instead of panicking.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl PresentationSink for ConsoleSink {
    fn render(&self, snapshot: &Snapshot, series: &RollingSeries) -> anyhow::Result<()> {
        write_block(&mut io::stdout().lock(), &render_snapshot(snapshot, series))
            .context("Failed to write dashboard to stdout")
    }

    fn render_cleared(&self) {
        if let Err(err) = write_block(&mut io::stdout().lock(), &render_cleared_block()) {
            tracing::warn!(error = %err, "Failed to write cleared dashboard to stdout");
        }
    }
}

fn write_block<W: Write>(out: &mut W, block: &str) -> io::Result<()> {
    out.write_all(block.as_bytes())?;
    out.flush()
}

pub fn render_cleared_block() -> String {
    let mut out = format!("── {} ── no data\n", Local::now().format("%H:%M"));
    out.push_str("  Vehicles   --   (vs yesterday N/A)\n");
    out.push_str("  Energy     --   (vs yesterday N/A)\n");
    out.push_str("  AQI        --   Status: N/A\n");
    out.push_str("  Weather    --   City Conditions\n");
    out
}

pub fn render_snapshot(snapshot: &Snapshot, series: &RollingSeries) -> String {
    let s = &snapshot.synthetic;
    let category = AqiCategory::from_value(snapshot.display_aqi);
    let mut out = String::new();

    out.push_str(&format!("── {} ── {}\n", snapshot.time_label(), snapshot.city));
    out.push_str(&format!(
        "  Vehicles   {:<8} ({} vs yesterday)\n",
        s.total_vehicles,
        signed_percent(s.vehicle_change_percent)
    ));
    out.push_str(&format!(
        "  Energy     {:<8} ({} vs yesterday)\n",
        format!("{} kWh", s.energy_today_kwh),
        signed_percent(s.energy_change_percent)
    ));
    out.push_str(&format!(
        "  AQI        {:<8} Status: {}\n",
        snapshot.display_aqi.map_or_else(|| "--".to_string(), |v| v.to_string()),
        category
    ));
    out.push_str(&format!(
        "  Weather    {:<8} {}\n",
        snapshot.temperature_c().map_or_else(|| "--".to_string(), |t| format!("{t:.0}°C")),
        snapshot.weather_description().map_or_else(|| "City Conditions".to_string(), capitalize)
    ));
    out.push_str(&format!(
        "  Power      {:.1}% renewable / {:.1}% fossil\n",
        s.renewable_percent,
        s.fossil_percent()
    ));

    let districts: Vec<String> =
        s.energy_by_district.iter().map(|(name, kwh)| format!("{name} {kwh}")).collect();
    out.push_str(&format!("  Districts  {}\n", districts.join(", ")));

    for channel in series.channels() {
        let values: Vec<String> = channel
            .points
            .iter()
            .map(|(_, v)| v.map_or_else(|| "-".to_string(), |v| format!("{v:.1}")))
            .collect();
        out.push_str(&format!("  {:<10} [{}]\n", channel.name, values.join(" ")));
    }

    out
}

pub async fn print_notices(mut rx: UnboundedReceiver<Notice>) {
    while let Some(notice) = rx.recv().await {
        print_notice(&notice);
    }
}

/// Prints whatever notices are already queued, without waiting for more.
pub fn flush_notices(rx: &mut UnboundedReceiver<Notice>) {
    while let Ok(notice) = rx.try_recv() {
        print_notice(&notice);
    }
}

fn print_notice(notice: &Notice) {
    eprintln!("[{}] {}", notice.level.as_str(), notice.message);
}

fn signed_percent(value: i32) -> String {
    if value >= 0 { format!("+{value}%") } else { format!("{value}%") }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
