//! Fixed-capacity, multi-channel time series used for the pollution chart.

use serde::Serialize;
use std::collections::VecDeque;

pub const CHANNEL_PM2_5: &str = "pm2_5";
pub const CHANNEL_CO: &str = "co";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Every value was `None`; nothing recorded.
    Skipped,
    Appended { evicted: bool },
    /// The label matched the newest entry, whose values were overwritten.
    Replaced,
}

#[derive(Debug, Clone, PartialEq)]
struct Channel {
    name: String,
    values: VecDeque<Option<f64>>,
}

/// Parallel label and channel columns, all the same length, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingSeries {
    capacity: usize,
    labels: VecDeque<String>,
    channels: Vec<Channel>,
}

/// Borrowed view of one channel for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelView<'a> {
    pub name: &'a str,
    pub points: Vec<(&'a str, Option<f64>)>,
}

impl RollingSeries {
    pub fn new(capacity: usize, channels: &[&str]) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            labels: VecDeque::with_capacity(capacity + 1),
            channels: channels
                .iter()
                .map(|name| Channel {
                    name: name.to_string(),
                    values: VecDeque::with_capacity(capacity + 1),
                })
                .collect(),
        }
    }

    /// Series with the PM2.5 and CO channels the dashboard charts.
    pub fn pollution(capacity: usize) -> Self {
        Self::new(capacity, &[CHANNEL_PM2_5, CHANNEL_CO])
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn last_label(&self) -> Option<&str> {
        self.labels.back().map(String::as_str)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.name.as_str())
    }

    /// Values of one channel, oldest first.
    pub fn values(&self, channel: &str) -> Option<Vec<Option<f64>>> {
        self.channels
            .iter()
            .find(|c| c.name == channel)
            .map(|c| c.values.iter().copied().collect())
    }

    /// Record a sample. Channels missing from `values` get `None` for this
    /// slot; channels not seen before are added and back-filled with `None`.
    pub fn append(&mut self, label: &str, values: &[(&str, Option<f64>)]) -> AppendOutcome {
        if values.iter().all(|(_, v)| v.is_none()) {
            return AppendOutcome::Skipped;
        }

        for (name, _) in values {
            self.ensure_channel(name);
        }

        let sample = |channel: &Channel| {
            values
                .iter()
                .find(|(name, _)| *name == channel.name)
                .and_then(|(_, v)| *v)
        };

        if self.last_label() == Some(label) {
            for channel in &mut self.channels {
                let value = sample(channel);
                if let Some(last) = channel.values.back_mut() {
                    *last = value;
                }
            }
            return AppendOutcome::Replaced;
        }

        self.labels.push_back(label.to_string());
        for channel in &mut self.channels {
            let value = sample(channel);
            channel.values.push_back(value);
        }

        let evicted = self.labels.len() > self.capacity;
        if evicted {
            self.labels.pop_front();
            for channel in &mut self.channels {
                channel.values.pop_front();
            }
        }

        AppendOutcome::Appended { evicted }
    }

    /// `(label, value)` pairs per channel, in channel declaration order.
    pub fn channels(&self) -> Vec<ChannelView<'_>> {
        self.channels
            .iter()
            .map(|c| ChannelView {
                name: &c.name,
                points: self
                    .labels
                    .iter()
                    .map(String::as_str)
                    .zip(c.values.iter().copied())
                    .collect(),
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
        for channel in &mut self.channels {
            channel.values.clear();
        }
    }

    fn ensure_channel(&mut self, name: &str) {
        if self.channels.iter().any(|c| c.name == name) {
            return;
        }
        let mut values = VecDeque::with_capacity(self.capacity + 1);
        values.resize(self.labels.len(), None);
        self.channels.push(Channel { name: name.to_string(), values });
    }

    #[cfg(test)]
    fn assert_aligned(&self) {
        for channel in &self.channels {
            assert_eq!(
                channel.values.len(),
                self.labels.len(),
                "channel {} misaligned",
                channel.name
            );
        }
        assert!(self.labels.len() <= self.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(i: usize) -> String {
        format!("{:02}:{:02}", i / 60, i % 60)
    }

    #[test]
    fn stays_aligned_and_bounded_under_mixed_appends() {
        let mut series = RollingSeries::pollution(30);

        for i in 0..200usize {
            let values: Vec<(&str, Option<f64>)> = match i % 5 {
                0 => vec![(CHANNEL_PM2_5, Some(i as f64))],
                1 => vec![(CHANNEL_CO, Some(i as f64)), (CHANNEL_PM2_5, None)],
                2 => vec![(CHANNEL_PM2_5, None), (CHANNEL_CO, None)],
                3 => vec![("no2", Some(1.0))],
                _ => vec![(CHANNEL_PM2_5, Some(1.0)), (CHANNEL_CO, Some(2.0))],
            };
            // Every third sample reuses the previous label.
            let l = if i % 3 == 0 { label(i.saturating_sub(1)) } else { label(i) };
            series.append(&l, &values);
            series.assert_aligned();
        }

        assert_eq!(series.len(), 30);
    }

    #[test]
    fn evicts_oldest_in_fifo_order() {
        let mut series = RollingSeries::pollution(30);
        let k = 7;

        for i in 0..30 + k {
            series.append(&label(i), &[(CHANNEL_PM2_5, Some(i as f64))]);
        }

        let labels: Vec<&str> = series.labels().collect();
        let expected: Vec<String> = (k..30 + k).map(label).collect();
        assert_eq!(labels, expected.iter().map(String::as_str).collect::<Vec<_>>());

        let pm = series.values(CHANNEL_PM2_5).expect("channel");
        assert_eq!(pm.first(), Some(&Some(k as f64)));
        assert_eq!(pm.last(), Some(&Some((29 + k) as f64)));
    }

    #[test]
    fn reports_eviction() {
        let mut series = RollingSeries::pollution(2);
        assert_eq!(
            series.append("10:00", &[(CHANNEL_PM2_5, Some(1.0))]),
            AppendOutcome::Appended { evicted: false }
        );
        series.append("10:01", &[(CHANNEL_PM2_5, Some(2.0))]);
        assert_eq!(
            series.append("10:02", &[(CHANNEL_PM2_5, Some(3.0))]),
            AppendOutcome::Appended { evicted: true }
        );
    }

    #[test]
    fn same_label_overwrites_last_entry() {
        let mut series = RollingSeries::pollution(30);

        series.append("10:15", &[(CHANNEL_PM2_5, Some(40.0)), (CHANNEL_CO, Some(200.0))]);
        let outcome = series.append("10:15", &[(CHANNEL_PM2_5, Some(42.0))]);

        assert_eq!(outcome, AppendOutcome::Replaced);
        assert_eq!(series.len(), 1);
        assert_eq!(series.values(CHANNEL_PM2_5), Some(vec![Some(42.0)]));
        // The overwrite reflects the second sample only, so CO is now absent.
        assert_eq!(series.values(CHANNEL_CO), Some(vec![None]));
    }

    #[test]
    fn all_null_sample_is_skipped() {
        let mut series = RollingSeries::pollution(30);

        assert_eq!(
            series.append("10:00", &[(CHANNEL_PM2_5, None), (CHANNEL_CO, None)]),
            AppendOutcome::Skipped
        );
        assert_eq!(series.append("10:00", &[]), AppendOutcome::Skipped);
        assert!(series.is_empty());
    }

    #[test]
    fn absent_channel_still_occupies_slot() {
        let mut series = RollingSeries::pollution(30);

        series.append("10:00", &[(CHANNEL_CO, Some(210.5))]);

        assert_eq!(series.values(CHANNEL_PM2_5), Some(vec![None]));
        assert_eq!(series.values(CHANNEL_CO), Some(vec![Some(210.5)]));
    }

    #[test]
    fn new_channel_is_back_filled() {
        let mut series = RollingSeries::pollution(30);
        series.append("10:00", &[(CHANNEL_PM2_5, Some(1.0))]);
        series.append("10:01", &[("o3", Some(61.2))]);

        assert_eq!(series.values("o3"), Some(vec![None, Some(61.2)]));
        assert_eq!(series.channel_names().collect::<Vec<_>>(), vec!["pm2_5", "co", "o3"]);
        series.assert_aligned();
    }

    #[test]
    fn channels_view_pairs_labels_with_values() {
        let mut series = RollingSeries::pollution(30);
        series.append("10:00", &[(CHANNEL_PM2_5, Some(1.0)), (CHANNEL_CO, Some(2.0))]);
        series.append("10:01", &[(CHANNEL_PM2_5, Some(3.0))]);

        let views = series.channels();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].name, CHANNEL_PM2_5);
        assert_eq!(views[0].points, vec![("10:00", Some(1.0)), ("10:01", Some(3.0))]);
        assert_eq!(views[1].points, vec![("10:00", Some(2.0)), ("10:01", None)]);
    }

    #[test]
    fn clear_resets_every_column() {
        let mut series = RollingSeries::pollution(30);
        series.append("10:00", &[(CHANNEL_PM2_5, Some(1.0))]);
        series.clear();

        assert!(series.is_empty());
        assert_eq!(series.values(CHANNEL_PM2_5), Some(vec![]));
        assert_eq!(series.last_label(), None);
        series.assert_aligned();
    }
}
