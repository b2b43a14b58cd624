//! Plausible stand-ins for city metrics that have no free data source.

use rand::Rng;
use std::collections::BTreeMap;

use crate::model::{SyntheticBlock, Weather};

pub const MIN_ENERGY_KWH: u32 = 500;
pub const MIN_VEHICLES: u32 = 1000;
pub const RENEWABLE_RANGE: (f64, f64) = (35.0, 85.0);

/// Relative demand weight per district; the random draw for each district is
/// scaled by its weight before being normalized against the day's total.
pub const DEFAULT_DISTRICTS: &[(&str, f64)] = &[
    ("Downtown", 1.0),
    ("Industrial", 1.5),
    ("Residential N", 0.8),
    ("Residential S", 0.7),
    ("Commercial", 1.1),
    ("Suburban", 0.5),
];

/// Tuning knobs for [`SyntheticMetricsGenerator`].
#[derive(Debug, Clone)]
pub struct SyntheticMetricsGenerator {
    pub base_energy_kwh: f64,
    pub energy_spread_kwh: f64,
    pub base_vehicles: f64,
    pub vehicle_spread: f64,
    /// Max relative deviation applied to each district after scaling.
    pub district_jitter: f64,
    pub districts: Vec<(String, f64)>,
}

impl Default for SyntheticMetricsGenerator {
    fn default() -> Self {
        Self {
            base_energy_kwh: 5000.0,
            energy_spread_kwh: 4000.0,
            base_vehicles: 12000.0,
            vehicle_spread: 8000.0,
            district_jitter: 0.02,
            districts: DEFAULT_DISTRICTS
                .iter()
                .map(|(name, weight)| (name.to_string(), *weight))
                .collect(),
        }
    }
}

impl SyntheticMetricsGenerator {
    pub fn generate<R: Rng>(&self, rng: &mut R, weather: Option<&Weather>) -> SyntheticBlock {
        let raw_energy = self.base_energy_kwh + (rng.r#gen::<f64>() - 0.5) * self.energy_spread_kwh;
        let load = weather.and_then(|w| w.temperature_c).map_or(1.0, temperature_load_factor);
        let energy_today_kwh = ((raw_energy * load).floor().max(0.0) as u32).max(MIN_ENERGY_KWH);

        let vehicles = self.base_vehicles + (rng.r#gen::<f64>() - 0.5) * self.vehicle_spread;
        let total_vehicles = (vehicles.floor().max(0.0) as u32).max(MIN_VEHICLES);

        let (lo, hi) = RENEWABLE_RANGE;
        let renewable = lo + rng.r#gen::<f64>() * (hi - lo);
        let renewable_percent = ((renewable * 10.0).round() / 10.0).clamp(lo, hi);

        let vehicle_change_percent = (rng.r#gen::<f64>() * 12.0 - 5.0).round() as i32;
        let energy_change_percent = (rng.r#gen::<f64>() * 10.0 - 6.0).round() as i32;

        let energy_by_district = self.split_by_district(rng, energy_today_kwh);

        SyntheticBlock {
            energy_today_kwh,
            total_vehicles,
            renewable_percent,
            energy_by_district,
            vehicle_change_percent,
            energy_change_percent,
        }
    }

    fn split_by_district<R: Rng>(&self, rng: &mut R, total_kwh: u32) -> BTreeMap<String, u32> {
        if self.districts.is_empty() {
            return BTreeMap::new();
        }

        let ratios: Vec<f64> =
            self.districts.iter().map(|(_, weight)| rng.r#gen::<f64>() * weight.max(0.0)).collect();
        let ratio_sum: f64 = ratios.iter().sum();

        self.districts
            .iter()
            .zip(ratios)
            .map(|((name, _), ratio)| {
                let share = if ratio_sum > 0.0 {
                    ratio / ratio_sum
                } else {
                    1.0 / self.districts.len() as f64
                };
                let jitter = if self.district_jitter > 0.0 {
                    1.0 + rng.gen_range(-self.district_jitter..=self.district_jitter)
                } else {
                    1.0
                };
                let kwh = (share * f64::from(total_kwh) * jitter).floor().max(0.0) as u32;
                (name.clone(), kwh)
            })
            .collect()
    }
}

/// Hot days draw extra cooling load and cold days heating load.
fn temperature_load_factor(temp_c: f64) -> f64 {
    if temp_c >= 30.0 {
        1.10
    } else if temp_c <= 5.0 {
        1.08
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn hot() -> Weather {
        Weather { temperature_c: Some(38.0), ..Default::default() }
    }

    #[test]
    fn bounds_hold_over_many_draws() {
        let generator = SyntheticMetricsGenerator::default();
        let mut rng = StdRng::seed_from_u64(42);

        for i in 0..10_000 {
            let weather = if i % 2 == 0 { Some(hot()) } else { None };
            let block = generator.generate(&mut rng, weather.as_ref());

            assert!(block.energy_today_kwh >= MIN_ENERGY_KWH);
            assert!(block.total_vehicles >= MIN_VEHICLES);
            assert!((35.0..=85.0).contains(&block.renewable_percent));
            assert!((-5..=7).contains(&block.vehicle_change_percent));
            assert!((-6..=4).contains(&block.energy_change_percent));

            let total = f64::from(block.energy_today_kwh);
            let districts = f64::from(block.district_total_kwh());
            assert!(
                (districts - total).abs() <= total * 0.15,
                "districts {districts} vs total {total}"
            );
        }
    }

    #[test]
    fn every_district_is_reported() {
        let generator = SyntheticMetricsGenerator::default();
        let mut rng = StdRng::seed_from_u64(1);
        let block = generator.generate(&mut rng, None);

        assert_eq!(block.energy_by_district.len(), DEFAULT_DISTRICTS.len());
        assert!(block.energy_by_district.contains_key("Industrial"));
    }

    #[test]
    fn floors_apply_to_tiny_baselines() {
        let generator = SyntheticMetricsGenerator {
            base_energy_kwh: 10.0,
            energy_spread_kwh: 0.0,
            base_vehicles: 5.0,
            vehicle_spread: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let block = generator.generate(&mut rng, None);

        assert_eq!(block.energy_today_kwh, MIN_ENERGY_KWH);
        assert_eq!(block.total_vehicles, MIN_VEHICLES);
        // Districts are scaled against the clamped total, not the raw baseline.
        assert!(block.district_total_kwh() >= 450);
    }

    #[test]
    fn hot_weather_raises_demand() {
        let generator = SyntheticMetricsGenerator {
            energy_spread_kwh: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(5);

        let mild_weather = Weather { temperature_c: Some(22.0), ..Default::default() };
        let mild = generator.generate(&mut rng, Some(&mild_weather));
        let hot = generator.generate(&mut rng, Some(&hot()));

        assert_eq!(mild.energy_today_kwh, 5000);
        assert_eq!(hot.energy_today_kwh, 5500);
    }

    #[test]
    fn no_districts_configured() {
        let generator = SyntheticMetricsGenerator { districts: Vec::new(), ..Default::default() };
        let mut rng = StdRng::seed_from_u64(2);
        assert!(generator.generate(&mut rng, None).energy_by_district.is_empty());
    }
}
