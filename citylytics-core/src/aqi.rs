//! Projection of the provider's coarse 1..=5 index onto the familiar 0..500
//! display scale, and the category bands of that scale.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Display range for a provider index, or `None` for values outside 1..=5.
pub fn display_range(index: u8) -> Option<RangeInclusive<u32>> {
    match index {
        1 => Some(0..=50),
        2 => Some(51..=100),
        3 => Some(101..=150),
        4 => Some(151..=200),
        5 => Some(201..=301),
        _ => None,
    }
}

/// Rough estimate only: the real figure depends on the pollutant concentrations,
/// so a value is picked at random inside the band of the provider index.
pub fn to_display_aqi<R: Rng>(index: Option<u8>, rng: &mut R) -> Option<u32> {
    let range = display_range(index?)?;
    Some(rng.gen_range(range))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    Unknown,
}

impl AqiCategory {
    pub fn from_value(aqi: Option<u32>) -> Self {
        match aqi {
            None => AqiCategory::Unknown,
            Some(v) if v <= 50 => AqiCategory::Good,
            Some(v) if v <= 100 => AqiCategory::Moderate,
            Some(v) if v <= 150 => AqiCategory::UnhealthyForSensitiveGroups,
            Some(v) if v <= 200 => AqiCategory::Unhealthy,
            Some(v) if v <= 300 => AqiCategory::VeryUnhealthy,
            Some(_) => AqiCategory::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
            AqiCategory::Unknown => "N/A",
        }
    }
}

impl std::fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn every_index_lands_in_its_band() {
        let mut rng = StdRng::seed_from_u64(7);
        for index in 1..=5u8 {
            let range = display_range(index).expect("known index");
            for _ in 0..500 {
                let v = to_display_aqi(Some(index), &mut rng).expect("value");
                assert!(range.contains(&v), "index {index} produced {v}");
            }
        }
    }

    #[test]
    fn unknown_index_has_no_display_value() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(to_display_aqi(None, &mut rng), None);
        assert_eq!(to_display_aqi(Some(0), &mut rng), None);
        assert_eq!(to_display_aqi(Some(6), &mut rng), None);
    }

    #[test]
    fn index_three_is_sensitive_groups_band() {
        let mut rng = StdRng::seed_from_u64(3);
        let v = to_display_aqi(Some(3), &mut rng);
        assert_eq!(AqiCategory::from_value(v), AqiCategory::UnhealthyForSensitiveGroups);
    }

    #[test]
    fn category_boundaries() {
        assert_eq!(AqiCategory::from_value(Some(0)), AqiCategory::Good);
        assert_eq!(AqiCategory::from_value(Some(50)), AqiCategory::Good);
        assert_eq!(AqiCategory::from_value(Some(51)), AqiCategory::Moderate);
        assert_eq!(AqiCategory::from_value(Some(150)), AqiCategory::UnhealthyForSensitiveGroups);
        assert_eq!(AqiCategory::from_value(Some(200)), AqiCategory::Unhealthy);
        assert_eq!(AqiCategory::from_value(Some(300)), AqiCategory::VeryUnhealthy);
        assert_eq!(AqiCategory::from_value(Some(301)), AqiCategory::Hazardous);
        assert_eq!(AqiCategory::from_value(None).label(), "N/A");
    }
}
