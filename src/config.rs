use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crop::CropPlan;
use crate::daily_inputs::WeatherRecord;
use crate::error::{Result, ScenarioId, SimError};
use crate::state::CarryOver;

// Days between interval snapshots when no phenological date falls due
const DEFAULT_REPORT_INTERVAL: u32 = 7;

// Driver switches for one scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub legacy_alfalfa_percent: bool,
    pub report_interval: u32,
    pub daily_snapshots: bool,
    pub live_condition: bool, // second pass of a wheat/fallow rotation
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            legacy_alfalfa_percent: false,
            report_interval: DEFAULT_REPORT_INTERVAL,
            daily_snapshots: true,
            live_condition: false,
        }
    }
}

/// One site x soil x year x crop-file run as a TOML document.
///
/// ```toml
/// site = "NE01"
/// soil = 621
/// year = 2001
/// crop_file = "CORN01"
///
/// [options]
/// report_interval = 10
///
/// [weather]
/// station = "NE01"
/// ...
///
/// [crop]
/// crop = "corn"
/// ...
///
/// [carry_over]
/// residue = 2500.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub site: String,
    pub soil: u16,
    pub year: i32,
    pub crop_file: String,
    #[serde(default)]
    pub options: RunOptions,
    pub weather: WeatherRecord,
    pub crop: CropPlan,
    #[serde(default)]
    pub carry_over: CarryOver,
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn id(&self) -> ScenarioId {
        ScenarioId {
            site: self.site.clone(),
            soil: self.soil,
            year: self.year,
            crop_file: self.crop_file.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.weather.year != self.year {
            return Err(SimError::InvalidInput(format!(
                "weather record is for {}, scenario is for {}",
                self.weather.year, self.year
            )));
        }
        self.crop.validate().map_err(|e| e.in_scenario(&self.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::CropId;

    const SCENARIO: &str = include_str!("../tests/data/corn_dryland.toml");

    #[test]
    fn scenario_document_loads() {
        let s = Scenario::from_toml_str(SCENARIO).unwrap();
        assert_eq!(s.crop.crop, CropId::Corn);
        assert_eq!(s.soil, 621);
        assert_eq!(s.options.report_interval, DEFAULT_REPORT_INTERVAL);
        assert_eq!(s.id().crop_file, "CORN01");
        assert_eq!(s.weather.max_temp.len(), s.weather.precip.len());
    }

    #[test]
    fn missing_carry_over_uses_defaults() {
        let s = Scenario::from_toml_str(SCENARIO).unwrap();
        assert_eq!(s.carry_over, CarryOver::default());
    }

    #[test]
    fn weather_year_must_match() {
        let text = SCENARIO.replacen("year = 2001", "year = 2002", 1);
        assert!(matches!(Scenario::from_toml_str(&text), Err(SimError::InvalidInput(_))));
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        assert!(matches!(
            Scenario::from_toml_str("site = 3"),
            Err(SimError::Config(_))
        ));
    }
}
