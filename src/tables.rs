use serde::{Deserialize, Serialize};

use crate::crop::CropId;
use crate::error::{Result, SimError};
use crate::soil_hydra::LAYERS;

// Residue classes share the tillage-factor column index and the curve-number formula variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidueClass {
    NonFragile,
    Fragile,
}

// Snow accumulation and melt constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnowParams {
    pub snowfall_temp: f64,    // F, precipitation falls as snow at or below this
    pub melt_factor_max: f64,  // in/F/day, June 21
    pub melt_factor_min: f64,  // in/F/day, Dec 21
    pub full_cover_water: f64, // in, snow water giving 100% cover
    pub cover_shape1: f64,
    pub cover_shape2: f64,
    pub lag_factor: f64, // 0..1, 1 means snowpack temperature follows air temperature
}

/// Per-crop constants shared by every crop plan of that crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropConstants {
    pub crop: CropId,
    pub kc_lower: f64,
    pub kc_upper: f64,
    pub base_temp: f64,
    pub ceiling_temp: f64,
    pub yield_density: f64,
    pub residue_ratio: f64,
    pub residue_specific_gravity: f64,
    pub fragility: ResidueClass,
    pub runoff_residue: ResidueClass,
    pub curve_numbers: [f64; 4], // by hydrologic group A..D
    // Rows of 10 coefficients: pre/post effective cover, plus a third row for alfalfa after the last cut
    #[serde(default)]
    pub kc_table: Vec<[f64; 10]>,
}

impl CropConstants {
    pub fn kc_span(&self) -> f64 {
        self.kc_upper - self.kc_lower
    }

    pub fn curve_number(&self, hydro_group: u8) -> f64 {
        self.curve_numbers[usize::from(hydro_group.clamp(1, 4)) - 1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TillageFactor {
    pub code: u32,
    pub non_fragile: f64, // percent of residue remaining
    pub fragile: f64,
}

/// Global multi-crop constant tables, loaded once and shared read-only by every scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTables {
    pub etr_factor: f64,
    pub forecast_days: usize,
    #[serde(default)]
    pub yield_trend: bool,
    pub layer_depths: [f64; LAYERS], // in
    pub snow: SnowParams,
    pub fallow_curve_numbers: [f64; 4],
    pub crops: Vec<CropConstants>,
    #[serde(default)]
    pub tillage: Vec<TillageFactor>,
}

impl ReferenceTables {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let tables: ReferenceTables = toml::from_str(text)?;
        tables.validate()?;
        Ok(tables)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.layer_depths.iter().any(|&d| d <= 0.0) {
            return Err(SimError::InvalidInput(
                "layer depths must be positive".to_string(),
            ));
        }
        for c in &self.crops {
            if c.kc_upper <= c.kc_lower {
                return Err(SimError::InvalidInput(format!(
                    "{:?}: upper Kc bound {} not above lower bound {}",
                    c.crop, c.kc_upper, c.kc_lower
                )));
            }
            let rows = match c.crop {
                crop if crop.uses_stage_table() => 2,
                CropId::Alfalfa => 3,
                _ => 0,
            };
            if c.kc_table.len() < rows {
                return Err(SimError::InvalidInput(format!(
                    "{:?} needs {} crop coefficient rows, found {}",
                    c.crop,
                    rows,
                    c.kc_table.len()
                )));
            }
        }
        Ok(())
    }

    pub fn crop(&self, crop: CropId) -> Result<&CropConstants> {
        self.crops
            .iter()
            .find(|c| c.crop == crop)
            .ok_or_else(|| SimError::MissingReferenceData(format!("no constants for {crop:?}")))
    }

    // Fraction of residue left by a tillage operation
    pub fn tillage_factor(&self, code: u32, class: ResidueClass) -> Result<f64> {
        let factor = self
            .tillage
            .iter()
            .find(|t| t.code == code)
            .ok_or_else(|| SimError::MissingReferenceData(format!("tillage code {code}")))?;
        let percent = match class {
            ResidueClass::NonFragile => factor.non_fragile,
            ResidueClass::Fragile => factor.fragile,
        };
        Ok(percent / 100.0)
    }

    pub fn fallow_curve_number(&self, hydro_group: u8) -> f64 {
        self.fallow_curve_numbers[usize::from(hydro_group.clamp(1, 4)) - 1]
    }
}
