use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::crop::CropId;
use crate::error::Result;
use crate::root_zone::RootZone;
use crate::snowmelt::Snowpack;
use crate::soil_hydra::{LAYERS, LayerVec, RootedProfile, SoilColumn};
use crate::soil_temp::SoilTemperature;

// Residue assumed for anything but grain and row crops, lb/acre
pub const DEFAULT_RESIDUE: f64 = 100.0;

/// Season-ending field condition handed to the next season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarryOver {
    pub theta: [f64; LAYERS],
    pub crop: CropId,
    pub residue: f64, // lb/acre
    pub live_crop: bool,
    pub snow_temperature: f64, // F
    pub snow_water: f64,       // in
    pub soil_temperature: [f64; LAYERS],
}

impl Default for CarryOver {
    fn default() -> Self {
        CarryOver {
            theta: [0.185, 0.173, 0.180, 0.161, 0.184, 0.184, 0.222, 0.247, 0.310, 0.338],
            crop: CropId::NativePasture,
            residue: DEFAULT_RESIDUE,
            live_crop: false,
            snow_temperature: 9.6,
            snow_water: 0.0,
            soil_temperature: [8.7, 10.0, 12.9, 18.1, 23.8, 29.6, 35.0, 38.8, 42.0, 44.4],
        }
    }
}

impl CarryOver {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }
}

/// Mutable soil and surface state of one scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilMoistureState {
    pub theta: LayerVec,
    pub temperature: SoilTemperature,
    pub profile: RootedProfile,
    pub zone: RootZone,
    pub snow: Snowpack,
    pub residue: f64,
    pub old_crop: CropId, // crop that left the surface residue
    pub live_crop: bool,
}

impl SoilMoistureState {
    /**
    Builds the season's starting state from the carry-over record.

    # Arguments
    * `carry` - Previous season's ending condition.
    * `soil` - Soil column.
    * `crop` - Crop simulated this season.
    * `root_max` - Season maximum root depth, in.
    * `root_min` - Minimum root depth, in.
    */
    pub fn start(carry: &CarryOver, soil: &SoilColumn, crop: CropId, root_max: f64, root_min: f64) -> Self {
        let residue = if crop.is_grain_or_tuber() {
            carry.residue
        } else {
            DEFAULT_RESIDUE
        };
        SoilMoistureState {
            theta: LayerVec::from_row_slice(&carry.theta),
            temperature: SoilTemperature::new(LayerVec::from_row_slice(&carry.soil_temperature)),
            profile: soil.rooted_profile(root_max),
            zone: RootZone::new(root_min),
            snow: Snowpack::new(carry.snow_temperature, carry.snow_water),
            residue,
            old_crop: carry.crop,
            live_crop: carry.live_crop,
        }
    }

    pub fn stored_water(&self, soil: &SoilColumn) -> f64 {
        soil.stored_water(&self.theta)
    }

    // Profile depletion below field capacity, not weighted by roots
    pub fn profile_depletion(&self, soil: &SoilColumn) -> f64 {
        soil.depletion(&self.theta)
    }

    // Root-weighted depletion below field capacity
    pub fn root_depletion(&self, soil: &SoilColumn) -> f64 {
        (soil.field_capacity - self.theta)
            .component_mul(&soil.depth)
            .dot(&self.zone.fraction)
    }

    /// Holds every layer inside [0, saturation].
    ///
    /// Returns the water removed above saturation, which leaves the profile as
    /// drainage.
    pub fn clamp_to_limits(&mut self, soil: &SoilColumn, day: u32) -> f64 {
        let saturation = soil.saturation();
        let mut excess = 0.0;
        for i in 0..LAYERS {
            if self.theta[i] > saturation {
                excess += (self.theta[i] - saturation) * soil.depth[i];
                self.theta[i] = saturation;
            } else if self.theta[i] < 0.0 {
                warn!(day, layer = i, theta = self.theta[i], "negative water content reset to zero");
                self.theta[i] = 0.0;
            }
        }
        if excess > 0.0 {
            warn!(day, excess, "water above saturation moved to drainage");
        }
        excess
    }

    pub fn carry_over(&self, crop: CropId, live_crop: bool) -> CarryOver {
        let mut theta = [0.0; LAYERS];
        theta.copy_from_slice(self.theta.as_slice());
        let mut soil_temperature = [0.0; LAYERS];
        soil_temperature.copy_from_slice(self.temperature.layers.as_slice());
        CarryOver {
            theta,
            crop,
            residue: self.residue,
            live_crop,
            snow_temperature: self.snow.temperature,
            snow_water: self.snow.water,
            soil_temperature,
        }
    }
}
