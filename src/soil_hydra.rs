use nalgebra::SVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SimError};

pub const LAYERS: usize = 10;

// Per-layer quantity, top layer first
pub type LayerVec = SVector<f64, LAYERS>;

// Drainage constants are fixed per soil code and override the soil record's own values
pub const DRAINAGE_COEFFICIENT: f64 = 0.5;

const DRAINAGE_DAYS: [(u16, f64); 28] = [
    (411, 2.0),
    (412, 2.0),
    (421, 2.0),
    (422, 2.0),
    (431, 4.0),
    (432, 4.0),
    (442, 6.0),
    (512, 2.0),
    (521, 2.0),
    (522, 2.0),
    (532, 4.0),
    (542, 6.0),
    (612, 3.0),
    (621, 3.0),
    (622, 3.0),
    (631, 4.0),
    (632, 4.0),
    (642, 6.0),
    (721, 3.0),
    (722, 3.0),
    (731, 4.0),
    (732, 4.0),
    (821, 4.0),
    (822, 4.0),
    (831, 6.0),
    (832, 6.0),
    (921, 4.0),
    (922, 4.0),
];

// Drainage duration (days) for a soil code
pub fn drainage_days(code: u16) -> Option<f64> {
    DRAINAGE_DAYS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|&(_, days)| days)
}

// Soil record as stored in the soil catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilRecord {
    pub code: u16, // awhc class, hydrologic group, groundwater depth flag
    pub bulk_density: f64, // Mg/m3
    #[serde(default)]
    pub organic_matter: f64,
    pub field_capacity: [f64; LAYERS],
    pub wilting_point: [f64; LAYERS],
    pub air_dry: [f64; 3], // top three layers
    #[serde(default)]
    pub drainage_coefficient: Option<f64>,
    #[serde(default)]
    pub drainage_days: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilCatalog {
    pub soils: Vec<SoilRecord>,
}

impl SoilCatalog {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn record(&self, code: u16) -> Result<&SoilRecord> {
        self.soils
            .iter()
            .find(|s| s.code == code)
            .ok_or_else(|| SimError::MissingReferenceData(format!("soil code {code}")))
    }

    pub fn column(&self, code: u16, layer_depths: &[f64; LAYERS]) -> Result<SoilColumn> {
        SoilColumn::new(self.record(code)?, layer_depths)
    }
}

/// Ten-layer soil column, immutable for a scenario run.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilColumn {
    pub code: u16,
    pub awhc_class: u8,  // available water holding capacity, quarter inch per foot
    pub hydro_group: u8, // 1=A .. 4=D
    pub shallow_groundwater: bool,
    pub depth: LayerVec, // layer thickness, in
    pub field_capacity: LayerVec,
    pub wilting_point: LayerVec,
    pub air_dry: [f64; 3],
    pub bulk_density: f64,
    pub organic_matter: f64,
    pub drainage_coefficient: f64,
    pub drainage_days: f64,
}

impl SoilColumn {
    pub fn new(record: &SoilRecord, layer_depths: &[f64; LAYERS]) -> Result<Self> {
        let code = record.code;
        let awhc_class = (code / 100) as u8;
        let hydro_group = ((code / 10) % 10) as u8;
        let groundwater = code % 10;
        if !(1..=9).contains(&awhc_class) || !(1..=4).contains(&hydro_group) || !(1..=2).contains(&groundwater)
        {
            return Err(SimError::InvalidInput(format!("malformed soil code {code}")));
        }
        let days = drainage_days(code)
            .ok_or_else(|| SimError::MissingReferenceData(format!("drainage duration for soil {code}")))?;
        if record.drainage_days.is_some_and(|d| d != days)
            || record.drainage_coefficient.is_some_and(|c| c != DRAINAGE_COEFFICIENT)
        {
            debug!(soil = code, "soil record drainage constants overridden");
        }

        let field_capacity = LayerVec::from_row_slice(&record.field_capacity);
        let wilting_point = LayerVec::from_row_slice(&record.wilting_point);
        if field_capacity
            .iter()
            .zip(wilting_point.iter())
            .any(|(fc, pwp)| fc < pwp)
        {
            return Err(SimError::InvalidInput(format!(
                "soil {code}: wilting point above field capacity"
            )));
        }
        if record.bulk_density <= 0.0 || record.bulk_density >= 2.65 {
            return Err(SimError::InvalidInput(format!(
                "soil {code}: bulk density {} out of range",
                record.bulk_density
            )));
        }

        Ok(SoilColumn {
            code,
            awhc_class,
            hydro_group,
            shallow_groundwater: groundwater == 1,
            depth: LayerVec::from_row_slice(layer_depths),
            field_capacity,
            wilting_point,
            air_dry: record.air_dry,
            bulk_density: record.bulk_density,
            organic_matter: record.organic_matter,
            drainage_coefficient: DRAINAGE_COEFFICIENT,
            drainage_days: days,
        })
    }

    // Saturated volumetric water content from bulk density
    pub fn saturation(&self) -> f64 {
        1.0 - self.bulk_density / 2.65
    }

    pub fn total_depth(&self) -> f64 {
        self.depth.sum()
    }

    // Depth of each layer's midpoint below the surface
    pub fn centers(&self) -> LayerVec {
        let mut top = 0.0;
        LayerVec::from_fn(|i, _| {
            let center = top + 0.5 * self.depth[i];
            top += self.depth[i];
            center
        })
    }

    // Water stored in the profile for the given contents, in
    pub fn stored_water(&self, theta: &LayerVec) -> f64 {
        theta.dot(&self.depth)
    }

    // Depletion below field capacity over the whole profile, in
    pub fn depletion(&self, theta: &LayerVec) -> f64 {
        (self.field_capacity - theta).dot(&self.depth)
    }

    /// Layer water limits for a season, given the (soil-adjusted) maximum root depth.
    ///
    /// Deep layers that roots barely reach get a raised wilting point:
    /// `pwp += (fc - pwp) * (1 - exp(-2.303 * r^4.462))` with `r` the layer
    /// midpoint relative to the maximum root depth, capped at 1.
    pub fn rooted_profile(&self, root_max: f64) -> RootedProfile {
        let centers = self.centers();
        let mut wilting_point = self.wilting_point;
        let mut managed_water = LayerVec::zeros();
        let mut plant_water = LayerVec::zeros();
        for i in 0..LAYERS {
            let relative = if root_max > 0.0 {
                (centers[i] / root_max).min(1.0)
            } else {
                1.0
            };
            let d = (-2.303 * relative.powf(4.462)).exp();
            let fc = self.field_capacity[i];
            managed_water[i] = (fc - wilting_point[i]) * self.depth[i];
            wilting_point[i] += (fc - wilting_point[i]) * (1.0 - d);
            plant_water[i] = (fc - wilting_point[i]) * self.depth[i];
        }
        RootedProfile {
            centers,
            wilting_point,
            managed_water,
            plant_water,
        }
    }
}

// Season-specific layer limits derived from the soil column and root depth cap
#[derive(Debug, Clone, PartialEq)]
pub struct RootedProfile {
    pub centers: LayerVec,
    pub wilting_point: LayerVec, // adjusted
    pub managed_water: LayerVec, // available water with the unadjusted wilting point, in
    pub plant_water: LayerVec,   // available water with the adjusted wilting point, in
}
