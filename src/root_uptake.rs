use tracing::trace;

use crate::error::{Result, SimError};
use crate::root_zone::RootZone;
use crate::soil_hydra::{LAYERS, LayerVec, RootedProfile, SoilColumn};
use crate::tables::CropConstants;

// Bounds on the uptake reallocation loop
pub const MAX_UPTAKE_PASSES: usize = 20;
pub const UPTAKE_TOLERANCE: f64 = 0.001;

/**
Potential transpiration for the day.

While the soil is evaporating less than its potential, the crop makes up part
of the difference through the uptake ratio `kc_lower / (kc_upper - kc_lower)`.

# Arguments
* `etr` - Reference ET, in.
* `kc` - Crop coefficient.
* `constants` - Crop constants for the Kc bounds.
* `ep` - Potential evaporation after any residue reduction, in.
* `ep_max` - Potential evaporation before reduction, in.
* `evaporation` - Actual soil evaporation, in.
*/
pub fn potential_transpiration(
    etr: f64,
    kc: f64,
    constants: &CropConstants,
    ep: f64,
    ep_max: f64,
    evaporation: f64,
) -> f64 {
    let mut tp = etr * (kc - constants.kc_lower);
    if ep > 0.0 && ep_max > 0.0 {
        let uptake_ratio = constants.kc_lower / constants.kc_span();
        tp *= 1.0 + uptake_ratio * (ep_max - evaporation) / ep_max;
    }
    tp
}

// 1 above the stress threshold (percent available), linear down to 0 below it
pub fn stress_factor(available_percent: f64, threshold: f64) -> f64 {
    if available_percent > threshold {
        1.0
    } else if threshold > 0.0 {
        available_percent / threshold
    } else {
        1.0
    }
}

// Depletion state of the rooted layers before uptake
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStatus {
    pub depleted_fraction: LayerVec,
    pub available: f64, // water above the wilting point in the root zone, in
    pub weight: f64,    // sum of root weights of layers with water left
    pub depletion: f64, // root-zone depletion below field capacity, in
}

pub fn layer_status(theta: &LayerVec, soil: &SoilColumn, profile: &RootedProfile, zone: &RootZone) -> LayerStatus {
    let mut status = LayerStatus {
        depleted_fraction: LayerVec::zeros(),
        available: 0.0,
        weight: 0.0,
        depletion: 0.0,
    };
    for i in 0..LAYERS {
        let p = zone.fraction[i];
        let d = soil.depth[i];
        let depl = ((soil.field_capacity[i] - theta[i]) * d * p).max(0.0);
        status.depletion += depl;
        if p > 0.0 {
            let frac = if profile.plant_water[i] > 0.0 {
                (depl / (profile.plant_water[i] * p)).min(1.0)
            } else {
                1.0
            };
            status.depleted_fraction[i] = frac;
            if theta[i] > profile.wilting_point[i] {
                status.available += (theta[i] - profile.wilting_point[i]) * d * p;
                status.weight += zone.distribution[i] * (1.0 - frac);
            }
        }
    }
    status
}

// Result of removing a transpiration demand from the profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UptakeOutcome {
    pub transpired: f64,
    pub depletion: f64,
    pub passes: usize,
}

/**
Removes `demand` from the rooted layers.

Demand is shared out by root weight and remaining water. A layer that cannot
supply its share is taken to its wilting floor and the shortfall is shared
again among the others, until the unmet demand is below the tolerance. When
the profile holds no more than the demand, every layer goes to its floor in
one step and only the available water is transpired.

# Errors
`ConvergenceFailure` when the shortfall is still open after the pass limit or
no layer has root weight left to take it.
*/
pub fn solve_uptake(
    day: u32,
    demand: f64,
    theta: &mut LayerVec,
    soil: &SoilColumn,
    profile: &RootedProfile,
    zone: &RootZone,
    status: &LayerStatus,
) -> Result<UptakeOutcome> {
    let pwp = &profile.wilting_point;
    if status.available <= demand {
        for i in 0..LAYERS {
            let p = zone.fraction[i];
            theta[i] = pwp[i] * p + theta[i] * (1.0 - p);
        }
        return Ok(UptakeOutcome {
            transpired: status.available,
            depletion: zone.plant_water,
            passes: 1,
        });
    }

    let mut depleted = status.depleted_fraction;
    let mut weight = status.weight;
    let mut remaining = demand;
    let mut used = 0.0;
    let mut depletion: f64;
    let mut passes = 0;
    loop {
        passes += 1;
        if passes > MAX_UPTAKE_PASSES || weight <= 0.0 {
            return Err(SimError::ConvergenceFailure {
                day,
                residual: remaining,
            });
        }
        let mut next_weight = 0.0;
        let mut limited = false;
        depletion = 0.0;
        for i in 0..LAYERS {
            let p = zone.fraction[i];
            let d = soil.depth[i];
            let share = (remaining * (1.0 - depleted[i]) * zone.distribution[i] / weight).max(0.0);
            let water = ((theta[i] - pwp[i]) * d * p).max(0.0);
            if share > water {
                used += water;
                theta[i] = pwp[i] * p + theta[i] * (1.0 - p);
                limited = true;
            } else {
                used += share;
                theta[i] -= share / d;
            }
            let gap = (soil.field_capacity[i] - theta[i]) * d;
            depleted[i] = if profile.plant_water[i] > 0.0 {
                (gap / profile.plant_water[i]).min(1.0)
            } else {
                1.0
            };
            depletion += gap * p;
            next_weight += zone.distribution[i] * (1.0 - depleted[i]);
        }
        trace!(day, passes, used, "uptake pass");
        if !limited {
            break;
        }
        weight = next_weight;
        remaining = demand - used;
        if remaining.abs() < UPTAKE_TOLERANCE {
            break;
        }
    }
    Ok(UptakeOutcome {
        transpired: demand,
        depletion,
        passes,
    })
}

// One day of transpiration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transpiration {
    pub potential: f64,
    pub actual: f64,
    pub stress: f64,
    pub depletion: f64,
}

/// Stress-limited transpiration taken from the rooted layers.
///
/// `potential` must already be positive; days without demand skip this call.
pub fn transpire(
    day: u32,
    potential: f64,
    theta: &mut LayerVec,
    soil: &SoilColumn,
    profile: &RootedProfile,
    zone: &RootZone,
    stress_threshold: f64,
) -> Result<Transpiration> {
    let status = layer_status(theta, soil, profile, zone);
    let available_percent = if zone.plant_water > 0.0 {
        ((1.0 - status.depletion / zone.plant_water) * 100.0).max(0.0)
    } else {
        0.0
    };
    let stress = stress_factor(available_percent, stress_threshold);
    let demand = potential * stress;
    let mut out = Transpiration {
        potential,
        actual: demand,
        stress,
        depletion: status.depletion,
    };
    if demand > 0.0 {
        let uptake = solve_uptake(day, demand, theta, soil, profile, zone, &status)?;
        out.actual = uptake.transpired;
        out.depletion = uptake.depletion;
    }
    Ok(out)
}
