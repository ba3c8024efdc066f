use serde::{Deserialize, Serialize};

use crate::crop::{CropId, TillageFlag, YieldMethod, YieldModel};

// Linear yield trend by calendar year, for crop codes 1..=11
const TREND_INTERCEPT: [f64; 11] = [
    -22.963, -13.156, -18.249, 1.000, 1.000, -11.008, -22.963, -24.578, -17.165, -12.562, -20.334,
];
const TREND_SLOPE: [f64; 11] = [
    0.01199, 0.00708, 0.00963, 0.0, 0.0, 0.00601, 0.01199, 0.01280, 0.00909, 0.00678, 0.01067,
];

// Growth stages with their own transpiration accumulators
pub const YIELD_STAGES: usize = 5;

// Multiplier on the maximum yield for the simulated year; 1 without trend adjustment
pub fn trend_factor(crop: CropId, year: i32, trend: bool) -> f64 {
    if !trend {
        return 1.0;
    }
    match (crop.code() as usize).checked_sub(1) {
        Some(i) if i < TREND_INTERCEPT.len() => (TREND_INTERCEPT[i] + TREND_SLOPE[i] * f64::from(year)).max(0.0),
        _ => 1.0,
    }
}

// Seasonal transpiration and ET sums the yield is computed from
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WaterUse {
    pub potential_by_stage: [f64; YIELD_STAGES],
    pub deficit_by_stage: [f64; YIELD_STAGES],
    pub et_yield: f64, // actual ET during yield formation
    pub et_max: f64,   // potential ET during yield formation
}

impl WaterUse {
    pub fn record(&mut self, stage: usize, evaporation: f64, potential_t: f64, actual_t: f64) {
        let i = stage.saturating_sub(1).min(YIELD_STAGES - 1);
        self.potential_by_stage[i] += potential_t;
        self.deficit_by_stage[i] += potential_t - actual_t;
        self.et_yield += evaporation + actual_t;
        self.et_max += evaporation + potential_t;
    }

    pub fn transpiration_deficit(&self) -> f64 {
        self.deficit_by_stage.iter().sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct YieldResult {
    pub yield_amount: f64,
    pub b_value: f64,
    pub ratio: f64,
}

/// Yield from the season's water use.
///
/// Grain, tuber and forage crops lose yield in proportion to their
/// transpiration deficit or ET shortfall; other crops get the trended maximum.
pub fn compute_yield(crop: CropId, model: &YieldModel, use_: &WaterUse, trend: f64) -> YieldResult {
    let max = trend * model.max_yield;
    let coeff = model.coefficient;
    let mut amount = if crop.requires_yield_adjustment() {
        match model.method {
            YieldMethod::TranspirationDeficit => {
                let potential: f64 = use_.potential_by_stage.iter().sum();
                let ratio = if potential > 0.0 {
                    use_.transpiration_deficit() / potential
                } else {
                    0.0
                };
                max * (1.0 - coeff * ratio)
            }
            YieldMethod::EtRatio => {
                let ratio = if use_.et_max > 0.0 { use_.et_yield / use_.et_max } else { 1.0 };
                max * ((1.0 - coeff) + coeff * ratio)
            }
        }
    } else {
        max
    };
    amount = amount.max(0.0);
    YieldResult {
        yield_amount: amount,
        b_value: if use_.et_max == 0.0 {
            f64::INFINITY
        } else {
            max * coeff / use_.et_max
        },
        ratio: if max > 0.0 { amount / max } else { 0.0 },
    }
}

// Post-season yield; zero when no crop was grown
pub fn season_yield(crop: CropId, flag: TillageFlag, model: &YieldModel, use_: &WaterUse, trend: f64) -> YieldResult {
    if flag.crop_active() {
        compute_yield(crop, model, use_, trend)
    } else {
        YieldResult::default()
    }
}

// Whether a crop is alive at the start of next season
pub fn live_next_season(crop: CropId, dry_land: bool, flag: TillageFlag, live_now: bool) -> bool {
    if crop != CropId::WinterWheat {
        return false;
    }
    // dry-land wheat/fallow rotations alternate
    if dry_land && flag < TillageFlag::Continuous {
        !live_now
    } else {
        true
    }
}
