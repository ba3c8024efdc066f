use crate::calendar::DAY_SLOTS;
use crate::crop::{CropPlan, SeasonPlan};
use crate::daily_inputs::{DailyWeather, slot};
use crate::tables::CropConstants;

// First day of year that can hold a killing freeze, and its minimum temperature (F)
const FREEZE_SEARCH_START: u32 = 200;
const FREEZE_TEMP: f64 = 26.0;

// Daily degree days with max/min clamped to [base, ceiling], floored at zero
pub fn daily_gdd(tmax: f64, tmin: f64, base: f64, ceiling: f64) -> f64 {
    let t1 = tmax.min(ceiling).max(base);
    let t2 = tmin.max(base).min(ceiling);
    ((t1 + t2) / 2.0 - base).max(0.0)
}

// Cumulative GDD for each day slot, accumulated from planting to season end
#[derive(Debug, Clone, PartialEq)]
pub struct GddSeries {
    pub cumulative: Vec<f64>,
    pub last_increment: f64,
    pub freeze_day: u32,
}

pub fn accumulate(
    weather: &DailyWeather,
    base: f64,
    ceiling: f64,
    planting_day: u32,
    end_day: u32,
) -> GddSeries {
    let mut cumulative = vec![0.0; DAY_SLOTS];
    let mut last_increment = 0.0;
    let mut freeze_day = 0;
    let first = planting_day.max(1);
    for day in first..=end_day.min(DAY_SLOTS as u32) {
        let i = day as usize - 1;
        last_increment = daily_gdd(weather.max_temp(day), weather.min_temp(day), base, ceiling);
        let previous = if i > 0 { cumulative[i - 1] } else { 0.0 };
        cumulative[i] = previous + last_increment;
        if freeze_day == 0 && day >= FREEZE_SEARCH_START && weather.min_temp(day) < FREEZE_TEMP {
            freeze_day = day;
        }
    }
    if freeze_day == 0 {
        freeze_day = end_day;
    }
    GddSeries {
        cumulative,
        last_increment,
        freeze_day,
    }
}

// First day each threshold is reached, in one forward pass; unresolved thresholds get end_day + 1
pub fn threshold_days(cumulative: &[f64], planting_day: u32, end_day: u32, thresholds: &[f64]) -> Vec<u32> {
    let mut found = vec![end_day + 1; thresholds.len()];
    let mut remaining: Vec<usize> = (0..thresholds.len()).collect();
    for day in planting_day.max(1)..=end_day {
        if remaining.is_empty() {
            break;
        }
        let gdd = slot(cumulative, day);
        remaining.retain(|&j| {
            if gdd >= thresholds[j] {
                found[j] = day;
                false
            } else {
                true
            }
        });
    }
    found
}

// Growth stage for the stage-indexed tables; forage crops use the cutting index
pub fn growth_stage(plan: &CropPlan, gdd: f64, cut_index: usize) -> usize {
    let p = &plan.phenology;
    if plan.crop.is_grain_tuber_or_forage() {
        if plan.crop.is_forage() {
            return cut_index;
        }
        if gdd > p.ripening {
            3
        } else if gdd > p.flowering {
            2
        } else {
            1
        }
    } else if gdd > p.effective_cover {
        2
    } else {
        1
    }
}

/// Phenological calendar of one season: cumulative GDD plus the dates derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct PhenologyCalendar {
    pub gdd: GddSeries,
    pub start_day: u32, // first simulated day, never before the weather record
    pub planting_day: u32,
    pub end_day: u32,
    pub vegetative_day: u32,
    pub effective_cover_day: u32,
    pub flowering_day: u32,
    pub ripening_day: u32,
    pub maturity_day: u32,
}

impl PhenologyCalendar {
    pub fn compute(
        weather: &DailyWeather,
        constants: &CropConstants,
        plan: &CropPlan,
        season: &SeasonPlan,
    ) -> Self {
        let gdd = accumulate(
            weather,
            constants.base_temp,
            constants.ceiling_temp,
            season.planting_day,
            season.season_end_day,
        );
        let start_day = season.season_start_day.max(weather.first_day);
        let (plant, end) = (season.planting_day, season.season_end_day);
        let p = &plan.phenology;
        let unresolved = end + 1;

        let mut cal = PhenologyCalendar {
            start_day,
            planting_day: plant,
            end_day: end,
            vegetative_day: unresolved,
            effective_cover_day: unresolved,
            flowering_day: unresolved,
            ripening_day: unresolved,
            maturity_day: unresolved,
            gdd,
        };
        if plan.crop.uses_generic_phenology() {
            cal.maturity_day = cal.gdd.freeze_day;
            cal.effective_cover_day =
                threshold_days(&cal.gdd.cumulative, plant, end, &[p.effective_cover])[0];
        } else {
            let days = threshold_days(
                &cal.gdd.cumulative,
                plant,
                end,
                &[
                    p.vegetative,
                    p.effective_cover,
                    p.flowering,
                    p.ripening,
                    p.maturity,
                ],
            );
            cal.vegetative_day = days[0];
            cal.effective_cover_day = days[1];
            cal.flowering_day = days[2];
            cal.ripening_day = days[3];
            cal.maturity_day = days[4].min(cal.gdd.freeze_day);
        }
        cal
    }

    // Cumulative GDD at the end of a day
    pub fn gdd_on(&self, jday: u32) -> f64 {
        slot(&self.gdd.cumulative, jday)
    }

    pub fn freeze_day(&self) -> u32 {
        self.gdd.freeze_day
    }
}
