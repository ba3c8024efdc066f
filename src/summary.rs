use serde::Serialize;

use crate::calendar::calendar_day;
use crate::crop::CropId;
use crate::error::{Result, SimError};
use crate::soil_hydra::LAYERS;

pub const WEEKS: usize = 52;
pub const MONTHS: usize = 12;

// Last day of the spring off-season and first day of the fall one
const OFF_SEASON_SPRING_END: u32 = 121;
const OFF_SEASON_FALL_START: u32 = 274;

// Water moved on one simulated day, in
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DayFlux {
    pub jday: u32,
    pub evaporation: f64,
    pub transpiration: f64,
    pub et: f64, // open-water / natural-crop ET; zero for other crops
    pub precip: f64,
    pub effective_precip: f64,
    pub etr: f64,
    pub runon: f64,
    pub runoff: f64,
    pub drainage: f64,
    pub net_irrigation: f64,
    pub gross_irrigation: f64,
    pub infiltration: f64,
    pub depletion: f64, // end-of-day profile depletion
    pub irrigations: u32,
    pub natural: bool,
}

impl DayFlux {
    // ET as reported: the ET of a natural crop, soil evaporation plus transpiration otherwise
    pub fn reported_et(&self) -> f64 {
        if self.natural {
            self.et
        } else {
            self.evaporation + self.transpiration
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WeeklyTotals {
    pub et: f64,
    pub effective_precip: f64,
    pub etr: f64,
    pub net_irrigation: f64,
    pub gross_irrigation: f64,
    pub precip: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MonthlyTotals {
    pub evaporation: f64,
    pub transpiration: f64,
    pub et: f64,
    pub effective_precip: f64,
    pub etr: f64,
    pub precip: f64,
    pub runon: f64,
    pub runoff: f64,
    pub infiltration: f64,
    pub drainage: f64,
    pub net_irrigation: f64,
    pub gross_irrigation: f64,
    pub depletion: f64, // profile depletion on the first of the month
    pub irrigations: u32, // season irrigation count at the end of the month
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PeriodTotals {
    pub evaporation: f64,
    pub transpiration: f64,
    pub et: f64,
    pub precip: f64,
    pub etr: f64,
    pub drainage: f64,
}

impl PeriodTotals {
    fn add(&mut self, day: &DayFlux) {
        self.evaporation += day.evaporation;
        self.transpiration += day.transpiration;
        self.et += day.reported_et();
        self.precip += day.precip;
        self.etr += day.etr;
        self.drainage += day.drainage;
    }

    fn minus(&self, other: &PeriodTotals) -> PeriodTotals {
        PeriodTotals {
            evaporation: self.evaporation - other.evaporation,
            transpiration: self.transpiration - other.transpiration,
            et: self.et - other.et,
            precip: self.precip - other.precip,
            etr: self.etr - other.etr,
            drainage: self.drainage - other.drainage,
        }
    }
}

// Whole-season scalars
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SeasonTotals {
    pub all: PeriodTotals,
    pub off_season: PeriodTotals, // before May and after September
    pub effective_precip: f64,
    pub runon: f64,
    pub gross_irrigation: f64,
    pub net_irrigation: f64,
    pub vegetative_evaporation: f64,
    pub vegetative_transpiration: f64,
}

impl SeasonTotals {
    pub fn may_to_september(&self) -> PeriodTotals {
        self.all.minus(&self.off_season)
    }
}

/// Weekly, monthly and seasonal accumulators of one season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonAccumulators {
    pub weeks: Vec<WeeklyTotals>,
    pub months: [MonthlyTotals; MONTHS],
    pub season: SeasonTotals,
}

impl Default for SeasonAccumulators {
    fn default() -> Self {
        SeasonAccumulators {
            weeks: vec![WeeklyTotals::default(); WEEKS],
            months: [MonthlyTotals::default(); MONTHS],
            season: SeasonTotals::default(),
        }
    }
}

impl SeasonAccumulators {
    /// Adds one day to every accumulator.
    ///
    /// Returns `true` on the first day of a month, which is always a report day.
    ///
    /// # Errors
    /// `PhysicalInconsistency` when the month's runoff goes negative.
    pub fn add_day(&mut self, day: &DayFlux, vegetative: bool) -> Result<bool> {
        self.add_season(day, vegetative);
        self.add_week(day);
        self.add_month(day)
    }

    fn add_season(&mut self, day: &DayFlux, vegetative: bool) {
        let s = &mut self.season;
        s.all.add(day);
        if day.jday <= OFF_SEASON_SPRING_END || day.jday >= OFF_SEASON_FALL_START {
            s.off_season.add(day);
        }
        s.effective_precip += day.effective_precip;
        s.runon += day.runon;
        s.gross_irrigation += day.gross_irrigation;
        s.net_irrigation += day.net_irrigation;
        if vegetative {
            s.vegetative_evaporation += day.evaporation;
            s.vegetative_transpiration += day.transpiration;
        }
    }

    fn add_week(&mut self, day: &DayFlux) {
        // days 365 and 366 fold into the last week
        let i = ((day.jday.max(1) - 1) / 7).min(WEEKS as u32 - 1) as usize;
        let w = &mut self.weeks[i];
        w.et += day.evaporation + day.transpiration;
        w.effective_precip += day.effective_precip;
        w.etr += day.etr;
        w.net_irrigation += day.net_irrigation;
        w.gross_irrigation += day.gross_irrigation;
        w.precip += day.precip;
    }

    fn add_month(&mut self, day: &DayFlux) -> Result<bool> {
        let (month, day_of_month) = calendar_day(day.jday);
        let Some(m) = (month as usize).checked_sub(1).and_then(|i| self.months.get_mut(i)) else {
            return Err(SimError::InvalidInput(format!("day {} is outside the calendar", day.jday)));
        };
        m.evaporation += day.evaporation;
        m.transpiration += day.transpiration;
        m.effective_precip += day.effective_precip;
        m.etr += day.etr;
        m.precip += day.precip;
        m.runon += day.runon;
        m.runoff += day.runoff;
        if m.runoff < 0.0 {
            return Err(SimError::PhysicalInconsistency {
                day: day.jday,
                detail: format!("monthly runoff fell to {:.4} in", m.runoff),
            });
        }
        if day.natural {
            m.et += day.et;
        } else {
            m.et = m.evaporation + m.transpiration;
        }
        m.drainage += day.drainage;
        m.gross_irrigation += day.gross_irrigation;
        m.net_irrigation += day.net_irrigation;
        m.irrigations = day.irrigations;
        m.infiltration += day.infiltration;
        if day_of_month <= 1 {
            m.depletion = day.depletion;
            return Ok(true);
        }
        Ok(false)
    }

    // Runoff summed over the months spanned by the season
    pub fn runoff_between(&self, first_day: u32, last_day: u32) -> f64 {
        let first = calendar_day(first_day).0.max(1) as usize;
        let last = (calendar_day(last_day).0 as usize).min(MONTHS);
        if first > last {
            return 0.0;
        }
        self.months[first - 1..last].iter().map(|m| m.runoff).sum()
    }
}

/// End-of-season record for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonSummary {
    pub crop: CropId,
    pub report_crop: CropId, // live dry-land wheat is reported as summer fallow
    pub year: i32,
    pub yield_amount: f64,
    pub b_value: f64,
    pub yield_ratio: f64,
    pub et_season: f64,
    pub et_yield: f64,
    pub et_max: f64,
    pub transpiration_deficit: f64,
    pub gross_irrigation: f64,
    pub net_irrigation: f64,
    pub irrigations: u32,
    pub precip: f64,
    pub effective_precip: f64,
    pub drainage: f64,
    pub initial_depletion: f64,
    pub final_depletion: f64,
    pub planting_day: u32,
    pub first_irrigation_day: Option<u32>,
    pub effective_cover_day: u32,
    pub maturity_day: u32,
    pub freeze_day: u32,
    pub runoff: f64,
    pub totals: SeasonTotals,
}

// State of the field on a report day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySnapshot {
    pub jday: u32,
    pub month: u32,
    pub day: u32,
    pub etr: f64,
    pub cumulative_etr: f64,
    pub cumulative_evaporation: f64,
    pub cumulative_transpiration: f64,
    pub cumulative_et: f64,
    pub net_irrigation: f64,
    pub gross_irrigation: f64,
    pub precip: f64,
    pub effective_precip: f64,
    pub snow_water: f64,
    pub cumulative_runon: f64,
    pub curve_number: f64,
    pub residue: f64,
    pub gdd: f64,
    pub drainage: f64,
    pub kc: f64,
    pub depletion: f64,
    pub managed_depletion: f64,
    pub percent_depletion: f64,
    pub root_depth: f64,
    pub plant_water: f64,
    pub managed_water: f64,
    pub stored_water: f64,
    pub drained_fraction: f64,
    pub extra_water: f64,
    pub distributed_water: f64, // per inch of wetted depth
    pub day_et: f64,
    pub day_drainage: f64,
    pub day_net_irrigation: f64,
    pub day_infiltration: f64,
    pub day_runon: f64,
    pub allowable_depletion: f64,
    pub theta: [f64; LAYERS],
    pub soil_temperature: [f64; LAYERS],
}
