use tracing::{debug, info};

use crate::calendar::calendar_day;
use crate::config::RunOptions;
use crate::crop::{CropId, CropPlan, IrrigationType, SeasonPlan, TillageFlag, stage_value};
use crate::crop_coeff::{cutting_indices, daily_coefficients, padded_cuttings};
use crate::daily_inputs::{DailyWeather, slot};
use crate::drainage::{DrainageDay, Redistribution, drain, infiltrate, redistribute};
use crate::error::{Result, SimError};
use crate::evaporation::{MIN_POTENTIAL_EVAPORATION, SoilEvaporation, potential_evaporation, surface_share};
use crate::irrigation::{FieldStatus, IrrigationScheduler};
use crate::phenology::{PhenologyCalendar, growth_stage};
use crate::root_uptake::{potential_transpiration, transpire};
use crate::root_zone::{management_depletion, root_depth};
use crate::runoff::{antecedent_retention, partition, relative_runoff, seasonal_curve_number};
use crate::soil_hydra::{LAYERS, SoilColumn};
use crate::soil_temp::TemperatureForcing;
use crate::state::{CarryOver, SoilMoistureState};
use crate::summary::{DailySnapshot, DayFlux, SeasonAccumulators, SeasonSummary};
use crate::tables::{CropConstants, ReferenceTables};
use crate::yields::{WaterUse, compute_yield, live_next_season, season_yield, trend_factor};

// Where the evaporation decision sends the rest of the day
#[derive(Debug, Clone, Copy, PartialEq)]
enum Next {
    Transpiration { ep: f64, ep_max: f64 },
    SeasonalTotals { potential: f64 },
    ComputeEt,
    Redistribution,
}

// Read-only inputs of one season
#[derive(Debug, Clone, Copy)]
pub struct SeasonInputs<'a> {
    pub soil: &'a SoilColumn,
    pub tables: &'a ReferenceTables,
    pub plan: &'a CropPlan,
    pub weather: &'a DailyWeather,
    pub year: i32,
    pub options: &'a RunOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonOutcome {
    pub summary: SeasonSummary,
    pub accumulators: SeasonAccumulators,
    pub water_use: WaterUse,
    pub snapshots: Vec<DailySnapshot>,
    pub carry_over: CarryOver,
}

// End-of-day values a snapshot needs beyond the accumulators
#[derive(Debug, Clone, Copy)]
struct DayEnd {
    kc: f64,
    gdd: f64,
    allowable: f64,
    percent_depletion: f64,
    pool: Redistribution,
    drained: DrainageDay,
}

/// Runs one season, from the carry-over state to the next season's carry-over.
///
/// Days run from the later of the season start and the first weather day
/// through the season end. The yield is computed once after the last day.
///
/// # Errors
/// Any error of the daily pipeline aborts the season: `ConvergenceFailure`
/// from the uptake solver, `PhysicalInconsistency` from runoff accounting,
/// `MissingReferenceData` for crop or tillage constants and weather that
/// does not reach the season end.
pub fn simulate_season(inputs: SeasonInputs, carry: &CarryOver) -> Result<SeasonOutcome> {
    let SeasonInputs {
        soil,
        tables,
        plan,
        weather,
        year,
        options,
    } = inputs;
    let constants = tables.crop(plan.crop)?;
    let mut season = SeasonPlan::prepare(plan, soil.awhc_class, carry.live_crop, options.live_condition)?;
    if !weather.covers(season.season_end_day) {
        return Err(SimError::MissingReferenceData(format!(
            "weather ends on day {}, season ends on day {}",
            weather.last_day, season.season_end_day
        )));
    }

    let mut state = SoilMoistureState::start(carry, soil, plan.crop, season.root_max, plan.root.min_depth);
    state.live_crop = season.live_crop;
    let calendar = PhenologyCalendar::compute(weather, constants, plan, &season);
    season.resolve_tillage(&plan.tillage, calendar.maturity_day);
    let kc = daily_coefficients(plan, &season, constants, &calendar, weather, options.legacy_alfalfa_percent);

    info!(
        crop = ?plan.crop,
        year,
        start = calendar.start_day,
        end = calendar.end_day,
        planting = calendar.planting_day,
        maturity = calendar.maturity_day,
        "season start"
    );

    let mut run = SeasonRun::new(inputs, constants, season, calendar, kc, state);
    for jday in run.calendar.start_day..=run.calendar.end_day {
        run.step(jday)?;
    }
    let outcome = run.finish(year);
    info!(
        crop = ?plan.crop,
        year,
        yield_amount = outcome.summary.yield_amount,
        irrigations = outcome.summary.irrigations,
        "season end"
    );
    Ok(outcome)
}

// Per-scenario context threaded through every daily stage
struct SeasonRun<'a> {
    soil: &'a SoilColumn,
    tables: &'a ReferenceTables,
    plan: &'a CropPlan,
    constants: &'a CropConstants,
    weather: &'a DailyWeather,
    options: &'a RunOptions,
    season: SeasonPlan,
    calendar: PhenologyCalendar,
    kc: Vec<f64>,
    cuttings: [u32; 5],
    state: SoilMoistureState,
    evaporation: SoilEvaporation,
    irrigation: IrrigationScheduler<'a>,
    acc: SeasonAccumulators,
    water_use: WaterUse,
    trend: f64,
    wetted_day: u32,
    initial_depletion: f64,
    depletion: f64,         // profile depletion at the end of the last day
    managed_depletion: f64, // management-zone depletion
    stored_water: f64,
    curve_number: f64,
    cut: (usize, usize), // alfalfa cover index and cutting index
    report_counter: u32,
    snapshots: Vec<DailySnapshot>,
}

impl<'a> SeasonRun<'a> {
    fn new(
        inputs: SeasonInputs<'a>,
        constants: &'a CropConstants,
        season: SeasonPlan,
        calendar: PhenologyCalendar,
        kc: Vec<f64>,
        state: SoilMoistureState,
    ) -> Self {
        let soil = inputs.soil;
        let wetted_day = calendar.start_day.saturating_sub(1);
        let depletion = state.profile_depletion(soil);
        SeasonRun {
            soil,
            tables: inputs.tables,
            plan: inputs.plan,
            constants,
            weather: inputs.weather,
            options: inputs.options,
            cuttings: padded_cuttings(inputs.plan),
            trend: trend_factor(inputs.plan.crop, inputs.year, inputs.tables.yield_trend),
            evaporation: SoilEvaporation::new(soil, wetted_day),
            irrigation: IrrigationScheduler::new(&inputs.plan.irrigation),
            acc: SeasonAccumulators::default(),
            water_use: WaterUse::default(),
            wetted_day,
            initial_depletion: depletion,
            depletion,
            managed_depletion: 0.0,
            stored_water: state.stored_water(soil),
            curve_number: 0.0,
            cut: (0, 1),
            report_counter: 0,
            snapshots: Vec::new(),
            season,
            calendar,
            kc,
            state,
        }
    }

    fn step(&mut self, jday: u32) -> Result<()> {
        let weather = self.weather;
        let gdd = self.calendar.gdd_on(jday);
        let mut day = DayFlux {
            jday,
            precip: weather.precip(jday),
            etr: weather.etr(jday),
            natural: self.plan.crop.is_natural(),
            ..DayFlux::default()
        };

        let stage = self.growth_stage(jday, gdd);
        if self.state.zone.needs_update(self.season.root_max) {
            let depth = root_depth(gdd, &self.plan.root, self.season.root_max, self.plan.phenology.flowering);
            self.state
                .zone
                .update(depth, &self.soil.depth, &self.state.profile, self.season.root_mgmt);
        }
        self.effective_precipitation(&mut day, gdd)?;

        self.managed_depletion = self.management_depletion();
        let allowable =
            self.state.zone.managed_water * stage_value(&self.plan.irrigation.allowable_depletion, stage);
        self.irrigate(&mut day, gdd, stage, allowable);

        let kc = slot(&self.kc, jday);
        self.adjust_residue(jday)?;
        self.update_soil_temperature(jday, kc);

        let next = match self.evaporate(&mut day, kc)? {
            Next::Transpiration { ep, ep_max } => self.transpire(&mut day, kc, ep, ep_max)?,
            other => other,
        };
        match next {
            Next::SeasonalTotals { potential } => self.record_water_use(&day, gdd, stage, potential),
            Next::ComputeEt => self.compute_et(&mut day, kc),
            Next::Transpiration { .. } | Next::Redistribution => {}
        }

        let pool = redistribute(&mut self.state.theta, self.soil);
        let drained = drain(jday, self.wetted_day, &pool, &mut self.state.theta, self.soil);
        day.drainage = drained.drained + self.state.clamp_to_limits(self.soil, jday);

        let percent_depletion = if self.state.zone.managed_water > 0.0 {
            self.managed_depletion / self.state.zone.managed_water * 100.0
        } else {
            0.0
        };
        self.depletion = self.state.profile_depletion(self.soil);
        self.managed_depletion = self.management_depletion();
        self.stored_water = self.state.stored_water(self.soil);
        day.depletion = self.depletion;
        day.irrigations = self.irrigation.events;

        let vegetative = gdd <= self.plan.phenology.vegetative;
        let month_start = self.acc.add_day(&day, vegetative)?;
        let report = if month_start {
            self.report_counter = 1;
            true
        } else {
            self.report_day(jday)
        };
        if report && self.options.daily_snapshots {
            let end = DayEnd {
                kc,
                gdd,
                allowable,
                percent_depletion,
                pool,
                drained,
            };
            let snapshot = self.snapshot(&day, &end);
            self.snapshots.push(snapshot);
        }
        Ok(())
    }

    // Forage crops move through their cuttings; everything else through GDD thresholds
    fn growth_stage(&mut self, jday: u32, gdd: f64) -> usize {
        if self.plan.crop.is_forage() {
            self.cut = cutting_indices(jday, &self.cuttings, self.plan.cuttings.len(), self.cut);
        }
        growth_stage(self.plan, gdd, self.cut.1)
    }

    fn management_depletion(&self) -> f64 {
        management_depletion(&self.state.theta, self.soil, &self.state.zone, self.season.root_mgmt)
    }

    fn effective_precipitation(&mut self, day: &mut DayFlux, gdd: f64) -> Result<()> {
        if day.precip <= 0.0 && self.state.snow.water <= 0.0 {
            return Ok(());
        }
        let weather = self.weather;
        let jday = day.jday;
        let snow = self.state.snow.step(
            jday,
            weather.mean_temp(jday),
            weather.max_temp(jday),
            day.precip,
            &self.tables.snow,
        );

        let soil = self.soil;
        let crop = self.plan.crop;
        let residue_class = self.tables.crop(self.state.old_crop)?.runoff_residue;
        let cn = seasonal_curve_number(
            crop,
            self.constants.curve_number(soil.hydro_group),
            self.tables.fallow_curve_number(soil.hydro_group),
            gdd,
            &self.plan.phenology,
            self.state.residue,
            residue_class,
        );
        let retention = antecedent_retention(cn, &self.state.theta, soil, &self.state.profile.wilting_point);
        self.curve_number = retention.curve_number;
        let relative = relative_runoff(retention.s / 25.4, snow.rain);
        let split = partition(jday, snow.rain, relative, self.plan.terrace.as_ref())?;

        day.runoff = split.runoff;
        day.runon = split.runon;
        day.effective_precip = if self.plan.irrigation.kind == IrrigationType::HistoricalDates {
            day.precip
        } else {
            split.effective
        };
        day.infiltration += day.effective_precip;
        self.wetted_day = jday;
        infiltrate(&mut self.state.theta, soil, day.effective_precip);
        Ok(())
    }

    fn irrigate(&mut self, day: &mut DayFlux, gdd: f64, stage: usize, allowable: f64) {
        let field = FieldStatus {
            day: day.jday,
            gdd,
            stage,
            crop: self.plan.crop,
            maturity_day: self.calendar.maturity_day,
            depletion: self.depletion,
            managed_depletion: self.managed_depletion,
            allowable,
            weather: self.weather,
            kc: &self.kc,
            forecast_days: self.tables.forecast_days,
        };
        let Some(event) = self.irrigation.schedule(&field) else {
            return;
        };
        day.gross_irrigation = event.gross;
        day.net_irrigation = event.net;
        day.infiltration += event.infiltration;
        self.wetted_day = day.jday;
        infiltrate(&mut self.state.theta, self.soil, event.infiltration);
    }

    // Residue set at grain/row crop maturity, then reduced by the day's tillage
    fn adjust_residue(&mut self, jday: u32) -> Result<()> {
        let crop = self.plan.crop;
        if !crop.is_grain_or_tuber() {
            return Ok(());
        }
        if jday == self.calendar.maturity_day && (crop != CropId::WinterWheat || self.state.live_crop) {
            let interim = compute_yield(crop, &self.plan.yield_model, &self.water_use, self.trend);
            self.state.residue = interim.yield_amount * self.constants.yield_density * self.constants.residue_ratio;
            self.state.old_crop = crop;
            debug!(day = jday, residue = self.state.residue, "residue from harvest");
        }
        for op in self.season.tillage.iter().filter(|op| op.day == jday as i32) {
            let class = self.tables.crop(self.state.old_crop)?.fragility;
            self.state.residue *= self.tables.tillage_factor(op.code, class)?;
            debug!(day = jday, code = op.code, residue = self.state.residue, "tillage");
        }
        Ok(())
    }

    fn update_soil_temperature(&mut self, jday: u32, kc: f64) {
        let c = self.constants;
        let growing = self.calendar.planting_day <= jday && jday < self.calendar.maturity_day;
        let biomass = if growing && self.water_use.et_max > 0.0 {
            self.plan.yield_model.max_yield * c.yield_density * c.residue_ratio * (kc - c.kc_lower) / c.kc_span()
        } else {
            0.0
        };
        let forcing = TemperatureForcing {
            max_temp: self.weather.max_temp(jday),
            min_temp: self.weather.min_temp(jday),
            solar: self.weather.solar(jday),
            annual_mean_temp: self.weather.annual_mean_temp,
            stored_water: self.stored_water,
            residue: self.state.residue,
            biomass,
            snow_water: self.state.snow.water,
        };
        self.state.temperature.update(&forcing, self.soil);
    }

    fn evaporate(&mut self, day: &mut DayFlux, kc: f64) -> Result<Next> {
        if self.plan.crop.is_natural() {
            return Ok(Next::ComputeEt);
        }
        if day.etr <= 0.0 {
            return Ok(Next::Redistribution);
        }
        let ep_max = surface_share(day.etr, kc, self.constants);
        let ep = potential_evaporation(day.etr, kc, self.constants);
        if ep > MIN_POTENTIAL_EVAPORATION {
            // the residue on the surface belongs to the crop that left it
            let specific_gravity = self.tables.crop(self.state.old_crop)?.residue_specific_gravity;
            let e = self.evaporation.evaporate(
                day.jday,
                ep,
                &self.state.theta,
                self.soil,
                self.state.residue,
                specific_gravity,
            );
            self.state.theta[0] -= e.first / self.soil.depth[0];
            self.state.theta[1] -= e.second / self.soil.depth[1];
            day.evaporation = e.total();
            if self.plan.crop == CropId::SummerFallow {
                return Ok(Next::SeasonalTotals { potential: 0.0 });
            }
        }
        Ok(Next::Transpiration { ep, ep_max })
    }

    fn transpire(&mut self, day: &mut DayFlux, kc: f64, ep: f64, ep_max: f64) -> Result<Next> {
        let potential = potential_transpiration(day.etr, kc, self.constants, ep, ep_max, day.evaporation);
        if potential <= 0.0 {
            return Ok(Next::Redistribution);
        }
        let t = transpire(
            day.jday,
            potential,
            &mut self.state.theta,
            self.soil,
            &self.state.profile,
            &self.state.zone,
            self.plan.root.stress_threshold,
        )?;
        day.transpiration = t.actual;
        Ok(Next::SeasonalTotals { potential })
    }

    // Stage sums for the yield model: forage by cutting, grain and tuber crops between vegetative and yield formation
    fn record_water_use(&mut self, day: &DayFlux, gdd: f64, stage: usize, potential: f64) {
        let crop = self.plan.crop;
        if !crop.is_grain_tuber_or_forage() {
            return;
        }
        let p = &self.plan.phenology;
        if crop.is_forage() || (p.vegetative <= gdd && gdd <= p.yield_formation) {
            let stage = if crop.is_grain_or_tuber() { stage } else { self.cut.1 };
            self.water_use.record(stage, day.evaporation, potential, day.transpiration);
        }
    }

    // Wetlands and open water: ET at the crop rate from a profile held at field capacity
    fn compute_et(&mut self, day: &mut DayFlux, kc: f64) {
        if self.plan.crop.is_natural() {
            day.et = kc * day.etr;
            self.state.theta = self.soil.field_capacity;
        }
    }

    // Fixed phenological dates first, then the rolling interval
    fn report_day(&mut self, jday: u32) -> bool {
        let crop = self.plan.crop;
        let cal = &self.calendar;
        let fixed = if crop.is_forage() {
            [cal.planting_day, cal.end_day, self.plan.cutting_day(self.cut.1)].contains(&jday)
        } else if crop.is_pasture() {
            [cal.effective_cover_day, cal.maturity_day].contains(&jday)
        } else if crop.is_grain_or_tuber() {
            [
                cal.planting_day,
                cal.effective_cover_day,
                cal.ripening_day,
                cal.flowering_day,
                cal.maturity_day,
            ]
            .contains(&jday)
        } else {
            false
        };
        if fixed {
            return true;
        }
        if self.report_counter == self.options.report_interval {
            self.report_counter = 0;
        }
        self.report_counter += 1;
        self.report_counter == 1
    }

    fn snapshot(&self, day: &DayFlux, end: &DayEnd) -> DailySnapshot {
        let (month, day_of_month) = calendar_day(day.jday);
        let totals = &self.acc.season;
        let mut theta = [0.0; LAYERS];
        theta.copy_from_slice(self.state.theta.as_slice());
        let mut soil_temperature = [0.0; LAYERS];
        soil_temperature.copy_from_slice(self.state.temperature.layers.as_slice());
        let distributed_water = if end.pool.distributed > 0.0 {
            (1.0 - end.drained.fraction) * end.pool.extra / end.pool.distributed
        } else {
            0.0
        };
        DailySnapshot {
            jday: day.jday,
            month,
            day: day_of_month,
            etr: day.etr,
            cumulative_etr: totals.all.etr,
            cumulative_evaporation: totals.all.evaporation,
            cumulative_transpiration: totals.all.transpiration,
            cumulative_et: totals.all.et,
            net_irrigation: totals.net_irrigation,
            gross_irrigation: totals.gross_irrigation,
            precip: totals.all.precip,
            effective_precip: totals.effective_precip,
            snow_water: self.state.snow.water,
            cumulative_runon: totals.runon,
            curve_number: self.curve_number,
            residue: self.state.residue,
            gdd: end.gdd,
            drainage: totals.all.drainage,
            kc: end.kc,
            depletion: self.depletion,
            managed_depletion: self.managed_depletion,
            percent_depletion: end.percent_depletion,
            root_depth: self.state.zone.depth,
            plant_water: self.state.zone.plant_water,
            managed_water: self.state.zone.managed_water,
            stored_water: self.stored_water,
            drained_fraction: end.drained.fraction,
            extra_water: end.pool.extra,
            distributed_water,
            day_et: day.evaporation + day.transpiration,
            day_drainage: day.drainage,
            day_net_irrigation: day.net_irrigation,
            day_infiltration: day.infiltration,
            day_runon: day.runon,
            allowable_depletion: end.allowable,
            theta,
            soil_temperature,
        }
    }

    fn finish(self, year: i32) -> SeasonOutcome {
        let plan = self.plan;
        let crop = plan.crop;
        let season = &self.season;
        let result = season_yield(crop, season.tillage_flag, &plan.yield_model, &self.water_use, self.trend);
        let dry_land = plan.irrigation.kind == IrrigationType::DryLand;
        let live_next = live_next_season(crop, dry_land, season.tillage_flag, self.state.live_crop);
        // a dry-land rotation reports the fallow half of the cycle as summer fallow
        let report_crop = if live_next
            && crop == CropId::WinterWheat
            && season.tillage_flag != TillageFlag::Continuous
            && dry_land
        {
            CropId::SummerFallow
        } else {
            crop
        };
        let cal = &self.calendar;
        let summary = SeasonSummary {
            crop,
            report_crop,
            year,
            yield_amount: result.yield_amount,
            b_value: result.b_value,
            yield_ratio: result.ratio,
            et_season: self.acc.season.all.et,
            et_yield: self.water_use.et_yield,
            et_max: self.water_use.et_max,
            transpiration_deficit: self.water_use.transpiration_deficit(),
            gross_irrigation: self.acc.season.gross_irrigation,
            net_irrigation: self.acc.season.net_irrigation,
            irrigations: self.irrigation.events,
            precip: self.acc.season.all.precip,
            effective_precip: self.acc.season.effective_precip,
            drainage: self.acc.season.all.drainage,
            initial_depletion: self.initial_depletion,
            final_depletion: self.depletion,
            planting_day: cal.planting_day,
            first_irrigation_day: self.irrigation.first_day,
            effective_cover_day: cal.effective_cover_day,
            maturity_day: cal.maturity_day,
            freeze_day: cal.freeze_day(),
            runoff: self.acc.runoff_between(season.season_start_day, season.season_end_day),
            totals: self.acc.season,
        };
        let carry_over = self.state.carry_over(crop, live_next);
        SeasonOutcome {
            summary,
            accumulators: self.acc,
            water_use: self.water_use,
            snapshots: self.snapshots,
            carry_over,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soil_hydra::LayerVec;
    use crate::test_support::{flat_weather, plan, soil, tables};
    use approx::assert_relative_eq;

    fn run(plan: &CropPlan, weather: &DailyWeather, carry: &CarryOver) -> SeasonOutcome {
        run_with(&tables(), plan, weather, carry)
    }

    fn run_with(t: &ReferenceTables, plan: &CropPlan, weather: &DailyWeather, carry: &CarryOver) -> SeasonOutcome {
        let column = soil(621);
        let options = RunOptions::default();
        let inputs = SeasonInputs {
            soil: &column,
            tables: t,
            plan,
            weather,
            year: 2001,
            options: &options,
        };
        simulate_season(inputs, carry).unwrap()
    }

    #[test]
    fn water_balance_closes_over_the_season() {
        let p = plan(CropId::Corn);
        let w = flat_weather(0.1);
        let carry = CarryOver::default();
        let column = soil(621);
        let before = column.stored_water(&LayerVec::from_row_slice(&carry.theta));
        let out = run(&p, &w, &carry);
        let after = column.stored_water(&LayerVec::from_row_slice(&out.carry_over.theta));
        let s = &out.summary.totals;
        let inflow = s.effective_precip + s.net_irrigation;
        let outflow = s.all.evaporation + s.all.transpiration + s.all.drainage;
        assert_relative_eq!(after - before, inflow - outflow, epsilon = 1e-6);
    }

    #[test]
    fn report_days_include_month_starts_and_phenology() {
        let p = plan(CropId::Corn);
        let out = run(&p, &flat_weather(0.0), &CarryOver::default());
        let days: Vec<u32> = out.snapshots.iter().map(|s| s.jday).collect();
        assert!(days.contains(&32));
        assert!(days.contains(&out.summary.planting_day));
        assert!(days.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn weather_must_reach_season_end() {
        let p = plan(CropId::Corn);
        let mut w = flat_weather(0.0);
        w.last_day = 200;
        let column = soil(621);
        let t = tables();
        let options = RunOptions::default();
        let inputs = SeasonInputs {
            soil: &column,
            tables: &t,
            plan: &p,
            weather: &w,
            year: 2001,
            options: &options,
        };
        assert!(matches!(
            simulate_season(inputs, &CarryOver::default()),
            Err(SimError::MissingReferenceData(_))
        ));
    }

    #[test]
    fn wheat_rotation_alternates_live_crop() {
        let p = plan(CropId::WinterWheat);
        let w = flat_weather(0.05);
        let dead = CarryOver::default();
        let first = run(&p, &w, &dead);
        assert!(first.carry_over.live_crop);
        assert_eq!(first.summary.yield_amount, 0.0);
        assert_eq!(first.summary.report_crop, CropId::SummerFallow);
        let second = run(&p, &w, &first.carry_over);
        assert!(!second.carry_over.live_crop);
    }

    fn with_specific_gravity(soybeans: f64, corn: f64) -> ReferenceTables {
        let mut t = tables();
        for c in t.crops.iter_mut() {
            match c.crop {
                CropId::Soybeans => c.residue_specific_gravity = soybeans,
                CropId::Corn => c.residue_specific_gravity = corn,
                _ => {}
            }
        }
        t
    }

    // Jan-Apr evaporation, before the corn crop leaves any residue
    fn spring_evaporation(out: &SeasonOutcome) -> f64 {
        out.accumulators.months[..4].iter().map(|m| m.evaporation).sum()
    }

    #[test]
    fn residue_evaporation_uses_the_previous_crop() {
        let p = plan(CropId::Corn);
        let w = flat_weather(0.1);
        let carry = CarryOver {
            crop: CropId::Soybeans,
            residue: 4000.0,
            ..CarryOver::default()
        };
        let base = run_with(&with_specific_gravity(0.3, 0.5), &p, &w, &carry);
        let corn_changed = run_with(&with_specific_gravity(0.3, 1.5), &p, &w, &carry);
        let soybeans_changed = run_with(&with_specific_gravity(1.5, 0.5), &p, &w, &carry);

        assert_relative_eq!(spring_evaporation(&base), spring_evaporation(&corn_changed), epsilon = 1e-12);
        // denser residue is thinner on the ground and shades the surface less
        assert!(spring_evaporation(&soybeans_changed) > spring_evaporation(&base) + 1e-3);
    }
}
