use tracing::debug;

use crate::crop::{CropId, IrrigationPlan, IrrigationType, SchedulingMethod, stage_value};
use crate::daily_inputs::{DailyWeather, slot};

// Last day of year a rotation system serves forage and pasture
const ROTATION_LAST_DAY: u32 = 304;
// Forecast rain (in) above which the rain-and-ET forecast method defers irrigation
const FORECAST_RAIN_LIMIT: f64 = 1.0;

// Water delivered by one irrigation, in
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IrrigationEvent {
    pub gross: f64,
    pub net: f64,
    pub infiltration: f64,
}

impl IrrigationEvent {
    fn none() -> Self {
        IrrigationEvent::default()
    }
}

// Field conditions the scheduler decides on
#[derive(Debug, Clone, Copy)]
pub struct FieldStatus<'a> {
    pub day: u32,
    pub gdd: f64,
    pub stage: usize, // growth stage, or cutting index for forage
    pub crop: CropId,
    pub maturity_day: u32,
    pub depletion: f64,         // profile depletion at the end of the previous day, in
    pub managed_depletion: f64, // below field capacity over the management zone, in
    pub allowable: f64,         // allowable depletion of the management zone, in
    pub weather: &'a DailyWeather,
    pub kc: &'a [f64],
    pub forecast_days: usize,
}

/// Irrigation scheduler for one season.
///
/// `schedule` returns `None` on days the irrigation routine is not entered
/// at all, and `Some` (possibly with zero depths) on days it runs; the caller
/// treats every `Some` as a wetting of the profile.
#[derive(Debug, Clone)]
pub struct IrrigationScheduler<'a> {
    plan: &'a IrrigationPlan,
    pub next_day: f64, // earliest day the system can apply again
    pub events: u32,
    pub first_day: Option<u32>,
    historical_index: usize,
}

impl<'a> IrrigationScheduler<'a> {
    pub fn new(plan: &'a IrrigationPlan) -> Self {
        IrrigationScheduler {
            plan,
            next_day: 1.0,
            events: 0,
            first_day: None,
            historical_index: 0,
        }
    }

    pub fn schedule(&mut self, field: &FieldStatus) -> Option<IrrigationEvent> {
        let plan = self.plan;
        if !plan.kind.is_irrigated() {
            return None;
        }
        if plan.method == SchedulingMethod::FixedRotation {
            return self.rotation(field);
        }
        match plan.kind {
            IrrigationType::HistoricalDates => self.historical(field),
            _ => {
                if field.gdd < plan.gdd_start || field.gdd > plan.gdd_stop {
                    return None;
                }
                Some(self.scheduled(field))
            }
        }
    }

    // Recorded irrigations applied on their day with their own efficiency
    fn historical(&mut self, field: &FieldStatus) -> Option<IrrigationEvent> {
        let record = *self.plan.historical.get(self.historical_index)?;
        if record.day != field.day {
            return None;
        }
        self.historical_index += 1;
        self.count(field.day);
        let net = record.gross * record.efficiency;
        debug!(day = field.day, gross = record.gross, net, "historical irrigation");
        Some(IrrigationEvent {
            gross: record.gross,
            net,
            infiltration: net,
        })
    }

    fn rotation(&mut self, field: &FieldStatus) -> Option<IrrigationEvent> {
        let plan = self.plan;
        if field.day < plan.first_delivery_day {
            return None;
        }
        if matches!(field.crop.code(), 10..=12) {
            let blacked_out = plan
                .blackout
                .is_some_and(|b| field.day > b.stop_day && field.day < b.resume_day);
            if field.day > ROTATION_LAST_DAY || blacked_out {
                return None;
            }
        } else if field.day > field.maturity_day {
            return None;
        }
        if self.events == 0 {
            let event = self.scheduled(field);
            if self.events == 0 {
                return None;
            }
            return Some(event);
        }
        if f64::from(field.day) < self.next_day {
            return None;
        }
        Some(self.scheduled(field))
    }

    fn scheduled(&mut self, field: &FieldStatus) -> IrrigationEvent {
        let plan = self.plan;
        let rain_storage = stage_value(&plan.rainfall_allowance, field.stage) * field.allowable;
        match plan.method {
            SchedulingMethod::FullDemand | SchedulingMethod::DemandBased => {
                let today = f64::from(field.day);
                if field.managed_depletion < field.allowable
                    || today + 1.0 < self.next_day
                    || field.gdd < plan.gdd_start
                    || field.gdd >= plan.gdd_stop
                {
                    return IrrigationEvent::none();
                }
                let net = field.depletion - rain_storage;
                self.apply(field, net)
            }
            SchedulingMethod::FixedRotation => {
                let eff = stage_value(&plan.application_efficiency, field.stage);
                let deficit = field.managed_depletion - rain_storage;
                if deficit <= eff * stage_value(&plan.smallest_application, field.stage) {
                    return IrrigationEvent::none();
                }
                let gross = plan.delivery_depth;
                let net = gross * eff;
                let infiltration = if plan.kind <= IrrigationType::Pivot {
                    net
                } else {
                    self.surface_infiltration(gross, field.stage)
                };
                self.count(field.day);
                IrrigationEvent {
                    gross,
                    net,
                    infiltration,
                }
            }
            SchedulingMethod::ForecastRain | SchedulingMethod::ForecastRainAndEt => {
                if f64::from(field.day) < self.next_day || field.gdd < plan.gdd_start || field.gdd >= plan.gdd_stop {
                    return IrrigationEvent::none();
                }
                let window = (field.day + 1)..=(field.day + field.forecast_days as u32);
                let rain: f64 = window.clone().map(|d| field.weather.precip(d)).sum();
                let irrigate = if plan.method == SchedulingMethod::ForecastRainAndEt {
                    let et: f64 = window.map(|d| field.weather.etr(d) * slot(field.kc, d)).sum();
                    debug!(day = field.day, rain, et, "forecast window");
                    field.managed_depletion >= field.allowable && rain <= FORECAST_RAIN_LIMIT
                } else {
                    debug!(day = field.day, rain, "forecast window");
                    field.managed_depletion - rain >= field.allowable
                };
                if !irrigate {
                    return IrrigationEvent::none();
                }
                let net = (field.depletion - rain_storage).max(0.0);
                self.apply(field, net)
            }
        }
    }

    // Gross depth from the net requirement, bounded by the system, then losses and the return interval
    fn apply(&mut self, field: &FieldStatus, net: f64) -> IrrigationEvent {
        let plan = self.plan;
        let stage = field.stage;
        let eff = stage_value(&plan.application_efficiency, stage);
        let mut gross = net / eff;
        if gross < stage_value(&plan.smallest_application, stage) {
            return IrrigationEvent::none();
        }
        gross = gross
            .max(stage_value(&plan.min_application, stage))
            .min(stage_value(&plan.max_application, stage));
        let net = gross * eff;
        let infiltration = if plan.kind == IrrigationType::Furrow {
            self.surface_infiltration(gross, stage)
        } else {
            net
        };
        let rate = plan.system_capacity * stage_value(&plan.operating_fraction, stage);
        if rate > 0.0 {
            self.next_day = self.next_day.max(f64::from(field.day)) + gross / rate;
        }
        self.count(field.day);
        debug!(day = field.day, gross, net, next = self.next_day, "irrigation");
        IrrigationEvent {
            gross,
            net,
            infiltration,
        }
    }

    // Water entering the soil under a surface system, allowing for tailwater reuse
    fn surface_infiltration(&self, gross: f64, stage: usize) -> f64 {
        let reuse = stage_value(&self.plan.reuse_efficiency, stage);
        let runoff = stage_value(&self.plan.runoff_fraction, stage);
        gross * (1.0 - (1.0 - reuse) * runoff)
    }

    fn count(&mut self, day: u32) {
        self.events += 1;
        if self.first_day.is_none() {
            self.first_day = Some(day);
        }
    }
}
