pub mod calendar;
pub mod config;
pub mod crop;
pub mod crop_coeff;
pub mod daily_inputs;
pub mod drainage;
pub mod error;
pub mod evaporation;
pub mod irrigation;
pub mod phenology;
pub mod root_uptake;
pub mod root_zone;
pub mod runoff;
pub mod snowmelt;
pub mod soil_hydra;
pub mod soil_temp;
pub mod state;
pub mod stepper;
pub mod summary;
pub mod tables;
pub mod yields;

use tracing::{info, warn};

pub use config::{RunOptions, Scenario};
pub use crop::{CropId, CropPlan};
pub use daily_inputs::{DailyWeather, WeatherRecord};
pub use error::{Result, ScenarioId, SimError};
pub use soil_hydra::{SoilCatalog, SoilColumn};
pub use state::CarryOver;
pub use stepper::{SeasonInputs, SeasonOutcome, simulate_season};
pub use summary::{DailySnapshot, SeasonSummary};
pub use tables::ReferenceTables;

/**
Runs one scenario against the shared soil catalog and reference tables.

Errors are tagged with the scenario's site, soil, year and crop file so a
batch driver can report them and move on.

# Arguments
* `scenario` - Scenario document with weather, crop plan and carry-over.
* `soils` - Soil catalog.
* `tables` - Global crop and tillage constants.
*/
pub fn run_scenario(scenario: &Scenario, soils: &SoilCatalog, tables: &ReferenceTables) -> Result<SeasonOutcome> {
    let id = scenario.id();
    info!(scenario = %id, "running scenario");
    let outcome = prepare_and_run(scenario, soils, tables).map_err(|e| {
        warn!(scenario = %id, error = %e.root(), "scenario aborted");
        e.in_scenario(&id)
    })?;
    info!(
        scenario = %id,
        yield_amount = outcome.summary.yield_amount,
        et = outcome.summary.et_season,
        "scenario finished"
    );
    Ok(outcome)
}

fn prepare_and_run(scenario: &Scenario, soils: &SoilCatalog, tables: &ReferenceTables) -> Result<SeasonOutcome> {
    let soil = soils.column(scenario.soil, &tables.layer_depths)?;
    let weather = DailyWeather::from_record(&scenario.weather, tables.etr_factor)?;
    let inputs = SeasonInputs {
        soil: &soil,
        tables,
        plan: &scenario.crop,
        weather: &weather,
        year: scenario.year,
        options: &scenario.options,
    };
    simulate_season(inputs, &scenario.carry_over)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::crop::{
        CropId, CropPlan, IrrigationPlan, MonthDay, PhenologyThresholds, RootParams, TillageFlag,
        TillageOperation, TillageTiming, YieldMethod, YieldModel,
    };
    use crate::daily_inputs::{DailyWeather, WeatherRecord};
    use crate::soil_hydra::{SoilCatalog, SoilColumn};
    use crate::tables::ReferenceTables;

    pub fn tables() -> ReferenceTables {
        ReferenceTables::from_toml_str(include_str!("../tests/data/reference_tables.toml")).unwrap()
    }

    pub fn soil(code: u16) -> SoilColumn {
        let catalog = SoilCatalog::from_toml_str(include_str!("../tests/data/soils.toml")).unwrap();
        catalog.column(code, &tables().layer_depths).unwrap()
    }

    // Crop plan planted April 30 (fall planting for winter wheat) with a full-year season
    pub fn plan(crop: CropId) -> CropPlan {
        let (planting, phenology) = match crop {
            CropId::WinterWheat => (
                MonthDay::new(9, 15),
                PhenologyThresholds {
                    vegetative: 150.0,
                    flowering: 1100.0,
                    ripening: 1400.0,
                    yield_formation: 1500.0,
                    effective_cover: 800.0,
                    maturity: 1800.0,
                },
            ),
            _ => (
                MonthDay::new(4, 30),
                PhenologyThresholds {
                    vegetative: 200.0,
                    flowering: 1400.0,
                    ripening: 2000.0,
                    yield_formation: 2200.0,
                    effective_cover: 1000.0,
                    maturity: 2700.0,
                },
            ),
        };
        let cuttings = if crop.is_forage() {
            vec![160, 200, 240]
        } else {
            Vec::new()
        };
        CropPlan {
            crop,
            planting,
            season_start: MonthDay::new(1, 1),
            season_end: MonthDay::new(12, 31),
            phenology,
            cuttings,
            root: RootParams {
                min_depth: 6.0,
                max_depth: 48.0,
                stress_threshold: 50.0,
                growth_start_gdd: 200.0,
                management_depth: 36.0,
            },
            yield_model: YieldModel {
                method: YieldMethod::EtRatio,
                max_yield: 180.0,
                coefficient: 1.0,
            },
            terrace: None,
            tillage_flag: TillageFlag::Conventional,
            tillage: vec![
                TillageOperation {
                    timing: TillageTiming::Preplant,
                    day: 10,
                    code: 1,
                },
                TillageOperation {
                    timing: TillageTiming::AfterHarvest,
                    day: 5,
                    code: 2,
                },
            ],
            irrigation: IrrigationPlan::default(),
        }
    }

    // Full year of identical days: 80/55 F, 0.25 in reference ET
    pub fn flat_weather(precip: f64) -> DailyWeather {
        let record = WeatherRecord {
            station: "FLAT".into(),
            year: 2001,
            latitude: 41.0,
            elevation: 1500.0,
            start: MonthDay::new(1, 1),
            max_temp: vec![80.0; 365],
            min_temp: vec![55.0; 365],
            precip: vec![precip; 365],
            etr: vec![0.25; 365],
        };
        DailyWeather::from_record(&record, 1.0).unwrap()
    }
}
