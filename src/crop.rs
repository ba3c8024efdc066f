use serde::{Deserialize, Serialize};

use crate::calendar::day_of_year;
use crate::error::{Result, SimError};

// Crop identifiers as used by the crop-simulation files (codes 1..=22)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropId {
    SpringGrains = 1,
    EdibleBeans = 2,
    Soybeans = 3,
    Potatoes = 4,
    SugarBeets = 5,
    GrainSorghum = 6,
    WinterWheat = 7,
    Corn = 8,
    Sunflower = 9,
    Alfalfa = 10,
    IrrigatedHay = 11,
    IrrigatedPasture = 12,
    NativePasture = 13,
    UrbanTurf = 14,
    SummerFallow = 15,
    RiparianWoodlands = 16,
    NonRiparianWoodlands = 17,
    Cattails = 18,
    ReedRush = 19,
    ShallowWater = 20,
    DeepWater = 21,
    Farmstead = 22,
}

pub const ALL_CROPS: [CropId; 22] = [
    CropId::SpringGrains,
    CropId::EdibleBeans,
    CropId::Soybeans,
    CropId::Potatoes,
    CropId::SugarBeets,
    CropId::GrainSorghum,
    CropId::WinterWheat,
    CropId::Corn,
    CropId::Sunflower,
    CropId::Alfalfa,
    CropId::IrrigatedHay,
    CropId::IrrigatedPasture,
    CropId::NativePasture,
    CropId::UrbanTurf,
    CropId::SummerFallow,
    CropId::RiparianWoodlands,
    CropId::NonRiparianWoodlands,
    CropId::Cattails,
    CropId::ReedRush,
    CropId::ShallowWater,
    CropId::DeepWater,
    CropId::Farmstead,
];

impl CropId {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<CropId> {
        ALL_CROPS.get((code as usize).checked_sub(1)?).copied()
    }

    // Spring grains through winter wheat: table-driven Kc and full phenology dates
    pub fn uses_stage_table(self) -> bool {
        self.code() <= 7
    }

    // Grain, row and tuber crops (codes below 10)
    pub fn is_grain_or_tuber(self) -> bool {
        self.code() < 10
    }

    pub fn is_forage(self) -> bool {
        matches!(self, CropId::Alfalfa | CropId::IrrigatedHay)
    }

    pub fn is_grain_tuber_or_forage(self) -> bool {
        self.code() < 12
    }

    pub fn is_pasture(self) -> bool {
        matches!(self, CropId::IrrigatedPasture | CropId::NativePasture)
    }

    // Wetlands, woodlands and open water: ET is Kc x ETR and the profile is held at field capacity
    pub fn is_natural(self) -> bool {
        matches!(
            self,
            CropId::RiparianWoodlands
                | CropId::Cattails
                | CropId::ReedRush
                | CropId::ShallowWater
                | CropId::DeepWater
        )
    }

    pub fn requires_yield_adjustment(self) -> bool {
        self.code() < 12
    }

    // Only the effective-cover and maturity thresholds are tracked from here on
    pub fn uses_generic_phenology(self) -> bool {
        self.code() >= 10
    }

    pub fn report_name(self) -> &'static str {
        match self {
            CropId::SpringGrains => "SM.GRAIN",
            CropId::EdibleBeans => "ED BEANS",
            CropId::Soybeans => "SOYBEANS",
            CropId::Potatoes => "POTATOES",
            CropId::SugarBeets => "S. BEETS",
            CropId::GrainSorghum => "SORGHUM",
            CropId::WinterWheat => "W. WHEAT",
            CropId::Corn => "CORN",
            CropId::Sunflower => "SUNFLOWR",
            CropId::Alfalfa => "ALFALFA",
            CropId::IrrigatedHay => "IRR HAY",
            CropId::IrrigatedPasture => "IRR PAST",
            CropId::NativePasture => "N. RANGE",
            CropId::UrbanTurf => "TURF",
            CropId::SummerFallow => "FALLOW",
            CropId::RiparianWoodlands => "R. WOODS",
            CropId::NonRiparianWoodlands => "NR. WOOD",
            CropId::Cattails => "CATTAILS",
            CropId::ReedRush => "REED/RUSH",
            CropId::ShallowWater => "SHAL H2O",
            CropId::DeepWater => "DEEP H2O",
            CropId::Farmstead => "FARMSTED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Self {
        MonthDay { month, day }
    }

    pub fn day_of_year(&self) -> Result<u32> {
        day_of_year(self.month, self.day)
            .ok_or_else(|| SimError::InvalidInput(format!("month {} out of range", self.month)))
    }
}

// GDD thresholds (degree days F). Which ones are meaningful depends on the crop family.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhenologyThresholds {
    pub vegetative: f64,
    pub flowering: f64,
    pub ripening: f64,
    pub yield_formation: f64,
    pub effective_cover: f64,
    pub maturity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootParams {
    pub min_depth: f64,        // in
    pub max_depth: f64,        // in
    pub stress_threshold: f64, // percent available water below which transpiration is reduced
    pub growth_start_gdd: f64,
    pub management_depth: f64, // in
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldMethod {
    TranspirationDeficit,
    EtRatio,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldModel {
    pub method: YieldMethod,
    pub max_yield: f64,
    pub coefficient: f64,
}

// Conservation-terrace channel geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Terrace {
    pub channel_depth: f64, // ft
    pub channel_width: f64,
    pub interval: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TillageFlag {
    Fallow = 0,
    Conventional = 1,
    Conservation = 2,
    Continuous = 3,
}

impl TillageFlag {
    // Crop is growing this season and yields are computed
    pub fn crop_active(self) -> bool {
        self != TillageFlag::Fallow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TillageTiming {
    Preplant,
    DuringSeason,
    AfterHarvest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TillageOperation {
    pub timing: TillageTiming,
    pub day: i32, // days before planting, after planting or after maturity
    pub code: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrigationType {
    DryLand = 1,
    HistoricalDates = 2,
    Pivot = 3,
    Furrow = 4,
    BorderCorrugation = 5,
}

impl IrrigationType {
    pub fn is_irrigated(self) -> bool {
        self != IrrigationType::DryLand
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMethod {
    FullDemand,
    DemandBased,
    FixedRotation,
    ForecastRain,
    ForecastRainAndEt,
}

// Window between stop and resume days when a rotation system delivers no water
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blackout {
    pub stop_day: u32,
    pub resume_day: u32,
}

// One recorded irrigation for the historical-dates irrigation type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalIrrigation {
    pub day: u32,
    pub gross: f64,
    pub efficiency: f64,
}

// Irrigation parameters. Vectors are indexed by growth stage (1-based stage, last value repeats).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrrigationPlan {
    pub kind: IrrigationType,
    pub method: SchedulingMethod,
    pub allowable_depletion: Vec<f64>,
    pub rainfall_allowance: Vec<f64>,
    pub system_capacity: f64, // in/day
    pub operating_fraction: Vec<f64>,
    pub min_application: Vec<f64>,
    pub max_application: Vec<f64>,
    pub smallest_application: Vec<f64>,
    pub gdd_start: f64,
    pub gdd_stop: f64,
    pub first_delivery_day: u32,
    pub delivery_depth: f64,
    pub blackout: Option<Blackout>,
    pub application_efficiency: Vec<f64>,
    pub reuse_efficiency: Vec<f64>,
    pub runoff_fraction: Vec<f64>,
    pub historical: Vec<HistoricalIrrigation>,
}

impl Default for IrrigationPlan {
    fn default() -> Self {
        IrrigationPlan {
            kind: IrrigationType::DryLand,
            method: SchedulingMethod::FullDemand,
            allowable_depletion: vec![0.5],
            rainfall_allowance: vec![0.0],
            system_capacity: 0.0,
            operating_fraction: vec![1.0],
            min_application: vec![0.0],
            max_application: vec![0.0],
            smallest_application: vec![0.0],
            gdd_start: 0.0,
            gdd_stop: 0.0,
            first_delivery_day: 0,
            delivery_depth: 0.0,
            blackout: None,
            application_efficiency: vec![1.0],
            reuse_efficiency: vec![0.0],
            runoff_fraction: vec![0.0],
            historical: Vec::new(),
        }
    }
}

// Value for a 1-based growth stage; stages past the end reuse the last entry
pub fn stage_value(values: &[f64], stage: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values[stage.saturating_sub(1).min(values.len() - 1)]
}

/// Static per-crop plan as read from a crop-simulation file.
///
/// A `CropPlan` is never modified by a season run; the handful of values that
/// are adjusted at season start live in [`SeasonPlan`], so re-using the plan
/// for the next year always starts from the stored values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropPlan {
    pub crop: CropId,
    pub planting: MonthDay,
    pub season_start: MonthDay,
    pub season_end: MonthDay,
    #[serde(default)]
    pub phenology: PhenologyThresholds,
    #[serde(default)]
    pub cuttings: Vec<u32>,
    pub root: RootParams,
    pub yield_model: YieldModel,
    #[serde(default)]
    pub terrace: Option<Terrace>,
    pub tillage_flag: TillageFlag,
    #[serde(default)]
    pub tillage: Vec<TillageOperation>,
    #[serde(default)]
    pub irrigation: IrrigationPlan,
}

impl CropPlan {
    pub fn validate(&self) -> Result<()> {
        self.planting.day_of_year()?;
        let start = self.season_start.day_of_year()?;
        let end = self.season_end.day_of_year()?;
        if start == 0 || end < start || end > 366 {
            return Err(SimError::InvalidInput(format!(
                "season span {start}..={end} is not a valid day range"
            )));
        }
        if self.crop.is_forage() && !(1..=5).contains(&self.cuttings.len()) {
            return Err(SimError::InvalidInput(format!(
                "{:?} needs between 1 and 5 cutting dates, got {}",
                self.crop,
                self.cuttings.len()
            )));
        }
        let irr = &self.irrigation;
        if irr.kind.is_irrigated() && irr.kind != IrrigationType::HistoricalDates {
            if irr.application_efficiency.iter().any(|&e| e <= 0.0) {
                return Err(SimError::InvalidInput(
                    "application efficiency must be positive".to_string(),
                ));
            }
            if irr.allowable_depletion.is_empty() || irr.application_efficiency.is_empty() {
                return Err(SimError::InvalidInput(
                    "irrigated plans need stage depletion and efficiency values".to_string(),
                ));
            }
        }
        Ok(())
    }

    // Cutting day for a 1-based cutting index; missing trailing cuttings never occur
    pub fn cutting_day(&self, index: usize) -> u32 {
        self.cuttings
            .get(index.saturating_sub(1))
            .copied()
            .unwrap_or(u32::MAX)
    }
}

// Tillage operation with its timing resolved to a day of year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTillage {
    pub day: i32,
    pub code: u32,
}

// Sentinel for dates that belong to the previous year
pub const PRIOR_YEAR_DAY: i32 = -999;

/// Season-specific working values derived from a [`CropPlan`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonPlan {
    pub crop: CropId,
    pub root_max: f64,
    pub root_mgmt: f64,
    pub tillage_flag: TillageFlag,
    pub planting: MonthDay,
    pub planting_day: u32,
    pub fall_planting_day: i32,
    pub season_start_day: u32,
    pub season_end_day: u32,
    pub live_crop: bool,
    pub tillage: Vec<ScheduledTillage>,
}

impl SeasonPlan {
    // Apply the once-per-season adjustments: soil-limited root depths and the winter wheat live-crop rules
    pub fn prepare(
        plan: &CropPlan,
        awhc_class: u8,
        carried_live_crop: bool,
        live_condition: bool,
    ) -> Result<SeasonPlan> {
        plan.validate()?;
        let mut root_max = plan.root.max_depth;
        let mut root_mgmt = plan.root.management_depth;
        if !plan.crop.is_pasture() {
            let factor = (0.6 + 0.4 * (f64::from(awhc_class) - 3.0) / 4.0).min(1.0);
            root_max *= factor;
            root_mgmt *= factor;
        }

        let mut live_crop = carried_live_crop || live_condition;
        let mut tillage_flag = plan.tillage_flag;
        let mut planting = plan.planting;
        let fall_planting_day;
        if plan.crop == CropId::WinterWheat {
            let mut fall = planting.day_of_year()? as i32;
            if plan.irrigation.kind.is_irrigated() || tillage_flag == TillageFlag::Continuous {
                live_crop = true;
            } else if !live_crop {
                tillage_flag = TillageFlag::Fallow;
            }
            // A live crop greens up on March 15; it was planted last fall
            if live_crop {
                planting = MonthDay::new(3, 15);
                if plan.irrigation.kind == IrrigationType::DryLand
                    && tillage_flag < TillageFlag::Continuous
                {
                    fall = PRIOR_YEAR_DAY;
                }
            }
            fall_planting_day = fall;
        } else {
            live_crop = false;
            fall_planting_day = PRIOR_YEAR_DAY;
        }

        Ok(SeasonPlan {
            crop: plan.crop,
            root_max,
            root_mgmt,
            tillage_flag,
            planting,
            planting_day: planting.day_of_year()?,
            fall_planting_day,
            season_start_day: plan.season_start.day_of_year()?,
            season_end_day: plan.season_end.day_of_year()?,
            live_crop,
            tillage: Vec::new(),
        })
    }

    // Convert tillage days relative to planting/maturity into days of year
    pub fn resolve_tillage(&mut self, operations: &[TillageOperation], maturity_day: u32) {
        let plant = self.planting_day as i32;
        let mature = maturity_day as i32;
        self.tillage = operations
            .iter()
            .map(|op| {
                let day = match (self.crop == CropId::WinterWheat, self.live_crop, op.timing) {
                    (false, _, TillageTiming::Preplant) | (true, false, TillageTiming::Preplant) => {
                        plant - op.day
                    }
                    (false, _, TillageTiming::DuringSeason)
                    | (true, false, TillageTiming::DuringSeason) => op.day + plant,
                    (false, _, TillageTiming::AfterHarvest) | (true, true, TillageTiming::AfterHarvest) => {
                        op.day + mature
                    }
                    // Harvest of a crop not yet planted happens next year
                    (true, false, TillageTiming::AfterHarvest) => op.day + 367,
                    (true, true, TillageTiming::Preplant) => PRIOR_YEAR_DAY - op.day,
                    (true, true, TillageTiming::DuringSeason) => PRIOR_YEAR_DAY + op.day,
                };
                ScheduledTillage { day, code: op.code }
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(crop: CropId) -> CropPlan {
        CropPlan {
            crop,
            planting: MonthDay::new(9, 15),
            season_start: MonthDay::new(1, 1),
            season_end: MonthDay::new(12, 31),
            phenology: PhenologyThresholds::default(),
            cuttings: Vec::new(),
            root: RootParams {
                min_depth: 6.0,
                max_depth: 48.0,
                stress_threshold: 50.0,
                growth_start_gdd: 100.0,
                management_depth: 36.0,
            },
            yield_model: YieldModel {
                method: YieldMethod::EtRatio,
                max_yield: 60.0,
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

    #[test]
    fn crop_codes_round_trip() {
        for crop in ALL_CROPS {
            assert_eq!(CropId::from_code(crop.code()), Some(crop));
        }
        assert_eq!(CropId::from_code(0), None);
        assert_eq!(CropId::from_code(23), None);
    }

    #[test]
    fn crop_families() {
        assert!(CropId::WinterWheat.uses_stage_table());
        assert!(!CropId::Corn.uses_stage_table());
        assert!(CropId::Alfalfa.is_forage());
        assert!(CropId::NativePasture.is_pasture());
        assert!(CropId::DeepWater.is_natural());
        assert!(!CropId::NonRiparianWoodlands.is_natural());
        assert!(CropId::IrrigatedHay.requires_yield_adjustment());
        assert!(!CropId::IrrigatedPasture.requires_yield_adjustment());
    }

    #[test]
    fn stage_values_repeat_last_entry() {
        let v = [0.4, 0.5, 0.6];
        assert_eq!(stage_value(&v, 1), 0.4);
        assert_eq!(stage_value(&v, 3), 0.6);
        assert_eq!(stage_value(&v, 5), 0.6);
        assert_eq!(stage_value(&[], 2), 0.0);
    }

    #[test]
    fn root_depths_scaled_for_low_water_holding_soils() {
        let p = plan(CropId::Corn);
        let season = SeasonPlan::prepare(&p, 3, false, false).unwrap();
        assert!((season.root_max - 48.0 * 0.6).abs() < 1e-12);
        assert!((season.root_mgmt - 36.0 * 0.6).abs() < 1e-12);
        let season = SeasonPlan::prepare(&p, 9, false, false).unwrap();
        assert_eq!(season.root_max, 48.0);
        // stored plan untouched
        assert_eq!(p.root.max_depth, 48.0);
    }

    #[test]
    fn pasture_root_depths_not_scaled() {
        let p = plan(CropId::NativePasture);
        let season = SeasonPlan::prepare(&p, 3, false, false).unwrap();
        assert_eq!(season.root_max, 48.0);
    }

    #[test]
    fn dead_dryland_wheat_is_fallowed() {
        let p = plan(CropId::WinterWheat);
        let season = SeasonPlan::prepare(&p, 6, false, false).unwrap();
        assert!(!season.live_crop);
        assert_eq!(season.tillage_flag, TillageFlag::Fallow);
        assert_eq!(season.fall_planting_day, 258);
        assert_eq!(season.planting_day, 258);
    }

    #[test]
    fn live_dryland_wheat_greens_up_in_march() {
        let p = plan(CropId::WinterWheat);
        let season = SeasonPlan::prepare(&p, 6, true, false).unwrap();
        assert!(season.live_crop);
        assert_eq!(season.planting_day, 74);
        assert_eq!(season.fall_planting_day, PRIOR_YEAR_DAY);
        assert_eq!(season.tillage_flag, TillageFlag::Conventional);
    }

    #[test]
    fn irrigated_wheat_always_live() {
        let mut p = plan(CropId::WinterWheat);
        p.irrigation.kind = IrrigationType::Pivot;
        let season = SeasonPlan::prepare(&p, 6, false, false).unwrap();
        assert!(season.live_crop);
        assert_eq!(season.fall_planting_day, 258);
    }

    #[test]
    fn other_crops_never_start_live() {
        let p = plan(CropId::Corn);
        let season = SeasonPlan::prepare(&p, 6, true, true).unwrap();
        assert!(!season.live_crop);
        assert_eq!(season.fall_planting_day, PRIOR_YEAR_DAY);
    }

    #[test]
    fn tillage_days_resolved_against_planting_and_maturity() {
        let p = plan(CropId::Corn);
        let mut season = SeasonPlan::prepare(&p, 6, false, false).unwrap();
        season.resolve_tillage(&p.tillage, 280);
        assert_eq!(season.tillage[0].day, 258 - 10);
        assert_eq!(season.tillage[1].day, 285);
    }

    #[test]
    fn tillage_days_for_wheat_depend_on_live_state() {
        let p = plan(CropId::WinterWheat);
        let mut dead = SeasonPlan::prepare(&p, 6, false, false).unwrap();
        dead.resolve_tillage(&p.tillage, 190);
        assert_eq!(dead.tillage[0].day, 248);
        assert_eq!(dead.tillage[1].day, 372);

        let mut live = SeasonPlan::prepare(&p, 6, true, false).unwrap();
        live.resolve_tillage(&p.tillage, 190);
        assert_eq!(live.tillage[0].day, -1009);
        assert_eq!(live.tillage[1].day, 195);
    }

    #[test]
    fn forage_needs_cuttings() {
        let p = plan(CropId::Alfalfa);
        assert!(matches!(p.validate(), Err(SimError::InvalidInput(_))));
    }
}
