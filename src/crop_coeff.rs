use tracing::warn;

use crate::crop::{CropId, CropPlan, SeasonPlan};
use crate::daily_inputs::DailyWeather;
use crate::phenology::PhenologyCalendar;
use crate::tables::CropConstants;
use crate::calendar::DAY_SLOTS;

// Alfalfa coefficients fall back to the lower bound from this day on
const ALFALFA_DORMANT_DAY: u32 = 305;

// Fraction-of-season breakpoints and coefficients: (fs1, fs2, fs3, kc_ini, kc_mid, kc_end)
type SeasonCurve = (f64, f64, f64, f64, f64, f64);

const HAY_CURVE: SeasonCurve = (0.036, 0.109, 0.927, 0.243, 0.750, 0.669);

fn season_curve(crop: CropId) -> Option<SeasonCurve> {
    let curve = match crop {
        CropId::Sunflower => (0.192, 0.462, 0.808, 0.150, 1.000, 0.300),
        CropId::IrrigatedPasture => (0.036, 0.109, 0.927, 0.243, 0.750, 0.669),
        CropId::NativePasture => (0.036, 0.109, 0.927, 0.243, 0.587, 0.587),
        CropId::UrbanTurf => (0.036, 0.073, 1.000, 0.688, 0.746, 0.746),
        CropId::SummerFallow => (0.000, 0.100, 1.000, 0.150, 0.150, 0.150),
        CropId::RiparianWoodlands => (0.105, 0.158, 0.842, 0.364, 1.082, 0.798),
        CropId::NonRiparianWoodlands => (0.105, 0.158, 0.842, 0.547, 0.873, 0.691),
        CropId::Cattails => (0.071, 0.286, 0.857, 0.243, 1.011, 0.282),
        CropId::ReedRush => (0.036, 0.109, 1.000, 0.729, 1.011, 0.606),
        CropId::ShallowWater => (0.010, 0.100, 1.000, 0.800, 0.800, 0.800),
        CropId::DeepWater => (0.010, 0.100, 1.000, 0.526, 0.526, 1.012),
        CropId::Farmstead => (0.036, 0.109, 0.927, 0.243, 0.587, 0.587),
        _ => return None,
    };
    Some(curve)
}

// Kc along a fraction of the growing season; None leaves the previous value in place
fn interpolate_season(fgs: f64, (fs1, fs2, fs3, ini, mid, end): SeasonCurve) -> Option<f64> {
    if fgs > 1.0 || fgs <= fs1 {
        Some(ini)
    } else if fgs < fs2 {
        Some(ini + (mid - ini) * (fgs - fs1) / (fs2 - fs1))
    } else if fgs <= fs3 {
        Some(mid)
    } else if fgs <= 1.0 {
        Some(mid - (mid - end) * (fgs - fs3) / (1.0 - fs3))
    } else {
        None
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Alfalfa cutting state for a day: (cover index, 1-based cutting index).
///
/// `previous` is kept on days that fall exactly on a later cutting date.
pub fn cutting_indices(day: u32, cuttings: &[u32; 5], count: usize, previous: (usize, usize)) -> (usize, usize) {
    let mut state = previous;
    if day < cuttings[0] {
        state = (0, 1);
    }
    if cuttings[0] <= day && day < cuttings[1] {
        state = (1, 2);
    }
    for i in 1..4 {
        if cuttings[i] < day && day < cuttings[i + 1] {
            state = (1, i + 2);
        }
    }
    if count > 0 && day >= cuttings[count - 1] {
        state = (2, count);
    }
    state
}

// Cutting dates padded with zeros to five entries
pub fn padded_cuttings(plan: &CropPlan) -> [u32; 5] {
    let mut cuts = [0; 5];
    for (slot, &day) in cuts.iter_mut().zip(plan.cuttings.iter()) {
        *slot = day;
    }
    cuts
}

// Dates and thresholds the coefficient curves depend on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KcDates {
    pub planting_day: u32,
    pub effective_cover_day: u32,
    pub freeze_day: u32,
    pub fall_planting_day: i32,
    pub gdd_maturity: f64,
}

/// Daily crop coefficient state machine.
///
/// The coefficient, the cover/cutting indices and the hay cutting GDD carry
/// over from one day to the next, so days must be stepped in order.
#[derive(Debug, Clone)]
pub struct KcModel<'a> {
    crop: CropId,
    constants: &'a CropConstants,
    dates: KcDates,
    cuttings: [u32; 5],
    cut_count: usize,
    legacy_alfalfa: bool,
    pub kc: f64,
    pub cover_index: usize,
    pub cut_index: usize,
    pub gdd_at_cut: f64,
}

impl<'a> KcModel<'a> {
    pub fn new(plan: &CropPlan, constants: &'a CropConstants, dates: KcDates, legacy_alfalfa: bool) -> Self {
        KcModel {
            crop: plan.crop,
            constants,
            dates,
            cuttings: padded_cuttings(plan),
            cut_count: plan.cuttings.len(),
            legacy_alfalfa,
            kc: 0.0,
            cover_index: 0,
            cut_index: 1,
            gdd_at_cut: 0.0,
        }
    }

    // Coefficient for `day`, given cumulative GDD through the previous day
    pub fn step(&mut self, day: u32, gdd: f64) -> f64 {
        match self.crop {
            crop if crop.uses_stage_table() => self.stage_table(day),
            CropId::Corn => self.corn(gdd),
            CropId::Alfalfa => self.alfalfa(day),
            CropId::IrrigatedHay => self.hay(day, gdd),
            crop => {
                if let Some(curve) = season_curve(crop) {
                    let fgs = ratio(gdd, self.dates.gdd_maturity);
                    if let Some(kc) = interpolate_season(fgs, curve) {
                        self.kc = kc;
                    }
                }
            }
        }

        // Applied after every procedure, even when it discards today's value
        let (lower, upper) = (self.constants.kc_lower, self.constants.kc_upper);
        if day > self.dates.freeze_day || self.kc < lower {
            self.kc = lower;
        }
        if self.kc > upper {
            self.kc = upper;
        }
        self.kc
    }

    fn stage_table(&mut self, day: u32) {
        let d = &self.dates;
        let lower = self.constants.kc_lower;
        let pct = if day > d.effective_cover_day {
            self.cover_index = 1;
            (f64::from(day) - f64::from(d.effective_cover_day)) / 100.0
        } else {
            self.cover_index = 0;
            let span = f64::from(d.effective_cover_day) - f64::from(d.planting_day);
            if span == 0.0 {
                -1.0
            } else {
                (f64::from(day) - f64::from(d.planting_day)) / span
            }
        };

        if !(0.0..=1.0).contains(&pct) {
            self.kc = lower;
        } else {
            let row = &self.constants.kc_table[self.cover_index];
            let ipct = (pct / 0.1).trunc() as usize;
            let frac = 10.0 * pct.rem_euclid(0.1);
            match ipct {
                1..=9 => self.kc = row[ipct - 1] + frac * (row[ipct] - row[ipct - 1]),
                10 => self.kc = row[9],
                0 if self.cover_index == 0 => self.kc = lower + frac * (row[0] - lower),
                _ => warn!(
                    crop = ?self.crop,
                    day,
                    "crop coefficient not assigned just after effective cover, keeping {:.3}",
                    self.kc
                ),
            }
        }

        if self.crop == CropId::WinterWheat && d.fall_planting_day > 0 && day as i32 >= d.fall_planting_day {
            self.kc = 0.25;
        }
    }

    fn corn(&mut self, gdd: f64) {
        let m = self.dates.gdd_maturity;
        self.kc = if gdd <= 0.12 * m {
            0.15
        } else if gdd < 0.42 * m {
            0.15 + 0.85 * (gdd - 0.12 * m) / (0.3 * m)
        } else if gdd > 0.78 * m {
            1.0 - 0.7 * (gdd - 0.78 * m) / (0.22 * m)
        } else {
            self.constants.kc_upper
        };
        self.kc = self.kc.max(0.15);
    }

    fn alfalfa(&mut self, day: u32) {
        let (cover, cut) = cutting_indices(
            day,
            &self.cuttings,
            self.cut_count,
            (self.cover_index, self.cut_index),
        );
        self.cover_index = cover;
        self.cut_index = cut;

        let c = |i: usize| f64::from(self.cuttings[i]);
        let jday = f64::from(day);
        let plant = self.dates.planting_day;
        let icut = cut - 1;
        let mut pct = 0.0;
        if icut == 0 && day >= plant {
            pct = ratio(jday - f64::from(plant), c(0) - f64::from(plant));
        }
        let dormant = f64::from(ALFALFA_DORMANT_DAY);
        if self.legacy_alfalfa && icut == 1 {
            pct = if cover == 1 {
                ratio(jday - c(0), c(1) - c(0))
            } else {
                ratio(jday - c(0), dormant - c(0))
            };
        } else if (1..=4).contains(&icut) {
            pct = if cover == 1 {
                ratio(jday - c(icut - 1), c(icut) - c(icut - 1))
            } else {
                ratio(jday - c(icut), dormant - c(icut))
            };
        }

        let lower = self.constants.kc_lower;
        if day <= plant || day >= ALFALFA_DORMANT_DAY {
            self.kc = lower;
        }
        let row = &self.constants.kc_table[cover.min(2)];
        let ipct = (pct / 0.1).trunc();
        if ipct == 10.0 {
            self.kc = row[9];
        } else {
            let frac = 10.0 * pct.rem_euclid(0.1);
            if ipct == 0.0 {
                self.kc = lower + frac * (row[0] - lower);
            } else if (1.0..10.0).contains(&ipct) {
                let i = ipct as usize;
                self.kc = row[i - 1] + frac * (row[i] - row[i - 1]);
            }
        }
    }

    fn hay(&mut self, day: u32, gdd: f64) {
        let cut_day = self.cuttings[0];
        if day == cut_day {
            self.gdd_at_cut = gdd;
        }
        let m = self.dates.gdd_maturity;
        let fgs = if day < cut_day {
            ratio(gdd, m)
        } else {
            ratio(gdd - self.gdd_at_cut, m - self.gdd_at_cut)
        };
        if let Some(kc) = interpolate_season(fgs, HAY_CURVE) {
            self.kc = kc;
        }
    }
}

/// Kc for every day of the weather record.
///
/// Each day uses the cumulative GDD of the previous day; the first day uses
/// the last daily GDD increment of the season.
pub fn daily_coefficients(
    plan: &CropPlan,
    season: &SeasonPlan,
    constants: &CropConstants,
    calendar: &PhenologyCalendar,
    weather: &DailyWeather,
    legacy_alfalfa: bool,
) -> Vec<f64> {
    let dates = KcDates {
        planting_day: calendar.planting_day,
        effective_cover_day: calendar.effective_cover_day,
        freeze_day: calendar.freeze_day(),
        fall_planting_day: season.fall_planting_day,
        gdd_maturity: plan.phenology.maturity,
    };
    let mut model = KcModel::new(plan, constants, dates, legacy_alfalfa);
    let mut kc = vec![0.0; DAY_SLOTS];
    let mut gdd = calendar.gdd.last_increment;
    for day in weather.first_day..=weather.last_day {
        kc[day as usize - 1] = model.step(day, gdd);
        gdd = calendar.gdd_on(day);
    }
    kc
}
