use crate::soil_hydra::{LayerVec, SoilColumn};
use crate::tables::CropConstants;

// Potential evaporation below which the soil is not evaporated
pub const MIN_POTENTIAL_EVAPORATION: f64 = 0.001;

// Share of reference ET the canopy leaves to the surface; may be zero or negative
pub fn surface_share(etr: f64, kc: f64, constants: &CropConstants) -> f64 {
    etr * (constants.kc_upper + constants.kc_lower - kc).min(1.0)
}

// Potential soil evaporation, floored at the minimum
pub fn potential_evaporation(etr: f64, kc: f64, constants: &CropConstants) -> f64 {
    let ep = surface_share(etr, kc, constants);
    if ep <= 0.0 { MIN_POTENTIAL_EVAPORATION } else { ep }
}

// Fraction of stage 1 evaporation left under surface residue, in [0, 1]
pub fn residue_reduction(residue: f64, specific_gravity: f64) -> f64 {
    let depth = 1.123e-7 * residue / specific_gravity;
    (-0.99 - 0.236 * depth.ln()).min(1.0).max(0.0)
}

// Evaporation taken from the top two layers, in
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EvaporationDay {
    pub first: f64,
    pub second: f64,
}

impl EvaporationDay {
    pub fn total(&self) -> f64 {
        self.first + self.second
    }
}

/// Two-stage soil evaporation.
///
/// Stage 1 is energy limited and draws on the top layer down to air dry.
/// Stage 2 draws on the second layer at a rate proportional to the square
/// root of the time since the surface dried; `time` holds that reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilEvaporation {
    pub alpha: f64,
    pub time: f64,
}

impl SoilEvaporation {
    pub fn new(soil: &SoilColumn, wetted_day: u32) -> Self {
        let alpha = 0.303 * (soil.field_capacity[0] - soil.air_dry[0]) * soil.depth[0] + 0.0547;
        SoilEvaporation {
            alpha,
            time: f64::from(wetted_day),
        }
    }

    /**
    Evaporation for one day. The caller removes the returned depths from the
    top two layers.

    # Arguments
    * `jday` - Day of year.
    * `ep` - Potential evaporation, in.
    * `theta` - Layer water contents.
    * `soil` - Soil column.
    * `residue` - Surface residue, lb/acre.
    * `specific_gravity` - Specific gravity of that residue.
    */
    pub fn evaporate(
        &mut self,
        jday: u32,
        ep: f64,
        theta: &LayerVec,
        soil: &SoilColumn,
        residue: f64,
        specific_gravity: f64,
    ) -> EvaporationDay {
        let day = f64::from(jday);
        let (d0, d1) = (soil.depth[0], soil.depth[1]);
        let (ad0, ad1) = (soil.air_dry[0], soil.air_dry[1]);
        let second_avail = (theta[1] - ad1) * d1;
        let mut out = EvaporationDay::default();

        if (theta[0] - ad0).abs() <= 1e-4 {
            if theta[1] > ad1 {
                let elapsed = (day - self.time).max(0.0).sqrt() - (day - 1.0 - self.time).max(0.0).sqrt();
                out.second = (self.alpha * elapsed).min(ep).min(second_avail);
            }
        } else {
            let mut ep = ep;
            if residue > 0.0 {
                ep *= residue_reduction(residue, specific_gravity);
            }
            self.time = day;
            let avail = (theta[0] - ad0) * d0;
            if avail >= ep {
                out.first = ep;
            } else {
                self.time = day - 1.0 + avail / ep;
                out.first = avail;
                out.second = (self.alpha * (1.0 - avail / ep).sqrt()).min(second_avail);
                if out.first + out.second > ep {
                    out.second = ep - out.first;
                    self.time = day - (out.second / self.alpha).powi(2);
                }
            }
        }
        out.first = out.first.max(0.0);
        out.second = out.second.max(0.0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{soil, tables};
    use approx::assert_relative_eq;

    #[test]
    fn full_canopy_floors_potential_evaporation() {
        let t = tables();
        let c = t.crop(crate::crop::CropId::Corn).unwrap();
        let closed = c.kc_upper + c.kc_lower + 0.1;
        assert!(surface_share(0.3, closed, c) < 0.0);
        assert_eq!(potential_evaporation(0.3, closed, c), MIN_POTENTIAL_EVAPORATION);
        assert_relative_eq!(potential_evaporation(0.3, c.kc_lower, c), 0.3 * c.kc_upper.min(1.0));
    }

    #[test]
    fn residue_reduction_bounded() {
        assert_eq!(residue_reduction(1.0, 1.0), 1.0);
        let heavy = residue_reduction(20000.0, 0.5);
        assert!((0.0..1.0).contains(&heavy));
        assert!(residue_reduction(8000.0, 0.5) > heavy);
    }

    #[test]
    fn wet_surface_meets_demand_in_stage_one() {
        let column = soil(621);
        let mut evap = SoilEvaporation::new(&column, 99);
        let theta = column.field_capacity;
        let day = evap.evaporate(100, 0.1, &theta, &column, 0.0, 1.0);
        assert_relative_eq!(day.first, 0.1);
        assert_eq!(day.second, 0.0);
        assert_eq!(evap.time, 100.0);
    }

    #[test]
    fn drying_surface_moves_to_stage_two() {
        let column = soil(621);
        let mut evap = SoilEvaporation::new(&column, 99);
        let mut theta = column.field_capacity;
        let avail = 0.02;
        theta[0] = column.air_dry[0] + avail / column.depth[0];
        let day = evap.evaporate(100, 0.2, &theta, &column, 0.0, 1.0);
        assert_relative_eq!(day.first, avail, epsilon = 1e-12);
        assert!(day.second > 0.0);
        assert!(day.total() <= 0.2 + 1e-12);
        assert!(evap.time < 100.0);
    }

    #[test]
    fn air_dry_surface_uses_square_root_of_time() {
        let column = soil(621);
        let mut evap = SoilEvaporation::new(&column, 90);
        let mut theta = column.field_capacity;
        theta[0] = column.air_dry[0];
        let day = evap.evaporate(100, 0.3, &theta, &column, 0.0, 1.0);
        assert_eq!(day.first, 0.0);
        let expected = evap.alpha * (10f64.sqrt() - 9f64.sqrt());
        assert_relative_eq!(day.second, expected, epsilon = 1e-12);
        // reference time only moves in stage one
        assert_eq!(evap.time, 90.0);
    }

    #[test]
    fn dry_second_layer_stops_stage_two() {
        let column = soil(621);
        let mut evap = SoilEvaporation::new(&column, 90);
        let mut theta = column.field_capacity;
        theta[0] = column.air_dry[0];
        theta[1] = column.air_dry[1];
        assert_eq!(evap.evaporate(100, 0.3, &theta, &column, 0.0, 1.0).total(), 0.0);
    }
}
