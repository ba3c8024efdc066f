use serde::{Deserialize, Serialize};

use crate::tables::SnowParams;

// Air temperature (F) above which the pack can melt
const MELT_BASE_TEMP: f64 = 0.0;

/// Snow water store and its lagged temperature.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Snowpack {
    pub temperature: f64, // F
    pub water: f64,       // in
}

// Rain reaching the soil after snow accumulation and melt
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SnowDay {
    pub rain: f64,
    pub melt: f64,
}

// Melt factor follows the sun: max near the summer solstice, min near the winter one
pub fn melt_factor(jday: u32, params: &SnowParams) -> f64 {
    let (mx, mn) = (params.melt_factor_max, params.melt_factor_min);
    (mx + mn) / 2.0 + ((f64::from(jday) - 81.0) / 58.09).sin() * (mx - mn) / 2.0
}

impl Snowpack {
    pub fn new(temperature: f64, water: f64) -> Self {
        Snowpack { temperature, water }
    }

    /**
    Advances the pack by one day.

    Precipitation on days at or below the snowfall temperature goes into the
    pack. Melt is a degree-day amount, reduced for partial areal cover when the
    pack holds less than the full-cover water, and never more than the pack.

    # Arguments
    * `jday` - Day of year.
    * `mean_temp` - Mean air temperature, F.
    * `max_temp` - Maximum air temperature, F.
    * `precip` - Precipitation, in.
    * `params` - Snow constants.
    */
    pub fn step(&mut self, jday: u32, mean_temp: f64, max_temp: f64, precip: f64, params: &SnowParams) -> SnowDay {
        let lag = params.lag_factor;
        self.temperature = self.temperature * (1.0 - lag) + mean_temp * lag;

        let mut rain = precip;
        if mean_temp <= params.snowfall_temp {
            self.water += rain;
            rain = 0.0;
        }

        let mut melt = 0.0;
        if self.water > 0.0 && max_temp > MELT_BASE_TEMP {
            melt = melt_factor(jday, params) * ((self.temperature + max_temp) / 2.0 - MELT_BASE_TEMP);
            if self.water < params.full_cover_water {
                let cover = self.water / params.full_cover_water;
                melt *= cover / (cover + (params.cover_shape1 - params.cover_shape2 * cover).exp());
            }
            melt = melt.clamp(0.0, self.water);
            self.water -= melt;
            rain += melt;
        }
        SnowDay { rain, melt }
    }
}
