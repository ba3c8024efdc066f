use serde::{Deserialize, Serialize};

use crate::calendar::DAY_SLOTS;
use crate::crop::MonthDay;
use crate::error::{Result, SimError};

// Raw station record for one year: parallel daily series starting at `start`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub station: String,
    pub year: i32,
    pub latitude: f64,  // degrees
    pub elevation: f64, // ft
    pub start: MonthDay,
    pub max_temp: Vec<f64>, // F
    pub min_temp: Vec<f64>, // F
    pub precip: Vec<f64>,   // in
    pub etr: Vec<f64>,      // in
}

// Accepted ranges; anything outside is replaced by the trailing 3-day average
const ETR_RANGE: (f64, f64) = (0.0, 0.6);
const MIN_TEMP_RANGE: (f64, f64) = (-50.0, 100.0);
const MAX_TEMP_RANGE: (f64, f64) = (-50.0, 125.0);
const PRECIP_RANGE: (f64, f64) = (0.0, 10.0);

fn in_range(value: f64, (lo, hi): (f64, f64)) -> bool {
    value >= lo && value <= hi
}

// Value for a 1-based day of year, zero outside the record
pub(crate) fn slot(values: &[f64], jday: u32) -> f64 {
    (jday as usize)
        .checked_sub(1)
        .and_then(|i| values.get(i))
        .copied()
        .unwrap_or(0.0)
}

/// Sanitised daily forcing on the fixed 366-slot calendar.
///
/// Slots outside the station record stay at zero. Reference ET already carries
/// the global ETR adjustment factor.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyWeather {
    pub first_day: u32,
    pub last_day: u32,
    pub max_temp: Vec<f64>,
    pub min_temp: Vec<f64>,
    pub precip: Vec<f64>,
    pub etr: Vec<f64>,
    pub solar: Vec<f64>, // langleys/day
    pub annual_mean_temp: f64,
}

impl DailyWeather {
    pub fn from_record(record: &WeatherRecord, etr_factor: f64) -> Result<Self> {
        let days = record.max_temp.len();
        if days == 0
            || record.min_temp.len() != days
            || record.precip.len() != days
            || record.etr.len() != days
        {
            return Err(SimError::InvalidInput(format!(
                "weather {} {}: daily series must be non-empty and equally long",
                record.station, record.year
            )));
        }
        let first_day = record.start.day_of_year()?;
        if first_day == 0 || first_day as usize + days - 1 > DAY_SLOTS {
            return Err(SimError::InvalidInput(format!(
                "weather {} {}: {} days from day {} overrun the year",
                record.station, record.year, days, first_day
            )));
        }

        let mut w = DailyWeather {
            first_day,
            last_day: first_day + days as u32 - 1,
            max_temp: vec![0.0; DAY_SLOTS],
            min_temp: vec![0.0; DAY_SLOTS],
            precip: vec![0.0; DAY_SLOTS],
            etr: vec![0.0; DAY_SLOTS],
            solar: vec![0.0; DAY_SLOTS],
            annual_mean_temp: 0.0,
        };
        w.sanitise(record, etr_factor);
        w.estimate_solar(record.latitude, record.elevation, days);
        Ok(w)
    }

    fn sanitise(&mut self, record: &WeatherRecord, etr_factor: f64) {
        let (mut etr_avg, mut tmin_avg, mut tmax_avg, mut precip_avg) = (0.10, 30.0, 55.0, 0.0);
        let start = self.first_day as usize - 1;
        for k in 0..record.max_temp.len() {
            let i = start + k;
            self.etr[i] = if in_range(record.etr[k], ETR_RANGE) {
                record.etr[k]
            } else {
                etr_avg
            };
            self.min_temp[i] = if in_range(record.min_temp[k], MIN_TEMP_RANGE) {
                record.min_temp[k]
            } else {
                tmin_avg
            };
            self.max_temp[i] = if in_range(record.max_temp[k], MAX_TEMP_RANGE) {
                record.max_temp[k]
            } else {
                tmax_avg
            };
            self.precip[i] = if in_range(record.precip[k], PRECIP_RANGE) {
                record.precip[k]
            } else {
                precip_avg
            };
            // Earlier ETR slots already carry the adjustment factor when averaged
            if k >= 3 {
                etr_avg = (self.etr[i] + self.etr[i - 1] + self.etr[i - 2]) / 3.0;
                tmin_avg = (self.min_temp[i] + self.min_temp[i - 1] + self.min_temp[i - 2]) / 3.0;
                tmax_avg = (self.max_temp[i] + self.max_temp[i - 1] + self.max_temp[i - 2]) / 3.0;
                precip_avg = (self.precip[i] + self.precip[i - 1] + self.precip[i - 2]) / 3.0;
            }
            self.etr[i] *= etr_factor;
        }
    }

    // Clear-sky radiation from latitude/elevation, reduced by the diurnal range (wet and dry day fits)
    fn estimate_solar(&mut self, latitude: f64, elevation: f64, station_days: usize) {
        let rso_a = 753.6 - 6.53 * latitude + 0.0057 * elevation;
        let rso_b = -7.1 + 6.4 * latitude + 0.0030 * elevation;
        let mut sum = 0.0;
        for i in 0..self.last_day as usize {
            let day = (i + 1) as f64;
            let (tmax, tmin) = (self.max_temp[i], self.min_temp[i]);
            let tavg = 0.5 * (tmax + tmin);
            let rso = rso_a + rso_b * (2.0 * 3.14159 * (day - 170.0) / 365.0).cos();
            let delta = tmax - tmin;
            self.solar[i] = if self.precip[i] > 0.2 {
                rso * (0.0146 * tavg).exp() / (1.0 + (-delta / 36.301).exp()).powf(3.6795)
            } else {
                rso * (7.82e-4 * tavg).exp() / (1.0 + (-delta / 9.4619).exp()).powf(3.6142)
            };
            sum += tavg;
        }
        self.annual_mean_temp = sum / station_days as f64;
    }

    pub fn covers(&self, last_day: u32) -> bool {
        last_day <= self.last_day
    }

    pub fn max_temp(&self, jday: u32) -> f64 {
        slot(&self.max_temp, jday)
    }

    pub fn min_temp(&self, jday: u32) -> f64 {
        slot(&self.min_temp, jday)
    }

    pub fn mean_temp(&self, jday: u32) -> f64 {
        0.5 * (self.max_temp(jday) + self.min_temp(jday))
    }

    pub fn precip(&self, jday: u32) -> f64 {
        slot(&self.precip, jday)
    }

    pub fn etr(&self, jday: u32) -> f64 {
        slot(&self.etr, jday)
    }

    pub fn solar(&self, jday: u32) -> f64 {
        slot(&self.solar, jday)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(days: usize) -> WeatherRecord {
        WeatherRecord {
            station: "TEST".into(),
            year: 2000,
            latitude: 41.0,
            elevation: 2000.0,
            start: MonthDay::new(1, 1),
            max_temp: vec![80.0; days],
            min_temp: vec![50.0; days],
            precip: vec![0.0; days],
            etr: vec![0.2; days],
        }
    }

    #[test]
    fn etr_factor_applied() {
        let w = DailyWeather::from_record(&record(10), 0.9).unwrap();
        assert_relative_eq!(w.etr(1), 0.18);
        assert_relative_eq!(w.etr(10), 0.18);
        assert_eq!(w.etr(11), 0.0);
        assert_eq!(w.last_day, 10);
    }

    #[test]
    fn early_bad_values_use_defaults() {
        let mut r = record(10);
        r.max_temp[0] = 200.0;
        r.min_temp[1] = -90.0;
        r.etr[2] = 1.5;
        r.precip[0] = -1.0;
        let w = DailyWeather::from_record(&r, 1.0).unwrap();
        assert_eq!(w.max_temp(1), 55.0);
        assert_eq!(w.min_temp(2), 30.0);
        assert_eq!(w.etr(3), 0.10);
        assert_eq!(w.precip(1), 0.0);
    }

    #[test]
    fn later_bad_values_use_running_average() {
        let mut r = record(10);
        r.max_temp[3] = 82.0;
        r.max_temp[4] = 84.0;
        r.max_temp[5] = 86.0;
        r.max_temp[6] = 999.0;
        let w = DailyWeather::from_record(&r, 1.0).unwrap();
        assert_relative_eq!(w.max_temp(7), 84.0);
    }

    #[test]
    fn wet_days_change_solar_estimate() {
        let mut r = record(200);
        r.precip[171] = 1.0;
        let w = DailyWeather::from_record(&r, 1.0).unwrap();
        assert!(w.solar(172) > 0.0);
        assert!(w.solar(171) > 0.0);
        assert!((w.solar(172) - w.solar(171)).abs() > 1.0);
        assert_relative_eq!(w.annual_mean_temp, 65.0);
    }

    #[test]
    fn mismatched_series_rejected() {
        let mut r = record(10);
        r.etr.pop();
        assert!(matches!(
            DailyWeather::from_record(&r, 1.0),
            Err(SimError::InvalidInput(_))
        ));
    }

    #[test]
    fn overrunning_record_rejected() {
        let mut r = record(30);
        r.start = MonthDay::new(12, 15);
        assert!(DailyWeather::from_record(&r, 1.0).is_err());
    }
}
