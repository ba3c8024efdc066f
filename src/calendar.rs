// Day-of-year helpers on the fixed non-leap calendar used by the weather records.
// Day 366 is accepted and lands in December.

// Days elapsed before the first of each month
const MONTH_OFFSETS: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

pub const DAY_SLOTS: usize = 366;

// Day of year for a (month, day) pair, 1-based. Month 0 means "unset" and maps to day 0.
pub fn day_of_year(month: u32, day: u32) -> Option<u32> {
    match month {
        0 => Some(0),
        1..=12 => Some(day + MONTH_OFFSETS[month as usize - 1]),
        _ => None,
    }
}

// (month, day-of-month) for a day of year. Day 0 is (0, 0), days past 366 are (13, 0).
pub fn calendar_day(jday: u32) -> (u32, u32) {
    if jday == 0 {
        return (0, 0);
    }
    if jday > DAY_SLOTS as u32 {
        return (13, 0);
    }
    let month = MONTH_OFFSETS
        .iter()
        .rposition(|&offset| jday > offset)
        .map(|i| i + 1)
        .unwrap_or(1);
    (month as u32, jday - MONTH_OFFSETS[month - 1])
}

pub fn month_of(jday: u32) -> u32 {
    calendar_day(jday).0
}
