//! Clock time (group 4A)

use std::fmt;

#[cfg(feature = "chrono")]
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

/// Date and time from a type 4A group
///
/// The broadcast time is UTC. Stations also transmit their
/// local time offset, in half hours.
///
/// ```
/// use rdsurvey::ClockTime;
///
/// // 2018-01-01, 13:45 UTC, local offset +1 hour
/// let ct = ClockTime::from_blocks(0x4001, 0xc60e, 0xdb42).unwrap();
/// assert_eq!((2018, 1, 1), ct.date());
/// assert_eq!("2018-01-01 14:45+01:00", ct.to_string());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClockTime {
    mjd: u32,
    year: i32,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    offset_half_hours: i8,
}

impl ClockTime {
    /// Decode from blocks B, C, and D of a 4A group
    ///
    /// Returns `None` if the fields do not describe a
    /// plausible date and time.
    pub fn from_blocks(b1: u16, b2: u16, b3: u16) -> Option<Self> {
        let mjd = (((b1 & 0x3) as u32) << 15) | ((b2 & 0xfffe) >> 1) as u32;
        let hour = (((b2 & 1) << 4) | ((b3 >> 12) & 0xf)) as u8;
        let minute = ((b3 >> 6) & 0x3f) as u8;
        let magnitude = (b3 & 0x1f) as i8;
        let offset_half_hours = if b3 & 0x20 == 0 {
            magnitude
        } else {
            -magnitude
        };

        Self::new(mjd, hour, minute, offset_half_hours)
    }

    /// From Modified Julian Day, UTC hour and minute, and offset
    pub fn new(mjd: u32, hour: u8, minute: u8, offset_half_hours: i8) -> Option<Self> {
        // MJD 15079 is 1900-03-01, below which the conversion fails
        if mjd < 15079 || hour > 23 || minute > 59 || offset_half_hours.abs() > 24 {
            return None;
        }

        let (year, month, day) = mjd_to_date(mjd);
        Some(Self {
            mjd,
            year,
            month,
            day,
            hour,
            minute,
            offset_half_hours,
        })
    }

    /// Modified Julian Day
    pub fn mjd(&self) -> u32 {
        self.mjd
    }

    /// UTC date, as (year, month, day)
    pub fn date(&self) -> (i32, u8, u8) {
        (self.year, self.month, self.day)
    }

    /// UTC time, as (hour, minute)
    pub fn time(&self) -> (u8, u8) {
        (self.hour, self.minute)
    }

    /// Local time offset, in half hours
    pub fn offset_half_hours(&self) -> i8 {
        self.offset_half_hours
    }

    /// Local date and time, as (year, month, day, hour, minute)
    pub fn local(&self) -> (i32, u8, u8, u8, u8) {
        let minutes = self.mjd as i64 * 1440
            + self.hour as i64 * 60
            + self.minute as i64
            + self.offset_half_hours as i64 * 30;
        let mjd = minutes.div_euclid(1440) as u32;
        let rem = minutes.rem_euclid(1440);
        let (year, month, day) = mjd_to_date(mjd);
        (year, month, day, (rem / 60) as u8, (rem % 60) as u8)
    }

    /// Convert to a timestamp in the station's local offset
    ///
    /// Requires `chrono`.
    #[cfg(feature = "chrono")]
    pub fn to_datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.offset_half_hours as i32 * 1800)?;
        let utc = NaiveDate::from_ymd_opt(self.year, self.month as u32, self.day as u32)?
            .and_hms_opt(self.hour as u32, self.minute as u32, 0)?;
        Some(offset.from_utc_datetime(&utc))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (year, month, day, hour, minute) = self.local();
        let sign = if self.offset_half_hours < 0 { '-' } else { '+' };
        let offset = self.offset_half_hours.unsigned_abs() as u32 * 30;
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}{}{:02}:{:02}",
            year,
            month,
            day,
            hour,
            minute,
            sign,
            offset / 60,
            offset % 60
        )
    }
}

// MJD to Gregorian calendar date, per the RDS standard annex
fn mjd_to_date(mjd: u32) -> (i32, u8, u8) {
    let mjd_f = mjd as f64;
    let yp = ((mjd_f - 15078.2) / 365.25) as i32;
    let yp_days = (yp as f64 * 365.25) as i32;
    let mp = ((mjd_f - 14956.1 - yp_days as f64) / 30.6001) as i32;
    let day = mjd as i32 - 14956 - yp_days - (mp as f64 * 30.6001) as i32;
    let k = if mp == 14 || mp == 15 { 1 } else { 0 };
    let year = 1900 + yp + k;
    let month = mp - 1 - k * 12;
    (year, month as u8, day as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(mjd: u32, hour: u16, minute: u16, offset: i8) -> (u16, u16, u16) {
        let b1 = 0x4000 | ((mjd >> 15) & 3) as u16;
        let b2 = (((mjd & 0x7fff) << 1) as u16) | (hour >> 4);
        let sign = if offset < 0 { 0x20 } else { 0 };
        let b3 = ((hour & 0xf) << 12) | (minute << 6) | sign | offset.unsigned_abs() as u16;
        (b1, b2, b3)
    }

    #[test]
    fn test_mjd_to_date() {
        assert_eq!((2018, 1, 1), mjd_to_date(58119));
        assert_eq!((2017, 12, 31), mjd_to_date(58118));
        assert_eq!((2000, 2, 29), mjd_to_date(51603));
        assert_eq!((1995, 10, 13), mjd_to_date(50003));
    }

    #[test]
    fn test_from_blocks() {
        let (b1, b2, b3) = blocks(58119, 13, 45, 2);
        assert_eq!((0x4001, 0xc60e, 0xdb42), (b1, b2, b3));

        let ct = ClockTime::from_blocks(b1, b2, b3).expect("valid");
        assert_eq!(58119, ct.mjd());
        assert_eq!((13, 45), ct.time());
        assert_eq!(2, ct.offset_half_hours());
        assert_eq!((2018, 1, 1, 14, 45), ct.local());
    }

    #[test]
    fn test_negative_offset_crosses_midnight() {
        let (b1, b2, b3) = blocks(58119, 0, 10, -2);
        let ct = ClockTime::from_blocks(b1, b2, b3).expect("valid");
        assert_eq!((2018, 1, 1), ct.date());
        assert_eq!("2017-12-31 23:10-01:00", ct.to_string());
    }

    #[test]
    fn test_invalid() {
        let (b1, b2, b3) = blocks(58119, 24, 10, 0);
        assert_eq!(None, ClockTime::from_blocks(b1, b2, b3));
        assert_eq!(None, ClockTime::from_blocks(0x4000, 0x0000, 0x0000));
    }

    #[test]
    #[cfg(feature = "chrono")]
    fn test_to_datetime() {
        use chrono::{Datelike, Timelike};

        let (b1, b2, b3) = blocks(58119, 13, 45, 2);
        let ct = ClockTime::from_blocks(b1, b2, b3).expect("valid");
        let dt = ct.to_datetime().expect("chrono");
        assert_eq!(3600, dt.offset().local_minus_utc());
        assert_eq!(14, dt.hour());
        assert_eq!(45, dt.minute());
        assert_eq!(2018, dt.year());
    }
}
