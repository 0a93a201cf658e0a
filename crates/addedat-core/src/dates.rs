use chrono::{Local, LocalResult, NaiveDate, TimeZone};

use crate::error::{CoreError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date. Never defaults on bad input.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|_| CoreError::InvalidDate {
        input: input.to_string(),
    })
}

/// Unix seconds of `date` at 00:00:00 in `tz`.
pub fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<i64> {
    let naive = date.and_hms_opt(0, 0, 0).ok_or(CoreError::NonexistentLocalTime { date })?;
    resolve(tz.from_local_datetime(&naive), date, true)
}

/// Unix seconds of the last whole second of `date` (23:59:59) in `tz`.
pub fn end_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Result<i64> {
    let naive = date
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .ok_or(CoreError::NonexistentLocalTime { date })?;
    resolve(tz.from_local_datetime(&naive), date, false)
}

/// `YYYY-MM-DD` to local-midnight Unix seconds, the value written as `addedAt`.
pub fn date_to_unix(input: &str) -> Result<i64> {
    start_of_day(parse_date(input)?, &Local)
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Render Unix seconds as a local `YYYY-MM-DD`.
pub fn format_unix_date(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.format(DATE_FORMAT).to_string(),
        LocalResult::None => "1970-01-01".to_string(),
    }
}

fn resolve<Tz: TimeZone>(result: LocalResult<chrono::DateTime<Tz>>, date: NaiveDate, earliest: bool) -> Result<i64> {
    let dt = match result {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(first, second) => {
            if earliest {
                first
            } else {
                second
            }
        }
        LocalResult::None => return Err(CoreError::NonexistentLocalTime { date }),
    };
    Ok(dt.timestamp())
}
