use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};

pub const DAYS_PER_WEEK: i64 = 7;

/// Drops the time-of-day component. Callers normalise before handing dates to the engine.
pub fn normalize(moment: NaiveDateTime) -> NaiveDate {
    moment.date()
}

/// Monday of the week containing `day`. Saturates at the first representable date.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    let back = i64::from(day.weekday().num_days_from_monday());
    add_days(day, -back).unwrap_or(NaiveDate::MIN)
}

/// `None` when the result falls outside chrono's calendar range.
pub fn add_days(day: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        day.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        day.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

/// Whole weeks from the week containing `from` to the week containing `to`.
/// Negative when `to` lies in an earlier week.
pub fn weeks_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let days = (week_start(to) - week_start(from)).num_days();
    days.div_euclid(DAYS_PER_WEEK)
}

/// Weekday as stored in `Task::repeat_day`: 0 = Sunday through 6 = Saturday.
pub fn weekday_index(day: NaiveDate) -> u8 {
    // num_days_from_sunday is always < 7
    day.weekday().num_days_from_sunday() as u8
}
