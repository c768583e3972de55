use chrono::NaiveDate;

use crate::dates::{add_days, weekday_index, weeks_between, DAYS_PER_WEEK};
use crate::error::CoreResult;
use crate::model::{RepeatType, Task};

/// Whether `task` has an occurrence on `day`.
///
/// Weekly and fortnightly tasks without a usable `repeat_day` are reported as
/// [`CoreError::InvalidRecurrenceConfig`](crate::error::CoreError) for any day,
/// including days before the task starts.
pub fn is_due(task: &Task, day: NaiveDate) -> CoreResult<bool> {
    match task.repeat_type {
        RepeatType::None => Ok(day == task.start_date),
        RepeatType::Daily => Ok(day >= task.start_date),
        RepeatType::Weekly => {
            let weekday = task.recurring_weekday()?;
            Ok(day >= task.start_date && weekday_index(day) == weekday)
        }
        RepeatType::Fortnightly => {
            let weekday = task.recurring_weekday()?;
            if day < task.start_date || weekday_index(day) != weekday {
                return Ok(false);
            }
            // a matching day on or after the start exists, so the anchor does too
            let Some(anchor) = first_on_weekday(task.start_date, weekday) else {
                return Ok(false);
            };
            Ok(weeks_between(anchor, day).rem_euclid(2) == 0)
        }
    }
}

/// First day on or after `from` on which `task` is due. `None` when no such
/// day exists, including past the end of chrono's calendar.
pub fn next_due(task: &Task, from: NaiveDate) -> CoreResult<Option<NaiveDate>> {
    let from = from.max(task.start_date);
    let next = match task.repeat_type {
        RepeatType::None => (from == task.start_date).then_some(from),
        RepeatType::Daily => Some(from),
        RepeatType::Weekly => first_on_weekday(from, task.recurring_weekday()?),
        RepeatType::Fortnightly => {
            let weekday = task.recurring_weekday()?;
            match (
                first_on_weekday(task.start_date, weekday),
                first_on_weekday(from, weekday),
            ) {
                (Some(anchor), Some(candidate)) => {
                    if weeks_between(anchor, candidate).rem_euclid(2) == 0 {
                        Some(candidate)
                    } else {
                        add_days(candidate, DAYS_PER_WEEK)
                    }
                }
                _ => None,
            }
        }
    };
    Ok(next)
}

fn first_on_weekday(from: NaiveDate, weekday: u8) -> Option<NaiveDate> {
    let delta = (i64::from(weekday) - i64::from(weekday_index(from))).rem_euclid(DAYS_PER_WEEK);
    add_days(from, delta)
}
