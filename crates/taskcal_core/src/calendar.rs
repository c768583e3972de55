use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{add_days, week_start, weeks_between, DAYS_PER_WEEK};
use crate::error::{CoreError, CoreResult};
use crate::model::{Snapshot, Task};
use crate::progress::{DayStatus, RecordIndex};

pub const VISIBLE_WEEKS: usize = 6;
pub const GRID_DAYS: usize = VISIBLE_WEEKS * DAYS_PER_WEEK as usize;
/// Weeks shown before the week at the current offset.
pub const LOOKBACK_WEEKS: i64 = 3;
pub const DEFAULT_MIN_WEEK_OFFSET: i64 = -6;
pub const MAX_WEEK_OFFSET: i64 = 0;

/// Tasks starting up to this many weeks back leave the floor at its default.
pub const RECENT_TASK_WEEKS: i64 = -DEFAULT_MIN_WEEK_OFFSET;

/// The 42 days shown for `week_offset`: three weeks before the offset week,
/// the offset week itself and the two weeks after it.
pub fn visible_days(today: NaiveDate, week_offset: i64) -> CoreResult<[NaiveDate; GRID_DAYS]> {
    let out_of_range = || CoreError::DateOutOfRange {
        from: today,
        days: week_offset.saturating_mul(DAYS_PER_WEEK),
    };
    let start_offset = week_offset
        .checked_mul(DAYS_PER_WEEK)
        .and_then(|days| days.checked_sub(LOOKBACK_WEEKS * DAYS_PER_WEEK))
        .ok_or_else(out_of_range)?;
    let grid_start = add_days(week_start(today), start_offset).ok_or_else(out_of_range)?;
    add_days(grid_start, GRID_DAYS as i64 - 1).ok_or_else(out_of_range)?;
    // every day up to the last one is representable
    Ok(std::array::from_fn(|i| {
        add_days(grid_start, i as i64).unwrap_or(grid_start)
    }))
}

/// Earliest offset the grid may scroll back to. Stays at -6 until a task starts
/// more than six weeks before the current week, then reaches far enough back
/// to leave three weeks of buffer around the earliest task's week.
pub fn min_week_offset(tasks: &[Task], today: NaiveDate) -> i64 {
    let Some(earliest) = tasks.iter().map(|task| task.start_date).min() else {
        return DEFAULT_MIN_WEEK_OFFSET;
    };
    let weeks_back = weeks_between(earliest, today);
    if weeks_back > RECENT_TASK_WEEKS {
        -(weeks_back + LOOKBACK_WEEKS)
    } else {
        DEFAULT_MIN_WEEK_OFFSET
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrollBounds {
    pub min: i64,
    pub max: i64,
}

impl ScrollBounds {
    pub fn for_tasks(tasks: &[Task], today: NaiveDate) -> Self {
        Self {
            min: min_week_offset(tasks, today),
            max: MAX_WEEK_OFFSET,
        }
    }

    pub fn can_scroll_back(&self, week_offset: i64) -> bool {
        week_offset > self.min
    }

    pub fn can_scroll_forward(&self, week_offset: i64) -> bool {
        week_offset < self.max
    }

    pub fn clamp(&self, week_offset: i64) -> i64 {
        week_offset.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub progress: f64,
    pub is_today: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarView {
    pub week_offset: i64,
    pub bounds: ScrollBounds,
    pub days: Vec<DayCell>,
}

impl CalendarView {
    pub fn weeks(&self) -> impl Iterator<Item = &[DayCell]> {
        self.days.chunks(DAYS_PER_WEEK as usize)
    }
}

/// Evaluates progress for every visible day. The offset is clamped to the scroll bounds.
pub fn calendar_view(
    snapshot: &Snapshot,
    today: NaiveDate,
    week_offset: i64,
) -> CoreResult<CalendarView> {
    let bounds = ScrollBounds::for_tasks(&snapshot.tasks, today);
    let week_offset = bounds.clamp(week_offset);
    let index = RecordIndex::build(&snapshot.completions, &snapshot.skips);
    let days = visible_days(today, week_offset)?
        .into_iter()
        .map(|date| {
            let progress = index.day_progress(&snapshot.tasks, date, today)?;
            Ok(DayCell {
                date,
                status: progress.status,
                progress: progress.progress,
                is_today: date == today,
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;
    Ok(CalendarView {
        week_offset,
        bounds,
        days,
    })
}
