use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use taskcal_core::{
    calendar::{CalendarView, ScrollBounds},
    notifications::{Feedback, FeedbackLevel, FeedbackSink},
    progress::{DayProgress, DayStatus, TaskDayState},
    service::AgendaEntry,
    store::JsonFileStore,
    TaskService,
};
use tracing::{info, warn};

const WEEKDAY_HEADERS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) data_path: PathBuf,
    pub(crate) today: Option<NaiveDate>,
    pub(crate) selected: Option<NaiveDate>,
    pub(crate) week_offset: i64,
    pub(crate) unlocked: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("taskcal.json"),
            today: None,
            selected: None,
            week_offset: 0,
            unlocked: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = lookup("TASKCAL_DATA") {
            if !path.trim().is_empty() {
                config.data_path = PathBuf::from(path.trim());
            }
        }
        config.today = lookup("TASKCAL_TODAY").and_then(|raw| parse_day("TASKCAL_TODAY", &raw));
        config.selected =
            lookup("TASKCAL_SELECTED").and_then(|raw| parse_day("TASKCAL_SELECTED", &raw));
        if let Some(raw) = lookup("TASKCAL_WEEK_OFFSET") {
            match raw.trim().parse::<i64>() {
                Ok(value) => config.week_offset = value,
                Err(err) => warn!(value = %raw, %err, "ignoring TASKCAL_WEEK_OFFSET"),
            }
        }
        if let Some(raw) = lookup("TASKCAL_UNLOCKED") {
            config.unlocked = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        info!(path = %config.data_path.display(), "using data file");
        Ok(config)
    }
}

fn parse_day(key: &str, raw: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(day) => Some(day),
        Err(err) => {
            warn!(key, value = %raw, %err, "ignoring malformed date");
            None
        }
    }
}

/// Scroll position of the grid. While locked the grid stays on the default view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Navigator {
    pub week_offset: i64,
    pub locked: bool,
}

impl Navigator {
    pub fn new(week_offset: i64, locked: bool, bounds: &ScrollBounds) -> Self {
        if locked {
            return Self {
                week_offset: 0,
                locked,
            };
        }
        Self {
            week_offset: bounds.clamp(week_offset),
            locked,
        }
    }

    pub fn can_scroll_back(&self, bounds: &ScrollBounds) -> bool {
        !self.locked && bounds.can_scroll_back(self.week_offset)
    }

    pub fn can_scroll_forward(&self, bounds: &ScrollBounds) -> bool {
        !self.locked && bounds.can_scroll_forward(self.week_offset)
    }

    pub fn scroll_back(&mut self, bounds: &ScrollBounds) -> bool {
        if !self.can_scroll_back(bounds) {
            return false;
        }
        self.week_offset -= 1;
        true
    }

    pub fn scroll_forward(&mut self, bounds: &ScrollBounds) -> bool {
        if !self.can_scroll_forward(bounds) {
            return false;
        }
        self.week_offset += 1;
        true
    }

    /// Locking snaps back to the default view.
    pub fn toggle_lock(&mut self) {
        if !self.locked {
            self.week_offset = 0;
        }
        self.locked = !self.locked;
    }
}

struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn notify(&self, feedback: Feedback) {
        match feedback.level {
            FeedbackLevel::Success => info!(message = %feedback.message, "feedback"),
            FeedbackLevel::Error => warn!(message = %feedback.message, "feedback"),
        }
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    let today = config.today.unwrap_or_else(|| Local::now().date_naive());
    let selected = config.selected.unwrap_or(today);
    let service = TaskService::builder()
        .with_store(JsonFileStore::open(&config.data_path))
        .with_feedback_sink(Box::new(LogFeedback))
        .build()?;

    let bounds = service.scroll_bounds(today);
    let navigator = Navigator::new(config.week_offset, !config.unlocked, &bounds);
    let view = service.calendar(today, navigator.week_offset)?;
    let agenda = service.day_agenda(selected)?;
    let progress = service.day_progress(selected, today)?;

    let mut out = render_calendar(&view, selected, &navigator);
    out.push('\n');
    out.push_str(&render_agenda(selected, &agenda, &progress));
    print!("{out}");
    Ok(())
}

pub fn status_glyph(status: DayStatus) -> char {
    match status {
        DayStatus::Empty => '·',
        DayStatus::Complete => '✓',
        DayStatus::Partial => '◐',
        DayStatus::Upcoming => '○',
        DayStatus::Overdue => '!',
    }
}

pub fn render_calendar(view: &CalendarView, selected: NaiveDate, navigator: &Navigator) -> String {
    let mut out = String::new();
    let back = if navigator.can_scroll_back(&view.bounds) {
        '<'
    } else {
        ' '
    };
    let forward = if navigator.can_scroll_forward(&view.bounds) {
        '>'
    } else {
        ' '
    };
    let _ = writeln!(
        out,
        "{back} week offset {} {forward}{}",
        view.week_offset,
        if navigator.locked { " (locked)" } else { "" }
    );
    for header in WEEKDAY_HEADERS {
        let _ = write!(out, "{header:^9}");
    }
    out.push('\n');
    for week in view.weeks() {
        for cell in week {
            let marker = if cell.date == selected {
                '['
            } else if cell.is_today {
                '*'
            } else {
                ' '
            };
            let percent = if cell.status == DayStatus::Empty {
                String::from("   ")
            } else {
                format!("{:>3}", (cell.progress * 100.0).round() as u32)
            };
            let _ = write!(
                out,
                "{marker}{:>2}{}{percent} ",
                cell.date.day(),
                status_glyph(cell.status)
            );
        }
        out.push('\n');
    }
    out
}

pub fn render_agenda(day: NaiveDate, entries: &[AgendaEntry], progress: &DayProgress) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} ({}/{} done)",
        day.format("%a %Y-%m-%d"),
        status_glyph(progress.status),
        progress.completed,
        progress.due
    );
    if entries.is_empty() {
        out.push_str("  nothing due\n");
        return out;
    }
    for entry in entries {
        let mark = match entry.state {
            TaskDayState::Completed => "[x]",
            TaskDayState::Skipped => "[-]",
            TaskDayState::Pending | TaskDayState::NotDue => "[ ]",
        };
        let _ = writeln!(out, "  {mark} {}", entry.task.title);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use taskcal_core::model::{RepeatType, Task};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn config_reads_environment_values() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TASKCAL_DATA", "/tmp/tasks.json"),
            ("TASKCAL_TODAY", "2025-10-22"),
            ("TASKCAL_WEEK_OFFSET", "-2"),
            ("TASKCAL_UNLOCKED", "yes"),
        ]))
        .unwrap();
        assert_eq!(config.data_path, PathBuf::from("/tmp/tasks.json"));
        assert_eq!(config.today, Some(date(2025, 10, 22)));
        assert_eq!(config.week_offset, -2);
        assert!(config.unlocked);
        assert_eq!(config.selected, None);
    }

    #[test]
    fn config_ignores_malformed_values() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TASKCAL_TODAY", "22/10/2025"),
            ("TASKCAL_WEEK_OFFSET", "back"),
        ]))
        .unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn navigator_respects_lock_and_bounds() {
        let bounds = ScrollBounds { min: -2, max: 0 };
        let mut nav = Navigator::new(-5, true, &bounds);
        assert_eq!(nav.week_offset, 0);
        assert!(!nav.scroll_back(&bounds));

        nav.toggle_lock();
        assert!(nav.scroll_back(&bounds));
        assert!(nav.scroll_back(&bounds));
        assert!(!nav.scroll_back(&bounds));
        assert_eq!(nav.week_offset, -2);
        assert!(nav.scroll_forward(&bounds));

        nav.toggle_lock();
        assert!(nav.locked);
        assert_eq!(nav.week_offset, 0);
        assert_eq!(Navigator::new(-5, false, &bounds).week_offset, -2);
    }

    #[test]
    fn renders_grid_and_agenda() {
        let today = date(2025, 10, 22);
        let snapshot = taskcal_core::model::Snapshot {
            tasks: vec![Task {
                id: "a".into(),
                title: "Stretch".into(),
                start_date: today,
                repeat_type: RepeatType::Daily,
                repeat_day: None,
                sort_order: 0,
            }],
            ..Default::default()
        };
        let view = taskcal_core::calendar::calendar_view(&snapshot, today, 0).unwrap();
        let navigator = Navigator::new(0, false, &view.bounds);
        let grid = render_calendar(&view, today, &navigator);
        let lines: Vec<&str> = grid.lines().collect();
        assert_eq!(lines.len(), 8);
        assert!(lines[0].starts_with('<'));
        assert!(lines[1].contains("Mon"));
        assert!(grid.contains("[22◐  0"));
        assert!(grid.contains("23○"));

        let entries = vec![AgendaEntry {
            task: snapshot.tasks[0].clone(),
            state: TaskDayState::Completed,
        }];
        let progress = DayProgress {
            status: DayStatus::Complete,
            progress: 1.0,
            due: 1,
            completed: 1,
        };
        let agenda = render_agenda(today, &entries, &progress);
        assert!(agenda.starts_with("Wed 2025-10-22 ✓ (1/1 done)"));
        assert!(agenda.contains("[x] Stretch"));
    }
}
