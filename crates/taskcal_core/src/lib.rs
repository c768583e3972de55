pub mod calendar;
pub mod dates;
pub mod error;
pub mod model;
pub mod notifications;
pub mod progress;
pub mod recurrence;
pub mod service;
pub mod store;

pub use crate::calendar::{min_week_offset, visible_days};
pub use crate::error::{CoreError, CoreResult};
pub use crate::progress::day_progress;
pub use crate::recurrence::is_due;
pub use crate::service::{TaskService, TaskServiceBuilder};
