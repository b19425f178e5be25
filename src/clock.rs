//! Wall-clock access
//!
//! Cache validity and the default active weekday both depend on the user's
//! local calendar date, so time is injected rather than read ad hoc.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};

/// Locale-stable calendar date format, e.g. `Wed Oct 14 2026`
const CALENDAR_DATE_FORMAT: &str = "%a %b %d %Y";

pub trait Clock: Send + Sync {
  /// Current calendar date in the user's timezone
  fn today(&self) -> NaiveDate;

  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn today(&self) -> NaiveDate {
    Local::now().date_naive()
  }

  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Render a date as the validity string stored next to cached content
pub fn format_calendar_date(date: NaiveDate) -> String {
  date.format(CALENDAR_DATE_FORMAT).to_string()
}

/// Weekday index into a weekly plan: Monday = 0 ... Sunday = 6
pub fn weekday_index(date: NaiveDate) -> usize {
  date.weekday().num_days_from_monday() as usize
}
