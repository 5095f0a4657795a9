use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

pub type WorkerId = i32;

/// Inclusive range of calendar days during which a worker is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOff {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TimeOff {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            note: None,
        }
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn is_well_formed(&self) -> bool {
        self.start <= self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every calendar day covered by the interval. Empty when `start > end`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let span = (self.end - self.start).num_days();
        (0..=span.max(-1)).map(move |offset| self.start + Duration::days(offset))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
    /// Display color for the timeline. Never read by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default = "default_true")]
    pub can_schedule: bool,
    /// Membership in the active roster.
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub time_off: Vec<TimeOff>,
}

fn default_true() -> bool {
    true
}

impl Worker {
    pub fn new(id: WorkerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: None,
            can_schedule: true,
            active: true,
            time_off: Vec::new(),
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_time_off(mut self, time_off: TimeOff) -> Self {
        self.time_off.push(time_off);
        self
    }

    /// Whether new work may be placed in this worker's queue.
    pub fn accepts_work(&self) -> bool {
        self.active && self.can_schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn time_off_days_are_inclusive() {
        let interval = TimeOff::new(d(2025, 3, 3), d(2025, 3, 5));
        let days: Vec<_> = interval.days().collect();
        assert_eq!(days, vec![d(2025, 3, 3), d(2025, 3, 4), d(2025, 3, 5)]);
        assert!(interval.contains(d(2025, 3, 5)));
        assert!(!interval.contains(d(2025, 3, 6)));
    }

    #[test]
    fn inverted_time_off_covers_nothing() {
        let interval = TimeOff::new(d(2025, 3, 5), d(2025, 3, 3));
        assert!(!interval.is_well_formed());
        assert_eq!(interval.days().count(), 0);
    }

    #[test]
    fn worker_without_schedule_flag_rejects_work() {
        let mut worker = Worker::new(7, "Dana");
        assert!(worker.accepts_work());
        worker.can_schedule = false;
        assert!(!worker.accepts_work());
    }
}
