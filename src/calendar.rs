use crate::worker::{Worker, WorkerId};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Upper bound on how far `next_workday` probes before giving up.
pub const MAX_WORKDAY_PROBE_DAYS: i64 = 3660;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalendarError {
    #[error("no holiday database for region '{0}'")]
    UnknownRegion(String),
    #[error("a work week needs at least one working day")]
    EmptyWorkWeek,
    #[error("time-off for worker {worker} runs backwards ({start} > {end})")]
    InvertedTimeOff {
        worker: WorkerId,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Which weekdays the shop is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkWeek {
    working_days: Vec<Weekday>,
}

impl WorkWeek {
    pub fn new<I>(working_days: I) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = Weekday>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        if working.is_empty() {
            return Err(CalendarError::EmptyWorkWeek);
        }
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup_by(|a, b| a.num_days_from_monday() == b.num_days_from_monday());
        Ok(Self {
            working_days: working,
        })
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        !self.working_days.contains(&date.weekday())
    }
}

impl Default for WorkWeek {
    fn default() -> Self {
        Self {
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

impl Holiday {
    pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
        }
    }
}

/// A holiday database keyed by region code.
pub trait HolidayProvider: Send + Sync {
    fn region(&self) -> &str;
    fn holidays(&self, year: i32) -> Vec<Holiday>;
}

/// US federal holidays plus the common shop closures around them.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsFederalHolidays;

impl UsFederalHolidays {
    pub const NAMES: [&'static str; 13] = [
        "New Year's Day",
        "Martin Luther King Jr. Day",
        "Presidents' Day",
        "Memorial Day",
        "Juneteenth",
        "Independence Day",
        "Labor Day",
        "Columbus Day",
        "Veterans Day",
        "Thanksgiving",
        "Day after Thanksgiving",
        "Christmas Eve",
        "Christmas Day",
    ];

    fn fixed(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// Find the nth occurrence of a weekday in a month
    fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
        let mut date = NaiveDate::from_ymd_opt(year, month, 1)?;
        let mut count = 0;
        while date.month() == month {
            if date.weekday() == weekday {
                count += 1;
                if count == n {
                    return Some(date);
                }
            }
            date += Duration::days(1);
        }
        None
    }

    /// Find the last occurrence of a weekday in a month
    fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
        let first_of_next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        let mut date = first_of_next - Duration::days(1);
        while date.weekday() != weekday {
            date -= Duration::days(1);
        }
        Some(date)
    }
}

impl HolidayProvider for UsFederalHolidays {
    fn region(&self) -> &str {
        "US"
    }

    fn holidays(&self, year: i32) -> Vec<Holiday> {
        let thanksgiving = Self::nth_weekday(year, 11, Weekday::Thu, 4);
        let dates = [
            Self::fixed(year, 1, 1),
            Self::nth_weekday(year, 1, Weekday::Mon, 3),
            Self::nth_weekday(year, 2, Weekday::Mon, 3),
            Self::last_weekday(year, 5, Weekday::Mon),
            Self::fixed(year, 6, 19),
            Self::fixed(year, 7, 4),
            Self::nth_weekday(year, 9, Weekday::Mon, 1),
            Self::nth_weekday(year, 10, Weekday::Mon, 2),
            Self::fixed(year, 11, 11),
            thanksgiving,
            thanksgiving.map(|date| date + Duration::days(1)),
            Self::fixed(year, 12, 24),
            Self::fixed(year, 12, 25),
        ];
        dates
            .into_iter()
            .zip(Self::NAMES)
            .filter_map(|(date, name)| date.map(|date| Holiday::new(date, name)))
            .collect()
    }
}

pub fn provider_for_region(region: &str) -> Result<Arc<dyn HolidayProvider>, CalendarError> {
    match region.trim().to_ascii_uppercase().as_str() {
        "US" | "USA" => Ok(Arc::new(UsFederalHolidays)),
        other => Err(CalendarError::UnknownRegion(other.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomHoliday {
    pub date: NaiveDate,
    #[serde(default)]
    pub name: String,
}

/// Shop-wide holiday selection: which standard holidays are observed, plus
/// explicit extra closure dates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HolidayConfig {
    #[serde(default)]
    pub standard: BTreeSet<String>,
    #[serde(default)]
    pub custom: Vec<CustomHoliday>,
}

impl HolidayConfig {
    /// Observe exactly the named standard holidays.
    pub fn all_standard(names: &[&str]) -> Self {
        Self {
            standard: names.iter().map(|name| name.to_string()).collect(),
            custom: Vec::new(),
        }
    }

    pub fn with_standard(mut self, name: impl Into<String>) -> Self {
        self.standard.insert(name.into());
        self
    }

    pub fn with_custom(mut self, date: NaiveDate, name: impl Into<String>) -> Self {
        self.custom.push(CustomHoliday {
            date,
            name: name.into(),
        });
        self
    }
}

/// Opted-in holiday dates. Global, not per worker.
///
/// Years inside the resolved span are answered from a table. Any other year is
/// looked up in the holiday database when asked, so a date's own year always
/// counts.
#[derive(Clone, Default)]
pub struct HolidayMap {
    dates: HashMap<NaiveDate, String>,
    span: Option<(i32, i32)>,
    rules: Option<HolidayRules>,
}

#[derive(Clone)]
struct HolidayRules {
    provider: Arc<dyn HolidayProvider>,
    standard: BTreeSet<String>,
}

impl HolidayRules {
    fn observed_on(&self, date: NaiveDate) -> Option<String> {
        self.provider
            .holidays(date.year())
            .into_iter()
            .find(|holiday| holiday.date == date && self.standard.contains(&holiday.name))
            .map(|holiday| holiday.name)
    }
}

impl HolidayMap {
    pub fn resolve(
        config: &HolidayConfig,
        provider: Arc<dyn HolidayProvider>,
        start_year: i32,
        end_year: i32,
    ) -> Self {
        let (start, end) = if start_year <= end_year {
            (start_year, end_year)
        } else {
            (end_year, start_year)
        };

        let mut dates = HashMap::new();
        for year in start..=end {
            for holiday in provider.holidays(year) {
                if config.standard.contains(&holiday.name) {
                    dates.insert(holiday.date, holiday.name);
                }
            }
        }
        for custom in &config.custom {
            dates.entry(custom.date).or_insert_with(|| custom.name.clone());
        }
        Self {
            dates,
            span: Some((start, end)),
            rules: Some(HolidayRules {
                provider,
                standard: config.standard.clone(),
            }),
        }
    }

    /// Fixed closure dates with no holiday database behind them.
    pub fn from_dates<I>(dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        Self {
            dates: dates
                .into_iter()
                .map(|date| (date, String::new()))
                .collect(),
            span: None,
            rules: None,
        }
    }

    /// Years answered from the resolved table.
    pub fn span(&self) -> Option<(i32, i32)> {
        self.span
    }

    fn outside_span(&self, date: NaiveDate) -> bool {
        self.span
            .is_none_or(|(start, end)| date.year() < start || date.year() > end)
    }

    fn looked_up(&self, date: NaiveDate) -> Option<String> {
        if !self.outside_span(date) {
            return None;
        }
        self.rules.as_ref()?.observed_on(date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains_key(&date) || self.looked_up(date).is_some()
    }

    pub fn name_of(&self, date: NaiveDate) -> Option<String> {
        self.dates
            .get(&date)
            .cloned()
            .or_else(|| self.looked_up(date))
    }

    /// Number of dates in the resolved table.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

impl fmt::Debug for HolidayMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HolidayMap")
            .field("dates", &self.dates.len())
            .field("span", &self.span)
            .field(
                "region",
                &self.rules.as_ref().map(|rules| rules.provider.region()),
            )
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NonWorkday {
    Weekend,
    Holiday(String),
    TimeOff,
}

/// Single source of truth for "is this date closed for worker W".
#[derive(Debug, Clone, Default)]
pub struct CalendarOracle {
    week: WorkWeek,
    holidays: HolidayMap,
    time_off: HashMap<WorkerId, HashSet<NaiveDate>>,
}

impl CalendarOracle {
    pub fn new(week: WorkWeek, holidays: HolidayMap) -> Self {
        Self {
            week,
            holidays,
            time_off: HashMap::new(),
        }
    }

    /// Builds the oracle with every worker's time-off expanded into a date set.
    pub fn for_roster<'a, I>(
        week: WorkWeek,
        holidays: HolidayMap,
        roster: I,
    ) -> Result<Self, CalendarError>
    where
        I: IntoIterator<Item = &'a Worker>,
    {
        let mut oracle = Self::new(week, holidays);
        for worker in roster {
            oracle.set_time_off(worker)?;
        }
        Ok(oracle)
    }

    pub fn set_time_off(&mut self, worker: &Worker) -> Result<(), CalendarError> {
        let mut days = HashSet::new();
        for interval in &worker.time_off {
            if !interval.is_well_formed() {
                return Err(CalendarError::InvertedTimeOff {
                    worker: worker.id,
                    start: interval.start,
                    end: interval.end,
                });
            }
            days.extend(interval.days());
        }
        if days.is_empty() {
            self.time_off.remove(&worker.id);
        } else {
            self.time_off.insert(worker.id, days);
        }
        Ok(())
    }

    pub fn set_holidays(&mut self, holidays: HolidayMap) {
        self.holidays = holidays;
    }

    pub fn week(&self) -> &WorkWeek {
        &self.week
    }

    pub fn holidays(&self) -> &HolidayMap {
        &self.holidays
    }

    pub fn is_non_workday(&self, date: NaiveDate, worker_id: WorkerId) -> bool {
        self.week.is_weekend(date)
            || self.holidays.contains(date)
            || self
                .time_off
                .get(&worker_id)
                .is_some_and(|days| days.contains(&date))
    }

    /// Like `is_non_workday`, but says why. Weekend wins over holiday, holiday over time-off.
    pub fn classify(&self, date: NaiveDate, worker_id: WorkerId) -> Option<NonWorkday> {
        if self.week.is_weekend(date) {
            return Some(NonWorkday::Weekend);
        }
        if let Some(name) = self.holidays.name_of(date) {
            return Some(NonWorkday::Holiday(name));
        }
        if self
            .time_off
            .get(&worker_id)
            .is_some_and(|days| days.contains(&date))
        {
            return Some(NonWorkday::TimeOff);
        }
        None
    }

    /// First date on or after `date` that is a workday for `worker_id`.
    ///
    /// An already valid workday comes back unchanged. Returns `None` only when
    /// nothing within [`MAX_WORKDAY_PROBE_DAYS`] is open.
    pub fn next_workday(&self, date: NaiveDate, worker_id: WorkerId) -> Option<NaiveDate> {
        let mut current = date;
        for _ in 0..MAX_WORKDAY_PROBE_DAYS {
            if !self.is_non_workday(current, worker_id) {
                return Some(current);
            }
            current = current.succ_opt()?;
        }
        None
    }

    /// Count workdays for a worker in an inclusive range.
    pub fn count_workdays(&self, start: NaiveDate, end: NaiveDate, worker_id: WorkerId) -> i64 {
        let mut count = 0;
        let mut current = start;
        while current <= end {
            if !self.is_non_workday(current, worker_id) {
                count += 1;
            }
            current += Duration::days(1);
        }
        count
    }
}
