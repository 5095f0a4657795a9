use crate::calendar::{
    CalendarError, CalendarOracle, HolidayConfig, HolidayMap, HolidayProvider, NonWorkday,
    provider_for_region,
};
use crate::config::{ConfigError, SchedulerConfig};
use crate::duration::{DurationError, expand};
use crate::position::{insertion_index, timeline_frame, width, x_position};
use crate::sequencer::{ForcedMove, SequenceContext, SequenceError, sequence, verify_queue};
use crate::work_item::{WorkItem, WorkItemId};
use crate::worker::{Worker, WorkerId};
use chrono::{Datelike, Local, NaiveDate};
use polars::prelude::{DataFrame, PolarsResult};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error("work item {0} not found")]
    UnknownItem(WorkItemId),
    #[error("worker {0} not found")]
    UnknownWorker(WorkerId),
}

/// Owns the roster and every worker's ordered queue.
///
/// Queues only ever hold active items, sorted by start date. Soft-deleted items
/// are kept aside for history.
#[derive(Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    provider: Arc<dyn HolidayProvider>,
    holiday_config: HolidayConfig,
    oracle: CalendarOracle,
    roster: BTreeMap<WorkerId, Worker>,
    queues: BTreeMap<WorkerId, Vec<WorkItem>>,
    retired: Vec<WorkItem>,
    today: Option<NaiveDate>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::from_parts(config, Vec::new(), Vec::new(), HolidayConfig::default(), None)
    }

    /// Builds a scheduler from stored state. Queues are taken as stored; call
    /// [`Scheduler::resequence_all`] to recompute them.
    pub fn from_parts(
        config: SchedulerConfig,
        workers: Vec<Worker>,
        items: Vec<WorkItem>,
        holiday_config: HolidayConfig,
        today: Option<NaiveDate>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        let provider = provider_for_region(&config.region)?;
        let week = config.work_week()?;

        let mut roster: BTreeMap<WorkerId, Worker> =
            workers.into_iter().map(|worker| (worker.id, worker)).collect();
        roster.entry(config.default_worker_id).or_insert_with(|| {
            Worker::new(config.default_worker_id, config.default_worker_name.clone())
        });

        let mut queues: BTreeMap<WorkerId, Vec<WorkItem>> = BTreeMap::new();
        let mut retired = Vec::new();
        for item in items {
            if item.active {
                queues.entry(item.worker_id).or_default().push(item);
            } else {
                retired.push(item);
            }
        }
        for queue in queues.values_mut() {
            queue.sort_by_key(|item| item.start_date);
        }

        let oracle = CalendarOracle::for_roster(week, HolidayMap::default(), roster.values())?;
        let mut scheduler = Self {
            config,
            provider,
            holiday_config,
            oracle,
            roster,
            queues,
            retired,
            today,
        };
        scheduler.refresh_holidays();
        Ok(scheduler)
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.set_today(today);
        self
    }

    /// Pin "today" instead of reading the local clock.
    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = Some(today);
        self.refresh_holidays();
    }

    pub fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn workday_hours(&self) -> f64 {
        self.config.workday_hours
    }

    pub fn default_worker_id(&self) -> WorkerId {
        self.config.default_worker_id
    }

    pub fn oracle(&self) -> &CalendarOracle {
        &self.oracle
    }

    pub fn holiday_config(&self) -> &HolidayConfig {
        &self.holiday_config
    }

    /// Years whose holidays sit in the resolved table. Other years are looked
    /// up on demand.
    pub fn holiday_years(&self) -> (i32, i32) {
        let today = self.today().year();
        self.oracle
            .holidays()
            .span()
            .unwrap_or((today, today))
    }

    /// Names the holiday database offers for opting in.
    pub fn known_standard_holidays(&self) -> Vec<String> {
        self.provider
            .holidays(self.today().year())
            .into_iter()
            .map(|holiday| holiday.name)
            .collect()
    }

    pub fn context(&self) -> SequenceContext<'_> {
        SequenceContext::new(&self.oracle, self.config.workday_hours, self.today())
    }

    // ---- pure engine functions ----

    pub fn is_non_workday(&self, date: NaiveDate, worker_id: WorkerId) -> bool {
        self.oracle.is_non_workday(date, worker_id)
    }

    pub fn classify(&self, date: NaiveDate, worker_id: WorkerId) -> Option<NonWorkday> {
        self.oracle.classify(date, worker_id)
    }

    pub fn next_workday(&self, date: NaiveDate, worker_id: WorkerId) -> Option<NaiveDate> {
        self.oracle.next_workday(date, worker_id)
    }

    pub fn expand(
        &self,
        nominal_hours: f64,
        start: NaiveDate,
        worker_id: WorkerId,
    ) -> Result<f64, DurationError> {
        expand(
            &self.oracle,
            nominal_hours,
            start,
            worker_id,
            self.config.workday_hours,
        )
    }

    /// Preview a sequencing pass without committing it.
    pub fn sequence(
        &self,
        worker_id: WorkerId,
        items: Vec<WorkItem>,
        forced: &[ForcedMove],
    ) -> Result<Vec<WorkItem>, SequenceError> {
        sequence(worker_id, items, &self.context(), forced)
    }

    pub fn x_position(&self, date: NaiveDate, chart_start: NaiveDate) -> f64 {
        x_position(date, chart_start, self.config.day_width_px)
    }

    pub fn width(&self, item: &WorkItem) -> f64 {
        width(
            &self.oracle,
            item,
            self.config.workday_hours,
            self.config.day_width_px,
        )
    }

    // ---- queries ----

    pub fn worker(&self, worker_id: WorkerId) -> Option<&Worker> {
        self.roster.get(&worker_id)
    }

    pub fn workers(&self) -> impl Iterator<Item = &Worker> {
        self.roster.values()
    }

    pub fn active_workers(&self) -> impl Iterator<Item = &Worker> {
        self.roster.values().filter(|worker| worker.active)
    }

    pub fn queue(&self, worker_id: WorkerId) -> &[WorkItem] {
        self.queues
            .get(&worker_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn queue_ids(&self, worker_id: WorkerId) -> Vec<WorkItemId> {
        self.queue(worker_id).iter().map(|item| item.id).collect()
    }

    pub fn item(&self, item_id: WorkItemId) -> Option<&WorkItem> {
        self.items().find(|item| item.id == item_id)
    }

    pub fn active_item_count(&self, worker_id: WorkerId) -> usize {
        self.queue(worker_id).len()
    }

    pub fn retired_items(&self) -> &[WorkItem] {
        &self.retired
    }

    /// Every item, active queues first (by worker) then retired ones.
    pub fn items(&self) -> impl Iterator<Item = &WorkItem> {
        self.queues.values().flatten().chain(self.retired.iter())
    }

    pub fn all_items(&self) -> Vec<WorkItem> {
        self.items().cloned().collect()
    }

    pub fn next_item_id(&self) -> WorkItemId {
        self.items()
            .map(|item| item.id)
            .max()
            .map_or(1, |max| max + 1)
    }

    pub fn timeline_frame(&self, chart_start: NaiveDate) -> PolarsResult<DataFrame> {
        let items: Vec<WorkItem> = self.queues.values().flatten().cloned().collect();
        timeline_frame(
            &items,
            chart_start,
            self.config.day_width_px,
            self.config.workday_hours,
        )
    }

    pub fn verify(&self) -> Result<(), crate::sequencer::QueueViolation> {
        let ctx = self.context();
        for queue in self.queues.values() {
            verify_queue(queue, &ctx)?;
        }
        Ok(())
    }

    // ---- mutations, driven by the change cascade ----

    pub(crate) fn upsert_worker(&mut self, worker: Worker) -> Result<(), CalendarError> {
        self.oracle.set_time_off(&worker)?;
        self.roster.insert(worker.id, worker);
        Ok(())
    }

    pub(crate) fn worker_mut(&mut self, worker_id: WorkerId) -> Option<&mut Worker> {
        self.roster.get_mut(&worker_id)
    }

    /// Splice `item` into its worker's live queue, keeping start-date order.
    pub(crate) fn insert_item(&mut self, item: WorkItem) {
        if !item.active {
            self.retired.push(item);
            return;
        }
        let queue = self.queues.entry(item.worker_id).or_default();
        let index = match item.start_date {
            Some(date) => insertion_index(queue, date, item.is_new),
            None => queue.len(),
        };
        queue.insert(index, item);
    }

    /// Remove an active or retired item, returning it.
    pub(crate) fn take_item(&mut self, item_id: WorkItemId) -> Option<WorkItem> {
        for queue in self.queues.values_mut() {
            if let Some(pos) = queue.iter().position(|item| item.id == item_id) {
                return Some(queue.remove(pos));
            }
        }
        let pos = self.retired.iter().position(|item| item.id == item_id)?;
        Some(self.retired.remove(pos))
    }

    pub(crate) fn item_mut(&mut self, item_id: WorkItemId) -> Option<&mut WorkItem> {
        self.queues
            .values_mut()
            .flatten()
            .find(|item| item.id == item_id)
    }

    /// Soft-delete every active item of a job section. Returns the workers whose
    /// queues lost items.
    pub(crate) fn retire_job(&mut self, job_id: i32) -> Vec<WorkerId> {
        let mut touched = Vec::new();
        for (worker_id, queue) in self.queues.iter_mut() {
            let before = queue.len();
            let (gone, kept): (Vec<WorkItem>, Vec<WorkItem>) = std::mem::take(queue)
                .into_iter()
                .partition(|item| item.belongs_to_job(job_id));
            *queue = kept;
            if queue.len() != before {
                touched.push(*worker_id);
            }
            self.retired.extend(gone.into_iter().map(|mut item| {
                item.active = false;
                item
            }));
        }
        touched
    }

    /// Move every active item of `from` into `to`'s queue.
    pub(crate) fn reassign_items(&mut self, from: WorkerId, to: WorkerId) -> usize {
        let moved = self.queues.remove(&from).unwrap_or_default();
        let count = moved.len();
        for mut item in moved {
            item.worker_id = to;
            self.insert_item(item);
        }
        count
    }

    pub(crate) fn set_holiday_config(&mut self, holiday_config: HolidayConfig) {
        self.holiday_config = holiday_config;
        self.refresh_holidays();
    }

    /// Rebuild the holiday table for the years around today.
    fn refresh_holidays(&mut self) {
        let today = self.today().year();
        let (start, end) = (today - 1, today + self.config.holiday_years_ahead);
        let map = HolidayMap::resolve(&self.holiday_config, self.provider.clone(), start, end);
        debug!(start, end, holidays = map.len(), "resolved holiday map");
        self.oracle.set_holidays(map);
    }

    /// Re-run the sequencer over `worker_id`'s whole queue.
    pub fn resequence(
        &mut self,
        worker_id: WorkerId,
        forced: &[ForcedMove],
    ) -> Result<(), SchedulerError> {
        let current = self.queues.get(&worker_id).cloned().unwrap_or_default();
        let sequenced = self.sequence(worker_id, current, forced)?;
        if sequenced.is_empty() {
            self.queues.remove(&worker_id);
        } else {
            self.queues.insert(worker_id, sequenced);
        }
        Ok(())
    }

    /// Recompute every queue, e.g. after the holiday configuration changed.
    pub fn resequence_all(&mut self) -> Result<Vec<WorkerId>, SchedulerError> {
        let ctx = self.context();
        let results: Vec<(WorkerId, Result<Vec<WorkItem>, SequenceError>)> = self
            .queues
            .par_iter()
            .map(|(worker_id, queue)| (*worker_id, sequence(*worker_id, queue.clone(), &ctx, &[])))
            .collect();

        let mut updated = Vec::with_capacity(results.len());
        let mut sequenced = BTreeMap::new();
        for (worker_id, result) in results {
            sequenced.insert(worker_id, result?);
            updated.push(worker_id);
        }
        self.queues = sequenced;
        info!(workers = updated.len(), "resequenced all queues");
        Ok(updated)
    }
}
