//! The single effectful entry point: apply a batch of user changes, re-sequence
//! every affected queue in full, and hand the results to the store.
//!
//! One save moves through
//! `Idle -> Validating -> (AwaitingAcknowledgment -> Validating) | (Sequencing -> Persisting) -> Idle`.
//! A failed persist returns to `Idle` without rolling back in-memory state.

use crate::calendar::HolidayConfig;
use crate::drag::CommitIntent;
use crate::persistence::{PersistenceError, QueueStore, stored_queue};
use crate::scheduler::{Scheduler, SchedulerError};
use crate::sequencer::ForcedMove;
use crate::validation::{self, ValidationErrors};
use crate::work_item::{JobRef, NewWorkItem, WorkItem, WorkItemId};
use crate::worker::{Worker, WorkerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEdit {
    pub item_id: WorkItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobRef>,
}

impl ItemEdit {
    pub fn hours(item_id: WorkItemId, nominal_hours: f64) -> Self {
        Self {
            item_id,
            name: None,
            nominal_hours: Some(nominal_hours),
            job: None,
        }
    }

    pub fn rename(item_id: WorkItemId, name: impl Into<String>) -> Self {
        Self {
            item_id,
            name: Some(name.into()),
            nominal_hours: None,
            job: None,
        }
    }
}

/// One user edit inside a save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    AddItem(NewWorkItem),
    EditItem(ItemEdit),
    Drag(CommitIntent),
    /// Soft-delete every item of a job section.
    RemoveJob { job_id: i32 },
    /// Hard-delete a superseded item.
    DeleteItem { item_id: WorkItemId },
    AddWorker(Worker),
    UpdateWorker(Worker),
    DeactivateWorker { worker_id: WorkerId },
    SetHolidays(HolidayConfig),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Turning off `can_schedule` while the worker still owns active items.
    /// The flag is reverted; the rest of the save goes ahead once acknowledged.
    ScheduleDisabledWithItems,
    /// Removing a worker from the roster while it owns active items. Once
    /// acknowledged the items move to the default worker.
    DeactivatedWithItems,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub worker_id: WorkerId,
    pub worker_name: String,
    pub kind: ConflictKind,
    pub active_items: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadePhase {
    Idle,
    Validating,
    AwaitingAcknowledgment,
    Sequencing,
    Persisting,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommitReport {
    /// Workers whose whole queue was re-sequenced, ascending.
    pub resequenced: Vec<WorkerId>,
    /// Workers whose queue reached the store, in write order.
    pub persisted: Vec<WorkerId>,
    /// Names of workers whose `can_schedule` change was reverted.
    pub reverted: Vec<String>,
    /// `(from, to, count)` for every reassignment done by a deactivation.
    pub reassigned: Vec<(WorkerId, WorkerId, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SaveOutcome {
    Committed(CommitReport),
    ConflictFound { conflicts: Vec<Conflict> },
}

impl SaveOutcome {
    pub fn conflict_names(&self) -> Vec<&str> {
        match self {
            SaveOutcome::ConflictFound { conflicts } => conflicts
                .iter()
                .map(|conflict| conflict.worker_name.as_str())
                .collect(),
            SaveOutcome::Committed(_) => Vec::new(),
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, SaveOutcome::Committed(_))
    }
}

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("save blocked by field errors: {0}")]
    Validation(ValidationErrors),
    #[error("a save is waiting for conflict acknowledgement")]
    AwaitingAcknowledgment,
    #[error("no save is waiting for acknowledgement")]
    NothingPending,
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("persisting failed after {} queue write(s): {source}", .persisted.len())]
    Persistence {
        source: PersistenceError,
        persisted: Vec<WorkerId>,
    },
}

struct PendingSave {
    batch: Vec<Change>,
}

/// Drives one save at a time through validation, sequencing and persistence.
pub struct ChangeCascade {
    phase: CascadePhase,
    pending: Option<PendingSave>,
}

impl Default for ChangeCascade {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeCascade {
    pub fn new() -> Self {
        Self {
            phase: CascadePhase::Idle,
            pending: None,
        }
    }

    pub fn phase(&self) -> CascadePhase {
        self.phase
    }

    pub fn pending_changes(&self) -> Option<&[Change]> {
        self.pending.as_ref().map(|pending| pending.batch.as_slice())
    }

    /// Apply `batch`. Without `acknowledged`, any conflict parks the batch and
    /// nothing is applied; with it, conflicts are resolved and the batch commits.
    pub fn commit(
        &mut self,
        scheduler: &mut Scheduler,
        batch: Vec<Change>,
        acknowledged: bool,
        store: &dyn QueueStore,
    ) -> Result<SaveOutcome, CascadeError> {
        if self.phase == CascadePhase::AwaitingAcknowledgment {
            return Err(CascadeError::AwaitingAcknowledgment);
        }
        self.run(scheduler, batch, acknowledged, store)
    }

    /// Accept the conflicts reported for the parked batch and commit it.
    pub fn acknowledge(
        &mut self,
        scheduler: &mut Scheduler,
        store: &dyn QueueStore,
    ) -> Result<SaveOutcome, CascadeError> {
        let pending = self.pending.take().ok_or(CascadeError::NothingPending)?;
        self.run(scheduler, pending.batch, true, store)
    }

    /// Drop the parked batch, if any.
    pub fn cancel(&mut self) -> Option<Vec<Change>> {
        self.phase = CascadePhase::Idle;
        self.pending.take().map(|pending| pending.batch)
    }

    fn run(
        &mut self,
        scheduler: &mut Scheduler,
        mut batch: Vec<Change>,
        acknowledged: bool,
        store: &dyn QueueStore,
    ) -> Result<SaveOutcome, CascadeError> {
        self.phase = CascadePhase::Validating;
        let review = match review_batch(scheduler, &batch) {
            Ok(review) => review,
            Err(errors) => {
                self.phase = CascadePhase::Idle;
                debug!(errors = errors.len(), "save rejected by validation");
                return Err(CascadeError::Validation(errors));
            }
        };

        if !review.conflicts.is_empty() && !acknowledged {
            warn!(
                workers = ?review.conflicts.iter().map(|c| c.worker_id).collect::<Vec<_>>(),
                "save needs acknowledgement"
            );
            self.phase = CascadePhase::AwaitingAcknowledgment;
            self.pending = Some(PendingSave { batch });
            return Ok(SaveOutcome::ConflictFound {
                conflicts: review.conflicts,
            });
        }
        let reverted = revert_schedule_flags(scheduler, &mut batch, &review.reverts);

        // Work on a copy so a failing change leaves the live state untouched.
        self.phase = CascadePhase::Sequencing;
        let mut draft = scheduler.clone();
        let applied = match apply_batch(&mut draft, batch) {
            Ok(applied) => applied,
            Err(err) => {
                self.phase = CascadePhase::Idle;
                return Err(err);
            }
        };
        *scheduler = draft;

        self.phase = CascadePhase::Persisting;
        let persisted = match persist(scheduler, &applied, store) {
            Ok(persisted) => persisted,
            Err(err) => {
                self.phase = CascadePhase::Idle;
                if let CascadeError::Persistence { source, persisted } = &err {
                    warn!(error = %source, persisted = ?persisted, "persisting save failed");
                }
                return Err(err);
            }
        };

        self.phase = CascadePhase::Idle;
        let report = CommitReport {
            resequenced: applied.dirty.into_iter().collect(),
            persisted,
            reverted,
            reassigned: applied.reassigned,
        };
        info!(
            resequenced = report.resequenced.len(),
            persisted = report.persisted.len(),
            reverted = report.reverted.len(),
            "save committed"
        );
        Ok(SaveOutcome::Committed(report))
    }
}

#[derive(Debug, Clone, Copy)]
struct ItemState {
    worker_id: WorkerId,
    active: bool,
    job_id: Option<i32>,
}

impl From<&WorkItem> for ItemState {
    fn from(item: &WorkItem) -> Self {
        Self {
            worker_id: item.worker_id,
            active: item.active,
            job_id: item.job_id(),
        }
    }
}

/// The roster and item ownership partway through a batch, as if every change
/// read so far had been applied with its conflicts resolved.
struct BatchView<'a> {
    scheduler: &'a Scheduler,
    workers: BTreeMap<WorkerId, Worker>,
    /// `None` marks an item deleted earlier in the batch.
    items: HashMap<WorkItemId, Option<ItemState>>,
}

impl<'a> BatchView<'a> {
    fn new(scheduler: &'a Scheduler) -> Self {
        Self {
            scheduler,
            workers: BTreeMap::new(),
            items: HashMap::new(),
        }
    }

    fn worker(&self, worker_id: WorkerId) -> Option<&Worker> {
        self.workers
            .get(&worker_id)
            .or_else(|| self.scheduler.worker(worker_id))
    }

    fn takes_work(&self, worker_id: WorkerId) -> bool {
        self.worker(worker_id).is_some_and(Worker::accepts_work)
    }

    fn item(&self, item_id: WorkItemId) -> Option<ItemState> {
        match self.items.get(&item_id) {
            Some(state) => *state,
            None => self.scheduler.item(item_id).map(ItemState::from),
        }
    }

    fn active_item(&self, item_id: WorkItemId) -> Option<ItemState> {
        self.item(item_id).filter(|state| state.active)
    }

    fn active_items(&self, worker_id: WorkerId) -> Vec<WorkItemId> {
        let mut ids: Vec<WorkItemId> = self
            .scheduler
            .queue(worker_id)
            .iter()
            .map(|item| item.id)
            .filter(|id| !self.items.contains_key(id))
            .collect();
        ids.extend(self.items.iter().filter_map(|(id, state)| match state {
            Some(state) if state.active && state.worker_id == worker_id => Some(*id),
            _ => None,
        }));
        ids
    }

    fn move_items(&mut self, from: WorkerId, to: WorkerId) {
        for id in self.active_items(from) {
            if let Some(mut state) = self.item(id) {
                state.worker_id = to;
                self.items.insert(id, Some(state));
            }
        }
    }

    fn retire_job(&mut self, job_id: i32) {
        let ids: Vec<WorkItemId> = self
            .scheduler
            .items()
            .map(|item| item.id)
            .chain(self.items.keys().copied())
            .collect();
        for id in ids {
            if let Some(mut state) = self.active_item(id) {
                if state.job_id == Some(job_id) {
                    state.active = false;
                    self.items.insert(id, Some(state));
                }
            }
        }
    }
}

/// What reading a batch in order turned up.
#[derive(Default)]
struct Review {
    conflicts: Vec<Conflict>,
    /// Positions of `UpdateWorker` changes whose `can_schedule` is put back.
    reverts: Vec<usize>,
}

fn conflict(worker: &Worker, kind: ConflictKind, active_items: usize) -> Conflict {
    Conflict {
        worker_id: worker.id,
        worker_name: worker.name.clone(),
        kind,
        active_items,
    }
}

/// Validate every change against the state the changes before it leave behind,
/// and note the conflicts that need acknowledgement.
fn review_batch(scheduler: &Scheduler, batch: &[Change]) -> Result<Review, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut review = Review::default();
    let mut view = BatchView::new(scheduler);
    let known_holidays = scheduler.known_standard_holidays();
    let default_worker = scheduler.default_worker_id();
    let max_hours = validation::max_item_hours(scheduler.workday_hours());

    for (position, change) in batch.iter().enumerate() {
        match change {
            Change::AddItem(item) => {
                let subject = format!("item {}", item.id);
                validation::validate_new_item(&mut errors, item, max_hours);
                if view.item(item.id).is_some() {
                    errors.push(&subject, "id", "is already in use");
                }
                if !view.takes_work(item.worker_id) {
                    errors.push(&subject, "worker_id", "needs a schedulable worker");
                }
                let state = ItemState {
                    worker_id: item.worker_id,
                    active: true,
                    job_id: item.job.as_ref().map(|job| job.job_id),
                };
                view.items.insert(item.id, Some(state));
            }
            Change::EditItem(edit) => {
                let subject = format!("item {}", edit.item_id);
                match view.active_item(edit.item_id) {
                    Some(mut state) => {
                        if let Some(job) = &edit.job {
                            state.job_id = Some(job.job_id);
                            view.items.insert(edit.item_id, Some(state));
                        }
                    }
                    None => errors.push(&subject, "item_id", "is not an active item"),
                }
                if let Some(name) = &edit.name {
                    validation::check_name(&mut errors, &subject, name);
                }
                if let Some(hours) = edit.nominal_hours {
                    validation::check_hours(&mut errors, &subject, hours, max_hours);
                }
            }
            Change::Drag(intent) => {
                let subject = format!("item {}", intent.item_id);
                if !view.takes_work(intent.worker_id) {
                    errors.push(&subject, "worker_id", "needs a schedulable worker");
                }
                match view.active_item(intent.item_id) {
                    Some(mut state) => {
                        state.worker_id = intent.worker_id;
                        view.items.insert(intent.item_id, Some(state));
                    }
                    None => errors.push(&subject, "item_id", "is not an active item"),
                }
            }
            Change::RemoveJob { job_id } => view.retire_job(*job_id),
            Change::DeleteItem { item_id } => {
                if view.item(*item_id).is_none() {
                    errors.push(format!("item {item_id}"), "item_id", "does not exist");
                }
                view.items.insert(*item_id, None);
            }
            Change::AddWorker(worker) => {
                validation::validate_worker(&mut errors, worker);
                if view.worker(worker.id).is_some() {
                    errors.push(format!("worker {}", worker.id), "id", "is already in use");
                }
                view.workers.insert(worker.id, worker.clone());
            }
            Change::UpdateWorker(update) => {
                let subject = format!("worker {}", update.id);
                validation::validate_worker(&mut errors, update);
                let Some(current) = view.worker(update.id).cloned() else {
                    errors.push(&subject, "id", "does not exist");
                    continue;
                };
                if update.id == default_worker && !update.accepts_work() {
                    errors.push(
                        &subject,
                        "id",
                        "the default worker must stay active and schedulable",
                    );
                    continue;
                }
                let mut next = update.clone();
                let active_items = view.active_items(update.id).len();
                if current.active && !update.active {
                    if active_items > 0 {
                        review.conflicts.push(conflict(
                            &current,
                            ConflictKind::DeactivatedWithItems,
                            active_items,
                        ));
                        view.move_items(update.id, default_worker);
                    }
                } else if update.active
                    && current.can_schedule
                    && !update.can_schedule
                    && active_items > 0
                {
                    review.conflicts.push(conflict(
                        &current,
                        ConflictKind::ScheduleDisabledWithItems,
                        active_items,
                    ));
                    review.reverts.push(position);
                    next.can_schedule = true;
                }
                view.workers.insert(update.id, next);
            }
            Change::DeactivateWorker { worker_id } => {
                let subject = format!("worker {worker_id}");
                if *worker_id == default_worker {
                    errors.push(&subject, "id", "the default worker cannot be deactivated");
                    continue;
                }
                let Some(mut next) = view.worker(*worker_id).cloned() else {
                    errors.push(&subject, "id", "does not exist");
                    continue;
                };
                let active_items = view.active_items(*worker_id).len();
                if active_items > 0 {
                    review.conflicts.push(conflict(
                        &next,
                        ConflictKind::DeactivatedWithItems,
                        active_items,
                    ));
                    view.move_items(*worker_id, default_worker);
                }
                next.active = false;
                next.can_schedule = false;
                view.workers.insert(*worker_id, next);
            }
            Change::SetHolidays(config) => {
                for name in &config.standard {
                    if !known_holidays.contains(name) {
                        errors.push("holidays", "standard", format!("unknown holiday '{name}'"));
                    }
                }
            }
        }
    }
    errors.into_result().map(|()| review)
}

/// Put `can_schedule` back on the updates at `positions`.
fn revert_schedule_flags(
    scheduler: &Scheduler,
    batch: &mut [Change],
    positions: &[usize],
) -> Vec<String> {
    let mut reverted = Vec::new();
    for position in positions {
        if let Some(Change::UpdateWorker(update)) = batch.get_mut(*position) {
            update.can_schedule = true;
            let name = scheduler
                .worker(update.id)
                .map(|worker| worker.name.clone())
                .unwrap_or_else(|| update.name.clone());
            if !reverted.contains(&name) {
                reverted.push(name);
            }
        }
    }
    reverted
}

#[derive(Default)]
struct AppliedBatch {
    dirty: BTreeSet<WorkerId>,
    roster_changed: bool,
    holidays_changed: bool,
    reassigned: Vec<(WorkerId, WorkerId, usize)>,
}

impl AppliedBatch {
    /// Hand an inactive worker's queue to the default worker.
    fn reassign_to_default(&mut self, scheduler: &mut Scheduler, worker_id: WorkerId) {
        let default_worker = scheduler.default_worker_id();
        let moved = scheduler.reassign_items(worker_id, default_worker);
        if moved > 0 {
            self.reassigned.push((worker_id, default_worker, moved));
            self.dirty.insert(default_worker);
        }
    }
}

fn apply_batch(scheduler: &mut Scheduler, batch: Vec<Change>) -> Result<AppliedBatch, CascadeError> {
    let mut applied = AppliedBatch::default();
    let mut forced: BTreeMap<WorkerId, Vec<ForcedMove>> = BTreeMap::new();
    let mut everything = false;

    for change in batch {
        match change {
            Change::AddItem(new_item) => {
                applied.dirty.insert(new_item.worker_id);
                scheduler.insert_item(new_item.into_item());
            }
            Change::EditItem(edit) => {
                let item = scheduler
                    .item_mut(edit.item_id)
                    .ok_or(SchedulerError::UnknownItem(edit.item_id))?;
                if let Some(name) = edit.name {
                    item.name = name;
                }
                if let Some(hours) = edit.nominal_hours {
                    item.nominal_hours = hours;
                }
                if let Some(job) = edit.job {
                    item.job = Some(job);
                }
                applied.dirty.insert(item.worker_id);
            }
            Change::Drag(intent) => {
                let mut item = scheduler
                    .take_item(intent.item_id)
                    .ok_or(SchedulerError::UnknownItem(intent.item_id))?;
                applied.dirty.insert(item.worker_id);
                applied.dirty.insert(intent.worker_id);
                item.worker_id = intent.worker_id;
                item.start_date = Some(intent.start_date);
                scheduler.insert_item(item);
                // A later drag of the same item replaces its earlier placement.
                for moves in forced.values_mut() {
                    moves.retain(|forced| forced.item_id != intent.item_id);
                }
                forced
                    .entry(intent.worker_id)
                    .or_default()
                    .push(intent.forced_move());
            }
            Change::RemoveJob { job_id } => {
                applied.dirty.extend(scheduler.retire_job(job_id));
            }
            Change::DeleteItem { item_id } => {
                let item = scheduler
                    .take_item(item_id)
                    .ok_or(SchedulerError::UnknownItem(item_id))?;
                applied.dirty.insert(item.worker_id);
            }
            Change::AddWorker(worker) | Change::UpdateWorker(worker) => {
                let worker_id = worker.id;
                let active = worker.active;
                applied.dirty.insert(worker_id);
                scheduler
                    .upsert_worker(worker)
                    .map_err(SchedulerError::from)?;
                applied.roster_changed = true;
                if !active {
                    applied.reassign_to_default(scheduler, worker_id);
                }
            }
            Change::DeactivateWorker { worker_id } => {
                let worker = scheduler
                    .worker_mut(worker_id)
                    .ok_or(SchedulerError::UnknownWorker(worker_id))?;
                worker.active = false;
                worker.can_schedule = false;
                applied.dirty.insert(worker_id);
                applied.roster_changed = true;
                applied.reassign_to_default(scheduler, worker_id);
            }
            Change::SetHolidays(config) => {
                scheduler.set_holiday_config(config);
                applied.holidays_changed = true;
                everything = true;
            }
        }
    }

    // A forced move only applies while its item is still in that queue.
    for (worker_id, moves) in forced.iter_mut() {
        let queue = scheduler.queue(*worker_id);
        moves.retain(|forced| queue.iter().any(|item| item.id == forced.item_id));
    }

    if everything {
        applied.dirty.extend(scheduler.resequence_all()?);
        for (worker_id, moves) in &forced {
            if !moves.is_empty() {
                scheduler.resequence(*worker_id, moves)?;
            }
        }
    } else {
        for worker_id in &applied.dirty {
            let moves = forced.get(worker_id).map(Vec::as_slice).unwrap_or_default();
            scheduler.resequence(*worker_id, moves)?;
        }
    }
    if let Err(violation) = scheduler.verify() {
        warn!(%violation, "queue invariants broken after save");
    }
    Ok(applied)
}

fn persist(
    scheduler: &Scheduler,
    applied: &AppliedBatch,
    store: &dyn QueueStore,
) -> Result<Vec<WorkerId>, CascadeError> {
    let mut persisted = Vec::new();
    let fail = |source: PersistenceError, persisted: &Vec<WorkerId>| CascadeError::Persistence {
        source,
        persisted: persisted.clone(),
    };

    if applied.roster_changed {
        let workers: Vec<Worker> = scheduler.workers().cloned().collect();
        store
            .save_workers(&workers)
            .map_err(|err| fail(err, &persisted))?;
    }
    if applied.holidays_changed {
        store
            .save_holidays(scheduler.holiday_config())
            .map_err(|err| fail(err, &persisted))?;
    }
    for worker_id in &applied.dirty {
        store
            .save_queue(*worker_id, &stored_queue(scheduler, *worker_id))
            .map_err(|err| fail(err, &persisted))?;
        debug!(worker = worker_id, "persisted queue");
        persisted.push(*worker_id);
    }
    Ok(persisted)
}
