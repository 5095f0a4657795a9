use crate::calendar::HolidayConfig;
use crate::config::SchedulerConfig;
use crate::scheduler::{Scheduler, SchedulerError};
use crate::validation::{self, ValidationErrors};
use crate::work_item::WorkItem;
use crate::worker::{Worker, WorkerId};
use chrono::NaiveDate;
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<ValidationErrors> for PersistenceError {
    fn from(value: ValidationErrors) -> Self {
        Self::InvalidData(value.to_string())
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Persistence collaborator. Each call is atomic for one worker's queue; no
/// atomicity is promised across calls.
pub trait QueueStore: Send + Sync {
    fn load_roster(&self) -> PersistenceResult<Vec<Worker>>;
    fn load_items(&self) -> PersistenceResult<Vec<WorkItem>>;
    fn load_holidays(&self) -> PersistenceResult<HolidayConfig>;

    fn save_workers(&self, workers: &[Worker]) -> PersistenceResult<()>;
    /// Replace everything stored for `worker_id` with `items`.
    fn save_queue(&self, worker_id: WorkerId, items: &[WorkItem]) -> PersistenceResult<()>;
    fn save_holidays(&self, holidays: &HolidayConfig) -> PersistenceResult<()>;
}

/// Queue contents as persisted: the worker's active queue followed by its
/// retired items.
pub fn stored_queue(scheduler: &Scheduler, worker_id: WorkerId) -> Vec<WorkItem> {
    scheduler
        .queue(worker_id)
        .iter()
        .chain(
            scheduler
                .retired_items()
                .iter()
                .filter(|item| item.worker_id == worker_id),
        )
        .cloned()
        .collect()
}

/// Write the roster, holidays and every queue.
pub fn save_scheduler(scheduler: &Scheduler, store: &dyn QueueStore) -> PersistenceResult<()> {
    let workers: Vec<Worker> = scheduler.workers().cloned().collect();
    store.save_workers(&workers)?;
    store.save_holidays(scheduler.holiday_config())?;
    let mut owners: Vec<WorkerId> = scheduler
        .all_items()
        .iter()
        .map(|item| item.worker_id)
        .collect();
    owners.sort_unstable();
    owners.dedup();
    for worker_id in owners {
        store.save_queue(worker_id, &stored_queue(scheduler, worker_id))?;
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Rebuild a scheduler from whatever `store` holds, re-sequencing every queue.
pub fn load_scheduler(
    config: SchedulerConfig,
    store: &dyn QueueStore,
    today: Option<NaiveDate>,
) -> Result<Scheduler, LoadError> {
    let workers = store.load_roster()?;
    let items = store.load_items()?;
    validation::validate_worker_collection(&workers).map_err(PersistenceError::from)?;
    validation::validate_item_collection(&items).map_err(PersistenceError::from)?;
    let holidays = store.load_holidays()?;
    let mut scheduler = Scheduler::from_parts(config, workers, items, holidays, today)?;
    scheduler.resequence_all()?;
    Ok(scheduler)
}

pub mod file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{JsonQueueStore, load_items_from_csv, save_items_to_csv};
pub use memory::MemoryQueueStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteQueueStore;
