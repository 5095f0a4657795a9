use super::{PersistenceError, PersistenceResult, QueueStore};
use crate::calendar::HolidayConfig;
use crate::work_item::WorkItem;
use crate::worker::{Worker, WorkerId};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    workers: Vec<Worker>,
    queues: BTreeMap<WorkerId, Vec<WorkItem>>,
    holidays: HolidayConfig,
    failing: HashSet<WorkerId>,
    queue_writes: Vec<WorkerId>,
}

/// Store kept in process memory. Writes for selected workers can be made to
/// fail, which is how partial-persist behaviour is exercised.
#[derive(Default)]
pub struct MemoryQueueStore {
    state: Mutex<MemoryState>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory store lock poisoned".into()))
    }

    pub fn fail_queue_writes_for(&self, worker_id: WorkerId) -> PersistenceResult<()> {
        self.lock()?.failing.insert(worker_id);
        Ok(())
    }

    pub fn clear_failures(&self) -> PersistenceResult<()> {
        self.lock()?.failing.clear();
        Ok(())
    }

    /// Workers whose queues were written, in write order.
    pub fn queue_writes(&self) -> PersistenceResult<Vec<WorkerId>> {
        Ok(self.lock()?.queue_writes.clone())
    }

    pub fn stored_queue(&self, worker_id: WorkerId) -> PersistenceResult<Vec<WorkItem>> {
        Ok(self
            .lock()?
            .queues
            .get(&worker_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl QueueStore for MemoryQueueStore {
    fn load_roster(&self) -> PersistenceResult<Vec<Worker>> {
        Ok(self.lock()?.workers.clone())
    }

    fn load_items(&self) -> PersistenceResult<Vec<WorkItem>> {
        Ok(self.lock()?.queues.values().flatten().cloned().collect())
    }

    fn load_holidays(&self) -> PersistenceResult<HolidayConfig> {
        Ok(self.lock()?.holidays.clone())
    }

    fn save_workers(&self, workers: &[Worker]) -> PersistenceResult<()> {
        self.lock()?.workers = workers.to_vec();
        Ok(())
    }

    fn save_queue(&self, worker_id: WorkerId, items: &[WorkItem]) -> PersistenceResult<()> {
        let mut state = self.lock()?;
        if state.failing.contains(&worker_id) {
            return Err(PersistenceError::Unavailable(format!(
                "write rejected for worker {worker_id}"
            )));
        }
        state.queues.insert(worker_id, items.to_vec());
        state.queue_writes.push(worker_id);
        Ok(())
    }

    fn save_holidays(&self, holidays: &HolidayConfig) -> PersistenceResult<()> {
        self.lock()?.holidays = holidays.clone();
        Ok(())
    }
}
