use super::{PersistenceError, PersistenceResult, QueueStore};
use crate::calendar::HolidayConfig;
use crate::validation;
use crate::work_item::{JobRef, WorkItem};
use crate::worker::{Worker, WorkerId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default, Serialize, Deserialize)]
struct StoreSnapshot {
    #[serde(default)]
    workers: Vec<Worker>,
    #[serde(default)]
    holidays: HolidayConfig,
    #[serde(default)]
    items: Vec<WorkItem>,
}

/// Whole-state JSON snapshot on disk. Every save rewrites the file.
pub struct JsonQueueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonQueueStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> PersistenceResult<StoreSnapshot> {
        if !self.path.exists() {
            return Ok(StoreSnapshot::default());
        }
        let file = File::open(&self.path)?;
        let snapshot: StoreSnapshot = serde_json::from_reader(file)?;
        validation::validate_item_collection(&snapshot.items)?;
        Ok(snapshot)
    }

    fn write(&self, snapshot: &StoreSnapshot) -> PersistenceResult<()> {
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, snapshot)?;
        Ok(())
    }

    fn update<F>(&self, mutator: F) -> PersistenceResult<()>
    where
        F: FnOnce(&mut StoreSnapshot),
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PersistenceError::Unavailable("json store lock poisoned".into()))?;
        let mut snapshot = self.read()?;
        mutator(&mut snapshot);
        self.write(&snapshot)
    }
}

impl QueueStore for JsonQueueStore {
    fn load_roster(&self) -> PersistenceResult<Vec<Worker>> {
        Ok(self.read()?.workers)
    }

    fn load_items(&self) -> PersistenceResult<Vec<WorkItem>> {
        Ok(self.read()?.items)
    }

    fn load_holidays(&self) -> PersistenceResult<HolidayConfig> {
        Ok(self.read()?.holidays)
    }

    fn save_workers(&self, workers: &[Worker]) -> PersistenceResult<()> {
        self.update(|snapshot| snapshot.workers = workers.to_vec())
    }

    fn save_queue(&self, worker_id: WorkerId, items: &[WorkItem]) -> PersistenceResult<()> {
        validation::validate_item_collection(items)?;
        self.update(|snapshot| {
            let replaced: Vec<_> = items.iter().map(|item| item.id).collect();
            snapshot
                .items
                .retain(|item| item.worker_id != worker_id && !replaced.contains(&item.id));
            snapshot.items.extend_from_slice(items);
        })
    }

    fn save_holidays(&self, holidays: &HolidayConfig) -> PersistenceResult<()> {
        self.update(|snapshot| snapshot.holidays = holidays.clone())
    }
}

/// Flat row written per work item: identity, owner, dates and spans.
#[derive(Default, Serialize, Deserialize)]
struct WorkItemCsvRecord {
    id: i32,
    worker_id: i32,
    name: String,
    start_date: String,
    end_date: String,
    nominal_hours: f64,
    inflated_hours: f64,
    calendar_days: i64,
    job_id: String,
    job_position: String,
    active: String,
}

impl From<&WorkItem> for WorkItemCsvRecord {
    fn from(item: &WorkItem) -> Self {
        Self {
            id: item.id,
            worker_id: item.worker_id,
            name: item.name.clone(),
            start_date: format_date(item.start_date),
            end_date: format_date(item.end_date),
            nominal_hours: item.nominal_hours,
            inflated_hours: item.inflated_hours,
            calendar_days: item.calendar_days,
            job_id: item
                .job
                .as_ref()
                .map(|job| job.job_id.to_string())
                .unwrap_or_default(),
            job_position: item
                .job
                .as_ref()
                .map(|job| job.position.to_string())
                .unwrap_or_default(),
            active: item.active.to_string(),
        }
    }
}

impl WorkItemCsvRecord {
    fn into_item(self) -> PersistenceResult<WorkItem> {
        let mut item = WorkItem::new(self.id, self.worker_id, self.name, self.nominal_hours);
        item.start_date = parse_date(&self.start_date)?;
        item.end_date = parse_date(&self.end_date)?;
        item.inflated_hours = self.inflated_hours;
        item.calendar_days = self.calendar_days;
        item.active = parse_bool(&self.active)?.unwrap_or(true);
        item.job = match (parse_i32(&self.job_id)?, parse_i32(&self.job_position)?) {
            (Some(job_id), position) => Some(JobRef::new(job_id, position.unwrap_or(0).max(0) as u32)),
            (None, _) => None,
        };
        Ok(item)
    }
}

pub fn save_items_to_csv<P: AsRef<Path>>(items: &[WorkItem], path: P) -> PersistenceResult<()> {
    validation::validate_item_collection(items)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for item in items {
        writer.serialize(WorkItemCsvRecord::from(item))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_items_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<WorkItem>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut items = Vec::new();
    for record in reader.deserialize::<WorkItemCsvRecord>() {
        items.push(record?.into_item()?);
    }
    validation::validate_item_collection(&items)?;
    Ok(items)
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn parse_date(input: &str) -> PersistenceResult<Option<NaiveDate>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid date '{input}': {e}")))
}

fn parse_i32(input: &str) -> PersistenceResult<Option<i32>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    input
        .trim()
        .parse::<i32>()
        .map(Some)
        .map_err(|e| PersistenceError::InvalidData(format!("invalid integer '{input}': {e}")))
}

fn parse_bool(input: &str) -> PersistenceResult<Option<bool>> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    match input.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(Some(true)),
        "false" => Ok(Some(false)),
        other => Err(PersistenceError::InvalidData(format!(
            "invalid boolean '{other}'"
        ))),
    }
}
