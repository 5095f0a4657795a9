use crate::worker::WorkerId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type WorkItemId = i32;

/// Membership of a work item in a job: the parent job and its position within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRef {
    pub job_id: i32,
    pub position: u32,
}

impl JobRef {
    pub fn new(job_id: i32, position: u32) -> Self {
        Self { job_id, position }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub worker_id: WorkerId,
    pub name: String,
    /// `None` until the item has been placed; unplaced items anchor to "today".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Size in pure working hours.
    pub nominal_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobRef>,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Set only for the recomputation pass that follows a user insert.
    #[serde(skip)]
    pub is_new: bool,

    // Derived by the sequencer; never edited directly.
    #[serde(default)]
    pub inflated_hours: f64,
    #[serde(default)]
    pub calendar_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

fn default_active() -> bool {
    true
}

impl WorkItem {
    pub fn new(
        id: WorkItemId,
        worker_id: WorkerId,
        name: impl Into<String>,
        nominal_hours: f64,
    ) -> Self {
        Self {
            id,
            worker_id,
            name: name.into(),
            start_date: None,
            nominal_hours,
            job: None,
            active: true,
            is_new: false,
            inflated_hours: 0.0,
            calendar_days: 0,
            end_date: None,
        }
    }

    pub fn starting(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn in_job(mut self, job_id: i32, position: u32) -> Self {
        self.job = Some(JobRef::new(job_id, position));
        self
    }

    pub fn job_id(&self) -> Option<i32> {
        self.job.as_ref().map(|job| job.job_id)
    }

    pub fn belongs_to_job(&self, job_id: i32) -> bool {
        self.job_id() == Some(job_id)
    }
}

/// A user-submitted work item before it has an engine identity in a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkItem {
    pub id: WorkItemId,
    pub worker_id: WorkerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    pub nominal_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<JobRef>,
}

impl NewWorkItem {
    pub fn into_item(self) -> WorkItem {
        WorkItem {
            start_date: self.start_date,
            job: self.job,
            is_new: true,
            ..WorkItem::new(self.id, self.worker_id, self.name, self.nominal_hours)
        }
    }
}

impl From<&WorkItem> for NewWorkItem {
    fn from(item: &WorkItem) -> Self {
        Self {
            id: item.id,
            worker_id: item.worker_id,
            name: item.name.clone(),
            start_date: item.start_date,
            nominal_hours: item.nominal_hours,
            job: item.job.clone(),
        }
    }
}
