use crate::calendar::MAX_WORKDAY_PROBE_DAYS;
use crate::work_item::{NewWorkItem, WorkItem};
use crate::worker::Worker;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// What the field belongs to, e.g. `item 12` or `worker 3`.
    pub subject: String,
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.subject, self.field, self.message)
    }
}

/// Every field problem found in one save. Any entry blocks the whole save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        subject: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.errors.push(FieldError {
            subject: subject.into(),
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|error| error.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

pub fn check_name(errors: &mut ValidationErrors, subject: &str, name: &str) {
    if name.trim().is_empty() {
        errors.push(subject, "name", "is required");
    }
}

/// Largest duration a single item may carry: as many workdays as the
/// calendar will probe ahead.
pub fn max_item_hours(workday_hours: f64) -> f64 {
    MAX_WORKDAY_PROBE_DAYS as f64 * workday_hours
}

pub fn check_hours(errors: &mut ValidationErrors, subject: &str, hours: f64, max_hours: f64) {
    if !hours.is_finite() || hours <= 0.0 {
        errors.push(subject, "nominal_hours", format!("must be positive (got {hours})"));
    } else if hours > max_hours {
        errors.push(
            subject,
            "nominal_hours",
            format!("must be at most {max_hours} (got {hours})"),
        );
    }
}

pub fn validate_new_item(errors: &mut ValidationErrors, item: &NewWorkItem, max_hours: f64) {
    let subject = format!("item {}", item.id);
    check_name(errors, &subject, &item.name);
    check_hours(errors, &subject, item.nominal_hours, max_hours);
}

pub fn validate_worker(errors: &mut ValidationErrors, worker: &Worker) {
    let subject = format!("worker {}", worker.id);
    check_name(errors, &subject, &worker.name);
    for interval in &worker.time_off {
        if !interval.is_well_formed() {
            errors.push(
                &subject,
                "time_off",
                format!("{} is after {}", interval.start, interval.end),
            );
        }
    }
}

/// Rejects duplicate ids; used when loading snapshots.
pub fn validate_item_collection(items: &[WorkItem]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        let subject = format!("item {}", item.id);
        if !seen.insert(item.id) {
            errors.push(&subject, "id", "is duplicated");
        }
        check_name(&mut errors, &subject, &item.name);
        if !item.nominal_hours.is_finite() || item.nominal_hours < 0.0 {
            errors.push(&subject, "nominal_hours", "must not be negative");
        }
    }
    errors.into_result()
}

pub fn validate_worker_collection(workers: &[Worker]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut seen = HashSet::with_capacity(workers.len());
    for worker in workers {
        if !seen.insert(worker.id) {
            errors.push(format!("worker {}", worker.id), "id", "is duplicated");
        }
        validate_worker(&mut errors, worker);
    }
    errors.into_result()
}
