use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::{
    CascadeError, Change, ChangeCascade, CommitReport, Conflict, FieldError, NonWorkday,
    QueueStore, SaveOutcome, Scheduler, WorkItem, WorkItemId, Worker, WorkerId,
};

/// Scheduler plus the cascade that is allowed to mutate it.
pub struct ShopService {
    pub scheduler: Scheduler,
    pub cascade: ChangeCascade,
}

impl ShopService {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            cascade: ChangeCascade::new(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    service: Arc<RwLock<ShopService>>,
    store: Arc<dyn QueueStore>,
}

impl AppState {
    pub fn new(scheduler: Scheduler, store: Arc<dyn QueueStore>) -> Self {
        Self {
            service: Arc::new(RwLock::new(ShopService::new(scheduler))),
            store,
        }
    }

    fn service(&self) -> Arc<RwLock<ShopService>> {
        self.service.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid(String),
    Busy(String),
    Conflicts(Vec<Conflict>),
    Fields(Vec<FieldError>),
    Persistence {
        message: String,
        persisted: Vec<WorkerId>,
    },
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }
}

impl From<CascadeError> for ApiError {
    fn from(value: CascadeError) -> Self {
        match value {
            CascadeError::Validation(errors) => ApiError::Fields(errors.errors().to_vec()),
            CascadeError::AwaitingAcknowledgment | CascadeError::NothingPending => {
                ApiError::Busy(value.to_string())
            }
            CascadeError::Scheduler(err) => ApiError::Invalid(err.to_string()),
            CascadeError::Persistence { source, persisted } => ApiError::Persistence {
                message: source.to_string(),
                persisted,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                let body = Json(ErrorBody {
                    error: "not_found",
                    message,
                });
                (StatusCode::NOT_FOUND, body).into_response()
            }
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: "invalid_request",
                    message,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Busy(message) => {
                let body = Json(ErrorBody {
                    error: "busy",
                    message,
                });
                (StatusCode::CONFLICT, body).into_response()
            }
            ApiError::Conflicts(conflicts) => {
                let body = Json(json!({
                    "error": "acknowledgement_required",
                    "conflicts": conflicts,
                }));
                (StatusCode::CONFLICT, body).into_response()
            }
            ApiError::Fields(fields) => {
                let body = Json(json!({
                    "error": "validation_failed",
                    "fields": fields,
                }));
                (StatusCode::UNPROCESSABLE_ENTITY, body).into_response()
            }
            ApiError::Persistence { message, persisted } => {
                let body = Json(json!({
                    "error": "persistence_failed",
                    "message": message,
                    "persisted": persisted,
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/workers", get(list_workers))
        .route("/workers/:id/queue", get(worker_queue))
        .route("/items/:id", get(get_item))
        .route("/timeline", get(timeline))
        .route("/calendar/:worker_id/:date", get(calendar_probe))
        .route("/changes", post(submit_changes))
        .with_state(state)
}

pub async fn serve(
    addr: SocketAddr,
    scheduler: Scheduler,
    store: Arc<dyn QueueStore>,
) -> std::io::Result<()> {
    let app = router(AppState::new(scheduler, store));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_workers(State(state): State<AppState>) -> Json<Vec<Worker>> {
    let service = state.service();
    let workers = {
        let guard = service.read();
        guard.scheduler.workers().cloned().collect()
    };
    Json(workers)
}

async fn worker_queue(
    State(state): State<AppState>,
    Path(worker_id): Path<WorkerId>,
) -> Result<Json<Vec<WorkItem>>, ApiError> {
    let service = state.service();
    let guard = service.read();
    if guard.scheduler.worker(worker_id).is_none() {
        return Err(ApiError::not_found(format!("worker {worker_id} not found")));
    }
    Ok(Json(guard.scheduler.queue(worker_id).to_vec()))
}

async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<WorkItemId>,
) -> Result<Json<WorkItem>, ApiError> {
    let service = state.service();
    let item = {
        let guard = service.read();
        guard.scheduler.item(item_id).cloned()
    };
    item.map(Json)
        .ok_or_else(|| ApiError::not_found(format!("work item {item_id} not found")))
}

#[derive(Debug, Deserialize)]
struct TimelineQuery {
    chart_start: NaiveDate,
}

#[derive(Debug, Serialize)]
struct TimelineBar {
    id: WorkItemId,
    worker_id: WorkerId,
    name: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    x_px: f64,
    width_px: f64,
}

async fn timeline(
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
) -> Json<Vec<TimelineBar>> {
    let service = state.service();
    let guard = service.read();
    let scheduler = &guard.scheduler;
    let bars = scheduler
        .active_workers()
        .flat_map(|worker| scheduler.queue(worker.id))
        .map(|item| TimelineBar {
            id: item.id,
            worker_id: item.worker_id,
            name: item.name.clone(),
            start_date: item.start_date,
            end_date: item.end_date,
            x_px: item
                .start_date
                .map_or(0.0, |date| scheduler.x_position(date, query.chart_start)),
            width_px: scheduler.width(item),
        })
        .collect();
    Json(bars)
}

#[derive(Debug, Serialize)]
struct CalendarProbe {
    worker_id: WorkerId,
    date: NaiveDate,
    workday: bool,
    reason: Option<NonWorkday>,
    next_workday: Option<NaiveDate>,
}

async fn calendar_probe(
    State(state): State<AppState>,
    Path((worker_id, date)): Path<(WorkerId, NaiveDate)>,
) -> Result<Json<CalendarProbe>, ApiError> {
    let service = state.service();
    let guard = service.read();
    let scheduler = &guard.scheduler;
    if scheduler.worker(worker_id).is_none() {
        return Err(ApiError::not_found(format!("worker {worker_id} not found")));
    }
    let reason = scheduler.classify(date, worker_id);
    Ok(Json(CalendarProbe {
        worker_id,
        date,
        workday: reason.is_none(),
        reason,
        next_workday: scheduler.next_workday(date, worker_id),
    }))
}

#[derive(Debug, Deserialize)]
struct ChangesPayload {
    changes: Vec<Change>,
    #[serde(default)]
    acknowledge: bool,
}

async fn submit_changes(
    State(state): State<AppState>,
    Json(payload): Json<ChangesPayload>,
) -> Result<Json<CommitReport>, ApiError> {
    let service = state.service();
    let mut guard = service.write();
    let ShopService { scheduler, cascade } = &mut *guard;
    let outcome = cascade.commit(
        scheduler,
        payload.changes,
        payload.acknowledge,
        state.store.as_ref(),
    )?;
    match outcome {
        SaveOutcome::Committed(report) => Ok(Json(report)),
        SaveOutcome::ConflictFound { conflicts } => {
            // Requests are stateless: the client resubmits with `acknowledge`.
            cascade.cancel();
            warn!(conflicts = conflicts.len(), "changes need acknowledgement");
            Err(ApiError::Conflicts(conflicts))
        }
    }
}
