pub mod calendar;
pub mod cascade;
pub mod config;
pub mod drag;
pub mod duration;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod logging;
pub mod persistence;
pub mod position;
pub mod scheduler;
pub mod sequencer;
pub mod validation;
pub mod work_item;
pub mod worker;

pub use calendar::{
    CalendarError, CalendarOracle, CustomHoliday, Holiday, HolidayConfig, HolidayMap,
    HolidayProvider, NonWorkday, UsFederalHolidays, WorkWeek, provider_for_region,
};
pub use cascade::{
    CascadeError, CascadePhase, Change, ChangeCascade, CommitReport, Conflict, ConflictKind,
    ItemEdit, SaveOutcome,
};
pub use config::{ConfigError, SchedulerConfig};
pub use drag::{CommitIntent, DragPreview};
pub use duration::{DurationError, expand};
pub use persistence::{
    JsonQueueStore, LoadError, MemoryQueueStore, PersistenceError, PersistenceResult, QueueStore,
    load_items_from_csv, load_scheduler, save_items_to_csv, save_scheduler,
};
#[cfg(feature = "sqlite")]
pub use persistence::SqliteQueueStore;
pub use position::{insertion_index, timeline_frame, width, x_position};
pub use scheduler::{Scheduler, SchedulerError};
pub use sequencer::{
    ForcedMove, Placement, QueueViolation, SequenceContext, SequenceError, sequence, verify_queue,
};
pub use validation::{FieldError, ValidationErrors};
pub use work_item::{JobRef, NewWorkItem, WorkItem, WorkItemId};
pub use worker::{TimeOff, Worker, WorkerId};
