//! Drag gestures as commands: a preview that never touches the engine, and the
//! intent it turns into once the user lets go.

use crate::position::date_offset_from_px;
use crate::sequencer::{ForcedMove, Placement};
use crate::work_item::WorkItemId;
use crate::worker::WorkerId;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// In-flight drag state. Purely local; dropping it has no effect anywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPreview {
    item_id: WorkItemId,
    origin: NaiveDate,
    delta_px: f64,
}

impl DragPreview {
    pub fn new(item_id: WorkItemId, origin: NaiveDate) -> Self {
        Self {
            item_id,
            origin,
            delta_px: 0.0,
        }
    }

    pub fn item_id(&self) -> WorkItemId {
        self.item_id
    }

    /// Replace the accumulated pointer travel.
    pub fn moved_by(&mut self, delta_px: f64) {
        self.delta_px = delta_px;
    }

    pub fn day_offset(&self, day_width_px: f64, snap_threshold: f64) -> i64 {
        date_offset_from_px(self.delta_px, day_width_px, snap_threshold)
    }

    /// Day the item would land on, before any workday snapping.
    pub fn preview_date(&self, day_width_px: f64, snap_threshold: f64) -> NaiveDate {
        self.origin + Duration::days(self.day_offset(day_width_px, snap_threshold))
    }

    /// Finish the gesture. Moving earlier lands ahead of same-day neighbors,
    /// moving later (or not at all) lands behind them.
    pub fn commit(
        self,
        target_worker: WorkerId,
        day_width_px: f64,
        snap_threshold: f64,
    ) -> CommitIntent {
        let start_date = self.preview_date(day_width_px, snap_threshold);
        let placement = if self.delta_px < 0.0 {
            Placement::Before
        } else {
            Placement::After
        };
        CommitIntent {
            item_id: self.item_id,
            worker_id: target_worker,
            start_date,
            placement,
        }
    }
}

/// A finished drag: move `item_id` into `worker_id`'s queue at `start_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitIntent {
    pub item_id: WorkItemId,
    pub worker_id: WorkerId,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub placement: Placement,
}

impl CommitIntent {
    pub fn new(item_id: WorkItemId, worker_id: WorkerId, start_date: NaiveDate) -> Self {
        Self {
            item_id,
            worker_id,
            start_date,
            placement: Placement::Before,
        }
    }

    pub fn forced_move(&self) -> ForcedMove {
        ForcedMove::new(self.item_id, self.start_date).placed(self.placement)
    }
}
