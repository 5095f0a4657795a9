use chrono::NaiveDate;
use shop_scheduler::{
    CascadeError, CascadePhase, Change, ChangeCascade, CommitIntent, ConflictKind, HolidayConfig,
    ItemEdit, MemoryQueueStore, NewWorkItem, PersistenceError, Placement, QueueStore, SaveOutcome,
    Scheduler, SchedulerConfig, WorkItem, Worker,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Ana (1) owns items 1 and 2, Bo (2) owns item 3. Everything starts the week
/// of 2025-01-06.
fn shop() -> Scheduler {
    let items = vec![
        WorkItem::new(1, 1, "cut", 8.0).starting(d(2025, 1, 6)),
        WorkItem::new(2, 1, "bend", 8.0).starting(d(2025, 1, 7)),
        WorkItem::new(3, 2, "paint", 8.0).starting(d(2025, 1, 6)),
    ];
    let mut scheduler = Scheduler::from_parts(
        SchedulerConfig::default(),
        vec![Worker::new(1, "Ana"), Worker::new(2, "Bo")],
        items,
        HolidayConfig::default(),
        Some(d(2025, 1, 6)),
    )
    .unwrap();
    scheduler.resequence_all().unwrap();
    scheduler
}

fn committed(outcome: SaveOutcome) -> shop_scheduler::CommitReport {
    match outcome {
        SaveOutcome::Committed(report) => report,
        other => panic!("expected a commit, got {other:?}"),
    }
}

#[test]
fn disabling_a_busy_worker_needs_acknowledgement_and_keeps_the_flag() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let mut ana = scheduler.worker(1).unwrap().clone();
    ana.can_schedule = false;
    ana.color = Some("#aa0000".into());
    let mut bo = scheduler.worker(2).unwrap().clone();
    bo.name = "Bob".into();
    let batch = vec![Change::UpdateWorker(ana), Change::UpdateWorker(bo)];

    let outcome = cascade.commit(&mut scheduler, batch, false, &store).unwrap();
    assert_eq!(outcome.conflict_names(), vec!["Ana"]);
    assert_eq!(cascade.phase(), CascadePhase::AwaitingAcknowledgment);
    assert_eq!(scheduler.worker(2).unwrap().name, "Bo");
    assert!(store.load_roster().unwrap().is_empty());

    assert!(matches!(
        cascade.commit(&mut scheduler, Vec::new(), false, &store),
        Err(CascadeError::AwaitingAcknowledgment)
    ));

    let report = committed(cascade.acknowledge(&mut scheduler, &store).unwrap());
    assert_eq!(report.reverted, vec!["Ana".to_string()]);
    assert_eq!(cascade.phase(), CascadePhase::Idle);

    let ana = scheduler.worker(1).unwrap();
    assert!(ana.can_schedule);
    assert_eq!(ana.color.as_deref(), Some("#aa0000"));
    assert_eq!(scheduler.worker(2).unwrap().name, "Bob");
    let stored: Vec<String> = store
        .load_roster()
        .unwrap()
        .into_iter()
        .map(|worker| worker.name)
        .collect();
    assert!(stored.contains(&"Bob".to_string()));
}

#[test]
fn disabling_an_idle_worker_commits_directly() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();
    scheduler.resequence_all().unwrap();

    let batch = vec![Change::AddWorker(Worker::new(5, "Cy"))];
    committed(cascade.commit(&mut scheduler, batch, false, &store).unwrap());

    let mut cy = scheduler.worker(5).unwrap().clone();
    cy.can_schedule = false;
    let report = committed(
        cascade
            .commit(&mut scheduler, vec![Change::UpdateWorker(cy)], false, &store)
            .unwrap(),
    );
    assert!(report.reverted.is_empty());
    assert!(!scheduler.worker(5).unwrap().can_schedule);
}

#[test]
fn cancel_drops_the_parked_batch() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let outcome = cascade
        .commit(
            &mut scheduler,
            vec![Change::DeactivateWorker { worker_id: 2 }],
            false,
            &store,
        )
        .unwrap();
    assert!(!outcome.is_committed());
    assert_eq!(cascade.pending_changes().map(<[Change]>::len), Some(1));
    assert_eq!(cascade.cancel().map(|batch| batch.len()), Some(1));
    assert_eq!(cascade.phase(), CascadePhase::Idle);
    assert!(scheduler.worker(2).unwrap().active);
    assert!(matches!(
        cascade.acknowledge(&mut scheduler, &store),
        Err(CascadeError::NothingPending)
    ));
}

#[test]
fn new_item_wins_its_start_day_and_pushes_the_rest() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let change = Change::AddItem(NewWorkItem {
        id: 10,
        worker_id: 1,
        name: "rush order".into(),
        start_date: Some(d(2025, 1, 6)),
        nominal_hours: 8.0,
        job: None,
    });
    let report = committed(cascade.commit(&mut scheduler, vec![change], false, &store).unwrap());

    assert_eq!(report.resequenced, vec![1]);
    assert_eq!(report.persisted, vec![1]);
    assert_eq!(scheduler.queue_ids(1), vec![10, 1, 2]);
    assert_eq!(scheduler.item(2).unwrap().start_date, Some(d(2025, 1, 8)));
    assert!(scheduler.queue(1).iter().all(|item| !item.is_new));
    assert_eq!(store.stored_queue(1).unwrap().len(), 3);
}

#[test]
fn longer_item_pushes_its_successor() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let change = Change::EditItem(ItemEdit::hours(1, 16.0));
    committed(cascade.commit(&mut scheduler, vec![change], false, &store).unwrap());
    assert_eq!(scheduler.item(1).unwrap().end_date, Some(d(2025, 1, 7)));
    assert_eq!(scheduler.item(2).unwrap().start_date, Some(d(2025, 1, 8)));
}

#[test]
fn field_errors_block_the_whole_batch() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let batch = vec![
        Change::UpdateWorker(Worker::new(2, "Bobby")),
        Change::AddItem(NewWorkItem {
            id: 11,
            worker_id: 99,
            name: "  ".into(),
            start_date: None,
            nominal_hours: 0.0,
            job: None,
        }),
    ];
    let err = cascade
        .commit(&mut scheduler, batch, false, &store)
        .unwrap_err();
    let errors = match err {
        CascadeError::Validation(errors) => errors,
        other => panic!("expected validation errors, got {other:?}"),
    };
    assert!(errors.has_field("name"));
    assert!(errors.has_field("nominal_hours"));
    assert!(errors.has_field("worker_id"));
    assert_eq!(scheduler.worker(2).unwrap().name, "Bo");
    assert_eq!(cascade.phase(), CascadePhase::Idle);
    assert!(store.queue_writes().unwrap().is_empty());
}

#[test]
fn items_cannot_go_to_unschedulable_workers() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();
    let mut off = Worker::new(7, "Dee");
    off.can_schedule = false;
    committed(
        cascade
            .commit(&mut scheduler, vec![Change::AddWorker(off)], false, &store)
            .unwrap(),
    );

    let drag = Change::Drag(CommitIntent::new(1, 7, d(2025, 1, 6)));
    let err = cascade
        .commit(&mut scheduler, vec![drag], false, &store)
        .unwrap_err();
    assert!(matches!(err, CascadeError::Validation(ref e) if e.has_field("worker_id")));
}

#[test]
fn cross_worker_drag_resequences_both_queues() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let drag = Change::Drag(CommitIntent::new(2, 2, d(2025, 1, 6)));
    let report = committed(cascade.commit(&mut scheduler, vec![drag], false, &store).unwrap());

    assert_eq!(report.resequenced, vec![1, 2]);
    assert_eq!(store.queue_writes().unwrap(), vec![1, 2]);
    assert_eq!(scheduler.queue_ids(1), vec![1]);
    assert_eq!(scheduler.queue_ids(2), vec![2, 3]);
    let moved = scheduler.item(2).unwrap();
    assert_eq!(moved.worker_id, 2);
    assert_eq!(moved.start_date, Some(d(2025, 1, 6)));
    assert_eq!(scheduler.item(3).unwrap().start_date, Some(d(2025, 1, 7)));
}

#[test]
fn drag_after_lands_behind_same_day_work() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let mut intent = CommitIntent::new(1, 2, d(2025, 1, 6));
    intent.placement = Placement::After;
    committed(
        cascade
            .commit(&mut scheduler, vec![Change::Drag(intent)], false, &store)
            .unwrap(),
    );
    assert_eq!(scheduler.queue_ids(2), vec![3, 1]);
    assert_eq!(scheduler.item(1).unwrap().start_date, Some(d(2025, 1, 7)));
    // Ana's remaining item keeps its day.
    assert_eq!(scheduler.item(2).unwrap().start_date, Some(d(2025, 1, 7)));
}

#[test]
fn deactivation_moves_work_to_the_default_worker() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let outcome = cascade
        .commit(
            &mut scheduler,
            vec![Change::DeactivateWorker { worker_id: 1 }],
            false,
            &store,
        )
        .unwrap();
    let SaveOutcome::ConflictFound { conflicts } = outcome else {
        panic!("expected a conflict");
    };
    assert_eq!(conflicts[0].kind, ConflictKind::DeactivatedWithItems);
    assert_eq!(conflicts[0].active_items, 2);

    let report = committed(cascade.acknowledge(&mut scheduler, &store).unwrap());
    assert_eq!(report.reassigned, vec![(1, 0, 2)]);
    assert!(!scheduler.worker(1).unwrap().active);
    assert_eq!(scheduler.active_item_count(1), 0);
    assert_eq!(scheduler.queue_ids(0), vec![1, 2]);
    assert!(scheduler.queue(0).iter().all(|item| item.worker_id == 0));
    assert_eq!(store.stored_queue(0).unwrap().len(), 2);
    assert!(store.stored_queue(1).unwrap().is_empty());
}

#[test]
fn default_worker_cannot_be_deactivated() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();
    let err = cascade
        .commit(
            &mut scheduler,
            vec![Change::DeactivateWorker { worker_id: 0 }],
            true,
            &store,
        )
        .unwrap_err();
    assert!(matches!(err, CascadeError::Validation(_)));
}

#[test]
fn removing_a_job_retires_its_items() {
    let items = vec![
        WorkItem::new(1, 1, "frame", 8.0).starting(d(2025, 1, 6)).in_job(50, 0),
        WorkItem::new(2, 1, "other", 8.0).starting(d(2025, 1, 7)),
        WorkItem::new(3, 2, "frame paint", 8.0).starting(d(2025, 1, 6)).in_job(50, 1),
    ];
    let mut scheduler = Scheduler::from_parts(
        SchedulerConfig::default(),
        vec![Worker::new(1, "Ana"), Worker::new(2, "Bo")],
        items,
        HolidayConfig::default(),
        Some(d(2025, 1, 6)),
    )
    .unwrap();
    scheduler.resequence_all().unwrap();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let report = committed(
        cascade
            .commit(&mut scheduler, vec![Change::RemoveJob { job_id: 50 }], false, &store)
            .unwrap(),
    );
    assert_eq!(report.resequenced, vec![1, 2]);
    assert_eq!(scheduler.queue_ids(1), vec![2]);
    assert_eq!(scheduler.item(2).unwrap().start_date, Some(d(2025, 1, 7)));
    assert!(!scheduler.item(1).unwrap().active);
    assert_eq!(scheduler.active_item_count(2), 0);

    let stored = store.stored_queue(1).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().any(|item| item.id == 1 && !item.active));
}

#[test]
fn deleting_an_item_removes_it_everywhere() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();
    committed(
        cascade
            .commit(&mut scheduler, vec![Change::DeleteItem { item_id: 1 }], false, &store)
            .unwrap(),
    );
    assert!(scheduler.item(1).is_none());
    assert_eq!(scheduler.item(2).unwrap().start_date, Some(d(2025, 1, 7)));
    assert_eq!(store.stored_queue(1).unwrap().len(), 1);
}

#[test]
fn new_holiday_reflows_every_queue() {
    let items = vec![
        WorkItem::new(1, 1, "a", 8.0).starting(d(2025, 7, 3)),
        WorkItem::new(2, 1, "b", 8.0).starting(d(2025, 7, 4)),
        WorkItem::new(3, 2, "c", 8.0).starting(d(2025, 7, 4)),
    ];
    let mut scheduler = Scheduler::from_parts(
        SchedulerConfig::default(),
        vec![Worker::new(1, "Ana"), Worker::new(2, "Bo")],
        items,
        HolidayConfig::default(),
        Some(d(2025, 6, 2)),
    )
    .unwrap();
    scheduler.resequence_all().unwrap();
    assert_eq!(scheduler.item(2).unwrap().start_date, Some(d(2025, 7, 4)));

    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();
    let config = HolidayConfig::default().with_standard("Independence Day");
    let report = committed(
        cascade
            .commit(&mut scheduler, vec![Change::SetHolidays(config.clone())], false, &store)
            .unwrap(),
    );
    assert_eq!(report.resequenced, vec![1, 2]);
    assert_eq!(scheduler.item(2).unwrap().start_date, Some(d(2025, 7, 7)));
    assert_eq!(scheduler.item(3).unwrap().start_date, Some(d(2025, 7, 7)));
    assert_eq!(store.load_holidays().unwrap(), config);
}

#[test]
fn unknown_standard_holiday_is_a_field_error() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();
    let config = HolidayConfig::default().with_standard("Festivus");
    let err = cascade
        .commit(&mut scheduler, vec![Change::SetHolidays(config)], false, &store)
        .unwrap_err();
    assert!(matches!(err, CascadeError::Validation(ref e) if e.has_field("standard")));
}

#[test]
fn failed_write_reports_what_was_persisted_and_keeps_memory_state() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();
    store.fail_queue_writes_for(2).unwrap();

    let drag = Change::Drag(CommitIntent::new(1, 2, d(2025, 1, 6)));
    let err = cascade
        .commit(&mut scheduler, vec![drag], false, &store)
        .unwrap_err();
    match err {
        CascadeError::Persistence { source, persisted } => {
            assert!(matches!(source, PersistenceError::Unavailable(_)));
            assert_eq!(persisted, vec![1]);
        }
        other => panic!("expected a persistence failure, got {other:?}"),
    }
    assert_eq!(cascade.phase(), CascadePhase::Idle);
    assert_eq!(scheduler.item(1).unwrap().worker_id, 2);

    store.clear_failures().unwrap();
    let retry = Change::EditItem(ItemEdit::rename(1, "cut (retry)"));
    committed(cascade.commit(&mut scheduler, vec![retry], false, &store).unwrap());
    assert_eq!(store.stored_queue(2).unwrap().len(), 2);
}

#[test]
fn time_off_edit_reflows_that_workers_queue() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let ana = scheduler
        .worker(1)
        .unwrap()
        .clone()
        .with_time_off(shop_scheduler::TimeOff::single_day(d(2025, 1, 6)));
    committed(
        cascade
            .commit(&mut scheduler, vec![Change::UpdateWorker(ana)], false, &store)
            .unwrap(),
    );
    assert_eq!(scheduler.item(1).unwrap().start_date, Some(d(2025, 1, 7)));
    assert_eq!(scheduler.item(2).unwrap().start_date, Some(d(2025, 1, 8)));
    assert_eq!(scheduler.item(3).unwrap().start_date, Some(d(2025, 1, 6)));
}

#[test]
fn deactivating_through_an_update_reassigns_like_deactivate() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let mut ana = scheduler.worker(1).unwrap().clone();
    ana.active = false;
    let outcome = cascade
        .commit(&mut scheduler, vec![Change::UpdateWorker(ana)], false, &store)
        .unwrap();
    match &outcome {
        SaveOutcome::ConflictFound { conflicts } => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].kind, ConflictKind::DeactivatedWithItems);
            assert_eq!(conflicts[0].active_items, 2);
        }
        other => panic!("expected a conflict, got {other:?}"),
    }
    assert!(scheduler.worker(1).unwrap().active);

    let report = committed(cascade.acknowledge(&mut scheduler, &store).unwrap());
    assert_eq!(report.reassigned, vec![(1, 0, 2)]);
    assert!(!scheduler.worker(1).unwrap().active);
    assert_eq!(scheduler.active_item_count(1), 0);
    assert_eq!(scheduler.queue_ids(0), vec![1, 2]);
    assert_eq!(store.stored_queue(0).unwrap().len(), 2);
}

#[test]
fn default_worker_cannot_be_retired_through_an_update() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let mut inactive = scheduler.worker(0).unwrap().clone();
    inactive.active = false;
    let mut closed = scheduler.worker(0).unwrap().clone();
    closed.can_schedule = false;
    for update in [inactive, closed] {
        let err = cascade
            .commit(&mut scheduler, vec![Change::UpdateWorker(update)], true, &store)
            .unwrap_err();
        assert!(matches!(err, CascadeError::Validation(ref e) if e.has_field("id")));
    }
    assert!(scheduler.worker(0).unwrap().accepts_work());
}

#[test]
fn work_given_earlier_in_the_batch_blocks_a_later_disable() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let cy = Worker::new(5, "Cy");
    let mut closed = cy.clone();
    closed.can_schedule = false;
    let batch = vec![
        Change::AddWorker(cy),
        Change::AddItem(NewWorkItem {
            id: 10,
            worker_id: 5,
            name: "weld".into(),
            start_date: Some(d(2025, 1, 6)),
            nominal_hours: 8.0,
            job: None,
        }),
        Change::UpdateWorker(closed),
    ];

    let outcome = cascade.commit(&mut scheduler, batch, false, &store).unwrap();
    match &outcome {
        SaveOutcome::ConflictFound { conflicts } => {
            assert_eq!(conflicts[0].kind, ConflictKind::ScheduleDisabledWithItems);
            assert_eq!(conflicts[0].worker_name, "Cy");
            assert_eq!(conflicts[0].active_items, 1);
        }
        other => panic!("expected a conflict, got {other:?}"),
    }

    let report = committed(cascade.acknowledge(&mut scheduler, &store).unwrap());
    assert_eq!(report.reverted, vec!["Cy".to_string()]);
    assert!(scheduler.worker(5).unwrap().can_schedule);
    assert_eq!(scheduler.queue_ids(5), vec![10]);
}

#[test]
fn worker_added_closed_cannot_take_work_in_the_same_batch() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let mut cy = Worker::new(5, "Cy");
    cy.can_schedule = false;
    let batch = vec![
        Change::AddWorker(cy),
        Change::AddItem(NewWorkItem {
            id: 10,
            worker_id: 5,
            name: "weld".into(),
            start_date: None,
            nominal_hours: 8.0,
            job: None,
        }),
    ];
    let err = cascade
        .commit(&mut scheduler, batch, false, &store)
        .unwrap_err();
    assert!(matches!(err, CascadeError::Validation(ref e) if e.has_field("worker_id")));
    assert!(scheduler.worker(5).is_none());
    assert!(scheduler.item(10).is_none());
}

#[test]
fn dragging_a_deleted_item_is_rejected_before_anything_changes() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let batch = vec![
        Change::DeleteItem { item_id: 1 },
        Change::Drag(CommitIntent::new(1, 2, d(2025, 1, 6))),
    ];
    let err = cascade
        .commit(&mut scheduler, batch, false, &store)
        .unwrap_err();
    assert!(matches!(err, CascadeError::Validation(ref e) if e.has_field("item_id")));
    assert_eq!(scheduler.queue_ids(1), vec![1, 2]);
    assert_eq!(cascade.phase(), CascadePhase::Idle);
    assert!(store.queue_writes().unwrap().is_empty());
}

#[test]
fn failed_sequencing_leaves_the_schedule_as_it_was() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    // Ana is away for longer than the workday search reaches.
    let ana = scheduler
        .worker(1)
        .unwrap()
        .clone()
        .with_time_off(shop_scheduler::TimeOff::new(d(2025, 1, 1), d(2040, 12, 31)));
    let batch = vec![
        Change::EditItem(ItemEdit::rename(3, "primer")),
        Change::UpdateWorker(ana),
    ];
    let err = cascade
        .commit(&mut scheduler, batch, false, &store)
        .unwrap_err();
    assert!(matches!(err, CascadeError::Scheduler(_)));
    assert_eq!(cascade.phase(), CascadePhase::Idle);
    assert_eq!(scheduler.item(3).unwrap().name, "paint");
    assert!(scheduler.worker(1).unwrap().time_off.is_empty());
    assert!(!scheduler.is_non_workday(d(2025, 1, 6), 1));
    assert_eq!(scheduler.item(1).unwrap().start_date, Some(d(2025, 1, 6)));
}

#[test]
fn two_drags_into_one_queue_keep_their_placements() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let mut after = CommitIntent::new(2, 2, d(2025, 1, 6));
    after.placement = Placement::After;
    let batch = vec![
        Change::Drag(CommitIntent::new(1, 2, d(2025, 1, 6))),
        Change::Drag(after),
    ];
    committed(cascade.commit(&mut scheduler, batch, false, &store).unwrap());

    assert_eq!(scheduler.queue_ids(2), vec![1, 3, 2]);
    assert_eq!(scheduler.item(1).unwrap().start_date, Some(d(2025, 1, 6)));
    assert_eq!(scheduler.item(3).unwrap().start_date, Some(d(2025, 1, 7)));
    assert_eq!(scheduler.item(2).unwrap().start_date, Some(d(2025, 1, 8)));
    assert!(scheduler.queue_ids(1).is_empty());
}

#[test]
fn redragging_an_item_uses_its_last_placement() {
    let mut scheduler = shop();
    let mut cascade = ChangeCascade::new();
    let store = MemoryQueueStore::new();

    let mut first = CommitIntent::new(1, 2, d(2025, 1, 6));
    first.placement = Placement::After;
    let batch = vec![
        Change::Drag(first),
        Change::Drag(CommitIntent::new(1, 2, d(2025, 1, 6))),
    ];
    committed(cascade.commit(&mut scheduler, batch, false, &store).unwrap());
    assert_eq!(scheduler.queue_ids(2), vec![1, 3]);
}
