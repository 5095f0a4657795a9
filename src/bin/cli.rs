use chrono::NaiveDate;
use polars::prelude::{AnyValue, DataFrame};
use shop_scheduler::{
    CascadeError, Change, ChangeCascade, CommitIntent, DragPreview, ItemEdit, JsonQueueStore,
    MemoryQueueStore, NewWorkItem, NonWorkday, SaveOutcome, Scheduler, SchedulerConfig, TimeOff,
    Worker, load_items_from_csv, load_scheduler, logging, save_items_to_csv, save_scheduler,
};
use std::fs;
use std::io::{self, Write};
use std::str::SplitWhitespace;

struct Session {
    scheduler: Scheduler,
    cascade: ChangeCascade,
    store: MemoryQueueStore,
    chart_start: Option<NaiveDate>,
}

impl Session {
    fn chart_start(&self) -> NaiveDate {
        self.chart_start.unwrap_or_else(|| self.scheduler.today())
    }
}

fn cell_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::Float64(v) => format!("{v:.1}"),
        AnyValue::String(s) => s.to_string(),
        _ => value.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let row = columns
            .iter()
            .map(|col| {
                col.get(row_idx)
                    .map(|value| cell_text(&value))
                    .unwrap_or_default()
            })
            .collect();
        cells.push(row);
    }

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &cells {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (ci, value) in values.iter().enumerate() {
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(value.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                                   Show this help\n  show                                   Show the timeline\n  chart <YYYY-MM-DD>                     Set the timeline's first day\n  today <YYYY-MM-DD>                     Pin today's date\n  workers                                List the roster\n  worker add <id> <name...>              Add a worker\n  worker rename <id> <name...>           Rename a worker\n  worker color <id> <color>              Set a worker's color\n  worker off <id> <start> [end]          Add time off (inclusive)\n  worker schedule <id> <true|false>      Allow or forbid scheduled work\n  worker deactivate <id>                 Remove from the roster\n  item add <worker> <hours> <start|-> <name...>\n                                         Add a work item\n  item hours <id> <hours>                Change an item's duration\n  item rename <id> <name...>             Rename an item\n  item job <id> <job_id> <position>      Attach an item to a job\n  item delete <id>                       Hard-delete an item\n  job remove <job_id>                    Deactivate every item of a job\n  drag <item> <worker> <delta_px>        Drop an item after dragging it\n  holiday list                           Show holiday selection\n  holiday add <name...>                  Observe a standard holiday\n  holiday drop <name...>                 Stop observing a standard holiday\n  holiday custom <date> <name...>        Add a custom holiday\n  day <worker> <YYYY-MM-DD>              Explain one calendar day\n  ack                                    Save despite reported conflicts\n  cancel                                 Discard the pending save\n  save json <path>                       Write a JSON snapshot\n  load json <path>                       Load a JSON snapshot\n  export csv <path>                      Write items as CSV\n  import csv <path>                      Replace items from CSV\n  quit|exit                              Exit"
    );
}

fn parse_date(input: Option<&str>) -> Result<NaiveDate, String> {
    let raw = input.ok_or("missing date")?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| format!("Invalid date '{raw}'"))
}

fn parse_number<T: std::str::FromStr>(input: Option<&str>, what: &str) -> Result<T, String> {
    let raw = input.ok_or_else(|| format!("missing {what}"))?;
    raw.parse().map_err(|_| format!("Invalid {what} '{raw}'"))
}

fn rest(parts: &mut SplitWhitespace<'_>) -> String {
    parts.collect::<Vec<_>>().join(" ")
}

fn show(session: &Session) {
    match session.scheduler.timeline_frame(session.chart_start()) {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Error building timeline: {e}"),
    }
}

fn print_workers(scheduler: &Scheduler) {
    for worker in scheduler.workers() {
        println!(
            "{:>4}  {:<20} active={} schedulable={} items={} time_off={}",
            worker.id,
            worker.name,
            worker.active,
            worker.can_schedule,
            scheduler.active_item_count(worker.id),
            worker.time_off.len()
        );
    }
}

fn report(session: &Session, result: Result<SaveOutcome, CascadeError>) {
    match result {
        Ok(SaveOutcome::Committed(report)) => {
            let workers: Vec<String> = report.resequenced.iter().map(|id| id.to_string()).collect();
            println!("Saved. Re-sequenced workers: {}", workers.join(", "));
            if !report.reverted.is_empty() {
                println!(
                    "Scheduling stays enabled for: {}",
                    report.reverted.join(", ")
                );
            }
            for (from, to, count) in &report.reassigned {
                println!("Moved {count} item(s) from worker {from} to worker {to}.");
            }
            show(session);
        }
        Ok(SaveOutcome::ConflictFound { conflicts }) => {
            let names: Vec<&str> = conflicts.iter().map(|c| c.worker_name.as_str()).collect();
            println!(
                "Workers still have active items: {}. Type 'ack' to save anyway or 'cancel'.",
                names.join(", ")
            );
        }
        Err(CascadeError::Validation(errors)) => {
            println!("Not saved:");
            for error in errors.errors() {
                println!("  {error}");
            }
        }
        Err(e) => println!("Error: {e}"),
    }
}

fn submit(session: &mut Session, change: Change) {
    let Session {
        scheduler,
        cascade,
        store,
        ..
    } = &mut *session;
    let result = cascade.commit(scheduler, vec![change], false, &*store);
    report(session, result);
}

fn worker_update(
    session: &Session,
    id: i32,
    edit: impl FnOnce(&mut Worker),
) -> Result<Change, String> {
    let mut worker = session
        .scheduler
        .worker(id)
        .cloned()
        .ok_or_else(|| format!("Worker {id} not found."))?;
    edit(&mut worker);
    Ok(Change::UpdateWorker(worker))
}

fn worker_command(session: &mut Session, parts: &mut SplitWhitespace<'_>) -> Result<(), String> {
    let sub = parts.next().unwrap_or("");
    let id: i32 = parse_number(parts.next(), "worker id")?;
    let change = match sub {
        "add" => Change::AddWorker(Worker::new(id, rest(parts))),
        "rename" => {
            let name = rest(parts);
            worker_update(session, id, |worker| worker.name = name)?
        }
        "color" => {
            let color = parts.next().ok_or("missing color")?.to_string();
            worker_update(session, id, |worker| worker.color = Some(color))?
        }
        "off" => {
            let start = parse_date(parts.next())?;
            let end = match parts.next() {
                Some(raw) => parse_date(Some(raw))?,
                None => start,
            };
            worker_update(session, id, |worker| {
                worker.time_off.push(TimeOff::new(start, end))
            })?
        }
        "schedule" => {
            let enabled: bool = parse_number(parts.next(), "flag")?;
            worker_update(session, id, |worker| worker.can_schedule = enabled)?
        }
        "deactivate" => Change::DeactivateWorker { worker_id: id },
        _ => return Err("Usage: worker <add|rename|color|off|schedule|deactivate> <id> ...".into()),
    };
    submit(session, change);
    Ok(())
}

fn item_command(session: &mut Session, parts: &mut SplitWhitespace<'_>) -> Result<(), String> {
    let sub = parts.next().unwrap_or("");
    let change = match sub {
        "add" => {
            let worker_id: i32 = parse_number(parts.next(), "worker id")?;
            let hours: f64 = parse_number(parts.next(), "hours")?;
            let start_date = match parts.next() {
                Some("-") | None => None,
                Some(raw) => Some(parse_date(Some(raw))?),
            };
            let id = session.scheduler.next_item_id();
            println!("New item id={id}");
            Change::AddItem(NewWorkItem {
                id,
                worker_id,
                name: rest(parts),
                start_date,
                nominal_hours: hours,
                job: None,
            })
        }
        "hours" => {
            let id: i32 = parse_number(parts.next(), "item id")?;
            let hours: f64 = parse_number(parts.next(), "hours")?;
            Change::EditItem(ItemEdit::hours(id, hours))
        }
        "rename" => {
            let id: i32 = parse_number(parts.next(), "item id")?;
            Change::EditItem(ItemEdit::rename(id, rest(parts)))
        }
        "job" => {
            let id: i32 = parse_number(parts.next(), "item id")?;
            let job_id: i32 = parse_number(parts.next(), "job id")?;
            let position: u32 = parse_number(parts.next(), "position")?;
            Change::EditItem(ItemEdit {
                item_id: id,
                name: None,
                nominal_hours: None,
                job: Some(shop_scheduler::JobRef::new(job_id, position)),
            })
        }
        "delete" => Change::DeleteItem {
            item_id: parse_number(parts.next(), "item id")?,
        },
        _ => return Err("Usage: item <add|hours|rename|job|delete> ...".into()),
    };
    submit(session, change);
    Ok(())
}

fn drag_command(session: &mut Session, parts: &mut SplitWhitespace<'_>) -> Result<(), String> {
    let item_id: i32 = parse_number(parts.next(), "item id")?;
    let worker_id: i32 = parse_number(parts.next(), "worker id")?;
    let delta_px: f64 = parse_number(parts.next(), "pixel offset")?;
    let item = session
        .scheduler
        .item(item_id)
        .ok_or_else(|| format!("Item {item_id} not found."))?;
    let origin = item.start_date.unwrap_or_else(|| session.scheduler.today());

    let config = session.scheduler.config();
    let mut preview = DragPreview::new(item_id, origin);
    preview.moved_by(delta_px);
    let intent: CommitIntent =
        preview.commit(worker_id, config.day_width_px, config.snap_threshold);
    println!(
        "Dropping item {item_id} on {} for worker {worker_id}",
        intent.start_date
    );
    submit(session, Change::Drag(intent));
    Ok(())
}

fn holiday_command(session: &mut Session, parts: &mut SplitWhitespace<'_>) -> Result<(), String> {
    let sub = parts.next().unwrap_or("");
    let mut config = session.scheduler.holiday_config().clone();
    match sub {
        "list" => {
            for name in session.scheduler.known_standard_holidays() {
                let mark = if config.standard.contains(&name) { "x" } else { " " };
                println!("  [{mark}] {name}");
            }
            for custom in &config.custom {
                println!("  [x] {} (custom, {})", custom.name, custom.date);
            }
            return Ok(());
        }
        "add" => {
            config.standard.insert(rest(parts));
        }
        "drop" => {
            config.standard.remove(&rest(parts));
        }
        "custom" => {
            let date = parse_date(parts.next())?;
            config = config.with_custom(date, rest(parts));
        }
        _ => return Err("Usage: holiday <list|add|drop|custom> ...".into()),
    }
    submit(session, Change::SetHolidays(config));
    Ok(())
}

fn day_command(session: &Session, parts: &mut SplitWhitespace<'_>) -> Result<(), String> {
    let worker_id: i32 = parse_number(parts.next(), "worker id")?;
    let date = parse_date(parts.next())?;
    let scheduler = &session.scheduler;
    match scheduler.classify(date, worker_id) {
        None => println!("{date} is a workday for worker {worker_id}."),
        Some(reason) => {
            let why = match reason {
                NonWorkday::Weekend => "a weekend day".to_string(),
                NonWorkday::Holiday(name) => format!("a holiday ({name})"),
                NonWorkday::TimeOff => "time off".to_string(),
            };
            let next = scheduler
                .next_workday(date, worker_id)
                .map_or_else(|| "none found".to_string(), |d| d.to_string());
            println!("{date} is {why} for worker {worker_id}; next workday {next}.");
        }
    }
    Ok(())
}

fn file_command(
    session: &mut Session,
    cmd: &str,
    parts: &mut SplitWhitespace<'_>,
) -> Result<(), String> {
    let format = parts.next().unwrap_or("");
    let path = parts.next().ok_or_else(|| format!("Usage: {cmd} <json|csv> <path>"))?;
    let today = session.scheduler.today();
    match (cmd, format) {
        ("save", "json") => {
            let _ = fs::remove_file(path);
            save_scheduler(&session.scheduler, &JsonQueueStore::new(path))
                .map_err(|e| format!("Error saving: {e}"))?;
            println!("Schedule saved to {path}");
        }
        ("load", "json") => {
            let config = session.scheduler.config().clone();
            session.scheduler = load_scheduler(config, &JsonQueueStore::new(path), Some(today))
                .map_err(|e| format!("Error loading: {e}"))?;
            session.cascade.cancel();
            save_scheduler(&session.scheduler, &session.store).map_err(|e| e.to_string())?;
            println!("Schedule loaded from {path}");
            show(session);
        }
        ("export", "csv") => {
            save_items_to_csv(&session.scheduler.all_items(), path)
                .map_err(|e| format!("Error exporting: {e}"))?;
            println!("Items exported to {path}");
        }
        ("import", "csv") => {
            let items = load_items_from_csv(path).map_err(|e| format!("Error importing: {e}"))?;
            let workers: Vec<Worker> = session.scheduler.workers().cloned().collect();
            let mut scheduler = Scheduler::from_parts(
                session.scheduler.config().clone(),
                workers,
                items,
                session.scheduler.holiday_config().clone(),
                Some(today),
            )
            .map_err(|e| e.to_string())?;
            scheduler.resequence_all().map_err(|e| e.to_string())?;
            session.scheduler = scheduler;
            session.cascade.cancel();
            save_scheduler(&session.scheduler, &session.store).map_err(|e| e.to_string())?;
            println!("Items imported from {path}");
            show(session);
        }
        _ => return Err(format!("Usage: {cmd} <json|csv> <path>")),
    }
    Ok(())
}

fn main() {
    logging::init();
    let config = match SchedulerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring configuration: {e}");
            SchedulerConfig::default()
        }
    };
    let scheduler = match Scheduler::new(config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("Cannot start scheduler: {e}");
            std::process::exit(1);
        }
    };
    let mut session = Session {
        scheduler,
        cascade: ChangeCascade::new(),
        store: MemoryQueueStore::new(),
        chart_start: None,
    };

    println!("Shop Scheduler (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");
        let result = match cmd {
            "help" => {
                print_help();
                Ok(())
            }
            "quit" | "exit" => break,
            "show" => {
                show(&session);
                Ok(())
            }
            "chart" => parse_date(parts.next()).map(|date| {
                session.chart_start = Some(date);
                show(&session);
            }),
            "today" => parse_date(parts.next()).map(|date| {
                session.scheduler.set_today(date);
                println!("Today is {date}.");
            }),
            "workers" => {
                print_workers(&session.scheduler);
                Ok(())
            }
            "worker" => worker_command(&mut session, &mut parts),
            "item" => item_command(&mut session, &mut parts),
            "job" => match (parts.next(), parse_number::<i32>(parts.next(), "job id")) {
                (Some("remove"), Ok(job_id)) => {
                    submit(&mut session, Change::RemoveJob { job_id });
                    Ok(())
                }
                _ => Err("Usage: job remove <job_id>".to_string()),
            },
            "drag" => drag_command(&mut session, &mut parts),
            "holiday" => holiday_command(&mut session, &mut parts),
            "day" => day_command(&session, &mut parts),
            "ack" => {
                let Session {
                    scheduler,
                    cascade,
                    store,
                    ..
                } = &mut session;
                let result = cascade.acknowledge(scheduler, &*store);
                report(&session, result);
                Ok(())
            }
            "cancel" => {
                match session.cascade.cancel() {
                    Some(changes) => println!("Discarded {} pending change(s).", changes.len()),
                    None => println!("Nothing pending."),
                }
                Ok(())
            }
            "save" | "load" | "export" | "import" => file_command(&mut session, cmd, &mut parts),
            _ => Err(format!("Unknown command '{cmd}'. Type 'help'.")),
        };
        if let Err(message) = result {
            println!("{message}");
        }
    }
}
