use super::{PersistenceError, PersistenceResult, QueueStore};
use crate::calendar::HolidayConfig;
use crate::work_item::WorkItem;
use crate::worker::{Worker, WorkerId};
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::{Mutex, MutexGuard};

pub struct SqliteQueueStore {
    connection: Mutex<Connection>,
}

impl SqliteQueueStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS workers (
                id INTEGER PRIMARY KEY,
                worker_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS work_items (
                id INTEGER PRIMARY KEY,
                worker_id INTEGER NOT NULL,
                start_date TEXT,
                end_date TEXT,
                nominal_hours REAL NOT NULL,
                calendar_days INTEGER NOT NULL,
                item_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS work_items_worker ON work_items (worker_id);
            CREATE TABLE IF NOT EXISTS holiday_config (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                config_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn lock(&self) -> PersistenceResult<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::Unavailable("sqlite mutex poisoned".into()))
    }
}

impl QueueStore for SqliteQueueStore {
    fn load_roster(&self) -> PersistenceResult<Vec<Worker>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT worker_json FROM workers ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut workers = Vec::new();
        for json in rows {
            workers.push(serde_json::from_str(&json?)?);
        }
        Ok(workers)
    }

    fn load_items(&self) -> PersistenceResult<Vec<WorkItem>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT item_json FROM work_items ORDER BY worker_id ASC, start_date ASC, id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut items = Vec::new();
        for json in rows {
            items.push(serde_json::from_str(&json?)?);
        }
        Ok(items)
    }

    fn load_holidays(&self) -> PersistenceResult<HolidayConfig> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT config_json FROM holiday_config WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(HolidayConfig::default()),
        }
    }

    fn save_workers(&self, workers: &[Worker]) -> PersistenceResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM workers", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO workers (id, worker_json) VALUES (?1, ?2)")?;
            for worker in workers {
                stmt.execute(params![worker.id, serde_json::to_string(worker)?])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn save_queue(&self, worker_id: WorkerId, items: &[WorkItem]) -> PersistenceResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM work_items WHERE worker_id = ?1", params![worker_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO work_items \
                 (id, worker_id, start_date, end_date, nominal_hours, calendar_days, item_json) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for item in items {
                stmt.execute(params![
                    item.id,
                    item.worker_id,
                    item.start_date.map(|d| d.to_string()),
                    item.end_date.map(|d| d.to_string()),
                    item.nominal_hours,
                    item.calendar_days,
                    serde_json::to_string(item)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn save_holidays(&self, holidays: &HolidayConfig) -> PersistenceResult<()> {
        let json = serde_json::to_string(holidays)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO holiday_config (id, config_json) VALUES (1, ?1)",
            params![json],
        )?;
        Ok(())
    }
}
