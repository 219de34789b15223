use std::{
    convert::TryFrom,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rusqlite::{params, Connection};
use tokio::sync::oneshot;

mod migrations;

use crate::models::{EndReason, SessionRecord};
use crate::timer::TimerMode;
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} is negative"))
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn mode_from_str(value: &str) -> Result<TimerMode> {
    match value {
        "Stopwatch" => Ok(TimerMode::Stopwatch),
        "Countdown" => Ok(TimerMode::Countdown),
        "Intervals" => Ok(TimerMode::Intervals),
        _ => Err(anyhow!("unknown timer mode '{value}'")),
    }
}

fn reason_from_str(value: &str) -> Result<EndReason> {
    match value {
        "Natural" => Ok(EndReason::Natural),
        "Manual" => Ok(EndReason::Manual),
        _ => Err(anyhow!("unknown end reason '{value}'")),
    }
}

fn record_from_row(row: &rusqlite::Row<'_>) -> Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get::<_, String>(0)?,
        mode: mode_from_str(&row.get::<_, String>(1)?)?,
        label: row.get::<_, Option<String>>(2)?,
        started_at: row
            .get::<_, Option<String>>(3)?
            .map(|s| parse_datetime(&s))
            .transpose()?,
        stopped_at: parse_datetime(&row.get::<_, String>(4)?)?,
        duration_ms: to_u64(row.get::<_, i64>(5)?)?,
        completed_cycles: u32::try_from(row.get::<_, i64>(6)?)
            .map_err(|_| anyhow!("completed_cycles out of range"))?,
        target_cycles: row
            .get::<_, Option<i64>>(7)?
            .map(|v| u32::try_from(v).map_err(|_| anyhow!("target_cycles out of range")))
            .transpose()?,
        ended_by: reason_from_str(&row.get::<_, String>(8)?)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?)?,
    })
}

const RECORD_COLUMNS: &str = "id, mode, label, started_at, stopped_at, duration_ms, \
                              completed_cycles, target_cycles, ended_by, created_at";

/// History of finished sessions, behind a dedicated worker thread so
/// rusqlite's connection never crosses an await point.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("cadence-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(
                            Err(anyhow::Error::new(err).context("failed to open SQLite database")),
                        );
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_record(&self, record: &SessionRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO records (id, mode, label, started_at, stopped_at, duration_ms,
                                      completed_cycles, target_cycles, ended_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.mode.as_str(),
                    record.label,
                    record.started_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.stopped_at.to_rfc3339(),
                    to_i64(record.duration_ms)?,
                    i64::from(record.completed_cycles),
                    record.target_cycles.map(i64::from),
                    record.ended_by.as_str(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert session record")?;
            Ok(())
        })
        .await
    }

    /// Newest first. Rows that fail to parse are skipped with a warning
    /// rather than failing the whole listing.
    pub async fn list_records(&self, limit: Option<u32>) -> Result<Vec<SessionRecord>> {
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {RECORD_COLUMNS} FROM records
                 ORDER BY stopped_at DESC
                 LIMIT ?1"
            );
            let mut stmt = conn.prepare(&sql)?;

            let mut rows = stmt.query(params![limit.map(i64::from).unwrap_or(-1)])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                match record_from_row(row) {
                    Ok(record) => records.push(record),
                    Err(err) => warn!("skipping invalid history record: {err}"),
                }
            }

            Ok(records)
        })
        .await
    }

    pub async fn delete_record(&self, record_id: &str) -> Result<()> {
        let record_id = record_id.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM records WHERE id = ?1", params![record_id])
                .with_context(|| "failed to delete session record")?;
            Ok(())
        })
        .await
    }
}
