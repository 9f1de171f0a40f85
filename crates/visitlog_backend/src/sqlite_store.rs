use anyhow::{Context as _, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use visitlog_domain::{
    LoadedSettings, LogEvent, RecordOrigin, SettingsRecord, SettingsStore, StoreError,
};

const SCHEMA_VERSION: u32 = 1;
const SCHEMA_SQL: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/migrations/0001_settings.sql"
));

/// Handle to one SQLite connection owned by a dedicated worker thread.
///
/// Clones share the connection. The worker exits and the connection closes once
/// every clone is dropped.
#[derive(Clone)]
pub struct SqliteStore {
    tx: mpsc::Sender<DbCommand>,
}

enum DbCommand {
    LoadOrCreate {
        id: i64,
        reply: mpsc::Sender<anyhow::Result<LoadedSettings>>,
    },
    Load {
        id: i64,
        reply: mpsc::Sender<anyhow::Result<Option<SettingsRecord>>>,
    },
    Save {
        record: Box<SettingsRecord>,
        reply: mpsc::Sender<anyhow::Result<()>>,
    },
    AppendLog {
        id: i64,
        event: LogEvent,
        at: DateTime<Utc>,
        reply: mpsc::Sender<anyhow::Result<Option<SettingsRecord>>>,
    },
}

impl SqliteStore {
    pub fn open(db_path: PathBuf) -> anyhow::Result<Self> {
        let mut db = SqliteDatabase::open(&db_path)?;
        let (tx, rx) = mpsc::channel::<DbCommand>();

        std::thread::Builder::new()
            .name("visitlog-sqlite".to_owned())
            .spawn(move || {
                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        DbCommand::LoadOrCreate { id, reply } => {
                            let _ = reply.send(db.load_or_create(id));
                        }
                        DbCommand::Load { id, reply } => {
                            let _ = reply.send(db.load(id));
                        }
                        DbCommand::Save { record, reply } => {
                            let _ = reply.send(db.save(&record));
                        }
                        DbCommand::AppendLog {
                            id,
                            event,
                            at,
                            reply,
                        } => {
                            let _ = reply.send(db.append_log(id, event, at));
                        }
                    }
                }
                tracing::debug!(path = %db_path.display(), "sqlite connection closed");
            })
            .context("failed to spawn sqlite worker thread")?;

        Ok(Self { tx })
    }

    pub fn load_or_create(&self, id: i64) -> anyhow::Result<LoadedSettings> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(DbCommand::LoadOrCreate {
                id,
                reply: reply_tx,
            })
            .context("sqlite worker is not running")?;
        reply_rx.recv().context("sqlite worker terminated")?
    }

    pub fn load(&self, id: i64) -> anyhow::Result<Option<SettingsRecord>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(DbCommand::Load {
                id,
                reply: reply_tx,
            })
            .context("sqlite worker is not running")?;
        reply_rx.recv().context("sqlite worker terminated")?
    }

    pub fn save(&self, record: SettingsRecord) -> anyhow::Result<()> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(DbCommand::Save {
                record: Box::new(record),
                reply: reply_tx,
            })
            .context("sqlite worker is not running")?;
        reply_rx.recv().context("sqlite worker terminated")?
    }

    /// Returns `None` when the row does not exist; nothing is written then.
    pub fn append_log(
        &self,
        id: i64,
        event: LogEvent,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<SettingsRecord>> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .send(DbCommand::AppendLog {
                id,
                event,
                at,
                reply: reply_tx,
            })
            .context("sqlite worker is not running")?;
        reply_rx.recv().context("sqlite worker terminated")?
    }
}

fn storage_unavailable(err: anyhow::Error) -> StoreError {
    StoreError::unavailable(format!("{err:#}"))
}

impl SettingsStore for SqliteStore {
    fn load_or_create(&self, id: i64) -> Result<LoadedSettings, StoreError> {
        SqliteStore::load_or_create(self, id).map_err(storage_unavailable)
    }

    fn save(&self, record: &SettingsRecord) -> Result<(), StoreError> {
        SqliteStore::save(self, record.clone()).map_err(storage_unavailable)
    }

    fn load(&self, id: i64) -> Result<SettingsRecord, StoreError> {
        SqliteStore::load(self, id)
            .map_err(storage_unavailable)?
            .ok_or(StoreError::RecordNotFound { id })
    }

    fn append_log(
        &self,
        id: i64,
        event: LogEvent,
        at: DateTime<Utc>,
    ) -> Result<SettingsRecord, StoreError> {
        SqliteStore::append_log(self, id, event, at)
            .map_err(storage_unavailable)?
            .ok_or(StoreError::RecordNotFound { id })
    }
}

/// Creates the database file and the settings table when missing.
pub fn ensure_schema(db_path: &Path) -> anyhow::Result<()> {
    SqliteDatabase::open(db_path).map(|_| ())
}

struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut conn = Connection::open(db_path)
            .with_context(|| format!("failed to open sqlite db {}", db_path.display()))?;

        configure_connection(&mut conn).context("failed to configure sqlite connection")?;
        apply_schema(&mut conn).context("failed to apply sqlite schema")?;

        Ok(Self { conn })
    }

    fn load_or_create(&mut self, id: i64) -> anyhow::Result<LoadedSettings> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin load transaction")?;

        let loaded = match select_record(&tx, id)? {
            Some(record) => LoadedSettings {
                record,
                origin: RecordOrigin::Existing,
            },
            None => {
                let record = SettingsRecord::initial(id, Utc::now());
                upsert_record(&tx, &record)?;
                tracing::info!(id, "created settings record");
                LoadedSettings {
                    record,
                    origin: RecordOrigin::Created,
                }
            }
        };

        tx.commit().context("failed to commit load transaction")?;
        Ok(loaded)
    }

    fn load(&mut self, id: i64) -> anyhow::Result<Option<SettingsRecord>> {
        select_record(&self.conn, id)
    }

    fn save(&mut self, record: &SettingsRecord) -> anyhow::Result<()> {
        let tx = self.conn.transaction()?;
        upsert_record(&tx, record)?;
        tx.commit()
            .with_context(|| format!("failed to commit settings record {}", record.id))?;
        Ok(())
    }

    fn append_log(
        &mut self,
        id: i64,
        event: LogEvent,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<SettingsRecord>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin append transaction")?;

        let Some(mut record) = select_record(&tx, id)? else {
            return Ok(None);
        };
        record.append_log(event, at);
        tx.execute(
            "UPDATE settings SET log_text = ?2 WHERE id = ?1",
            params![id, record.log_text],
        )
        .with_context(|| format!("failed to append to settings log {id}"))?;

        tx.commit()
            .with_context(|| format!("failed to commit settings log {id}"))?;
        Ok(Some(record))
    }
}

fn select_record(conn: &Connection, id: i64) -> anyhow::Result<Option<SettingsRecord>> {
    conn.query_row(
        "SELECT id, name, visit_count, last_visit_at, receive_notifications, log_text
         FROM settings WHERE id = ?1",
        params![id],
        |row| {
            Ok(SettingsRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                visit_count: row.get(2)?,
                last_visit_at: row.get(3)?,
                receive_notifications: row.get(4)?,
                log_text: row.get(5)?,
            })
        },
    )
    .optional()
    .with_context(|| format!("failed to load settings record {id}"))
}

fn upsert_record(conn: &Connection, record: &SettingsRecord) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings (id, name, visit_count, last_visit_at, receive_notifications, log_text)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           visit_count = excluded.visit_count,
           last_visit_at = excluded.last_visit_at,
           receive_notifications = excluded.receive_notifications,
           log_text = excluded.log_text",
        params![
            record.id,
            record.name,
            record.visit_count,
            record.last_visit_at,
            record.receive_notifications,
            record.log_text,
        ],
    )
    .with_context(|| format!("failed to write settings record {}", record.id))?;
    Ok(())
}

fn configure_connection(conn: &mut Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )
    .context("failed to apply sqlite PRAGMAs")?;
    Ok(())
}

fn apply_schema(conn: &mut Connection) -> anyhow::Result<()> {
    let raw: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("failed to read user_version")?;
    let current = u32::try_from(raw)
        .with_context(|| format!("sqlite user_version is out of range: {raw}"))?;

    if current > SCHEMA_VERSION {
        return Err(anyhow!(
            "sqlite schema version is newer than this build: db={}, app={}",
            current,
            SCHEMA_VERSION
        ));
    }

    if current == SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin schema transaction")?;
    tx.execute_batch(SCHEMA_SQL)
        .context("failed to create settings table")?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION as i64)
        .context("failed to update user_version")?;
    tx.commit().context("failed to commit schema transaction")?;
    Ok(())
}
