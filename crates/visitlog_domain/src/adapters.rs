use crate::{LogEvent, SettingsRecord, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordOrigin {
    Created,
    Existing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoadedSettings {
    pub record: SettingsRecord,
    pub origin: RecordOrigin,
}

/// One connection to the settings database.
///
/// Handles are owned by a single page instance. Dropping the last clone releases
/// the underlying connection.
pub trait SettingsStore: Send + Sync {
    /// Returns the record with `id`, inserting [`SettingsRecord::initial`] first when
    /// it does not exist yet.
    fn load_or_create(&self, id: i64) -> Result<LoadedSettings, StoreError>;

    /// Overwrites the stored row with the same id. Returns after the write commits.
    fn save(&self, record: &SettingsRecord) -> Result<(), StoreError>;

    fn load(&self, id: i64) -> Result<SettingsRecord, StoreError>;

    /// Appends one log line to the stored row and returns the row as committed.
    /// Every other column keeps its stored value.
    fn append_log(
        &self,
        id: i64,
        event: LogEvent,
        at: DateTime<Utc>,
    ) -> Result<SettingsRecord, StoreError>;
}

pub trait SettingsStoreFactory: Send + Sync {
    fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Opens a fresh connection handle.
    fn connect(&self) -> Result<Arc<dyn SettingsStore>, StoreError>;
}
