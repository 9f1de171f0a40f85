use crate::config::ConnectionString;
use crate::sqlite_store::{SqliteStore, ensure_schema};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use visitlog_domain::{SettingsStore, SettingsStoreFactory, StoreError};

/// Hands out one fresh [`SqliteStore`] per page instance.
#[derive(Clone, Debug)]
pub struct SqliteStoreFactory {
    db_path: PathBuf,
}

impl SqliteStoreFactory {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    pub fn from_connection_string(connection_string: &ConnectionString) -> Self {
        Self::new(connection_string.data_source().to_path_buf())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl SettingsStoreFactory for SqliteStoreFactory {
    fn ensure_schema(&self) -> Result<(), StoreError> {
        ensure_schema(&self.db_path).map_err(|err| StoreError::unavailable(format!("{err:#}")))?;
        tracing::info!(path = %self.db_path.display(), "settings schema ready");
        Ok(())
    }

    fn connect(&self) -> Result<Arc<dyn SettingsStore>, StoreError> {
        let store = SqliteStore::open(self.db_path.clone())
            .map_err(|err| StoreError::unavailable(format!("{err:#}")))?;
        tracing::debug!(path = %self.db_path.display(), "opened settings connection");
        Ok(Arc::new(store))
    }
}
