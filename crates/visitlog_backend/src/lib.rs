mod config;
mod env;
mod factory;
mod sqlite_store;
#[cfg(test)]
mod test_support;

pub use config::{AppConfig, ConnectionString};
pub use factory::SqliteStoreFactory;
pub use sqlite_store::{SqliteStore, ensure_schema};
