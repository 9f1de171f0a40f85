mod settings;
pub use settings::{
    LOG_LINE_SEPARATOR, LogEvent, SETTINGS_RECORD_ID, SettingsRecord, format_log_line,
};

mod error;
pub use error::StoreError;

mod adapters;
pub use adapters::{LoadedSettings, RecordOrigin, SettingsStore, SettingsStoreFactory};

mod actions;
pub use actions::Action;
mod effects;
pub use effects::Effect;
pub mod paths;

mod state;
pub use state::{PagePhase, SaveTrigger, SettingsPage};

mod reducer;
