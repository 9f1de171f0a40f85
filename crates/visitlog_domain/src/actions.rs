use crate::{LoadedSettings, SaveTrigger, SettingsRecord, StoreError};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug)]
pub enum Action {
    Activate,
    SettingsLoaded {
        loaded: Box<LoadedSettings>,
        at: DateTime<Utc>,
    },
    SettingsLoadFailed {
        error: StoreError,
    },

    SaveRequested {
        at: DateTime<Utc>,
    },
    /// `record` is the row as committed by the write.
    SettingsSaved {
        trigger: SaveTrigger,
        record: Box<SettingsRecord>,
        at: DateTime<Utc>,
    },
    SettingsSaveFailed {
        trigger: SaveTrigger,
        error: StoreError,
    },

    Teardown,
    ClearError,
}
