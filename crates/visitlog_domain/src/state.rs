use crate::{SettingsRecord, StoreError};
use chrono::{DateTime, Utc};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PagePhase {
    Uninitialized,
    Ready,
    Disposed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SaveTrigger {
    Activation,
    User,
}

/// State of one settings page instance.
#[derive(Clone, Debug, PartialEq)]
pub struct SettingsPage {
    pub(crate) phase: PagePhase,
    pub(crate) record: Option<SettingsRecord>,
    pub(crate) load_in_flight: bool,
    pub(crate) last_saved_at: Option<DateTime<Utc>>,
    pub(crate) last_error: Option<StoreError>,
}

impl SettingsPage {
    pub fn new() -> Self {
        Self {
            phase: PagePhase::Uninitialized,
            record: None,
            load_in_flight: false,
            last_saved_at: None,
            last_error: None,
        }
    }

    pub fn phase(&self) -> PagePhase {
        self.phase
    }

    /// The record as displayed. `None` until activation completes.
    pub fn record(&self) -> Option<&SettingsRecord> {
        match self.phase {
            PagePhase::Ready => self.record.as_ref(),
            PagePhase::Uninitialized | PagePhase::Disposed => None,
        }
    }

    /// The in-memory record, including one whose activation write is still pending.
    pub fn pending_record(&self) -> Option<&SettingsRecord> {
        self.record.as_ref()
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    pub fn last_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.phase == PagePhase::Disposed
    }
}

impl Default for SettingsPage {
    fn default() -> Self {
        Self::new()
    }
}
