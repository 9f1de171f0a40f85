use crate::SaveTrigger;
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Effect {
    LoadOrCreateSettings,
    SaveSettings {
        trigger: SaveTrigger,
        at: DateTime<Utc>,
    },
    ReleaseConnection,
}
