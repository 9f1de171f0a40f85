#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("settings storage unavailable: {message}")]
    StorageUnavailable { message: String },
    #[error("settings record {id} not found")]
    RecordNotFound { id: i64 },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::StorageUnavailable {
            message: message.into(),
        }
    }

    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, StoreError::StorageUnavailable { .. })
    }
}
