use crate::pages::PageId;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use visitlog_domain::{
    Action, Effect, LogEvent, PagePhase, SETTINGS_RECORD_ID, SaveTrigger, SettingsPage,
    SettingsRecord, SettingsStore, SettingsStoreFactory, StoreError,
};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum PageError {
    #[error("settings page is not ready")]
    NotReady,
    #[error("settings page has been closed")]
    Disposed,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives one settings page instance against its own store connection.
///
/// A connection is held only while one page event runs. It is acquired when the
/// first effect needs the store and released once the event has been processed,
/// on teardown, or on drop.
pub struct PageController {
    id: PageId,
    page: SettingsPage,
    factory: Arc<dyn SettingsStoreFactory>,
    connection: Option<Arc<dyn SettingsStore>>,
    last_user_save: Option<Result<(), StoreError>>,
}

impl PageController {
    pub fn new(id: PageId, factory: Arc<dyn SettingsStoreFactory>) -> Self {
        Self {
            id,
            page: SettingsPage::new(),
            factory,
            connection: None,
            last_user_save: None,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn page(&self) -> &SettingsPage {
        &self.page
    }

    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    pub async fn activate(&mut self) -> Result<&SettingsRecord, PageError> {
        if self.page.is_disposed() {
            return Err(PageError::Disposed);
        }

        self.process_action_queue(Action::Activate).await;
        self.release_connection();

        match self.page.record() {
            Some(record) => {
                tracing::info!(
                    page_id = %self.id,
                    visit_count = record.visit_count,
                    "settings page activated"
                );
                Ok(record)
            }
            None => Err(self
                .page
                .last_error()
                .cloned()
                .map(PageError::Store)
                .unwrap_or(PageError::NotReady)),
        }
    }

    /// Appends the "saved" log line to the stored record and refreshes the page from
    /// the committed row. The write outcome is returned to the caller.
    pub async fn save_settings(&mut self) -> Result<(), PageError> {
        match self.page.phase() {
            PagePhase::Ready => {}
            PagePhase::Uninitialized => return Err(PageError::NotReady),
            PagePhase::Disposed => return Err(PageError::Disposed),
        }

        self.last_user_save = None;
        self.process_action_queue(Action::SaveRequested { at: Utc::now() })
            .await;
        self.release_connection();

        match self.last_user_save.take() {
            Some(Ok(())) => Ok(()),
            Some(Err(err)) => Err(PageError::Store(err)),
            None => Err(PageError::NotReady),
        }
    }

    pub async fn teardown(&mut self) {
        self.process_action_queue(Action::Teardown).await;
    }

    async fn process_action_queue(&mut self, initial: Action) {
        let mut actions = VecDeque::from([initial]);
        let mut effects = VecDeque::<Effect>::new();

        while let Some(action) = actions.pop_front() {
            effects.extend(self.page.apply(action));

            while let Some(effect) = effects.pop_front() {
                match self.run_effect(effect).await {
                    Ok(mut followups) => actions.append(&mut followups),
                    Err(err) => {
                        tracing::error!(page_id = %self.id, error = %err, "effect failed");
                    }
                }
            }
        }
    }

    async fn run_effect(&mut self, effect: Effect) -> anyhow::Result<VecDeque<Action>> {
        match effect {
            Effect::LoadOrCreateSettings => {
                let store = match self.acquire_connection().await {
                    Ok(store) => store,
                    Err(error) => {
                        return Ok(VecDeque::from([Action::SettingsLoadFailed { error }]));
                    }
                };

                let loaded =
                    tokio::task::spawn_blocking(move || store.load_or_create(SETTINGS_RECORD_ID))
                        .await
                        .unwrap_or_else(|_| {
                            Err(StoreError::unavailable("failed to join load task"))
                        });

                let action = match loaded {
                    Ok(loaded) => Action::SettingsLoaded {
                        loaded: Box::new(loaded),
                        at: Utc::now(),
                    },
                    Err(error) => {
                        tracing::warn!(page_id = %self.id, error = %error, "settings load failed");
                        Action::SettingsLoadFailed { error }
                    }
                };
                Ok(VecDeque::from([action]))
            }
            Effect::SaveSettings { trigger, at } => {
                let Some(record) = self.page.pending_record().cloned() else {
                    anyhow::bail!("save requested without a record");
                };

                let saved = match self.acquire_connection().await {
                    Ok(store) => {
                        let task = match trigger {
                            SaveTrigger::Activation => tokio::task::spawn_blocking(move || {
                                store.save(&record).map(|()| record)
                            }),
                            SaveTrigger::User => tokio::task::spawn_blocking(move || {
                                store.append_log(record.id, LogEvent::Saved, at)
                            }),
                        };
                        task.await.unwrap_or_else(|_| {
                            Err(StoreError::unavailable("failed to join save task"))
                        })
                    }
                    Err(error) => Err(error),
                };

                if trigger == SaveTrigger::User {
                    self.last_user_save = Some(saved.as_ref().map(|_| ()).map_err(Clone::clone));
                }

                let action = match saved {
                    Ok(record) => Action::SettingsSaved {
                        trigger,
                        record: Box::new(record),
                        at: Utc::now(),
                    },
                    Err(error) => {
                        tracing::warn!(
                            page_id = %self.id,
                            ?trigger,
                            error = %error,
                            "settings save failed"
                        );
                        Action::SettingsSaveFailed { trigger, error }
                    }
                };
                Ok(VecDeque::from([action]))
            }
            Effect::ReleaseConnection => {
                self.release_connection();
                Ok(VecDeque::new())
            }
        }
    }

    async fn acquire_connection(&mut self) -> Result<Arc<dyn SettingsStore>, StoreError> {
        if let Some(store) = &self.connection {
            return Ok(store.clone());
        }

        let factory = self.factory.clone();
        let store = tokio::task::spawn_blocking(move || factory.connect())
            .await
            .unwrap_or_else(|_| Err(StoreError::unavailable("failed to join connect task")))?;
        self.connection = Some(store.clone());
        Ok(store)
    }

    fn release_connection(&mut self) {
        if self.connection.take().is_some() {
            tracing::debug!(page_id = %self.id, "released settings connection");
        }
    }
}

impl Drop for PageController {
    fn drop(&mut self) {
        // Teardown yields only ReleaseConnection.
        for effect in self.page.apply(Action::Teardown) {
            if effect == Effect::ReleaseConnection {
                self.release_connection();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use chrono::DateTime;
    use visitlog_domain::{LoadedSettings, RecordOrigin};

    #[derive(Default)]
    struct MemoryDb {
        record: Mutex<Option<SettingsRecord>>,
        fail_connect: AtomicBool,
        fail_load: AtomicBool,
        fail_save: AtomicBool,
        saves: AtomicUsize,
        open_connections: AtomicUsize,
        peak_connections: AtomicUsize,
    }

    struct MemoryStore {
        db: Arc<MemoryDb>,
    }

    impl Drop for MemoryStore {
        fn drop(&mut self) {
            self.db.open_connections.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl SettingsStore for MemoryStore {
        fn load_or_create(&self, id: i64) -> Result<LoadedSettings, StoreError> {
            if self.db.fail_load.load(Ordering::SeqCst) {
                return Err(StoreError::unavailable("load failed"));
            }
            let mut record = self.db.record.lock().unwrap();
            if let Some(existing) = record.as_ref() {
                return Ok(LoadedSettings {
                    record: existing.clone(),
                    origin: RecordOrigin::Existing,
                });
            }
            let created = SettingsRecord::initial(id, Utc::now());
            *record = Some(created.clone());
            self.db.saves.fetch_add(1, Ordering::SeqCst);
            Ok(LoadedSettings {
                record: created,
                origin: RecordOrigin::Created,
            })
        }

        fn save(&self, record: &SettingsRecord) -> Result<(), StoreError> {
            if self.db.fail_save.load(Ordering::SeqCst) {
                return Err(StoreError::unavailable("save failed"));
            }
            *self.db.record.lock().unwrap() = Some(record.clone());
            self.db.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn load(&self, id: i64) -> Result<SettingsRecord, StoreError> {
            self.db
                .record
                .lock()
                .unwrap()
                .clone()
                .ok_or(StoreError::RecordNotFound { id })
        }

        fn append_log(
            &self,
            id: i64,
            event: LogEvent,
            at: DateTime<Utc>,
        ) -> Result<SettingsRecord, StoreError> {
            if self.db.fail_save.load(Ordering::SeqCst) {
                return Err(StoreError::unavailable("save failed"));
            }
            let mut stored = self.db.record.lock().unwrap();
            let Some(record) = stored.as_mut() else {
                return Err(StoreError::RecordNotFound { id });
            };
            record.append_log(event, at);
            self.db.saves.fetch_add(1, Ordering::SeqCst);
            Ok(record.clone())
        }
    }

    struct MemoryFactory {
        db: Arc<MemoryDb>,
    }

    impl SettingsStoreFactory for MemoryFactory {
        fn ensure_schema(&self) -> Result<(), StoreError> {
            Ok(())
        }

        fn connect(&self) -> Result<Arc<dyn SettingsStore>, StoreError> {
            if self.db.fail_connect.load(Ordering::SeqCst) {
                return Err(StoreError::unavailable("cannot open database"));
            }
            let open = self.db.open_connections.fetch_add(1, Ordering::SeqCst) + 1;
            self.db.peak_connections.fetch_max(open, Ordering::SeqCst);
            Ok(Arc::new(MemoryStore {
                db: self.db.clone(),
            }))
        }
    }

    fn controller(db: &Arc<MemoryDb>, id: u64) -> PageController {
        PageController::new(
            PageId(id),
            Arc::new(MemoryFactory { db: db.clone() }),
        )
    }

    #[tokio::test]
    async fn activations_count_visits_with_one_write_each() {
        let db = Arc::new(MemoryDb::default());

        for n in 1..=4u32 {
            let mut page = controller(&db, n as u64);
            let record = page.activate().await.unwrap();
            assert_eq!(record.visit_count, n);
            assert_eq!(record.log_lines().count(), n as usize);
            assert_eq!(db.saves.load(Ordering::SeqCst), n as usize);
        }

        let stored = db.record.lock().unwrap().clone().unwrap();
        assert_eq!(stored.visit_count, 4);
        let lines = stored.log_lines().collect::<Vec<_>>();
        assert!(lines[0].ends_with("Initial settings record added."));
        assert!(lines[1..].iter().all(|line| line.ends_with("Settings loaded.")));
    }

    #[tokio::test]
    async fn save_reports_outcome_and_appends_line() {
        let db = Arc::new(MemoryDb::default());
        let mut page = controller(&db, 1);
        page.activate().await.unwrap();

        page.save_settings().await.unwrap();
        let stored = db.record.lock().unwrap().clone().unwrap();
        assert_eq!(stored.visit_count, 1);
        assert_eq!(stored.log_lines().count(), 2);
        assert!(stored.log_lines().last().unwrap().ends_with("Settings saved."));
        assert!(page.page().last_saved_at().is_some());

        db.fail_save.store(true, Ordering::SeqCst);
        let err = page.save_settings().await.unwrap_err();
        assert_eq!(err, PageError::Store(StoreError::unavailable("save failed")));
        assert_eq!(page.page().phase(), PagePhase::Ready);
        assert_eq!(page.page().record().unwrap().log_lines().count(), 2);
        let stored = db.record.lock().unwrap().clone().unwrap();
        assert_eq!(stored.log_lines().count(), 2);
    }

    #[tokio::test]
    async fn save_on_older_page_keeps_visits_from_newer_page() {
        let db = Arc::new(MemoryDb::default());
        let mut first = controller(&db, 1);
        let mut second = controller(&db, 2);

        first.activate().await.unwrap();
        second.activate().await.unwrap();
        first.save_settings().await.unwrap();

        let stored = db.record.lock().unwrap().clone().unwrap();
        assert_eq!(stored.visit_count, 2);
        let lines = stored.log_lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("Initial settings record added."));
        assert!(lines[1].ends_with("Settings loaded."));
        assert!(lines[2].ends_with("Settings saved."));
        assert_eq!(first.page().record(), Some(&stored));

        second.save_settings().await.unwrap();
        let stored = db.record.lock().unwrap().clone().unwrap();
        assert_eq!(stored.visit_count, 2);
        assert_eq!(stored.log_lines().count(), 4);
    }

    #[tokio::test]
    async fn connections_are_held_only_while_an_event_runs() {
        let db = Arc::new(MemoryDb::default());
        let mut pages = Vec::new();

        for n in 1..=10u64 {
            let mut page = controller(&db, n);
            page.activate().await.unwrap();
            assert!(!page.has_connection());
            pages.push(page);
        }
        for page in &mut pages {
            page.save_settings().await.unwrap();
            assert!(!page.has_connection());
        }

        assert_eq!(db.open_connections.load(Ordering::SeqCst), 0);
        assert_eq!(db.peak_connections.load(Ordering::SeqCst), 1);
        let stored = db.record.lock().unwrap().clone().unwrap();
        assert_eq!(stored.visit_count, 10);
        assert_eq!(stored.log_lines().count(), 20);
    }

    #[tokio::test]
    async fn connect_failure_surfaces_storage_unavailable() {
        let db = Arc::new(MemoryDb::default());
        db.fail_connect.store(true, Ordering::SeqCst);
        let mut page = controller(&db, 1);

        let err = page.activate().await.unwrap_err();
        assert!(matches!(err, PageError::Store(ref e) if e.is_storage_unavailable()));
        assert_eq!(page.page().phase(), PagePhase::Uninitialized);
        assert!(page.page().record().is_none());
        assert!(!page.has_connection());
        assert_eq!(page.save_settings().await.unwrap_err(), PageError::NotReady);
    }

    #[tokio::test]
    async fn load_failure_keeps_page_uninitialized() {
        let db = Arc::new(MemoryDb::default());
        db.fail_load.store(true, Ordering::SeqCst);
        let mut page = controller(&db, 1);

        let err = page.activate().await.unwrap_err();
        assert_eq!(err, PageError::Store(StoreError::unavailable("load failed")));
        assert_eq!(page.page().phase(), PagePhase::Uninitialized);
        assert!(db.record.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn teardown_is_terminal() {
        let db = Arc::new(MemoryDb::default());
        let mut page = controller(&db, 1);
        page.activate().await.unwrap();

        page.teardown().await;
        assert_eq!(db.open_connections.load(Ordering::SeqCst), 0);
        assert!(page.page().is_disposed());
        assert_eq!(page.save_settings().await.unwrap_err(), PageError::Disposed);
        assert_eq!(page.activate().await.unwrap_err(), PageError::Disposed);
        assert_eq!(db.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn drop_releases_connection_held_by_an_event() {
        let db = Arc::new(MemoryDb::default());
        {
            let mut page = controller(&db, 1);
            page.acquire_connection().await.unwrap();
            assert_eq!(db.open_connections.load(Ordering::SeqCst), 1);
        }
        assert_eq!(db.open_connections.load(Ordering::SeqCst), 0);
    }
}
