use crate::controller::PageController;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use visitlog_domain::SettingsStoreFactory;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct PageId(pub u64);

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type SharedPage = Arc<Mutex<PageController>>;

pub const DEFAULT_PAGE_CAPACITY: usize = 64;

/// Live settings page instances. Each entry serializes its own events.
///
/// Pages that are never closed are evicted oldest first once `capacity` is
/// reached.
#[derive(Clone)]
pub struct PageRegistry {
    factory: Arc<dyn SettingsStoreFactory>,
    capacity: usize,
    inner: Arc<Mutex<RegistryInner>>,
}

struct RegistryInner {
    next_id: u64,
    pages: BTreeMap<PageId, SharedPage>,
}

impl PageRegistry {
    pub fn new(factory: Arc<dyn SettingsStoreFactory>) -> Self {
        Self::with_capacity(factory, DEFAULT_PAGE_CAPACITY)
    }

    pub fn with_capacity(factory: Arc<dyn SettingsStoreFactory>, capacity: usize) -> Self {
        Self {
            factory,
            capacity: capacity.max(1),
            inner: Arc::new(Mutex::new(RegistryInner {
                next_id: 1,
                pages: BTreeMap::new(),
            })),
        }
    }

    pub async fn open_page(&self) -> (PageId, SharedPage) {
        let mut inner = self.inner.lock().await;
        let id = PageId(inner.next_id);
        inner.next_id = inner.next_id.saturating_add(1);

        while inner.pages.len() >= self.capacity {
            let Some((evicted, _)) = inner.pages.pop_first() else {
                break;
            };
            tracing::debug!(page_id = %evicted, "evicted settings page");
        }

        let page = Arc::new(Mutex::new(PageController::new(id, self.factory.clone())));
        inner.pages.insert(id, page.clone());
        (id, page)
    }

    pub async fn get(&self, id: PageId) -> Option<SharedPage> {
        self.inner.lock().await.pages.get(&id).cloned()
    }

    pub async fn remove(&self, id: PageId) -> Option<SharedPage> {
        self.inner.lock().await.pages.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.pages.len()
    }

    /// Removes the page and tears it down, releasing its connection.
    pub async fn close(&self, id: PageId) -> bool {
        let Some(page) = self.remove(id).await else {
            return false;
        };
        page.lock().await.teardown().await;
        tracing::info!(page_id = %id, "settings page closed");
        true
    }
}
