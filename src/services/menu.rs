use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{MenuData, MenuResponse};
use crate::services::api::{read_json, ApiClient};
use crate::services::cache::{CacheStore, TtlCache};

/// Where menus come from when the cache cannot answer.
#[async_trait]
pub trait MenuSource: Send + Sync {
    async fn fetch_menu(&self, branch_id: &str) -> AppResult<MenuData>;
}

/// `GET menu/:branchId` against the cafe API.
#[derive(Debug, Clone)]
pub struct HttpMenuSource {
    api: ApiClient,
}

impl HttpMenuSource {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl MenuSource for HttpMenuSource {
    async fn fetch_menu(&self, branch_id: &str) -> AppResult<MenuData> {
        let url = self.api.endpoint(&["menu", branch_id])?;
        let response = self.api.send(self.api.http().get(url)).await?;
        let body: MenuResponse = read_json(response).await?;

        Ok(MenuData::from_response(branch_id, body))
    }
}

/// Per-branch menu lookups with a TTL cache in front of a `MenuSource`.
///
/// Failed fetches yield `MenuData::fallback` and are never cached. Two
/// concurrent lookups of the same stale branch both hit the source; the
/// later write wins.
pub struct MenuService {
    source: Arc<dyn MenuSource>,
    cache: Arc<dyn CacheStore<MenuData>>,
}

impl MenuService {
    pub fn new(source: Arc<dyn MenuSource>, cache: Arc<dyn CacheStore<MenuData>>) -> Self {
        Self { source, cache }
    }

    /// Service backed by an in-process `TtlCache`.
    pub fn with_ttl(source: Arc<dyn MenuSource>, ttl: Duration) -> Self {
        Self::new(source, Arc::new(TtlCache::new(ttl)))
    }

    pub async fn get_menu(&self, branch_id: &str) -> MenuData {
        if let Some(menu) = self.cache.get_fresh(branch_id).await {
            tracing::debug!("Menu cache hit for branch {}", branch_id);
            return menu;
        }

        tracing::debug!("Menu cache miss for branch {}, fetching", branch_id);
        match self.source.fetch_menu(branch_id).await {
            Ok(menu) => {
                self.cache.put(branch_id, menu.clone()).await;
                menu
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch menu for branch {}, using fallback: {}",
                    branch_id,
                    e
                );
                MenuData::fallback(branch_id)
            }
        }
    }

    pub async fn invalidate(&self, branch_id: &str) {
        self.cache.invalidate(branch_id).await;
    }

    pub async fn invalidate_all(&self) {
        self.cache.clear().await;
    }
}
