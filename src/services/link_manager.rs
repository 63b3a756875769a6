use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::db::{ObjectStore, StorageError, StoreMode};
use crate::error::{AppError, AppResult};
use crate::events::{ErrorNotice, Event, EventBus, LoadingScope, Operation, SuccessNotice};
use crate::models::link::{self, Link, LinkPatch, NewLinkRecord};
use crate::services::favicon::FaviconStrategy;

pub const LINK_ADDED: &str = "Link added successfully.";
pub const LINK_UPDATED: &str = "Link updated successfully.";
pub const LINK_DELETED: &str = "Link deleted.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLink {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl NewLink {
    pub fn url(url: impl Into<String>) -> Self {
        NewLink {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Publishes `loading-ended` when dropped, so the bracket closes on every exit
/// path including cancellation.
struct LoadingGuard {
    bus: Arc<EventBus>,
    scope: LoadingScope,
}

impl LoadingGuard {
    fn start(bus: &Arc<EventBus>, operation: Operation, id: Option<i64>) -> Self {
        let scope = LoadingScope { operation, id };
        bus.publish(Event::LoadingStarted(scope));
        LoadingGuard {
            bus: bus.clone(),
            scope,
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.bus.publish(Event::LoadingEnded(self.scope));
    }
}

/// CRUD façade over the link store. Performs no rendering; every outcome is
/// announced on the event bus.
#[derive(Clone)]
pub struct LinkManager {
    store: Arc<ObjectStore>,
    bus: Arc<EventBus>,
    favicons: FaviconStrategy,
}

impl LinkManager {
    pub fn new(store: Arc<ObjectStore>, bus: Arc<EventBus>, favicons: FaviconStrategy) -> Self {
        LinkManager {
            store,
            bus,
            favicons,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn favicon_url(&self, url: &str) -> String {
        self.favicons.favicon_url(url)
    }

    fn fail<T>(&self, operation: Operation, err: AppError) -> AppResult<T> {
        self.bus.publish(Event::Error(ErrorNotice {
            operation,
            kind: err.kind(),
            message: err.to_string(),
        }));
        Err(err)
    }

    fn succeed(&self, operation: Operation, message: &'static str) {
        self.bus
            .publish(Event::Success(SuccessNotice { operation, message }));
    }

    pub async fn add(&self, input: NewLink) -> AppResult<Link> {
        let _loading = LoadingGuard::start(&self.bus, Operation::Add, None);
        match self.add_inner(input).await {
            Ok(link) => {
                info!(id = link.id, url = %link.url, "Link added");
                self.bus.publish(Event::Added(link.clone()));
                self.succeed(Operation::Add, LINK_ADDED);
                Ok(link)
            }
            Err(e) => self.fail(Operation::Add, e),
        }
    }

    async fn add_inner(&self, input: NewLink) -> AppResult<Link> {
        let url = link::validate_url(&input.url).ok_or(AppError::InvalidUrl)?;

        if self.find_by_url(&url).await?.is_some() {
            return Err(AppError::DuplicateLink);
        }

        let now = link::now();
        let record = NewLinkRecord {
            title: non_blank(input.title).unwrap_or_else(|| link::extract_domain(&url)),
            description: input.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            favicon: self.favicons.favicon_url(&url),
            is_favorite: input.is_favorite,
            created_at: now,
            updated_at: now,
            url,
        };

        let stored = record.clone();
        let id = self
            .store
            .with_store(StoreMode::ReadWrite, move |s| s.insert(&stored))
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent add of the same URL.
                StorageError::UniqueViolation(_) => AppError::DuplicateLink,
                other => AppError::from_storage(other, AppError::LinkAddFailed),
            })?;

        Ok(Link {
            id,
            url: record.url,
            title: record.title,
            description: record.description,
            favicon: record.favicon,
            is_favorite: record.is_favorite,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub async fn get_all(&self) -> AppResult<Vec<Link>> {
        let result = self
            .store
            .with_store(StoreMode::ReadOnly, |s| s.get_all())
            .await;
        match result {
            Ok(links) => {
                debug!(count = links.len(), "Loaded all links");
                self.bus.publish(Event::AllLoaded(links.clone()));
                Ok(links)
            }
            Err(e) => self.fail(
                Operation::LoadAll,
                AppError::from_storage(e, AppError::ListLoadFailed),
            ),
        }
    }

    /// Favorites in store order, found by scanning every record.
    pub async fn get_favorites(&self) -> AppResult<Vec<Link>> {
        let result = self
            .store
            .with_store(StoreMode::ReadOnly, |s| s.iterate_filtered(|l| l.is_favorite))
            .await;
        match result {
            Ok(links) => {
                debug!(count = links.len(), "Loaded favorite links");
                self.bus.publish(Event::FavoritesLoaded(links.clone()));
                Ok(links)
            }
            Err(e) => self.fail(
                Operation::LoadFavorites,
                AppError::from_storage(e, AppError::FavoritesLoadFailed),
            ),
        }
    }

    pub async fn update(&self, id: i64, patch: LinkPatch) -> AppResult<Link> {
        let _loading = LoadingGuard::start(&self.bus, Operation::Update, Some(id));
        self.update_announced(Operation::Update, id, patch).await
    }

    pub async fn toggle_favorite(&self, id: i64) -> AppResult<Link> {
        let _loading = LoadingGuard::start(&self.bus, Operation::ToggleFavorite, Some(id));
        let current = match self.get_by_id(id).await {
            Ok(link) => link,
            Err(e) => return self.fail(Operation::ToggleFavorite, e),
        };
        self.update_announced(
            Operation::ToggleFavorite,
            id,
            LinkPatch::favorite(!current.is_favorite),
        )
        .await
    }

    async fn update_announced(
        &self,
        operation: Operation,
        id: i64,
        patch: LinkPatch,
    ) -> AppResult<Link> {
        match self.update_inner(id, patch).await {
            Ok(link) => {
                info!(id, "Link updated");
                self.bus.publish(Event::Updated(link.clone()));
                self.succeed(operation, LINK_UPDATED);
                Ok(link)
            }
            Err(e) => self.fail(operation, e),
        }
    }

    async fn update_inner(&self, id: i64, patch: LinkPatch) -> AppResult<Link> {
        let existing = self.get_by_id(id).await?;
        let mut updated = existing.clone();

        if let Some(raw) = patch.url {
            let url = link::validate_url(&raw).ok_or(AppError::InvalidUrl)?;
            if url != existing.url {
                if self.find_by_url(&url).await?.is_some() {
                    return Err(AppError::DuplicateLink);
                }
                updated.favicon = self.favicons.favicon_url(&url);
                updated.url = url;
            }
        }
        if let Some(title) = patch.title {
            updated.title = non_blank(Some(title)).unwrap_or_else(|| link::extract_domain(&updated.url));
        }
        if let Some(description) = patch.description {
            updated.description = description.trim().to_string();
        }
        if let Some(is_favorite) = patch.is_favorite {
            updated.is_favorite = is_favorite;
        }
        updated.updated_at = link::next_timestamp(existing.updated_at);

        let stored = updated.clone();
        self.store
            .with_store(StoreMode::ReadWrite, move |s| s.put(&stored))
            .await
            .map_err(|e| match e {
                StorageError::UniqueViolation(_) => AppError::DuplicateLink,
                other => AppError::from_storage(other, AppError::LinkUpdateFailed),
            })?;

        Ok(updated)
    }

    /// Removes a link. Deleting an id that does not exist still succeeds.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let _loading = LoadingGuard::start(&self.bus, Operation::Delete, Some(id));
        let result = self
            .store
            .with_store(StoreMode::ReadWrite, move |s| s.delete(id))
            .await;
        match result {
            Ok(removed) => {
                info!(id, removed, "Link deleted");
                self.bus.publish(Event::Deleted { id });
                self.succeed(Operation::Delete, LINK_DELETED);
                Ok(())
            }
            Err(e) => self.fail(
                Operation::Delete,
                AppError::from_storage(e, AppError::LinkDeleteFailed),
            ),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Link> {
        self.store
            .with_store(StoreMode::ReadOnly, move |s| s.get(id))
            .await
            .map_err(|e| AppError::from_storage(e, AppError::Storage))?
            .ok_or(AppError::LinkNotFound)
    }

    pub async fn get_by_url(&self, url: &str) -> AppResult<Link> {
        self.find_by_url(url).await?.ok_or(AppError::LinkNotFound)
    }

    async fn find_by_url(&self, url: &str) -> AppResult<Option<Link>> {
        let url = url.to_string();
        self.store
            .with_store(StoreMode::ReadOnly, move |s| s.get_by_url(&url))
            .await
            .map_err(|e| AppError::from_storage(e, AppError::Storage))
    }

    pub async fn count(&self) -> AppResult<i64> {
        self.store
            .with_store(StoreMode::ReadOnly, |s| s.count())
            .await
            .map_err(|e| AppError::from_storage(e, AppError::Storage))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
