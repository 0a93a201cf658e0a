use addedat_models::{ItemType, LibrarySection};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::plex::api::PlexHttpClient;
use crate::traits::{CatalogClient, FetchRequest, ItemsPage};

/// Plex server exposed as a [`CatalogClient`], plus the section and thumbnail
/// helpers the browsing commands need.
pub struct PlexClient {
    api: PlexHttpClient,
}

impl PlexClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, SourceError> {
        let api = PlexHttpClient::new(base_url, token)?;
        info!("Using Plex server at {}", api.base_url());
        Ok(Self { api })
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url()
    }

    /// Library sections, optionally narrowed to those holding `item_type`.
    pub async fn list_sections(&self, item_type: Option<ItemType>) -> Result<Vec<LibrarySection>, SourceError> {
        let sections = self.api.get_sections().await?;
        debug!("Plex: {} library sections", sections.len());
        Ok(match item_type {
            Some(t) => sections.into_iter().filter(|s| s.holds(t)).collect(),
            None => sections,
        })
    }

    pub fn thumb_url(&self, path: Option<&str>) -> Option<String> {
        self.api.thumb_url(path)
    }
}

#[async_trait]
impl CatalogClient for PlexClient {
    async fn fetch_items(&self, request: &FetchRequest) -> Result<ItemsPage, SourceError> {
        self.api.get_items(request).await
    }

    async fn update_added_date(
        &self,
        section_id: &str,
        rating_key: &str,
        item_type: ItemType,
        added_at: i64,
        lock: bool,
    ) -> Result<(), SourceError> {
        self.api
            .put_added_date(section_id, rating_key, item_type, added_at, lock)
            .await
    }
}
