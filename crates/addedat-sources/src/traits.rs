use addedat_models::{CatalogItem, ItemType, QuerySpec, SortOrder};
use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::SourceError;

/// One window of a library listing.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub section_id: String,
    pub item_type: ItemType,
    /// Container start (zero-based offset)
    pub start: u32,
    /// Container size (page length)
    pub size: u32,
    pub sort: SortOrder,
    /// Server-side filters; empty values are never sent
    pub filters: HashMap<String, String>,
}

impl FetchRequest {
    /// The page of `query` that begins at `start`.
    pub fn for_query(query: &QuerySpec, start: u32) -> Self {
        Self {
            section_id: query.section_id.clone(),
            item_type: query.item_type,
            start,
            size: query.page_size,
            sort: query.sort,
            filters: query.server_filters(),
        }
    }
}

/// Items of one page plus the server's total for the whole query.
#[derive(Debug, Clone, Default)]
pub struct ItemsPage {
    pub items: Vec<CatalogItem>,
    pub total: u32,
}

/// The remote catalog as seen by the selection and batch logic.
///
/// Reads must fail on transport or HTTP errors and must not fail on an empty
/// result. Writes fail on transport or HTTP errors.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch one page of items.
    async fn fetch_items(&self, request: &FetchRequest) -> Result<ItemsPage, SourceError>;

    /// Set an item's `addedAt`, optionally locking the field.
    async fn update_added_date(
        &self,
        section_id: &str,
        rating_key: &str,
        item_type: ItemType,
        added_at: i64,
        lock: bool,
    ) -> Result<(), SourceError>;
}
