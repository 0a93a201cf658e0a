//! In-memory catalog used by the unit tests.

use addedat_models::{CatalogItem, ItemType};
use addedat_sources::{CatalogClient, FetchRequest, ItemsPage, SourceError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::time::Instant;

#[derive(Default)]
pub struct FakeCatalog {
    pub items: Vec<CatalogItem>,
    /// Reported total instead of `items.len()`
    pub total_override: Option<u32>,
    pub fail_reads: bool,
    /// Ids whose every write fails
    pub always_failing: HashSet<String>,
    /// Ids whose first N writes fail
    pub flaky: Mutex<HashMap<String, usize>>,
    pub fetch_starts: Mutex<Vec<u32>>,
    pub writes: Mutex<Vec<Write>>,
}

#[derive(Debug, Clone)]
pub struct Write {
    pub rating_key: String,
    pub added_at: i64,
    pub lock: bool,
    pub at: Instant,
}

impl FakeCatalog {
    pub fn with_items(count: usize) -> Self {
        let items = (1..=count)
            .map(|i| CatalogItem::new(i.to_string(), format!("Title {}", i)))
            .collect();
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn from_items(items: Vec<CatalogItem>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn failing(mut self, id: &str) -> Self {
        self.always_failing.insert(id.to_string());
        self
    }

    pub fn flaky(self, id: &str, failures: usize) -> Self {
        self.flaky.lock().unwrap().insert(id.to_string(), failures);
        self
    }

    pub fn starts(&self) -> Vec<u32> {
        self.fetch_starts.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn writes_for(&self, id: &str) -> Vec<Write> {
        self.writes().into_iter().filter(|w| w.rating_key == id).collect()
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn fetch_items(&self, request: &FetchRequest) -> Result<ItemsPage, SourceError> {
        self.fetch_starts.lock().unwrap().push(request.start);
        if self.fail_reads {
            return Err(SourceError::Status {
                url: "http://fake/library/sections/1/all".to_string(),
                status: 500,
            });
        }

        let start = (request.start as usize).min(self.items.len());
        let end = (start + request.size as usize).min(self.items.len());
        Ok(ItemsPage {
            items: self.items[start..end].to_vec(),
            total: self.total_override.unwrap_or(self.items.len() as u32),
        })
    }

    async fn update_added_date(
        &self,
        _section_id: &str,
        rating_key: &str,
        _item_type: ItemType,
        added_at: i64,
        lock: bool,
    ) -> Result<(), SourceError> {
        self.writes.lock().unwrap().push(Write {
            rating_key: rating_key.to_string(),
            added_at,
            lock,
            at: Instant::now(),
        });

        if self.always_failing.contains(rating_key) {
            return Err(SourceError::remote(format!("HTTP 503 updating {}", rating_key)));
        }

        let mut flaky = self.flaky.lock().unwrap();
        if let Some(remaining) = flaky.get_mut(rating_key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SourceError::remote("HTTP 429 Too Many Requests"));
            }
        }
        Ok(())
    }
}
