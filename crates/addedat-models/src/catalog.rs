use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single library entry as returned by the catalog.
///
/// The catalog owns this data; nothing in the workspace mutates it except by
/// issuing an update through the catalog client and re-fetching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogItem {
    /// Plex `ratingKey`, stable across pages
    pub rating_key: String,
    pub title: String,
    pub year: Option<u32>,
    /// `addedAt` as Unix seconds
    pub added_at: Option<i64>,
    /// Relative or absolute poster path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,
    /// Release date as reported by Plex (`YYYY-MM-DD`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub originally_available_at: Option<String>,
}

impl CatalogItem {
    pub fn new(rating_key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            rating_key: rating_key.into(),
            title: title.into(),
            year: None,
            added_at: None,
            thumb: None,
            originally_available_at: None,
        }
    }

    pub fn with_added_at(mut self, added_at: i64) -> Self {
        self.added_at = Some(added_at);
        self
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = Some(year);
        self
    }

    /// Added date with a missing value treated as the epoch.
    pub fn added_at_or_epoch(&self) -> i64 {
        self.added_at.unwrap_or(0)
    }

    pub fn added_at_utc(&self) -> Option<DateTime<Utc>> {
        self.added_at.and_then(|ts| Utc.timestamp_opt(ts, 0).single())
    }

    /// "Title (Year)" when the year is known, otherwise just the title.
    pub fn display_title(&self) -> String {
        match self.year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Movie,
    Show,
}

impl ItemType {
    /// Numeric type id used by the Plex library endpoints.
    pub fn type_id(&self) -> &'static str {
        match self {
            ItemType::Movie => "1",
            ItemType::Show => "2",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Movie => "movie",
            ItemType::Show => "show",
        }
    }

    /// Section id used when nothing else is configured.
    pub fn default_section(&self) -> &'static str {
        self.type_id()
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid item type '{0}' (expected movie, show, 1 or 2)")]
pub struct ParseItemTypeError(pub String);

impl FromStr for ItemType {
    type Err = ParseItemTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "1" => Ok(ItemType::Movie),
            "show" | "2" => Ok(ItemType::Show),
            other => Err(ParseItemTypeError(other.to_string())),
        }
    }
}
