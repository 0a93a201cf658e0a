use crate::catalog::ItemType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Sort orders the library endpoint understands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "addedAt:desc")]
    AddedDesc,
    #[serde(rename = "addedAt:asc")]
    AddedAsc,
    #[serde(rename = "titleSort:asc")]
    TitleAsc,
    #[serde(rename = "titleSort:desc")]
    TitleDesc,
    #[serde(rename = "year:desc")]
    YearDesc,
    #[serde(rename = "year:asc")]
    YearAsc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 6] = [
        SortOrder::AddedDesc,
        SortOrder::AddedAsc,
        SortOrder::TitleAsc,
        SortOrder::TitleDesc,
        SortOrder::YearDesc,
        SortOrder::YearAsc,
    ];

    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::AddedDesc => "addedAt:desc",
            SortOrder::AddedAsc => "addedAt:asc",
            SortOrder::TitleAsc => "titleSort:asc",
            SortOrder::TitleDesc => "titleSort:desc",
            SortOrder::YearDesc => "year:desc",
            SortOrder::YearAsc => "year:asc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::ALL
            .iter()
            .find(|order| order.as_param().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| {
                let valid: Vec<&str> = SortOrder::ALL.iter().map(|o| o.as_param()).collect();
                format!("Invalid sort order: {}. Use one of: {}", s, valid.join(", "))
            })
    }
}

/// Which pages an enumeration pass walks. Immutable for the duration of a pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuerySpec {
    pub section_id: String,
    pub item_type: ItemType,
    pub sort: SortOrder,
    /// Server-side year filter
    pub year: Option<String>,
    /// Client-side, case-insensitive title substring filter
    pub title_contains: Option<String>,
    pub page_size: u32,
}

impl QuerySpec {
    pub fn new(section_id: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            section_id: section_id.into(),
            item_type,
            sort: SortOrder::default(),
            year: None,
            title_contains: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_year(mut self, year: Option<String>) -> Self {
        self.year = year.filter(|y| !y.trim().is_empty());
        self
    }

    pub fn with_title_contains(mut self, needle: Option<String>) -> Self {
        self.title_contains = needle.filter(|t| !t.trim().is_empty());
        self
    }

    /// Filters sent to the server. Empty values are never sent.
    pub fn server_filters(&self) -> HashMap<String, String> {
        let mut filters = HashMap::new();
        if let Some(year) = self.year.as_deref().map(str::trim).filter(|y| !y.is_empty()) {
            filters.insert("year".to_string(), year.to_string());
        }
        filters
    }

    /// Lowercased title needle, if a title filter is configured.
    pub fn title_needle(&self) -> Option<String> {
        self.title_contains
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
    }
}
