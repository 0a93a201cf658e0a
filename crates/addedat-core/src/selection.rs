use addedat_models::{ItemType, QuerySpec, SortOrder, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
struct Entry {
    selected: bool,
    /// Order in which the id was first recorded
    seq: u64,
}

/// Selected/cleared flags for one list, keyed by rating key.
///
/// An id stored as `false` counts as unselected but stays recorded, so a
/// caller can tell "explicitly cleared" apart from "never touched".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionStore {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, id: &str) {
        self.set(id, true);
    }

    pub fn deselect(&mut self, id: &str) {
        self.set(id, false);
    }

    /// Record `selected` for `id`; an id keeps its original position.
    pub fn set(&mut self, id: &str, selected: bool) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.selected = selected;
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(id.to_string(), Entry { selected, seq });
    }

    /// Forget every id.
    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
    }

    /// Mark each listed id that is already recorded as cleared.
    pub fn clear<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleared = 0;
        for id in ids {
            if let Some(entry) = self.entries.get_mut(id.as_ref()) {
                entry.selected = false;
                cleared += 1;
            }
        }
        cleared
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.entries.get(id).map(|e| e.selected).unwrap_or(false)
    }

    /// Whether `id` has been recorded at all, selected or cleared.
    pub fn is_recorded(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn count_selected(&self) -> usize {
        self.entries.values().filter(|e| e.selected).count()
    }

    /// Selected ids in the order they were first recorded.
    pub fn selected_ids(&self) -> Vec<String> {
        let mut selected: Vec<(&String, u64)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.selected)
            .map(|(id, e)| (id, e.seq))
            .collect();
        selected.sort_by_key(|(_, seq)| *seq);
        selected.into_iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the browser remembers about one list (movies or shows).
#[derive(Debug, Clone, PartialEq)]
pub struct ListState {
    pub item_type: ItemType,
    pub section_id: String,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
    pub sort: SortOrder,
    pub year_filter: String,
    pub title_filter: String,
    pub show_images: bool,
    pub lock_added: bool,
    pub selection: SelectionStore,
}

impl ListState {
    pub fn new(item_type: ItemType) -> Self {
        Self {
            item_type,
            section_id: item_type.default_section().to_string(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortOrder::default(),
            year_filter: String::new(),
            title_filter: String::new(),
            show_images: true,
            lock_added: true,
            selection: SelectionStore::new(),
        }
    }

    pub fn query_spec(&self) -> QuerySpec {
        QuerySpec::new(self.section_id.clone(), self.item_type)
            .with_page_size(self.page_size)
            .with_sort(self.sort)
            .with_year(Some(self.year_filter.clone()))
            .with_title_contains(Some(self.title_filter.clone()))
    }

    /// Container start for the current page. Saturates for page numbers
    /// past the addressable range.
    pub fn page_start(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Number of pages for `total` items; never less than one.
    pub fn total_pages(&self, total: u32) -> u32 {
        if self.page_size == 0 {
            return 1;
        }
        total.div_ceil(self.page_size).max(1)
    }

    pub fn next_page(&mut self, total: u32) {
        if self.page < self.total_pages(total) {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.page > 1 {
            self.page -= 1;
        }
    }

    /// Jump to `page`, clamped to `[1, total_pages]`.
    pub fn goto_page(&mut self, page: u32, total: u32) {
        self.page = page.clamp(1, self.total_pages(total));
    }

    pub fn reset_filters(&mut self) {
        self.year_filter.clear();
        self.title_filter.clear();
        self.sort = SortOrder::default();
        self.page = 1;
    }
}

/// Per-list state for one operator session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub movies: ListState,
    pub shows: ListState,
}

impl Session {
    pub fn new() -> Self {
        Self {
            movies: ListState::new(ItemType::Movie),
            shows: ListState::new(ItemType::Show),
        }
    }

    pub fn list(&self, item_type: ItemType) -> &ListState {
        match item_type {
            ItemType::Movie => &self.movies,
            ItemType::Show => &self.shows,
        }
    }

    pub fn list_mut(&mut self, item_type: ItemType) -> &mut ListState {
        match item_type {
            ItemType::Movie => &mut self.movies,
            ItemType::Show => &mut self.shows,
        }
    }

    pub fn reset_all(&mut self) {
        *self = Self::new();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
