use super::{ConnectionArgs, Workspace};
use crate::output::{new_table, Output};
use addedat_core::{format_unix_date, ListState};
use addedat_models::{CatalogItem, ItemType, SortOrder};
use addedat_sources::{CatalogClient, FetchRequest, SourceError};
use clap::Args;
use color_eyre::Result;
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Args, Debug, Clone)]
pub struct ItemsArgs {
    /// Item type: movie, show, 1 or 2
    #[arg(long = "type", value_name = "TYPE", default_value = "movie")]
    pub item_type: ItemType,

    /// Library section id (defaults to the configured section for the type)
    #[arg(long, value_name = "ID")]
    pub section_id: Option<String>,

    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, value_name = "N")]
    pub page_size: Option<u32>,

    /// Sort order, e.g. addedAt:desc or titleSort:asc
    #[arg(long)]
    pub sort: Option<SortOrder>,

    /// Server-side year filter
    #[arg(long)]
    pub year: Option<String>,

    /// Case-insensitive title substring, applied to the fetched page
    #[arg(long, value_name = "TEXT")]
    pub title_contains: Option<String>,

    /// Show thumbnail URLs
    #[arg(long)]
    pub thumbs: bool,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl ItemsArgs {
    fn list_state(&self, ws: &Workspace) -> ListState {
        let mut list = ListState::new(self.item_type);
        list.section_id = ws.section_for(self.section_id.as_deref(), self.item_type);
        if let Some(size) = self.page_size.filter(|s| *s > 0) {
            list.page_size = size;
        }
        if let Some(sort) = self.sort {
            list.sort = sort;
        }
        list.year_filter = self.year.clone().unwrap_or_default();
        list.title_filter = self.title_contains.clone().unwrap_or_default();
        list.show_images = self.thumbs;
        list.page = self.page.max(1);
        list
    }
}

/// One page as shown to the operator.
#[derive(Debug, Clone)]
pub struct BrowsedPage {
    pub page: u32,
    pub total_pages: u32,
    pub total: u32,
    pub items: Vec<CatalogItem>,
}

/// Fetch the list's current page, clamping past-the-end pages to the last one.
pub async fn browse<C: CatalogClient + ?Sized>(client: &C, list: &mut ListState) -> Result<BrowsedPage, SourceError> {
    let query = list.query_spec();
    let mut page = client.fetch_items(&FetchRequest::for_query(&query, list.page_start())).await?;

    let last_page = list.total_pages(page.total);
    if list.page > last_page {
        tracing::debug!("Page {} is past the end, showing page {}", list.page, last_page);
        list.goto_page(list.page, page.total);
        page = client.fetch_items(&FetchRequest::for_query(&query, list.page_start())).await?;
    }

    let needle = query.title_needle();
    let items = page
        .items
        .into_iter()
        .filter(|item| needle.as_deref().map_or(true, |n| item.title.to_lowercase().contains(n)))
        .collect();

    Ok(BrowsedPage {
        page: list.page,
        total_pages: list.total_pages(page.total),
        total: page.total,
        items,
    })
}

pub async fn run_items(args: ItemsArgs, output: &Output) -> Result<()> {
    let ws = Workspace::load()?;
    let client = ws.connect(&args.connection)?;
    let mut list = args.list_state(&ws);
    list.selection = ws.selection_file(args.item_type).load();

    let page = browse(&client, &mut list).await?;

    if page.items.is_empty() {
        output.warn("No items on this page.");
    } else {
        let mut header = vec!["", "Key", "Title", "Added"];
        if list.show_images {
            header.push("Thumb");
        }
        let mut table = new_table(header);
        for item in &page.items {
            let marker = if list.selection.is_selected(&item.rating_key) { "●" } else { "" };
            let mut row = vec![
                marker.to_string(),
                item.rating_key.clone(),
                item.display_title(),
                item.added_at.map(format_unix_date).unwrap_or_else(|| "-".to_string()),
            ];
            if list.show_images {
                row.push(client.thumb_url(item.thumb.as_deref()).unwrap_or_default());
            }
            table.add_row(row);
        }
        output.table(&table);
    }

    if output.is_human() {
        let footer = format!(
            "Page {} of {} ({} total, {} selected)",
            page.page,
            page.total_pages,
            page.total,
            list.selection.count_selected()
        );
        output.println(footer.bright_black().to_string());
    }

    let items: Vec<_> = page
        .items
        .iter()
        .map(|item| {
            let thumb = if list.show_images { client.thumb_url(item.thumb.as_deref()) } else { None };
            json!({
                "rating_key": item.rating_key,
                "title": item.title,
                "year": item.year,
                "added_at": item.added_at,
                "added_date": item.added_at.map(format_unix_date),
                "selected": list.selection.is_selected(&item.rating_key),
                "thumb": thumb,
            })
        })
        .collect();
    output.json(&json!({
        "page": page.page,
        "total_pages": page.total_pages,
        "total": page.total,
        "items": items,
    }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::StubCatalog;

    fn catalog(n: usize) -> StubCatalog {
        StubCatalog::with_items(
            (1..=n)
                .map(|i| CatalogItem::new(i.to_string(), format!("Item {}", i)))
                .collect(),
        )
    }

    fn list(page: u32) -> ListState {
        let mut list = ListState::new(ItemType::Movie);
        list.page_size = 2;
        list.page = page;
        list
    }

    #[tokio::test]
    async fn test_browse_last_partial_page() {
        let catalog = catalog(5);
        let mut list = list(3);
        let page = browse(&catalog, &mut list).await.unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].rating_key, "5");
    }

    #[tokio::test]
    async fn test_browse_clamps_past_the_end() {
        let catalog = catalog(5);
        let mut list = list(9);
        let page = browse(&catalog, &mut list).await.unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(list.page, 3);
        assert_eq!(*catalog.reads.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_browse_huge_page_number_clamps() {
        let catalog = catalog(5);
        let mut list = list(50_000_000);
        list.page_size = 100;
        let page = browse(&catalog, &mut list).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 5);
    }

    #[tokio::test]
    async fn test_browse_filters_current_page_by_title() {
        let catalog = StubCatalog::with_items(vec![
            CatalogItem::new("1", "The Office"),
            CatalogItem::new("2", "Parks"),
        ]);
        let mut list = list(1);
        list.title_filter = "office".to_string();
        let page = browse(&catalog, &mut list).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_browse_empty_library_has_one_page() {
        let catalog = catalog(0);
        let mut list = list(1);
        let page = browse(&catalog, &mut list).await.unwrap();
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }
}
