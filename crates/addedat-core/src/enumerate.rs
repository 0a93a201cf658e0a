use addedat_models::{CatalogItem, QuerySpec};
use addedat_sources::{CatalogClient, FetchRequest, SourceError};
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::HashSet;
use tracing::{debug, trace};

/// One fetched page after client-side filtering.
#[derive(Debug, Clone)]
pub struct EnumeratedPage {
    pub items: Vec<CatalogItem>,
    /// Container start this page was fetched at
    pub start: u32,
    /// Items the server returned before filtering
    pub fetched: usize,
    pub total: u32,
}

/// Walks every page of a query from offset zero.
///
/// The title filter is applied locally after each fetch and never sent to the
/// server. Ids already yielded in this pass are dropped. Walking stops once
/// `start >= total` or the server returns an empty page. Fetch errors are
/// returned to the caller as-is; reads are never retried here.
pub struct ResultEnumerator<'a, C: CatalogClient + ?Sized> {
    client: &'a C,
    query: QuerySpec,
    needle: Option<String>,
    start: u32,
    total: Option<u32>,
    seen: HashSet<String>,
    finished: bool,
}

/// Start a fresh pass over `query`.
pub fn enumerate_items<'a, C: CatalogClient + ?Sized>(client: &'a C, query: &QuerySpec) -> ResultEnumerator<'a, C> {
    ResultEnumerator::new(client, query)
}

impl<'a, C: CatalogClient + ?Sized> ResultEnumerator<'a, C> {
    pub fn new(client: &'a C, query: &QuerySpec) -> Self {
        Self {
            client,
            needle: query.title_needle(),
            query: query.clone(),
            start: 0,
            total: None,
            seen: HashSet::new(),
            finished: false,
        }
    }

    /// Server total from the most recent fetch.
    pub fn total(&self) -> Option<u32> {
        self.total
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Share of the result set walked so far, 0-100.
    pub fn percent_complete(&self) -> u8 {
        match self.total {
            Some(total) => {
                let pct = u64::from(self.start) * 100 / u64::from(total.max(1));
                pct.min(100) as u8
            }
            None => 0,
        }
    }

    pub async fn next_page(&mut self) -> Result<Option<EnumeratedPage>, SourceError> {
        if self.finished {
            return Ok(None);
        }
        if self.query.page_size == 0 {
            self.finished = true;
            return Ok(None);
        }

        let request = FetchRequest::for_query(&self.query, self.start);
        let page = self.client.fetch_items(&request).await?;
        self.total = Some(page.total);

        if page.items.is_empty() {
            debug!("Enumeration: empty page at start={}, stopping", self.start);
            self.finished = true;
            return Ok(None);
        }

        let fetched = page.items.len();
        let needle = self.needle.as_deref();
        let seen = &mut self.seen;
        let items: Vec<CatalogItem> = page
            .items
            .into_iter()
            .filter(|item| needle.map_or(true, |n| item.title.to_lowercase().contains(n)))
            .filter(|item| seen.insert(item.rating_key.clone()))
            .collect();

        trace!(
            "Enumeration: start={} fetched={} kept={} total={}",
            self.start,
            fetched,
            items.len(),
            page.total
        );

        let page_start = self.start;
        self.start = self.start.saturating_add(self.query.page_size);
        if self.start >= page.total {
            self.finished = true;
        }

        Ok(Some(EnumeratedPage {
            items,
            start: page_start,
            fetched,
            total: page.total,
        }))
    }

    /// Drain every page, reporting percent complete after each one and 100 at
    /// the end.
    pub async fn collect_all<F>(mut self, mut on_progress: F) -> Result<Vec<CatalogItem>, SourceError>
    where
        F: FnMut(u8),
    {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page.items);
            on_progress(self.percent_complete());
        }
        on_progress(100);
        debug!("Enumeration complete: {} matching items", all.len());
        Ok(all)
    }

    /// Lazy, flattened stream of matching items.
    pub fn into_stream(self) -> impl Stream<Item = Result<CatalogItem, SourceError>> + 'a {
        stream::try_unfold(self, |mut enumerator| async move {
            let page = enumerator.next_page().await?;
            Ok::<_, SourceError>(page.map(|p| (p.items, enumerator)))
        })
        .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, SourceError>)))
        .try_flatten()
    }
}
