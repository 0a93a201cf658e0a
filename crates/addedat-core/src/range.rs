use addedat_models::QuerySpec;
use addedat_sources::CatalogClient;
use chrono::{Datelike, Duration, Local, NaiveDate, TimeZone};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::dates::{end_of_day, start_of_day};
use crate::enumerate::ResultEnumerator;
use crate::error::Result;
use crate::selection::SelectionStore;

/// Quick ranges relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePreset {
    Last7,
    Last30,
    Last90,
    Last365,
    ThisYear,
    OlderThanYear,
}

impl DatePreset {
    pub const ALL: [DatePreset; 6] = [
        DatePreset::Last7,
        DatePreset::Last30,
        DatePreset::Last90,
        DatePreset::Last365,
        DatePreset::ThisYear,
        DatePreset::OlderThanYear,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DatePreset::Last7 => "Last 7",
            DatePreset::Last30 => "Last 30",
            DatePreset::Last90 => "Last 90",
            DatePreset::Last365 => "Last 365",
            DatePreset::ThisYear => "This year",
            DatePreset::OlderThanYear => "Older than 1y",
        }
    }

    /// Inclusive `(from, to)` dates for this preset.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let days_back = |n: i64| today - Duration::days(n);
        match self {
            DatePreset::Last7 => (days_back(7), today),
            DatePreset::Last30 => (days_back(30), today),
            DatePreset::Last90 => (days_back(90), today),
            DatePreset::Last365 => (days_back(365), today),
            DatePreset::ThisYear => (today.with_ordinal(1).unwrap_or(today), today),
            DatePreset::OlderThanYear => (days_back(365 * 50), days_back(365)),
        }
    }
}

impl fmt::Display for DatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DatePreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "last7" | "7d" => Ok(DatePreset::Last7),
            "last30" | "30d" => Ok(DatePreset::Last30),
            "last90" | "90d" => Ok(DatePreset::Last90),
            "last365" | "365d" => Ok(DatePreset::Last365),
            "thisyear" | "ytd" => Ok(DatePreset::ThisYear),
            "olderthanyear" | "olderthan1y" | "older" => Ok(DatePreset::OlderThanYear),
            _ => Err(format!(
                "unknown preset '{}' (expected last7, last30, last90, last365, this-year or older-than-year)",
                s
            )),
        }
    }
}

/// Inclusive window of Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from_ts: i64,
    pub to_ts: i64,
}

impl DateRange {
    /// Start of `from` through 23:59:59 of `to`, both in `tz`.
    pub fn from_dates<Tz: TimeZone>(from: NaiveDate, to: NaiveDate, tz: &Tz) -> Result<Self> {
        Ok(Self {
            from_ts: start_of_day(from, tz)?,
            to_ts: end_of_day(to, tz)?,
        })
    }

    pub fn contains(&self, ts: i64) -> bool {
        self.from_ts <= ts && ts <= self.to_ts
    }
}

/// Bulk selection over every result of a query.
pub struct RangeSelector<'a, C: CatalogClient + ?Sized> {
    client: &'a C,
    query: QuerySpec,
}

impl<'a, C: CatalogClient + ?Sized> RangeSelector<'a, C> {
    pub fn new(client: &'a C, query: &QuerySpec) -> Self {
        Self {
            client,
            query: query.clone(),
        }
    }

    /// Set `select` on every result added between `from` and `to` (local time).
    pub async fn select_in_range<F>(
        &self,
        store: &mut SelectionStore,
        from: NaiveDate,
        to: NaiveDate,
        select: bool,
        on_progress: F,
    ) -> Result<usize>
    where
        F: FnMut(u8),
    {
        self.select_in_range_tz(store, from, to, &Local, select, on_progress).await
    }

    /// As `select_in_range`, with day boundaries taken in `tz`.
    ///
    /// Items without an added date count as the epoch. Returns how many items
    /// matched.
    pub async fn select_in_range_tz<Tz, F>(
        &self,
        store: &mut SelectionStore,
        from: NaiveDate,
        to: NaiveDate,
        tz: &Tz,
        select: bool,
        mut on_progress: F,
    ) -> Result<usize>
    where
        Tz: TimeZone,
        F: FnMut(u8),
    {
        let range = DateRange::from_dates(from, to, tz)?;
        let mut enumerator = ResultEnumerator::new(self.client, &self.query);
        let mut touched = 0;

        while let Some(page) = enumerator.next_page().await? {
            for item in page.items.iter().filter(|i| range.contains(i.added_at_or_epoch())) {
                store.set(&item.rating_key, select);
                touched += 1;
            }
            on_progress(enumerator.percent_complete());
        }
        on_progress(100);

        info!(
            "{} {} item(s) added between {} and {}",
            if select { "Selected" } else { "Cleared" },
            touched,
            from,
            to
        );
        Ok(touched)
    }

    /// Select a preset's range relative to `today`.
    pub async fn select_preset<F>(
        &self,
        store: &mut SelectionStore,
        preset: DatePreset,
        today: NaiveDate,
        on_progress: F,
    ) -> Result<usize>
    where
        F: FnMut(u8),
    {
        let (from, to) = preset.range(today);
        self.select_in_range(store, from, to, true, on_progress).await
    }

    /// Select every result. Returns the number selected and the last total
    /// reported by the server.
    pub async fn select_all_results<F>(&self, store: &mut SelectionStore, mut on_progress: F) -> Result<(usize, u32)>
    where
        F: FnMut(u8),
    {
        let mut enumerator = ResultEnumerator::new(self.client, &self.query);
        let mut selected = 0;

        while let Some(page) = enumerator.next_page().await? {
            for item in &page.items {
                store.select(&item.rating_key);
                selected += 1;
            }
            on_progress(enumerator.percent_complete());
        }
        on_progress(100);

        let total = enumerator.total().unwrap_or(0);
        info!("Selected {} of {} result(s)", selected, total);
        Ok((selected, total))
    }
}
