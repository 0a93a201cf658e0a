pub mod batch;
pub mod dates;
pub mod enumerate;
pub mod error;
pub mod persist;
pub mod progress;
pub mod range;
pub mod selection;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{plan_jobs, BatchOptions, BatchUpdater, RetryPolicy};
pub use dates::{date_to_unix, format_unix_date, parse_date, today};
pub use enumerate::{enumerate_items, EnumeratedPage, ResultEnumerator};
pub use error::{CoreError, Result};
pub use persist::SelectionFile;
pub use progress::{ItemOutcome, ItemProgress, ProgressTracker};
pub use range::{DatePreset, DateRange, RangeSelector};
pub use selection::{ListState, SelectionStore, Session};
