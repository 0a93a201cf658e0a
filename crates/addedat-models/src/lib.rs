pub mod catalog;
pub mod query;
pub mod section;
pub mod update;

pub use catalog::{CatalogItem, ItemType, ParseItemTypeError};
pub use query::{QuerySpec, SortOrder, DEFAULT_PAGE_SIZE};
pub use section::LibrarySection;
pub use update::{ItemFailure, OutcomeReport, RateBudget, UpdateJob};
