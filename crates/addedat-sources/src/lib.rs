pub mod error;
pub mod plex;
pub mod traits;

pub use error::SourceError;
pub use plex::{PlexClient, PlexHttpClient};
pub use traits::{CatalogClient, FetchRequest, ItemsPage};
