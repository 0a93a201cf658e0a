use serde::{Deserialize, Serialize};

use crate::catalog::ItemType;

/// A library section (e.g. "Movies" or "TV Shows") on the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibrarySection {
    pub key: String,
    pub title: String,
    /// Plex section type: `movie`, `show`, `artist`, `photo`...
    pub kind: Option<String>,
}

impl LibrarySection {
    /// Whether this section holds items of the given type.
    pub fn holds(&self, item_type: ItemType) -> bool {
        self.kind.as_deref() == Some(item_type.as_str())
    }

    /// Label used in pickers: `Movies (#1)`.
    pub fn label(&self) -> String {
        format!("{} (#{})", self.title, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holds_matches_kind() {
        let section = LibrarySection {
            key: "3".to_string(),
            title: "Anime".to_string(),
            kind: Some("show".to_string()),
        };
        assert!(section.holds(ItemType::Show));
        assert!(!section.holds(ItemType::Movie));
        assert_eq!(section.label(), "Anime (#3)");
    }
}
