use addedat_models::{CatalogItem, ItemType, LibrarySection};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::SourceError;
use crate::traits::{FetchRequest, ItemsPage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin HTTP wrapper around the Plex Media Server library endpoints.
pub struct PlexHttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl PlexHttpClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, SourceError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() || token.trim().is_empty() {
            return Err(SourceError::MissingCredentials);
        }

        let client = Client::builder()
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-token"),
                    reqwest::header::HeaderValue::from_str(token)
                        .map_err(|_| SourceError::InvalidHeader("X-Plex-Token".to_string()))?,
                );
                headers.insert(
                    reqwest::header::HeaderName::from_static("x-plex-client-identifier"),
                    reqwest::header::HeaderValue::from_static("addedat-cli"),
                );
                headers
            })
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Http {
                url: base_url.clone(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url,
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn section_url(&self, section_id: &str) -> String {
        format!("{}/library/sections/{}/all", self.base_url, section_id)
    }

    pub async fn get_items(&self, request: &FetchRequest) -> Result<ItemsPage, SourceError> {
        let url = self.section_url(&request.section_id);
        let mut params: Vec<(String, String)> = vec![
            ("type".to_string(), request.item_type.type_id().to_string()),
            ("sort".to_string(), request.sort.as_param().to_string()),
            ("X-Plex-Container-Start".to_string(), request.start.to_string()),
            ("X-Plex-Container-Size".to_string(), request.size.to_string()),
        ];
        for (key, value) in &request.filters {
            if !value.is_empty() {
                params.push((key.clone(), value.clone()));
            }
        }

        debug!(
            "Plex get_items: section={} type={} start={} size={} sort={}",
            request.section_id, request.item_type, request.start, request.size, request.sort
        );
        let json = self.get_json(&url, &params).await?;
        let page = parse_items_page(&json);
        trace!("Plex get_items: {} items, total {}", page.items.len(), page.total);
        Ok(page)
    }

    pub async fn put_added_date(
        &self,
        section_id: &str,
        rating_key: &str,
        item_type: ItemType,
        added_at: i64,
        lock: bool,
    ) -> Result<(), SourceError> {
        let url = self.section_url(section_id);
        let mut params: Vec<(&str, String)> = vec![
            ("type", item_type.type_id().to_string()),
            ("id", rating_key.to_string()),
            ("addedAt.value", added_at.to_string()),
        ];
        if lock {
            params.push(("addedAt.locked", "1".to_string()));
        }

        let response = self
            .client
            .put(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::Http {
                url: url.clone(),
                source: e,
            })?;

        if response.status().is_success() {
            debug!("Plex put_added_date: id={} addedAt={} lock={}", rating_key, added_at, lock);
            Ok(())
        } else {
            Err(SourceError::Status {
                url,
                status: response.status().as_u16(),
            })
        }
    }

    pub async fn get_sections(&self) -> Result<Vec<LibrarySection>, SourceError> {
        let url = format!("{}/library/sections", self.base_url);
        let json = self.get_json(&url, &[] as &[(String, String)]).await?;
        Ok(parse_sections(&json))
    }

    /// Absolute, tokenized image URL for a Plex thumb path.
    pub fn thumb_url(&self, path: Option<&str>) -> Option<String> {
        let path = path.filter(|p| !p.is_empty())?;
        let token = urlencoding::encode(&self.token);
        if path.starts_with("http://") || path.starts_with("https://") {
            let joiner = if path.contains('?') { '&' } else { '?' };
            return Some(format!("{}{}X-Plex-Token={}", path, joiner, token));
        }
        Some(format!("{}{}?X-Plex-Token={}", self.base_url, path, token))
    }

    async fn get_json<P: serde::Serialize + ?Sized>(&self, url: &str, params: &P) -> Result<Value, SourceError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| SourceError::Http {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Value>().await.map_err(|e| SourceError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Parse a `MediaContainer` listing. `totalSize` wins, then `size`, then the
/// number of items actually returned.
pub fn parse_items_page(json: &Value) -> ItemsPage {
    let container = json.get("MediaContainer").unwrap_or(&Value::Null);
    let items: Vec<CatalogItem> = container
        .get("Metadata")
        .and_then(|m| m.as_array())
        .map(|arr| arr.iter().filter_map(parse_catalog_item).collect())
        .unwrap_or_default();

    let total = container
        .get("totalSize")
        .and_then(value_as_u32)
        .or_else(|| container.get("size").and_then(value_as_u32))
        .unwrap_or_else(|| u32::try_from(items.len()).unwrap_or(u32::MAX));

    ItemsPage { items, total }
}

/// Items without a `ratingKey` cannot be targeted and are skipped.
pub fn parse_catalog_item(item: &Value) -> Option<CatalogItem> {
    let rating_key = value_as_key(item.get("ratingKey")?)?;
    let title = item
        .get("title")
        .and_then(|t| t.as_str())
        .unwrap_or("Unknown")
        .to_string();

    Some(CatalogItem {
        rating_key,
        title,
        year: item.get("year").and_then(value_as_u32),
        added_at: item.get("addedAt").and_then(value_as_i64),
        thumb: item.get("thumb").and_then(|t| t.as_str()).map(str::to_string),
        originally_available_at: item
            .get("originallyAvailableAt")
            .and_then(|d| d.as_str())
            .map(str::to_string),
    })
}

pub fn parse_sections(json: &Value) -> Vec<LibrarySection> {
    let directories = json
        .get("MediaContainer")
        .and_then(|c| c.get("Directory"))
        .and_then(|d| d.as_array());

    let Some(directories) = directories else {
        return Vec::new();
    };

    directories
        .iter()
        .filter_map(|dir| {
            let key = value_as_key(dir.get("key")?)?;
            let title = dir
                .get("title")
                .and_then(|t| t.as_str())
                .or_else(|| dir.get("title1").and_then(|t| t.as_str()))
                .unwrap_or("Section")
                .to_string();
            let kind = dir.get("type").and_then(|t| t.as_str()).map(str::to_string);
            Some(LibrarySection { key, title, kind })
        })
        .collect()
}

// Plex emits ids and counters as strings or numbers depending on version.
fn value_as_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Out-of-range counters are treated as missing.
fn value_as_u32(value: &Value) -> Option<u32> {
    value_as_u64(value).and_then(|n| u32::try_from(n).ok())
}

fn value_as_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_items_page_uses_total_size() {
        let json = json!({
            "MediaContainer": {
                "size": 2,
                "totalSize": 250,
                "Metadata": [
                    {"ratingKey": "101", "title": "Heat", "year": 1995, "addedAt": 1700000000, "thumb": "/library/metadata/101/thumb/1"},
                    {"ratingKey": 102, "title": "Ronin", "originallyAvailableAt": "1998-09-25"}
                ]
            }
        });

        let page = parse_items_page(&json);
        assert_eq!(page.total, 250);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].rating_key, "101");
        assert_eq!(page.items[0].added_at, Some(1_700_000_000));
        assert_eq!(page.items[0].year, Some(1995));
        assert_eq!(page.items[1].rating_key, "102");
        assert_eq!(page.items[1].added_at, None);
        assert_eq!(page.items[1].originally_available_at.as_deref(), Some("1998-09-25"));
    }

    #[test]
    fn test_parse_items_page_total_fallbacks() {
        let json = json!({"MediaContainer": {"size": 7, "Metadata": [{"ratingKey": "1", "title": "A"}]}});
        assert_eq!(parse_items_page(&json).total, 7);

        let json = json!({"MediaContainer": {"Metadata": [{"ratingKey": "1", "title": "A"}, {"ratingKey": "2", "title": "B"}]}});
        assert_eq!(parse_items_page(&json).total, 2);
    }

    #[test]
    fn test_oversized_counters_are_not_truncated() {
        let page = parse_items_page(&json!({
            "MediaContainer": {
                "totalSize": 4_294_967_296u64,
                "size": 2,
                "Metadata": [
                    {"ratingKey": "1", "title": "A", "year": 4_294_967_297u64},
                    {"ratingKey": "2", "title": "B", "year": 1999}
                ]
            }
        }));
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].year, None);
        assert_eq!(page.items[1].year, Some(1999));
    }

    #[test]
    fn test_parse_items_page_empty_is_not_an_error() {
        let page = parse_items_page(&json!({"MediaContainer": {"size": 0}}));
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);

        let page = parse_items_page(&json!({}));
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_items_without_rating_key_are_skipped() {
        let json = json!({"MediaContainer": {"totalSize": 2, "Metadata": [{"title": "No key"}, {"ratingKey": "5", "title": "Keyed"}]}});
        let page = parse_items_page(&json);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].rating_key, "5");
    }

    #[test]
    fn test_parse_sections_normalizes_fields() {
        let json = json!({
            "MediaContainer": {
                "Directory": [
                    {"key": "1", "title": "Movies", "type": "movie"},
                    {"key": 2, "title1": "TV", "type": "show"},
                    {"key": "3", "type": "artist"}
                ]
            }
        });
        let sections = parse_sections(&json);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, "Movies");
        assert_eq!(sections[1].key, "2");
        assert_eq!(sections[1].title, "TV");
        assert_eq!(sections[2].title, "Section");
        assert_eq!(sections[2].kind.as_deref(), Some("artist"));
    }

    #[test]
    fn test_thumb_url() {
        let client = PlexHttpClient::new("http://plex.local:32400/", "tok").unwrap();
        assert_eq!(client.base_url(), "http://plex.local:32400");
        assert_eq!(client.thumb_url(None), None);
        assert_eq!(client.thumb_url(Some("")), None);
        assert_eq!(
            client.thumb_url(Some("/library/metadata/1/thumb/2")).as_deref(),
            Some("http://plex.local:32400/library/metadata/1/thumb/2?X-Plex-Token=tok")
        );
        assert_eq!(
            client.thumb_url(Some("https://img.example/a.jpg?w=1")).as_deref(),
            Some("https://img.example/a.jpg?w=1&X-Plex-Token=tok")
        );
        assert_eq!(
            client.thumb_url(Some("https://img.example/a.jpg")).as_deref(),
            Some("https://img.example/a.jpg?X-Plex-Token=tok")
        );
    }

    #[test]
    fn test_new_requires_credentials() {
        assert!(matches!(PlexHttpClient::new("", "tok"), Err(SourceError::MissingCredentials)));
        assert!(matches!(PlexHttpClient::new("http://x", " "), Err(SourceError::MissingCredentials)));
    }
}
