//! Domain Types
//!
//! Wire-level types for the remote bookmark API. List endpoints return
//! paginated envelopes shaped `{count, next, previous, results}`; entities
//! carry server-assigned integer ids. Optimistic placeholders created by the
//! cache layer use string ids instead, so the two can never collide.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Paginated list envelope returned by every collection endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    /// Total number of matching entities on the server
    pub count: i64,
    /// URL of the next page, when one exists
    #[serde(default)]
    pub next: Option<String>,
    /// URL of the previous page, when one exists
    #[serde(default)]
    pub previous: Option<String>,
    /// Entities on this page
    pub results: Vec<T>,
}

/// A stored bookmark
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub unread: bool,
    #[serde(default)]
    pub shared: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub tag_names: Vec<String>,
    /// Favicon path served through the same-origin asset proxy
    #[serde(default)]
    pub favicon_url: Option<String>,
    /// Preview image path served through the same-origin asset proxy
    #[serde(default)]
    pub preview_image_url: Option<String>,
    pub date_added: DateTime<Utc>,
    pub date_modified: DateTime<Utc>,
}

/// A saved bundle (folder) grouping bookmarks by a stored search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bundle {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub any_tags: String,
    #[serde(default)]
    pub all_tags: String,
    #[serde(default)]
    pub excluded_tags: String,
    #[serde(default)]
    pub order: i64,
}

/// A tag attached to bookmarks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub date_added: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_deserialization() {
        let payload = json!({
            "count": 2,
            "next": null,
            "previous": null,
            "results": [
                {"id": 1, "name": "rust", "date_added": "2025-01-01T00:00:00Z"},
                {"id": 2, "name": "sync", "date_added": "2025-01-02T00:00:00Z"}
            ]
        });
        let page: Page<Tag> = serde_json::from_value(payload).unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.results[0].name, "rust");
        assert!(page.next.is_none());
    }

    #[test]
    fn test_bookmark_defaults() {
        let payload = json!({
            "id": 7,
            "url": "https://example.com",
            "date_added": "2025-01-01T00:00:00Z",
            "date_modified": "2025-01-01T00:00:00Z"
        });
        let bookmark: Bookmark = serde_json::from_value(payload).unwrap();
        assert_eq!(bookmark.id, 7);
        assert!(bookmark.title.is_empty());
        assert!(bookmark.tag_names.is_empty());
        assert!(!bookmark.unread);
    }
}
