use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Opaque, stable identifier for a catalog item: the path (plus query, if
/// any) of its canonical URL on the source. Unique per source and identical
/// across repeated fetches of the same logical item.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(String);

impl EntryId {
    pub fn from_url(url: &Url) -> Self {
        let mut id = url.path().to_string();
        if let Some(query) = url.query() {
            id.push('?');
            id.push_str(query);
        }
        EntryId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rebuild the absolute URL for this id against the source base URL.
    pub fn to_url(&self, base: &Url) -> Option<Url> {
        base.join(&self.0).ok()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One item of a catalog listing. Immutable once yielded; owned by the caller.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub title: String,
    pub thumbnail_url: Option<String>,
}

/// Detail-page metadata for one entry. Recomputed per request, never cached.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EntryDetail {
    pub title: String,
    pub tags: Vec<String>,
}

/// The single virtual chapter of an entry.
///
/// The source domain has no native chapter concept, so exactly one of these
/// exists per entry, created on demand from the entry's detail page.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChapterRef {
    pub id: EntryId,
    pub display_label: String,
    pub published_at: Option<DateTime<Utc>>,
    pub url: Url,
}

/// One page image of a chapter. Indices are contiguous from 0 in the order
/// pages were discovered across sub-page walks.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub index: u32,
    pub image_url: String,
}

/// One fetched catalog page, as yielded by a walk.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListingPage {
    pub entries: Vec<CatalogEntry>,
    pub page: u32,
    pub has_more: bool,
}
