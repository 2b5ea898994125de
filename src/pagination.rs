//! Pagination state for listing and sub-page walks.

use std::collections::HashSet;

use serde::Deserialize;
use url::Url;

use crate::document::absolutize;
use crate::errors::RuleError;
use crate::rules::{Locator, PageCountRule};

/// URL pattern with `{page}` and `{query}` placeholders.
///
/// Some sources address their first page at a different URL than the rest
/// (e.g. `/` vs `/page/2`); `first_page` covers that.
#[derive(Debug, Clone, Deserialize)]
pub struct UrlTemplate {
    pub pattern: String,
    #[serde(default)]
    pub first_page: Option<String>,
}

impl UrlTemplate {
    /// Template without placeholders: every page resolves to the same URL.
    pub fn fixed(url: &str) -> Self {
        Self { pattern: url.to_string(), first_page: None }
    }

    pub fn new(pattern: &str) -> Self {
        Self { pattern: pattern.to_string(), first_page: None }
    }

    pub fn with_first_page(pattern: &str, first_page: &str) -> Self {
        Self { pattern: pattern.to_string(), first_page: Some(first_page.to_string()) }
    }

    pub fn expand(&self, page: u32, query: Option<&str>) -> Result<Url, RuleError> {
        let pattern = match (&self.first_page, page) {
            (Some(first), 0 | 1) => first,
            _ => &self.pattern,
        };
        let encoded_query = query
            .map(|q| url::form_urlencoded::byte_serialize(q.as_bytes()).collect::<String>())
            .unwrap_or_default();
        let expanded = pattern
            .replace("{page}", &page.to_string())
            .replace("{query}", &encoded_query);
        Url::parse(&expanded).map_err(|e| RuleError::InvalidTemplate {
            template: pattern.clone(),
            reason: e.to_string(),
        })
    }
}

/// How a link-driven walk computes the next request once the next-page
/// locator matched: re-expand the page template with page+1, or follow the
/// extracted href itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkAdvance {
    #[default]
    PageTemplate,
    Href,
}

/// Continuation strategy, selected per listing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PaginationMode {
    /// Continue while the next-page locator matches; a missing locator makes
    /// the walk single-page.
    Link {
        #[serde(default)]
        next_page: Option<Locator>,
        #[serde(default)]
        advance: LinkAdvance,
    },
    /// Read the page bound once from the first document, then iterate up to
    /// it via the page template. Bound defaults to 1.
    Count {
        #[serde(default)]
        max_pages: Option<PageCountRule>,
    },
}

impl PaginationMode {
    /// Single-page listing: link-driven with no locator to follow.
    pub fn single_page() -> Self {
        PaginationMode::Link { next_page: None, advance: LinkAdvance::PageTemplate }
    }
}

/// What one fetched document tells the cursor about continuation.
#[derive(Debug, Default)]
pub struct PageObservation {
    /// Value extracted by the next-page locator, if any.
    pub next_value: Option<String>,
    /// Page bound read by the count rule (first document only).
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Start,
    Fetching,
    Continue,
    Done,
    Aborted,
}

/// Per-walk pagination state.
///
/// Created fresh for every walk, advanced after each fetched document,
/// discarded when the walk completes or aborts. Nothing here is shared
/// between walks, so restarting a query is just a new cursor.
#[derive(Debug)]
pub struct PaginationCursor {
    template: UrlTemplate,
    mode: PaginationMode,
    query: Option<String>,
    state: CursorState,
    page: u32,
    bound: Option<u32>,
    next_url: Option<Url>,
    visited: HashSet<String>,
}

impl PaginationCursor {
    pub fn new(
        template: UrlTemplate,
        mode: PaginationMode,
        query: Option<String>,
        start_page: u32,
    ) -> Result<Self, RuleError> {
        let start_page = start_page.max(1);
        let first = template.expand(start_page, query.as_deref())?;
        Ok(Self {
            template,
            mode,
            query,
            state: CursorState::Start,
            page: start_page,
            bound: None,
            next_url: Some(first),
            visited: HashSet::new(),
        })
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Page number of the request currently (or about to be) in flight.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// The next request, when the walk has one.
    pub fn next_request(&self) -> Option<&Url> {
        self.next_url.as_ref()
    }

    /// Next-page locator of a link-driven cursor.
    pub fn next_locator(&self) -> Option<&Locator> {
        match &self.mode {
            PaginationMode::Link { next_page, .. } => next_page.as_ref(),
            PaginationMode::Count { .. } => None,
        }
    }

    /// Count rule, while the bound is still unknown.
    pub fn count_rule(&self) -> Option<&PageCountRule> {
        match (&self.mode, self.bound) {
            (PaginationMode::Count { max_pages }, None) => max_pages.as_ref(),
            _ => None,
        }
    }

    /// Claim the next request for fetching. `None` when the walk is over.
    pub fn begin_fetch(&mut self) -> Option<Url> {
        match self.state {
            CursorState::Start | CursorState::Continue => {
                let url = self.next_url.take()?;
                self.visited.insert(url.to_string());
                self.state = CursorState::Fetching;
                Some(url)
            }
            _ => None,
        }
    }

    /// Feed back what the fetched document said; decides Continue vs Done.
    pub fn observe(&mut self, current_url: &Url, obs: &PageObservation) {
        match &self.mode {
            PaginationMode::Count { .. } => {
                if self.bound.is_none() {
                    self.bound = Some(obs.max_pages.unwrap_or(1));
                }
                let bound = self.bound.unwrap_or(1);
                if self.page < bound {
                    self.page += 1;
                    match self.template.expand(self.page, self.query.as_deref()) {
                        Ok(url) => {
                            self.next_url = Some(url);
                            self.state = CursorState::Continue;
                        }
                        Err(e) => {
                            log::warn!("stopping walk, cannot build page {}: {}", self.page, e);
                            self.state = CursorState::Done;
                        }
                    }
                } else {
                    self.state = CursorState::Done;
                }
            }
            PaginationMode::Link { advance, .. } => {
                let Some(next_value) = obs.next_value.as_deref() else {
                    self.state = CursorState::Done;
                    return;
                };
                let next = match advance {
                    LinkAdvance::PageTemplate => {
                        self.template.expand(self.page + 1, self.query.as_deref())
                    }
                    LinkAdvance::Href => absolutize(current_url, next_value)
                        .map_err(|e| RuleError::Config(e.to_string())),
                };
                match next {
                    Ok(url) if self.visited.contains(url.as_str()) => {
                        // A next link pointing back at an already-fetched page
                        // would loop forever; truncate the walk instead. The
                        // pages yielded so far stay valid.
                        log::warn!("next-page link cycles back to {}, stopping walk", url);
                        self.state = CursorState::Done;
                    }
                    Ok(url) => {
                        self.page += 1;
                        self.next_url = Some(url);
                        self.state = CursorState::Continue;
                    }
                    Err(e) => {
                        log::warn!("stopping walk, bad next-page link: {}", e);
                        self.state = CursorState::Done;
                    }
                }
            }
        }
    }

    pub fn abort(&mut self) {
        self.state = CursorState::Aborted;
        self.next_url = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_template_expansion() {
        let t = UrlTemplate::new("https://site.example/page/{page}/?s={query}");
        let u = t.expand(3, Some("blue sky")).unwrap();
        assert_eq!(u.as_str(), "https://site.example/page/3/?s=blue+sky");
    }

    #[test]
    fn test_template_first_page_override() {
        let t = UrlTemplate::with_first_page("https://site.example/page/{page}", "https://site.example/");
        assert_eq!(t.expand(1, None).unwrap().as_str(), "https://site.example/");
        assert_eq!(t.expand(2, None).unwrap().as_str(), "https://site.example/page/2");
    }

    #[test]
    fn test_count_driven_iterates_to_bound() {
        let t = UrlTemplate::new("https://site.example/?p={page}");
        let mut cursor =
            PaginationCursor::new(t, PaginationMode::Count { max_pages: None }, None, 1).unwrap();

        let first = cursor.begin_fetch().unwrap();
        assert_eq!(first.as_str(), "https://site.example/?p=1");
        cursor.observe(&first, &PageObservation { next_value: None, max_pages: Some(3) });
        assert_eq!(cursor.state(), CursorState::Continue);

        let second = cursor.begin_fetch().unwrap();
        assert_eq!(second.as_str(), "https://site.example/?p=2");
        cursor.observe(&second, &PageObservation::default());

        let third = cursor.begin_fetch().unwrap();
        assert_eq!(third.as_str(), "https://site.example/?p=3");
        cursor.observe(&third, &PageObservation::default());

        assert_eq!(cursor.state(), CursorState::Done);
        assert!(cursor.begin_fetch().is_none());
    }

    #[test]
    fn test_count_bound_defaults_to_one() {
        let t = UrlTemplate::new("https://site.example/?p={page}");
        let mut cursor =
            PaginationCursor::new(t, PaginationMode::Count { max_pages: None }, None, 1).unwrap();
        let first = cursor.begin_fetch().unwrap();
        cursor.observe(&first, &PageObservation::default());
        assert_eq!(cursor.state(), CursorState::Done);
    }

    #[test]
    fn test_link_driven_template_advance() {
        let t = UrlTemplate::new("https://site.example/page/{page}");
        let mode = PaginationMode::Link { next_page: None, advance: LinkAdvance::PageTemplate };
        let mut cursor = PaginationCursor::new(t, mode, None, 1).unwrap();

        let first = cursor.begin_fetch().unwrap();
        cursor.observe(
            &first,
            &PageObservation { next_value: Some("2".into()), max_pages: None },
        );
        assert_eq!(cursor.state(), CursorState::Continue);
        assert_eq!(cursor.next_request().unwrap().as_str(), "https://site.example/page/2");

        let second = cursor.begin_fetch().unwrap();
        cursor.observe(&second, &PageObservation::default());
        assert_eq!(cursor.state(), CursorState::Done);
    }

    #[test]
    fn test_link_driven_href_advance() {
        let t = UrlTemplate::fixed("https://site.example/tag/cosplay/");
        let mode = PaginationMode::Link { next_page: None, advance: LinkAdvance::Href };
        let mut cursor = PaginationCursor::new(t, mode, None, 1).unwrap();

        let first = cursor.begin_fetch().unwrap();
        cursor.observe(
            &first,
            &PageObservation { next_value: Some("/tag/cosplay/page/2/".into()), max_pages: None },
        );
        assert_eq!(
            cursor.next_request().unwrap().as_str(),
            "https://site.example/tag/cosplay/page/2/"
        );
    }

    #[test]
    fn test_self_link_cycle_truncates() {
        let t = UrlTemplate::fixed("https://site.example/tag/cosplay/");
        let mode = PaginationMode::Link { next_page: None, advance: LinkAdvance::Href };
        let mut cursor = PaginationCursor::new(t, mode, None, 1).unwrap();

        let first = cursor.begin_fetch().unwrap();
        // The page links back to itself; the walk must end, not loop.
        cursor.observe(
            &first,
            &PageObservation { next_value: Some("https://site.example/tag/cosplay/".into()), max_pages: None },
        );
        assert_eq!(cursor.state(), CursorState::Done);
        assert!(cursor.begin_fetch().is_none());
    }

    #[test]
    fn test_abort_ends_walk() {
        let t = UrlTemplate::new("https://site.example/?p={page}");
        let mut cursor =
            PaginationCursor::new(t, PaginationMode::Count { max_pages: None }, None, 1).unwrap();
        cursor.begin_fetch().unwrap();
        cursor.abort();
        assert_eq!(cursor.state(), CursorState::Aborted);
        assert!(cursor.begin_fetch().is_none());
    }

    #[test]
    fn test_start_page_below_one_clamps() {
        let t = UrlTemplate::new("https://site.example/?p={page}");
        let cursor =
            PaginationCursor::new(t, PaginationMode::Count { max_pages: None }, None, 0).unwrap();
        assert_eq!(cursor.page(), 1);
    }
}
