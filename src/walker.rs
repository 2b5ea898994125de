use std::collections::HashSet;
use std::sync::Arc;

use reqwest::header::HeaderMap;
use url::Url;

use crate::cancel::CancelToken;
use crate::config::{ListingEndpoint, SourceConfig};
use crate::errors::EngineError;
use crate::fetcher::DocumentFetcher;
use crate::filters::FilterModel;
use crate::models::{CatalogEntry, EntryId, ListingPage};
use crate::pagination::{
    CursorState, LinkAdvance, PageObservation, PaginationCursor, PaginationMode, UrlTemplate,
};

/// Drives catalog listings: browse, search and latest walks over one source.
///
/// Cheap to construct; all state lives in the [`Walk`] values it hands out.
pub struct CatalogWalker<F> {
    config: Arc<SourceConfig>,
    fetcher: Arc<F>,
}

impl<F: DocumentFetcher> CatalogWalker<F> {
    pub fn new(config: Arc<SourceConfig>, fetcher: Arc<F>) -> Self {
        Self { config, fetcher }
    }

    /// Walk the browse listing, starting at `page`.
    pub fn browse(&self, page: u32) -> Result<Walk<F>, EngineError> {
        self.start(&self.config.browse, None, page, "browse".to_string())
    }

    /// Walk the latest-updates listing, starting at `page`.
    ///
    /// Fails fast when the source defines no latest endpoint; no request is
    /// issued in that case.
    pub fn latest(&self, page: u32) -> Result<Walk<F>, EngineError> {
        match self.config.latest.as_ref() {
            Some(endpoint) => self.start(endpoint, None, page, "latest".to_string()),
            None => Err(EngineError::UnsupportedOperation("latest")),
        }
    }

    /// Walk search results for `query`, starting at `page`.
    ///
    /// A non-default filter selection overrides the query entirely: the walk
    /// targets the option's fixed URL and the keyword never reaches the
    /// request. This precedence is a hard rule of the request model.
    pub fn search(
        &self,
        query: &str,
        filters: &FilterModel,
        page: u32,
    ) -> Result<Walk<F>, EngineError> {
        let endpoint = self
            .config
            .search
            .clone()
            .ok_or(EngineError::UnsupportedOperation("search"))?;

        if filters.is_overriding_query() {
            let option = filters.selected();
            let target = option.target_url.as_deref().ok_or(EngineError::InvalidFilterIndex {
                index: filters.selected_index(),
                len: filters.options().len(),
            })?;
            // Option targets are fixed URLs with no page placeholder, so the
            // walk follows the listing's own next links instead.
            let next_page = match endpoint.pagination {
                PaginationMode::Link { next_page, .. } => next_page,
                PaginationMode::Count { .. } => None,
            };
            let mode = PaginationMode::Link { next_page, advance: LinkAdvance::Href };
            let cursor = PaginationCursor::new(UrlTemplate::fixed(target), mode, None, 1)?;
            return Ok(self.walk_with_cursor(cursor, format!("filter \"{}\"", option.display_name)));
        }

        let cursor = PaginationCursor::new(
            endpoint.url,
            endpoint.pagination,
            Some(query.to_string()),
            page,
        )?;
        Ok(self.walk_with_cursor(cursor, format!("search \"{}\"", query)))
    }

    /// The source's filter catalog, ready for selection.
    pub fn filter_model(&self) -> FilterModel {
        FilterModel::new(self.config.filters.clone())
    }

    fn start(
        &self,
        endpoint: &ListingEndpoint,
        query: Option<String>,
        page: u32,
        desc: String,
    ) -> Result<Walk<F>, EngineError> {
        let cursor =
            PaginationCursor::new(endpoint.url.clone(), endpoint.pagination.clone(), query, page)?;
        Ok(self.walk_with_cursor(cursor, desc))
    }

    fn walk_with_cursor(&self, cursor: PaginationCursor, desc: String) -> Walk<F> {
        Walk {
            config: self.config.clone(),
            fetcher: self.fetcher.clone(),
            headers: self.config.request_headers(),
            cursor,
            seen: HashSet::new(),
            cancel: None,
            desc,
        }
    }
}

/// A lazy, finite, non-restartable walk over one catalog listing.
///
/// Each call to [`next_page`](Walk::next_page) performs at most one fetch.
/// Entries are deduplicated by id across the whole walk and come back in
/// ascending page order, document order within a page. Walks are
/// prefix-safe: pages yielded before a failure stay valid.
#[derive(Debug)]
pub struct Walk<F> {
    config: Arc<SourceConfig>,
    fetcher: Arc<F>,
    headers: HeaderMap,
    cursor: PaginationCursor,
    seen: HashSet<EntryId>,
    cancel: Option<CancelToken>,
    desc: String,
}

impl<F: DocumentFetcher> Walk<F> {
    /// Attach a cancellation token, checked before each fetch.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn state(&self) -> CursorState {
        self.cursor.state()
    }

    /// The request the next `next_page` call would issue.
    pub fn next_request(&self) -> Option<&Url> {
        self.cursor.next_request()
    }

    /// Fetch and extract the next listing page. `Ok(None)` once the walk is
    /// done. A malformed individual item is skipped with a warning; only
    /// fetch failures abort the walk.
    pub async fn next_page(&mut self) -> Result<Option<ListingPage>, EngineError> {
        if self.check_cancelled() {
            self.cursor.abort();
            return Err(EngineError::Cancelled);
        }
        let url = match self.cursor.begin_fetch() {
            Some(url) => url,
            None => return Ok(None),
        };
        let page_no = self.cursor.page();

        let doc = match self.fetcher.fetch(&url, &self.headers).await {
            Ok(doc) => doc,
            Err(e) => {
                self.cursor.abort();
                return Err(EngineError::Fetch { page: page_no, walk: self.desc.clone(), source: e });
            }
        };
        if self.check_cancelled() {
            // Cancellation arrived while the fetch was in flight; the result
            // is discarded.
            self.cursor.abort();
            return Err(EngineError::Cancelled);
        }

        let extraction =
            self.config
                .rules
                .listing(&doc, self.cursor.next_locator(), self.cursor.count_rule());

        let mut entries = Vec::new();
        for record in extraction.records {
            match record {
                Ok(entry) => {
                    if self.seen.insert(entry.id.clone()) {
                        entries.push(entry);
                    } else {
                        log::debug!("{}: duplicate entry {} on page {}", self.desc, entry.id, page_no);
                    }
                }
                Err(e) => {
                    log::warn!("{}: skipping catalog item on page {}: {}", self.desc, page_no, e);
                }
            }
        }

        self.cursor.observe(
            doc.url(),
            &PageObservation { next_value: extraction.next_value, max_pages: extraction.max_pages },
        );

        Ok(Some(ListingPage {
            entries,
            page: page_no,
            has_more: self.cursor.state() == CursorState::Continue,
        }))
    }

    /// Drain the walk, collecting every remaining entry.
    pub async fn collect_remaining(&mut self) -> Result<Vec<CatalogEntry>, EngineError> {
        let mut out = Vec::new();
        while let Some(page) = self.next_page().await? {
            out.extend(page.entries);
        }
        Ok(out)
    }

    fn check_cancelled(&self) -> bool {
        self.cancel.as_ref().map(CancelToken::is_cancelled).unwrap_or(false)
    }
}
