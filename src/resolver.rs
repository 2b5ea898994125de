use std::sync::Arc;

use reqwest::header::HeaderMap;
use url::Url;

use crate::cancel::CancelToken;
use crate::config::SourceConfig;
use crate::document::Document;
use crate::errors::{EngineError, ExtractionError};
use crate::fetcher::DocumentFetcher;
use crate::models::{CatalogEntry, ChapterRef, EntryDetail, PageRef};

/// Resolves one catalog entry down to its virtual chapter and page images.
///
/// Unlike listing walks, resolutions are all-or-nothing: a fetch or
/// required-field failure anywhere fails the whole call, because consumers
/// of a page list assume it is complete and contiguous.
pub struct ChapterPageResolver<F> {
    config: Arc<SourceConfig>,
    fetcher: Arc<F>,
    headers: HeaderMap,
    cancel: Option<CancelToken>,
}

impl<F: DocumentFetcher> ChapterPageResolver<F> {
    pub fn new(config: Arc<SourceConfig>, fetcher: Arc<F>) -> Self {
        let headers = config.request_headers();
        Self { config, fetcher, headers, cancel: None }
    }

    /// Attach a cancellation token, checked before each fetch.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fetch the entry's detail page and extract title and tags.
    pub async fn resolve_detail(&self, entry: &CatalogEntry) -> Result<EntryDetail, EngineError> {
        let url = self.entry_url(entry)?;
        let walk = format!("entry {}", entry.id);
        let doc = self.fetch_doc(&url, &walk, 1).await?;
        Ok(self.config.rules.detail(&doc)?)
    }

    /// Derive the entry's single virtual chapter from its detail page.
    ///
    /// A missing or unparsable publish date leaves `published_at` unset;
    /// only the canonical link is required.
    pub async fn resolve_chapter(&self, entry: &CatalogEntry) -> Result<ChapterRef, EngineError> {
        let url = self.entry_url(entry)?;
        let walk = format!("entry {}", entry.id);
        let doc = self.fetch_doc(&url, &walk, 1).await?;
        Ok(self.config.rules.chapter(&doc, &self.config.chapter_label)?)
    }

    /// Resolve the chapter's full, ordered image list across its sub-pages.
    ///
    /// The sub-page bound comes from the page-count rule on the first
    /// document (default 1). Sub-page 1 reuses that document; the rest are
    /// fetched through the source's sub-page template. Any sub-page failure
    /// fails the resolution — no partial list is ever returned.
    pub async fn resolve_pages(&self, chapter: &ChapterRef) -> Result<Vec<PageRef>, EngineError> {
        let walk = format!("pages of {}", chapter.id);

        let first = self.fetch_doc(&chapter.url, &walk, 1).await?;
        let extraction = self.config.rules.pages(&first);
        let bound = extraction.sub_page_count;
        let mut images = extraction.images;
        drop(first);
        log::debug!("{}: {} sub-pages declared", walk, bound);

        for sub in 2..=bound {
            let url = self.config.sub_pages.expand(&chapter.url, sub)?;
            let doc = self.fetch_doc(&url, &walk, sub).await?;
            images.extend(self.config.rules.pages(&doc).images);
        }

        Ok(images
            .into_iter()
            .enumerate()
            .map(|(index, image_url)| PageRef { index: index as u32, image_url })
            .collect())
    }

    fn entry_url(&self, entry: &CatalogEntry) -> Result<Url, EngineError> {
        entry.id.to_url(&self.config.base_url).ok_or_else(|| {
            EngineError::Extraction(ExtractionError::MalformedLink { href: entry.id.to_string() })
        })
    }

    async fn fetch_doc(&self, url: &Url, walk: &str, page: u32) -> Result<Document, EngineError> {
        if self.check_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let doc = self
            .fetcher
            .fetch(url, &self.headers)
            .await
            .map_err(|e| EngineError::Fetch { page, walk: walk.to_string(), source: e })?;
        if self.check_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(doc)
    }

    fn check_cancelled(&self) -> bool {
        self.cancel.as_ref().map(CancelToken::is_cancelled).unwrap_or(false)
    }
}
