use scraper::Html;
use url::Url;

use crate::errors::ExtractionError;

/// A fetched document: the final URL and the raw body.
///
/// CSS extraction happens in synchronous passes (see `rules`), so the parsed
/// tree never has to live across an await point and walk futures stay `Send`.
#[derive(Debug, Clone)]
pub struct Document {
    url: Url,
    body: String,
}

impl Document {
    pub fn new(url: Url, body: String) -> Self {
        Self { url, body }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub(crate) fn html(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Resolve an href against a base document URL, rejecting anything that does
/// not come out as an absolute http(s) URL.
pub(crate) fn absolutize(base: &Url, href: &str) -> Result<Url, ExtractionError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(ExtractionError::MalformedLink { href: href.to_string() });
    }
    let resolved = base
        .join(href)
        .map_err(|_| ExtractionError::MalformedLink { href: href.to_string() })?;
    match resolved.scheme() {
        "http" | "https" => Ok(resolved),
        _ => Err(ExtractionError::MalformedLink { href: href.to_string() }),
    }
}
