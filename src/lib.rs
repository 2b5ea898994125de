// Generic paginated web-catalog scraping engine.
// Per-site behavior lives entirely in SourceConfig values; the walker and
// resolver are the same code for every source.

pub mod cancel;
pub mod config;
pub mod document;
pub mod errors;
pub mod fetcher;
pub mod filters;
pub mod models;
pub mod pagination;
pub mod rate_limit;
pub mod resolver;
pub mod rules;
pub mod sources;
pub mod walker;

pub use cancel::CancelToken;
pub use config::{ListingEndpoint, SourceConfig, SubPageConfig};
pub use document::Document;
pub use errors::{EngineError, ExtractionError, FetchError, RuleError};
pub use fetcher::{DocumentFetcher, FetcherConfig, HttpFetcher, UserAgentPolicy};
pub use filters::{FilterModel, FilterOption};
pub use models::{CatalogEntry, ChapterRef, EntryDetail, EntryId, ListingPage, PageRef};
pub use pagination::{CursorState, LinkAdvance, PaginationCursor, PaginationMode, UrlTemplate};
pub use rate_limit::{HostRateLimiter, RateLimitConfig};
pub use resolver::ChapterPageResolver;
pub use rules::{DateRule, ExtractionRuleSet, Locator, PageCountRule};
pub use walker::{CatalogWalker, Walk};
