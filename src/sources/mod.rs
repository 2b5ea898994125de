//! Built-in source definitions.
//!
//! Each module exports a single `source()` returning the site's
//! [`SourceConfig`](crate::config::SourceConfig). Sources are configuration
//! values only; none of them carries engine logic.

pub mod baobua;
pub mod misskon;
