//! Google News RSS retrieval for a list of named entities, ranked by date
//! and filtered by source.
//!
//! ```ignore
//! use newsboard::{ArticleAggregator, Locale, NewsClient};
//!
//! let client = NewsClient::new(Locale::new("pt", "PT"))?;
//! let rows = ArticleAggregator::new(&client)
//!     .aggregate(&["BCP".to_string()], start, end)
//!     .await?;
//! ```

pub mod aggregate;
pub mod client;
pub mod config;
pub mod feed;
pub mod util;

pub use aggregate::{ArticleAggregator, ArticleRow, SourceFilter};
pub use client::{NewsClient, NewsError};
pub use config::{Config, ConfigError};
pub use feed::{FetchOptions, Locale, SearchOptions};
