//! Feed retrieval and parsing.
//!
//! - [`query`] - URL composition for the four Google News query modes
//! - [`fetcher`] - HTTP retrieval (direct, forward proxy, or fetch service)
//! - [`parser`] - RSS 2.0 streaming parser with a `feed-rs` fallback for other formats
//! - [`sub_articles`] - sub-article lists embedded in entry summaries
//!
//! # Example
//!
//! ```ignore
//! use crate::feed::{FeedFetcher, FetchOptions, Locale, QueryBuilder};
//!
//! let queries = QueryBuilder::new(Locale::new("pt", "PT"));
//! let fetcher = FeedFetcher::new(reqwest::Client::new(), queries.base_url());
//! let feed = fetcher.fetch_feed(&queries.top_news(), &FetchOptions::default()).await?;
//! ```

mod fetcher;
mod parser;
mod query;
mod sub_articles;
mod types;

pub use fetcher::{
    FeedFetcher, FetchError, FetchOptions, FetchService, FetchedFeed, ProxyConfig,
    DEFAULT_FETCH_SERVICE_ENDPOINT, USER_AGENT,
};
pub use parser::{parse_feed, ParseError};
pub use query::{Locale, QueryBuilder, QueryError, SearchOptions, Topic, DEFAULT_BASE_URL};
pub use sub_articles::{enrich_entries, extract_sub_articles};
pub use types::{EntrySource, RawEntry, RawFeed, SubArticle, SubArticles};
