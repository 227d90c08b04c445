//! Google News client: the four query modes over one fetch/parse/enrich pipeline.

use thiserror::Error;

use crate::config::Config;
use crate::feed::{
    enrich_entries, FeedFetcher, FetchError, FetchOptions, Locale, QueryBuilder, QueryError,
    RawFeed, SearchOptions, DEFAULT_BASE_URL, USER_AGENT,
};

#[derive(Debug, Error)]
pub enum NewsError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Topic feed came back with no entries.
    #[error("Unsupported topic: {0}")]
    UnsupportedTopic(String),
    /// Search came back with no entries.
    #[error("No results for query: {0}")]
    EmptyResult(String),
}

/// Facade over [`QueryBuilder`], [`FeedFetcher`] and the sub-article extractor.
///
/// Every operation builds a URL, fetches and parses the feed, then fills
/// `sub_articles` on each entry. The `*_with` variants override the
/// client's default routing for one call.
#[derive(Debug)]
pub struct NewsClient {
    queries: QueryBuilder,
    fetcher: FeedFetcher,
    fetch_options: FetchOptions,
}

impl NewsClient {
    pub fn new(locale: Locale) -> Result<Self, FetchError> {
        Self::with_base_url(locale, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(locale: Locale, base_url: &str) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::from_parts(
            http,
            QueryBuilder::with_base_url(locale, base_url),
            FetchOptions::default(),
        ))
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Ok(Self::with_base_url(config.locale(), &config.base_url)?
            .with_fetch_options(config.fetch_options()))
    }

    pub fn from_parts(
        http: reqwest::Client,
        queries: QueryBuilder,
        fetch_options: FetchOptions,
    ) -> Self {
        let fetcher = FeedFetcher::new(http, queries.base_url());
        Self {
            queries,
            fetcher,
            fetch_options,
        }
    }

    /// Replaces the default routing used by the operations without `_with`.
    pub fn with_fetch_options(mut self, fetch_options: FetchOptions) -> Self {
        self.fetch_options = fetch_options;
        self
    }

    pub fn locale(&self) -> &Locale {
        self.queries.locale()
    }

    /// Front page of the configured edition.
    pub async fn top_news(&self) -> Result<RawFeed, NewsError> {
        self.top_news_with(&self.fetch_options).await
    }

    pub async fn top_news_with(&self, options: &FetchOptions) -> Result<RawFeed, NewsError> {
        self.load(&self.queries.top_news(), options).await
    }

    /// Headlines for a named section (`business`, `WORLD`, ...) or an
    /// opaque Google News topic id.
    ///
    /// # Errors
    ///
    /// [`NewsError::UnsupportedTopic`] when the feed has no entries.
    pub async fn topic_headlines(&self, topic: &str) -> Result<RawFeed, NewsError> {
        self.topic_headlines_with(topic, &self.fetch_options).await
    }

    pub async fn topic_headlines_with(
        &self,
        topic: &str,
        options: &FetchOptions,
    ) -> Result<RawFeed, NewsError> {
        let feed = self.load(&self.queries.topic(topic), options).await?;
        if feed.entries.is_empty() {
            return Err(NewsError::UnsupportedTopic(topic.to_string()));
        }
        Ok(feed)
    }

    /// Headlines about a location. The location is passed through as-is.
    pub async fn geo_headlines(&self, location: &str) -> Result<RawFeed, NewsError> {
        self.geo_headlines_with(location, &self.fetch_options).await
    }

    pub async fn geo_headlines_with(
        &self,
        location: &str,
        options: &FetchOptions,
    ) -> Result<RawFeed, NewsError> {
        self.load(&self.queries.geo(location), options).await
    }

    /// Full-text search.
    ///
    /// # Errors
    ///
    /// - [`NewsError::Query`] when `from`/`to` is not a date
    /// - [`NewsError::EmptyResult`] when the feed has no entries
    pub async fn search(&self, query: &str, search: &SearchOptions) -> Result<RawFeed, NewsError> {
        self.search_with(query, search, &self.fetch_options).await
    }

    pub async fn search_with(
        &self,
        query: &str,
        search: &SearchOptions,
        options: &FetchOptions,
    ) -> Result<RawFeed, NewsError> {
        let url = self.queries.search(query, search)?;
        let feed = self.load(&url, options).await?;
        if feed.entries.is_empty() {
            return Err(NewsError::EmptyResult(query.to_string()));
        }
        Ok(feed)
    }

    async fn load(&self, url: &str, options: &FetchOptions) -> Result<RawFeed, NewsError> {
        let mut feed = self.fetcher.fetch_feed(url, options).await?;
        enrich_entries(&mut feed.entries);
        tracing::debug!(%url, entries = feed.entries.len(), "Loaded feed");
        Ok(feed)
    }
}
