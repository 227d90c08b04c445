//! Batch search across named entities, ranked by date and filtered by source.

use chrono::{DateTime, FixedOffset, Local, NaiveDate};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::client::{NewsClient, NewsError};
use crate::feed::{RawEntry, SearchOptions};
use crate::util::{parse_date_loose, parse_timestamp};

/// One ranked article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRow {
    /// Query string that produced the article.
    pub query: String,
    pub title: String,
    pub link: String,
    /// Calendar date in the offset the feed published.
    pub published: NaiveDate,
    pub source: String,
}

/// Noise removal applied to a merged batch.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    min_count: usize,
    blocked: HashSet<String>,
}

impl SourceFilter {
    pub const DEFAULT_MIN_COUNT: usize = 5;

    /// Sources that were consistently off-topic for Portuguese bank queries.
    pub fn default_blocklist() -> Vec<String> {
        [
            "Prefeitura de Ituporanga",
            "PREFEITURA MUNICIPAL DE VIANA - ES",
            "mediotejo.net",
            "Folha de S.Paulo",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    pub fn new(min_count: usize, blocked: impl IntoIterator<Item = String>) -> Self {
        Self {
            min_count,
            blocked: blocked.into_iter().collect(),
        }
    }

    pub fn min_count(&self) -> usize {
        self.min_count
    }

    pub fn is_blocked(&self, source: &str) -> bool {
        self.blocked.contains(source)
    }

    /// Drops rows whose source occurs fewer than `min_count` times in
    /// `rows`, and rows from blocked sources. Order is preserved.
    pub fn apply(&self, rows: Vec<ArticleRow>) -> Vec<ArticleRow> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in &rows {
            *counts.entry(row.source.clone()).or_default() += 1;
        }

        let before = rows.len();
        let kept: Vec<ArticleRow> = rows
            .into_iter()
            .filter(|row| {
                counts.get(&row.source).copied().unwrap_or(0) >= self.min_count
                    && !self.is_blocked(&row.source)
            })
            .collect();

        tracing::debug!(
            before,
            after = kept.len(),
            min_count = self.min_count,
            "Applied source filter"
        );
        kept
    }
}

impl Default for SourceFilter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_COUNT, Self::default_blocklist())
    }
}

/// Runs one search per query and merges the results into ranked rows.
pub struct ArticleAggregator<'a> {
    client: &'a NewsClient,
    filter: SourceFilter,
    concurrency: usize,
}

impl<'a> ArticleAggregator<'a> {
    pub fn new(client: &'a NewsClient) -> Self {
        Self {
            client,
            filter: SourceFilter::default(),
            concurrency: 1,
        }
    }

    pub fn with_filter(mut self, filter: SourceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Searches in flight at once. Output does not depend on this value.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Articles for `queries` published within `[start, end]`, newest first.
    ///
    /// All searches complete before rows are merged, sorted and filtered by
    /// source. The first failing search aborts the batch.
    pub async fn aggregate(
        &self,
        queries: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ArticleRow>, NewsError> {
        if start > end {
            tracing::warn!(%start, %end, "Empty date window, nothing to fetch");
            return Ok(Vec::new());
        }

        let search = SearchOptions::default();
        let feeds: Vec<(&String, Vec<RawEntry>)> = stream::iter(queries)
            .map(|query| {
                let search = &search;
                async move {
                    let feed = self.client.search(query, search).await?;
                    Ok::<_, NewsError>((query, feed.entries))
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let today = Local::now().date_naive();
        let mut rows = Vec::new();
        for (query, entries) in feeds {
            let kept = rows_in_window(query, entries, start, end, today);
            tracing::debug!(%query, rows = kept.len(), "Collected rows in window");
            rows.extend(kept);
        }

        rows.sort_by(|a, b| b.published.cmp(&a.published));
        let rows = self.filter.apply(rows);

        tracing::info!(
            queries = queries.len(),
            rows = rows.len(),
            %start,
            %end,
            "Aggregated articles"
        );
        Ok(rows)
    }
}

/// Orders one query's entries newest first and keeps those dated within
/// `[start, end]`. Entries without a readable date or a source are skipped.
pub fn rows_in_window(
    query: &str,
    entries: Vec<RawEntry>,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Vec<ArticleRow> {
    let mut dated: Vec<(DateTime<FixedOffset>, RawEntry)> = entries
        .into_iter()
        .filter_map(|entry| match entry_timestamp(&entry, today) {
            Some(ts) => Some((ts, entry)),
            None => {
                tracing::warn!(
                    %query,
                    title = entry.title.as_deref().unwrap_or(""),
                    published = entry.published.as_deref().unwrap_or(""),
                    "Skipping entry without a readable publication date"
                );
                None
            }
        })
        .collect();
    dated.sort_by(|a, b| b.0.cmp(&a.0));

    dated
        .into_iter()
        .filter_map(|(ts, entry)| {
            let published = ts.date_naive();
            if published < start || published > end {
                return None;
            }
            let Some(source) = entry.source else {
                tracing::warn!(
                    %query,
                    title = entry.title.as_deref().unwrap_or(""),
                    "Skipping entry without a source"
                );
                return None;
            };
            Some(ArticleRow {
                query: query.to_string(),
                title: entry.title.unwrap_or_default(),
                link: entry.link.unwrap_or_default(),
                published,
                source: source.title,
            })
        })
        .collect()
}

fn entry_timestamp(entry: &RawEntry, today: NaiveDate) -> Option<DateTime<FixedOffset>> {
    let raw = entry.published.as_deref()?;
    parse_timestamp(raw).or_else(|| {
        parse_date_loose(raw, today)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().fixed_offset())
    })
}
