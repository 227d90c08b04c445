//! Recovers the article cluster Google News embeds in an entry summary.
//!
//! Summaries look like
//! `<ol><li><a href="...">Title</a>&nbsp;&nbsp;<font color="#6f6f6f">Publisher</font></li>...</ol>`.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use super::types::{RawEntry, SubArticle, SubArticles};

static LIST_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("static selector"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("static selector"));
static FONT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("font").expect("static selector"));

/// Fills `sub_articles` on every entry.
pub fn enrich_entries(entries: &mut [RawEntry]) {
    for entry in entries.iter_mut() {
        entry.sub_articles = entry.summary.as_deref().map(extract_sub_articles);
    }
}

/// Reads one summary.
///
/// Each `<li>` yields a [`SubArticle`] when its first `<a>` carries an
/// `href` and it contains a `<font>` publisher label; other items are
/// skipped. A summary that contains tags but no list items, and that the
/// HTML parser flagged as malformed, is returned verbatim as
/// [`SubArticles::Raw`]. Plain text gives an empty list.
pub fn extract_sub_articles(summary: &str) -> SubArticles {
    let fragment = Html::parse_fragment(summary);

    let mut found_items = false;
    let mut articles = Vec::new();
    for item in fragment.select(&LIST_ITEM) {
        found_items = true;
        match read_item(item) {
            Some(article) => articles.push(article),
            None => tracing::trace!("Skipping list item without link and publisher"),
        }
    }

    if !found_items && !fragment.errors.is_empty() && has_tags(summary) {
        tracing::debug!(
            errors = fragment.errors.len(),
            "Summary is not readable markup, passing through"
        );
        return SubArticles::Raw(summary.to_string());
    }

    SubArticles::Parsed(articles)
}

/// `<` directly followed by a tag name, `/` or `!`. A bare `<` in prose is text.
fn has_tags(summary: &str) -> bool {
    summary
        .as_bytes()
        .windows(2)
        .any(|w| w[0] == b'<' && (w[1].is_ascii_alphabetic() || w[1] == b'/' || w[1] == b'!'))
}

fn read_item(item: ElementRef<'_>) -> Option<SubArticle> {
    let anchor = item.select(&ANCHOR).next()?;
    let url = anchor.value().attr("href")?;
    let publisher = item.select(&FONT).next()?;

    Some(SubArticle {
        url: url.to_string(),
        title: anchor.text().collect(),
        publisher: publisher.text().collect(),
    })
}
