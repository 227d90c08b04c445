use std::collections::BTreeMap;

/// A parsed feed: channel metadata plus entries in upstream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeed {
    /// Simple channel child elements keyed by element name (`title`,
    /// `link`, `language`, `lastBuildDate`, ...).
    pub channel: BTreeMap<String, String>,
    pub entries: Vec<RawEntry>,
}

/// One upstream item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub id: Option<String>,
    /// Publication timestamp exactly as the feed wrote it.
    pub published: Option<String>,
    pub source: Option<EntrySource>,
    /// HTML summary (`<description>` in RSS).
    pub summary: Option<String>,
    /// Any other simple item fields, keyed by element name.
    pub extra: BTreeMap<String, String>,
    /// `None` only when the entry has no summary.
    pub sub_articles: Option<SubArticles>,
}

/// Publisher attribution from `<source url="...">Name</source>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrySource {
    pub title: String,
    pub url: Option<String>,
}

/// Result of reading the article list embedded in a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubArticles {
    /// Items that matched the expected shape. May be empty.
    Parsed(Vec<SubArticle>),
    /// The summary could not be read as markup and is passed through verbatim.
    Raw(String),
}

impl SubArticles {
    pub fn articles(&self) -> &[SubArticle] {
        match self {
            SubArticles::Parsed(items) => items,
            SubArticles::Raw(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubArticle {
    pub url: String,
    pub title: String,
    pub publisher: String,
}
