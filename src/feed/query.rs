use chrono::{Local, NaiveDate};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::form_urlencoded;

use crate::util::parse_date_loose;

pub const DEFAULT_BASE_URL: &str = "https://news.google.com/rss";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A `from`/`to` search bound could not be read as a date.
    #[error("Could not parse date: {0:?}")]
    DateParse(String),
}

/// Language/country pair that selects the Google News edition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    language: String,
    country: String,
}

impl Locale {
    pub fn new(language: &str, country: &str) -> Self {
        Self {
            language: language.trim().to_lowercase(),
            country: country.trim().to_uppercase(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// `?ceid=PT:pt&hl=pt&gl=PT`
    pub fn fragment(&self) -> String {
        format!(
            "?ceid={country}:{lang}&hl={lang}&gl={country}",
            country = self.country,
            lang = self.language
        )
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("en", "US")
    }
}

/// Headline sections Google News exposes by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    World,
    Nation,
    Business,
    Technology,
    Entertainment,
    Science,
    Sports,
    Health,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::World,
        Topic::Nation,
        Topic::Business,
        Topic::Technology,
        Topic::Entertainment,
        Topic::Science,
        Topic::Sports,
        Topic::Health,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::World => "WORLD",
            Topic::Nation => "NATION",
            Topic::Business => "BUSINESS",
            Topic::Technology => "TECHNOLOGY",
            Topic::Entertainment => "ENTERTAINMENT",
            Topic::Science => "SCIENCE",
            Topic::Sports => "SPORTS",
            Topic::Health => "HEALTH",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Qualifiers for a free-text search.
///
/// `when` is a relative window such as `7d` or `1h`. When it is set and
/// not blank, `from` and `to` are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Form-encode the composed query text.
    pub helper: bool,
    pub when: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            helper: true,
            when: None,
            from: None,
            to: None,
        }
    }
}

/// Composes feed URLs for the four query modes.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_url: String,
    locale: Locale,
}

impl QueryBuilder {
    pub fn new(locale: Locale) -> Self {
        Self::with_base_url(locale, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(locale: Locale, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            locale,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn top_news(&self) -> String {
        format!("{}{}", self.base_url, self.locale.fragment())
    }

    /// Named sections map to `headlines/section/topic/{NAME}`; anything else
    /// is passed through as an opaque topic id.
    pub fn topic(&self, topic: &str) -> String {
        match topic.parse::<Topic>() {
            Ok(section) => format!(
                "{}/headlines/section/topic/{}{}",
                self.base_url,
                section,
                self.locale.fragment()
            ),
            Err(()) => format!("{}/topics/{}{}", self.base_url, topic, self.locale.fragment()),
        }
    }

    pub fn geo(&self, location: &str) -> String {
        format!(
            "{}/headlines/section/geo/{}{}",
            self.base_url,
            location,
            self.locale.fragment()
        )
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<String, QueryError> {
        self.search_as_of(query, options, Local::now().date_naive())
    }

    /// Same as [`search`](Self::search) with relative dates resolved against `today`.
    pub fn search_as_of(
        &self,
        query: &str,
        options: &SearchOptions,
        today: NaiveDate,
    ) -> Result<String, QueryError> {
        let text = compose_search_text(query, options, today)?;
        let text = if options.helper {
            form_urlencoded::byte_serialize(text.as_bytes()).collect::<String>()
        } else {
            text
        };

        let locale = self.locale.fragment().replacen('?', "&", 1);
        Ok(format!("{}/search?q={}{}", self.base_url, text, locale))
    }
}

fn compose_search_text(
    query: &str,
    options: &SearchOptions,
    today: NaiveDate,
) -> Result<String, QueryError> {
    let mut text = query.to_string();

    if let Some(when) = options.when.as_deref().filter(|w| !w.trim().is_empty()) {
        text.push_str(" when:");
        text.push_str(when);
        return Ok(text);
    }

    if let Some(from) = &options.from {
        text.push_str(" after:");
        text.push_str(&normalize_date(from, today)?);
    }
    if let Some(to) = &options.to {
        text.push_str(" before:");
        text.push_str(&normalize_date(to, today)?);
    }

    Ok(text)
}

fn normalize_date(input: &str, today: NaiveDate) -> Result<String, QueryError> {
    parse_date_loose(input, today)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| QueryError::DateParse(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const BASE: &str = "https://news.google.com/rss";

    fn builder() -> QueryBuilder {
        QueryBuilder::new(Locale::new("PT", "pt"))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    #[test]
    fn test_locale_is_normalized() {
        let locale = Locale::new(" PT ", "pt");
        assert_eq!(locale.language(), "pt");
        assert_eq!(locale.country(), "PT");
        assert_eq!(locale.fragment(), "?ceid=PT:pt&hl=pt&gl=PT");
    }

    #[test]
    fn test_top_news_url() {
        assert_eq!(builder().top_news(), format!("{BASE}?ceid=PT:pt&hl=pt&gl=PT"));
    }

    #[test]
    fn test_known_topic_url() {
        assert_eq!(
            builder().topic("business"),
            format!("{BASE}/headlines/section/topic/BUSINESS?ceid=PT:pt&hl=pt&gl=PT")
        );
    }

    #[test]
    fn test_opaque_topic_url() {
        assert_eq!(
            builder().topic("CAAqJggKIiBDQkFTRWdv"),
            format!("{BASE}/topics/CAAqJggKIiBDQkFTRWdv?ceid=PT:pt&hl=pt&gl=PT")
        );
    }

    #[test]
    fn test_geo_url_not_validated() {
        assert_eq!(
            builder().geo("Lisboa"),
            format!("{BASE}/headlines/section/geo/Lisboa?ceid=PT:pt&hl=pt&gl=PT")
        );
    }

    #[test]
    fn test_search_encodes_query() {
        let url = builder()
            .search_as_of("Novo Banco", &SearchOptions::default(), today())
            .unwrap();
        assert_eq!(url, format!("{BASE}/search?q=Novo+Banco&ceid=PT:pt&hl=pt&gl=PT"));
    }

    #[test]
    fn test_search_without_helper_keeps_raw_text() {
        let options = SearchOptions {
            helper: false,
            ..SearchOptions::default()
        };
        let url = builder().search_as_of("BCP", &options, today()).unwrap();
        assert_eq!(url, format!("{BASE}/search?q=BCP&ceid=PT:pt&hl=pt&gl=PT"));
    }

    #[test]
    fn test_search_when_overrides_date_range() {
        let options = SearchOptions {
            when: Some("7d".into()),
            from: Some("not-a-date".into()),
            to: Some("2024-01-31".into()),
            ..SearchOptions::default()
        };
        let url = builder().search_as_of("BCP", &options, today()).unwrap();
        assert_eq!(url, format!("{BASE}/search?q=BCP+when%3A7d&ceid=PT:pt&hl=pt&gl=PT"));
    }

    #[test]
    fn test_search_blank_when_falls_back_to_range() {
        let options = SearchOptions {
            when: Some(" ".into()),
            from: Some("2024-01-05".into()),
            ..SearchOptions::default()
        };
        let url = builder().search_as_of("CGD", &options, today()).unwrap();
        assert_eq!(url, format!("{BASE}/search?q=CGD+after%3A2024-01-05&ceid=PT:pt&hl=pt&gl=PT"));
    }

    #[test]
    fn test_search_date_range_normalized() {
        let options = SearchOptions {
            from: Some("January 5, 2024".into()),
            to: Some("yesterday".into()),
            ..SearchOptions::default()
        };
        let url = builder().search_as_of("CGD", &options, today()).unwrap();
        assert_eq!(
            url,
            format!("{BASE}/search?q=CGD+after%3A2024-01-05+before%3A2024-01-31&ceid=PT:pt&hl=pt&gl=PT")
        );
    }

    #[test]
    fn test_search_bad_date_is_error() {
        let options = SearchOptions {
            from: Some("not-a-date".into()),
            ..SearchOptions::default()
        };
        let err = builder().search_as_of("BCP", &options, today()).unwrap_err();
        assert_eq!(err, QueryError::DateParse("not-a-date".into()));
    }

    #[test]
    fn test_custom_base_url_trailing_slash() {
        let b = QueryBuilder::with_base_url(Locale::default(), "http://127.0.0.1:9000/rss/");
        assert_eq!(b.top_news(), "http://127.0.0.1:9000/rss?ceid=US:en&hl=en&gl=US");
    }

    fn mixed_case(name: &str, mask: u32) -> String {
        name.chars()
            .enumerate()
            .map(|(i, c)| {
                if mask & (1 << (i % 32)) != 0 {
                    c.to_ascii_lowercase()
                } else {
                    c
                }
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_enumerated_topics_use_section_path(idx in 0usize..8, mask in any::<u32>()) {
            let topic = Topic::ALL[idx];
            let input = mixed_case(topic.as_str(), mask);
            let url = builder().topic(&input);
            let expected = format!("/headlines/section/topic/{}?", topic.as_str());
            prop_assert!(url.contains(&expected));
        }

        #[test]
        fn prop_other_topics_use_opaque_path(raw in "[A-Za-z0-9_-]{1,24}") {
            prop_assume!(raw.parse::<Topic>().is_err());
            let url = builder().topic(&raw);
            let expected = format!("{BASE}/topics/{raw}?");
            prop_assert!(url.starts_with(&expected));
        }
    }
}
