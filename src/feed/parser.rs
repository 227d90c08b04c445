use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use thiserror::Error;

use super::types::{EntrySource, RawEntry, RawFeed};

/// Nesting depth past which a document is rejected outright.
const MAX_XML_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum ParseError {
    /// Body is not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(String),
    /// Body is XML but not a feed format feed-rs understands.
    #[error("Feed parse error: {0}")]
    Feed(String),
}

/// Parses feed text into channel metadata and ordered entries.
///
/// RSS 2.0 is read with a streaming reader so that `<source>` attribution
/// and every simple item field survive. Other formats (Atom, RSS 1.0,
/// JSON Feed) go through `feed-rs` and are mapped onto the same shape.
/// Sub-articles are not populated here.
pub fn parse_feed(text: &str) -> Result<RawFeed, ParseError> {
    match parse_rss(text)? {
        Some(feed) => Ok(feed),
        None => parse_generic(text.as_bytes()),
    }
}

/// Text captured for the element currently being read.
#[derive(Default)]
struct Capture {
    text: String,
    url: Option<String>,
    nested: bool,
}

/// Returns `Ok(None)` when the root element is not `<rss>`.
fn parse_rss(text: &str) -> Result<Option<RawFeed>, ParseError> {
    // quick-xml (0.37) never expands <!ENTITY> declarations; only the five
    // XML builtins are resolved by `unescape`.
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut feed = RawFeed::default();
    let mut path: Vec<String> = Vec::new();
    let mut entry: Option<RawEntry> = None;
    let mut capture: Option<Capture> = None;
    let mut seen_root = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ParseError::Xml(e.to_string()))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let name = element_name(e);
                if !seen_root {
                    if name != "rss" {
                        return Ok(None);
                    }
                    seen_root = true;
                }

                path.push(name);
                if path.len() > MAX_XML_DEPTH {
                    return Err(ParseError::Xml(format!(
                        "nesting depth exceeds {MAX_XML_DEPTH}"
                    )));
                }
                open_element(&path, e, &reader, &mut entry, &mut capture);

                if matches!(event, Event::Empty(_)) {
                    close_element(&path, &mut feed, &mut entry, &mut capture);
                    path.pop();
                }
            }
            Event::Text(ref t) => {
                if let Some(cap) = capture.as_mut() {
                    let text = t.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                    cap.text.push_str(&text);
                }
            }
            Event::CData(ref c) => {
                if let Some(cap) = capture.as_mut() {
                    cap.text.push_str(&String::from_utf8_lossy(c));
                }
            }
            Event::End(_) => {
                close_element(&path, &mut feed, &mut entry, &mut capture);
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Ok(None);
    }
    Ok(Some(feed))
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// `path` already includes the element being opened.
fn open_element(
    path: &[String],
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
    entry: &mut Option<RawEntry>,
    capture: &mut Option<Capture>,
) {
    match (path.len(), path.last().map(String::as_str)) {
        (3, Some("item")) if path[1] == "channel" => {
            *entry = Some(RawEntry::default());
        }
        (3, _) if path[1] == "channel" => {
            *capture = Some(Capture::default());
        }
        (4, Some(name)) if entry.is_some() => {
            let mut cap = Capture::default();
            if name == "source" {
                cap.url = attribute(e, reader, b"url");
            }
            *capture = Some(cap);
        }
        (depth, _) if depth > 4 || (depth == 4 && entry.is_none()) => {
            if let Some(cap) = capture.as_mut() {
                cap.nested = true;
            }
        }
        _ => {}
    }
}

/// `path` still includes the element being closed.
fn close_element(
    path: &[String],
    feed: &mut RawFeed,
    entry: &mut Option<RawEntry>,
    capture: &mut Option<Capture>,
) {
    let Some(name) = path.last() else {
        return;
    };

    match path.len() {
        3 if name == "item" => {
            if let Some(done) = entry.take() {
                feed.entries.push(done);
            }
        }
        3 => {
            if let Some(cap) = capture.take() {
                if !cap.nested && !cap.text.is_empty() {
                    feed.channel.insert(name.clone(), cap.text);
                }
            }
        }
        4 => {
            if let Some(item) = entry.as_mut() {
                if let Some(cap) = capture.take() {
                    assign_field(item, name, cap);
                }
            }
        }
        _ => {}
    }
}

fn assign_field(entry: &mut RawEntry, name: &str, cap: Capture) {
    if cap.nested {
        return;
    }
    let text = cap.text;
    match name {
        "title" => entry.title = Some(text),
        "link" => entry.link = Some(text),
        "guid" => entry.id = Some(text),
        "pubDate" => entry.published = Some(text),
        "description" => entry.summary = Some(text),
        "source" => {
            entry.source = Some(EntrySource {
                title: text,
                url: cap.url,
            })
        }
        other => {
            entry.extra.insert(other.to_string(), text);
        }
    }
}

fn attribute(e: &BytesStart<'_>, reader: &Reader<&[u8]>, key: &[u8]) -> Option<String> {
    for attr in e.attributes() {
        let attr = match attr {
            Ok(attr) => attr,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping malformed feed attribute");
                continue;
            }
        };
        if attr.key.as_ref() == key {
            return attr
                .decode_and_unescape_value(reader.decoder())
                .ok()
                .map(|v| v.into_owned());
        }
    }
    None
}

fn parse_generic(bytes: &[u8]) -> Result<RawFeed, ParseError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| ParseError::Feed(e.to_string()))?;

    let mut channel = BTreeMap::new();
    if let Some(title) = feed.title {
        channel.insert("title".to_string(), title.content);
    }
    if let Some(description) = feed.description {
        channel.insert("description".to_string(), description.content);
    }
    if let Some(link) = feed.links.first() {
        channel.insert("link".to_string(), link.href.clone());
    }
    if let Some(language) = feed.language {
        channel.insert("language".to_string(), language);
    }
    if let Some(updated) = feed.updated {
        channel.insert("updated".to_string(), updated.to_rfc3339());
    }

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let id = if entry.id.trim().is_empty() {
                None
            } else {
                Some(entry.id)
            };
            RawEntry {
                title: entry.title.map(|t| t.content),
                link: entry.links.first().map(|l| l.href.clone()),
                id,
                published: entry.published.or(entry.updated).map(|dt| dt.to_rfc2822()),
                source: None,
                summary: entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body)),
                extra: BTreeMap::new(),
                sub_articles: None,
            }
        })
        .collect();

    Ok(RawFeed { channel, entries })
}
