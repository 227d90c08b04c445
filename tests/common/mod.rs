#![allow(dead_code)]

use newsboard::{Locale, NewsClient};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One `<item>`: (title, pubDate, source).
pub type Item<'a> = (&'a str, &'a str, &'a str);

pub fn rss(items: &[Item<'_>]) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Google News</title><language>pt-PT</language>"#,
    );
    for (i, (title, published, source)) in items.iter().enumerate() {
        body.push_str(&format!(
            r#"<item><title>{title}</title><link>https://news.example.com/{i}</link><guid>{i}</guid><pubDate>{published}</pubDate><description>&lt;ol&gt;&lt;li&gt;&lt;a href="https://pub.example.com/{i}"&gt;{title}&lt;/a&gt;&lt;font&gt;{source}&lt;/font&gt;&lt;/li&gt;&lt;/ol&gt;</description><source url="https://{i}.example.com">{source}</source></item>"#
        ));
    }
    body.push_str("</channel></rss>");
    body
}

pub fn client(server: &MockServer) -> NewsClient {
    NewsClient::with_base_url(Locale::new("pt", "PT"), &format!("{}/rss", server.uri())).unwrap()
}

/// Serves `body` for a search on `query`.
pub async fn mount_search(server: &MockServer, query: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .and(query_param("q", query))
        .and(query_param("ceid", "PT:pt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}
