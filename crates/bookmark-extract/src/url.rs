//! Link discovery and web page extraction.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;

/// Request timeout for page fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum characters of page content kept.
pub const MAX_PAGE_CHARS: usize = 2000;

const CONTENT_SELECTORS: &[&str] = &["main", "article", ".content", ".post", ".entry"];
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header", "noscript"];
const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"];
const YOUTUBE_OEMBED: &str = "https://www.youtube.com/oembed";

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"https?://[-\w.]+(?::\d+)?(?:/[\w/_.\-~%]*(?:\?[\w&=%.\-+]+)?)?(?:#[\w\-]+)?")
            .expect("static URL pattern")
    })
}

fn youtube_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("static video id pattern"))
}

/// Find plain `http(s)://` links in free text.
pub fn find_urls(text: &str) -> Vec<String> {
    url_pattern()
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .collect()
}

/// Whether `url` points at YouTube.
pub fn is_youtube_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|host| YOUTUBE_HOSTS.contains(&host.as_str()))
        .unwrap_or(false)
}

/// Extract the 11 character YouTube video id.
pub fn youtube_video_id(url: &str) -> Option<String> {
    youtube_id_pattern()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Title, description and main text of an HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: String,
}

impl PageSummary {
    /// Render the summary in the text form appended to messages.
    pub fn render(&self) -> String {
        format!(
            "Title: {}\n\nDescription: {}\n\nContent: {}",
            self.title.as_deref().unwrap_or("No title"),
            self.description.as_deref().unwrap_or_default(),
            self.content
        )
    }
}

/// Parse an HTML document into a [`PageSummary`].
///
/// Main content comes from the first matching content container, falling
/// back to the whole body. Scripts, styles and page chrome are skipped.
pub fn parse_html(html: &str) -> PageSummary {
    let document = Html::parse_document(html);

    let title = select_first(&document, "title")
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let description = select_first(&document, r#"meta[name="description"]"#)
        .and_then(|el| el.value().attr("content"))
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let content = CONTENT_SELECTORS
        .iter()
        .filter_map(|sel| select_first(&document, sel))
        .map(visible_text)
        .find(|text| !text.is_empty())
        .or_else(|| select_first(&document, "body").map(visible_text))
        .unwrap_or_default();

    PageSummary {
        title,
        description,
        content: truncate_chars(&content, MAX_PAGE_CHARS),
    }
}

fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next()
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut pieces: Vec<String> = Vec::new();
    collect_text(root, &mut pieces);
    pieces.join(" ")
}

fn collect_text(element: ElementRef<'_>, pieces: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text = collapse_whitespace(text);
                if !text.is_empty() {
                    pieces.push(text);
                }
            }
            Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, pieces);
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep the first `max` characters, appending `...` when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct OEmbed {
    title: Option<String>,
    author_name: Option<String>,
}

/// Fetches and summarizes linked pages.
#[derive(Clone)]
pub struct UrlProcessor {
    client: reqwest::Client,
}

impl Default for UrlProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlProcessor {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("tg-bookmark/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Describe the content behind `url`.
    ///
    /// Never fails: fetch and parse problems are returned as text.
    pub async fn extract(&self, url: &str) -> String {
        let result = if is_youtube_url(url) {
            self.youtube(url).await
        } else {
            self.web_page(url).await
        };

        result.unwrap_or_else(|e| {
            warn!(url, error = %e, "Failed to fetch URL");
            format!("Failed to fetch content from {}: {}", url, e)
        })
    }

    async fn web_page(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        debug!(url, bytes = body.len(), "Fetched page");
        Ok(parse_html(&body).render())
    }

    async fn youtube(&self, url: &str) -> Result<String> {
        let Some(video_id) = youtube_video_id(url) else {
            return Ok("Could not extract YouTube video ID".to_string());
        };

        let mut endpoint = Url::parse(YOUTUBE_OEMBED)?;
        endpoint
            .query_pairs_mut()
            .append_pair("url", url)
            .append_pair("format", "json");

        match self.oembed(endpoint).await {
            Ok(info) => Ok(format!(
                "YouTube Video: {}\nChannel: {}\nVideo ID: {}",
                info.title.as_deref().unwrap_or("Unknown title"),
                info.author_name.as_deref().unwrap_or("Unknown channel"),
                video_id
            )),
            Err(e) => {
                debug!(url, error = %e, "YouTube lookup failed");
                Ok(format!("YouTube video: {} (details not available)", url))
            }
        }
    }

    async fn oembed(&self, endpoint: Url) -> reqwest::Result<OEmbed> {
        self.client
            .get(endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_urls() {
        let urls = find_urls("see https://example.com/a/b?x=1 and http://foo.org.");
        assert_eq!(urls, vec!["https://example.com/a/b?x=1", "http://foo.org"]);
        assert!(find_urls("no links here").is_empty());
    }

    #[test]
    fn test_youtube_detection() {
        assert!(is_youtube_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_youtube_url("https://m.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(!is_youtube_url("https://notyoutube.com.evil/watch"));
        assert!(!is_youtube_url("not a url"));
    }

    #[test]
    fn test_youtube_video_id() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(youtube_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(youtube_video_id("https://youtube.com/"), None);
    }

    #[test]
    fn test_parse_html_prefers_article() {
        let html = r#"<html><head><title> My  Page </title>
            <meta name="description" content="A page"></head>
            <body><header>Site header</header><nav>Menu</nav>
            <article><h1>Heading</h1><p>Body   text</p><script>var x;</script></article>
            <footer>Footer</footer></body></html>"#;
        let page = parse_html(html);
        assert_eq!(page.title.as_deref(), Some("My Page"));
        assert_eq!(page.description.as_deref(), Some("A page"));
        assert_eq!(page.content, "Heading Body text");
        assert!(page.render().starts_with("Title: My Page\n\nDescription: A page"));
    }

    #[test]
    fn test_parse_html_falls_back_to_body() {
        let page = parse_html("<body><nav>skip</nav><div>Hello <b>world</b></div></body>");
        assert_eq!(page.title, None);
        assert_eq!(page.content, "Hello world");
        assert!(page.render().starts_with("Title: No title"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("ééé", 2), "éé...");
    }
}
