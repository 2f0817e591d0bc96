//! Wikipedia source text for script generation.
//!
//! Uses the MediaWiki action API: a `list=search` lookup for the best
//! matching title, then a plain-text `prop=extracts` fetch.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

const API_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Characters of key facts kept from an article.
pub const KEY_FACTS_CHARS: usize = 1500;

/// Processed content shorter than this is replaced by a generic blurb.
const MIN_CONTENT_CHARS: usize = 100;

static REFERENCE_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("reference pattern is valid"));
static SECTION_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"==+\s*.*?\s*==+").expect("heading pattern is valid"));

/// An article ready to be used as source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub key_facts: String,
    /// Whether the content is the generic blurb rather than a real article.
    pub fallback: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    query: SearchQuery,
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Deserialize)]
struct ExtractResponse {
    query: ExtractQuery,
}

#[derive(Deserialize)]
struct ExtractQuery {
    pages: Vec<ExtractPage>,
}

#[derive(Deserialize)]
struct ExtractPage {
    title: String,
    #[serde(default)]
    extract: Option<String>,
}

/// Minimal MediaWiki client.
pub struct WikipediaClient {
    http: reqwest::Client,
    api_url: String,
}

impl WikipediaClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("radiohost/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_url: API_URL.to_string(),
        })
    }

    /// Title of the best search hit for `query`.
    async fn search(&self, query: &str) -> Result<Option<String>, reqwest::Error> {
        let resp = self
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<SearchResponse>()
            .await?;

        Ok(resp.query.search.into_iter().next().map(|hit| hit.title))
    }

    /// Plain-text body of the article titled `title`.
    async fn extract(&self, title: &str) -> Result<Option<(String, String)>, reqwest::Error> {
        let resp = self
            .http
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
                ("formatversion", "2"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<ExtractResponse>()
            .await?;

        Ok(resp
            .query
            .pages
            .into_iter()
            .next()
            .and_then(|page| page.extract.map(|text| (page.title, text))))
    }

    async fn lookup(&self, topic: &str) -> Result<Option<(String, String)>, reqwest::Error> {
        let title = self.search(topic).await?.unwrap_or_else(|| topic.to_string());
        self.extract(&title).await
    }

    /// Fetch `topic` and reduce it to key facts. Never fails: any lookup
    /// problem yields the fallback article.
    pub async fn article_for_script(&self, topic: &str) -> Article {
        match self.lookup(topic).await {
            Ok(Some((title, content))) => {
                debug!(title = %title, chars = content.len(), "fetched article");
                let key_facts = key_facts(&content, KEY_FACTS_CHARS);
                if key_facts.chars().count() < MIN_CONTENT_CHARS {
                    warn!(title = %title, "article too short, using fallback text");
                    return fallback_article(topic);
                }
                Article {
                    url: article_url(&title),
                    title,
                    key_facts,
                    fallback: false,
                }
            }
            Ok(None) => {
                warn!(topic, "no Wikipedia article found, using fallback text");
                fallback_article(topic)
            }
            Err(e) => {
                warn!(topic, error = %e, "Wikipedia lookup failed, using fallback text");
                fallback_article(topic)
            }
        }
    }
}

fn article_url(title: &str) -> String {
    format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_"))
}

/// Generic source text used when no article is available.
pub fn fallback_article(topic: &str) -> Article {
    Article {
        title: topic.to_string(),
        url: article_url(topic),
        key_facts: format!(
            "{topic} is an important and interesting topic with many fascinating aspects to explore. \
             This conversation will explore the key features, significance and interesting facts about {topic}."
        ),
        fallback: true,
    }
}

/// Strip reference marks and section headings, collapse whitespace and cut
/// to `max_chars`, preferring a sentence end within the last fifth.
pub fn key_facts(content: &str, max_chars: usize) -> String {
    let text = REFERENCE_MARK.replace_all(content, "");
    let text = SECTION_HEADING.replace_all(&text, "");
    let mut text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if text.chars().count() > max_chars {
        let cut = text
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(text.len());
        text.truncate(cut);

        if let Some(last_period) = text.rfind('.') {
            let period_chars = text[..last_period].chars().count();
            if period_chars as f64 > max_chars as f64 * 0.8 {
                text.truncate(last_period + 1);
            }
        }
    }

    text.trim().to_string()
}
