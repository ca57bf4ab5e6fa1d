//! Harvesting paper titles from conference listing pages.
//!
//! Conference program sites list accepted papers as anchors pointing at
//! poster pages. [`PosterLinkExtractor`] mines those anchors out of the HTML;
//! swap in your own [`TitleExtractor`] when a venue lays its listing out
//! differently.

use crate::transport::TransportError;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const LISTING_TIMEOUT: Duration = Duration::from_secs(30);

/// Anchors inside list items; poster links carry the paper title as text.
static LISTED_ANCHORS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("li a[href]").expect("anchor selector"));

/// A conference whose accepted-paper listing can be harvested.
#[derive(Debug, Clone)]
pub struct Conference {
    pub name: String,
    pub listing_url: Url,
}

impl Conference {
    pub fn new(name: impl Into<String>, listing_url: &str) -> Result<Self> {
        let listing_url = Url::parse(listing_url)
            .map_err(|e| Error::config(format!("invalid listing URL {listing_url:?}: {e}")))?;
        Ok(Self {
            name: name.into(),
            listing_url,
        })
    }
}

/// Pulls paper titles out of a listing page's HTML.
pub trait TitleExtractor: Send + Sync {
    fn extract(&self, html: &str) -> Vec<String>;
}

/// Default extractor: every `li > a` whose `href` mentions "poster".
pub struct PosterLinkExtractor;

impl TitleExtractor for PosterLinkExtractor {
    fn extract(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut titles = Vec::new();
        for anchor in document.select(&LISTED_ANCHORS) {
            let href = anchor.value().attr("href").unwrap_or("");
            if !href.contains("poster") {
                continue;
            }
            let title = anchor.text().collect::<String>().trim().to_string();
            if !title.is_empty() {
                titles.push(title);
            }
        }
        titles
    }
}

/// Fetches listing pages and turns them into filtered title lists.
pub struct TitleHarvester {
    client: reqwest::Client,
    extractor: Arc<dyn TitleExtractor>,
}

impl TitleHarvester {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("paper-sweep/", env!("CARGO_PKG_VERSION")))
            .timeout(LISTING_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;
        Ok(Self {
            client,
            extractor: Arc::new(PosterLinkExtractor),
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TitleExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Downloads the conference listing and returns titles matching `filter`
    /// case-insensitively. An empty filter keeps everything.
    pub async fn fetch_titles(&self, conference: &Conference, filter: &str) -> Result<Vec<String>> {
        debug!(conference = %conference.name, url = %conference.listing_url, "fetching listing");
        let response = self
            .client
            .get(conference.listing_url.clone())
            .send()
            .await
            .map_err(TransportError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::api(
                status.as_u16(),
                format!("listing fetch for {} failed", conference.name),
            ));
        }

        let html = response.text().await.map_err(TransportError::Http)?;
        let titles = filter_titles(self.extractor.extract(&html), filter);
        debug!(conference = %conference.name, titles = titles.len(), "listing harvested");
        Ok(titles)
    }
}

/// Case-insensitive substring filter; an empty needle keeps everything.
pub fn filter_titles(titles: Vec<String>, needle: &str) -> Vec<String> {
    if needle.is_empty() {
        return titles;
    }
    let needle = needle.to_lowercase();
    titles
        .into_iter()
        .filter(|t| t.to_lowercase().contains(&needle))
        .collect()
}
