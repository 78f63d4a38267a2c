//! Embed-page scraper, the last resort before searching by name.

use anyhow::Result;
use regex::Regex;
use reqwest::blocking::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

pub const EMBED_PLAYLIST_BASE: &str = "https://open.spotify.com/embed/playlist";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36";

/// Source of raw track ids for a playlist when the API paths fail.
pub trait PlaylistScraper: Send + Sync {
    /// Track ids in first-seen order, without duplicates. Empty on any failure.
    fn scrape_track_ids(&self, playlist_id: &str) -> Vec<String>;
}

pub struct EmbedScraper {
    client: Client,
    base_url: String,
    track_pattern: Regex,
}

impl EmbedScraper {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            track_pattern: Regex::new(r"spotify:track:([a-zA-Z0-9]{22})")?,
        })
    }

    /// All 22-character track ids referenced in `html`, first-seen order.
    pub fn extract_track_ids(&self, html: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.track_pattern
            .captures_iter(html)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect()
    }

    fn fetch_page(&self, playlist_id: &str) -> Option<String> {
        let url = format!("{}/{}", self.base_url, playlist_id);
        info!("Scraper: deep-scan on embed page ({})...", url);

        let response = match self.client.get(&url).send() {
            Ok(response) => response,
            Err(e) => {
                warn!("Scraper error: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Could not load embed page (status: {})", response.status());
            return None;
        }

        match response.text() {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("Scraper could not read body: {}", e);
                None
            }
        }
    }
}

impl PlaylistScraper for EmbedScraper {
    fn scrape_track_ids(&self, playlist_id: &str) -> Vec<String> {
        let Some(html) = self.fetch_page(playlist_id) else {
            return Vec::new();
        };

        let ids = self.extract_track_ids(&html);
        if ids.is_empty() {
            warn!("No tracks found in embed page HTML");
        } else {
            info!("Found {} track ids in embed page HTML", ids.len());
        }
        ids
    }
}
