//! Final Standings scraper for published event results pages
//!
//! Results pages are noisy generated markup. The ranked list sits between a
//! "Final Standings" heading and the "Panel of Officials" section, one competitor
//! per line in the form `3. Jane Doe, State University`.

use crate::{Result, SkatingError};
use regex::Regex;
use scraper::Html;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Inclusive start of the standings block
pub const START_ANCHOR: &str = "Final Standings";

/// Exclusive end of the standings block
pub const END_ANCHOR: &str = "Panel of Officials";

/// A ranked line: a placement of 1 to 9 digits without a leading zero, then a dot.
/// `0.` and longer numbers are not placements, so every match fits a `u32`.
const RANKED_LINE: &str = r"^([1-9][0-9]{0,8})\.\s*(.*)$";

/// A ranked line from a standings block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingsEntry {
    pub placement: u32,
    #[serde(rename = "name")]
    pub competitor_name: String,
    #[serde(rename = "university")]
    pub affiliation: Option<String>,
}

/// All ranked entries of one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standings {
    /// Number of ranked entries; shared by every entry of the event
    pub field_size: u32,
    pub entries: Vec<StandingsEntry>,
}

impl Standings {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flatten markup to text, one line per text node
pub fn strip_tags(html: &str) -> String {
    let document = Html::parse_document(html);
    document.root_element().text().collect::<Vec<_>>().join("\n")
}

/// Cut the standings block out of flattened page text
pub fn standings_block(text: &str) -> Result<&str> {
    let start = text.find(START_ANCHOR).ok_or(SkatingError::StandingsNotFound)?;
    let rest = &text[start..];
    match rest.find(END_ANCHOR) {
        Some(end) => Ok(&rest[..end]),
        None => Ok(rest),
    }
}

/// Parse ranked entries out of a results page
pub fn parse_standings(html: &str) -> Result<Standings> {
    let text = strip_tags(html);
    parse_standings_text(&text)
}

/// Parse ranked entries out of already flattened text
pub fn parse_standings_text(text: &str) -> Result<Standings> {
    let block = standings_block(text)?;

    let ranked_line = Regex::new(RANKED_LINE).map_err(|e| SkatingError::Parse(e.to_string()))?;

    let mut entries = Vec::new();
    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = ranked_line.captures(line) else {
            continue;
        };

        let placement: u32 = caps[1]
            .parse()
            .map_err(|e| SkatingError::Parse(format!("placement in {:?}: {}", line, e)))?;

        let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let (competitor_name, affiliation) = match rest.split_once(',') {
            Some((name, affiliation)) => {
                let affiliation = affiliation.trim();
                (
                    name.trim().to_string(),
                    (!affiliation.is_empty()).then(|| affiliation.to_string()),
                )
            }
            None => (rest.trim().to_string(), None),
        };

        entries.push(StandingsEntry {
            placement,
            competitor_name,
            affiliation,
        });
    }

    Ok(Standings {
        field_size: entries.len() as u32,
        entries,
    })
}

/// Fetches results pages and extracts their standings
pub struct StandingsScraper {
    client: reqwest::Client,
    /// Used when the caller gives no timeout
    default_timeout: Option<Duration>,
    /// Optional cache directory for saved results pages
    cache_dir: Option<PathBuf>,
    /// If true, only use cache (no network requests)
    offline_only: bool,
}

impl StandingsScraper {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;

        Ok(StandingsScraper {
            client,
            default_timeout: None,
            cache_dir: None,
            offline_only: false,
        })
    }

    /// Build a scraper from the `[scraper]` config section
    pub fn from_config(config: &crate::ScraperConfig) -> Result<Self> {
        let mut scraper = Self::new(&config.user_agent)?
            .default_timeout(config.timeout_secs.map(Duration::from_secs))
            .offline_only(config.offline);
        if let Some(dir) = &config.cache_dir {
            scraper = scraper.with_cache(dir);
        }
        Ok(scraper)
    }

    pub fn default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Create scraper with a cache directory
    pub fn with_cache<P: AsRef<Path>>(mut self, cache_dir: P) -> Self {
        self.cache_dir = Some(cache_dir.as_ref().to_path_buf());
        self
    }

    /// Set offline-only mode (no network requests, cache must exist)
    pub fn offline_only(mut self, offline: bool) -> Self {
        self.offline_only = offline;
        self
    }

    /// Get the cache file path for a URL
    fn cache_path(&self, url: &str) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| {
            let filename = url
                .replace("https://", "")
                .replace("http://", "")
                .replace(['/', '?', '&', '='], "_")
                + ".html";
            dir.join(filename)
        })
    }

    fn load_from_cache(&self, url: &str) -> Option<String> {
        let path = self.cache_path(url)?;
        if path.exists() {
            log::debug!("Loading from cache: {}", path.display());
            std::fs::read_to_string(&path).ok()
        } else {
            None
        }
    }

    fn save_to_cache(&self, url: &str, html: &str) -> Result<()> {
        if let Some(path) = self.cache_path(url) {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, html)?;
            log::debug!("Saved to cache: {}", path.display());
        }
        Ok(())
    }

    /// Fetch the raw page, from cache when available
    pub async fn fetch_page(&self, url: &str, timeout: Option<Duration>) -> Result<String> {
        if let Some(html) = self.load_from_cache(url) {
            return Ok(html);
        }

        if self.offline_only {
            return Err(SkatingError::Scraper {
                url: url.to_string(),
                message: "No cached page (offline mode)".to_string(),
            });
        }

        log::info!("Fetching {}", url);

        let mut request = self.client.get(url);
        if let Some(timeout) = timeout.or(self.default_timeout) {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(SkatingError::Scraper {
                url: url.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let html = response.text().await?;

        if let Err(e) = self.save_to_cache(url, &html) {
            log::warn!("Failed to cache {}: {}", url, e);
        }

        Ok(html)
    }

    /// Fetch a results page and parse its standings
    pub async fn fetch_standings(&self, url: &str, timeout: Option<Duration>) -> Result<Standings> {
        let html = self.fetch_page(url, timeout).await?;
        let standings = parse_standings(&html)?;
        log::info!(
            "Parsed {} ranked entries from {}",
            standings.entries.len(),
            url
        );
        Ok(standings)
    }

    /// Parse a saved results page directly
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Standings> {
        let html = std::fs::read_to_string(path.as_ref())?;
        parse_standings(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Event 12 Results</title></head><body>
<h2>Intermediate Ladies</h2>
<table>
<tr><th>Final Standings</th></tr>
<tr><td>Pl. Name, Club</td></tr>
<tr><td>1. Alice Moore, State University</td></tr>
<tr><td>2. <b>Bea Lin</b>, Tech Institute</td></tr>
<tr><td>3. Jane Doe, State University</td></tr>
<tr><td>4. Carla Ruiz</td></tr>
</table>
<p>Panel of Officials</p>
<p>1. Referee, Not A Skater</p>
</body></html>"#;

    #[test]
    fn test_parse_ranked_line() {
        let text = "Final Standings\n3. Jane Doe, State University\n";
        let standings = parse_standings_text(text).unwrap();
        assert_eq!(
            standings.entries,
            vec![StandingsEntry {
                placement: 3,
                competitor_name: "Jane Doe".to_string(),
                affiliation: Some("State University".to_string()),
            }]
        );
        assert_eq!(standings.field_size, 1);
    }

    #[test]
    fn test_parse_page_between_anchors() {
        let standings = parse_standings(PAGE).unwrap();
        let placements: Vec<u32> = standings.entries.iter().map(|e| e.placement).collect();
        assert_eq!(placements, vec![1, 2, 3, 4]);
        assert_eq!(standings.field_size, 4);

        // Markup inside a line splits it, dropping the name from the ranked line
        assert_eq!(standings.entries[1].competitor_name, "");
        assert_eq!(standings.entries[1].affiliation, None);
        assert_eq!(standings.entries[3].competitor_name, "Carla Ruiz");
        assert_eq!(standings.entries[3].affiliation, None);
    }

    #[test]
    fn test_missing_start_anchor() {
        let err = parse_standings("<p>1. Alice Moore, State University</p>").unwrap_err();
        assert!(matches!(err, SkatingError::StandingsNotFound));
    }

    #[test]
    fn test_missing_end_anchor_runs_to_end() {
        let text = "Final Standings\n1. A, X\nfootnote\n2. B, Y";
        let standings = parse_standings_text(text).unwrap();
        assert_eq!(standings.entries.len(), 2);
        assert_eq!(standings.entries[1].affiliation.as_deref(), Some("Y"));
    }

    #[test]
    fn test_end_anchor_before_start_is_ignored() {
        let text = "Panel of Officials\nFinal Standings\n1. A, X\n";
        let standings = parse_standings_text(text).unwrap();
        assert_eq!(standings.entries.len(), 1);
    }

    #[test]
    fn test_field_size_is_shared() {
        let mut text = String::from("Final Standings\nPl. Name Club\n");
        for i in 1..=12 {
            text.push_str(&format!("{}. Skater {}, Team {}\n", i, i, i % 3));
        }
        text.push_str("Panel of Officials\n");

        let standings = parse_standings_text(&text).unwrap();
        assert_eq!(standings.entries.len(), 12);
        assert_eq!(standings.field_size, 12);
        for (i, entry) in standings.entries.iter().enumerate() {
            assert_eq!(entry.placement, i as u32 + 1);
        }
    }

    #[test]
    fn test_placement_must_be_positive_and_fit() {
        let text = "Final Standings
0. Zero Entry, State University
1. Alice Moore, State University
00012. Padded, Tech Institute
12345678901. Timestamp, Tech Institute
999999999. Last Place, Tech Institute
";
        let standings = parse_standings_text(text).unwrap();
        let placements: Vec<u32> = standings.entries.iter().map(|e| e.placement).collect();
        assert_eq!(placements, vec![1, 999_999_999]);
        assert_eq!(standings.field_size, 2);
    }

    #[test]
    fn test_affiliation_splits_on_first_comma() {
        let text = "Final Standings\n5.   Jo Park ,  University of X, Main Campus  ";
        let standings = parse_standings_text(text).unwrap();
        let entry = &standings.entries[0];
        assert_eq!(entry.placement, 5);
        assert_eq!(entry.competitor_name, "Jo Park");
        assert_eq!(
            entry.affiliation.as_deref(),
            Some("University of X, Main Campus")
        );
    }

    #[test]
    fn test_non_ranked_lines_are_ignored() {
        let text = "Final Standings\n1st place\n1 Alice\n#2. Bob\n2. Cleo, Z\n";
        let standings = parse_standings_text(text).unwrap();
        assert_eq!(standings.entries.len(), 1);
        assert_eq!(standings.entries[0].competitor_name, "Cleo");
    }

    #[test]
    fn test_entities_are_decoded() {
        let html = "<div>Final Standings</div><div>1. Zo&euml; Hart, A&amp;M</div>";
        let standings = parse_standings(html).unwrap();
        assert_eq!(standings.entries[0].competitor_name, "Zoë Hart");
        assert_eq!(standings.entries[0].affiliation.as_deref(), Some("A&M"));
    }

    #[test]
    fn test_entry_serializes_with_wire_names() {
        let entry = StandingsEntry {
            placement: 2,
            competitor_name: "Bea Lin".to_string(),
            affiliation: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"placement": 2, "name": "Bea Lin", "university": null})
        );
    }

    #[tokio::test]
    async fn test_offline_fetch_reads_cache() {
        let dir = tempfile::tempdir().unwrap();
        let scraper = StandingsScraper::new("test-agent")
            .unwrap()
            .with_cache(dir.path())
            .offline_only(true);

        let url = "https://results.example.org/2025/event12.htm";
        std::fs::write(scraper.cache_path(url).unwrap(), PAGE).unwrap();

        let standings = scraper.fetch_standings(url, None).await.unwrap();
        assert_eq!(standings.field_size, 4);

        let err = scraper
            .fetch_page("https://results.example.org/missing.htm", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SkatingError::Scraper { .. }));
    }
}
