use serde::{Deserialize, Serialize};

/// One index/storage shard as reported in a status update.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct BarrelStatus {
    /// Absolute URL of the barrel, e.g. `rmi://10.0.0.4:1099/barrel-2`.
    pub endpoint_url: String,
    pub average_response_time_ms: f64,
    /// Unit defined by the backend, only displayed.
    pub load: f64,
    pub request_count: u64,
}

impl BarrelStatus {
    fn segments(&self) -> Vec<&str> {
        self.endpoint_url.split('/').collect()
    }

    /// Machine the barrel runs on (third `/` segment of the endpoint).
    pub fn host(&self) -> &str {
        self.endpoint_url.split('/').nth(2).unwrap_or_default()
    }

    /// Barrel name (last `/` segment of the endpoint).
    pub fn name(&self) -> &str {
        self.endpoint_url.rsplit('/').next().unwrap_or_default()
    }

    /// An endpoint needs a scheme, an empty segment, a host and a name.
    pub fn has_valid_endpoint(&self) -> bool {
        let segments = self.segments();
        segments.len() >= 4 && !self.host().is_empty() && !self.name().is_empty()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchCount {
    pub term: String,
    pub count: u64,
}

/// A decoded status update. Each one replaces the previous snapshot entirely.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct StatusSnapshot {
    pub barrels: Vec<BarrelStatus>,
    pub downloader_ids: Vec<String>,
    pub urls_pending_count: u64,
    /// Ranked by the backend, kept in that order.
    pub top_searches: Vec<SearchCount>,
}

/// A single ranked hit, typically `[url, title, snippet, ...]`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchResultRow {
    pub fields: Vec<String>,
}

impl SearchResultRow {
    fn field(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(|s| s.as_str())
    }

    pub fn url(&self) -> &str {
        self.field(0).unwrap_or_default()
    }

    pub fn title(&self) -> Option<&str> {
        self.field(1)
    }

    pub fn snippet(&self) -> Option<&str> {
        self.field(2)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SearchResultPage {
    pub rows: Vec<SearchResultRow>,
    /// 0-based index of the last page available for this query.
    pub last_page_index: u32,
}

/// Hacker News story matching a search.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Story {
    pub id: u64,
    pub title: String,
    pub url: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum BulkIndexOutcome {
    AllIndexed,
    Failed(Vec<String>),
}
