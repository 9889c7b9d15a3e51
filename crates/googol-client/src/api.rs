use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::config::{FeedEndpoint, UserSettings};
use shared::constants::APP_USER_AGENT;
use shared::request::{QueryParam, SearchParam, UrlParam};
use shared::response::{BulkIndexOutcome, SearchResultPage, Story};
use url::Url;

use crate::error::{ClientError, ClientResult, DecodeError};
use crate::pager::decode_page;

/// Result of submitting one or more URLs for indexing, with the message the
/// console shows for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexReport {
    pub submitted: Vec<String>,
    pub failed: Vec<String>,
    pub message: String,
}

impl IndexReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Typed access to the console's `/api` routes.
#[derive(Clone, Debug)]
pub struct GoogolClient {
    client: Client,
    base_url: Url,
}

impl GoogolClient {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn from_settings(settings: &UserSettings) -> ClientResult<Self> {
        Self::new(
            &settings.base_url,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_text(&self, path: &str) -> ClientResult<String> {
        let res = self
            .client
            .get(self.endpoint(path)?)
            .send()
            .await?
            .error_for_status()?;

        Ok(res.text().await?)
    }

    async fn fetch_setting(&self, setting: &'static str, path: &str) -> ClientResult<String> {
        let value = self
            .get_text(path)
            .await
            .map_err(|err| ClientError::ConfigurationUnavailable {
                setting,
                reason: err.to_string(),
            })?;

        let value = value.trim();
        if value.is_empty() {
            return Err(ClientError::ConfigurationUnavailable {
                setting,
                reason: "empty value".into(),
            });
        }

        Ok(value.to_string())
    }

    /// Fetches host, port & path of the status socket. The three lookups are
    /// independent, any one failing fails the whole thing.
    pub async fn feed_endpoint(&self) -> ClientResult<FeedEndpoint> {
        let (host, port, path) = tokio::join!(
            self.fetch_setting("host", "api/config/host"),
            self.fetch_setting("port", "api/config/port"),
            self.fetch_setting("websocket-endpoint", "api/config/websocket-endpoint"),
        );

        let host = host?;
        let port = port?;
        let path = path?;
        let port = port
            .parse::<u16>()
            .map_err(|err| ClientError::ConfigurationUnavailable {
                setting: "port",
                reason: format!("`{port}` is not a valid port: {err}"),
            })?;

        log::debug!("backend reported feed at {}:{}/{}", host, port, path);
        Ok(FeedEndpoint::new(&host, port, &path))
    }

    /// Requests a single page of results.
    pub async fn search(&self, param: &SearchParam) -> ClientResult<SearchResultPage> {
        log::debug!(
            "searching `{}` page {} (fresh: {})",
            param.query,
            param.page,
            param.is_fresh_search
        );

        let body = self
            .client
            .get(self.endpoint("api/search")?)
            .query(param)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        decode_page(&body)
    }

    /// Submits a single URL. The backend answers with a truthy/falsy body.
    pub async fn index_url(&self, url: &str) -> ClientResult<bool> {
        let body = self
            .client
            .post(self.endpoint("api/index")?)
            .form(&UrlParam {
                url: url.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(is_truthy(&body))
    }

    /// Submits several URLs at once. An empty answer means all of them were
    /// queued, otherwise the backend lists what failed.
    pub async fn index_urls(&self, urls: &[String]) -> ClientResult<BulkIndexOutcome> {
        let form = urls
            .iter()
            .map(|url| ("urls", url.as_str()))
            .collect::<Vec<_>>();

        let body = self
            .client
            .post(self.endpoint("api/index/multiple")?)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(parse_bulk_outcome(&body, urls))
    }

    /// Indexes the given URLs, picking the single or bulk route as needed.
    pub async fn index(&self, urls: &[String]) -> ClientResult<IndexReport> {
        let submitted = urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(|url| url.to_string())
            .collect::<Vec<_>>();

        let report = if submitted.is_empty() {
            IndexReport {
                submitted,
                failed: Vec::new(),
                message: "Nothing to index".into(),
            }
        } else if submitted.len() == 1 {
            let single = submitted[0].clone();
            if self.index_url(&single).await? {
                IndexReport {
                    submitted,
                    failed: Vec::new(),
                    message: "Indexation successful".into(),
                }
            } else {
                IndexReport {
                    submitted,
                    failed: vec![single],
                    message: "Indexation failed".into(),
                }
            }
        } else {
            match self.index_urls(&submitted).await? {
                BulkIndexOutcome::AllIndexed => IndexReport {
                    submitted,
                    failed: Vec::new(),
                    message: "Indexation successful".into(),
                },
                BulkIndexOutcome::Failed(failed) => IndexReport {
                    message: format!(
                        "Failed to index the following URLs: {}",
                        failed.join(", ")
                    ),
                    submitted,
                    failed,
                },
            }
        };

        Ok(report)
    }

    /// Pages linking to `url`.
    pub async fn fathers(&self, url: &str) -> ClientResult<Vec<String>> {
        let res = self
            .client
            .get(self.endpoint("api/fathers")?)
            .query(&UrlParam {
                url: url.to_string(),
            })
            .send()
            .await?
            .error_for_status()?;

        let fathers: Option<Vec<Option<String>>> = json_or_none(res).await?;
        Ok(fathers.unwrap_or_default().into_iter().flatten().collect())
    }

    /// AI generated summary for a query.
    pub async fn analysis(&self, query: &str) -> ClientResult<String> {
        let body = self
            .client
            .get(self.endpoint("api/analysis/google")?)
            .query(&QueryParam {
                query: query.to_string(),
            })
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(body)
    }

    /// Hacker News stories matching the query terms.
    pub async fn related_stories(&self, query: &str) -> ClientResult<Vec<Story>> {
        let res = self
            .client
            .get(self.endpoint("api/hacker-news")?)
            .query(&QueryParam {
                query: query.to_string(),
            })
            .send()
            .await?
            .error_for_status()?;

        let stories: Option<Vec<Story>> = json_or_none(res).await?;
        Ok(stories.unwrap_or_default())
    }

    /// Queues every story that links somewhere for indexing.
    pub async fn index_stories(&self, stories: &[Story]) -> ClientResult<BulkIndexOutcome> {
        let urls = stories
            .iter()
            .filter_map(|story| story.url.clone())
            .collect::<Vec<_>>();

        if urls.is_empty() {
            return Ok(BulkIndexOutcome::AllIndexed);
        }

        self.index_urls(&urls).await
    }
}

// Empty bodies come back for `null` results from the backend.
async fn json_or_none<T: DeserializeOwned>(res: Response) -> ClientResult<Option<T>> {
    let body = res.text().await?;
    if body.trim().is_empty() {
        return Ok(None);
    }

    let value = serde_json::from_str::<Option<T>>(&body)
        .map_err(|err| DecodeError::MalformedPayload(err.to_string()))?;
    Ok(value)
}

// Routes are joined relative to the base so a path prefix such as
// `http://host/googol` is kept, which needs the trailing slash.
fn normalize_base_url(base_url: &str) -> ClientResult<Url> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Mirrors how the console judged the single index response.
pub fn is_truthy(body: &str) -> bool {
    let body = body.trim();
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Bool(value)) => value,
        Ok(Value::Null) => false,
        Ok(Value::Number(num)) => num.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Ok(Value::String(s)) => !s.is_empty(),
        Ok(_) => true,
        Err(_) => !body.is_empty() && !body.eq_ignore_ascii_case("false"),
    }
}

/// The bulk route answers with nothing on success, or with either the
/// failed indices into `submitted` or the failed URLs themselves.
pub fn parse_bulk_outcome(body: &str, submitted: &[String]) -> BulkIndexOutcome {
    let body = body.trim();
    if body.is_empty() {
        return BulkIndexOutcome::AllIndexed;
    }

    let failed = match serde_json::from_str::<Value>(body) {
        Ok(Value::Null) => Vec::new(),
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Number(idx) => idx.as_u64().map(|idx| {
                    submitted
                        .get(idx as usize)
                        .cloned()
                        .unwrap_or_else(|| idx.to_string())
                }),
                Value::String(url) => Some(url),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Ok(Value::String(text)) if text.is_empty() => Vec::new(),
        Ok(Value::String(text)) => vec![text],
        Ok(other) => vec![other.to_string()],
        Err(_) => vec![body.to_string()],
    };

    if failed.is_empty() {
        BulkIndexOutcome::AllIndexed
    } else {
        BulkIndexOutcome::Failed(failed)
    }
}
