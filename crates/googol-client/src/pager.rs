use serde_json::Value;
use shared::request::SearchParam;
use shared::response::{SearchResultPage, SearchResultRow, Story};
use tokio::task::JoinHandle;

use crate::api::GoogolClient;
use crate::error::{ClientError, ClientResult, DecodeError};

fn field_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_sentinel(row: &[Value]) -> Result<u32, DecodeError> {
    let malformed = || DecodeError::MalformedPayload(format!("invalid last page sentinel {row:?}"));
    match row {
        [Value::Number(num)] => num
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(malformed),
        [Value::String(s)] => s.trim().parse::<u32>().map_err(|_| malformed()),
        _ => Err(malformed()),
    }
}

/// Decodes a `/api/search` response: a list of rows whose last entry is a
/// one element `[lastPageIndex]` sentinel.
pub fn decode_page(body: &str) -> ClientResult<SearchResultPage> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ClientError::NoResults);
    }

    let raw: Option<Vec<Option<Vec<Value>>>> = serde_json::from_str(body)
        .map_err(|err| DecodeError::MalformedPayload(err.to_string()))?;

    let mut raw = match raw {
        Some(rows) if !rows.is_empty() => rows,
        _ => return Err(ClientError::NoResults),
    };

    let sentinel = raw
        .pop()
        .flatten()
        .ok_or_else(|| DecodeError::MalformedPayload("missing last page sentinel".into()))?;
    let last_page_index = parse_sentinel(&sentinel)?;

    let rows = raw
        .into_iter()
        .flatten()
        .filter(|fields| match fields.first() {
            Some(first) => !field_to_string(first).is_empty(),
            None => false,
        })
        .map(|fields| SearchResultRow {
            fields: fields.iter().map(field_to_string).collect(),
        })
        .collect();

    Ok(SearchResultPage {
        rows,
        last_page_index,
    })
}

/// A search request tagged with the id it was issued under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub id: u64,
    pub param: SearchParam,
}

#[derive(Debug)]
pub enum PageOutcome {
    Page {
        page: SearchResultPage,
        /// First page of a newly submitted query.
        fresh: bool,
    },
    /// The backend had nothing for this query.
    Empty,
    Failed(ClientError),
    /// A newer request was issued before this one came back.
    Stale,
}

/// Owns the page cursor for the current query. Every request gets a
/// monotonically increasing id and only the latest one is applied.
#[derive(Clone, Debug)]
pub struct SearchPager {
    query: Option<String>,
    page: u32,
    last_page: u32,
    page_size: u32,
    next_id: u64,
    latest: Option<u64>,
}

impl SearchPager {
    pub fn new(page_size: u32) -> Self {
        Self {
            query: None,
            page: 0,
            last_page: 0,
            page_size: page_size.max(1),
            next_id: 0,
            latest: None,
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Current 0-based page.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn last_page(&self) -> u32 {
        self.last_page
    }

    fn issue(&mut self, is_fresh_search: bool) -> Option<PageRequest> {
        let query = self.query.clone()?;
        self.next_id += 1;
        self.latest = Some(self.next_id);

        Some(PageRequest {
            id: self.next_id,
            param: SearchParam {
                query,
                page: self.page,
                page_size: self.page_size,
                is_fresh_search,
            },
        })
    }

    /// Starts a new search from the first page. Blank queries are ignored.
    pub fn submit(&mut self, query: &str) -> Option<PageRequest> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }

        self.query = Some(query.to_string());
        self.page = 0;
        self.last_page = 0;
        self.issue(true)
    }

    pub fn next_page(&mut self) -> Option<PageRequest> {
        if self.query.is_none() || self.page >= self.last_page {
            return None;
        }

        self.page += 1;
        self.issue(false)
    }

    pub fn previous_page(&mut self) -> Option<PageRequest> {
        if self.query.is_none() || self.page == 0 {
            return None;
        }

        self.page -= 1;
        self.issue(false)
    }

    /// Applies the response for `request`, discarding it if it is stale.
    pub fn complete(
        &mut self,
        request: &PageRequest,
        result: ClientResult<SearchResultPage>,
    ) -> PageOutcome {
        if self.latest != Some(request.id) {
            log::debug!(
                "discarding stale search response #{} (latest #{:?})",
                request.id,
                self.latest
            );
            return PageOutcome::Stale;
        }

        match result {
            Ok(page) => {
                self.last_page = page.last_page_index;
                let fresh = request.param.is_fresh_search;
                if fresh {
                    self.page = 0;
                }

                PageOutcome::Page { page, fresh }
            }
            Err(ClientError::NoResults) => PageOutcome::Empty,
            Err(err) => {
                log::error!("search request #{} failed: {}", request.id, err);
                PageOutcome::Failed(err)
            }
        }
    }

    /// Runs `request` and applies its result.
    pub async fn fetch(&mut self, api: &GoogolClient, request: &PageRequest) -> PageOutcome {
        let result = api.search(&request.param).await;
        self.complete(request, result)
    }
}

/// Best effort lookups that accompany a fresh search. Either may fail without
/// affecting the results themselves; dropping the handles detaches them.
pub struct AuxiliaryLookups {
    pub analysis: JoinHandle<ClientResult<String>>,
    pub stories: JoinHandle<ClientResult<Vec<Story>>>,
}

pub fn spawn_auxiliary_lookups(api: &GoogolClient, query: &str) -> AuxiliaryLookups {
    let analysis = {
        let api = api.clone();
        let query = query.to_string();
        tokio::spawn(async move { api.analysis(&query).await })
    };

    let stories = {
        let api = api.clone();
        let query = query.to_string();
        tokio::spawn(async move { api.related_stories(&query).await })
    };

    AuxiliaryLookups { analysis, stories }
}

#[cfg(test)]
mod test {
    use super::{decode_page, PageOutcome, SearchPager};
    use crate::error::{ClientError, DecodeError};
    use shared::response::SearchResultPage;

    #[test]
    fn test_decode_page_with_sentinel() {
        let body = r#"[["https://a.example", "A", "first"], ["https://b.example", "B", "second"], [3]]"#;
        let page = decode_page(body).expect("Unable to decode");

        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.last_page_index, 3);
        assert_eq!(page.rows[1].title(), Some("B"));
    }

    #[test]
    fn test_decode_page_string_sentinel() {
        let page = decode_page(r#"[["https://a.example", "A", "first"], ["0"]]"#)
            .expect("Unable to decode");
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.last_page_index, 0);
    }

    #[test]
    fn test_decode_page_only_sentinel() {
        let page = decode_page("[[5]]").expect("Unable to decode");
        assert!(page.rows.is_empty());
        assert_eq!(page.last_page_index, 5);
    }

    #[test]
    fn test_decode_page_no_results() {
        for body in ["", "  ", "null", "[]"] {
            assert!(
                matches!(decode_page(body), Err(ClientError::NoResults)),
                "expected no results for {body:?}"
            );
        }
    }

    #[test]
    fn test_decode_page_drops_rows_without_url() {
        let body = r#"[[null, "No url"], null, ["", "Empty url"], [], ["https://ok.example", null, "snippet"], [1]]"#;
        let page = decode_page(body).expect("Unable to decode");

        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].url(), "https://ok.example");
        assert_eq!(page.rows[0].title(), Some(""));
        assert_eq!(page.rows[0].snippet(), Some("snippet"));
    }

    #[test]
    fn test_decode_page_bad_sentinel() {
        for body in [r#"[["https://a.example", "A"]]"#, r#"[[1, 2]]"#, r#"[[-1]]"#, "[null]"] {
            assert!(
                matches!(
                    decode_page(body),
                    Err(ClientError::DecodeError(DecodeError::MalformedPayload(_)))
                ),
                "expected malformed payload for {body}"
            );
        }
    }

    fn page(last_page_index: u32) -> SearchResultPage {
        SearchResultPage {
            rows: Vec::new(),
            last_page_index,
        }
    }

    #[test]
    fn test_pager_navigation() {
        let mut pager = SearchPager::new(10);
        assert!(pager.next_page().is_none());
        assert!(pager.submit("   ").is_none());

        let request = pager.submit("rust").expect("request");
        assert!(request.param.is_fresh_search);
        assert_eq!(request.param.page, 0);
        assert_eq!(request.param.page_size, 10);

        // Nothing known about the page count yet.
        assert!(pager.next_page().is_none());
        assert!(matches!(
            pager.complete(&request, Ok(page(2))),
            PageOutcome::Page { fresh: true, .. }
        ));
        assert_eq!(pager.last_page(), 2);

        assert!(pager.previous_page().is_none());
        let second = pager.next_page().expect("request");
        assert_eq!(second.param.page, 1);
        assert!(!second.param.is_fresh_search);
        pager.complete(&second, Ok(page(2)));

        let third = pager.next_page().expect("request");
        assert_eq!(third.param.page, 2);
        pager.complete(&third, Ok(page(2)));
        assert!(pager.next_page().is_none());

        let back = pager.previous_page().expect("request");
        assert_eq!(back.param.page, 1);
    }

    #[test]
    fn test_pager_discards_stale_responses() {
        let mut pager = SearchPager::new(10);
        let first = pager.submit("rust").expect("request");
        pager.complete(&first, Ok(page(4)));

        let slow = pager.next_page().expect("request");
        let fast = pager.next_page().expect("request");
        assert!(fast.id > slow.id);

        assert!(matches!(
            pager.complete(&fast, Ok(page(4))),
            PageOutcome::Page { fresh: false, .. }
        ));
        // The slow response arrives last and must not clobber the cursor.
        assert!(matches!(
            pager.complete(&slow, Ok(page(9))),
            PageOutcome::Stale
        ));
        assert_eq!(pager.last_page(), 4);
        assert_eq!(pager.page(), 2);
    }

    #[test]
    fn test_pager_empty_and_failed() {
        let mut pager = SearchPager::new(10);
        let request = pager.submit("nothing").expect("request");
        assert!(matches!(
            pager.complete(&request, Err(ClientError::NoResults)),
            PageOutcome::Empty
        ));

        let request = pager.submit("broken").expect("request");
        let outcome = pager.complete(
            &request,
            Err(ClientError::DecodeError(DecodeError::MalformedPayload(
                "bad".into(),
            ))),
        );
        assert!(matches!(outcome, PageOutcome::Failed(_)));
    }
}
