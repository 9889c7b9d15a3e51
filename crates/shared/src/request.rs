use serde::{Deserialize, Serialize};

/// Query string for `/api/search`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchParam {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
    pub is_fresh_search: bool,
}

impl SearchParam {
    pub fn fresh(query: &str, page_size: u32) -> Self {
        Self {
            query: query.to_string(),
            page: 0,
            page_size,
            is_fresh_search: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QueryParam {
    pub query: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct UrlParam {
    pub url: String,
}
