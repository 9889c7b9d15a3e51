//! Decoding of the system status updates pushed over the feed socket.
//!
//! A message is a JSON object with four required fields:
//!
//! ```json
//! {
//!     "barrelsInfo": ["rmi://10.0.0.4:1099/barrel1|12|0.5|100"],
//!     "downloadersInfo": ["downloader-1"],
//!     "urlsToProcess": 7,
//!     "topSearches": ["cats|10"]
//! }
//! ```
//!
//! Missing top level fields fail the whole message. Individual barrel and
//! search entries are packed as `|` separated strings, a bad entry is logged
//! and dropped without affecting the others.
use serde::Deserialize;
use shared::response::{BarrelStatus, SearchCount, StatusSnapshot};

use crate::error::{DecodeError, MalformedRecord};

const BARREL_FIELDS: usize = 4;
const SEARCH_FIELDS: usize = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatus {
    barrels_info: Vec<Option<String>>,
    downloaders_info: Vec<Option<String>>,
    urls_to_process: u64,
    top_searches: Vec<Option<String>>,
}

fn parse_float(field: &'static str, value: &str) -> Result<f64, MalformedRecord> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| MalformedRecord::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_count(field: &'static str, value: &str) -> Result<u64, MalformedRecord> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| MalformedRecord::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

/// Parses `endpointUrl|averageResponseTimeMs|load|requestCount`.
pub fn parse_barrel(entry: &str) -> Result<BarrelStatus, MalformedRecord> {
    let fields: Vec<&str> = entry.split('|').collect();
    if fields.len() < BARREL_FIELDS {
        return Err(MalformedRecord::MissingFields {
            expected: BARREL_FIELDS,
            found: fields.len(),
        });
    }

    let barrel = BarrelStatus {
        endpoint_url: fields[0].trim().to_string(),
        average_response_time_ms: parse_float("averageResponseTimeMs", fields[1])?,
        load: parse_float("load", fields[2])?,
        request_count: parse_count("requestCount", fields[3])?,
    };

    if !barrel.has_valid_endpoint() {
        return Err(MalformedRecord::InvalidEndpoint(barrel.endpoint_url));
    }

    Ok(barrel)
}

/// Parses `term|count`.
pub fn parse_search_count(entry: &str) -> Result<SearchCount, MalformedRecord> {
    let (term, count) = entry
        .split_once('|')
        .ok_or(MalformedRecord::MissingFields {
            expected: SEARCH_FIELDS,
            found: 1,
        })?;

    Ok(SearchCount {
        term: term.to_string(),
        count: parse_count("count", count)?,
    })
}

// Runs `parse` over every entry, keeping the ones that decode.
fn collect_records<T>(
    kind: &str,
    entries: Vec<Option<String>>,
    parse: impl Fn(&str) -> Result<T, MalformedRecord>,
) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let Some(entry) = entry else {
                tracing::warn!(kind, "skipping null status record");
                return None;
            };

            match parse(&entry) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(kind, entry = %entry, error = %err, "skipping malformed status record");
                    None
                }
            }
        })
        .collect()
}

/// Decodes a raw status message. `None` stands in for a message without a
/// text body.
pub fn decode_status(raw: Option<&str>) -> Result<StatusSnapshot, DecodeError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(DecodeError::EmptyPayload),
    };

    let parsed: RawStatus = serde_json::from_str(raw)
        .map_err(|err| DecodeError::MalformedPayload(err.to_string()))?;

    Ok(StatusSnapshot {
        barrels: collect_records("barrel", parsed.barrels_info, parse_barrel),
        downloader_ids: collect_records("downloader", parsed.downloaders_info, |id| {
            Ok(id.to_string())
        }),
        urls_pending_count: parsed.urls_to_process,
        top_searches: collect_records("top_search", parsed.top_searches, parse_search_count),
    })
}
