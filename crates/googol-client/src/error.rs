use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Failure to turn a pushed status message into a snapshot. Fatal to that
/// message only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("received an empty payload")]
    EmptyPayload,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

/// A single barrel/search entry that could not be decoded. These are logged
/// and left out of the snapshot, the rest of the message is still used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("expected {expected} `|` separated fields, found {found}")]
    MissingFields { expected: usize, found: usize },
    #[error("invalid barrel endpoint `{0}`")]
    InvalidEndpoint(String),
    #[error("invalid {field} value `{value}`")]
    InvalidNumber { field: &'static str, value: String },
}

#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("unable to fetch `{setting}` configuration: {reason}")]
    ConfigurationUnavailable {
        setting: &'static str,
        reason: String,
    },
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("HTTP request error: {0}")]
    TransportError(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    SocketError(Box<tungstenite::Error>),
    /// Valid empty state, not a failure of the backend.
    #[error("no results")]
    NoResults,
    #[error(transparent)]
    DecodeError(#[from] DecodeError),
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        ClientError::SocketError(Box::new(err))
    }
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::TransportError(_) | ClientError::SocketError(_)
        )
    }

    /// Text safe to show to an end user. Details only go to the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            ClientError::ConfigurationUnavailable { .. } => "Couldn't fetch configuration",
            ClientError::NoResults => "No results found!",
            _ => "An error has occurred",
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
