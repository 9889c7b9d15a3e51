use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lifecycle of the status feed connection.
#[derive(AsRefStr, Display, Clone, Debug, PartialEq, Eq)]
pub enum FeedEvent {
    Connected,
    Disconnected { error: Option<String> },
    /// Only emitted when a reconnect policy is layered on top of the client.
    Reconnecting { attempt: usize },
    GaveUp { attempts: usize },
}

/// What the operation form currently submits.
#[derive(
    AsRefStr, Display, EnumString, Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OperationType {
    #[default]
    Search,
    Index,
    Fathers,
}
