//! Client side of the Googol search console: the live system status feed,
//! paginated search and the indexing/backlink routes.
pub mod api;
pub mod error;
pub mod feed;
pub mod menu;
pub mod pager;
pub mod reconnect;
pub mod status;

pub use api::{GoogolClient, IndexReport};
pub use error::{ClientError, ClientResult, DecodeError, MalformedRecord};
pub use feed::{SessionSummary, StatusFeedClient, StatusRenderer};
pub use pager::{PageOutcome, PageRequest, SearchPager};
pub use reconnect::FeedSupervisor;
pub use status::decode_status;
