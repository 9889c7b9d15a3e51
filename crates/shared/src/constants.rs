pub const APP_USER_AGENT: &str = concat!("googol-client/", env!("CARGO_PKG_VERSION"));

// Compiled-in feed defaults, used when the backend can't tell us where the
// status socket lives.
pub const DEFAULT_FEED_HOST: &str = "localhost";
pub const DEFAULT_FEED_PORT: u16 = 8080;
pub const DEFAULT_FEED_PATH: &str = "ws";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
