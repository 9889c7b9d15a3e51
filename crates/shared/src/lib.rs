pub mod config;
pub mod constants;
pub mod event;
pub mod request;
pub mod response;
