pub mod loader;
pub mod short_feed;
pub mod storage;
