pub mod api {
    pub mod client;
    pub mod error;
    pub mod timeout;
}

pub mod clock;
pub mod config;
pub mod logger;
pub mod models;
