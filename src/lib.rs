pub mod area_rank;
pub mod cache;
pub mod clients;
pub mod config;
pub mod error;
pub mod http_fetch;
pub mod locale;
pub mod logging;
pub mod name_match;
pub mod resolver;
pub mod server;
pub mod text_clean;
pub mod types;
