pub mod analytics;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod ingest;
pub mod model;
pub mod notify;
pub mod server;
pub mod storage;
