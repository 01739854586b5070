pub mod auth;
pub mod errors;
pub mod inquiries;
pub mod packages;
pub mod stats;
