pub mod inquiries;
pub mod migrations;
pub mod packages;
pub mod schema;
pub mod visits;
