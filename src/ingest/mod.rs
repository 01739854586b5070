pub mod buffer;
pub mod geoip;
pub mod handler;
pub mod ratelimit;
pub mod visit_id;
