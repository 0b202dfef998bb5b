pub mod api;
pub mod collector;
pub mod core;
pub mod monitoring;
pub mod storage;
pub mod transform;
