pub mod metrics;

pub use metrics::{export, register_metrics};
