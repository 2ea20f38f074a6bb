pub mod health;

pub use health::{HealthTrackingUpstreams, ServerHealth, ServerStatus};
