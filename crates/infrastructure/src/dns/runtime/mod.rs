//! Tokio adapter for the async-engine port.

mod event_loop;
mod tokio_engine;

pub use event_loop::EventLoop;
pub use tokio_engine::TokioEngine;
