//! GCN-to-Slack notification bridge.
//!
//! This library subscribes to a broker topic carrying GCN circulars,
//! formats each circular into a readable Slack message, and posts it to
//! a channel via the Slack API.

pub mod cli;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod formatting;
pub mod notification;
pub mod stream;

// Re-export core types for convenience
pub use crate::core::{Circular, NotificationSink, StreamSource};
