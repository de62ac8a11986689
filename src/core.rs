//! Core domain types and service traits.
//!
//! This module defines the fundamental data structures and trait contracts
//! that govern component interactions throughout the application.

use crate::notification::slack::SinkError;
use crate::stream::StreamError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SlackSettings;

/// A GCN circular as received from the broker: a header of scalar fields
/// plus a free-text body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Circular {
    /// Header fields (`title`, `number`, `subject`, `date`, `from`, ...).
    pub header: serde_json::Map<String, Value>,
    /// The free-text body of the circular.
    pub body: String,
}

// =============================================================================
// Service Traits
// =============================================================================

/// A lazy, non-restartable sequence of records read from a broker topic.
///
/// `Ok(None)` signals end-of-stream; an `Err` is fatal to the consume loop.
#[async_trait]
pub trait StreamSource: Send {
    /// Returns the next record from the stream.
    ///
    /// # Returns
    /// * `Ok(Some(record))` when a record was received
    /// * `Ok(None)` at end-of-stream
    /// * `Err` for transport failures
    async fn next_record(&mut self) -> Result<Option<Value>, StreamError>;
}

/// Sends one message to a notification service.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Posts `text` using the credentials and channel in `settings`.
    ///
    /// # Returns
    /// * `Ok(())` if the service acknowledged the message
    /// * `Err` on transport failure or an API-level rejection
    async fn post(&self, settings: &SlackSettings, text: &str) -> Result<(), SinkError>;
}
