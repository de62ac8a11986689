//! The consume loop: stream records in, Slack posts out.

use serde_json::Value;
use tracing::{debug, error};

use crate::config::SlackSettings;
use crate::core::{NotificationSink, StreamSource};
use crate::formatting;
use crate::stream::StreamError;

/// Drives the read loop, posting one message per stream record in
/// arrival order. No retry, no batching, no back-pressure.
pub struct Dispatcher {
    format_messages: bool,
}

impl Dispatcher {
    /// When `format_messages` is set, records are rendered as circulars
    /// before posting; otherwise their raw form is posted as-is.
    pub fn new(format_messages: bool) -> Self {
        Self { format_messages }
    }

    /// Consumes the stream until end-of-stream and returns the number of
    /// records received.
    ///
    /// Formatting and posting failures are logged and isolated to their
    /// record; a stream failure aborts the loop and propagates.
    pub async fn run(
        &self,
        stream: &mut dyn StreamSource,
        settings: &SlackSettings,
        sink: &dyn NotificationSink,
    ) -> Result<u64, StreamError> {
        let mut received = 0u64;

        while let Some(record) = stream.next_record().await? {
            received += 1;
            debug!(record = received, "received record from stream");

            let text = if self.format_messages {
                match formatting::format_record(&record) {
                    Ok(text) => text,
                    Err(e) => {
                        error!(record = received, "cannot format record: {e}");
                        continue;
                    }
                }
            } else {
                raw_text(&record)
            };

            if let Err(e) = sink.post(settings, &text).await {
                error!(record = received, "failed to post message: {e}");
            }
        }

        Ok(received)
    }
}

/// The raw textual form of a record: plain strings pass through
/// unchanged, anything else is rendered as compact JSON.
fn raw_text(record: &Value) -> String {
    match record {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
