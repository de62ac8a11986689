//! An in-memory stream source yielding a fixed list of records.

use std::collections::VecDeque;

use async_trait::async_trait;
use gcn_slack::core::StreamSource;
use gcn_slack::stream::StreamError;
use serde_json::Value;

pub struct FakeStream {
    records: VecDeque<Value>,
    trailing_error: Option<StreamError>,
}

impl FakeStream {
    /// A stream that yields `records` and then signals end-of-stream.
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records: records.into(),
            trailing_error: None,
        }
    }

    /// A stream that yields `records` and then fails with `error`.
    pub fn with_trailing_error(records: Vec<Value>, error: StreamError) -> Self {
        Self {
            records: records.into(),
            trailing_error: Some(error),
        }
    }
}

#[async_trait]
impl StreamSource for FakeStream {
    async fn next_record(&mut self) -> Result<Option<Value>, StreamError> {
        if let Some(record) = self.records.pop_front() {
            return Ok(Some(record));
        }
        match self.trailing_error.take() {
            Some(error) => Err(error),
            None => Ok(None),
        }
    }
}
