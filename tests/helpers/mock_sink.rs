//! A notification sink that records every post it receives.

use std::sync::Mutex;

use async_trait::async_trait;
use gcn_slack::config::SlackSettings;
use gcn_slack::core::NotificationSink;
use gcn_slack::notification::slack::SinkError;

pub struct RecordingSink {
    posts: Mutex<Vec<String>>,
    fail_on: Option<usize>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Fails the nth post (1-based) while still recording it.
    pub fn failing_on(post: usize) -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            fail_on: Some(post),
        }
    }

    pub fn posts(&self) -> Vec<String> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn post(&self, _settings: &SlackSettings, text: &str) -> Result<(), SinkError> {
        let mut posts = self.posts.lock().unwrap();
        posts.push(text.to_string());
        if Some(posts.len()) == self.fail_on {
            return Err(SinkError::Api("channel_not_found".to_string()));
        }
        Ok(())
    }
}
