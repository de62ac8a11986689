//! A client for posting messages to Slack.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::config::SlackSettings;
use crate::core::NotificationSink;

/// The Slack chat.postMessage endpoint.
pub const SLACK_POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// Errors raised while posting a message. The dispatcher logs these and
/// moves on; nothing is retried.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP request to Slack failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Slack returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Slack API rejected the message: {0}")]
    Api(String),
}

/// Posts messages to a Slack channel via the chat.postMessage API.
pub struct SlackClient {
    api_url: String,
    http: reqwest::Client,
}

impl SlackClient {
    /// Creates a client against the production Slack API.
    pub fn new() -> Result<Self, SinkError> {
        Self::with_api_url(SLACK_POST_MESSAGE_URL)
    }

    /// Creates a client against a custom endpoint (used by tests).
    pub fn with_api_url(api_url: impl Into<String>) -> Result<Self, SinkError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            api_url: api_url.into(),
            http,
        })
    }
}

#[async_trait]
impl NotificationSink for SlackClient {
    /// Posts `text` as a form-encoded chat.postMessage call and logs the
    /// JSON acknowledgment.
    async fn post(&self, settings: &SlackSettings, text: &str) -> Result<(), SinkError> {
        let channel = format!("#{}", settings.default_channel);
        let params = [
            ("token", settings.token.as_str()),
            ("channel", channel.as_str()),
            ("text", text),
            ("icon_url", settings.icon_url.as_str()),
            ("username", settings.username.as_str()),
        ];

        let response = self.http.post(&self.api_url).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, %body, "failed to post message to Slack");
            return Err(SinkError::Status { status, body });
        }

        let ack: Value = response.json().await?;
        info!(result = %ack, "posting result");
        if ack.get("ok").and_then(Value::as_bool) == Some(false) {
            let reason = ack
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(SinkError::Api(reason));
        }
        Ok(())
    }
}

#[cfg(test)]
mod slack_client_tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_settings() -> SlackSettings {
        SlackSettings {
            token: "xoxb-secret".to_string(),
            username: "gcn-bot".to_string(),
            icon_url: "https://example.org/icon.png".to_string(),
            default_channel: "astro-alerts".to_string(),
            topic_channel_mapping: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_post_sends_all_form_fields() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat.postMessage"))
            .and(body_string_contains("token=xoxb-secret"))
            .and(body_string_contains("channel=%23astro-alerts"))
            .and(body_string_contains("text=hello"))
            .and(body_string_contains("username=gcn-bot"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
            })))
            .mount(&server)
            .await;

        let client =
            SlackClient::with_api_url(format!("{}/api/chat.postMessage", server.uri())).unwrap();

        // Act
        let result = client.post(&test_settings(), "hello").await;

        // Assert
        assert!(result.is_ok(), "{result:?}");
    }

    #[tokio::test]
    async fn test_post_handles_server_error() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = SlackClient::with_api_url(server.uri()).unwrap();

        // Act
        let result = client.post(&test_settings(), "hello").await;

        // Assert
        assert!(matches!(result, Err(SinkError::Status { .. })), "{result:?}");
    }

    #[tokio::test]
    async fn test_post_surfaces_api_rejection() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "channel_not_found",
            })))
            .mount(&server)
            .await;

        let client = SlackClient::with_api_url(server.uri()).unwrap();

        // Act
        let result = client.post(&test_settings(), "hello").await;

        // Assert
        match result {
            Err(SinkError::Api(reason)) => assert_eq!(reason, "channel_not_found"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
