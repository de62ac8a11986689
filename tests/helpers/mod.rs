//! Shared test doubles for the integration tests.
#![allow(dead_code)]

pub mod fake_stream;
pub mod mock_sink;

use gcn_slack::config::SlackSettings;

pub fn test_settings() -> SlackSettings {
    SlackSettings {
        token: "xoxb-secret".to_string(),
        username: "gcn-bot".to_string(),
        icon_url: "https://example.org/icon.png".to_string(),
        default_channel: "astro-alerts".to_string(),
        topic_channel_mapping: Vec::new(),
    }
}
