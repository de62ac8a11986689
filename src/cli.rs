//! Command-line interface for the subscribe entry point.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::stream::{StartPosition, StreamOptions};

/// Subscribe to GCN circulars and post them to a Slack channel.
#[derive(Parser, Debug)]
#[command(name = "gcn-slack", version, about, long_about = None)]
pub struct Cli {
    /// Broker URL (host[:port]/topic) to subscribe to.
    #[arg(short = 'b', long, value_name = "URL")]
    pub broker_url: String,

    /// Set client configuration from file.
    #[arg(short = 'F', long, value_name = "FILE", conflicts_with = "config")]
    pub config_file: Option<PathBuf>,

    /// Set client configuration via prop=val. Can be specified multiple times.
    #[arg(short = 'X', long = "config", value_name = "PROP=VAL", action = ArgAction::Append)]
    pub config: Vec<String>,

    /// Treat received messages as JSON circulars and format them before
    /// posting. Without this flag the raw record is posted as-is.
    #[arg(short = 'j', long)]
    pub json: bool,

    /// Stream from the earliest available offset. Default: latest.
    #[arg(short = 'e', long)]
    pub earliest: bool,

    /// Time (in seconds) to wait for new messages.
    #[arg(short = 't', long, value_name = "SECONDS", default_value_t = 10)]
    pub timeout: u64,

    /// Listen to messages indefinitely instead of stopping at
    /// end-of-stream.
    #[arg(short = 'p', long)]
    pub persist: bool,

    /// Path to the Slack settings file.
    #[arg(short = 'S', long, value_name = "FILE")]
    pub slack_config_file: PathBuf,
}

impl Cli {
    /// Builds the stream options implied by the subscription flags.
    pub fn stream_options(&self, auth_token: Option<String>) -> StreamOptions {
        StreamOptions {
            start_at: if self.earliest {
                StartPosition::Earliest
            } else {
                StartPosition::Latest
            },
            timeout: Some(Duration::from_secs(self.timeout)),
            persist: self.persist,
            auth_token,
        }
    }
}
