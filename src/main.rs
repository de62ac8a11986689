//! gcn-slack - GCN circular to Slack bridge
//!
//! Subscribes to a broker topic carrying GCN circulars and posts each
//! message to a Slack channel.

use anyhow::Result;
use clap::Parser;
use gcn_slack::{
    cli::Cli,
    config::SlackSettings,
    dispatcher::Dispatcher,
    notification::slack::SlackClient,
    stream::{BrokerClient, ClientCredentials},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Configuration errors surface before the stream is opened. Duplicate
    // sections are tolerated: reported, but the load continues.
    let loaded = match SlackSettings::load(&cli.slack_config_file) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    for warning in &loaded.warnings {
        eprintln!("Error: {warning}");
    }
    let settings = loaded.settings;

    let credentials = if let Some(path) = &cli.config_file {
        Some(ClientCredentials::from_file(path)?)
    } else if !cli.config.is_empty() {
        Some(ClientCredentials::from_pairs(&cli.config)?)
    } else {
        None
    };
    let auth_token = credentials
        .as_ref()
        .and_then(|c| c.token().map(str::to_string));

    let mut stream = BrokerClient::new(cli.broker_url.clone(), cli.stream_options(auth_token));
    let sink = SlackClient::new()?;
    let dispatcher = Dispatcher::new(cli.json);

    info!(
        broker = %cli.broker_url,
        channel = %settings.default_channel,
        "subscribing to GCN circulars"
    );

    // The stream handle is owned here and dropped on both exit paths, so
    // the connection is released on interrupt as well.
    tokio::select! {
        result = dispatcher.run(&mut stream, &settings, &sink) => {
            let received = result?;
            info!(received, "end of stream reached");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, closing stream");
        }
    }

    Ok(())
}
