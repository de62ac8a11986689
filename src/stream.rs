//! Broker client for the GCN circular stream.
//!
//! This module handles connecting to the broker over WebSocket, parsing
//! incoming records, and managing reconnection logic in persist mode.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::core::StreamSource;

const INITIAL_BACKOFF_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 60_000;

/// Errors raised by the broker stream. All of these are fatal to the
/// consume loop outside of persist mode.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to connect to broker {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("broker connection error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("invalid client configuration: {0}")]
    Credentials(String),
}

/// Where in the topic's history a new reader begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPosition {
    Earliest,
    #[default]
    Latest,
}

impl std::fmt::Display for StartPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartPosition::Earliest => write!(f, "earliest"),
            StartPosition::Latest => write!(f, "latest"),
        }
    }
}

/// Options controlling how the broker stream is opened and read.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Start offset for a new reader.
    pub start_at: StartPosition,
    /// How long to wait for a new record before treating the stream as
    /// exhausted. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// When set, reconnect and keep listening instead of stopping at
    /// end-of-stream.
    pub persist: bool,
    /// Bearer token presented to the broker on connect.
    pub auth_token: Option<String>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            start_at: StartPosition::default(),
            timeout: Some(Duration::from_secs(10)),
            persist: false,
            auth_token: None,
        }
    }
}

/// Client configuration passed through to the broker, from a TOML file
/// (`-F`) or from repeated `prop=val` pairs (`-X`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientCredentials {
    properties: HashMap<String, String>,
}

impl ClientCredentials {
    /// Reads credentials from a TOML file of string properties.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        let text = std::fs::read_to_string(&path).map_err(|e| {
            StreamError::Credentials(format!(
                "cannot read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let table: toml::Table = text
            .parse()
            .map_err(|e| StreamError::Credentials(format!("invalid TOML: {e}")))?;

        let mut properties = HashMap::new();
        for (key, value) in table {
            let toml::Value::String(value) = value else {
                return Err(StreamError::Credentials(format!(
                    "property `{key}` must be a string"
                )));
            };
            properties.insert(key, value);
        }
        Ok(Self { properties })
    }

    /// Builds credentials from `prop=val` pairs given on the command line.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self, StreamError> {
        let mut properties = HashMap::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((key, value)) = pair.split_once('=') else {
                return Err(StreamError::Credentials(format!(
                    "expected prop=val, got `{pair}`"
                )));
            };
            properties.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self { properties })
    }

    /// The bearer token used to authenticate against the broker, if any.
    pub fn token(&self) -> Option<&str> {
        self.properties.get("token").map(String::as_str)
    }
}

type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Trait for broker connections to enable testing with fake implementations.
#[async_trait]
pub trait BrokerConnection: Send {
    /// Reads the next frame from the connection.
    ///
    /// # Returns
    /// * `Some(Ok(frame))` when a frame was received
    /// * `Some(Err(error))` on a transport error
    /// * `None` when the connection has been closed
    async fn next_frame(&mut self) -> Option<Result<Message, tungstenite::Error>>;
}

#[async_trait]
impl BrokerConnection for WsConnection {
    async fn next_frame(&mut self) -> Option<Result<Message, tungstenite::Error>> {
        self.next().await
    }
}

/// Opens broker connections for the client, once per (re)connect.
#[async_trait]
pub trait BrokerConnector: Send {
    async fn connect(&mut self) -> Result<Box<dyn BrokerConnection>, StreamError>;
}

/// The production connector: dials the subscribe URL over WebSocket.
struct WsConnector {
    url: String,
    start_at: StartPosition,
    auth_token: Option<String>,
}

impl WsConnector {
    /// The URL the connector subscribes with, carrying the start offset.
    fn subscribe_url(&self) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}start_at={}", self.url, sep, self.start_at)
    }
}

#[async_trait]
impl BrokerConnector for WsConnector {
    async fn connect(&mut self) -> Result<Box<dyn BrokerConnection>, StreamError> {
        let url = self.subscribe_url();
        let mut request = url
            .clone()
            .into_client_request()
            .map_err(|source| StreamError::Connect {
                url: url.clone(),
                source,
            })?;
        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| StreamError::Credentials("token is not a valid header value".into()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (connection, _) = connect_async(request)
            .await
            .map_err(|source| StreamError::Connect { url: url.clone(), source })?;
        info!(%url, "connected to broker");
        Ok(Box::new(connection))
    }
}

/// Broker client that subscribes to a topic URL and yields JSON records.
///
/// The connection is exclusively owned by the client and is closed
/// whenever the client is dropped, so every exit path of the consume
/// loop releases the stream resource.
pub struct BrokerClient {
    options: StreamOptions,
    connector: Box<dyn BrokerConnector>,
    connection: Option<Box<dyn BrokerConnection>>,
    backoff_ms: u64,
}

impl BrokerClient {
    /// Creates a new client for `url`. No connection is made until the
    /// first record is requested.
    pub fn new(url: impl Into<String>, options: StreamOptions) -> Self {
        let connector = WsConnector {
            url: url.into(),
            start_at: options.start_at,
            auth_token: options.auth_token.clone(),
        };
        Self::with_connector(Box::new(connector), options)
    }

    /// Creates a client over a custom connector (primarily for testing).
    pub fn with_connector(connector: Box<dyn BrokerConnector>, options: StreamOptions) -> Self {
        Self {
            options,
            connector,
            connection: None,
            backoff_ms: INITIAL_BACKOFF_MS,
        }
    }

    /// Drops the current connection and, in persist mode, waits out the
    /// current backoff before the next attempt.
    async fn reset_connection(&mut self) {
        self.connection = None;
        if self.options.persist {
            info!("reconnecting in {} ms", self.backoff_ms);
            tokio::time::sleep(Duration::from_millis(self.backoff_ms)).await;
            self.backoff_ms = std::cmp::min(self.backoff_ms * 2, MAX_BACKOFF_MS);
        }
    }
}

#[async_trait]
impl StreamSource for BrokerClient {
    async fn next_record(&mut self) -> Result<Option<Value>, StreamError> {
        loop {
            if self.connection.is_none() {
                match self.connector.connect().await {
                    Ok(connection) => {
                        self.connection = Some(connection);
                        self.backoff_ms = INITIAL_BACKOFF_MS;
                    }
                    Err(e) if self.options.persist => {
                        warn!("connection attempt failed: {e}");
                        self.reset_connection().await;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }
            // Finish the read before touching `self.connection` again; the
            // borrow of the connection must end first.
            let read = {
                let Some(connection) = self.connection.as_mut() else {
                    continue;
                };
                match self.options.timeout {
                    Some(timeout) => tokio::time::timeout(timeout, connection.next_frame()).await,
                    None => Ok(connection.next_frame().await),
                }
            };
            let frame = match read {
                Ok(frame) => frame,
                Err(_) if self.options.persist => continue,
                Err(_) => {
                    info!("no records received within timeout, ending stream");
                    self.connection = None;
                    return Ok(None);
                }
            };

            match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str(&text) {
                    Ok(record) => return Ok(Some(record)),
                    Err(e) => {
                        warn!("skipping unparsable broker record: {e}");
                    }
                },
                Some(Ok(Message::Binary(_)))
                | Some(Ok(Message::Ping(_)))
                | Some(Ok(Message::Pong(_)))
                | Some(Ok(Message::Frame(_))) => {
                    debug!("ignoring non-text frame");
                }
                Some(Ok(Message::Close(_))) | None => {
                    if self.options.persist {
                        info!("broker closed the connection");
                        self.reset_connection().await;
                    } else {
                        info!("end of stream received");
                        self.connection = None;
                        return Ok(None);
                    }
                }
                Some(Err(e)) => {
                    if self.options.persist {
                        warn!("broker connection error: {e}");
                        self.reset_connection().await;
                    } else {
                        self.connection = None;
                        return Err(e.into());
                    }
                }
            }
        }
    }
}
