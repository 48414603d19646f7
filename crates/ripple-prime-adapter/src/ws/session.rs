/*
[INPUT]:  Socket events (open, text frame, error, close) and teardown requests
[OUTPUT]: Actions for the driver: frames to send, envelopes to emit, reconnect scheduling
[POS]:    WebSocket layer - event stream state machine (no I/O)
[UPDATE]: When changing handshake order, filtering, or reconnect rules
*/

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::auth::{Credentials, HmacSigner, epoch_millis};
use crate::http::{PrimeError, Result};

use super::message::{Envelope, EventMessage, InboundMessage, OutboundMessage};
use super::reconnect::ReconnectConfig;

pub const DEFAULT_TOPICS: [&str; 2] = ["trade.executed", "order.filled"];

const UNRECOGNIZED_LOG_LIMIT: usize = 3;
static UNRECOGNIZED_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Trigger settings for one event stream
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub topics: Vec<String>,
    /// Only emit events for this account (ignored when empty)
    pub account_filter: Option<String>,
    /// Only emit events for this symbol (ignored when empty)
    pub symbol_filter: Option<String>,
    pub include_heartbeats: bool,
    pub reconnect: ReconnectConfig,
    /// Interval for WebSocket ping frames on an open socket
    pub keep_alive: Option<Duration>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            topics: DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
            account_filter: None,
            symbol_filter: None,
            include_heartbeats: false,
            reconnect: ReconnectConfig::default(),
            keep_alive: None,
        }
    }
}

impl StreamConfig {
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_account_filter(mut self, account_id: impl Into<String>) -> Self {
        self.account_filter = Some(account_id.into());
        self
    }

    pub fn with_symbol_filter(mut self, symbol: impl Into<String>) -> Self {
        self.symbol_filter = Some(symbol.into());
        self
    }

    pub fn with_heartbeats(mut self, include: bool) -> Self {
        self.include_heartbeats = include;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = Some(interval);
        self
    }

    pub fn account_filter(&self) -> Option<&str> {
        self.account_filter.as_deref().filter(|value| !value.is_empty())
    }

    pub fn symbol_filter(&self) -> Option<&str> {
        self.symbol_filter.as_deref().filter(|value| !value.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.topics.is_empty() {
            return Err(PrimeError::Config(
                "at least one subscription topic is required".to_string(),
            ));
        }
        if self.keep_alive.is_some_and(|interval| interval.is_zero()) {
            return Err(PrimeError::Config(
                "keep-alive interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Exact match, or the event type starts with a subscribed topic
pub fn topic_matches(topics: &[String], kind: &str) -> bool {
    topics
        .iter()
        .any(|topic| kind == topic || kind.starts_with(topic.as_str()))
}

/// What the socket reported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    Text(String),
    Error(String),
    Closed,
}

/// Work for the driver, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Send(OutboundMessage),
    Emit(Envelope),
    ScheduleReconnect { attempt: u32, delay: Duration },
    /// Reconnect budget spent or reconnection disabled
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Authenticating,
    Subscribed,
    /// Terminal: no further connection attempts
    Exhausted,
    /// Terminal: explicit teardown
    Closed,
}

impl StreamState {
    /// A socket is open
    pub fn is_connected(self) -> bool {
        matches!(self, StreamState::Authenticating | StreamState::Subscribed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StreamState::Exhausted | StreamState::Closed)
    }
}

/// Connection state for one event stream.
///
/// Owned by a single task; every transition goes through [`StreamSession::handle`]
/// or [`StreamSession::close`].
#[derive(Debug)]
pub struct StreamSession {
    config: StreamConfig,
    api_key: String,
    signer: HmacSigner,
    state: StreamState,
    reconnect_attempts: u32,
    closing: bool,
}

impl StreamSession {
    pub fn new(config: StreamConfig, credentials: &Credentials) -> Result<Self> {
        config.validate()?;
        credentials.validate_for_signing()?;
        let signer = HmacSigner::new(&credentials.api_secret)?;

        Ok(Self {
            config,
            api_key: credentials.api_key.clone(),
            signer,
            state: StreamState::Disconnected,
            reconnect_attempts: 0,
            closing: false,
        })
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Move to Connecting; false when closing or terminal
    pub fn begin_connect(&mut self) -> bool {
        if self.closing || self.state.is_terminal() {
            return false;
        }
        self.state = StreamState::Connecting;
        true
    }

    pub fn handle(&mut self, event: SocketEvent) -> Vec<Action> {
        match event {
            SocketEvent::Opened => self.on_open(),
            SocketEvent::Text(text) => self.on_text(&text),
            SocketEvent::Error(message) => self.on_error(message),
            SocketEvent::Closed => self.on_close(),
        }
    }

    /// Begin teardown. Idempotent: only the first call yields actions.
    pub fn close(&mut self) -> Vec<Action> {
        if self.closing {
            return Vec::new();
        }
        self.closing = true;
        let was_connected = self.state.is_connected();
        self.state = StreamState::Closed;
        info!(was_connected, "event stream closing");

        if was_connected {
            vec![Action::Send(OutboundMessage::Unsubscribe {
                channels: self.config.topics.clone(),
            })]
        } else {
            Vec::new()
        }
    }

    fn on_open(&mut self) -> Vec<Action> {
        if self.closing {
            return Vec::new();
        }
        self.reconnect_attempts = 0;
        self.state = StreamState::Authenticating;
        debug!("socket open, authenticating");
        vec![Action::Send(self.auth_message())]
    }

    fn on_text(&mut self, text: &str) -> Vec<Action> {
        if self.closing || !self.state.is_connected() {
            return Vec::new();
        }

        let message = match InboundMessage::parse(text) {
            Ok(message) => message,
            Err(err) => {
                debug!(error = %err, bytes = text.len(), "non-JSON frame, emitting raw");
                return vec![Action::Emit(Envelope::raw_text(text))];
            }
        };

        match message {
            InboundMessage::AuthResponse { status } => self.on_auth_response(status.as_deref()),
            InboundMessage::Subscribed => {
                debug!("subscription acknowledged");
                Vec::new()
            }
            InboundMessage::Heartbeat(value) => {
                let mut actions = Vec::with_capacity(2);
                if self.config.include_heartbeats {
                    actions.push(Action::Emit(Envelope::heartbeat(&value)));
                }
                actions.push(Action::Send(OutboundMessage::Pong {
                    timestamp: epoch_millis(),
                }));
                actions
            }
            InboundMessage::Event(event) => {
                if self.state != StreamState::Subscribed {
                    debug!(kind = %event.kind, "event before subscription, dropped");
                    return Vec::new();
                }
                if self.accepts(&event) {
                    vec![Action::Emit(Envelope::from_event(&event))]
                } else {
                    Vec::new()
                }
            }
            InboundMessage::Unknown(_) => {
                log_unrecognized_once(text);
                Vec::new()
            }
        }
    }

    fn on_auth_response(&mut self, status: Option<&str>) -> Vec<Action> {
        if status != Some("success") {
            warn!(status = status.unwrap_or("<missing>"), "stream authentication rejected");
            return Vec::new();
        }
        if self.state != StreamState::Authenticating {
            debug!("duplicate auth success ignored");
            return Vec::new();
        }

        self.state = StreamState::Subscribed;
        info!(topics = ?self.config.topics, "authenticated, subscribing");
        vec![Action::Send(OutboundMessage::Subscribe {
            channels: self.config.topics.clone(),
            account_id: self.config.account_filter().map(str::to_string),
            symbol: self.config.symbol_filter().map(str::to_string),
        })]
    }

    fn on_error(&mut self, message: String) -> Vec<Action> {
        if self.closing {
            return Vec::new();
        }
        warn!(error = %message, "stream socket error");
        vec![Action::Emit(Envelope::error(message))]
    }

    fn on_close(&mut self) -> Vec<Action> {
        if self.closing {
            return Vec::new();
        }
        self.state = StreamState::Disconnected;

        if self.config.reconnect.allows(self.reconnect_attempts) {
            self.reconnect_attempts += 1;
            let delay = self.config.reconnect.policy.delay(self.reconnect_attempts);
            info!(
                attempt = self.reconnect_attempts,
                max_attempts = self.config.reconnect.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "stream closed, reconnect scheduled"
            );
            return vec![Action::ScheduleReconnect {
                attempt: self.reconnect_attempts,
                delay,
            }];
        }

        self.state = StreamState::Exhausted;
        warn!(
            attempts = self.reconnect_attempts,
            reconnect_enabled = self.config.reconnect.enabled,
            "stream closed, no further reconnect attempts"
        );
        vec![Action::Stop]
    }

    fn accepts(&self, event: &EventMessage) -> bool {
        let account_ok = self
            .config
            .account_filter()
            .is_none_or(|account| event.account_id.as_deref() == Some(account));
        if !account_ok {
            return false;
        }
        let symbol_ok = self
            .config
            .symbol_filter()
            .is_none_or(|symbol| event.symbol.as_deref() == Some(symbol));
        if !symbol_ok {
            return false;
        }
        topic_matches(&self.config.topics, &event.kind)
    }

    fn auth_message(&self) -> OutboundMessage {
        let timestamp = epoch_millis().to_string();
        let signature = self.signer.sign_stream_auth(&timestamp, &self.api_key);
        OutboundMessage::Auth {
            api_key: self.api_key.clone(),
            timestamp,
            signature,
        }
    }
}

fn log_unrecognized_once(raw: &str) {
    let count = UNRECOGNIZED_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < UNRECOGNIZED_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = UNRECOGNIZED_LOG_LIMIT,
            bytes = raw.len(),
            "ws frame without type dropped"
        );
    }
}
