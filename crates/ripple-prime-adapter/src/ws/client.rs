/*
[INPUT]:  Credentials, stream configuration, socket connector, event sink
[OUTPUT]: Background event stream with state notifications and idempotent teardown
[POS]:    WebSocket layer - async driver around the stream state machine
[UPDATE]: When changing connection lifecycle, keep-alive, or teardown behavior
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::Credentials;
use crate::http::Result;
use crate::notice::emit_licensing_notice;

use super::message::Envelope;
use super::session::{Action, SocketEvent, StreamConfig, StreamSession, StreamState};
use super::transport::{Connection, Connector, Incoming};

const EMIT_LOG_LIMIT: usize = 3;
static EMIT_LOG_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Downstream consumer of emitted envelopes
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, events: Vec<Envelope>);
}

impl EventSink for mpsc::UnboundedSender<Vec<Envelope>> {
    fn emit(&self, events: Vec<Envelope>) {
        if self.send(events).is_err() {
            debug!("event sink receiver dropped");
        }
    }
}

impl<T: EventSink> EventSink for Arc<T> {
    fn emit(&self, events: Vec<Envelope>) {
        (**self).emit(events)
    }
}

/// Entry point for the background event stream
pub struct EventStream;

impl EventStream {
    /// Start streaming against the environment's WebSocket URL.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S: EventSink>(
        credentials: &Credentials,
        config: StreamConfig,
        connector: Arc<dyn Connector>,
        sink: S,
    ) -> Result<StreamHandle> {
        let url = credentials.environment.ws_url().to_string();
        Self::start_with_url(credentials, config, connector, sink, url)
    }

    pub fn start_with_url<S: EventSink>(
        credentials: &Credentials,
        config: StreamConfig,
        connector: Arc<dyn Connector>,
        sink: S,
        url: impl Into<String>,
    ) -> Result<StreamHandle> {
        let session = StreamSession::new(config, credentials)?;
        emit_licensing_notice();

        let url = url.into();
        info!(
            url = %url,
            topics = ?session.config().topics,
            "starting event stream"
        );

        let (state_tx, state_rx) = watch::channel(session.state());
        let shutdown = CancellationToken::new();
        let worker = StreamWorker {
            session,
            connector,
            url,
            sink,
            state_tx,
            shutdown: shutdown.clone(),
        };
        let handle = tokio::spawn(worker.run());

        Ok(StreamHandle {
            shutdown,
            state: state_rx,
            worker: Mutex::new(Some(handle)),
        })
    }
}

/// Handle to a running event stream
#[derive(Debug)]
pub struct StreamHandle {
    shutdown: CancellationToken,
    state: watch::Receiver<StreamState>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl StreamHandle {
    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<StreamState> {
        self.state.clone()
    }

    /// Resolve once the stream reaches Exhausted or Closed
    pub async fn wait_terminal(&self) -> StreamState {
        let mut rx = self.state.clone();
        if rx.wait_for(|state| state.is_terminal()).await.is_err() {
            debug!("event stream worker gone");
        }
        let state = *rx.borrow();
        state
    }

    /// Tear the stream down and wait for the worker to finish.
    ///
    /// Safe to call any number of times; cancels a pending reconnect.
    pub async fn close(&self) {
        self.shutdown.cancel();
        let mut worker = self.worker.lock().await;
        if let Some(handle) = worker.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "event stream worker ended abnormally");
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

enum Next {
    Reconnect(Duration),
    Stop,
}

struct StreamWorker<S> {
    session: StreamSession,
    connector: Arc<dyn Connector>,
    url: String,
    sink: S,
    state_tx: watch::Sender<StreamState>,
    shutdown: CancellationToken,
}

impl<S: EventSink> StreamWorker<S> {
    async fn run(mut self) {
        'run: loop {
            if !self.session.begin_connect() {
                break 'run;
            }
            self.publish();

            let connected = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    self.session.close();
                    break 'run;
                }
                result = self.connector.connect(&self.url) => result,
            };

            let next = match connected {
                Ok(mut connection) => self.drive(connection.as_mut()).await,
                Err(err) => {
                    warn!(url = %self.url, error = %err, "event stream connect failed");
                    let mut actions = self.session.handle(SocketEvent::Error(err.to_string()));
                    actions.extend(self.session.handle(SocketEvent::Closed));
                    self.perform(actions, None).await.unwrap_or(Next::Stop)
                }
            };
            self.publish();

            match next {
                Next::Stop => break 'run,
                Next::Reconnect(delay) => {
                    tokio::select! {
                        _ = self.shutdown.cancelled() => {
                            debug!("pending reconnect cancelled");
                            self.session.close();
                            break 'run;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        self.publish();
        info!(
            state = ?self.session.state(),
            attempts = self.session.reconnect_attempts(),
            "event stream stopped"
        );
    }

    async fn drive(&mut self, connection: &mut dyn Connection) -> Next {
        let actions = self.session.handle(SocketEvent::Opened);
        self.publish();
        if let Some(next) = self.perform(actions, Some(&mut *connection)).await {
            return next;
        }

        let mut keep_alive = self.session.config().keep_alive.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let actions = self.session.close();
                    self.perform(actions, Some(&mut *connection)).await;
                    if let Err(err) = connection.close().await {
                        debug!(error = %err, "socket close failed");
                    }
                    return Next::Stop;
                }
                _ = tick(&mut keep_alive) => {
                    if let Err(err) = connection.ping().await {
                        warn!(error = %err, "keep-alive ping failed");
                    }
                }
                incoming = connection.recv() => {
                    let actions = match incoming {
                        Incoming::Text(text) => self.session.handle(SocketEvent::Text(text)),
                        Incoming::Error(message) => {
                            let mut actions = self.session.handle(SocketEvent::Error(message));
                            actions.extend(self.session.handle(SocketEvent::Closed));
                            actions
                        }
                        Incoming::Closed => self.session.handle(SocketEvent::Closed),
                    };
                    self.publish();
                    if let Some(next) = self.perform(actions, Some(&mut *connection)).await {
                        return next;
                    }
                }
            }
        }
    }

    /// Apply actions in order; returns the connection-level outcome if any
    async fn perform(
        &mut self,
        actions: Vec<Action>,
        mut connection: Option<&mut dyn Connection>,
    ) -> Option<Next> {
        let mut next = None;
        for action in actions {
            match action {
                Action::Send(message) => {
                    let Some(connection) = connection.as_deref_mut() else {
                        debug!(kind = message.kind(), "no open socket, frame dropped");
                        continue;
                    };
                    let text = match message.to_json() {
                        Ok(text) => text,
                        Err(err) => {
                            warn!(kind = message.kind(), error = %err, "frame serialization failed");
                            continue;
                        }
                    };
                    debug!(kind = message.kind(), "sending frame");
                    if let Err(err) = connection.send_text(text).await {
                        warn!(kind = message.kind(), error = %err, "frame send failed");
                    }
                }
                Action::Emit(envelope) => {
                    log_emit_sample_once(&envelope);
                    self.sink.emit(vec![envelope]);
                }
                Action::ScheduleReconnect { delay, .. } => next = Some(Next::Reconnect(delay)),
                Action::Stop => next = Some(Next::Stop),
            }
        }
        next
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.session.state());
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn log_emit_sample_once(envelope: &Envelope) {
    let count = EMIT_LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count < EMIT_LOG_LIMIT {
        info!(
            sample_index = count + 1,
            sample_limit = EMIT_LOG_LIMIT,
            event = %envelope.event,
            "event emitted"
        );
    }
}
