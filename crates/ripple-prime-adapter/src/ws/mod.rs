/*
[INPUT]:  Stream configuration, credentials, socket connector
[OUTPUT]: Filtered, normalized account and trading events
[POS]:    WebSocket layer - authenticated event streams
[UPDATE]: When adding control messages or changing connection logic
*/

pub mod client;
pub mod message;
pub mod reconnect;
pub mod session;
pub mod transport;

pub use client::{EventSink, EventStream, StreamHandle};
pub use message::{Envelope, EventMessage, InboundMessage, OutboundMessage};
pub use reconnect::{ExponentialBackoff, FixedInterval, ReconnectConfig, ReconnectPolicy};
pub use session::{
    Action, DEFAULT_TOPICS, SocketEvent, StreamConfig, StreamSession, StreamState, topic_matches,
};
pub use transport::{Connection, Connector, Incoming, TungsteniteConnector};
