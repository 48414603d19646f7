/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public Ripple Prime adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod batch;
pub mod http;
pub mod notice;
pub mod types;
pub mod ws;

// Re-export commonly used types from auth
pub use auth::{
    AuthMethod,
    CredentialStore,
    Credentials,
    Environment,
    HmacSigner,
    StaticCredentialStore,
    generate_signature,
};

pub use batch::{FailurePolicy, ItemOutcome, run_batch};

// Re-export commonly used types from http
pub use http::{
    ClientConfig,
    PaginatedResponse,
    Pagination,
    PrimeClient,
    PrimeError,
    QueryValue,
    RequestDescriptor,
    Result,
    replace_path_params,
};

// Re-export all types
pub use types::*;

// Re-export commonly used types from ws
pub use ws::{
    Envelope,
    EventSink,
    EventStream,
    ReconnectConfig,
    ReconnectPolicy,
    StreamConfig,
    StreamHandle,
    StreamState,
    TungsteniteConnector,
};
