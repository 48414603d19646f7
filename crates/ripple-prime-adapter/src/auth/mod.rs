/*
[INPUT]:  Credential profiles and API secrets
[OUTPUT]: Credentials, HMAC signatures, credential lookup
[POS]:    Auth layer - handles Ripple Prime request authentication
[UPDATE]: When auth flow or signature methods change
*/

pub mod credentials;
pub mod signer;
pub mod store;

pub use credentials::{AuthMethod, Credentials, Environment, base_url, ws_url};
pub use signer::{HmacSigner, canonical_request, epoch_millis, generate_signature, rest_timestamp};
pub use store::{CredentialStore, StaticCredentialStore};
