/*
[INPUT]:  Request descriptors, credentials, HTTP client configuration
[OUTPUT]: Signed REST calls and uniform errors
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding request options or changing client behavior
*/

pub mod client;
pub mod endpoints;
pub mod error;
pub mod request;

pub use error::{PrimeError, Result};
pub use request::{QueryValue, RequestDescriptor};
pub use reqwest::Method;

pub use client::{ClientConfig, PaginatedResponse, Pagination, PrimeClient};
pub use endpoints::replace_path_params;
