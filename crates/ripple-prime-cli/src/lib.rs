/*
[INPUT]:  Public API exports for the ripple-prime runner crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod listen;
pub mod request;

pub use config::RunnerConfig;
pub use listen::{EnvelopePrinter, run_listener};
pub use request::RequestSpec;
