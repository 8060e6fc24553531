//! HTTP adapter for the content-generation provider.

pub mod client;
pub mod error;
pub(crate) mod retry;

pub use client::GenerationClient;
pub use error::GenClientError;
