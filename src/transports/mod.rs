//! Transport implementations
//!
//! This module provides various transports for delivering payloads:
//! - `HttpTransport`: sends each payload as one HTTP request
//! - `CustomTransport`: wraps a caller-supplied async function

pub mod custom;
#[cfg(feature = "http")]
pub mod http;

pub use custom::CustomTransport;
#[cfg(feature = "http")]
pub use http::{EncodeFn, HttpTransport, HttpTransportBuilder};
