//! Transport trait for delivering payloads to a collector

use super::{error::Result, payload::Payload};
use async_trait::async_trait;

/// Pluggable delivery capability with a binary outcome
///
/// The publisher tries transports strictly in order and never calls two
/// at once within a flush.
///
/// # Example
///
/// ```no_run
/// use client_telemetry::core::{Payload, Result, Transport};
/// use async_trait::async_trait;
///
/// struct StdoutTransport;
///
/// #[async_trait]
/// impl Transport for StdoutTransport {
///     async fn process(&self, payload: &Payload) -> Result<()> {
///         println!("{}", payload.to_json()?);
///         Ok(())
///     }
///
///     fn name(&self) -> &str {
///         "stdout"
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one payload. `Ok` means the collector accepted it.
    async fn process(&self, payload: &Payload) -> Result<()>;

    /// Get the transport name
    fn name(&self) -> &str;
}
