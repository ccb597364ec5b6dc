//! Transport backed by a caller-supplied async function

use crate::core::{Payload, Result, Transport};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type ProcessFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;
type ProcessFn = dyn Fn(Payload) -> ProcessFuture + Send + Sync;

/// Hands every payload to a closure
///
/// # Example
///
/// ```
/// use client_telemetry::transports::CustomTransport;
/// use client_telemetry::{Publisher, TelemetryError};
///
/// let transport = CustomTransport::new(|payload| async move {
///     println!("{}", payload.to_json()?);
///     Ok::<_, TelemetryError>(())
/// })
/// .named("stdout");
///
/// let publisher = Publisher::builder().transport(transport).build().unwrap();
/// assert_eq!(publisher.transport_names(), vec!["stdout"]);
/// ```
#[derive(Clone)]
pub struct CustomTransport {
    name: String,
    process: Arc<ProcessFn>,
}

impl CustomTransport {
    pub fn new<F, Fut>(process: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: "custom".to_string(),
            process: Arc::new(move |payload| Box::pin(process(payload))),
        }
    }

    /// Set the name reported in diagnostics
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Transport for CustomTransport {
    async fn process(&self, payload: &Payload) -> Result<()> {
        (self.process)(payload.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
