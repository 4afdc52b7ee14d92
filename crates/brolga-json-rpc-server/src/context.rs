use tokio_util::sync::CancellationToken;

/// Per-call context threaded through every middleware and handler
/// invocation.
///
/// Cancellation is a propagation contract: when the token fires, in-flight
/// handlers are expected to observe it and return promptly, but nothing
/// forcibly kills a handler that ignores it.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes when the context is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}
