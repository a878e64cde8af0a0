//! Cancellation handles.
//!
//! An [`AbortController`] owns the right to cancel; the [`AbortSignal`]s it
//! hands out are threaded through a request's configuration. The core checks
//! the signal before invoking the fetch primitive and races the fetch against
//! it. It has no timeouts of its own: arm a signal from a timer task or a
//! middleware stage when one is needed.

use tokio_util::sync::CancellationToken;

/// Cancels every [`AbortSignal`] it created.
#[derive(Debug, Clone, Default)]
pub struct AbortController {
    token: CancellationToken,
}

impl AbortController {
    /// Create a controller whose signal has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal observing this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            token: self.token.clone(),
        }
    }

    /// Fire the signal. Idempotent.
    pub fn abort(&self) {
        debug!("abort requested");
        self.token.cancel();
    }
}

/// Observes an [`AbortController`].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    /// A signal that has already fired.
    pub fn aborted() -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self { token }
    }

    /// Returns `true` once the controller has aborted.
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the controller aborts.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

impl From<CancellationToken> for AbortSignal {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}
