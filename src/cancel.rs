//! Cancellation tokens consumed by mailbox contexts.
//!
//! Contexts only observe a token through [`Cancellation`]; they never signal
//! it. [`CancelToken`] is the implementation shipped with the crate: a
//! `tokio_util` cancellation token plus the error explaining why it fired.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// A level-triggered "stop" signal with an associated reason.
#[async_trait]
pub trait Cancellation: Send + Sync {
    /// True once the token has been signaled. Never reverts to false.
    fn is_done(&self) -> bool;

    /// The reason the token was signaled, or `None` while it is live.
    fn err(&self) -> Option<Error>;

    /// Resolves when the token is signaled.
    async fn done(&self);
}

/// Cancellation token carrying the error that signaled it.
///
/// Clones share state. The first reason recorded wins; later calls to
/// [`cancel_with`](Self::cancel_with) are no-ops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    token: CancellationToken,
    reason: Arc<OnceLock<Error>>,
    parent: Option<Arc<CancelToken>>,
}

impl CancelToken {
    /// Create a live token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that signals `Error::DeadlineExceeded` after `timeout`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Create a token that signals `Error::DeadlineExceeded` at `deadline`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_deadline(deadline: Instant) -> Self {
        let token = Self::new();
        token.arm_deadline(deadline);
        token
    }

    /// Create a child token. Cancelling the parent cancels the child (and the
    /// child then reports the parent's reason); cancelling the child leaves
    /// the parent untouched.
    pub fn child_token(&self) -> Self {
        Self {
            token: self.token.child_token(),
            reason: Arc::new(OnceLock::new()),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Child token that additionally expires at `deadline`.
    pub fn child_with_deadline(&self, deadline: Instant) -> Self {
        let child = self.child_token();
        child.arm_deadline(deadline);
        child
    }

    /// Signal with `Error::Canceled`.
    pub fn cancel(&self) {
        self.cancel_with(Error::Canceled);
    }

    /// Signal with an explicit reason.
    ///
    /// No-op once the token is signaled, including through a parent: the
    /// first observed reason is permanent.
    pub fn cancel_with(&self, reason: Error) {
        if self.token.is_cancelled() {
            return;
        }
        // Reason is stored before the token fires so observers never see a
        // signaled token without one.
        if self.reason.set(reason).is_ok() {
            tracing::trace!(reason = ?self.reason.get(), "cancel token signaled");
        }
        self.token.cancel();
    }

    /// Borrow the underlying `tokio_util` token.
    pub fn as_cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    fn arm_deadline(&self, deadline: Instant) {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    token.cancel_with(Error::DeadlineExceeded);
                }
                _ = token.token.cancelled() => {}
            }
        });
    }
}

impl From<CancellationToken> for CancelToken {
    fn from(token: CancellationToken) -> Self {
        Self {
            token,
            reason: Arc::new(OnceLock::new()),
            parent: None,
        }
    }
}

#[async_trait]
impl Cancellation for CancelToken {
    fn is_done(&self) -> bool {
        self.token.is_cancelled()
    }

    fn err(&self) -> Option<Error> {
        if !self.is_done() {
            return None;
        }
        let reason = self
            .reason
            .get()
            .cloned()
            .or_else(|| self.parent.as_ref().and_then(|p| p.err()))
            .unwrap_or(Error::Canceled);
        Some(reason)
    }

    async fn done(&self) {
        self.token.cancelled().await
    }
}

/// A bare `tokio_util` token always reports `Error::Canceled`.
#[async_trait]
impl Cancellation for CancellationToken {
    fn is_done(&self) -> bool {
        self.is_cancelled()
    }

    fn err(&self) -> Option<Error> {
        self.is_cancelled().then_some(Error::Canceled)
    }

    async fn done(&self) {
        self.cancelled().await
    }
}

#[async_trait]
impl<C: Cancellation + ?Sized> Cancellation for Arc<C> {
    fn is_done(&self) -> bool {
        (**self).is_done()
    }

    fn err(&self) -> Option<Error> {
        (**self).err()
    }

    async fn done(&self) {
        (**self).done().await
    }
}
