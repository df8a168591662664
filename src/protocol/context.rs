//! Mailbox contexts: the producer-side half of a handoff.
//!
//! All three contexts share [`Handoff`], which owns the race between
//! "mailbox has room" and "token signaled". They differ only in what they
//! put into the mailbox:
//!
//! - [`SignalContext`] sends [`Signal<T>`], so values and errors share one
//!   channel.
//! - [`ObjectContext`] sends bare values. Failure is reported through the
//!   producer's own return value.
//! - [`ErrorContext`] sends bare errors, typically fanned in from many
//!   producers to one collector.
//!
//! Once the token is signaled no send blocks and nothing more is enqueued.

use async_trait::async_trait;

use super::mailbox::MailboxSender;
use super::signal::{ErrorSink, Signal};
use crate::cancel::{CancelToken, Cancellation};
use crate::error::{Error, Result};

/// Outcome of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The mailbox took the item.
    Accepted,
    /// The token was signaled first; nothing was enqueued.
    Canceled,
    /// The read end is gone; nothing was enqueued.
    Closed,
}

impl Delivery {
    pub fn is_accepted(self) -> bool {
        self == Delivery::Accepted
    }
}

/// A cancellation token paired with the write end of a mailbox of `P`.
#[derive(Debug)]
pub struct Handoff<P, C = CancelToken> {
    token: C,
    mailbox: MailboxSender<P>,
}

impl<P, C: Clone> Clone for Handoff<P, C> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            mailbox: self.mailbox.clone(),
        }
    }
}

impl<P: Send, C: Cancellation> Handoff<P, C> {
    pub fn new(token: C, mailbox: MailboxSender<P>) -> Self {
        Self { token, mailbox }
    }

    pub fn token(&self) -> &C {
        &self.token
    }

    pub fn is_done(&self) -> bool {
        self.token.is_done()
    }

    pub fn err(&self) -> Option<Error> {
        self.token.err()
    }

    /// Enqueue `item`, suspending until the mailbox has room or the token is
    /// signaled. Cancellation wins ties.
    pub async fn send(&self, item: P) -> Delivery {
        if self.token.is_done() {
            tracing::trace!("send skipped: token already signaled");
            return Delivery::Canceled;
        }

        let delivery = tokio::select! {
            biased;
            _ = self.token.done() => Delivery::Canceled,
            sent = self.mailbox.send(item) => match sent {
                Ok(()) => Delivery::Accepted,
                Err(_) => Delivery::Closed,
            },
        };
        tracing::trace!(?delivery, "send finished");
        delivery
    }

    /// Send `err` as a non-fatal error. A signaled token refuses even `None`.
    async fn signal_error(&self, err: Option<Error>, wrap: impl FnOnce(Error) -> P) -> bool {
        if self.token.is_done() {
            return false;
        }
        match err {
            None => true,
            Some(err) => self.send(wrap(err)).await.is_accepted(),
        }
    }

    /// Deliver `err` and return the error the producer should exit with.
    ///
    /// A signaled token always yields its reason, even for `None`.
    async fn fatal(&self, err: Option<Error>, wrap: impl FnOnce(Error) -> P) -> Result<()> {
        if self.token.is_done() {
            return Err(self.cancel_reason());
        }
        let Some(err) = err else {
            return Ok(());
        };
        match self.send(wrap(err.clone())).await {
            Delivery::Accepted | Delivery::Closed => Err(err),
            Delivery::Canceled => Err(self.cancel_reason()),
        }
    }

    fn cancel_reason(&self) -> Error {
        self.token.err().unwrap_or(Error::Canceled)
    }
}

/// Producer context over a mailbox of [`Signal<T>`].
#[derive(Debug)]
pub struct SignalContext<T, C = CancelToken> {
    inner: Handoff<Signal<T>, C>,
}

impl<T, C: Clone> Clone for SignalContext<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send, C: Cancellation> SignalContext<T, C> {
    pub fn new(token: C, mailbox: MailboxSender<Signal<T>>) -> Self {
        Self {
            inner: Handoff::new(token, mailbox),
        }
    }

    pub fn token(&self) -> &C {
        self.inner.token()
    }

    /// True once the token is signaled.
    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    /// The token's reason, or `None` while it is live.
    pub fn err(&self) -> Option<Error> {
        self.inner.err()
    }

    /// Send a value. Returns true iff the mailbox accepted it.
    pub async fn yield_value(&self, value: T) -> bool {
        self.inner.send(Signal::Value(value)).await.is_accepted()
    }

    /// Send a non-fatal error; the producer may keep going afterwards.
    ///
    /// `None` is not an error: returns true without touching the mailbox,
    /// unless the token is already signaled.
    pub async fn signal_error(&self, err: impl Into<Option<Error>>) -> bool {
        self.inner.signal_error(err.into(), Signal::Error).await
    }

    /// Send a terminal error.
    ///
    /// Returns `Err(err)` once delivered, `Err(reason)` if the token won, and
    /// `Ok(())` for `None` on a live token. Meant to be the producer's own return value:
    ///
    /// ```ignore
    /// if let Err(e) = step() {
    ///     return ctx.fatal(e).await;
    /// }
    /// ```
    pub async fn fatal(&self, err: impl Into<Option<Error>>) -> Result<()> {
        self.inner.fatal(err.into(), Signal::Error).await
    }

    /// Alias of [`fatal`](Self::fatal) for a producer's final statement.
    pub async fn exit(&self, err: impl Into<Option<Error>>) -> Result<()> {
        self.fatal(err).await
    }

    /// Send `Ok` as a value and `Err` as a non-fatal error.
    pub async fn send_result(&self, result: Result<T>) -> bool {
        self.inner.send(result.into()).await.is_accepted()
    }
}

#[async_trait]
impl<T: Send, C: Cancellation> ErrorSink for SignalContext<T, C> {
    async fn signal_error(&self, err: Option<Error>) -> bool {
        SignalContext::signal_error(self, err).await
    }
}

/// Producer context over a mailbox of bare values.
#[derive(Debug)]
pub struct ObjectContext<T, C = CancelToken> {
    inner: Handoff<T, C>,
}

impl<T, C: Clone> Clone for ObjectContext<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send, C: Cancellation> ObjectContext<T, C> {
    pub fn new(token: C, mailbox: MailboxSender<T>) -> Self {
        Self {
            inner: Handoff::new(token, mailbox),
        }
    }

    pub fn token(&self) -> &C {
        self.inner.token()
    }

    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    pub fn err(&self) -> Option<Error> {
        self.inner.err()
    }

    /// Send a value. Returns true iff the mailbox accepted it.
    pub async fn yield_value(&self, value: T) -> bool {
        self.inner.send(value).await.is_accepted()
    }
}

/// Producer context over a mailbox of errors.
#[derive(Debug)]
pub struct ErrorContext<C = CancelToken> {
    inner: Handoff<Error, C>,
}

impl<C: Clone> Clone for ErrorContext<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: Cancellation> ErrorContext<C> {
    pub fn new(token: C, mailbox: MailboxSender<Error>) -> Self {
        Self {
            inner: Handoff::new(token, mailbox),
        }
    }

    pub fn token(&self) -> &C {
        self.inner.token()
    }

    /// True once the token is signaled, same as the other contexts.
    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    pub fn err(&self) -> Option<Error> {
        self.inner.err()
    }

    /// Send a non-fatal error. `None` returns true without sending while the
    /// token is live.
    pub async fn signal_error(&self, err: impl Into<Option<Error>>) -> bool {
        self.inner.signal_error(err.into(), |e| e).await
    }

    /// Send a terminal error; see [`SignalContext::fatal`].
    pub async fn fatal(&self, err: impl Into<Option<Error>>) -> Result<()> {
        self.inner.fatal(err.into(), |e| e).await
    }

    pub async fn exit(&self, err: impl Into<Option<Error>>) -> Result<()> {
        self.fatal(err).await
    }
}

#[async_trait]
impl<C: Cancellation> ErrorSink for ErrorContext<C> {
    async fn signal_error(&self, err: Option<Error>) -> bool {
        ErrorContext::signal_error(self, err).await
    }
}
