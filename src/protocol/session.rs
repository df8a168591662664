//! Producer sessions that own the close of their mailbox.
//!
//! A consumer ranging over a mailbox only stops when every write end is gone.
//! These helpers move the context into the spawned producer task, so the
//! mailbox closes when the producer body returns, on success, error or panic.
//! Cloning the context into another long-lived task keeps the mailbox open
//! until that clone is dropped too.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::Instrument;

use super::context::{ErrorContext, ObjectContext, SignalContext};
use super::mailbox::{error_channel, object_channel, signal_channel, MailboxReceiver};
use super::signal::Signal;
use crate::cancel::Cancellation;
use crate::error::{Error, Result};

/// Spawn a producer over a fresh signal mailbox.
pub fn spawn_signal_producer<T, C, F, Fut>(
    token: C,
    body: F,
) -> (JoinHandle<Result<()>>, MailboxReceiver<Signal<T>>)
where
    T: Send + 'static,
    C: Cancellation + 'static,
    F: FnOnce(SignalContext<T, C>) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let (tx, rx) = signal_channel();
    let ctx = SignalContext::new(token, tx);
    let handle = tokio::spawn(body(ctx).instrument(tracing::debug_span!("signal_producer")));
    (handle, rx)
}

/// Spawn a producer over a fresh plain-value mailbox.
pub fn spawn_object_producer<T, C, F, Fut>(
    token: C,
    body: F,
) -> (JoinHandle<Result<()>>, MailboxReceiver<T>)
where
    T: Send + 'static,
    C: Cancellation + 'static,
    F: FnOnce(ObjectContext<T, C>) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let (tx, rx) = object_channel();
    let ctx = ObjectContext::new(token, tx);
    let handle = tokio::spawn(body(ctx).instrument(tracing::debug_span!("object_producer")));
    (handle, rx)
}

/// Spawn a producer over a fresh error mailbox.
pub fn spawn_error_producer<C, F, Fut>(
    token: C,
    body: F,
) -> (JoinHandle<Result<()>>, MailboxReceiver<Error>)
where
    C: Cancellation + 'static,
    F: FnOnce(ErrorContext<C>) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let (tx, rx) = error_channel();
    let ctx = ErrorContext::new(token, tx);
    let handle = tokio::spawn(body(ctx).instrument(tracing::debug_span!("error_producer")));
    (handle, rx)
}

/// Read every signal until the mailbox closes.
///
/// Stops at the first error signal or handler failure and returns it. The
/// receiver is dropped on return, so a producer still blocked on a send is
/// released rather than left hanging.
pub async fn drain_signals<T, F>(mut mailbox: MailboxReceiver<Signal<T>>, mut handler: F) -> Result<()>
where
    F: FnMut(T) -> Result<()>,
{
    while let Some(signal) = mailbox.recv().await {
        handler(signal.into_result()?)?;
    }
    Ok(())
}

/// Collect every error sent into an error mailbox until it closes.
pub async fn collect_errors(mut mailbox: MailboxReceiver<Error>) -> Vec<Error> {
    let mut errors = Vec::new();
    while let Some(err) = mailbox.recv().await {
        tracing::debug!(error = %err, "collected producer error");
        errors.push(err);
    }
    errors
}

/// Run `workers` jobs concurrently, fanning their failures into one error
/// mailbox, and return every error once all of them have finished.
///
/// Each job's `Err` is delivered through a shared [`ErrorContext`] with
/// `exit`. A job that panics or is aborted never reaches the mailbox; its
/// join failure is appended after the delivered errors.
pub async fn fan_in_errors<C, F, Fut>(token: C, workers: usize, work: F) -> Vec<Error>
where
    C: Cancellation + Clone + 'static,
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let (tx, mailbox) = error_channel();
    let ctx = ErrorContext::new(token, tx);

    let mut handles = Vec::with_capacity(workers);
    for id in 0..workers {
        let ctx = ctx.clone();
        let job = work(id);
        let worker = async move {
            let outcome = job.await;
            if let Err(e) = ctx.exit(outcome.err()).await {
                tracing::debug!(worker = id, "exited with {}", e);
            }
            Ok::<(), Error>(())
        };
        handles.push(tokio::spawn(
            worker.instrument(tracing::debug_span!("fan_in_worker", worker = id)),
        ));
    }
    drop(ctx);

    let mut errors = collect_errors(mailbox).await;
    for handle in handles {
        if let Err(e) = join_producer(handle).await {
            errors.push(e);
        }
    }
    errors
}

/// Wait for a producer task and flatten a panic or abort into an error.
pub async fn join_producer(handle: JoinHandle<Result<()>>) -> Result<()> {
    match handle.await {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(Error::Canceled),
        Err(e) => Err(Error::msg(format!("producer task panicked: {}", e))),
    }
}
