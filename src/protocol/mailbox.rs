//! Capacity-1 mailboxes connecting a producer context to its consumer.

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::signal::Signal;
use crate::error::Error;

/// Number of items a mailbox buffers before senders suspend.
pub const MAILBOX_CAPACITY: usize = 1;

/// Create a capacity-1 mailbox of bare values.
pub fn channel<T>() -> (MailboxSender<T>, MailboxReceiver<T>) {
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    (MailboxSender { tx }, MailboxReceiver { rx })
}

/// Mailbox for a tagged value-or-error context.
pub fn signal_channel<T>() -> (MailboxSender<Signal<T>>, MailboxReceiver<Signal<T>>) {
    channel()
}

/// Mailbox for a plain value context.
pub fn object_channel<T>() -> (MailboxSender<T>, MailboxReceiver<T>) {
    channel()
}

/// Mailbox for an error-only context.
pub fn error_channel() -> (MailboxSender<Error>, MailboxReceiver<Error>) {
    channel()
}

/// Write end of a mailbox.
///
/// The mailbox closes once every sender has been dropped. Contexts own their
/// sender, so dropping the last context closes the mailbox.
#[derive(Debug)]
pub struct MailboxSender<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> MailboxSender<T> {
    /// True once the read end has been dropped or closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait for capacity and enqueue `item`.
    ///
    /// Cancel safe: dropping the future before it resolves enqueues nothing.
    /// Returns the item back if the read end is gone.
    pub(crate) async fn send(&self, item: T) -> Result<(), T> {
        self.tx.send(item).await.map_err(|e| e.0)
    }
}

/// Read end of a mailbox.
#[derive(Debug)]
pub struct MailboxReceiver<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> MailboxReceiver<T> {
    /// Wait for the next item. Returns `None` once the mailbox is closed and
    /// drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the buffered item, if any, without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting items. Buffered items can still be read; pending and
    /// future sends fail instead of blocking.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Consume the receiver as a finite stream that ends when the mailbox
    /// closes.
    pub fn into_stream(self) -> ReceiverStream<T> {
        ReceiverStream::new(self.rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_holds_one_item() {
        let (tx, mut rx) = channel::<u32>();
        tx.send(1).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(20), tx.send(2)).await;
        assert!(blocked.is_err(), "second send should wait for capacity");

        assert_eq!(rx.try_recv(), Some(1));
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn test_closes_when_senders_dropped() {
        let (tx, mut rx) = channel::<u32>();
        let other = tx.clone();
        tx.send(7).await.unwrap();
        drop(tx);
        drop(other);

        assert_eq!(rx.recv().await, Some(7));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_returns_item() {
        let (tx, rx) = channel::<&str>();
        drop(rx);

        assert!(tx.is_closed());
        assert_eq!(tx.send("lost").await, Err("lost"));
    }

    #[tokio::test]
    async fn test_stream_ends_at_close() {
        let (tx, rx) = channel::<u32>();
        tokio::spawn(async move {
            for n in 1..=3 {
                tx.send(n).await.unwrap();
            }
        });

        let items: Vec<u32> = rx.into_stream().collect().await;
        assert_eq!(items, vec![1, 2, 3]);
    }
}
