//! Tagged value-or-error payload carried by a signal mailbox.

use async_trait::async_trait;

use crate::error::{Error, Result};

/// One item handed from a producer to a consumer: a value or an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<T> {
    Value(T),
    Error(Error),
}

/// Anything a consumer can forward an error into.
///
/// Implemented by the contexts that carry errors, so a consumer that is
/// itself a producer for a later stage can re-propagate what it received.
#[async_trait]
pub trait ErrorSink: Send + Sync {
    /// Deliver `err` downstream. `None` succeeds without sending while the
    /// sink's token is live.
    async fn signal_error(&self, err: Option<Error>) -> bool;
}

impl<T> Signal<T> {
    pub fn value(value: T) -> Self {
        Signal::Value(value)
    }

    pub fn error(err: Error) -> Self {
        Signal::Error(err)
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Signal::Value(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Signal::Error(_))
    }

    /// The carried value, if any.
    pub fn raw_object(&self) -> Option<&T> {
        match self {
            Signal::Value(value) => Some(value),
            Signal::Error(_) => None,
        }
    }

    /// The carried error, if any.
    pub fn err(&self) -> Option<&Error> {
        match self {
            Signal::Value(_) => None,
            Signal::Error(err) => Some(err),
        }
    }

    /// Copy the value into `slot`.
    ///
    /// Returns false and leaves `slot` untouched when the signal holds an
    /// error.
    pub fn as_value(&self, slot: &mut T) -> bool
    where
        T: Clone,
    {
        match self {
            Signal::Value(value) => {
                *slot = value.clone();
                true
            }
            Signal::Error(_) => false,
        }
    }

    /// Like [`as_value`](Self::as_value), but an error is forwarded into
    /// `sink` before returning false.
    ///
    /// The return value does not say whether the sink accepted the error; a
    /// sink whose token is signaled drops it. Check the sink's own `is_done`
    /// when that matters.
    pub async fn as_value_or_signal_error<S>(&self, sink: &S, slot: &mut T) -> bool
    where
        T: Clone,
        S: ErrorSink + ?Sized,
    {
        match self {
            Signal::Value(value) => {
                *slot = value.clone();
                true
            }
            Signal::Error(err) => {
                if !sink.signal_error(Some(err.clone())).await {
                    tracing::trace!(error = %err, "forwarded error refused by sink");
                }
                false
            }
        }
    }

    /// Consume the signal.
    pub fn into_result(self) -> Result<T> {
        match self {
            Signal::Value(value) => Ok(value),
            Signal::Error(err) => Err(err),
        }
    }

    pub fn map<U, F>(self, f: F) -> Signal<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Signal::Value(value) => Signal::Value(f(value)),
            Signal::Error(err) => Signal::Error(err),
        }
    }
}

impl<T> From<Result<T>> for Signal<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Signal::Value(value),
            Err(err) => Signal::Error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<Error>>,
    }

    #[async_trait]
    impl ErrorSink for RecordingSink {
        async fn signal_error(&self, err: Option<Error>) -> bool {
            if let Some(err) = err {
                self.seen.lock().unwrap().push(err);
            }
            true
        }
    }

    #[test]
    fn test_as_value_writes_slot() {
        let signal = Signal::value(42);
        let mut slot = 0;
        assert!(signal.as_value(&mut slot));
        assert_eq!(slot, 42);
    }

    #[test]
    fn test_as_value_on_error_leaves_slot() {
        let signal: Signal<i32> = Signal::error(Error::msg("bad input"));
        let mut slot = 7;
        assert!(!signal.as_value(&mut slot));
        assert_eq!(slot, 7);
        assert_eq!(signal.err(), Some(&Error::msg("bad input")));
    }

    #[test]
    fn test_accessors() {
        let value = Signal::value("row");
        assert!(value.is_value());
        assert_eq!(value.raw_object(), Some(&"row"));
        assert_eq!(value.err(), None);

        let error: Signal<&str> = Signal::error(Error::Canceled);
        assert!(error.is_error());
        assert_eq!(error.raw_object(), None);
    }

    #[test]
    fn test_result_conversions() {
        let signal: Signal<u8> = Ok(3).into();
        assert_eq!(signal.clone().into_result(), Ok(3));
        assert_eq!(signal.map(|n| n * 2), Signal::Value(6));

        let signal: Signal<u8> = Err(Error::msg("nope")).into();
        assert_eq!(signal.into_result(), Err(Error::msg("nope")));
    }

    #[tokio::test]
    async fn test_as_value_or_signal_error_forwards() {
        let sink = RecordingSink::default();

        let mut slot = String::new();
        let ok = Signal::value("hello".to_string());
        assert!(ok.as_value_or_signal_error(&sink, &mut slot).await);
        assert_eq!(slot, "hello");
        assert!(sink.seen.lock().unwrap().is_empty());

        let failed: Signal<String> = Signal::error(Error::msg("upstream failed"));
        assert!(!failed.as_value_or_signal_error(&sink, &mut slot).await);
        assert_eq!(slot, "hello");
        assert_eq!(*sink.seen.lock().unwrap(), vec![Error::msg("upstream failed")]);
    }
}
