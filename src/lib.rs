//! handoff library root.
//!
//! A producer task pushes items into a capacity-1 mailbox through a context
//! that races every send against a shared cancellation token.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;

pub use cancel::{CancelToken, Cancellation};
pub use config::{load_settings, Settings};
pub use error::{Error, Result};
pub use protocol::{
    drain_signals, spawn_error_producer, spawn_object_producer, spawn_signal_producer, ErrorContext,
    ErrorSink, MailboxReceiver, MailboxSender, ObjectContext, Signal, SignalContext,
};
