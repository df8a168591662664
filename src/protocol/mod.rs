//! Handoff protocol between one producer task and one consumer task.
//!
//! This module defines:
//! - Capacity-1 mailboxes and their read/write ends
//! - The tagged value-or-error payload (`Signal`)
//! - Producer contexts that race each send against cancellation
//! - Producer sessions that close their mailbox when the producer returns

pub mod context;
pub mod mailbox;
pub mod session;
pub mod signal;

pub use context::{Delivery, ErrorContext, Handoff, ObjectContext, SignalContext};
pub use mailbox::{
    channel, error_channel, object_channel, signal_channel, MailboxReceiver, MailboxSender,
    MAILBOX_CAPACITY,
};
pub use session::{
    collect_errors, drain_signals, fan_in_errors, join_producer, spawn_error_producer,
    spawn_object_producer, spawn_signal_producer,
};
pub use signal::{ErrorSink, Signal};
