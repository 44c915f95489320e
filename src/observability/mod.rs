//! Observability for finvault
//!
//! A single concern: the structured event log. Every producer and consumer
//! step emits one event line, so a scheduled run leaves a complete transcript
//! in the journal and an interactive run shows the operator what happened.

mod logger;

pub use logger::{Logger, Severity};
