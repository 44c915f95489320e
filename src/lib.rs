//! finvault - snapshot backup and restore tooling for the personal finance app
//!
//! The web application keeps its state in a single SQLite database file plus an
//! uploads directory tree (receipt scans and tax documents). finvault protects
//! that state with two sequential operations:
//!
//! - `backup`: produce a self-contained, timestamped snapshot directory
//!   (consistent database copy, tar.gz of the uploads tree, plain-text
//!   manifest), maintain the `latest` pointer, prune expired snapshots, and
//!   mirror the collection to a remote store.
//! - `restore`: select a snapshot (listing, `latest`, ordinal, or name),
//!   confirm with the operator, take a safety snapshot, and overwrite the live
//!   database and uploads tree with service lifecycle control around the
//!   destructive steps.
//!
//! Both operations are single-threaded and hold an advisory lock file for
//! their full duration, so a scheduled backup and a manual restore can never
//! interleave.

pub mod backup;
pub mod cli;
pub mod config;
pub mod lock;
pub mod observability;
pub mod report;
pub mod restore;
pub mod service;
pub mod snapshot;
