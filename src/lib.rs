//! taskmirror - Local Task Mirror Library
//!
//! This library keeps a local list of taskwarrior-style tasks, records
//! every local edit, and reconciles with a taskwarrior store on demand.
//!
//! # Core Concepts
//!
//! - **Tasks**: Records with a uuid identity and free-form extra attributes
//! - **Local changes**: Snapshots of tasks edited since the last sync
//! - **Visibility**: Which tasks a listing shows, including wait promotion
//! - **Sync**: Push local changes, then adopt the store's task list
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `codec`: Task wire format (taskwarrior JSON records)
//! - `config`: Configuration loading from `taskmirror.toml`
//! - `error`: Error types and result aliases
//! - `filter`: User-defined list filters and autocompletion
//! - `ledger`: Local change ledger
//! - `lock`: File locking and atomic writes
//! - `notify`: Due-date reminders
//! - `remote`: Remote store seam and the taskwarrior command adapter
//! - `repository`: Persistence collaborator and sync result
//! - `session`: The task session that owns the live list
//! - `signal`: Close-detail signal channel
//! - `storage`: Data directory layout
//! - `task`: Task entity
//! - `visibility`: Display policy

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod lock;
pub mod notify;
pub mod output;
pub mod remote;
pub mod repository;
pub mod session;
pub mod signal;
pub mod storage;
pub mod task;
pub mod visibility;

pub use error::{Error, Result};
