// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! `cotree` — a framework for building long-running applications as hierarchical
//! cooperative state machines.
//!
//! Every unit of work is a [`Processing`]: it owns sub-work, is advanced by periodic
//! ticks, and reports one of three [`Progress`] values. The framework wires these units
//! into a tree ([`ProcNode`]), drives them with one or more [drivers](driver), and
//! exposes auxiliary services that only make sense inside this model: a bounded typed
//! [`Pipe`](pipe::Pipe), a [`ThreadPooling`](pool::ThreadPooling) broker/worker system,
//! and cross-process [filesystem flag locks](flaglock).
//!
//! # Orientation
//!
//! - [`processing`] — the `Processing` trait, lifecycle state machine, and `ProcNode`
//!   tree.
//! - [`pipe`] — `Pipe<T>`, the bounded commit/peek/erase/rollback channel.
//! - [`driver`] — execution engines that call `tree_tick()`.
//! - [`pool`] — `ThreadPooling`, the broker/worker dispatcher built on `Pipe`.
//! - [`flaglock`] — cross-process named locks via marker files.
//! - [`transfer`] — the `Transfering` byte-stream contract.
//! - [`global`] — the process-wide destructor registry.
//! - [`logging`] / [`config`] — ambient stack: tracing setup and CLI configuration.

pub mod config;
pub mod driver;
pub mod error;
pub mod flaglock;
pub mod global;
pub mod logging;
pub mod pipe;
pub mod pool;
pub mod processing;
pub mod progress;
pub mod transfer;

/// Re-exported so the [`proc_state!`] macro can name `strum_macros` without requiring
/// every caller to depend on it directly.
#[doc(hidden)]
pub mod __private {
    pub use strum_macros;
}

pub use error::CoreError;
pub use pipe::{Pipe, PipeEntry};
pub use processing::{DrivingMode, ProcId, ProcNode, Processing};
pub use progress::Progress;
pub use transfer::Transfering;

/// Crate-wide result alias for fallible setup paths (config loading, flag-lock OS
/// failures). Tick-path results never use this — `process()`/`shutdown()` report
/// failure through [`Progress::Err`], not `Result`.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
