// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! Setup-path error types.
//!
//! Tick-path failures never surface here — a `Processing` reports failure through
//! [`Progress::Err`](crate::progress::Progress::Err). `CoreError` is for the
//! fallible operations that happen *around* the tree: opening the lock directory,
//! spawning an own-thread driver, loading configuration.

use std::path::PathBuf;

/// Errors from setup-path operations across the crate.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum CoreError {
    /// [`std::thread::Builder::spawn`] failed, typically because of OS thread limits.
    #[error("failed to spawn own-thread driver for {proc_name:?}")]
    #[diagnostic(
        code(cotree::driver::thread_spawn),
        help("check OS thread limits (`ulimit -u`) and available stack memory")
    )]
    ThreadSpawn {
        proc_name: String,
        #[source]
        source: std::io::Error,
    },

    /// The flag-lock base directory could not be opened or created.
    #[error("failed to open lock directory at {path}")]
    #[diagnostic(
        code(cotree::flaglock::dir_open),
        help("check that the parent directory exists and is writable")
    )]
    LockDirOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `ThreadPooling` was started with zero workers.
    #[error("thread pool requires at least one worker")]
    #[diagnostic(
        code(cotree::pool::no_workers),
        help("call `ThreadPooling::with_worker_count` with a value >= 1")
    )]
    NoWorkersConfigured,

    /// A child was `start()`-ed onto a parent that is already shutting down.
    #[error("cannot start {child_name:?} on parent {parent_name:?}: parent is shutting down")]
    #[diagnostic(code(cotree::processing::start_during_shutdown))]
    StartDuringShutdown { parent_name: String, child_name: String },
}
