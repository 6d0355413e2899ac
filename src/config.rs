// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! Process-wide configuration surface.
//!
//! Deliberately small: this is not a general-purpose CLI for applications built on
//! `cotree` (that's out of scope — see `SPEC_FULL.md` §1), just the handful of
//! process-wide knobs the core itself needs a default for.

use std::path::PathBuf;

use clap::Parser;

/// Process-wide knobs for the core. Construct with [`Config::parse`] in `main`, or
/// build one directly for embedding in a larger application's own CLI.
#[derive(Debug, Clone, Parser)]
#[command(name = "cotree", about = "cooperative process-tree runtime configuration")]
pub struct Config {
    /// Default stack size, in KiB, for own-thread drivers created after this config is
    /// applied. Individual drivers may still request a larger stack.
    #[arg(long, default_value_t = 512)]
    pub own_thread_stack_kb: usize,

    /// Default worker count for a `ThreadPooling` broker that isn't given one
    /// explicitly.
    #[arg(long, default_value_t = 4)]
    pub pool_workers: u16,

    /// Base directory for filesystem flag locks.
    #[arg(long, default_value = "/tmp/cotree-locks")]
    pub lock_base_dir: PathBuf,

    /// Default `tracing` filter directive, e.g. `info` or `cotree=debug,warn`.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Pushes `own_thread_stack_kb` into the process-wide default used by subsequently
    /// spawned own-thread drivers. Call once during startup, after parsing.
    pub fn apply_stack_size(&self) {
        crate::driver::set_default_stack_size_kb(self.own_thread_stack_kb);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            own_thread_stack_kb: 512,
            pool_workers: 4,
            lock_base_dir: PathBuf::from("/tmp/cotree-locks"),
            log_level: "info".to_owned(),
        }
    }
}
