// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! Tracing setup for applications built on `cotree`.
//!
//! Every tick-path log call in the core goes through `tracing::{trace, debug, warn,
//! error}!`, never `println!`. This module wires those calls to an actual subscriber;
//! a binary embedding `cotree` calls [`init_tracing`] once, near the top of `main`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines end up in addition to whatever the ambient env-filter keeps.
#[derive(Debug, Clone)]
pub enum WriterConfig {
    /// stdout only.
    Stdout,
    /// A daily-rolling file under `dir` with the given filename prefix.
    RollingFile { dir: String, prefix: String },
    /// Both stdout and a rolling file.
    StdoutAndRollingFile { dir: String, prefix: String },
}

/// Installs a global `tracing` subscriber built from `level` and `writer`.
///
/// `level` is the default filter directive (e.g. `"info"`, `"cotree=debug,warn"`); it is
/// overridden by `RUST_LOG` when that variable is set, matching `EnvFilter`'s normal
/// precedence.
///
/// Returns the file appender's worker guard, if a rolling file was configured — the
/// caller must keep it alive for the process lifetime or buffered lines are lost on
/// drop.
pub fn init_tracing(
    level: &str,
    writer: WriterConfig,
) -> miette::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = EnvFilter::try_new(level)
        .map_err(|e| miette::miette!("invalid log level directive {level:?}: {e}"))?;

    let stdout_layer = matches!(
        writer,
        WriterConfig::Stdout | WriterConfig::StdoutAndRollingFile { .. }
    )
    .then(|| tracing_subscriber::fmt::layer().with_target(false));

    let (file_layer, guard) = match &writer {
        WriterConfig::RollingFile { dir, prefix }
        | WriterConfig::StdoutAndRollingFile { dir, prefix } => {
            let appender = tracing_appender::rolling::daily(dir, prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(non_blocking);
            (Some(layer), Some(guard))
        }
        WriterConfig::Stdout => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| miette::miette!("tracing subscriber already installed: {e}"))?;

    Ok(guard)
}
