// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! The fixed macro-lifecycle every [`super::ProcNode`] advances through, independent of
//! whatever private states a concrete [`super::Processing`] keeps in `process()`.

/// `Created -> Started -> Running -> Finished -> ShutdownRequested -> ShuttingDown ->
/// Terminated`. See `SPEC_FULL.md` §4.1 for the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Lifecycle {
    Created,
    Started,
    Running,
    Finished,
    ShutdownRequested,
    ShuttingDown,
    Terminated,
}

impl Lifecycle {
    #[must_use]
    pub const fn is_terminated(self) -> bool { matches!(self, Self::Terminated) }

    #[must_use]
    pub const fn is_shutting_down(self) -> bool {
        matches!(self, Self::ShutdownRequested | Self::ShuttingDown)
    }

    #[must_use]
    pub const fn is_running(self) -> bool { matches!(self, Self::Running) }
}
