// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! [`Transfering`] — the abstract byte-stream specialization of [`Processing`].
//!
//! This crate ships only the contract. Concrete wrappers around sockets, pipes, or files
//! live outside the core (`SPEC_FULL.md` §1 scopes protocol wrappers out); they implement
//! `Transfering` the way a DNS or HTTP collaborator would implement `Processing` today.

use crate::processing::Processing;

/// A `Processing` that additionally exposes a non-blocking byte-stream contract.
///
/// Every method here must return without blocking, consistent with the rest of the
/// tick-driven model: `send`/`read` may transfer zero bytes rather than wait.
pub trait Transfering: Processing {
    /// Attempts to write up to `buf.len()` bytes. Returns the number of bytes actually
    /// written (which may be `0`), or a negative value on a fatal channel error.
    fn send(&mut self, buf: &[u8]) -> isize;

    /// Attempts to read up to `buf.len()` bytes into `buf`. Returns the number of bytes
    /// read (`0` if none are currently available), or a negative value at end-of-stream
    /// or on a fatal error.
    fn read(&mut self, buf: &mut [u8]) -> isize;

    /// Marks the writable side closed from this end. Idempotent.
    fn done(&mut self);

    /// Whether a call to `send` is currently expected to make progress.
    fn send_ready(&self) -> bool;

    /// Whether a call to `read` is currently expected to make progress.
    fn read_ready(&self) -> bool;
}
