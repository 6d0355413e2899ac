// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! Drivers: the things that actually call [`tree_tick`](crate::processing::ProcNode::tree_tick).
//!
//! A [`DrivingMode::ParentDriven`](crate::DrivingMode::ParentDriven) node has no driver
//! of its own; its parent's tick recurses into it. A
//! [`DrivingMode::OwnThread`](crate::DrivingMode::OwnThread) node gets a dedicated OS
//! thread, spawned by [`ProcNode::start`](crate::ProcNode::start) with the stack size
//! configured here. A [`DrivingMode::External`](crate::DrivingMode::External) node
//! expects some other subsystem — [`pool::ThreadPooling`](crate::pool::ThreadPooling) is
//! the one this crate ships — to call `tree_tick()` on its behalf.

use std::sync::atomic::{AtomicUsize, Ordering};

static DEFAULT_STACK_SIZE_KB: AtomicUsize = AtomicUsize::new(512);

/// Sets the stack size (in KiB) used for subsequently spawned
/// [`DrivingMode::OwnThread`](crate::DrivingMode::OwnThread) driver threads. Does not
/// affect threads already spawned. Typically set once at startup via
/// [`Config::apply_stack_size`](crate::config::Config::apply_stack_size).
pub fn set_default_stack_size_kb(kb: usize) {
    DEFAULT_STACK_SIZE_KB.store(kb.max(1), Ordering::Relaxed);
}

/// The stack size (in KiB) that will be used for the next own-thread driver spawn.
#[must_use]
pub fn default_stack_size_kb() -> usize { DEFAULT_STACK_SIZE_KB.load(Ordering::Relaxed) }

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn default_is_512_kb_until_changed() {
        set_default_stack_size_kb(512);
        assert_eq!(default_stack_size_kb(), 512);
    }

    #[test]
    #[serial]
    fn set_default_stack_size_kb_updates_future_reads() {
        set_default_stack_size_kb(2048);
        assert_eq!(default_stack_size_kb(), 2048);
        set_default_stack_size_kb(512);
    }

    #[test]
    #[serial]
    fn zero_is_clamped_to_one_kb() {
        set_default_stack_size_kb(0);
        assert_eq!(default_stack_size_kb(), 1);
        set_default_stack_size_kb(512);
    }
}
