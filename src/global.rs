// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! Process-wide teardown registry.
//!
//! `global_destructor_register` is the only sanctioned way for libraries with
//! process-wide state (network stack init, TLS, DNS resolvers) to hook shutdown. It
//! stores a callback in a LIFO list; [`run_global_destructors`] invokes them in reverse
//! registration order exactly once, normally called by the root `ProcNode` once it
//! reaches `Terminated`.
//!
//! Modeled the way the teacher models its thread-safe singletons: a `static` container
//! (`Mutex`) holding a payload (`Vec`) that's only ever mutated behind the lock, never
//! read racily.

use std::sync::Mutex;

type Destructor = Box<dyn FnOnce() + Send + 'static>;

static DESTRUCTORS: Mutex<Vec<Destructor>> = Mutex::new(Vec::new());
static RAN: Mutex<bool> = Mutex::new(false);

/// Pushes `f` onto the LIFO teardown list.
pub fn global_destructor_register<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    let mut list = DESTRUCTORS.lock().unwrap_or_else(|e| e.into_inner());
    list.push(Box::new(f));
}

/// Runs every registered destructor in reverse registration order, exactly once.
///
/// A second call is a no-op (logged at `trace` level) — teardown must not double-run
/// if, e.g., both a root `ProcNode`'s `Drop` and an explicit shutdown path call this.
pub fn run_global_destructors() {
    let mut ran = RAN.lock().unwrap_or_else(|e| e.into_inner());
    if *ran {
        tracing::trace!("global destructors already ran; skipping");
        return;
    }
    *ran = true;
    drop(ran);

    let mut list = DESTRUCTORS.lock().unwrap_or_else(|e| e.into_inner());
    let pending: Vec<_> = list.drain(..).collect();
    drop(list);

    for f in pending.into_iter().rev() {
        f();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::{Arc, Mutex as StdMutex};

    /// `DESTRUCTORS`/`RAN` are process-wide statics; tests that exercise them must not
    /// interleave, hence `#[serial]`.
    #[test]
    #[serial]
    fn runs_in_reverse_registration_order() {
        // Reset process-wide state left over from a previous test in this binary.
        *RAN.lock().unwrap() = false;
        DESTRUCTORS.lock().unwrap().clear();

        let order = Arc::new(StdMutex::new(Vec::new()));

        for id in [1, 2, 3] {
            let order = Arc::clone(&order);
            global_destructor_register(move || order.lock().unwrap().push(id));
        }

        run_global_destructors();

        assert_eq!(*order.lock().unwrap(), vec![3, 2, 1]);
    }

    #[test]
    #[serial]
    fn second_run_is_a_no_op() {
        *RAN.lock().unwrap() = false;
        DESTRUCTORS.lock().unwrap().clear();

        let calls = Arc::new(StdMutex::new(0));
        let calls_clone = Arc::clone(&calls);
        global_destructor_register(move || *calls_clone.lock().unwrap() += 1);

        run_global_destructors();
        run_global_destructors();

        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
