// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! One `ThreadPooling` worker: a secondary assignment queue plus a phantom root that
//! hosts assigned Processings as ordinary `ParentDriven` children, ticked either by its
//! own dedicated thread or externally by the broker.
//!
//! Assigned work is a real `ProcNode` child, not a raw `Box<dyn Processing>` ticked by
//! hand — `SPEC_FULL.md` §4.4 is explicit that a worker "calls `tree_tick()` on every
//! active Processing", so this reuses the same `Lifecycle`/shutdown-propagation/
//! error-logging machinery every other node in the tree gets, instead of a parallel
//! reimplementation of it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::driver::default_stack_size_kb;
use crate::processing::{DrivingMode, ProcNode, Processing};
use crate::progress::Progress;

/// Never finishes on its own; exists only so assigned work has somewhere to attach as
/// `ParentDriven` children under the ordinary tree machinery.
struct WorkerRoot;

impl Processing for WorkerRoot {
    fn name(&self) -> &str { "pool-worker-root" }
    fn process(&mut self) -> Progress { Progress::Pending }
}

pub(super) struct Worker {
    root: ProcNode,
    queue: Mutex<VecDeque<Box<dyn Processing>>>,
    shutting_down: AtomicBool,
    terminated: AtomicBool,
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl Worker {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self {
            root: ProcNode::new(WorkerRoot),
            queue: Mutex::new(VecDeque::new()),
            shutting_down: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
            thread: Mutex::new(None),
        })
    }

    /// Current in-flight count: queued plus actively driven. Used for the broker's
    /// least-loaded routing and surfaced via `ThreadPooling::worker_loads`.
    pub(super) fn load(&self) -> usize {
        let queued = self.queue.lock().unwrap_or_else(|e| e.into_inner()).len();
        queued + self.root.child_count()
    }

    pub(super) fn assign(&self, proc: Box<dyn Processing>) {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).push_back(proc);
    }

    /// Drains the assignment queue into the root's child list, then ticks the root
    /// once — which drives every active child's `process()`/`shutdown()` and reaps any
    /// that reached `Terminated`, exactly as it would for any other tree node.
    pub(super) fn tick_once(&self) {
        {
            let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            while let Some(proc) = queue.pop_front() {
                let child = ProcNode::new(proc);
                self.root
                    .start(&child, DrivingMode::ParentDriven)
                    .expect("worker root never enters shutdown while accepting work");
                // Nothing else observes a submitted Processing directly, so repel it
                // the instant it finishes rather than leaving it attached forever.
                self.root.when_finished_repel(&child);
            }
        }
        self.root.tree_tick();
    }

    pub(super) fn begin_shutdown(&self) { self.shutting_down.store(true, Ordering::SeqCst); }

    pub(super) fn is_shutting_down(&self) -> bool { self.shutting_down.load(Ordering::SeqCst) }

    pub(super) fn is_terminated(&self) -> bool { self.terminated.load(Ordering::SeqCst) }

    fn queue_and_active_are_empty(&self) -> bool {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).is_empty() && self.root.child_count() == 0
    }

    /// Advances shutdown by one step: continues driving whatever is already queued or
    /// active to completion, accepting no further submissions, and marks itself
    /// terminated once both are empty. Safe to call repeatedly.
    pub(super) fn shutdown_tick(&self) {
        if self.terminated.load(Ordering::SeqCst) {
            return;
        }
        self.tick_once();
        if self.queue_and_active_are_empty() {
            self.terminated.store(true, Ordering::SeqCst);
        }
    }

    pub(super) fn spawn_own_thread(self: &Arc<Self>) {
        let worker = Arc::clone(self);
        let stack_kb = default_stack_size_kb();
        let builder = std::thread::Builder::new().name("pool-worker".into()).stack_size(stack_kb * 1024);
        let handle = builder
            .spawn(move || loop {
                if worker.is_shutting_down() {
                    worker.shutdown_tick();
                    if worker.is_terminated() {
                        return;
                    }
                } else {
                    worker.tick_once();
                }
                std::thread::sleep(Duration::from_millis(1));
            })
            .expect("spawning a pool worker thread should not fail under normal OS limits");
        *self.thread.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    pub(super) fn join_if_own_thread(&self) {
        let handle = self.thread.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}
