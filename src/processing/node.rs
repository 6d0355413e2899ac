// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! [`ProcNode`] — a cheaply cloneable handle onto one node of the process tree.
//!
//! A `ProcNode` is `Arc<Mutex<NodeInner>>` under a newtype. Cloning it is how the tree
//! shares a child between the parent's own child list and, for [`DrivingMode::OwnThread`]
//! children, the dedicated driver thread. The mutex is what actually enforces "exactly
//! one driver is responsible for a `Processing` at any instant" (`SPEC_FULL.md` §3) —
//! two drivers racing to tick the same node simply serialize on the lock instead of
//! corrupting state.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{DrivingMode, Lifecycle, ProcId, Processing};
use crate::error::CoreError;
use crate::progress::Progress;
use crate::CoreResult;

struct NodeInner {
    id: ProcId,
    name: String,
    proc: Box<dyn Processing>,
    lifecycle: Lifecycle,
    success: Progress,
    driving_mode: DrivingMode,
    cancelled: bool,
    when_finished_repel: bool,
    children: Vec<ProcNode>,
    driver: Option<std::thread::JoinHandle<()>>,
}

/// A handle onto one node of the process tree.
///
/// `Clone` is cheap (an `Arc` bump) and is how a child is shared between its parent's
/// child list and its own driver thread, if it has one.
#[derive(Clone)]
pub struct ProcNode(Arc<Mutex<NodeInner>>);

impl ProcNode {
    /// Wraps `processing` in a fresh, unparented `ProcNode` in the `Created` state.
    /// Attach it to a tree with [`ProcNode::start`].
    #[must_use]
    pub fn new(processing: impl Processing + 'static) -> Self {
        let name = processing.name().to_owned();
        Self(Arc::new(Mutex::new(NodeInner {
            id: ProcId::next(),
            name,
            proc: Box::new(processing),
            lifecycle: Lifecycle::Created,
            success: Progress::Pending,
            driving_mode: DrivingMode::ParentDriven,
            cancelled: false,
            when_finished_repel: false,
            children: Vec::new(),
            driver: None,
        })))
    }

    #[must_use]
    pub fn id(&self) -> ProcId { self.lock().id }

    #[must_use]
    pub fn name(&self) -> String { self.lock().name.clone() }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle { self.lock().lifecycle }

    #[must_use]
    pub fn driving_mode(&self) -> DrivingMode { self.lock().driving_mode }

    /// Current latched progress. `Pending` until the node's `process()` first reports
    /// otherwise; never changes back to `Pending` after that (P2).
    #[must_use]
    pub fn success(&self) -> Progress { self.lock().success }

    /// True iff this node has reached `Terminated`.
    #[must_use]
    pub fn shutdown_done(&self) -> bool { self.lock().lifecycle.is_terminated() }

    #[must_use]
    pub fn is_cancelled(&self) -> bool { self.lock().cancelled }

    /// Number of children currently attached (not yet `Terminated`-and-reaped). Used by
    /// callers that host submitted work as children of a phantom root and need a load
    /// count without their own separate bookkeeping (e.g. a `ThreadPooling` worker).
    #[must_use]
    pub fn child_count(&self) -> usize { self.lock().children.len() }

    fn lock(&self) -> std::sync::MutexGuard<'_, NodeInner> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Attaches `child` to `self`, choosing how it will be driven. `child` must have
    /// been created but not yet started.
    ///
    /// Rejected (logged, no-op) if `self` is already shutting down — see
    /// `SPEC_FULL.md` §9.
    pub fn start(&self, child: &ProcNode, mode: DrivingMode) -> CoreResult<()> {
        let (parent_name, parent_shutting_down) = {
            let inner = self.lock();
            (inner.name.clone(), inner.lifecycle.is_shutting_down() || inner.lifecycle.is_terminated())
        };

        if parent_shutting_down {
            let child_name = child.name();
            tracing::warn!(
                parent = %parent_name,
                child = %child_name,
                "start() rejected: parent is already shutting down"
            );
            return Err(CoreError::StartDuringShutdown { parent_name, child_name });
        }

        {
            let mut c = child.lock();
            assert!(
                matches!(c.lifecycle, Lifecycle::Created),
                "ProcNode::start: child {:?} was already started",
                c.name
            );
            c.driving_mode = mode;
            c.lifecycle = Lifecycle::Started;
            if mode == DrivingMode::OwnThread {
                let stack_kb = crate::driver::default_stack_size_kb();
                let handle_for_thread = child.clone();
                let thread_name = c.name.clone();
                let builder = std::thread::Builder::new()
                    .name(thread_name.clone())
                    .stack_size(stack_kb * 1024);
                let join = builder
                    .spawn(move || own_thread_drive_loop(handle_for_thread))
                    .map_err(|source| CoreError::ThreadSpawn { proc_name: thread_name, source })?;
                c.driver = Some(join);
            }
        }

        self.lock().children.push(child.clone());
        Ok(())
    }

    /// Requests `child`'s orderly shutdown without affecting siblings. Idempotent.
    pub fn repel(&self, child: &ProcNode) { child.request_shutdown(false); }

    /// Like [`ProcNode::repel`] but also marks `child` as cancelled (observable via
    /// [`ProcNode::is_cancelled`] and [`Processing::on_cancel`]) for implementations
    /// that distinguish forceful teardown from orderly shutdown.
    pub fn cancel(&self, child: &ProcNode) { child.request_shutdown(true); }

    /// Marks `child` to be repelled automatically once it reaches `Finished`.
    pub fn when_finished_repel(&self, child: &ProcNode) { child.lock().when_finished_repel = true; }

    fn request_shutdown(&self, cancelled: bool) {
        let mut inner = self.lock();
        if cancelled && !inner.cancelled {
            inner.cancelled = true;
            drop(inner);
            self.lock().proc.on_cancel();
            inner = self.lock();
        }
        match inner.lifecycle {
            Lifecycle::Terminated | Lifecycle::ShutdownRequested | Lifecycle::ShuttingDown => {}
            _ => inner.lifecycle = Lifecycle::ShutdownRequested,
        }
    }

    /// The tick entrypoint. Exactly one driver should call this per node per tick — see
    /// `SPEC_FULL.md` §4.1 for the full contract.
    pub fn tree_tick(&self) {
        let mut inner = self.lock();
        inner.tick();
    }

    /// Ticks `self` as the root of a tree: identical to [`ProcNode::tree_tick`], except
    /// that the moment `self` first reaches `Terminated` it also runs
    /// [`crate::global::run_global_destructors`] (`SPEC_FULL.md` §4.7, §7). Use this for
    /// the actual tree root; use `tree_tick` for everything below it.
    pub fn tick_root(&self) {
        let was_terminated = self.shutdown_done();
        self.tree_tick();
        if !was_terminated && self.shutdown_done() {
            crate::global::run_global_destructors();
        }
    }

    /// Renders a pre-order, indented process-info tree rooted at `self`. Format is
    /// human-readable only; no compatibility guarantees (`SPEC_FULL.md` §6).
    #[must_use]
    pub fn process_info(&self) -> String {
        let mut out = String::new();
        self.render_info(&mut out, 0);
        out
    }

    fn render_info(&self, out: &mut String, depth: usize) {
        let inner = self.lock();
        let indent = "  ".repeat(depth);
        use std::fmt::Write as _;
        let _ = writeln!(out, "{indent}{} ({})", inner.name, inner.id);
        let _ = writeln!(out, "{indent}  State\t\t{}", inner.lifecycle);
        let _ = writeln!(out, "{indent}  Success\t\t{:?}", inner.success);
        let mut scratch = String::new();
        inner.proc.process_info(&mut scratch);
        for line in scratch.lines() {
            let _ = writeln!(out, "{indent}  {line}");
        }
        let children = inner.children.clone();
        drop(inner);
        for child in &children {
            child.render_info(out, depth + 1);
        }
    }
}

impl NodeInner {
    /// One `tree_tick()` step. See `SPEC_FULL.md` §4.1's six-step contract.
    fn tick(&mut self) {
        if self.lifecycle.is_terminated() {
            return;
        }

        if self.lifecycle == Lifecycle::Started {
            self.lifecycle = Lifecycle::Running;
        }

        if self.lifecycle == Lifecycle::Running {
            let progress = self.proc.process();
            self.success = progress;
            if progress.is_final() {
                self.lifecycle = Lifecycle::Finished;
                if let Some(code) = progress.err_code() {
                    tracing::error!(proc = %self.name, code, "process() failed; shutting down children");
                    for child in &self.children {
                        child.request_shutdown(false);
                    }
                }
            }
        }

        let snapshot = self.children.clone();
        for child in &snapshot {
            if child.driving_mode() == DrivingMode::ParentDriven {
                child.tree_tick();
            }
        }

        for child in &snapshot {
            let (finished, repel_on_finish) = {
                let c = child.lock();
                (c.lifecycle == Lifecycle::Finished, c.when_finished_repel)
            };
            if finished && repel_on_finish {
                child.request_shutdown(false);
            }
        }

        if self.lifecycle.is_shutting_down() {
            if self.lifecycle == Lifecycle::ShutdownRequested {
                self.lifecycle = Lifecycle::ShuttingDown;
            }
            for child in &snapshot {
                if !child.shutdown_done() {
                    child.request_shutdown(false);
                }
            }
            let progress = self.proc.shutdown();
            if progress.is_final() {
                if let Some(code) = progress.err_code() {
                    tracing::error!(proc = %self.name, code, "shutdown() failed; treating as terminal");
                }
                self.lifecycle = Lifecycle::Terminated;
            }
        }

        let (terminated, remaining): (Vec<_>, Vec<_>) =
            snapshot.into_iter().partition(|c| c.shutdown_done());
        for child in terminated {
            child.join_driver_if_any();
        }
        self.children = remaining;
    }
}

impl ProcNode {
    fn join_driver_if_any(&self) {
        let handle = self.lock().driver.take();
        if let Some(handle) = handle {
            if let Err(panic) = handle.join() {
                tracing::error!(proc = %self.name(), ?panic, "own-thread driver panicked");
            }
        }
    }
}

/// The own-thread driver's loop: tick until terminated, then return (the thread exits
/// and the owning [`ProcNode`] joins it the next time its parent collects terminated
/// children).
fn own_thread_drive_loop(node: ProcNode) {
    loop {
        node.tree_tick();
        if node.shutdown_done() {
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}
