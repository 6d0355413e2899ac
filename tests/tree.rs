// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! End-to-end process-tree scenarios.

use cotree::{DrivingMode, ProcNode, Processing, Progress};

struct RootHarness;

impl Processing for RootHarness {
    fn name(&self) -> &str { "RootHarness" }
    fn process(&mut self) -> Progress { Progress::Pending }
}

struct Fibonacci {
    pendings_left: u32,
}

impl Processing for Fibonacci {
    fn name(&self) -> &str { "Fibonacci" }

    fn process(&mut self) -> Progress {
        if self.pendings_left == 0 {
            return Progress::Positive;
        }
        self.pendings_left -= 1;
        Progress::Pending
    }
}

/// `SPEC_FULL.md` §8 scenario 1: a root whose `process()` returns `Pending` five times
/// then `Positive`; the 6th tick observes success, a 7th is a no-op.
#[test]
fn fibonacci_tick_count() {
    let harness = ProcNode::new(RootHarness);
    let child = ProcNode::new(Fibonacci { pendings_left: 5 });
    harness.start(&child, DrivingMode::ParentDriven).expect("start");

    for _ in 0..5 {
        harness.tree_tick();
        assert!(child.success().is_pending());
    }

    harness.tree_tick();
    assert!(child.success().is_positive());

    // 7th tick: process() is not called again; success is latched.
    harness.tree_tick();
    assert!(child.success().is_positive());
}

#[derive(Default)]
struct ForeverPending {
    shutdown_ticks: u32,
}

impl Processing for ForeverPending {
    fn name(&self) -> &str { "ForeverPending" }
    fn process(&mut self) -> Progress { Progress::Pending }

    fn shutdown(&mut self) -> Progress {
        // Matches SPEC_FULL.md §8 scenario 3: Pending once, then Positive.
        self.shutdown_ticks += 1;
        if self.shutdown_ticks == 1 {
            Progress::Pending
        } else {
            Progress::Positive
        }
    }
}

/// `SPEC_FULL.md` §8 scenario 3: repelling a child whose `process()` never finishes but
/// whose `shutdown()` takes two ticks to complete.
#[test]
fn repel_during_work_completes_within_two_ticks() {
    let harness = ProcNode::new(RootHarness);
    let child = ProcNode::new(ForeverPending::default());
    harness.start(&child, DrivingMode::ParentDriven).expect("start");

    harness.tree_tick();
    assert!(!child.shutdown_done());

    harness.repel(&child);

    harness.tree_tick();
    harness.tree_tick();
    assert!(child.shutdown_done(), "child should be terminated within two ticks of repel");
}

struct FailsOnThirdTick {
    ticks: u32,
}

impl Processing for FailsOnThirdTick {
    fn name(&self) -> &str { "FailsOnThirdTick" }

    fn process(&mut self) -> Progress {
        self.ticks += 1;
        if self.ticks >= 3 {
            Progress::err(-7)
        } else {
            Progress::Pending
        }
    }
}

struct ChildOfFailing;

impl Processing for ChildOfFailing {
    fn name(&self) -> &str { "ChildOfFailing" }
    fn process(&mut self) -> Progress { Progress::Pending }
}

/// When a parent's `process()` fails, its still-running children are shut down
/// automatically (`SPEC_FULL.md` §4.1 error handling).
#[test]
fn parent_failure_propagates_shutdown_to_children() {
    let root = ProcNode::new(RootHarness);
    let parent = ProcNode::new(FailsOnThirdTick { ticks: 0 });
    root.start(&parent, DrivingMode::ParentDriven).expect("start parent");
    let child = ProcNode::new(ChildOfFailing);
    parent.start(&child, DrivingMode::ParentDriven).expect("start child");

    for _ in 0..3 {
        root.tree_tick();
    }

    assert!(parent.success().is_err());

    // One more tick to let shutdown propagate and complete.
    root.tree_tick();
    assert!(child.shutdown_done());
}

struct AlwaysSucceeds;

impl Processing for AlwaysSucceeds {
    fn name(&self) -> &str { "AlwaysSucceeds" }
    fn process(&mut self) -> Progress { Progress::Positive }
}

/// `when_finished_repel` auto-repels a child once it reaches `Finished`, without the
/// parent having to call `repel` explicitly.
#[test]
fn when_finished_repel_tears_down_automatically() {
    let root = ProcNode::new(RootHarness);
    let child = ProcNode::new(AlwaysSucceeds);
    root.start(&child, DrivingMode::ParentDriven).expect("start");
    root.when_finished_repel(&child);

    root.tree_tick();
    assert!(child.success().is_positive());

    root.tree_tick();
    assert!(child.shutdown_done());
}

/// Starting a child on a parent that has already entered shutdown is rejected.
#[test]
fn start_during_parent_shutdown_is_rejected() {
    let root = ProcNode::new(RootHarness);
    let parent = ProcNode::new(ForeverPending::default());
    root.start(&parent, DrivingMode::ParentDriven).expect("start parent");

    root.repel(&parent);
    root.tree_tick(); // enters ShuttingDown

    let late_child = ProcNode::new(ChildOfFailing);
    let result = parent.start(&late_child, DrivingMode::ParentDriven);
    assert!(result.is_err());
}
