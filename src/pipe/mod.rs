// Copyright (c) 2026 the cotree authors. Licensed under the Apache License, Version 2.0.

//! `Pipe<T>` — a bounded, typed, single-producer/single-consumer buffer with
//! commit/peek/erase/rollback semantics.
//!
//! Unlike a plain ring buffer, a `Pipe` distinguishes *committing* an entry (making it
//! visible to the consumer) from *staging* one: a producer can write several entries
//! and then [`rollback`](Pipe::rollback) the ones it decided not to keep, as long as
//! the consumer hasn't observed them yet. In this implementation every `commit` is
//! immediately visible — there is no separate staging API — so `rollback` simply
//! un-commits the most recently committed entries. See [`Pipe::rollback`] for the
//! precise contract.

use std::collections::VecDeque;
use std::sync::Mutex;

/// One buffered item plus its monotonically increasing sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeEntry<T> {
    pub particle: T,
    pub idx: u64,
}

struct Inner<T> {
    capacity: usize,
    entries: VecDeque<PipeEntry<T>>,
    next_idx: u64,
}

/// A bounded FIFO of [`PipeEntry<T>`].
///
/// The producer and consumer are each expected to be exactly one `Processing`;
/// concurrent use from multiple producers or multiple consumers is a logic error the
/// contract does not define behavior for (the internal mutex keeps it memory-safe
/// regardless, but ordering guarantees only hold for the single-producer/
/// single-consumer case).
pub struct Pipe<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Pipe<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Pipe capacity must be positive");
        Self {
            inner: Mutex::new(Inner {
                capacity,
                entries: VecDeque::with_capacity(capacity),
                next_idx: 0,
            }),
        }
    }

    /// Appends `item` as a new entry with the next sequence index.
    ///
    /// Returns `false` (and leaves the pipe unchanged) if the pipe is already at
    /// capacity.
    pub fn commit(&self, item: T) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.entries.len() >= inner.capacity {
            return false;
        }
        let idx = inner.next_idx;
        inner.next_idx += 1;
        inner.entries.push_back(PipeEntry { particle: item, idx });
        true
    }

    /// Non-destructive peek at the oldest visible entry.
    pub fn get(&self) -> Option<PipeEntry<T>>
    where
        T: Clone,
    {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.front().cloned()
    }

    /// Removes the oldest visible entry. Returns `false` if the pipe was empty.
    pub fn erase(&self) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.pop_front().is_some()
    }

    /// Removes and returns the oldest visible entry in one step.
    ///
    /// Unlike [`Pipe::get`], this does not require `T: Clone`; it's the consume
    /// operation for pipes carrying non-cloneable payloads, such as
    /// `Pipe<`[`PoolRequest`](crate::pool::PoolRequest)`>`, where `get`-then-`erase`
    /// would require cloning a boxed trait object.
    pub fn take(&self) -> Option<PipeEntry<T>> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.pop_front()
    }

    /// Count of currently visible (committed, not yet erased) entries.
    #[must_use]
    pub fn size(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.len()
    }

    /// Producer-side discard of the `n` most recently committed entries, provided none
    /// of them have been observed yet (i.e. they are still the newest `n` entries in
    /// the buffer). Entries older than those `n` are left untouched. `n` larger than
    /// the current size discards everything currently visible.
    ///
    /// This is the producer backing out of a partially staged multi-`commit` message;
    /// it must never be called by the consumer.
    pub fn rollback(&self, n: usize) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let drop_count = n.min(inner.entries.len());
        for _ in 0..drop_count {
            inner.entries.pop_back();
        }
        // Sequence numbers are never reused even across a rollback: the next `commit`
        // still gets a fresh `next_idx`, it does not rewind.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_and_sequence_numbers() {
        let pipe: Pipe<i32> = Pipe::new(4);
        for v in [10, 20, 30] {
            assert!(pipe.commit(v));
        }
        assert_eq!(pipe.size(), 3);

        let e0 = pipe.get().unwrap();
        assert_eq!((e0.particle, e0.idx), (10, 0));
        assert!(pipe.erase());

        let e1 = pipe.get().unwrap();
        assert_eq!((e1.particle, e1.idx), (20, 1));
    }

    /// Scenario from the spec: capacity 4, committing a 5th item overflows.
    #[test]
    fn commit_fails_past_capacity() {
        let pipe: Pipe<i32> = Pipe::new(4);
        for v in [10, 20, 30, 40] {
            assert!(pipe.commit(v));
        }
        assert!(!pipe.commit(50));
        assert_eq!(pipe.size(), 4);

        let mut seen = Vec::new();
        while let Some(entry) = pipe.get() {
            seen.push((entry.particle, entry.idx));
            pipe.erase();
        }
        assert_eq!(seen, vec![(10, 0), (20, 1), (30, 2), (40, 3)]);
    }

    #[test]
    fn erase_on_empty_is_a_no_op() {
        let pipe: Pipe<i32> = Pipe::new(2);
        assert!(!pipe.erase());
        assert_eq!(pipe.size(), 0);
    }

    #[test]
    fn rollback_discards_uncommitted_tail_and_frees_capacity() {
        let pipe: Pipe<i32> = Pipe::new(4);
        for v in [1, 2, 3, 4] {
            assert!(pipe.commit(v));
        }
        // Back out the last two staged entries.
        pipe.rollback(2);
        assert_eq!(pipe.size(), 2);

        // Capacity is freed; new commits get fresh, still-monotone indices.
        assert!(pipe.commit(5));
        let first = pipe.get().unwrap();
        assert_eq!(first.idx, 0);
        pipe.erase();
        let second = pipe.get().unwrap();
        assert_eq!(second.idx, 1);
        pipe.erase();
        let third = pipe.get().unwrap();
        assert_eq!((third.particle, third.idx), (5, 4));
    }

    #[test]
    fn take_removes_and_returns_in_one_step() {
        let pipe: Pipe<String> = Pipe::new(2);
        assert!(pipe.commit("a".to_owned()));
        assert!(pipe.commit("b".to_owned()));

        let first = pipe.take().unwrap();
        assert_eq!((first.particle.as_str(), first.idx), ("a", 0));
        assert_eq!(pipe.size(), 1);

        let second = pipe.take().unwrap();
        assert_eq!((second.particle.as_str(), second.idx), ("b", 1));
        assert!(pipe.take().is_none());
    }

    #[test]
    fn rollback_more_than_size_clears_the_pipe() {
        let pipe: Pipe<i32> = Pipe::new(4);
        pipe.commit(1);
        pipe.commit(2);
        pipe.rollback(100);
        assert_eq!(pipe.size(), 0);
    }
}
