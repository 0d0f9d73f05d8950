// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Worker-side instrumentation: interval stacks and the probe handle.
//!
//! A [`WorkerProbe`] is the per-thread context object a worker uses to
//! time its work. It owns two bounded interval stacks (operations and
//! regions) outright, so nested timing needs no thread-local storage and
//! no synchronization — the probe simply never leaves its thread's hands.
//!
//! Instrumentation call sites get added incrementally and inconsistently
//! around recursive or conditionally-skipped code, so the stacks self-heal
//! instead of asserting: an `end` whose kind does not match the top scans
//! downward for the nearest matching frame, abandons everything stacked
//! above it, and records only that frame. An `end` with no matching frame
//! at all changes nothing. Instrumentation defects must never crash the
//! compute workload being observed.

use std::sync::Arc;

use metron_core::kind::{OpKind, RegionKind};

use crate::monitor::PerfMonitor;

/// Maximum nesting depth per stack; further starts are silently dropped
/// and the lost interval is never counted.
pub const MAX_STACK_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy)]
struct Frame<K> {
    start_us: i64,
    kind: K,
}

/// Bounded stack of open intervals for one kind family.
#[derive(Debug)]
struct IntervalStack<K> {
    frames: Vec<Frame<K>>,
}

impl<K: Copy + PartialEq> IntervalStack<K> {
    fn new() -> Self {
        Self {
            // Capacity is the bound: the stack never reallocates, so a
            // start call never allocates on the hot path.
            frames: Vec::with_capacity(MAX_STACK_DEPTH),
        }
    }

    /// Opens an interval. Dropped without trace when the stack is full.
    fn start(&mut self, kind: K, now_us: i64) {
        if self.frames.len() < MAX_STACK_DEPTH {
            self.frames.push(Frame {
                start_us: now_us,
                kind,
            });
        }
    }

    /// Closes the nearest open interval of `kind` and returns its start
    /// timestamp, abandoning any frames stacked above it. Returns `None`
    /// (stack untouched) when no such frame exists.
    fn close(&mut self, kind: K) -> Option<i64> {
        let position = self.frames.iter().rposition(|frame| frame.kind == kind)?;
        let start_us = self.frames[position].start_us;
        self.frames.truncate(position);
        Some(start_us)
    }

    fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Per-worker-thread instrumentation handle.
///
/// Obtained from [`PerfMonitor::worker`]; move it into the worker thread
/// and keep it there. The probe is `Send` but deliberately neither `Sync`
/// nor `Clone`: one probe per worker index is the single-writer discipline
/// the whole table relies on. A probe built with an out-of-range worker
/// index is harmless — every call on it is a silent no-op.
#[derive(Debug)]
pub struct WorkerProbe {
    monitor: Arc<PerfMonitor>,
    thread_id: usize,
    ops: IntervalStack<OpKind>,
    regions: IntervalStack<RegionKind>,
}

impl PerfMonitor {
    /// Creates the instrumentation probe for one worker index.
    pub fn worker(self: &Arc<Self>, thread_id: usize) -> WorkerProbe {
        WorkerProbe {
            monitor: Arc::clone(self),
            thread_id,
            ops: IntervalStack::new(),
            regions: IntervalStack::new(),
        }
    }
}

impl WorkerProbe {
    /// The worker index this probe records under.
    pub fn thread_id(&self) -> usize {
        self.thread_id
    }

    /// Opens a timing interval for an operation.
    pub fn op_start(&mut self, kind: OpKind) {
        if !self.monitor.is_enabled() {
            return;
        }
        let Some(slot) = self.monitor.slot(self.thread_id) else {
            return;
        };
        slot.mark_active();
        let now = self.monitor.now_us();
        self.ops.start(kind, now);
    }

    /// Closes a timing interval for an operation and records it.
    ///
    /// Recovers from mismatched nesting as described at module level.
    pub fn op_end(&mut self, kind: OpKind) {
        if !self.monitor.is_enabled() {
            return;
        }
        let Some(slot) = self.monitor.slot(self.thread_id) else {
            return;
        };
        let now = self.monitor.now_us();
        match self.ops.close(kind) {
            Some(start_us) => {
                slot.mark_active();
                slot.record_op(kind, (now - start_us).max(0));
            }
            None => {
                log::trace!(
                    "unmatched end for op {} on thread {}; ignored",
                    kind,
                    self.thread_id
                );
            }
        }
    }

    /// Opens a timing interval for a tagged region.
    pub fn region_start(&mut self, kind: RegionKind) {
        if !self.monitor.is_enabled() {
            return;
        }
        let Some(slot) = self.monitor.slot(self.thread_id) else {
            return;
        };
        slot.mark_active();
        let now = self.monitor.now_us();
        self.regions.start(kind, now);
    }

    /// Closes a timing interval for a tagged region and records it.
    pub fn region_end(&mut self, kind: RegionKind) {
        if !self.monitor.is_enabled() {
            return;
        }
        let Some(slot) = self.monitor.slot(self.thread_id) else {
            return;
        };
        let now = self.monitor.now_us();
        match self.regions.close(kind) {
            Some(start_us) => {
                slot.mark_active();
                slot.record_region(kind, (now - start_us).max(0));
            }
            None => {
                log::trace!(
                    "unmatched end for region {} on thread {}; ignored",
                    kind,
                    self.thread_id
                );
            }
        }
    }

    /// Records that this worker claimed one unit of dynamically scheduled
    /// work.
    pub fn record_chunk_acquisition(&self) {
        self.monitor.record_chunk_acquisition(self.thread_id);
    }

    /// Times an operation over a lexical scope; ends when the guard drops.
    pub fn scoped_op(&mut self, kind: OpKind) -> ScopedOp<'_> {
        self.op_start(kind);
        ScopedOp { probe: self, kind }
    }

    /// Times a tagged region over a lexical scope; ends when the guard
    /// drops.
    pub fn scoped_region(&mut self, kind: RegionKind) -> ScopedRegion<'_> {
        self.region_start(kind);
        ScopedRegion { probe: self, kind }
    }

    /// Current nesting depth of the operation stack (open intervals).
    pub fn open_ops(&self) -> usize {
        self.ops.depth()
    }

    /// Current nesting depth of the region stack (open intervals).
    pub fn open_regions(&self) -> usize {
        self.regions.depth()
    }
}

/// RAII guard that ends an operation interval when dropped, on any exit
/// path.
#[must_use = "dropping the guard immediately ends the interval; bind it with `let _guard = ...`"]
pub struct ScopedOp<'a> {
    probe: &'a mut WorkerProbe,
    kind: OpKind,
}

impl Drop for ScopedOp<'_> {
    fn drop(&mut self) {
        self.probe.op_end(self.kind);
    }
}

/// RAII guard that ends a region interval when dropped, on any exit path.
#[must_use = "dropping the guard immediately ends the interval; bind it with `let _guard = ...`"]
pub struct ScopedRegion<'a> {
    probe: &'a mut WorkerProbe,
    kind: RegionKind,
}

impl Drop for ScopedRegion<'_> {
    fn drop(&mut self) {
        self.probe.region_end(self.kind);
    }
}
