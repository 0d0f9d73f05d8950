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

//! The monitor: lifecycle control plus the per-thread statistics table.
//!
//! The table is a fixed array of slots, one per possible worker index.
//! Each counter is a relaxed atomic written only by the slot's owning
//! thread, which is what makes the hot path lock-free while keeping the
//! snapshot path free of undefined behavior. Cross-slot consistency is
//! only guaranteed when no worker is instrumenting concurrently.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use metron_core::kind::{OpKind, RegionKind};
use metron_core::record::{MonitorSnapshot, OpRecord, RegionRecord, ThreadRecord};
use metron_core::time::{Clock, MonotonicClock};

/// Sentinel for "no interval recorded yet" in the min field.
const MIN_UNSET: i64 = i64::MAX;

/// Configuration for a [`PerfMonitor`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Number of worker slots to allocate. Calls carrying a thread id at
    /// or above this value are silently ignored.
    pub max_threads: usize,
}

impl MonitorConfig {
    /// Default worker-slot count.
    pub const DEFAULT_MAX_THREADS: usize = 16;
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_threads: Self::DEFAULT_MAX_THREADS,
        }
    }
}

/// Live accumulation cell for one (thread, operation-kind) pair.
///
/// Single-writer: only the owning worker thread calls [`record`], so the
/// load/store pairs below never race with another writer. Readers may see
/// a half-updated cell while the owner is mid-record; that is the
/// documented external-barrier contract, not a memory-safety concern.
#[derive(Debug)]
struct OpCell {
    total_us: AtomicI64,
    count: AtomicI64,
    min_us: AtomicI64,
    max_us: AtomicI64,
}

impl OpCell {
    fn new() -> Self {
        Self {
            total_us: AtomicI64::new(0),
            count: AtomicI64::new(0),
            min_us: AtomicI64::new(MIN_UNSET),
            max_us: AtomicI64::new(0),
        }
    }

    fn record(&self, duration_us: i64) {
        let count = self.count.load(Ordering::Relaxed) + 1;
        self.count.store(count, Ordering::Relaxed);
        self.total_us
            .store(self.total_us.load(Ordering::Relaxed) + duration_us, Ordering::Relaxed);
        if count == 1 || duration_us < self.min_us.load(Ordering::Relaxed) {
            self.min_us.store(duration_us, Ordering::Relaxed);
        }
        if duration_us > self.max_us.load(Ordering::Relaxed) {
            self.max_us.store(duration_us, Ordering::Relaxed);
        }
    }

    fn reset(&self) {
        self.total_us.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
        self.min_us.store(MIN_UNSET, Ordering::Relaxed);
        self.max_us.store(0, Ordering::Relaxed);
    }

    fn snapshot(&self) -> OpRecord {
        let count = self.count.load(Ordering::Relaxed);
        let min_us = self.min_us.load(Ordering::Relaxed);
        OpRecord {
            total_us: self.total_us.load(Ordering::Relaxed),
            count,
            min_us: if count == 0 { 0 } else { min_us },
            max_us: self.max_us.load(Ordering::Relaxed),
        }
    }
}

/// Live accumulation cell for one (thread, region-kind) pair.
///
/// Same single-writer discipline as [`OpCell`], plus a cached running
/// average refreshed from total/count on every record.
#[derive(Debug)]
struct RegionCell {
    total_us: AtomicI64,
    count: AtomicI64,
    min_us: AtomicI64,
    max_us: AtomicI64,
    avg_bits: AtomicU64,
}

impl RegionCell {
    fn new() -> Self {
        Self {
            total_us: AtomicI64::new(0),
            count: AtomicI64::new(0),
            min_us: AtomicI64::new(MIN_UNSET),
            max_us: AtomicI64::new(0),
            avg_bits: AtomicU64::new(0f64.to_bits()),
        }
    }

    fn record(&self, duration_us: i64) {
        let count = self.count.load(Ordering::Relaxed) + 1;
        let total = self.total_us.load(Ordering::Relaxed) + duration_us;
        self.count.store(count, Ordering::Relaxed);
        self.total_us.store(total, Ordering::Relaxed);
        if count == 1 || duration_us < self.min_us.load(Ordering::Relaxed) {
            self.min_us.store(duration_us, Ordering::Relaxed);
        }
        if duration_us > self.max_us.load(Ordering::Relaxed) {
            self.max_us.store(duration_us, Ordering::Relaxed);
        }
        let avg = total as f64 / count as f64;
        self.avg_bits.store(avg.to_bits(), Ordering::Relaxed);
    }

    fn reset(&self) {
        self.total_us.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
        self.min_us.store(MIN_UNSET, Ordering::Relaxed);
        self.max_us.store(0, Ordering::Relaxed);
        self.avg_bits.store(0f64.to_bits(), Ordering::Relaxed);
    }

    fn snapshot(&self) -> RegionRecord {
        let count = self.count.load(Ordering::Relaxed);
        let min_us = self.min_us.load(Ordering::Relaxed);
        RegionRecord {
            total_us: self.total_us.load(Ordering::Relaxed),
            count,
            min_us: if count == 0 { 0 } else { min_us },
            max_us: self.max_us.load(Ordering::Relaxed),
            avg_us: f64::from_bits(self.avg_bits.load(Ordering::Relaxed)),
        }
    }
}

/// One worker thread's slot in the statistics table.
#[derive(Debug)]
pub(crate) struct ThreadSlot {
    active: AtomicBool,
    compute_us: AtomicI64,
    region_us: AtomicI64,
    chunk_acquisitions: AtomicU64,
    ops: [OpCell; OpKind::COUNT],
    regions: [RegionCell; RegionKind::COUNT],
}

impl ThreadSlot {
    fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            compute_us: AtomicI64::new(0),
            region_us: AtomicI64::new(0),
            chunk_acquisitions: AtomicU64::new(0),
            ops: std::array::from_fn(|_| OpCell::new()),
            regions: std::array::from_fn(|_| RegionCell::new()),
        }
    }

    pub(crate) fn mark_active(&self) {
        self.active.store(true, Ordering::Relaxed);
    }

    pub(crate) fn record_op(&self, kind: OpKind, duration_us: i64) {
        self.ops[kind.index()].record(duration_us);
        self.compute_us
            .store(self.compute_us.load(Ordering::Relaxed) + duration_us, Ordering::Relaxed);
    }

    pub(crate) fn record_region(&self, kind: RegionKind, duration_us: i64) {
        self.regions[kind.index()].record(duration_us);
        self.region_us
            .store(self.region_us.load(Ordering::Relaxed) + duration_us, Ordering::Relaxed);
    }

    pub(crate) fn record_chunk_acquisition(&self) {
        self.chunk_acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.active.store(false, Ordering::Relaxed);
        self.compute_us.store(0, Ordering::Relaxed);
        self.region_us.store(0, Ordering::Relaxed);
        self.chunk_acquisitions.store(0, Ordering::Relaxed);
        for cell in &self.ops {
            cell.reset();
        }
        for cell in &self.regions {
            cell.reset();
        }
    }

    fn snapshot(&self, thread_id: usize) -> ThreadRecord {
        ThreadRecord {
            thread_id,
            active: self.active.load(Ordering::Relaxed),
            total_compute_us: self.compute_us.load(Ordering::Relaxed),
            total_region_us: self.region_us.load(Ordering::Relaxed),
            chunk_acquisitions: self.chunk_acquisitions.load(Ordering::Relaxed),
            ops: self.ops.iter().map(OpCell::snapshot).collect(),
            regions: self.regions.iter().map(RegionCell::snapshot).collect(),
        }
    }
}

/// The process-level instrumentation context.
///
/// Constructed once by the embedding runtime and shared (usually through
/// an [`Arc`]) with every worker entry point; there is deliberately no
/// global singleton. Dropping the monitor releases the fixed slot arrays
/// and ends its lifecycle.
#[derive(Debug)]
pub struct PerfMonitor {
    slots: Box<[ThreadSlot]>,
    enabled: AtomicBool,
    started_us: AtomicI64,
    clock: Arc<dyn Clock>,
}

impl PerfMonitor {
    /// Creates a disabled monitor with all counters zeroed.
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Creates a monitor reading time from the given clock.
    ///
    /// Production code wants [`PerfMonitor::new`]; this seam exists so
    /// tests can drive exact durations through a manual clock.
    pub fn with_clock(config: MonitorConfig, clock: Arc<dyn Clock>) -> Self {
        let slots: Vec<ThreadSlot> = (0..config.max_threads).map(|_| ThreadSlot::new()).collect();
        let started_us = clock.now_us();
        log::debug!(
            "performance monitor created with {} worker slots",
            slots.len()
        );
        Self {
            slots: slots.into_boxed_slice(),
            enabled: AtomicBool::new(false),
            started_us: AtomicI64::new(started_us),
            clock,
        }
    }

    /// Number of worker slots in the table.
    pub fn max_threads(&self) -> usize {
        self.slots.len()
    }

    /// Whether instrumentation calls currently record anything.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Turns instrumentation on or off without touching accumulated data.
    ///
    /// Enabling re-stamps the monitoring-start timestamp so that wall-time
    /// derived values (utilization, overall duration) cover the enabled
    /// span only.
    pub fn enable(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        if enabled {
            self.started_us.store(self.clock.now_us(), Ordering::Relaxed);
        }
        log::debug!(
            "performance monitoring {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    /// Zeroes every counter and re-stamps the start timestamp.
    ///
    /// The enabled flag and slot assignment survive; `active` flags clear
    /// until a thread instruments again. Callers are expected to reset
    /// only while workers are idle, like any other table read/write from
    /// outside the owning threads.
    pub fn reset(&self) {
        for slot in self.slots.iter() {
            slot.reset();
        }
        self.started_us.store(self.clock.now_us(), Ordering::Relaxed);
    }

    /// Records that the given worker claimed one unit of dynamically
    /// scheduled work. Out-of-range ids and disabled monitors are no-ops.
    ///
    /// Also available on [`WorkerProbe`](crate::WorkerProbe); this form
    /// exists for shared scheduler code that has a thread index but no
    /// probe at hand.
    pub fn record_chunk_acquisition(&self, thread_id: usize) {
        if !self.is_enabled() {
            return;
        }
        if let Some(slot) = self.slot(thread_id) {
            slot.mark_active();
            slot.record_chunk_acquisition();
        }
    }

    /// Captures one consistent view of the table.
    ///
    /// Only meaningful once the embedding runtime has quiesced its
    /// workers; see the crate-level concurrency contract.
    pub fn snapshot(&self) -> MonitorSnapshot {
        let started = self.started_us.load(Ordering::Relaxed);
        let duration_us = (self.clock.now_us() - started).max(0);
        MonitorSnapshot {
            duration_us,
            threads: self
                .slots
                .iter()
                .enumerate()
                .map(|(id, slot)| slot.snapshot(id))
                .collect(),
        }
    }

    pub(crate) fn slot(&self, thread_id: usize) -> Option<&ThreadSlot> {
        self.slots.get(thread_id)
    }

    pub(crate) fn now_us(&self) -> i64 {
        self.clock.now_us()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metron_core::time::ManualClock;

    fn manual_monitor(max_threads: usize) -> (Arc<PerfMonitor>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let monitor = Arc::new(PerfMonitor::with_clock(
            MonitorConfig { max_threads },
            clock.clone(),
        ));
        (monitor, clock)
    }

    #[test]
    fn new_monitor_is_disabled_and_empty() {
        let monitor = PerfMonitor::new(MonitorConfig::default());
        assert!(!monitor.is_enabled());
        assert_eq!(monitor.max_threads(), MonitorConfig::DEFAULT_MAX_THREADS);

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.threads.len(), MonitorConfig::DEFAULT_MAX_THREADS);
        assert_eq!(snapshot.active_thread_count(), 0);
        for thread in &snapshot.threads {
            assert_eq!(thread.total_compute_us, 0);
            assert_eq!(thread.chunk_acquisitions, 0);
        }
    }

    #[test]
    fn chunk_acquisitions_count_per_thread() {
        let (monitor, _clock) = manual_monitor(4);
        monitor.enable(true);

        for _ in 0..5 {
            monitor.record_chunk_acquisition(2);
        }

        let snapshot = monitor.snapshot();
        assert!(snapshot.threads[2].active);
        assert_eq!(snapshot.threads[2].chunk_acquisitions, 5);
        // A chunk-only thread has zero operation records but still reports.
        assert_eq!(snapshot.threads[2].total_compute_us, 0);
        assert!(!snapshot.threads[0].active);
    }

    #[test]
    fn chunk_acquisition_ignores_out_of_range_and_disabled() {
        let (monitor, _clock) = manual_monitor(2);

        // Disabled: nothing recorded.
        monitor.record_chunk_acquisition(0);
        assert_eq!(monitor.snapshot().threads[0].chunk_acquisitions, 0);

        monitor.enable(true);
        // Out of range: silently ignored.
        monitor.record_chunk_acquisition(2);
        monitor.record_chunk_acquisition(usize::MAX);
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.active_thread_count(), 0);
    }

    #[test]
    fn enable_restamps_start_time() {
        let (monitor, clock) = manual_monitor(1);
        clock.advance(1_000);
        monitor.enable(true);
        clock.advance(250);
        assert_eq!(monitor.snapshot().duration_us, 250);
    }

    #[test]
    fn disable_preserves_accumulated_data() {
        let (monitor, _clock) = manual_monitor(2);
        monitor.enable(true);
        monitor.record_chunk_acquisition(1);

        monitor.enable(false);
        assert!(!monitor.is_enabled());
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.threads[1].chunk_acquisitions, 1);
        assert!(snapshot.threads[1].active);
    }

    #[test]
    fn reset_zeroes_counters_and_keeps_enabled_flag() {
        let (monitor, clock) = manual_monitor(2);
        monitor.enable(true);
        monitor.record_chunk_acquisition(0);
        clock.advance(500);

        monitor.reset();

        assert!(monitor.is_enabled());
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.duration_us, 0);
        assert_eq!(snapshot.active_thread_count(), 0);
        assert_eq!(snapshot.threads[0].chunk_acquisitions, 0);

        // The slot assignment survives: the same thread can resume.
        monitor.record_chunk_acquisition(0);
        assert_eq!(monitor.snapshot().threads[0].chunk_acquisitions, 1);
    }

    #[test]
    fn snapshot_duration_tracks_clock() {
        let (monitor, clock) = manual_monitor(1);
        monitor.enable(true);
        clock.advance(1_234);
        assert_eq!(monitor.snapshot().duration_us, 1_234);
        clock.advance(1);
        assert_eq!(monitor.snapshot().duration_us, 1_235);
    }
}
