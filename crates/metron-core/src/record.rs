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

//! The aggregated timing data model.
//!
//! These are plain snapshot types: the live monitor accumulates into atomic
//! cells and materializes them into this model when asked. Reporters and
//! exporters only ever see this crate's types, so they stay decoupled from
//! the collection machinery.
//!
//! All durations are microseconds in `i64`, matching the resolution of the
//! monotonic clock the probes read.

use crate::kind::{OpKind, RegionKind};
use serde::Serialize;

/// Aggregated timing summary for one (thread, operation-kind) pair.
///
/// Invariants, maintained by [`record`](OpRecord::record) and
/// [`merge`](OpRecord::merge): `count == 0` implies `total_us == 0`, and
/// once `count >= 1`, `min_us <= total_us / count <= max_us`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpRecord {
    /// Total measured time across all calls, in microseconds.
    pub total_us: i64,
    /// Number of recorded intervals.
    pub count: i64,
    /// Shortest recorded interval, in microseconds (0 while `count == 0`).
    pub min_us: i64,
    /// Longest recorded interval, in microseconds.
    pub max_us: i64,
}

impl OpRecord {
    /// Folds one measured interval into the summary.
    pub fn record(&mut self, duration_us: i64) {
        self.total_us += duration_us;
        self.count += 1;
        if self.count == 1 || duration_us < self.min_us {
            self.min_us = duration_us;
        }
        if duration_us > self.max_us {
            self.max_us = duration_us;
        }
    }

    /// Folds another summary into this one (cross-thread aggregation).
    pub fn merge(&mut self, other: &OpRecord) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 || other.min_us < self.min_us {
            self.min_us = other.min_us;
        }
        if other.max_us > self.max_us {
            self.max_us = other.max_us;
        }
        self.total_us += other.total_us;
        self.count += other.count;
    }

    /// Mean interval length in microseconds, or 0.0 before the first call.
    pub fn avg_us(&self) -> f64 {
        if self.count > 0 {
            self.total_us as f64 / self.count as f64
        } else {
            0.0
        }
    }
}

/// Aggregated timing summary for one (thread, region-kind) pair.
///
/// Identical to [`OpRecord`] plus a cached running average that is
/// recomputed from `total_us / count` on every update, so it is always
/// consistent with the other fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RegionRecord {
    /// Total measured time across all calls, in microseconds.
    pub total_us: i64,
    /// Number of recorded intervals.
    pub count: i64,
    /// Shortest recorded interval, in microseconds (0 while `count == 0`).
    pub min_us: i64,
    /// Longest recorded interval, in microseconds.
    pub max_us: i64,
    /// Cached mean interval length, in microseconds.
    pub avg_us: f64,
}

impl RegionRecord {
    /// Folds one measured interval into the summary and refreshes the
    /// cached average.
    pub fn record(&mut self, duration_us: i64) {
        self.total_us += duration_us;
        self.count += 1;
        if self.count == 1 || duration_us < self.min_us {
            self.min_us = duration_us;
        }
        if duration_us > self.max_us {
            self.max_us = duration_us;
        }
        self.avg_us = self.total_us as f64 / self.count as f64;
    }

    /// Folds another summary into this one (cross-thread aggregation).
    pub fn merge(&mut self, other: &RegionRecord) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 || other.min_us < self.min_us {
            self.min_us = other.min_us;
        }
        if other.max_us > self.max_us {
            self.max_us = other.max_us;
        }
        self.total_us += other.total_us;
        self.count += other.count;
        self.avg_us = self.total_us as f64 / self.count as f64;
    }
}

/// Snapshot of everything one worker thread accumulated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadRecord {
    /// The worker index this slot belongs to.
    pub thread_id: usize,
    /// Whether the thread issued at least one instrumentation call since
    /// the last reset. Reporters skip inactive slots.
    pub active: bool,
    /// Sum of all recorded operation intervals, in microseconds.
    pub total_compute_us: i64,
    /// Sum of all recorded region intervals, in microseconds.
    pub total_region_us: i64,
    /// How many units of dynamically scheduled work this thread claimed.
    pub chunk_acquisitions: u64,
    /// Per-operation-kind summaries, indexed by [`OpKind::index`].
    pub ops: Vec<OpRecord>,
    /// Per-region-kind summaries, indexed by [`RegionKind::index`].
    pub regions: Vec<RegionRecord>,
}

impl ThreadRecord {
    /// Creates an empty record for the given worker index.
    pub fn empty(thread_id: usize) -> Self {
        Self {
            thread_id,
            active: false,
            total_compute_us: 0,
            total_region_us: 0,
            chunk_acquisitions: 0,
            ops: vec![OpRecord::default(); OpKind::COUNT],
            regions: vec![RegionRecord::default(); RegionKind::COUNT],
        }
    }

    /// The summary for one operation kind.
    pub fn op(&self, kind: OpKind) -> &OpRecord {
        &self.ops[kind.index()]
    }

    /// The summary for one region kind.
    pub fn region(&self, kind: RegionKind) -> &RegionRecord {
        &self.regions[kind.index()]
    }

    /// This thread's share of the monitored wall time, as a percentage.
    pub fn utilization(&self, wall_us: i64) -> f64 {
        if wall_us > 0 {
            self.total_compute_us as f64 / wall_us as f64 * 100.0
        } else {
            0.0
        }
    }
}

/// One consistent view of the whole statistics table.
///
/// Captured by the monitor after the embedding runtime has quiesced its
/// workers; the aggregation helpers below are what the reporters build
/// their cross-thread tables from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    /// Wall time since monitoring started, in microseconds.
    pub duration_us: i64,
    /// One record per worker slot, active or not.
    pub threads: Vec<ThreadRecord>,
}

impl MonitorSnapshot {
    /// Iterates over the slots that saw at least one instrumentation call.
    pub fn active_threads(&self) -> impl Iterator<Item = &ThreadRecord> {
        self.threads.iter().filter(|t| t.active)
    }

    /// Number of active worker slots.
    pub fn active_thread_count(&self) -> usize {
        self.active_threads().count()
    }

    /// Per-operation-kind summaries merged across all active threads.
    pub fn aggregate_ops(&self) -> Vec<OpRecord> {
        let mut totals = vec![OpRecord::default(); OpKind::COUNT];
        for thread in self.active_threads() {
            for (total, record) in totals.iter_mut().zip(&thread.ops) {
                total.merge(record);
            }
        }
        totals
    }

    /// Per-region-kind summaries merged across all active threads.
    pub fn aggregate_regions(&self) -> Vec<RegionRecord> {
        let mut totals = vec![RegionRecord::default(); RegionKind::COUNT];
        for thread in self.active_threads() {
            for (total, record) in totals.iter_mut().zip(&thread.regions) {
                total.merge(record);
            }
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn record_tracks_count_total_min_max() {
        let mut record = OpRecord::default();
        for duration in [10, 20, 30] {
            record.record(duration);
        }
        assert_eq!(record.count, 3);
        assert_eq!(record.total_us, 60);
        assert_eq!(record.min_us, 10);
        assert_eq!(record.max_us, 30);
        assert_relative_eq!(record.avg_us(), 20.0);
    }

    #[test]
    fn first_record_sets_min_even_when_zero() {
        let mut record = OpRecord::default();
        record.record(0);
        record.record(5);
        assert_eq!(record.min_us, 0);
        assert_eq!(record.max_us, 5);
    }

    #[test]
    fn empty_record_has_zero_average() {
        let record = OpRecord::default();
        assert_eq!(record.avg_us(), 0.0);
        assert_eq!(record.total_us, 0);
    }

    #[test]
    fn region_average_is_cached_and_consistent() {
        let mut record = RegionRecord::default();
        record.record(100);
        assert_relative_eq!(record.avg_us, 100.0);
        record.record(50);
        assert_relative_eq!(record.avg_us, 75.0);
        assert_relative_eq!(record.avg_us, record.total_us as f64 / record.count as f64);
    }

    #[test]
    fn merge_skips_empty_and_combines_extremes() {
        let mut left = OpRecord::default();
        left.record(20);
        let mut right = OpRecord::default();
        right.record(5);
        right.record(80);

        left.merge(&OpRecord::default());
        assert_eq!(left.count, 1);

        left.merge(&right);
        assert_eq!(left.count, 3);
        assert_eq!(left.total_us, 105);
        assert_eq!(left.min_us, 5);
        assert_eq!(left.max_us, 80);
    }

    #[test]
    fn merge_into_empty_adopts_min() {
        let mut total = OpRecord::default();
        let mut other = OpRecord::default();
        other.record(40);
        total.merge(&other);
        assert_eq!(total.min_us, 40);
        assert_eq!(total.max_us, 40);
    }

    #[test]
    fn snapshot_aggregates_only_active_threads() {
        let mut idle = ThreadRecord::empty(0);
        idle.ops[OpKind::Add.index()].record(1_000);

        let mut busy = ThreadRecord::empty(1);
        busy.active = true;
        busy.ops[OpKind::Add.index()].record(10);
        busy.ops[OpKind::Add.index()].record(30);

        let snapshot = MonitorSnapshot {
            duration_us: 1_000,
            threads: vec![idle, busy],
        };

        assert_eq!(snapshot.active_thread_count(), 1);
        let totals = snapshot.aggregate_ops();
        assert_eq!(totals[OpKind::Add.index()].count, 2);
        assert_eq!(totals[OpKind::Add.index()].total_us, 40);
    }

    #[test]
    fn utilization_is_a_percentage_of_wall_time() {
        let mut thread = ThreadRecord::empty(3);
        thread.total_compute_us = 250;
        assert_relative_eq!(thread.utilization(1_000), 25.0);
        assert_eq!(thread.utilization(0), 0.0);
    }

    #[test]
    fn snapshot_serializes_with_empty_lists_intact() {
        let snapshot = MonitorSnapshot {
            duration_us: 42,
            threads: vec![ThreadRecord::empty(0)],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"duration_us\":42"));
        assert!(json.contains("\"ops\""));
    }
}
