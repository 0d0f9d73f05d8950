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

//! Per-worker weight tables.
//!
//! A weight expresses a worker's relative throughput; only ratios matter.
//! Workers beyond the table length inherit the last entry, so a table
//! describing the physical cores also covers oversubscribed pools.

use sysinfo::System;

/// Relative per-worker weights used to split work proportionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreWeightTable {
    weights: Vec<u32>,
}

impl CoreWeightTable {
    /// A table giving every worker the same share.
    pub fn uniform(workers: usize) -> Self {
        Self {
            weights: vec![1; workers.max(1)],
        }
    }

    /// Builds a table from explicit weights.
    ///
    /// An empty list degenerates to a single uniform entry; all-zero
    /// tables are treated as uniform by the partitioner.
    pub fn from_weights(weights: Vec<u32>) -> Self {
        if weights.is_empty() {
            log::warn!("empty weight table; falling back to uniform");
            return Self::uniform(1);
        }
        Self { weights }
    }

    /// Derives a table for `workers` workers from the detected per-core
    /// maximum frequencies, reduced to the smallest equivalent integers.
    ///
    /// Falls back to a uniform table when frequencies are unavailable
    /// (virtualized hosts commonly report zero).
    pub fn detect(workers: usize) -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        let frequencies: Vec<u64> = system
            .cpus()
            .iter()
            .take(workers)
            .map(|cpu| cpu.frequency())
            .collect();

        if frequencies.is_empty() || frequencies.iter().all(|&f| f == 0) {
            log::warn!("no usable core frequencies detected; using uniform weights");
            return Self::uniform(workers);
        }

        let divisor = frequencies
            .iter()
            .copied()
            .filter(|&f| f > 0)
            .fold(0, gcd)
            .max(1);
        let mut weights: Vec<u32> = frequencies
            .iter()
            .map(|&f| (f / divisor).max(1) as u32)
            .collect();
        // Fewer detected cores than workers: the extra workers share the
        // last core's weight.
        while weights.len() < workers {
            let last = *weights.last().unwrap_or(&1);
            weights.push(last);
        }
        log::debug!("detected core weights: {weights:?}");
        Self { weights }
    }

    /// Number of explicit entries in the table.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the table carries no explicit entries (never true for
    /// tables built through the constructors here).
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// The weight for one worker; workers past the end of the table get
    /// the last entry.
    pub fn weight(&self, worker: usize) -> u32 {
        self.weights
            .get(worker)
            .copied()
            .unwrap_or_else(|| self.weights.last().copied().unwrap_or(1))
    }

    /// The explicit entries.
    pub fn weights(&self) -> &[u32] {
        &self.weights
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_table_gives_equal_weights() {
        let table = CoreWeightTable::uniform(4);
        assert_eq!(table.weights(), &[1, 1, 1, 1]);
    }

    #[test]
    fn empty_explicit_table_falls_back_to_uniform() {
        let table = CoreWeightTable::from_weights(Vec::new());
        assert_eq!(table.len(), 1);
        assert_eq!(table.weight(0), 1);
    }

    #[test]
    fn workers_past_the_table_inherit_the_last_weight() {
        let table = CoreWeightTable::from_weights(vec![3, 3, 4]);
        assert_eq!(table.weight(0), 3);
        assert_eq!(table.weight(2), 4);
        assert_eq!(table.weight(7), 4);
    }

    #[test]
    fn detect_always_covers_the_requested_workers() {
        let table = CoreWeightTable::detect(4);
        assert!(table.len() >= 4 || table.weights().iter().all(|&w| w >= 1));
        for worker in 0..4 {
            assert!(table.weight(worker) >= 1);
        }
    }

    #[test]
    fn gcd_reduces_frequency_ratios() {
        assert_eq!(gcd(1_800_000, 2_400_000), 600_000);
        assert_eq!(gcd(7, 0), 7);
        assert_eq!(gcd(0, 7), 7);
    }
}
