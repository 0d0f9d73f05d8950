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

//! Weighted row partitioning.
//!
//! Row starts are precomputed with integer arithmetic so that repeated
//! queries agree and no floating-point rounding can make ranges overlap
//! or leave gaps. The last worker absorbs the rounding remainder.

use std::ops::Range;

use crate::weights::CoreWeightTable;

/// A precomputed split of `[0, n_rows)` into one contiguous range per
/// worker, proportional to the worker weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPartition {
    starts: Vec<i64>,
}

impl RowPartition {
    /// Splits `n_rows` rows across `workers` workers according to the
    /// weight table.
    ///
    /// An all-zero weight sum falls back to a uniform split. With zero
    /// workers the partition is empty.
    pub fn new(n_rows: i64, workers: usize, table: &CoreWeightTable) -> Self {
        let n_rows = n_rows.max(0);
        let mut starts = Vec::with_capacity(workers + 1);
        starts.push(0);
        if workers == 0 {
            return Self { starts };
        }

        let total_weight: i64 = (0..workers).map(|w| i64::from(table.weight(w))).sum();
        let uniform = total_weight == 0;
        if uniform {
            log::warn!("weight table sums to zero; splitting rows uniformly");
        }

        let mut allocated = 0i64;
        for worker in 0..workers {
            if worker == workers - 1 {
                // The last worker takes every remaining row, so rounding
                // can never lose rows.
                starts.push(n_rows);
            } else {
                let share = if uniform {
                    n_rows / workers as i64
                } else {
                    n_rows * i64::from(table.weight(worker)) / total_weight
                };
                allocated += share;
                starts.push(allocated);
            }
        }
        Self { starts }
    }

    /// Number of workers the rows were split across.
    pub fn workers(&self) -> usize {
        self.starts.len() - 1
    }

    /// Total number of rows covered by the partition.
    pub fn n_rows(&self) -> i64 {
        *self.starts.last().unwrap_or(&0)
    }

    /// The half-open row range assigned to one worker. Out-of-range
    /// workers get an empty range.
    pub fn range(&self, worker: usize) -> Range<i64> {
        if worker < self.workers() {
            self.starts[worker]..self.starts[worker + 1]
        } else {
            0..0
        }
    }

    /// Iterates every worker's range in worker order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<i64>> + '_ {
        (0..self.workers()).map(|worker| self.range(worker))
    }
}
