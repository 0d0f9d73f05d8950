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

//! Clock contracts and elapsed-time helpers.
//!
//! The monitor reads time through the [`Clock`] trait so that tests can
//! drive exact durations through a [`ManualClock`] while production code
//! uses the monotonic [`MonotonicClock`]. The timestamps are microseconds
//! relative to the clock's own origin; only differences between readings
//! are meaningful.

use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// A source of monotonic microsecond timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Current reading in microseconds since the clock's origin.
    fn now_us(&self) -> i64;
}

/// Production clock backed by [`Instant`], anchored at construction.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose origin is "now".
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> i64 {
        self.origin.elapsed().as_micros() as i64
    }
}

/// A clock that only moves when told to.
///
/// Intended for tests and deterministic replay: set or advance the reading
/// explicitly and every probe observes exactly that value.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_us: AtomicI64,
}

impl ManualClock {
    /// Creates a manual clock starting at the given reading.
    pub fn starting_at(now_us: i64) -> Self {
        Self {
            now_us: AtomicI64::new(now_us),
        }
    }

    /// Moves the clock forward by `delta_us` microseconds.
    pub fn advance(&self, delta_us: i64) {
        self.now_us.fetch_add(delta_us, Ordering::Relaxed);
    }

    /// Sets the clock to an absolute reading.
    pub fn set(&self, now_us: i64) {
        self.now_us.store(now_us, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> i64 {
        self.now_us.load(Ordering::Relaxed)
    }
}

/// Small elapsed-time helper for code that just wants a duration.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    /// Starts timing immediately.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Elapsed time since construction, in microseconds.
    pub fn elapsed_us(&self) -> i64 {
        self.started.elapsed().as_micros() as i64
    }

    /// Elapsed time since construction, in fractional milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1_000.0
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
