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

//! # Metron Telemetry
//!
//! The live instrumentation engine: a [`PerfMonitor`] holding one
//! statistics slot per worker thread, [`WorkerProbe`]s that worker threads
//! use to time operations and tagged regions, and reporters/exporters that
//! turn the accumulated table into human- and machine-readable output.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use metron_core::OpKind;
//! use metron_telemetry::{MonitorConfig, PerfMonitor};
//!
//! let monitor = Arc::new(PerfMonitor::new(MonitorConfig::default()));
//! monitor.enable(true);
//!
//! // Each worker thread owns its probe; nothing on the timing path locks.
//! let mut probe = monitor.worker(0);
//! probe.op_start(OpKind::MatMul);
//! // ... kernel work ...
//! probe.op_end(OpKind::MatMul);
//!
//! // After the workers have quiesced:
//! monitor.print_summary();
//! ```
//!
//! ## Concurrency contract
//!
//! Every per-thread slot is written only by the thread that owns the
//! matching probe, through relaxed atomics, so the hot path takes no
//! locks. The enabled flag and start timestamp are shared but written
//! rarely; a stale read affects at most one in-flight measurement.
//! Reading the table (reports, exports, snapshots) is only meaningful
//! once the embedding runtime has quiesced its workers — that barrier is
//! the caller's responsibility and is not enforced here.

#![warn(missing_docs)]

mod export;
mod monitor;
mod probe;
mod report;

pub use export::ExportError;
pub use monitor::{MonitorConfig, PerfMonitor};
pub use probe::{ScopedOp, ScopedRegion, WorkerProbe, MAX_STACK_DEPTH};
