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

//! File exporters over the statistics table.
//!
//! Two formats: a delimited text table (one row per (thread, kind) pair
//! with a nonzero count) and a structured JSON document (one object per
//! active thread with nested operation/region lists). Both exporters build
//! the whole payload in memory first and write it in a single call, so a
//! failed export leaves no partial file behind.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use metron_core::kind::{OpKind, RegionKind};
use metron_core::record::MonitorSnapshot;
use serde::Serialize;

use crate::monitor::PerfMonitor;

/// An export that could not be completed. The destination is untouched or
/// left as it was; no partial payload is ever written.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The destination file could not be created or written.
    #[error("failed to write export file {path}: {source}")]
    Io {
        /// The destination that was being written.
        path: PathBuf,
        /// The underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The payload could not be encoded.
    #[error("failed to encode export payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PerfMonitor {
    /// Exports every nonzero (thread, kind) record as delimited text:
    /// operation rows first, then region rows.
    ///
    /// Columns: thread id, kind name, total time (ms, 3 decimals), call
    /// count, average (µs, 1 decimal), min (µs), max (µs). A disabled
    /// monitor logs a warning and writes nothing.
    pub fn export_delimited<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let path = path.as_ref();
        if !self.is_enabled() {
            log::warn!(
                "performance monitoring is disabled; not exporting to {}",
                path.display()
            );
            return Ok(());
        }
        let payload = render_delimited(&self.snapshot());
        write_all(path, payload.as_bytes())?;
        log::info!("performance data exported to {}", path.display());
        Ok(())
    }

    /// Exports the table as a structured JSON document: overall duration
    /// plus one object per active thread carrying its totals, chunk
    /// count, and nested operation/region entry lists.
    ///
    /// The document is well-formed even when the nested lists are empty.
    /// A disabled monitor logs a warning and writes nothing.
    pub fn export_structured<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let path = path.as_ref();
        if !self.is_enabled() {
            log::warn!(
                "performance monitoring is disabled; not exporting to {}",
                path.display()
            );
            return Ok(());
        }
        let document = StructuredExport::from_snapshot(&self.snapshot());
        let mut payload = serde_json::to_string_pretty(&document)?;
        payload.push('\n');
        write_all(path, payload.as_bytes())?;
        log::info!("performance data exported to {}", path.display());
        Ok(())
    }
}

fn write_all(path: &Path, payload: &[u8]) -> Result<(), ExportError> {
    fs::write(path, payload).map_err(|source| {
        log::error!("failed to write export file {}: {source}", path.display());
        ExportError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

fn render_delimited(snapshot: &MonitorSnapshot) -> String {
    let mut out = String::from("thread_id,kind,total_ms,calls,avg_us,min_us,max_us\n");
    for thread in snapshot.active_threads() {
        for kind in OpKind::ALL {
            let record = thread.op(kind);
            if record.count > 0 {
                // Infallible: writing to a String cannot fail.
                let _ = writeln!(
                    out,
                    "{},{},{:.3},{},{:.1},{},{}",
                    thread.thread_id,
                    kind.name(),
                    record.total_us as f64 / 1_000.0,
                    record.count,
                    record.avg_us(),
                    record.min_us,
                    record.max_us
                );
            }
        }
    }
    for thread in snapshot.active_threads() {
        for kind in RegionKind::ALL {
            let record = thread.region(kind);
            if record.count > 0 {
                let _ = writeln!(
                    out,
                    "{},{},{:.3},{},{:.1},{},{}",
                    thread.thread_id,
                    kind.name(),
                    record.total_us as f64 / 1_000.0,
                    record.count,
                    record.avg_us,
                    record.min_us,
                    record.max_us
                );
            }
        }
    }
    out
}

#[derive(Debug, Serialize)]
struct StructuredExport {
    duration_us: i64,
    threads: Vec<ThreadEntry>,
}

#[derive(Debug, Serialize)]
struct ThreadEntry {
    thread_id: usize,
    total_compute_us: i64,
    total_region_us: i64,
    chunk_acquisitions: u64,
    operations: Vec<KindEntry>,
    regions: Vec<KindEntry>,
}

#[derive(Debug, Serialize)]
struct KindEntry {
    kind: &'static str,
    total_us: i64,
    count: i64,
    avg_us: f64,
    min_us: i64,
    max_us: i64,
}

impl StructuredExport {
    fn from_snapshot(snapshot: &MonitorSnapshot) -> Self {
        let threads = snapshot
            .active_threads()
            .map(|thread| ThreadEntry {
                thread_id: thread.thread_id,
                total_compute_us: thread.total_compute_us,
                total_region_us: thread.total_region_us,
                chunk_acquisitions: thread.chunk_acquisitions,
                operations: OpKind::ALL
                    .iter()
                    .filter_map(|&kind| {
                        let record = thread.op(kind);
                        (record.count > 0).then(|| KindEntry {
                            kind: kind.name(),
                            total_us: record.total_us,
                            count: record.count,
                            avg_us: record.avg_us(),
                            min_us: record.min_us,
                            max_us: record.max_us,
                        })
                    })
                    .collect(),
                regions: RegionKind::ALL
                    .iter()
                    .filter_map(|&kind| {
                        let record = thread.region(kind);
                        (record.count > 0).then(|| KindEntry {
                            kind: kind.name(),
                            total_us: record.total_us,
                            count: record.count,
                            avg_us: record.avg_us,
                            min_us: record.min_us,
                            max_us: record.max_us,
                        })
                    })
                    .collect(),
            })
            .collect();
        Self {
            duration_us: snapshot.duration_us,
            threads,
        }
    }
}
