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

//! Human-readable reports over the statistics table.
//!
//! Reporters are read-only: they snapshot the table once, skip inactive
//! slots, and compute derived values (averages, wall time, utilization) at
//! report time. Each report has a `write_*` form taking any [`io::Write`]
//! sink and a `print_*` convenience that targets stdout and logs failures
//! instead of propagating them.

use std::io::{self, Write};

use metron_core::kind::{OpKind, RegionKind};
use metron_core::record::MonitorSnapshot;

use crate::monitor::PerfMonitor;

const US_PER_MS: f64 = 1_000.0;

impl PerfMonitor {
    /// Writes the global summary: monitored time, per-thread compute and
    /// region totals, chunk acquisitions, utilization, and the hottest
    /// operations aggregated across threads.
    pub fn write_summary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if !self.is_enabled() {
            return writeln!(writer, "performance monitoring is disabled");
        }
        render_summary(&self.snapshot(), writer)
    }

    /// Prints the global summary to stdout.
    pub fn print_summary(&self) {
        let stdout = io::stdout();
        if let Err(error) = self.write_summary(&mut stdout.lock()) {
            log::error!("failed to write summary report: {error}");
        }
    }

    /// Writes the per-thread detail report: every operation and region
    /// record with total/count/avg/min/max.
    pub fn write_detailed<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if !self.is_enabled() {
            return writeln!(writer, "performance monitoring is disabled");
        }
        render_detailed(&self.snapshot(), writer)
    }

    /// Prints the per-thread detail report to stdout.
    pub fn print_detailed(&self) {
        let stdout = io::stdout();
        if let Err(error) = self.write_detailed(&mut stdout.lock()) {
            log::error!("failed to write detailed report: {error}");
        }
    }

    /// Writes the region report: tagged regions aggregated across all
    /// threads, then broken out per thread.
    pub fn write_region_report<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if !self.is_enabled() {
            return writeln!(writer, "performance monitoring is disabled");
        }
        render_region_report(&self.snapshot(), writer)
    }

    /// Prints the region report to stdout.
    pub fn print_region_report(&self) {
        let stdout = io::stdout();
        if let Err(error) = self.write_region_report(&mut stdout.lock()) {
            log::error!("failed to write region report: {error}");
        }
    }
}

fn render_summary<W: Write>(snapshot: &MonitorSnapshot, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "=== compute performance summary ===")?;
    writeln!(
        writer,
        "monitored time: {:.2} ms",
        snapshot.duration_us as f64 / US_PER_MS
    )?;
    writeln!(writer, "active threads: {}", snapshot.active_thread_count())?;
    writeln!(writer)?;

    writeln!(
        writer,
        "thread | compute (ms) | regions (ms) | chunks | utilization (%)"
    )?;
    writeln!(
        writer,
        "-------+--------------+--------------+--------+----------------"
    )?;
    for thread in snapshot.active_threads() {
        writeln!(
            writer,
            "{:>6} | {:>12.2} | {:>12.2} | {:>6} | {:>15.1}",
            thread.thread_id,
            thread.total_compute_us as f64 / US_PER_MS,
            thread.total_region_us as f64 / US_PER_MS,
            thread.chunk_acquisitions,
            thread.utilization(snapshot.duration_us)
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "hot operations (all threads):")?;
    writeln!(writer, "operation  | total (ms) | calls | avg (us)")?;
    writeln!(writer, "-----------+------------+-------+---------")?;
    let totals = snapshot.aggregate_ops();
    for kind in OpKind::ALL {
        let record = &totals[kind.index()];
        if record.count > 0 {
            writeln!(
                writer,
                "{:<10} | {:>10.2} | {:>5} | {:>8.1}",
                kind.name(),
                record.total_us as f64 / US_PER_MS,
                record.count,
                record.avg_us()
            )?;
        }
    }
    writeln!(writer)
}

fn render_detailed<W: Write>(snapshot: &MonitorSnapshot, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "=== compute performance detail ===")?;

    for thread in snapshot.active_threads() {
        writeln!(writer)?;
        writeln!(writer, "--- thread {} ---", thread.thread_id)?;
        writeln!(
            writer,
            "compute time: {:.2} ms",
            thread.total_compute_us as f64 / US_PER_MS
        )?;
        writeln!(
            writer,
            "region time: {:.2} ms",
            thread.total_region_us as f64 / US_PER_MS
        )?;
        writeln!(writer, "chunk acquisitions: {}", thread.chunk_acquisitions)?;

        writeln!(writer)?;
        writeln!(writer, "operations:")?;
        writeln!(
            writer,
            "operation  | total (ms) | calls | avg (us) | min (us) | max (us)"
        )?;
        writeln!(
            writer,
            "-----------+------------+-------+----------+----------+---------"
        )?;
        for kind in OpKind::ALL {
            let record = thread.op(kind);
            if record.count > 0 {
                writeln!(
                    writer,
                    "{:<10} | {:>10.2} | {:>5} | {:>8.1} | {:>8} | {:>8}",
                    kind.name(),
                    record.total_us as f64 / US_PER_MS,
                    record.count,
                    record.avg_us(),
                    record.min_us,
                    record.max_us
                )?;
            }
        }

        writeln!(writer)?;
        writeln!(writer, "regions:")?;
        write_region_table_header(writer)?;
        for kind in RegionKind::ALL {
            let record = thread.region(kind);
            if record.count > 0 {
                write_region_row(writer, kind.name(), record)?;
            }
        }
    }
    writeln!(writer)
}

fn render_region_report<W: Write>(snapshot: &MonitorSnapshot, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "=== region performance report ===")?;
    writeln!(writer)?;

    writeln!(writer, "all threads:")?;
    write_region_table_header(writer)?;
    let totals = snapshot.aggregate_regions();
    for kind in RegionKind::ALL {
        let record = &totals[kind.index()];
        if record.count > 0 {
            write_region_row(writer, kind.name(), record)?;
        }
    }

    for thread in snapshot.active_threads() {
        writeln!(writer)?;
        writeln!(writer, "--- thread {} ---", thread.thread_id)?;
        write_region_table_header(writer)?;
        for kind in RegionKind::ALL {
            let record = thread.region(kind);
            if record.count > 0 {
                write_region_row(writer, kind.name(), record)?;
            }
        }
    }
    writeln!(writer)
}

fn write_region_table_header<W: Write>(writer: &mut W) -> io::Result<()> {
    writeln!(
        writer,
        "region             | total (ms) | calls | avg (us) | min (us) | max (us)"
    )?;
    writeln!(
        writer,
        "-------------------+------------+-------+----------+----------+---------"
    )
}

fn write_region_row<W: Write>(
    writer: &mut W,
    name: &str,
    record: &metron_core::record::RegionRecord,
) -> io::Result<()> {
    writeln!(
        writer,
        "{:<18} | {:>10.2} | {:>5} | {:>8.1} | {:>8} | {:>8}",
        name,
        record.total_us as f64 / US_PER_MS,
        record.count,
        record.avg_us,
        record.min_us,
        record.max_us
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::MonitorConfig;
    use metron_core::time::ManualClock;
    use std::sync::Arc;

    fn rendered<F>(write: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buffer = Vec::new();
        write(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn manual_setup(max_threads: usize) -> (Arc<PerfMonitor>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let monitor = Arc::new(PerfMonitor::with_clock(
            MonitorConfig { max_threads },
            clock.clone(),
        ));
        monitor.enable(true);
        (monitor, clock)
    }

    #[test]
    fn disabled_monitor_reports_a_single_notice() {
        let monitor = PerfMonitor::new(MonitorConfig::default());
        let text = rendered(|w| monitor.write_summary(w));
        assert_eq!(text, "performance monitoring is disabled\n");
    }

    #[test]
    fn summary_lists_chunk_only_threads() {
        let (monitor, _clock) = manual_setup(4);
        for _ in 0..5 {
            monitor.record_chunk_acquisition(2);
        }

        let text = rendered(|w| monitor.write_summary(w));
        assert!(text.contains("active threads: 1"));
        // Thread 2 shows up with its chunk count despite zero op records.
        let row = text
            .lines()
            .find(|line| line.trim_start().starts_with("2 |"))
            .expect("thread 2 row");
        assert!(row.contains("| 5 |") || row.split('|').nth(3).unwrap().trim() == "5");
    }

    #[test]
    fn summary_aggregates_hot_operations_across_threads() {
        let (monitor, clock) = manual_setup(4);
        let mut first = monitor.worker(0);
        let mut second = monitor.worker(1);

        first.op_start(metron_core::OpKind::MatMul);
        clock.advance(1_000);
        first.op_end(metron_core::OpKind::MatMul);

        second.op_start(metron_core::OpKind::MatMul);
        clock.advance(3_000);
        second.op_end(metron_core::OpKind::MatMul);

        let text = rendered(|w| monitor.write_summary(w));
        let row = text
            .lines()
            .find(|line| line.starts_with("mat_mul "))
            .expect("mat_mul row");
        assert!(row.contains("4.00"), "total across threads: {row}");
        assert!(row.contains('2'), "two calls: {row}");
    }

    #[test]
    fn detailed_report_skips_inactive_threads() {
        let (monitor, clock) = manual_setup(4);
        let mut probe = monitor.worker(1);
        probe.op_start(metron_core::OpKind::Add);
        clock.advance(10);
        probe.op_end(metron_core::OpKind::Add);

        let text = rendered(|w| monitor.write_detailed(w));
        assert!(text.contains("--- thread 1 ---"));
        assert!(!text.contains("--- thread 0 ---"));
        assert!(!text.contains("--- thread 2 ---"));
        assert!(text.contains("add"));
    }

    #[test]
    fn region_report_merges_across_threads() {
        let (monitor, clock) = manual_setup(4);
        let mut first = monitor.worker(0);
        let mut second = monitor.worker(1);

        first.region_start(metron_core::RegionKind::MatMulChunk);
        clock.advance(10);
        first.region_end(metron_core::RegionKind::MatMulChunk);

        second.region_start(metron_core::RegionKind::MatMulChunk);
        clock.advance(90);
        second.region_end(metron_core::RegionKind::MatMulChunk);

        let text = rendered(|w| monitor.write_region_report(w));
        assert!(text.contains("all threads:"));
        let aggregate = text
            .lines()
            .skip_while(|line| !line.starts_with("all threads:"))
            .find(|line| line.starts_with("mat_mul_chunk"))
            .expect("aggregate mat_mul_chunk row");
        // min from thread 0, max from thread 1.
        assert!(aggregate.contains("10"), "{aggregate}");
        assert!(aggregate.contains("90"), "{aggregate}");
        assert!(text.contains("--- thread 0 ---"));
        assert!(text.contains("--- thread 1 ---"));
    }

    #[test]
    fn reports_after_reset_show_no_threads() {
        let (monitor, clock) = manual_setup(2);
        let mut probe = monitor.worker(0);
        probe.op_start(metron_core::OpKind::MatMul);
        clock.advance(10);
        probe.op_end(metron_core::OpKind::MatMul);

        monitor.reset();

        let text = rendered(|w| monitor.write_summary(w));
        assert!(text.contains("active threads: 0"));
        let detail = rendered(|w| monitor.write_detailed(w));
        assert!(!detail.contains("--- thread"));
    }
}
