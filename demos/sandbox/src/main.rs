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

//! Worker-pool demo for the performance monitor.
//!
//! Runs a fixed pool of worker threads over a fake compute graph a few
//! times: a matrix multiplication whose chunks are claimed dynamically
//! from a shared queue, followed by statically partitioned element-wise
//! and normalization passes. Every kernel is instrumented; at the end the
//! demo prints all three reports and writes both export files.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use metron_core::{OpKind, RegionKind};
use metron_sched::{CoreWeightTable, RowPartition};
use metron_telemetry::{MonitorConfig, PerfMonitor, WorkerProbe};

const WORKERS: usize = 4;
const SIZE: usize = 256;
const ITERATIONS: usize = 10;
const CHUNKS_PER_ITERATION: usize = WORKERS * 4;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let monitor = Arc::new(PerfMonitor::new(MonitorConfig {
        max_threads: WORKERS,
    }));
    monitor.enable(true);

    let weights = CoreWeightTable::detect(WORKERS);
    let partition = RowPartition::new(SIZE as i64, WORKERS, &weights);
    log::info!("worker weights: {:?}", weights.weights());

    // Input matrices, initialized the same way every run so that repeated
    // invocations are comparable.
    let a: Vec<f32> = (0..SIZE * SIZE).map(|i| 1.0 + i as f32 * 0.001).collect();
    let b: Vec<f32> = (0..SIZE * SIZE).map(|i| 0.5 + i as f32 * 0.0001).collect();

    // One chunk queue per graph iteration; workers racing ahead to the
    // next iteration claim from its own queue.
    let chunk_queues: Vec<AtomicUsize> = (0..ITERATIONS).map(|_| AtomicUsize::new(0)).collect();

    println!(
        "running {ITERATIONS} iterations of a {SIZE}x{SIZE} graph on {WORKERS} workers"
    );

    thread::scope(|scope| {
        for worker in 0..WORKERS {
            let monitor = Arc::clone(&monitor);
            let partition = &partition;
            let chunk_queues = &chunk_queues;
            let a = a.as_slice();
            let b = b.as_slice();
            scope.spawn(move || {
                let mut probe = monitor.worker(worker);
                for queue in chunk_queues {
                    run_graph(&mut probe, worker, partition, queue, a, b);
                }
            });
        }
    });

    // All workers joined: the table is quiescent and safe to read.
    monitor.print_summary();
    monitor.print_detailed();
    monitor.print_region_report();

    monitor.export_delimited("compute_perf.csv")?;
    monitor.export_structured("compute_perf.json")?;
    println!("performance data written to compute_perf.csv and compute_perf.json");

    Ok(())
}

/// One pass over the fake compute graph for one worker.
fn run_graph(
    probe: &mut WorkerProbe,
    worker: usize,
    partition: &RowPartition,
    chunk_queue: &AtomicUsize,
    a: &[f32],
    b: &[f32],
) {
    // Matrix multiplication: chunks are claimed dynamically, so fast
    // workers naturally take more of them.
    probe.op_start(OpKind::MatMul);
    {
        let _prepare = probe.scoped_region(RegionKind::MatMulPrepare);
        std::hint::black_box(chunk_bounds(0));
    }
    loop {
        let chunk = chunk_queue.fetch_add(1, Ordering::Relaxed);
        if chunk >= CHUNKS_PER_ITERATION {
            break;
        }
        probe.record_chunk_acquisition();
        let _guard = probe.scoped_region(RegionKind::MatMulChunk);
        multiply_rows(a, b, chunk_bounds(chunk));
    }
    probe.op_end(OpKind::MatMul);

    // Element-wise and normalization passes over this worker's static,
    // weight-proportional row range.
    let rows = partition.range(worker);

    probe.op_start(OpKind::Add);
    elementwise(a, b, rows.clone(), |x, y| x + y);
    probe.op_end(OpKind::Add);

    probe.op_start(OpKind::Mul);
    elementwise(a, b, rows.clone(), |x, y| x * y);
    probe.op_end(OpKind::Mul);

    probe.op_start(OpKind::RmsNorm);
    rms_norm_rows(a, rows);
    probe.op_end(OpKind::RmsNorm);
}

fn chunk_bounds(chunk: usize) -> Range<usize> {
    let rows_per_chunk = SIZE.div_ceil(CHUNKS_PER_ITERATION);
    let start = (chunk * rows_per_chunk).min(SIZE);
    let end = ((chunk + 1) * rows_per_chunk).min(SIZE);
    start..end
}

/// Dot-products every row in the range against the first column of `b`.
fn multiply_rows(a: &[f32], b: &[f32], rows: Range<usize>) {
    let mut acc = 0.0f32;
    for row in rows {
        let lhs = &a[row * SIZE..(row + 1) * SIZE];
        for (i, value) in lhs.iter().enumerate() {
            acc += value * b[i * SIZE];
        }
    }
    std::hint::black_box(acc);
}

fn elementwise(a: &[f32], b: &[f32], rows: Range<i64>, op: impl Fn(f32, f32) -> f32) {
    let mut acc = 0.0f32;
    for row in rows {
        let row = row as usize;
        let lhs = &a[row * SIZE..(row + 1) * SIZE];
        let rhs = &b[row * SIZE..(row + 1) * SIZE];
        for (x, y) in lhs.iter().zip(rhs) {
            acc += op(*x, *y);
        }
    }
    std::hint::black_box(acc);
}

fn rms_norm_rows(a: &[f32], rows: Range<i64>) {
    const EPS: f32 = 1e-6;
    let mut acc = 0.0f32;
    for row in rows {
        let row = row as usize;
        let values = &a[row * SIZE..(row + 1) * SIZE];
        let mean_square: f32 =
            values.iter().map(|v| v * v).sum::<f32>() / SIZE as f32;
        let scale = 1.0 / (mean_square + EPS).sqrt();
        acc += values.iter().map(|v| v * scale).sum::<f32>();
    }
    std::hint::black_box(acc);
}
