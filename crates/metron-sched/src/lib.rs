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

//! # Metron Sched
//!
//! Weight-driven work partitioning for heterogeneous worker pools.
//!
//! On asymmetric CPUs a uniform row split leaves the fast cores idle while
//! the slow cores finish their share. This crate splits a row range
//! proportionally to a per-worker [`CoreWeightTable`] supplied at startup
//! — explicit weights, or a table derived from the detected per-core clock
//! speeds — so the partitioning strategy is data-driven rather than baked
//! into the splitting algorithm.
//!
//! Pinning workers to cores is the embedding runtime's business; this
//! crate only decides who gets how many rows.

#![warn(missing_docs)]

pub mod partition;
pub mod weights;

pub use partition::RowPartition;
pub use weights::CoreWeightTable;
