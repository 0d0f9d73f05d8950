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

//! # Metron Core
//!
//! Foundational crate containing the instrumentation data model, the
//! operation/region kind enumerations, and the clock contracts shared by
//! the rest of the workspace.
//!
//! Nothing in this crate measures anything by itself: `metron-telemetry`
//! owns the live monitor and probes, and serializes the snapshot types
//! defined here. Keeping the data model separate lets consumers depend on
//! the record shapes without pulling in the collection machinery.

#![warn(missing_docs)]

pub mod kind;
pub mod record;
pub mod time;

pub use kind::{OpKind, RegionKind};
pub use record::{MonitorSnapshot, OpRecord, RegionRecord, ThreadRecord};
pub use time::{Clock, ManualClock, MonotonicClock, Stopwatch};
