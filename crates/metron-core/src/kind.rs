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

//! Enumerations of what can be measured.
//!
//! An [`OpKind`] is a coarse category of compute-kernel work (one per
//! graph operator). A [`RegionKind`] is a finer-grained, explicitly tagged
//! code region inside an operator (e.g. a single mat-mul chunk). The two
//! families are tracked in separate tables and separate interval stacks.
//!
//! Both enums index into fixed-size per-thread record arrays, so `index()`
//! must stay dense and `ALL` must list every variant in index order.

use std::fmt::Display;

use serde::Serialize;

/// A coarse, enumerable category of compute-kernel work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OpKind {
    /// Element-wise addition.
    Add,
    /// Element-wise multiplication.
    Mul,
    /// Matrix multiplication.
    MatMul,
    /// Indirect (expert-routed) matrix multiplication.
    MatMulId,
    /// Mean/variance normalization.
    Norm,
    /// Root-mean-square normalization.
    RmsNorm,
    /// Softmax over rows.
    SoftMax,
    /// Rotary position embedding.
    Rope,
    /// Tensor copy / layout change.
    Cpy,
}

impl OpKind {
    /// Every operation kind, in index order.
    pub const ALL: [OpKind; 9] = [
        OpKind::Add,
        OpKind::Mul,
        OpKind::MatMul,
        OpKind::MatMulId,
        OpKind::Norm,
        OpKind::RmsNorm,
        OpKind::SoftMax,
        OpKind::Rope,
        OpKind::Cpy,
    ];

    /// Number of operation kinds (the record-array length).
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index of this kind into a per-thread record array.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable, lowercase name used in reports and exports.
    pub fn name(self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Mul => "mul",
            OpKind::MatMul => "mat_mul",
            OpKind::MatMulId => "mat_mul_id",
            OpKind::Norm => "norm",
            OpKind::RmsNorm => "rms_norm",
            OpKind::SoftMax => "soft_max",
            OpKind::Rope => "rope",
            OpKind::Cpy => "cpy",
        }
    }
}

impl Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A finer-grained, explicitly tagged code region inside an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RegionKind {
    /// One dynamically claimed chunk of a matrix multiplication.
    MatMulChunk,
    /// One chunk of an indirect (expert-routed) matrix multiplication.
    MatMulIdChunk,
    /// Per-thread setup before mat-mul chunk processing starts.
    MatMulPrepare,
    /// Per-thread setup for the indirect mat-mul path.
    MatMulIdPrepare,
}

impl RegionKind {
    /// Every region kind, in index order.
    pub const ALL: [RegionKind; 4] = [
        RegionKind::MatMulChunk,
        RegionKind::MatMulIdChunk,
        RegionKind::MatMulPrepare,
        RegionKind::MatMulIdPrepare,
    ];

    /// Number of region kinds (the record-array length).
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index of this kind into a per-thread record array.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable, lowercase name used in reports and exports.
    pub fn name(self) -> &'static str {
        match self {
            RegionKind::MatMulChunk => "mat_mul_chunk",
            RegionKind::MatMulIdChunk => "mat_mul_id_chunk",
            RegionKind::MatMulPrepare => "mat_mul_prepare",
            RegionKind::MatMulIdPrepare => "mat_mul_id_prepare",
        }
    }
}

impl Display for RegionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_indices_are_dense_and_ordered() {
        for (i, op) in OpKind::ALL.iter().enumerate() {
            assert_eq!(op.index(), i);
        }
        assert_eq!(OpKind::COUNT, OpKind::ALL.len());
    }

    #[test]
    fn region_indices_are_dense_and_ordered() {
        for (i, region) in RegionKind::ALL.iter().enumerate() {
            assert_eq!(region.index(), i);
        }
        assert_eq!(RegionKind::COUNT, RegionKind::ALL.len());
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = OpKind::ALL.iter().map(|o| o.name()).collect();
        names.extend(RegionKind::ALL.iter().map(|r| r.name()));
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total, "duplicate kind name");
    }

    #[test]
    fn display_matches_name() {
        assert_eq!(OpKind::MatMul.to_string(), "mat_mul");
        assert_eq!(RegionKind::MatMulChunk.to_string(), "mat_mul_chunk");
    }
}
