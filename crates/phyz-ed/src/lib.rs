#![allow(clippy::needless_range_loop)]
//! Symmetry-adapted exact diagonalization of quantum lattice models.
//!
//! Builds Hilbert-space blocks of spin-1/2, t-J and Hubbard (Electron)
//! models, optionally reduced by a permutation group and one of its
//! irreducible representations, and applies typed lattice terms to them as
//! dense matrices or matrix-free. A two-pass Lanczos engine computes
//! extremal eigenpairs and Krylov time evolution on top of the matrix-free
//! multiply.
//!
//! # Modules
//!
//! - [`bits`]: Fixed-width bit words and bit tricks
//! - [`combinatorics`]: Enumeration and ranking of bit patterns
//! - [`symmetries`]: Permutations, groups, irreps, representative tables
//! - [`basis`]: Plain and symmetric basis variants
//! - [`block`]: The user-facing Hilbert-space blocks
//! - [`operators`]: Typed terms and their lowering per model
//! - [`apply`]: Dense fill and matrix-free application of term lists
//! - [`lanczos`]: Eigenvalues, ground states, time evolution
//! - [`distributed`]: Rank-partitioned two-channel bases and transposes
//! - [`parallel`]: Static range partitioning and atomic accumulation
//! - [`params`]: Solver and thread-pool parameters
//!
//! # Example
//!
//! ```
//! use phyz_ed::{Block, Op, OpSum, OpType, Spinhalf, matrix_on};
//!
//! let n = 6;
//! let mut ops = OpSum::new();
//! for i in 0..n {
//!     ops += (1.0, Op::new(OpType::SdotS, [i, (i + 1) % n]).unwrap());
//! }
//! let block: Block = Spinhalf::with_sz(n, 3).unwrap().into();
//! let h = matrix_on::<f64>(&ops, &block).unwrap();
//! let e0 = phyz_math::eigvals_sym(&h)[0];
//! assert!((e0 + 2.8027756377).abs() < 1e-8);
//! ```

pub mod apply;
pub mod basis;
pub mod bits;
pub mod block;
pub mod combinatorics;
pub mod distributed;
pub mod error;
pub mod lanczos;
pub mod operators;
pub mod parallel;
pub mod params;
pub mod symmetries;

pub use apply::{Operator, apply, inner, inner_between, matrix, matrix_on, target_block};
pub use block::{Block, Electron, Spinhalf, Tj};
pub use combinatorics::{Combinations, LinTable, Subsets, binomial};
pub use distributed::{
    DistributedOperator, DistributedTwoChannelBasis, LocalTransport, ThreadTransport, Transport,
    TransposeBuffers,
};
pub use error::{EdError, Result, ResultExt};
pub use lanczos::{
    LanczosResult, Tmatrix, eigs_lanczos, eigvals_lanczos, evolve_lanczos, exp_sym_v,
};
pub use operators::{Coupling, Op, OpSum, OpType, representation};
pub use params::{EvolveParams, LanczosParams, ParallelParams};
pub use symmetries::{
    GroupAction, Permutation, PermutationGroup, Representation, Symmetry, cyclic_group,
    generated_group,
};
