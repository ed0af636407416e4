//! Hamiltonian terms.
//!
//! - [`OpType`]: the term kinds, their arity and quantum-number changes
//! - [`Op`], [`Coupling`], [`OpSum`]: validated terms and sums of them
//! - [`compile`]: per-model lowering of composite terms (`SdotS`, `Hop`, ...)
//! - [`representation`]: how a term list transforms under a symmetry group

mod compile;
mod op;
mod op_type;
mod symmetry;

pub use compile::{Model, compile};
pub use op::{Coupling, Op, OpSum};
pub use op_type::{Arity, OpType};
pub use symmetry::representation;
