//! Lattice symmetries acting on bit-encoded states.
//!
//! - [`Permutation`] / [`PermutationGroup`]: site relabelings and their groups
//! - [`Representation`]: one-dimensional irreps (characters per element)
//! - [`GroupAction`]: fast application of group elements to bit words,
//!   orbit representatives and stabilizers
//! - [`norm`]: irrep projection norms (spin and fermionic)
//! - [`FermiTable`]: cached fermionic reordering signs
//! - [`RepresentativeTable`]: the representatives of a pattern set with
//!   raw-pattern lookup

mod fermi;
mod group;
mod group_action;
pub mod norm;
mod permutation;
mod representation;
mod representative_table;

pub use fermi::{FermiTable, fermi_bool_of_permutation};
pub use group::{PermutationGroup, cyclic_group};
pub use group_action::GroupAction;
pub use norm::NORM_TOLERANCE;
pub use permutation::Permutation;
pub use representation::{Representation, allowed_subgroup, generated_group, generated_irrep};
pub use representative_table::{Projection, RepresentativeTable};

use crate::error::{EdError, Result};

/// A symmetry group together with the irrep selecting a sector.
///
/// The group is already restricted to the irrep's allowed symmetries, and
/// the characters are checked against the group law.
#[derive(Debug, Clone)]
pub struct Symmetry {
    group: PermutationGroup,
    irrep: Representation,
}

impl Symmetry {
    pub fn new(group: &PermutationGroup, irrep: &Representation) -> Result<Self> {
        let group = allowed_subgroup(group, irrep)?;
        let irrep = Representation::new(irrep.characters().to_vec());
        Ok(Self { group, irrep })
    }

    /// Check that the group acts on `n_sites` sites.
    pub fn check_sites(&self, n_sites: usize) -> Result<()> {
        if self.group.n_sites() != n_sites {
            return Err(EdError::invalid(format!(
                "symmetry group acts on {} sites but the block has {n_sites}",
                self.group.n_sites()
            )));
        }
        Ok(())
    }

    pub fn group(&self) -> &PermutationGroup {
        &self.group
    }

    pub fn irrep(&self) -> &Representation {
        &self.irrep
    }
}
