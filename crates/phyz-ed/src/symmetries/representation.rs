use super::{Permutation, PermutationGroup};
use crate::error::{EdError, Result};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Mul;

/// Imaginary parts below this are considered zero.
const REAL_TOLERANCE: f64 = 1e-12;

/// Characters closer than this are considered equal.
const CHARACTER_TOLERANCE: f64 = 1e-10;

/// A one-dimensional representation of a permutation group.
///
/// `characters[k]` belongs to group element `k`, or to element
/// `allowed_symmetries[k]` when the representation lives on a subgroup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representation {
    characters: Vec<Complex64>,
    allowed_symmetries: Option<Vec<usize>>,
}

impl Representation {
    pub fn new(characters: Vec<Complex64>) -> Self {
        Self {
            characters,
            allowed_symmetries: None,
        }
    }

    pub fn from_real(characters: &[f64]) -> Self {
        Self::new(characters.iter().map(|&c| Complex64::new(c, 0.0)).collect())
    }

    /// All characters equal to one.
    pub fn trivial(size: usize) -> Self {
        Self::new(vec![Complex64::new(1.0, 0.0); size])
    }

    /// Characters attached to a subset of group elements.
    pub fn with_allowed_symmetries(
        characters: Vec<Complex64>,
        allowed_symmetries: Vec<usize>,
    ) -> Result<Self> {
        if characters.len() != allowed_symmetries.len() {
            return Err(EdError::invalid(format!(
                "{} characters given for {} allowed symmetries",
                characters.len(),
                allowed_symmetries.len()
            )));
        }
        Ok(Self {
            characters,
            allowed_symmetries: Some(allowed_symmetries),
        })
    }

    pub fn size(&self) -> usize {
        self.characters.len()
    }

    pub fn characters(&self) -> &[Complex64] {
        &self.characters
    }

    #[inline]
    pub fn character(&self, i: usize) -> Complex64 {
        self.characters[i]
    }

    pub fn allowed_symmetries(&self) -> Option<&[usize]> {
        self.allowed_symmetries.as_deref()
    }

    pub fn is_real(&self) -> bool {
        self.characters.iter().all(|c| c.im.abs() < REAL_TOLERANCE)
    }

    /// Real parts of the characters; fails for a genuinely complex irrep.
    pub fn characters_real(&self) -> Result<Vec<f64>> {
        if !self.is_real() {
            return Err(EdError::NumericCompatibility(
                "requested real characters of a complex representation".into(),
            ));
        }
        Ok(self.characters.iter().map(|c| c.re).collect())
    }

    /// Elementwise product of two representations of the same group.
    pub fn multiply(&self, other: &Representation) -> Result<Representation> {
        if self.size() != other.size() || self.allowed_symmetries != other.allowed_symmetries {
            return Err(EdError::invalid(
                "cannot multiply representations of different groups",
            ));
        }
        Ok(Self {
            characters: self
                .characters
                .iter()
                .zip(&other.characters)
                .map(|(a, b)| a * b)
                .collect(),
            allowed_symmetries: self.allowed_symmetries.clone(),
        })
    }

    /// Same size and characters equal within tolerance.
    pub fn approx_eq(&self, other: &Representation) -> bool {
        self.size() == other.size()
            && self
                .characters
                .iter()
                .zip(&other.characters)
                .all(|(a, b)| (a - b).norm() <= CHARACTER_TOLERANCE)
    }

    /// Check `χ(g_i g_j) = χ(g_i) χ(g_j)` on a group of matching size.
    pub fn check_consistent(&self, group: &PermutationGroup) -> Result<()> {
        if self.size() != group.size() {
            return Err(EdError::invalid(format!(
                "representation of size {} does not match group of size {}",
                self.size(),
                group.size()
            )));
        }
        for i in 0..group.size() {
            for j in 0..group.size() {
                let lhs = self.characters[group.multiply(i, j)];
                let rhs = self.characters[i] * self.characters[j];
                if (lhs - rhs).norm() > CHARACTER_TOLERANCE {
                    return Err(EdError::invalid(format!(
                        "characters violate the group law at elements {i} and {j}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Mul for &Representation {
    type Output = Result<Representation>;

    fn mul(self, rhs: &Representation) -> Result<Representation> {
        self.multiply(rhs)
    }
}

/// The group and irrep to build a symmetric basis from.
///
/// Restricts `group` to the allowed symmetries of `irrep` when it has any,
/// then checks that the characters respect the (sub)group law.
pub fn allowed_subgroup(
    group: &PermutationGroup,
    irrep: &Representation,
) -> Result<PermutationGroup> {
    let subgroup = match irrep.allowed_symmetries() {
        Some(allowed) => group.subgroup(allowed)?,
        None => group.clone(),
    };
    irrep
        .check_consistent(&subgroup)
        .map_err(|e| e.context("irrep incompatible with symmetry group"))?;
    Ok(subgroup)
}

/// Close `seeds` under composition and derive the matching 1D irrep.
///
/// Each seed carries a phase, its character. Products accumulate phases;
/// reaching one element along two paths with different phases means the
/// phases are not a representation and is an error. Iterates to a fixed
/// point, so the seeds need not be generators of minimal order.
pub fn generated_group(
    seeds: &[(Permutation, Complex64)],
) -> Result<(PermutationGroup, Representation)> {
    let Some((first, _)) = seeds.first() else {
        return Err(EdError::invalid("generated_group needs at least one seed"));
    };
    let n_sites = first.n_sites();

    let identity = Permutation::identity(n_sites);
    let mut elements = vec![identity.clone()];
    let mut characters = vec![Complex64::new(1.0, 0.0)];
    let mut lookup = HashMap::from([(identity, 0usize)]);

    let mut frontier = 0;
    while frontier < elements.len() {
        let end = elements.len();
        for e in frontier..end {
            for (seed, phase) in seeds {
                let product = elements[e].compose(seed)?;
                let chi = characters[e] * phase;
                match lookup.get(&product) {
                    Some(&k) => {
                        if (characters[k] - chi).norm() > CHARACTER_TOLERANCE {
                            return Err(EdError::invalid(format!(
                                "inconsistent phases: element {product} reached with characters {} and {chi}",
                                characters[k]
                            )));
                        }
                    }
                    None => {
                        lookup.insert(product.clone(), elements.len());
                        elements.push(product);
                        characters.push(chi);
                    }
                }
            }
        }
        frontier = end;
    }

    let group = PermutationGroup::new(elements)?;
    let irrep = Representation::new(characters);
    irrep.check_consistent(&group)?;
    Ok((group, irrep))
}

/// Irrep of an existing group generated by phased seed permutations.
///
/// Characters follow the element order of `group`.
pub fn generated_irrep(
    group: &PermutationGroup,
    seeds: &[(Permutation, Complex64)],
) -> Result<Representation> {
    let (generated, irrep) = generated_group(seeds)?;
    if generated.size() != group.size() {
        return Err(EdError::invalid(format!(
            "seeds generate {} elements, group has {}",
            generated.size(),
            group.size()
        )));
    }
    let mut characters = Vec::with_capacity(group.size());
    for p in group {
        let k = generated.index_of(p).ok_or_else(|| {
            EdError::invalid(format!("group element {p} is not generated by the seeds"))
        })?;
        characters.push(irrep.character(k));
    }
    Ok(Representation::new(characters))
}
