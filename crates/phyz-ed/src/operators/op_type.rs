use crate::error::{EdError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of a Hamiltonian term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpType {
    /// `S_i . S_j`.
    SdotS,
    /// `J/2 S+_i S-_j + conj(J)/2 S-_i S+_j`.
    Exchange,
    SzSz,
    Sz,
    SPlus,
    SMinus,
    /// `S_i . (S_j x S_k)`.
    ScalarChirality,
    /// Hopping of both spin species.
    Hop,
    Hopup,
    Hopdn,
    Cdagup,
    Cup,
    Cdagdn,
    Cdn,
    Nup,
    Ndn,
    Ntot,
    /// On-site repulsion on every site.
    HubbardU,
    /// `Sz_i Sz_j - n_i n_j / 4`.
    TjSzSz,
    /// `S_i . S_j - n_i n_j / 4`.
    TjSdotS,
    /// A dense local operator on the spin-1/2 sites of the term.
    Matrix,
}

/// How many sites a term of a given type acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    Exactly(usize),
    /// At least one site, fixed by the matrix dimension.
    Matrix,
}

impl OpType {
    pub const ALL: [OpType; 21] = [
        OpType::SdotS,
        OpType::Exchange,
        OpType::SzSz,
        OpType::Sz,
        OpType::SPlus,
        OpType::SMinus,
        OpType::ScalarChirality,
        OpType::Hop,
        OpType::Hopup,
        OpType::Hopdn,
        OpType::Cdagup,
        OpType::Cup,
        OpType::Cdagdn,
        OpType::Cdn,
        OpType::Nup,
        OpType::Ndn,
        OpType::Ntot,
        OpType::HubbardU,
        OpType::TjSzSz,
        OpType::TjSdotS,
        OpType::Matrix,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OpType::SdotS => "SdotS",
            OpType::Exchange => "Exchange",
            OpType::SzSz => "SzSz",
            OpType::Sz => "Sz",
            OpType::SPlus => "S+",
            OpType::SMinus => "S-",
            OpType::ScalarChirality => "ScalarChirality",
            OpType::Hop => "Hop",
            OpType::Hopup => "Hopup",
            OpType::Hopdn => "Hopdn",
            OpType::Cdagup => "Cdagup",
            OpType::Cup => "Cup",
            OpType::Cdagdn => "Cdagdn",
            OpType::Cdn => "Cdn",
            OpType::Nup => "Nup",
            OpType::Ndn => "Ndn",
            OpType::Ntot => "Ntot",
            OpType::HubbardU => "HubbardU",
            OpType::TjSzSz => "tJSzSz",
            OpType::TjSdotS => "tJSdotS",
            OpType::Matrix => "Matrix",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            OpType::HubbardU => Arity::None,
            OpType::Sz
            | OpType::SPlus
            | OpType::SMinus
            | OpType::Cdagup
            | OpType::Cup
            | OpType::Cdagdn
            | OpType::Cdn
            | OpType::Nup
            | OpType::Ndn
            | OpType::Ntot => Arity::Exactly(1),
            OpType::SdotS
            | OpType::Exchange
            | OpType::SzSz
            | OpType::Hop
            | OpType::Hopup
            | OpType::Hopdn
            | OpType::TjSzSz
            | OpType::TjSdotS => Arity::Exactly(2),
            OpType::ScalarChirality => Arity::Exactly(3),
            OpType::Matrix => Arity::Matrix,
        }
    }

    /// Change of the number of up particles (up spins for spin-1/2).
    pub fn nup_change(self) -> i64 {
        match self {
            OpType::SPlus | OpType::Cdagup => 1,
            OpType::SMinus | OpType::Cup => -1,
            _ => 0,
        }
    }

    /// Change of the number of down particles.
    pub fn ndn_change(self) -> i64 {
        match self {
            OpType::Cdagdn => 1,
            OpType::Cdn => -1,
            _ => 0,
        }
    }

    /// Whether the term leaves every basis state unchanged.
    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            OpType::SzSz
                | OpType::Sz
                | OpType::Nup
                | OpType::Ndn
                | OpType::Ntot
                | OpType::HubbardU
                | OpType::TjSzSz
        )
    }

    /// Whether the term only exists with complex coefficients.
    pub fn is_intrinsically_complex(self) -> bool {
        matches!(self, OpType::ScalarChirality)
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OpType {
    type Err = EdError;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s {
            "SPlus" | "Splus" => OpType::SPlus,
            "SMinus" | "Sminus" => OpType::SMinus,
            "TjSzSz" => OpType::TjSzSz,
            "TjSdotS" => OpType::TjSdotS,
            _ => OpType::ALL
                .into_iter()
                .find(|t| t.name() == s)
                .ok_or_else(|| EdError::invalid(format!("unknown operator type \"{s}\"")))?,
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for kind in OpType::ALL {
            assert_eq!(kind.name().parse::<OpType>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.name());
        }
        assert_eq!("SPlus".parse::<OpType>().unwrap(), OpType::SPlus);
    }

    #[test]
    fn test_unknown_name() {
        let err = "Hopping".parse::<OpType>().unwrap_err();
        assert!(err.to_string().contains("Hopping"));
    }

    #[test]
    fn test_quantum_numbers() {
        assert_eq!(OpType::Cdagdn.ndn_change(), 1);
        assert_eq!(OpType::Cdagdn.nup_change(), 0);
        assert_eq!(OpType::SMinus.nup_change(), -1);
        assert_eq!(OpType::Exchange.nup_change(), 0);
        assert_eq!(OpType::ScalarChirality.arity(), Arity::Exactly(3));
        assert_eq!(OpType::HubbardU.arity(), Arity::None);
    }
}
