//! Lowering of composite terms to the primitives each model implements.

use super::{Coupling, Op, OpSum, OpType};
use crate::error::{Result, ResultExt};

/// The physical model a term list is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Spinhalf,
    Tj,
    Electron,
}

impl Model {
    pub fn name(self) -> &'static str {
        match self {
            Model::Spinhalf => "Spinhalf",
            Model::Tj => "tJ",
            Model::Electron => "Electron",
        }
    }
}

/// Rewrite `ops` in terms of the primitive terms of `model`.
///
/// Validates every term against `n_sites` and rejects the terms the model
/// has no meaning for.
pub fn compile(ops: &OpSum, model: Model, n_sites: usize) -> Result<OpSum> {
    let mut out = OpSum::new();
    for (coupling, op) in ops {
        op.check(n_sites)?;
        lower(*coupling, op, model, &mut out)
            .with_context(|| format!("compiling {op} for the {} model", model.name()))?;
    }
    Ok(out)
}

fn lower(c: Coupling, op: &Op, model: Model, out: &mut OpSum) -> Result<()> {
    use OpType::*;
    let sites = op.sites();
    let two_channel = model != Model::Spinhalf;
    match op.kind() {
        SdotS => {
            *out += (c, Op::new(SzSz, sites)?);
            *out += (c, Op::new(Exchange, sites)?);
        }
        TjSdotS if two_channel => {
            *out += (c, Op::new(TjSzSz, sites)?);
            *out += (c, Op::new(Exchange, sites)?);
        }
        Hop if two_channel => {
            *out += (c, Op::new(Hopup, sites)?);
            *out += (c, Op::new(Hopdn, sites)?);
        }
        Ntot if two_channel => {
            *out += (c, Op::new(Nup, sites)?);
            *out += (c, Op::new(Ndn, sites)?);
        }
        Sz if two_channel => {
            *out += (c * 0.5, Op::new(Nup, sites)?);
            *out += (c * -0.5, Op::new(Ndn, sites)?);
        }
        Exchange | SzSz => out.push(c, op.clone()),
        Sz | SPlus | SMinus | ScalarChirality | Matrix if !two_channel => {
            out.push(c, op.clone())
        }
        Hopup | Hopdn | Cdagup | Cup | Cdagdn | Cdn | Nup | Ndn | TjSzSz if two_channel => {
            out.push(c, op.clone())
        }
        HubbardU if model == Model::Electron => out.push(c, op.clone()),
        _ => return Err(op.error(format!("not supported by the {} model", model.name()))),
    }
    Ok(())
}
