use crate::core::forcefield::references::ReferencesError;
use std::fmt;
use thiserror::Error;

/// The bonded-term kinds, for error reporting and assertion toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    Bond,
    Angle,
    Proper,
    Improper,
    UreyBradley,
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TermKind::Bond => "bond",
            TermKind::Angle => "angle",
            TermKind::Proper => "proper torsion",
            TermKind::Improper => "improper torsion",
            TermKind::UreyBradley => "Urey-Bradley",
        };
        f.write_str(label)
    }
}

/// Fatal failures during typing and parameter resolution. Any of these aborts
/// the whole `apply` call; no partially typed structure is returned.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No atom type matches atom '{atom_name}' in residue '{residue_name}'")]
    MissingAtomType {
        atom_name: String,
        residue_name: String,
    },
    #[error(
        "Atom '{atom_name}' in residue '{residue_name}' matches multiple atom types after override filtering: {}",
        candidates.join(", ")
    )]
    AmbiguousAtomType {
        atom_name: String,
        residue_name: String,
        candidates: Vec<String>,
    },
    #[error("No parameters found for {kind} between types [{}]", types.join(", "))]
    MissingTermParameters { kind: TermKind, types: Vec<String> },
    #[error(transparent)]
    References(#[from] ReferencesError),
}
