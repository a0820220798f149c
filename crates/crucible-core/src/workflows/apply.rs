use crate::core::forcefield::references::write_references;
use crate::core::forcefield::registry::Forcefield;
use crate::core::models::system::MolecularSystem;
use crate::engine::error::EngineError;
use crate::engine::terms::{BondedTerms, TermAssertions, resolve_bonded_terms};
use crate::engine::typer::assign_atom_types;
use std::path::PathBuf;

/// Options for one `apply` run.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Restrict typing to residues with these names; `None` types everything.
    pub residues: Option<Vec<String>>,
    /// Memoize typing per residue template when residues are independent.
    pub use_residue_map: bool,
    pub assert_bond_params: bool,
    pub assert_angle_params: bool,
    pub assert_dihedral_params: bool,
    pub assert_improper_params: bool,
    /// When set, a BibTeX bibliography of the used atom types is written here.
    pub references_file: Option<PathBuf>,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            residues: None,
            use_residue_map: true,
            assert_bond_params: true,
            assert_angle_params: true,
            assert_dihedral_params: true,
            assert_improper_params: true,
            references_file: None,
        }
    }
}

/// A structure with every selected atom typed and every bonded term resolved.
#[derive(Debug, Clone)]
pub struct TypedSystem {
    pub system: MolecularSystem,
    pub terms: BondedTerms,
}

/// Types the structure against the loaded rules and resolves its bonded
/// terms.
///
/// The input system is not modified; a typed copy is returned. Any fatal
/// error aborts the whole call, so a partially typed structure is never
/// observable.
#[tracing::instrument(skip_all)]
pub fn apply(
    forcefield: &Forcefield,
    system: &MolecularSystem,
    options: &ApplyOptions,
) -> Result<TypedSystem, EngineError> {
    let mut system = system.clone();
    assign_atom_types(
        &mut system,
        forcefield,
        options.residues.as_deref(),
        options.use_residue_map,
    )?;

    let assertions = TermAssertions {
        bonds: options.assert_bond_params,
        angles: options.assert_angle_params,
        dihedrals: options.assert_dihedral_params,
        impropers: options.assert_improper_params,
    };
    let terms = resolve_bonded_terms(&system, forcefield, &assertions)?;

    if let Some(path) = &options.references_file {
        write_references(path, forcefield, &system)?;
    }

    tracing::info!(
        atoms = system.atom_count(),
        bonds = terms.bonds.len(),
        angles = terms.angles.len(),
        propers = terms.propers.len(),
        impropers = terms.impropers.len(),
        "Typing complete"
    );
    Ok(TypedSystem { system, terms })
}
