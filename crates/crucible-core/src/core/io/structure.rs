use crate::core::elements::{element_data, is_custom_element};
use crate::core::models::atom::Atom;
use crate::core::models::system::MolecularSystem;
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StructureLoadError {
    #[error("Failed to read structure file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse structure file: {source}")]
    Toml {
        #[source]
        source: toml::de::Error,
    },
    #[error("Atom '{atom_name}' has unknown element '{element}'")]
    UnknownElement { atom_name: String, element: String },
    #[error("Bond references out-of-range atom index {atom} in residue {residue}")]
    BondIndex { residue: usize, atom: usize },
    #[error("Invalid bond order '{value}'")]
    BondOrder { value: String },
}

/// A structure description: residues with their atoms and residue-local
/// bonds, plus optional bonds crossing residue boundaries.
#[derive(Debug, Deserialize)]
pub struct StructureFile {
    residues: Vec<ResidueSpec>,
    /// Inter-residue bonds as `[residue_i, atom_i, residue_j, atom_j]`,
    /// indices into the residue list and each residue's atom list.
    #[serde(default)]
    bonds: Vec<[usize; 4]>,
}

#[derive(Debug, Deserialize)]
struct ResidueSpec {
    name: String,
    #[serde(default)]
    number: Option<isize>,
    atoms: Vec<AtomSpec>,
    /// Residue-local bonds as `[atom_i, atom_j]` indices into `atoms`,
    /// optionally with a bond order as a third element, e.g.
    /// `[0, 1, "double"]`. Plain pairs default to single bonds.
    #[serde(default)]
    bonds: Vec<BondSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BondSpec {
    Plain(usize, usize),
    WithOrder(usize, usize, String),
}

#[derive(Debug, Deserialize)]
struct AtomSpec {
    name: String,
    element: String,
    #[serde(default)]
    position: [f64; 3],
}

impl StructureFile {
    pub fn parse_str(text: &str) -> Result<Self, StructureLoadError> {
        toml::from_str(text).map_err(|source| StructureLoadError::Toml { source })
    }

    /// Materializes the description into a topology graph.
    pub fn into_system(self) -> Result<MolecularSystem, StructureLoadError> {
        let mut system = MolecularSystem::new();
        let mut atom_ids = Vec::with_capacity(self.residues.len());

        for (ri, residue) in self.residues.iter().enumerate() {
            let number = residue.number.unwrap_or(ri as isize + 1);
            let residue_id = system.add_residue(number, &residue.name);
            let mut ids = Vec::with_capacity(residue.atoms.len());
            for atom in &residue.atoms {
                if element_data(&atom.element).is_none() && !is_custom_element(&atom.element) {
                    return Err(StructureLoadError::UnknownElement {
                        atom_name: atom.name.clone(),
                        element: atom.element.clone(),
                    });
                }
                let position = Point3::new(atom.position[0], atom.position[1], atom.position[2]);
                let id = system
                    .add_atom_to_residue(
                        residue_id,
                        Atom::new(&atom.name, &atom.element, residue_id, position),
                    )
                    .ok_or(StructureLoadError::BondIndex {
                        residue: ri,
                        atom: ids.len(),
                    })?;
                ids.push(id);
            }
            atom_ids.push(ids);
        }

        for (ri, residue) in self.residues.iter().enumerate() {
            for bond in &residue.bonds {
                let (i, j, order) = match bond {
                    BondSpec::Plain(i, j) => (*i, *j, BondOrder::default()),
                    BondSpec::WithOrder(i, j, raw) => {
                        let order = raw.parse().map_err(|_| StructureLoadError::BondOrder {
                            value: raw.clone(),
                        })?;
                        (*i, *j, order)
                    }
                };
                let a = lookup(&atom_ids, ri, i)?;
                let b = lookup(&atom_ids, ri, j)?;
                system
                    .add_bond(a, b, order)
                    .ok_or(StructureLoadError::BondIndex { residue: ri, atom: j })?;
            }
        }
        for &[ri, ai, rj, aj] in &self.bonds {
            let a = lookup(&atom_ids, ri, ai)?;
            let b = lookup(&atom_ids, rj, aj)?;
            system
                .add_bond(a, b, BondOrder::Single)
                .ok_or(StructureLoadError::BondIndex {
                    residue: rj,
                    atom: aj,
                })?;
        }

        Ok(system)
    }
}

fn lookup(
    atom_ids: &[Vec<crate::core::models::ids::AtomId>],
    residue: usize,
    atom: usize,
) -> Result<crate::core::models::ids::AtomId, StructureLoadError> {
    atom_ids
        .get(residue)
        .and_then(|ids| ids.get(atom))
        .copied()
        .ok_or(StructureLoadError::BondIndex { residue, atom })
}

/// Reads a structure file from disk and builds its topology graph.
pub fn load_structure(path: &Path) -> Result<MolecularSystem, StructureLoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| StructureLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    StructureFile::parse_str(&text)?.into_system()
}
