use super::params::{
    AtomTypeDef, HarmonicAngleDef, HarmonicBondDef, ImproperTorsionDef, ProperTorsionDef,
    UreyBradleyDef,
};
use super::xml::{RuleFile, RuleFileError};
use crate::core::smarts::{SmartsParseError, SmartsPattern};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading and merging rule-file sources.
#[derive(Debug, Error)]
pub enum ForcefieldLoadError {
    #[error("Failed to read rule file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse rule file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: RuleFileError,
    },
    #[error("Atom type '{type_name}' has an invalid def pattern: {source}")]
    Smarts {
        type_name: String,
        #[source]
        source: SmartsParseError,
    },
    #[error("Atom type '{name}' is defined more than once across rule sources")]
    DuplicateTypeDefinition { name: String },
    #[error("Override relation contains a cycle: {}", cycle.join(" -> "))]
    OverrideCycle { cycle: Vec<String> },
}

/// The merged, validated content of one or more rule-file sources.
///
/// Atom types and bonded-term definitions carry a global definition index
/// reflecting their order across sources; that order breaks specificity ties
/// during resolution.
#[derive(Debug)]
pub struct Forcefield {
    atom_types: Vec<AtomTypeDef>,
    type_index: HashMap<String, usize>,
    /// Resolved override edges, parallel to `atom_types`: entry `i` lists the
    /// indices of types that type `i` supersedes.
    overrides: Vec<Vec<usize>>,
    pub harmonic_bonds: Vec<HarmonicBondDef>,
    pub harmonic_angles: Vec<HarmonicAngleDef>,
    pub propers: Vec<ProperTorsionDef>,
    pub impropers: Vec<ImproperTorsionDef>,
    pub urey_bradleys: Vec<UreyBradleyDef>,
    pub coulomb14scale: Option<f64>,
    pub lj14scale: Option<f64>,
}

impl Forcefield {
    /// Loads and merges rule files from disk, in the given order.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ForcefieldLoadError> {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let text =
                std::fs::read_to_string(path).map_err(|source| ForcefieldLoadError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            let file =
                RuleFile::parse_str(&text).map_err(|source| ForcefieldLoadError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
            sources.push(file);
        }
        Self::from_sources(sources)
    }

    /// Merges already-parsed sources into one registry.
    pub fn from_sources(sources: Vec<RuleFile>) -> Result<Self, ForcefieldLoadError> {
        let mut atom_types: Vec<AtomTypeDef> = Vec::new();
        let mut type_index: HashMap<String, usize> = HashMap::new();
        let mut raw_overrides: Vec<Vec<String>> = Vec::new();
        let mut harmonic_bonds = Vec::new();
        let mut harmonic_angles = Vec::new();
        let mut propers = Vec::new();
        let mut impropers = Vec::new();
        let mut urey_bradleys = Vec::new();
        let mut nonbonded: HashMap<String, crate::core::models::atom::NonbondedParams> =
            HashMap::new();
        let mut coulomb14scale = None;
        let mut lj14scale = None;

        for source in sources {
            for raw in source.atom_types {
                if type_index.contains_key(&raw.name) {
                    return Err(ForcefieldLoadError::DuplicateTypeDefinition { name: raw.name });
                }
                let pattern = match &raw.def {
                    Some(def) => Some(SmartsPattern::parse(def).map_err(|source| {
                        ForcefieldLoadError::Smarts {
                            type_name: raw.name.clone(),
                            source,
                        }
                    })?),
                    None => {
                        tracing::warn!(
                            type_name = %raw.name,
                            "Atom type has no def pattern; it will only match atoms whose name equals the type name"
                        );
                        None
                    }
                };
                let index = atom_types.len();
                type_index.insert(raw.name.clone(), index);
                raw_overrides.push(raw.overrides.clone());
                atom_types.push(AtomTypeDef {
                    name: raw.name,
                    class: raw.class,
                    element: raw.element,
                    def: raw.def,
                    pattern,
                    overrides: raw.overrides,
                    desc: raw.desc,
                    doi: raw.doi,
                    mass: raw.mass,
                    nonbonded: Default::default(),
                    index,
                });
            }

            for mut def in source.harmonic_bonds {
                def.index = harmonic_bonds.len();
                harmonic_bonds.push(def);
            }
            for mut def in source.harmonic_angles {
                def.index = harmonic_angles.len();
                harmonic_angles.push(def);
            }
            for mut def in source.propers {
                def.index = propers.len();
                propers.push(def);
            }
            for mut def in source.impropers {
                def.index = impropers.len();
                impropers.push(def);
            }
            for mut def in source.urey_bradleys {
                def.index = urey_bradleys.len();
                urey_bradleys.push(def);
            }

            for entry in source.nonbonded {
                nonbonded.insert(entry.type_name, entry.params);
            }
            if source.coulomb14scale.is_some() {
                coulomb14scale = source.coulomb14scale;
            }
            if source.lj14scale.is_some() {
                lj14scale = source.lj14scale;
            }
        }

        for def in &mut atom_types {
            if let Some(params) = nonbonded.remove(&def.name) {
                def.nonbonded = params;
            }
        }
        for type_name in nonbonded.keys() {
            tracing::warn!(
                %type_name,
                "Nonbonded entry refers to an unknown atom type; ignoring"
            );
        }

        let overrides = resolve_overrides(&atom_types, &type_index, &raw_overrides);
        check_override_cycles(&atom_types, &overrides)?;

        Ok(Self {
            atom_types,
            type_index,
            overrides,
            harmonic_bonds,
            harmonic_angles,
            propers,
            impropers,
            urey_bradleys,
            coulomb14scale,
            lj14scale,
        })
    }

    pub fn atom_types(&self) -> &[AtomTypeDef] {
        &self.atom_types
    }

    pub fn type_by_name(&self, name: &str) -> Option<&AtomTypeDef> {
        self.type_index.get(name).map(|&i| &self.atom_types[i])
    }

    /// Indices of the atom types that type `index` supersedes.
    pub fn overrides_of(&self, index: usize) -> &[usize] {
        &self.overrides[index]
    }

    pub fn has_urey_bradley(&self) -> bool {
        !self.urey_bradleys.is_empty()
    }
}

fn resolve_overrides(
    atom_types: &[AtomTypeDef],
    type_index: &HashMap<String, usize>,
    raw: &[Vec<String>],
) -> Vec<Vec<usize>> {
    raw.iter()
        .enumerate()
        .map(|(i, names)| {
            names
                .iter()
                .filter_map(|name| match type_index.get(name) {
                    Some(&target) => Some(target),
                    None => {
                        tracing::warn!(
                            type_name = %atom_types[i].name,
                            overridden = %name,
                            "Override target is not a known atom type; ignoring"
                        );
                        None
                    }
                })
                .collect()
        })
        .collect()
}

/// Depth-first search over the override graph. A back edge means two types
/// each claim priority over the other, which has no consistent resolution.
fn check_override_cycles(
    atom_types: &[AtomTypeDef],
    overrides: &[Vec<usize>],
) -> Result<(), ForcefieldLoadError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; overrides.len()];
    for start in 0..overrides.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        // Iterative DFS; stack entries are (node, next child position).
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        marks[start] = Mark::InProgress;
        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            if frame.1 < overrides[node].len() {
                let next = overrides[node][frame.1];
                frame.1 += 1;
                match marks[next] {
                    Mark::Unvisited => {
                        marks[next] = Mark::InProgress;
                        stack.push((next, 0));
                    }
                    Mark::InProgress => {
                        let mut cycle: Vec<String> = stack
                            .iter()
                            .skip_while(|&&(n, _)| n != next)
                            .map(|&(n, _)| atom_types[n].name.clone())
                            .collect();
                        cycle.push(atom_types[next].name.clone());
                        return Err(ForcefieldLoadError::OverrideCycle { cycle });
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node] = Mark::Done;
                stack.pop();
            }
        }
    }
    Ok(())
}
