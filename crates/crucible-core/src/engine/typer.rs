use super::error::EngineError;
use crate::core::forcefield::registry::Forcefield;
use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::models::system::MolecularSystem;
use std::collections::{BTreeSet, HashMap};

/// Outcome of resolving one atom against the registry, after override
/// filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TypingOutcome {
    Resolved(usize),
    Ambiguous(Vec<usize>),
    NoMatch,
}

/// Assigns an atom type to every atom of the selected residues, mutating
/// `force_field_type` and `nonbonded` in place.
///
/// `residue_filter` restricts typing to residues with the given names; atoms
/// of other residues are left untouched. With `use_residue_map`, typing is
/// computed once per distinct residue template and replicated, falling back
/// to full per-atom typing whenever the independence precondition fails.
pub fn assign_atom_types(
    system: &mut MolecularSystem,
    forcefield: &Forcefield,
    residue_filter: Option<&[String]>,
    use_residue_map: bool,
) -> Result<(), EngineError> {
    let selected: Vec<ResidueId> = system
        .residues_iter()
        .filter(|(_, residue)| {
            residue_filter
                .map(|names| names.iter().any(|n| n == &residue.name))
                .unwrap_or(true)
        })
        .map(|(id, _)| id)
        .collect();

    if use_residue_map && check_independent_residues(system) {
        assign_memoized(system, forcefield, &selected)
    } else {
        let mut assignments = Vec::new();
        for residue_id in &selected {
            let atoms: Vec<AtomId> = system
                .residue(*residue_id)
                .map(|r| r.atoms().to_vec())
                .unwrap_or_default();
            for atom_id in atoms {
                let def_index = resolve_atom(system, forcefield, atom_id)?;
                assignments.push((atom_id, def_index));
            }
        }
        for (atom_id, def_index) in assignments {
            stamp(system, forcefield, atom_id, def_index);
        }
        Ok(())
    }
}

fn assign_memoized(
    system: &mut MolecularSystem,
    forcefield: &Forcefield,
    selected: &[ResidueId],
) -> Result<(), EngineError> {
    // Template cache, scoped to this call: residue name -> per-atom def
    // indices in residue atom order.
    let mut cache: HashMap<String, Vec<usize>> = HashMap::new();
    let mut assignments: Vec<(AtomId, usize)> = Vec::new();

    for residue_id in selected {
        let (name, atoms) = match system.residue(*residue_id) {
            Some(residue) => (residue.name.clone(), residue.atoms().to_vec()),
            None => continue,
        };
        let template = match cache.get(&name) {
            Some(template) => template.clone(),
            None => {
                let mut template = Vec::with_capacity(atoms.len());
                for &atom_id in &atoms {
                    template.push(resolve_atom(system, forcefield, atom_id)?);
                }
                cache.insert(name, template.clone());
                template
            }
        };
        for (&atom_id, &def_index) in atoms.iter().zip(&template) {
            assignments.push((atom_id, def_index));
        }
    }

    for (atom_id, def_index) in assignments {
        stamp(system, forcefield, atom_id, def_index);
    }
    Ok(())
}

/// True when residue-template memoization is safe: no bond crosses a residue
/// boundary, and residues sharing a name are structurally identical with
/// consistent atom ordering.
pub(crate) fn check_independent_residues(system: &MolecularSystem) -> bool {
    if !system.residues_are_disconnected() {
        return false;
    }
    let mut templates: HashMap<&str, ResidueFingerprint> = HashMap::new();
    for (id, residue) in system.residues_iter() {
        let fingerprint = ResidueFingerprint::of(system, id);
        match templates.get(residue.name.as_str()) {
            Some(existing) => {
                if *existing != fingerprint {
                    return false;
                }
            }
            None => {
                templates.insert(&residue.name, fingerprint);
            }
        }
    }
    true
}

/// Canonical residue-template identity: atom (name, element) sequence in
/// residue order plus the residue-local edge set.
#[derive(Debug, PartialEq, Eq)]
struct ResidueFingerprint {
    atoms: Vec<(String, String)>,
    edges: BTreeSet<(usize, usize)>,
}

impl ResidueFingerprint {
    fn of(system: &MolecularSystem, residue_id: ResidueId) -> Self {
        let Some(residue) = system.residue(residue_id) else {
            return Self {
                atoms: Vec::new(),
                edges: BTreeSet::new(),
            };
        };
        let locals: HashMap<AtomId, usize> = residue
            .atoms()
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
        let atoms = residue
            .atoms()
            .iter()
            .filter_map(|&id| system.atom(id))
            .map(|atom| (atom.name.clone(), atom.element.clone()))
            .collect();
        let mut edges = BTreeSet::new();
        for (&atom_id, &i) in &locals {
            for &neighbor in system.get_bonded_neighbors(atom_id).unwrap_or(&[]) {
                if let Some(&j) = locals.get(&neighbor) {
                    edges.insert((i.min(j), i.max(j)));
                }
            }
        }
        Self { atoms, edges }
    }
}

/// Resolves one atom to exactly one type definition index.
fn resolve_atom(
    system: &MolecularSystem,
    forcefield: &Forcefield,
    atom_id: AtomId,
) -> Result<usize, EngineError> {
    let candidates = collect_candidates(system, forcefield, atom_id);
    match filter_overridden(forcefield, candidates) {
        TypingOutcome::Resolved(index) => Ok(index),
        TypingOutcome::Ambiguous(indices) => {
            let (atom_name, residue_name) = atom_context(system, atom_id);
            Err(EngineError::AmbiguousAtomType {
                atom_name,
                residue_name,
                candidates: indices
                    .iter()
                    .map(|&i| forcefield.atom_types()[i].name.clone())
                    .collect(),
            })
        }
        TypingOutcome::NoMatch => {
            let (atom_name, residue_name) = atom_context(system, atom_id);
            Err(EngineError::MissingAtomType {
                atom_name,
                residue_name,
            })
        }
    }
}

/// All definitions matching the atom. A definition with a pattern matches
/// structurally; one without a pattern matches only atoms whose name equals
/// the type name.
fn collect_candidates(
    system: &MolecularSystem,
    forcefield: &Forcefield,
    atom_id: AtomId,
) -> Vec<usize> {
    let Some(atom) = system.atom(atom_id) else {
        return Vec::new();
    };
    forcefield
        .atom_types()
        .iter()
        .filter(|def| {
            def.element
                .as_deref()
                .map(|e| e == atom.element)
                .unwrap_or(true)
        })
        .filter(|def| match &def.pattern {
            Some(pattern) => pattern.matches(system, atom_id).is_some(),
            None => def.name == atom.name,
        })
        .map(|def| def.index)
        .collect()
}

/// Drops every candidate that some other candidate declares an override for,
/// then classifies what remains.
fn filter_overridden(forcefield: &Forcefield, candidates: Vec<usize>) -> TypingOutcome {
    if candidates.is_empty() {
        return TypingOutcome::NoMatch;
    }
    let surviving: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&c| {
            !candidates
                .iter()
                .any(|&o| o != c && forcefield.overrides_of(o).contains(&c))
        })
        .collect();
    match surviving.as_slice() {
        [single] => TypingOutcome::Resolved(*single),
        [] => TypingOutcome::Ambiguous(candidates),
        _ => TypingOutcome::Ambiguous(surviving),
    }
}

fn stamp(
    system: &mut MolecularSystem,
    forcefield: &Forcefield,
    atom_id: AtomId,
    def_index: usize,
) {
    let def = &forcefield.atom_types()[def_index];
    if let Some(atom) = system.atom_mut(atom_id) {
        atom.force_field_type = Some(def.name.clone());
        atom.nonbonded = Some(def.nonbonded);
    }
}

fn atom_context(system: &MolecularSystem, atom_id: AtomId) -> (String, String) {
    let atom_name = system
        .atom(atom_id)
        .map(|a| a.name.clone())
        .unwrap_or_default();
    let residue_name = system
        .atom(atom_id)
        .and_then(|a| system.residue(a.residue_id))
        .map(|r| r.name.clone())
        .unwrap_or_default();
    (atom_name, residue_name)
}
