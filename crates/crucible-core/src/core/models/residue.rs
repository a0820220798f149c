use super::ids::AtomId;

/// A named group of atoms with induced-subgraph connectivity.
///
/// Residues are the unit of typing memoization: when no bond crosses a
/// residue boundary and same-named residues are structurally identical,
/// typing results computed for one residue may be replicated to its
/// duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    /// Residue sequence number from the source description.
    pub number: isize,
    /// Name of the residue (e.g., "ETH", "BEN").
    pub name: String,
    pub(crate) atoms: Vec<AtomId>,
}

impl Residue {
    pub(crate) fn new(number: isize, name: &str) -> Self {
        Self {
            number,
            name: name.to_string(),
            atoms: Vec::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_id: AtomId) {
        self.atoms.push(atom_id);
    }

    /// Atom IDs in insertion order. This order is the residue-local index
    /// space used by template fingerprinting and memoized replication.
    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }
}
