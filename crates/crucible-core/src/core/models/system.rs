use super::atom::Atom;
use super::ids::{AtomId, ResidueId};
use super::residue::Residue;
use super::topology::{Bond, BondOrder};
use slotmap::{SecondaryMap, SlotMap};

/// The in-memory undirected molecular graph: atoms as nodes, bonds as edges,
/// plus the residue partitioning of the atoms.
///
/// Storage follows the slot-map pattern: atoms and residues live in
/// [`SlotMap`]s keyed by stable IDs, and a [`SecondaryMap`] caches the bond
/// adjacency per atom. Residue insertion order is preserved separately so
/// iteration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MolecularSystem {
    atoms: SlotMap<AtomId, Atom>,
    residues: SlotMap<ResidueId, Residue>,
    /// Residue IDs in insertion order.
    residue_order: Vec<ResidueId>,
    bonds: Vec<Bond>,
    bond_adjacency: SecondaryMap<AtomId, Vec<AtomId>>,
}

impl MolecularSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Iterates over all atoms in insertion order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter()
    }

    pub fn atoms_iter_mut(&mut self) -> impl Iterator<Item = (AtomId, &mut Atom)> {
        self.atoms.iter_mut()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    /// Iterates over residues in insertion order.
    pub fn residues_iter(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.residue_order
            .iter()
            .filter_map(|&id| self.residues.get(id).map(|r| (id, r)))
    }

    pub fn residue_count(&self) -> usize {
        self.residue_order.len()
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Appends a new residue and returns its ID.
    pub fn add_residue(&mut self, number: isize, name: &str) -> ResidueId {
        let id = self.residues.insert(Residue::new(number, name));
        self.residue_order.push(id);
        id
    }

    /// Adds an atom to a residue, registering it with the residue's name map
    /// and initializing its adjacency list.
    ///
    /// # Return
    ///
    /// Returns `Some(AtomId)` on success, or `None` if the residue does not exist.
    pub fn add_atom_to_residue(&mut self, residue_id: ResidueId, atom: Atom) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }

        let atom_id = self.atoms.insert(atom);
        self.bond_adjacency.insert(atom_id, Vec::new());
        self.residues.get_mut(residue_id)?.add_atom(atom_id);

        Some(atom_id)
    }

    /// Adds a bond between two atoms and updates the adjacency cache.
    ///
    /// Idempotent: adding an existing bond succeeds without creating
    /// duplicates.
    ///
    /// # Return
    ///
    /// Returns `Some(())` on success, or `None` if either atom does not exist.
    pub fn add_bond(&mut self, atom1_id: AtomId, atom2_id: AtomId, order: BondOrder) -> Option<()> {
        if !self.atoms.contains_key(atom1_id) || !self.atoms.contains_key(atom2_id) {
            return None;
        }

        if let Some(neighbors) = self.bond_adjacency.get(atom1_id) {
            if neighbors.contains(&atom2_id) {
                return Some(());
            }
        }

        self.bonds.push(Bond::new(atom1_id, atom2_id, order));
        self.bond_adjacency[atom1_id].push(atom2_id);
        self.bond_adjacency[atom2_id].push(atom1_id);
        Some(())
    }

    /// The bonded neighbors of an atom, in bond insertion order.
    pub fn get_bonded_neighbors(&self, atom_id: AtomId) -> Option<&[AtomId]> {
        self.bond_adjacency.get(atom_id).map(|v| v.as_slice())
    }

    /// Number of bonded neighbors of an atom.
    pub fn degree(&self, atom_id: AtomId) -> usize {
        self.bond_adjacency
            .get(atom_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    /// Number of bonded neighbors of `atom_id` whose element is hydrogen.
    pub fn bonded_hydrogen_count(&self, atom_id: AtomId) -> usize {
        self.bond_adjacency
            .get(atom_id)
            .map(|neighbors| {
                neighbors
                    .iter()
                    .filter(|&&n| self.atoms.get(n).map(|a| a.element == "H").unwrap_or(false))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Returns `true` if both endpoints of any bond belong to the same
    /// residue, i.e. no bond crosses a residue boundary.
    pub fn residues_are_disconnected(&self) -> bool {
        self.bonds.iter().all(|bond| {
            let r1 = self.atoms.get(bond.atom1_id).map(|a| a.residue_id);
            let r2 = self.atoms.get(bond.atom2_id).map(|a| a.residue_id);
            r1 == r2
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn build_methane() -> (MolecularSystem, AtomId, Vec<AtomId>) {
        let mut system = MolecularSystem::new();
        let res = system.add_residue(1, "MET");
        let c = system
            .add_atom_to_residue(res, Atom::new("C1", "C", res, Point3::origin()))
            .unwrap();
        let mut hydrogens = Vec::new();
        for i in 0..4 {
            let h = system
                .add_atom_to_residue(
                    res,
                    Atom::new(&format!("H{}", i + 1), "H", res, Point3::origin()),
                )
                .unwrap();
            system.add_bond(c, h, BondOrder::Single).unwrap();
            hydrogens.push(h);
        }
        (system, c, hydrogens)
    }

    #[test]
    fn system_creation_and_access() {
        let (system, c, hydrogens) = build_methane();

        assert_eq!(system.atom_count(), 5);
        assert_eq!(system.residue_count(), 1);
        assert_eq!(system.bonds().len(), 4);
        assert_eq!(system.atom(c).unwrap().element, "C");
        assert_eq!(system.atom(hydrogens[0]).unwrap().name, "H1");

        let (_, residue) = system.residues_iter().next().unwrap();
        assert_eq!(residue.name, "MET");
        assert_eq!(residue.atoms().len(), 5);
    }

    #[test]
    fn adjacency_and_degree_are_consistent() {
        let (system, c, hydrogens) = build_methane();

        assert_eq!(system.degree(c), 4);
        assert_eq!(system.degree(hydrogens[0]), 1);
        assert_eq!(system.get_bonded_neighbors(c).unwrap(), &hydrogens[..]);
        assert_eq!(system.get_bonded_neighbors(hydrogens[2]).unwrap(), &[c]);
    }

    #[test]
    fn bonded_hydrogen_count_counts_only_hydrogens() {
        let (mut system, c, _) = build_methane();
        assert_eq!(system.bonded_hydrogen_count(c), 4);

        let res = system.add_residue(2, "X");
        let n = system
            .add_atom_to_residue(res, Atom::new("N1", "N", res, Point3::origin()))
            .unwrap();
        assert_eq!(system.bonded_hydrogen_count(n), 0);
    }

    #[test]
    fn idempotent_add_bond_does_not_create_duplicates() {
        let (mut system, c, hydrogens) = build_methane();
        system.add_bond(hydrogens[0], c, BondOrder::Single).unwrap();
        assert_eq!(system.bonds().len(), 4);
        assert_eq!(system.degree(c), 4);
    }

    #[test]
    fn residues_iter_preserves_insertion_order() {
        let mut system = MolecularSystem::new();
        system.add_residue(3, "C");
        system.add_residue(1, "A");
        system.add_residue(2, "B");
        let names: Vec<&str> = system
            .residues_iter()
            .map(|(_, r)| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn residues_are_disconnected_detects_cross_residue_bonds() {
        let (mut system, c, _) = build_methane();
        assert!(system.residues_are_disconnected());

        let res2 = system.add_residue(2, "X");
        let o = system
            .add_atom_to_residue(res2, Atom::new("O1", "O", res2, Point3::origin()))
            .unwrap();
        assert!(system.residues_are_disconnected());

        system.add_bond(c, o, BondOrder::Single).unwrap();
        assert!(!system.residues_are_disconnected());
    }
}
