use super::error::{EngineError, TermKind};
use crate::core::forcefield::params::{TermSlot, slot_matches};
use crate::core::forcefield::registry::Forcefield;
use crate::core::forcefield::writer::UsedDefinitions;
use crate::core::models::ids::AtomId;
use crate::core::models::system::MolecularSystem;

/// Per-term-kind toggles controlling whether an unmatched motif aborts
/// resolution or is merely warned about and left unassigned.
#[derive(Debug, Clone, Copy)]
pub struct TermAssertions {
    pub bonds: bool,
    pub angles: bool,
    pub dihedrals: bool,
    pub impropers: bool,
}

impl Default for TermAssertions {
    fn default() -> Self {
        Self {
            bonds: true,
            angles: true,
            dihedrals: true,
            impropers: true,
        }
    }
}

/// One instantiated bonded term. `def_index` is `None` when no definition
/// matched and the corresponding assertion was relaxed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedTerm<const N: usize> {
    pub atoms: [AtomId; N],
    pub def_index: Option<usize>,
}

impl<const N: usize> TypedTerm<N> {
    pub fn is_matched(&self) -> bool {
        self.def_index.is_some()
    }
}

/// All bonded terms of one structure, with their selected definitions.
#[derive(Debug, Clone, Default)]
pub struct BondedTerms {
    pub bonds: Vec<TypedTerm<2>>,
    pub angles: Vec<TypedTerm<3>>,
    pub propers: Vec<TypedTerm<4>>,
    pub impropers: Vec<TypedTerm<4>>,
    pub urey_bradleys: Vec<TypedTerm<3>>,
}

impl BondedTerms {
    /// Definition indices actually selected, for the round-trip writer.
    pub fn used_definitions(&self) -> UsedDefinitions {
        let mut used = UsedDefinitions::default();
        used.harmonic_bonds
            .extend(self.bonds.iter().filter_map(|t| t.def_index));
        used.harmonic_angles
            .extend(self.angles.iter().filter_map(|t| t.def_index));
        used.propers
            .extend(self.propers.iter().filter_map(|t| t.def_index));
        used.impropers
            .extend(self.impropers.iter().filter_map(|t| t.def_index));
        used.urey_bradleys
            .extend(self.urey_bradleys.iter().filter_map(|t| t.def_index));
        used
    }
}

/// Enumerates every bonded motif of the typed structure and resolves each to
/// the best-matching definition.
///
/// Candidates are ranked by specificity descending, with ties broken by the
/// earliest definition in source order. Motifs containing untyped atoms
/// (possible under a residue filter) are skipped.
pub fn resolve_bonded_terms(
    system: &MolecularSystem,
    forcefield: &Forcefield,
    assertions: &TermAssertions,
) -> Result<BondedTerms, EngineError> {
    let mut terms = BondedTerms::default();

    for bond in system.bonds() {
        let atoms = [bond.atom1_id, bond.atom2_id];
        let Some(types) = atom_types(system, &atoms) else {
            continue;
        };
        let def_index = best_symmetric(&types, forcefield.harmonic_bonds.iter(), |def| {
            (&def.types, def.specificity(), def.index)
        });
        terms.bonds.push(resolved(
            atoms,
            def_index,
            &types,
            TermKind::Bond,
            assertions.bonds,
        )?);
    }

    let angle_motifs = enumerate_angles(system);
    for atoms in &angle_motifs {
        let Some(types) = atom_types(system, atoms) else {
            continue;
        };
        let def_index = best_symmetric(&types, forcefield.harmonic_angles.iter(), |def| {
            (&def.types, def.specificity(), def.index)
        });
        terms.angles.push(resolved(
            *atoms,
            def_index,
            &types,
            TermKind::Angle,
            assertions.angles,
        )?);

        // The 1-3 pair of an angle carries a Urey-Bradley term only when the
        // loaded rules define any; unmatched pairs simply have no term.
        if forcefield.has_urey_bradley() {
            let ub_index = best_symmetric(&types, forcefield.urey_bradleys.iter(), |def| {
                (&def.types, def.specificity(), def.index)
            });
            if ub_index.is_some() {
                terms.urey_bradleys.push(TypedTerm {
                    atoms: *atoms,
                    def_index: ub_index,
                });
            }
        }
    }

    for atoms in enumerate_propers(system) {
        let Some(types) = atom_types(system, &atoms) else {
            continue;
        };
        let def_index = best_symmetric(&types, forcefield.propers.iter(), |def| {
            (&def.types, def.specificity(), def.index)
        });
        terms.propers.push(resolved(
            atoms,
            def_index,
            &types,
            TermKind::Proper,
            assertions.dihedrals,
        )?);
    }

    for atoms in enumerate_impropers(system) {
        let Some(types) = atom_types(system, &atoms) else {
            continue;
        };
        let def_index = best_improper(&types, forcefield);
        terms.impropers.push(resolved(
            atoms,
            def_index,
            &types,
            TermKind::Improper,
            assertions.impropers,
        )?);
    }

    Ok(terms)
}

/// Angles: every pair of neighbors around a center, each unordered pair once.
fn enumerate_angles(system: &MolecularSystem) -> Vec<[AtomId; 3]> {
    let mut motifs = Vec::new();
    for (center, _) in system.atoms_iter() {
        let neighbors = system.get_bonded_neighbors(center).unwrap_or(&[]);
        for i in 0..neighbors.len() {
            for j in (i + 1)..neighbors.len() {
                motifs.push([neighbors[i], center, neighbors[j]]);
            }
        }
    }
    motifs
}

/// Proper dihedrals: length-3 paths, enumerated once per central bond.
fn enumerate_propers(system: &MolecularSystem) -> Vec<[AtomId; 4]> {
    let mut motifs = Vec::new();
    for bond in system.bonds() {
        let (j, k) = (bond.atom1_id, bond.atom2_id);
        for &i in system.get_bonded_neighbors(j).unwrap_or(&[]) {
            if i == k {
                continue;
            }
            for &l in system.get_bonded_neighbors(k).unwrap_or(&[]) {
                if l == j || l == i {
                    continue;
                }
                motifs.push([i, j, k, l]);
            }
        }
    }
    motifs
}

/// Impropers: a center with exactly three bonded atoms; the center occupies
/// slot 0.
fn enumerate_impropers(system: &MolecularSystem) -> Vec<[AtomId; 4]> {
    let mut motifs = Vec::new();
    for (center, _) in system.atoms_iter() {
        let neighbors = system.get_bonded_neighbors(center).unwrap_or(&[]);
        if let [a, b, c] = *neighbors {
            motifs.push([center, a, b, c]);
        }
    }
    motifs
}

fn atom_types<'a, const N: usize>(
    system: &'a MolecularSystem,
    atoms: &[AtomId; N],
) -> Option<[&'a str; N]> {
    let mut types = [""; N];
    for (slot, &id) in types.iter_mut().zip(atoms) {
        *slot = system.atom(id)?.force_field_type.as_deref()?;
    }
    Some(types)
}

fn compatible<const N: usize>(slots: &[TermSlot; N], types: &[&str; N]) -> bool {
    slots.iter().zip(types).all(|(slot, t)| slot_matches(slot, t))
}

/// Scans definitions in source order, keeping the first definition of the
/// highest specificity whose slots match the types forward or reversed.
fn best_symmetric<'a, D: 'a, const N: usize>(
    types: &[&str; N],
    defs: impl Iterator<Item = &'a D>,
    info: impl Fn(&'a D) -> (&'a [TermSlot; N], u32, usize),
) -> Option<usize> {
    let mut reversed = *types;
    reversed.reverse();
    let mut best: Option<(u32, usize)> = None;
    for def in defs {
        let (slots, specificity, index) = info(def);
        if compatible(slots, types) || compatible(slots, &reversed) {
            if best.map(|(s, _)| specificity > s).unwrap_or(true) {
                best = Some((specificity, index));
            }
        }
    }
    best.map(|(_, index)| index)
}

const PERMS3: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Improper matching: slot 0 must match the center; the remaining slots may
/// match the three peripheral atoms in any order.
fn best_improper(types: &[&str; 4], forcefield: &Forcefield) -> Option<usize> {
    let mut best: Option<(u32, usize)> = None;
    for def in &forcefield.impropers {
        if !slot_matches(&def.types[0], types[0]) {
            continue;
        }
        let peripheral = [types[1], types[2], types[3]];
        let matched = PERMS3.iter().any(|perm| {
            def.types[1..]
                .iter()
                .zip(perm)
                .all(|(slot, &p)| slot_matches(slot, peripheral[p]))
        });
        if matched {
            let specificity = def.specificity();
            if best.map(|(s, _)| specificity > s).unwrap_or(true) {
                best = Some((specificity, def.index));
            }
        }
    }
    best.map(|(_, index)| index)
}

fn resolved<const N: usize>(
    atoms: [AtomId; N],
    def_index: Option<usize>,
    types: &[&str; N],
    kind: TermKind,
    assert_matched: bool,
) -> Result<TypedTerm<N>, EngineError> {
    if def_index.is_none() {
        if assert_matched {
            return Err(EngineError::MissingTermParameters {
                kind,
                types: types.iter().map(|t| t.to_string()).collect(),
            });
        }
        tracing::warn!(
            %kind,
            types = ?types,
            "No parameters found for term; leaving it unassigned"
        );
    }
    Ok(TypedTerm { atoms, def_index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::xml::RuleFile;
    use crate::core::models::atom::Atom;
    use crate::core::models::topology::BondOrder;
    use nalgebra::Point3;

    fn forcefield(rules: &str) -> Forcefield {
        Forcefield::from_sources(vec![RuleFile::parse_str(rules).unwrap()]).unwrap()
    }

    /// Builds a single-residue system with pre-assigned types.
    fn stamped_system(
        atoms: &[(&str, &str, &str)],
        bonds: &[(usize, usize)],
    ) -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let res = system.add_residue(1, "RES");
        let ids: Vec<AtomId> = atoms
            .iter()
            .map(|(name, element, ff_type)| {
                let id = system
                    .add_atom_to_residue(res, Atom::new(name, element, res, Point3::origin()))
                    .unwrap();
                system.atom_mut(id).unwrap().force_field_type = Some(ff_type.to_string());
                id
            })
            .collect();
        for &(i, j) in bonds {
            system.add_bond(ids[i], ids[j], BondOrder::Single).unwrap();
        }
        system
    }

    fn ethane() -> MolecularSystem {
        stamped_system(
            &[
                ("C1", "C", "C_sp3"),
                ("C2", "C", "C_sp3"),
                ("H11", "H", "H_c"),
                ("H12", "H", "H_c"),
                ("H13", "H", "H_c"),
                ("H21", "H", "H_c"),
                ("H22", "H", "H_c"),
                ("H23", "H", "H_c"),
            ],
            &[(0, 1), (0, 2), (0, 3), (0, 4), (1, 5), (1, 6), (1, 7)],
        )
    }

    const ETHANE_RULES: &str = r#"
        <ForceField>
         <HarmonicBondForce>
          <Bond type1="C_sp3" type2="C_sp3" length="0.1529" k="224262.4"/>
          <Bond type1="C_sp3" type2="H_c" length="0.109" k="284512.0"/>
         </HarmonicBondForce>
         <HarmonicAngleForce>
          <Angle type1="C_sp3" type2="C_sp3" type3="H_c" angle="1.93" k="313.8"/>
          <Angle type1="H_c" type2="C_sp3" type3="H_c" angle="1.88" k="276.1"/>
         </HarmonicAngleForce>
         <PeriodicTorsionForce>
          <Proper type1="H_c" type2="C_sp3" type3="C_sp3" type4="H_c"
                  periodicity1="3" k1="0.6276" phase1="0.0"/>
         </PeriodicTorsionForce>
        </ForceField>
    "#;

    #[test]
    fn ethane_motif_counts_and_full_assignment() {
        let ff = forcefield(ETHANE_RULES);
        let system = ethane();
        let terms = resolve_bonded_terms(&system, &ff, &TermAssertions::default()).unwrap();
        assert_eq!(terms.bonds.len(), 7);
        assert_eq!(terms.angles.len(), 12);
        assert_eq!(terms.propers.len(), 9);
        assert!(terms.impropers.is_empty());
        assert!(terms.urey_bradleys.is_empty());
        assert!(terms.bonds.iter().all(TypedTerm::is_matched));
        assert!(terms.angles.iter().all(TypedTerm::is_matched));
        assert!(terms.propers.iter().all(TypedTerm::is_matched));
    }

    #[test]
    fn higher_specificity_beats_file_order() {
        let rules = r#"
            <ForceField>
             <HarmonicBondForce>
              <Bond type1="" type2="C_sp3" length="0.15" k="100.0"/>
              <Bond type1="C_sp3" type2="C_sp3" length="0.1529" k="224262.4"/>
              <Bond type1="" type2="H_c" length="0.109" k="284512.0"/>
             </HarmonicBondForce>
            </ForceField>
        "#;
        let ff = forcefield(rules);
        let system = stamped_system(
            &[("C1", "C", "C_sp3"), ("C2", "C", "C_sp3")],
            &[(0, 1)],
        );
        let assertions = TermAssertions {
            angles: false,
            dihedrals: false,
            ..Default::default()
        };
        let terms = resolve_bonded_terms(&system, &ff, &assertions).unwrap();
        // Specificity 2 wins over the earlier specificity-1 wildcard entry.
        assert_eq!(terms.bonds[0].def_index, Some(1));
    }

    #[test]
    fn equal_specificity_prefers_earliest_definition() {
        let rules = r#"
            <ForceField>
             <HarmonicBondForce>
              <Bond type1="C_sp3" type2="C_sp3" length="0.15" k="100.0"/>
              <Bond type1="C_sp3" type2="C_sp3" length="0.16" k="200.0"/>
             </HarmonicBondForce>
            </ForceField>
        "#;
        let ff = forcefield(rules);
        let system = stamped_system(
            &[("C1", "C", "C_sp3"), ("C2", "C", "C_sp3")],
            &[(0, 1)],
        );
        let terms =
            resolve_bonded_terms(&system, &ff, &TermAssertions::default()).unwrap();
        assert_eq!(terms.bonds[0].def_index, Some(0));
    }

    #[test]
    fn reversed_slot_order_matches() {
        let rules = r#"
            <ForceField>
             <HarmonicBondForce>
              <Bond type1="H_c" type2="C_sp3" length="0.109" k="284512.0"/>
             </HarmonicBondForce>
            </ForceField>
        "#;
        let ff = forcefield(rules);
        let system = stamped_system(
            &[("C1", "C", "C_sp3"), ("H1", "H", "H_c")],
            &[(0, 1)],
        );
        let terms =
            resolve_bonded_terms(&system, &ff, &TermAssertions::default()).unwrap();
        assert_eq!(terms.bonds[0].def_index, Some(0));
    }

    #[test]
    fn unmatched_term_is_fatal_unless_relaxed() {
        let ff = forcefield(
            r#"<ForceField>
                <HarmonicBondForce>
                 <Bond type1="C_sp3" type2="C_sp3" length="0.15" k="100.0"/>
                </HarmonicBondForce>
               </ForceField>"#,
        );
        let system = stamped_system(
            &[("C1", "C", "C_sp3"), ("H1", "H", "H_c")],
            &[(0, 1)],
        );
        let err =
            resolve_bonded_terms(&system, &ff, &TermAssertions::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingTermParameters {
                kind: TermKind::Bond,
                ..
            }
        ));

        let relaxed = TermAssertions {
            bonds: false,
            ..Default::default()
        };
        let terms = resolve_bonded_terms(&system, &ff, &relaxed).unwrap();
        assert_eq!(terms.bonds.len(), 1);
        assert!(!terms.bonds[0].is_matched());
    }

    fn benzene() -> MolecularSystem {
        let mut atoms = Vec::new();
        let mut bonds = Vec::new();
        for i in 0..6 {
            atoms.push((format!("C{}", i + 1), "C", "CA"));
            atoms.push((format!("H{}", i + 1), "H", "HA"));
            bonds.push((2 * i, 2 * i + 1));
            bonds.push((2 * i, (2 * (i + 1)) % 12));
        }
        let atom_refs: Vec<(&str, &str, &str)> = atoms
            .iter()
            .map(|(n, e, t)| (n.as_str(), *e, *t))
            .collect();
        stamped_system(&atom_refs, &bonds)
    }

    #[test]
    fn benzene_impropers_and_selected_propers() {
        // One proper definition covering H-C-C-C paths and one improper per
        // ring carbon; with relaxed dihedral assertions, exactly 12 propers
        // and 6 impropers carry parameters.
        let ff = forcefield(
            r#"<ForceField>
                <PeriodicTorsionForce>
                 <Proper type1="HA" type2="CA" type3="CA" type4="CA"
                         periodicity1="2" k1="15.167" phase1="3.141592653589793"/>
                 <Improper type1="CA" type2="" type3="" type4="HA"
                           periodicity1="2" k1="4.6024" phase1="3.141592653589793"/>
                </PeriodicTorsionForce>
               </ForceField>"#,
        );
        let system = benzene();
        let assertions = TermAssertions {
            bonds: false,
            angles: false,
            dihedrals: false,
            impropers: true,
        };
        let terms = resolve_bonded_terms(&system, &ff, &assertions).unwrap();
        assert_eq!(terms.impropers.len(), 6);
        assert!(terms.impropers.iter().all(TypedTerm::is_matched));
        let matched_propers = terms.propers.iter().filter(|t| t.is_matched()).count();
        assert_eq!(matched_propers, 12);
        assert_eq!(matched_propers + terms.impropers.len(), 18);
    }

    #[test]
    fn urey_bradley_terms_attach_to_matching_angles() {
        let ff = forcefield(
            r#"<ForceField>
                <HarmonicAngleForce>
                 <Angle type1="H_c" type2="C_sp3" type3="H_c" angle="1.88" k="276.1"/>
                 <Angle type1="H_c" type2="C_sp3" type3="O_h" angle="1.91" k="300.0"/>
                </HarmonicAngleForce>
                <UreyBradleyForce>
                 <UreyBradley type1="H_c" type2="C_sp3" type3="O_h" d="0.21" k="150.0"/>
                </UreyBradleyForce>
               </ForceField>"#,
        );
        // H-C(-H)-O fragment: three angles, one of which carries the
        // Urey-Bradley 1-3 term.
        let system = stamped_system(
            &[
                ("C1", "C", "C_sp3"),
                ("H1", "H", "H_c"),
                ("H2", "H", "H_c"),
                ("O1", "O", "O_h"),
            ],
            &[(0, 1), (0, 2), (0, 3)],
        );
        let assertions = TermAssertions {
            bonds: false,
            angles: true,
            dihedrals: false,
            impropers: false,
        };
        let terms = resolve_bonded_terms(&system, &ff, &assertions).unwrap();
        assert_eq!(terms.angles.len(), 3);
        assert_eq!(terms.urey_bradleys.len(), 2);
        assert!(terms.urey_bradleys.iter().all(TypedTerm::is_matched));
    }

    #[test]
    fn used_definitions_collects_selected_indices() {
        let ff = forcefield(ETHANE_RULES);
        let system = ethane();
        let terms = resolve_bonded_terms(&system, &ff, &TermAssertions::default()).unwrap();
        let used = terms.used_definitions();
        assert_eq!(used.harmonic_bonds.len(), 2);
        assert_eq!(used.harmonic_angles.len(), 2);
        assert_eq!(used.propers.len(), 1);
    }
}
