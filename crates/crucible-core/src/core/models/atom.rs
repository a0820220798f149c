use super::ids::ResidueId;
use nalgebra::Point3;

/// Per-type non-bonded parameters stamped onto an atom once its force field
/// type has been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NonbondedParams {
    /// Partial charge in elementary charge units.
    pub charge: f64,
    /// Lennard-Jones sigma in nanometers.
    pub sigma: f64,
    /// Lennard-Jones epsilon in kJ/mol.
    pub epsilon: f64,
}

/// An atom of a molecular structure.
///
/// An atom is created untyped; `force_field_type` and `nonbonded` are filled
/// in exactly once by the typing engine and are never mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom as given by the input structure (e.g., "C1", "H12").
    pub name: String,
    /// Element symbol (e.g., "C", "H"). Pseudo-particles carry their
    /// underscore-prefixed custom symbol (e.g., "_CH4").
    pub element: String,
    /// The ID of the residue this atom belongs to.
    pub residue_id: ResidueId,
    /// 3D coordinates in nanometers. Carried through for writers and
    /// collaborators; never consulted during typing.
    pub position: Point3<f64>,
    /// The assigned force field atom type, `None` until resolved.
    pub force_field_type: Option<String>,
    /// Non-bonded parameters of the assigned type, `None` until resolved.
    pub nonbonded: Option<NonbondedParams>,
}

impl Atom {
    /// Creates a new, untyped atom.
    ///
    /// # Arguments
    ///
    /// * `name` - The atom name from the input structure.
    /// * `element` - The element symbol.
    /// * `residue_id` - The ID of the owning residue.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, element: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            element: element.to_string(),
            residue_id,
            position,
            force_field_type: None,
            nonbonded: None,
        }
    }

    /// Returns `true` once a force field type has been assigned.
    pub fn is_typed(&self) -> bool {
        self.force_field_type.is_some()
    }
}
