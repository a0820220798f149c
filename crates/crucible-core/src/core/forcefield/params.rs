use crate::core::models::atom::NonbondedParams;
use crate::core::smarts::SmartsPattern;

/// One slot of a bonded-term type tuple. `None` is a wildcard matching any
/// assigned type; `Some(name)` matches that atom type exactly.
pub type TermSlot = Option<String>;

pub(crate) fn slot_matches(slot: &TermSlot, ff_type: &str) -> bool {
    match slot {
        Some(name) => name == ff_type,
        None => true,
    }
}

pub(crate) fn slot_specificity(slots: &[TermSlot]) -> u32 {
    slots.iter().filter(|s| s.is_some()).count() as u32
}

/// An atom-type definition from a rule file.
///
/// `pattern` is the compiled form of `def`; both are `None` for the relaxed
/// name-only definitions, which match an atom solely by its name and bypass
/// structural validation (flagged with a warning at load time).
#[derive(Debug, Clone)]
pub struct AtomTypeDef {
    pub name: String,
    pub class: Option<String>,
    /// Explicit element constraint, checked before pattern evaluation.
    pub element: Option<String>,
    /// Raw substructure expression as written in the source.
    pub def: Option<String>,
    pub pattern: Option<SmartsPattern>,
    /// Type names this definition takes precedence over, exactly as
    /// declared (no transitive closure).
    pub overrides: Vec<String>,
    pub desc: Option<String>,
    pub doi: Option<String>,
    pub mass: f64,
    pub nonbonded: NonbondedParams,
    /// Monotonically increasing definition-order index across all loaded
    /// sources; the tie-break key for equal-specificity candidates.
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicBondDef {
    pub types: [TermSlot; 2],
    /// Equilibrium length in nanometers.
    pub length: f64,
    /// Force constant in kJ/mol/nm^2.
    pub k: f64,
    pub index: usize,
}

impl HarmonicBondDef {
    pub fn specificity(&self) -> u32 {
        slot_specificity(&self.types)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicAngleDef {
    pub types: [TermSlot; 3],
    /// Equilibrium angle in radians.
    pub angle: f64,
    pub k: f64,
    pub index: usize,
}

impl HarmonicAngleDef {
    pub fn specificity(&self) -> u32 {
        slot_specificity(&self.types)
    }
}

/// One Fourier component of a periodic torsion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicComponent {
    pub periodicity: i32,
    pub k: f64,
    pub phase: f64,
}

/// Parameter set of a proper torsion. A periodic torsion may carry several
/// components; they stay together as one definition so that precedence
/// ranking is unaffected by the component count.
#[derive(Debug, Clone, PartialEq)]
pub enum TorsionParams {
    Periodic(Vec<PeriodicComponent>),
    RyckaertBellemans([f64; 6]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProperTorsionDef {
    pub types: [TermSlot; 4],
    pub params: TorsionParams,
    pub index: usize,
}

impl ProperTorsionDef {
    pub fn specificity(&self) -> u32 {
        slot_specificity(&self.types)
    }
}

/// Parameter set of an improper torsion.
#[derive(Debug, Clone, PartialEq)]
pub enum ImproperParams {
    Periodic(Vec<PeriodicComponent>),
    /// Ryckaert-Bellemans coefficients `c0..c5`.
    RyckaertBellemans([f64; 6]),
    /// CHARMM-style harmonic improper.
    Harmonic { k: f64, theta0: f64 },
}

/// An improper torsion definition. Slot 0 is the central atom; the three
/// peripheral slots match the neighbors in any permutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImproperTorsionDef {
    pub types: [TermSlot; 4],
    pub params: ImproperParams,
    pub index: usize,
}

impl ImproperTorsionDef {
    pub fn specificity(&self) -> u32 {
        slot_specificity(&self.types)
    }
}

/// A Urey-Bradley 1-3 term, keyed by the enclosing angle's type triple.
#[derive(Debug, Clone, PartialEq)]
pub struct UreyBradleyDef {
    pub types: [TermSlot; 3],
    /// Equilibrium 1-3 distance in nanometers.
    pub d: f64,
    pub k: f64,
    pub index: usize,
}

impl UreyBradleyDef {
    pub fn specificity(&self) -> u32 {
        slot_specificity(&self.types)
    }
}
