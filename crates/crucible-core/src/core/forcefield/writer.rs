use super::params::{ImproperParams, TermSlot, TorsionParams};
use super::registry::Forcefield;
use crate::core::models::system::MolecularSystem;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to write rule file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The definition indices selected while resolving bonded terms of one
/// structure. Collected by the term resolver and consumed here to restrict
/// output to what the structure actually exercised.
#[derive(Debug, Clone, Default)]
pub struct UsedDefinitions {
    pub harmonic_bonds: BTreeSet<usize>,
    pub harmonic_angles: BTreeSet<usize>,
    pub propers: BTreeSet<usize>,
    pub impropers: BTreeSet<usize>,
    pub urey_bradleys: BTreeSet<usize>,
}

/// Emits a rule file covering the given structure.
///
/// With `used_definitions_only` set, only the atom types assigned to atoms of
/// `system` and the bonded-term definitions recorded in `used` are written;
/// override lists are then filtered to the emitted set, with the original
/// list preserved as a comment when the filter changed it. Reloading the
/// output and re-typing the same structure reproduces the original
/// assignment.
pub fn write_rule_file(
    forcefield: &Forcefield,
    system: &MolecularSystem,
    used: &UsedDefinitions,
    used_definitions_only: bool,
) -> String {
    let type_indices: BTreeSet<usize> = if used_definitions_only {
        system
            .atoms_iter()
            .filter_map(|(_, atom)| atom.force_field_type.as_deref())
            .filter_map(|name| forcefield.type_by_name(name))
            .map(|def| def.index)
            .collect()
    } else {
        (0..forcefield.atom_types().len()).collect()
    };
    let emitted_names: BTreeSet<&str> = type_indices
        .iter()
        .map(|&i| forcefield.atom_types()[i].name.as_str())
        .collect();

    let mut out = String::new();
    out.push_str("<ForceField>\n");

    out.push_str(" <AtomTypes>\n");
    for &i in &type_indices {
        let def = &forcefield.atom_types()[i];
        let mut line = format!("  <Type name=\"{}\"", escape_attr(&def.name));
        if let Some(class) = &def.class {
            line.push_str(&format!(" class=\"{}\"", escape_attr(class)));
        }
        if let Some(element) = &def.element {
            line.push_str(&format!(" element=\"{}\"", escape_attr(element)));
        }
        line.push_str(&format!(" mass=\"{}\"", def.mass));
        if let Some(pattern) = &def.def {
            line.push_str(&format!(" def=\"{}\"", escape_attr(pattern)));
        }
        let filtered: Vec<&str> = def
            .overrides
            .iter()
            .map(String::as_str)
            .filter(|name| emitted_names.contains(name))
            .collect();
        if !filtered.is_empty() {
            line.push_str(&format!(" overrides=\"{}\"", escape_attr(&filtered.join(","))));
        }
        if let Some(desc) = &def.desc {
            line.push_str(&format!(" desc=\"{}\"", escape_attr(desc)));
        }
        if let Some(doi) = &def.doi {
            line.push_str(&format!(" doi=\"{}\"", escape_attr(doi)));
        }
        // When filtering changed the override list, the original is kept as
        // a comment child of the element for provenance.
        if filtered.len() != def.overrides.len() {
            line.push_str(&format!(
                ">\n   <!--Note: original overrides=\"{}\"-->\n  </Type>\n",
                escape_attr(&def.overrides.join(","))
            ));
        } else {
            line.push_str("/>\n");
        }
        out.push_str(&line);
    }
    out.push_str(" </AtomTypes>\n");

    let bond_lines: Vec<String> = forcefield
        .harmonic_bonds
        .iter()
        .filter(|def| !used_definitions_only || used.harmonic_bonds.contains(&def.index))
        .map(|def| {
            format!(
                "  <Bond {} length=\"{}\" k=\"{}\"/>\n",
                slot_attrs(&def.types),
                def.length,
                def.k
            )
        })
        .collect();
    push_section(&mut out, "HarmonicBondForce", &bond_lines);

    let angle_lines: Vec<String> = forcefield
        .harmonic_angles
        .iter()
        .filter(|def| !used_definitions_only || used.harmonic_angles.contains(&def.index))
        .map(|def| {
            format!(
                "  <Angle {} angle=\"{}\" k=\"{}\"/>\n",
                slot_attrs(&def.types),
                def.angle,
                def.k
            )
        })
        .collect();
    push_section(&mut out, "HarmonicAngleForce", &angle_lines);

    let mut periodic_lines = Vec::new();
    let mut rb_lines = Vec::new();
    for def in forcefield
        .propers
        .iter()
        .filter(|def| !used_definitions_only || used.propers.contains(&def.index))
    {
        match &def.params {
            TorsionParams::Periodic(components) => {
                let mut line = format!("  <Proper {}", slot_attrs(&def.types));
                for (n, c) in components.iter().enumerate() {
                    line.push_str(&format!(
                        " periodicity{n}=\"{}\" k{n}=\"{}\" phase{n}=\"{}\"",
                        c.periodicity,
                        c.k,
                        c.phase,
                        n = n + 1
                    ));
                }
                line.push_str("/>\n");
                periodic_lines.push(line);
            }
            TorsionParams::RyckaertBellemans(c) => {
                rb_lines.push(format!(
                    "  <Proper {} c0=\"{}\" c1=\"{}\" c2=\"{}\" c3=\"{}\" c4=\"{}\" c5=\"{}\"/>\n",
                    slot_attrs(&def.types),
                    c[0],
                    c[1],
                    c[2],
                    c[3],
                    c[4],
                    c[5]
                ));
            }
        }
    }
    let mut harmonic_improper_lines = Vec::new();
    for def in forcefield
        .impropers
        .iter()
        .filter(|def| !used_definitions_only || used.impropers.contains(&def.index))
    {
        match &def.params {
            ImproperParams::Periodic(components) => {
                let mut line = format!("  <Improper {}", slot_attrs(&def.types));
                for (n, c) in components.iter().enumerate() {
                    line.push_str(&format!(
                        " periodicity{n}=\"{}\" k{n}=\"{}\" phase{n}=\"{}\"",
                        c.periodicity,
                        c.k,
                        c.phase,
                        n = n + 1
                    ));
                }
                line.push_str("/>\n");
                periodic_lines.push(line);
            }
            ImproperParams::RyckaertBellemans(c) => {
                rb_lines.push(format!(
                    "  <Improper {} c0=\"{}\" c1=\"{}\" c2=\"{}\" c3=\"{}\" c4=\"{}\" c5=\"{}\"/>\n",
                    slot_attrs(&def.types),
                    c[0],
                    c[1],
                    c[2],
                    c[3],
                    c[4],
                    c[5]
                ));
            }
            ImproperParams::Harmonic { k, theta0 } => {
                harmonic_improper_lines.push(format!(
                    "  <Improper {} k=\"{}\" theta0=\"{}\"/>\n",
                    slot_attrs(&def.types),
                    k,
                    theta0
                ));
            }
        }
    }
    push_section(&mut out, "PeriodicTorsionForce", &periodic_lines);
    push_section(&mut out, "RBTorsionForce", &rb_lines);
    push_section(&mut out, "ImproperForce", &harmonic_improper_lines);

    let ub_lines: Vec<String> = forcefield
        .urey_bradleys
        .iter()
        .filter(|def| !used_definitions_only || used.urey_bradleys.contains(&def.index))
        .map(|def| {
            format!(
                "  <UreyBradley {} d=\"{}\" k=\"{}\"/>\n",
                slot_attrs(&def.types),
                def.d,
                def.k
            )
        })
        .collect();
    push_section(&mut out, "UreyBradleyForce", &ub_lines);

    if !type_indices.is_empty() {
        let mut header = String::from(" <NonbondedForce");
        if let Some(scale) = forcefield.coulomb14scale {
            header.push_str(&format!(" coulomb14scale=\"{}\"", scale));
        }
        if let Some(scale) = forcefield.lj14scale {
            header.push_str(&format!(" lj14scale=\"{}\"", scale));
        }
        header.push_str(">\n");
        out.push_str(&header);
        for &i in &type_indices {
            let def = &forcefield.atom_types()[i];
            out.push_str(&format!(
                "  <Atom type=\"{}\" charge=\"{}\" sigma=\"{}\" epsilon=\"{}\"/>\n",
                escape_attr(&def.name),
                def.nonbonded.charge,
                def.nonbonded.sigma,
                def.nonbonded.epsilon
            ));
        }
        out.push_str(" </NonbondedForce>\n");
    }

    out.push_str("</ForceField>\n");
    out
}

/// Writes the rule file to disk. See [`write_rule_file`].
pub fn write_rule_file_to_path(
    path: &Path,
    forcefield: &Forcefield,
    system: &MolecularSystem,
    used: &UsedDefinitions,
    used_definitions_only: bool,
) -> Result<(), WriteError> {
    let text = write_rule_file(forcefield, system, used, used_definitions_only);
    std::fs::write(path, text).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn push_section(out: &mut String, name: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    out.push_str(&format!(" <{}>\n", name));
    for line in lines {
        out.push_str(line);
    }
    out.push_str(&format!(" </{}>\n", name));
}

/// Wildcard slots are written as empty attributes so reload treats them the
/// same way.
fn slot_attrs(slots: &[TermSlot]) -> String {
    slots
        .iter()
        .enumerate()
        .map(|(i, slot)| {
            format!(
                "type{}=\"{}\"",
                i + 1,
                escape_attr(slot.as_deref().unwrap_or(""))
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
