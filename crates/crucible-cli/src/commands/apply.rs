use crate::cli::ApplyArgs;
use crate::error::Result;
use crucible::core::forcefield::registry::Forcefield;
use crucible::core::forcefield::writer::write_rule_file_to_path;
use crucible::core::io::structure::load_structure;
use crucible::workflows::apply::{ApplyOptions, TypedSystem, apply};
use std::collections::BTreeMap;
use tracing::info;

pub fn run(args: ApplyArgs) -> Result<()> {
    info!("Loading {} rule file(s).", args.forcefields.len());
    let forcefield = Forcefield::load(&args.forcefields)?;
    info!(
        "Loaded {} atom types and {} bonded-term definitions.",
        forcefield.atom_types().len(),
        forcefield.harmonic_bonds.len()
            + forcefield.harmonic_angles.len()
            + forcefield.propers.len()
            + forcefield.impropers.len()
            + forcefield.urey_bradleys.len()
    );

    let system = load_structure(&args.input)?;
    info!(
        "Structure loaded: {} atoms, {} bonds, {} residues.",
        system.atom_count(),
        system.bonds().len(),
        system.residue_count()
    );

    let options = ApplyOptions {
        residues: args.residues.clone(),
        use_residue_map: !args.no_residue_map,
        assert_bond_params: !args.allow_missing_bond_params,
        assert_angle_params: !args.allow_missing_angle_params,
        assert_dihedral_params: !args.allow_missing_dihedral_params,
        assert_improper_params: !args.allow_missing_improper_params,
        references_file: args.references_file.clone(),
    };
    let typed = apply(&forcefield, &system, &options)?;
    print_summary(&typed);

    if let Some(path) = &args.output_rules {
        write_rule_file_to_path(
            path,
            &forcefield,
            &typed.system,
            &typed.terms.used_definitions(),
            true,
        )?;
        info!("Used rule subset written to '{}'.", path.display());
    }

    Ok(())
}

fn print_summary(typed: &TypedSystem) {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, atom) in typed.system.atoms_iter() {
        if let Some(ff_type) = atom.force_field_type.as_deref() {
            *counts.entry(ff_type).or_default() += 1;
        }
    }
    println!("Atom types:");
    for (name, count) in &counts {
        println!("  {:<16} {:>6}", name, count);
    }

    let terms = &typed.terms;
    let unmatched = terms.bonds.iter().filter(|t| !t.is_matched()).count()
        + terms.angles.iter().filter(|t| !t.is_matched()).count()
        + terms.propers.iter().filter(|t| !t.is_matched()).count()
        + terms.impropers.iter().filter(|t| !t.is_matched()).count();
    println!("Bonded terms:");
    println!("  {:<16} {:>6}", "bonds", terms.bonds.len());
    println!("  {:<16} {:>6}", "angles", terms.angles.len());
    println!("  {:<16} {:>6}", "propers", terms.propers.len());
    println!("  {:<16} {:>6}", "impropers", terms.impropers.len());
    if !terms.urey_bradleys.is_empty() {
        println!("  {:<16} {:>6}", "urey-bradleys", terms.urey_bradleys.len());
    }
    if unmatched > 0 {
        println!("  {:<16} {:>6}", "unmatched", unmatched);
    }
}
