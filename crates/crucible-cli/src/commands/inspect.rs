use crate::cli::InspectArgs;
use crate::error::Result;
use crucible::core::forcefield::registry::Forcefield;
use tracing::info;

pub fn run(args: InspectArgs) -> Result<()> {
    info!("Loading {} rule file(s).", args.forcefields.len());
    let forcefield = Forcefield::load(&args.forcefields)?;

    println!("Atom types:        {}", forcefield.atom_types().len());
    println!("Harmonic bonds:    {}", forcefield.harmonic_bonds.len());
    println!("Harmonic angles:   {}", forcefield.harmonic_angles.len());
    println!("Proper torsions:   {}", forcefield.propers.len());
    println!("Improper torsions: {}", forcefield.impropers.len());
    if forcefield.has_urey_bradley() {
        println!("Urey-Bradleys:     {}", forcefield.urey_bradleys.len());
    }
    if let Some(scale) = forcefield.coulomb14scale {
        println!("coulomb14scale:    {}", scale);
    }
    if let Some(scale) = forcefield.lj14scale {
        println!("lj14scale:         {}", scale);
    }

    let patternless: Vec<&str> = forcefield
        .atom_types()
        .iter()
        .filter(|def| def.pattern.is_none())
        .map(|def| def.name.as_str())
        .collect();
    if !patternless.is_empty() {
        println!(
            "Types without a def pattern ({}): {}",
            patternless.len(),
            patternless.join(", ")
        );
    }

    Ok(())
}
