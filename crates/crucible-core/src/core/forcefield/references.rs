use super::registry::Forcefield;
use crate::core::models::system::MolecularSystem;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReferencesError {
    #[error("Failed to write references file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders a BibTeX bibliography for the atom types assigned in `system`,
/// grouped by DOI. Types without a DOI, and malformed DOIs, are skipped with
/// a warning rather than aborting the write.
pub fn render_references(forcefield: &Forcefield, system: &MolecularSystem) -> String {
    let used_names: BTreeSet<&str> = system
        .atoms_iter()
        .filter_map(|(_, atom)| atom.force_field_type.as_deref())
        .collect();

    let mut by_doi: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for name in used_names {
        let Some(def) = forcefield.type_by_name(name) else {
            continue;
        };
        let Some(doi) = def.doi.as_deref() else {
            tracing::warn!(type_name = %def.name, "Atom type has no citation; skipping");
            continue;
        };
        if !doi.starts_with("10.") {
            tracing::warn!(
                type_name = %def.name,
                %doi,
                "Citation is not a valid DOI; skipping"
            );
            continue;
        }
        by_doi.entry(doi).or_default().insert(name);
    }

    let mut out = String::new();
    for (doi, names) in &by_doi {
        let key: String = doi
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let names: Vec<&str> = names.iter().copied().collect();
        out.push_str(&format!(
            "@misc{{{key},\n  doi = {{{doi}}},\n  url = {{https://doi.org/{doi}}},\n  note = {{Parameters for atom types: {}}}\n}}\n\n",
            names.join(", ")
        ));
    }
    out
}

pub fn write_references(
    path: &Path,
    forcefield: &Forcefield,
    system: &MolecularSystem,
) -> Result<(), ReferencesError> {
    let text = render_references(forcefield, system);
    std::fs::write(path, text).map_err(|source| ReferencesError::Io {
        path: path.to_path_buf(),
        source,
    })
}
