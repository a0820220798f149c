use super::params::{
    HarmonicAngleDef, HarmonicBondDef, ImproperParams, ImproperTorsionDef, PeriodicComponent,
    ProperTorsionDef, TermSlot, TorsionParams, UreyBradleyDef,
};
use crate::core::models::atom::NonbondedParams;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use thiserror::Error;

/// Errors produced while reading a single rule-file source.
#[derive(Debug, Error)]
pub enum RuleFileError {
    #[error("Malformed XML: {message}")]
    Xml { message: String },
    #[error("Element <{element}> is missing required attribute '{attr}'")]
    MissingAttribute { element: String, attr: String },
    #[error("Attribute '{attr}' of <{element}> has invalid numeric value '{value}'")]
    InvalidNumber {
        element: String,
        attr: String,
        value: String,
    },
}

/// A raw atom-type entry; patterns are compiled later by the registry.
#[derive(Debug, Clone)]
pub struct RawAtomType {
    pub name: String,
    pub class: Option<String>,
    pub element: Option<String>,
    pub def: Option<String>,
    pub overrides: Vec<String>,
    pub desc: Option<String>,
    pub doi: Option<String>,
    pub mass: f64,
}

#[derive(Debug, Clone)]
pub struct NonbondedEntry {
    pub type_name: String,
    pub params: NonbondedParams,
}

/// The parsed content of one rule-file source. Definition order within each
/// collection mirrors textual order; indices are assigned globally by the
/// registry when sources are merged.
#[derive(Debug, Clone, Default)]
pub struct RuleFile {
    pub atom_types: Vec<RawAtomType>,
    pub harmonic_bonds: Vec<HarmonicBondDef>,
    pub harmonic_angles: Vec<HarmonicAngleDef>,
    pub propers: Vec<ProperTorsionDef>,
    pub impropers: Vec<ImproperTorsionDef>,
    pub urey_bradleys: Vec<UreyBradleyDef>,
    pub nonbonded: Vec<NonbondedEntry>,
    pub coulomb14scale: Option<f64>,
    pub lj14scale: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    AtomTypes,
    BondForce,
    AngleForce,
    PeriodicTorsionForce,
    RbTorsionForce,
    ImproperForce,
    UreyBradleyForce,
    NonbondedForce,
}

/// Both the reference element names (`HarmonicBondForce`) and the short
/// aliases (`BondForce`) are accepted.
fn section_for(name: &str) -> Option<Section> {
    match name {
        "AtomTypes" => Some(Section::AtomTypes),
        "HarmonicBondForce" | "BondForce" => Some(Section::BondForce),
        "HarmonicAngleForce" | "AngleForce" => Some(Section::AngleForce),
        "PeriodicTorsionForce" => Some(Section::PeriodicTorsionForce),
        "RBTorsionForce" => Some(Section::RbTorsionForce),
        "ImproperForce" => Some(Section::ImproperForce),
        "UreyBradleyForce" => Some(Section::UreyBradleyForce),
        "NonbondedForce" => Some(Section::NonbondedForce),
        _ => None,
    }
}

impl RuleFile {
    /// Parses one rule-file source from its textual form.
    pub fn parse_str(text: &str) -> Result<Self, RuleFileError> {
        let mut reader = Reader::from_str(text);
        let mut file = RuleFile::default();
        let mut section: Option<Section> = None;

        loop {
            match reader.read_event() {
                Err(e) => {
                    return Err(RuleFileError::Xml {
                        message: e.to_string(),
                    });
                }
                Ok(Event::Eof) => break,
                Ok(Event::Start(e)) => {
                    let name = element_name(&e);
                    if let Some(s) = section_for(&name) {
                        section = Some(s);
                        if s == Section::NonbondedForce {
                            let attrs = attr_map(&e)?;
                            file.coulomb14scale = parse_f64_opt(&attrs, &name, "coulomb14scale")?;
                            file.lj14scale = parse_f64_opt(&attrs, &name, "lj14scale")?;
                        }
                    } else {
                        file.handle_entry(section, &name, &e)?;
                    }
                }
                Ok(Event::Empty(e)) => {
                    let name = element_name(&e);
                    if section_for(&name).is_none() {
                        file.handle_entry(section, &name, &e)?;
                    }
                }
                Ok(Event::End(e)) => {
                    let name = element_name_end(e.name().as_ref());
                    if let Some(s) = section_for(&name) {
                        if section == Some(s) {
                            section = None;
                        }
                    }
                }
                Ok(_) => {}
            }
        }

        Ok(file)
    }

    fn handle_entry(
        &mut self,
        section: Option<Section>,
        name: &str,
        e: &BytesStart,
    ) -> Result<(), RuleFileError> {
        let Some(section) = section else {
            return Ok(());
        };
        match (section, name) {
            (Section::AtomTypes, "Type") => {
                let attrs = attr_map(e)?;
                self.atom_types.push(RawAtomType {
                    name: req(&attrs, name, "name")?,
                    class: opt(&attrs, "class"),
                    element: opt(&attrs, "element"),
                    def: opt(&attrs, "def"),
                    overrides: split_overrides(attrs.get("overrides").map(String::as_str)),
                    desc: opt(&attrs, "desc"),
                    doi: opt(&attrs, "doi"),
                    mass: parse_f64(&attrs, name, "mass")?,
                });
            }
            (Section::BondForce, "Bond") => {
                let attrs = attr_map(e)?;
                self.harmonic_bonds.push(HarmonicBondDef {
                    types: [slot(&attrs, "type1"), slot(&attrs, "type2")],
                    length: parse_f64(&attrs, name, "length")?,
                    k: parse_f64(&attrs, name, "k")?,
                    index: self.harmonic_bonds.len(),
                });
            }
            (Section::AngleForce, "Angle") => {
                let attrs = attr_map(e)?;
                self.harmonic_angles.push(HarmonicAngleDef {
                    types: [
                        slot(&attrs, "type1"),
                        slot(&attrs, "type2"),
                        slot(&attrs, "type3"),
                    ],
                    angle: parse_f64(&attrs, name, "angle")?,
                    k: parse_f64(&attrs, name, "k")?,
                    index: self.harmonic_angles.len(),
                });
            }
            (Section::PeriodicTorsionForce, "Proper") => {
                let attrs = attr_map(e)?;
                self.propers.push(ProperTorsionDef {
                    types: torsion_slots(&attrs),
                    params: TorsionParams::Periodic(periodic_components(&attrs, name)?),
                    index: self.propers.len(),
                });
            }
            (Section::PeriodicTorsionForce, "Improper") => {
                let attrs = attr_map(e)?;
                self.impropers.push(ImproperTorsionDef {
                    types: torsion_slots(&attrs),
                    params: ImproperParams::Periodic(periodic_components(&attrs, name)?),
                    index: self.impropers.len(),
                });
            }
            (Section::RbTorsionForce, "Proper") => {
                let attrs = attr_map(e)?;
                self.propers.push(ProperTorsionDef {
                    types: torsion_slots(&attrs),
                    params: TorsionParams::RyckaertBellemans(rb_coefficients(&attrs, name)?),
                    index: self.propers.len(),
                });
            }
            (Section::RbTorsionForce, "Improper") => {
                let attrs = attr_map(e)?;
                self.impropers.push(ImproperTorsionDef {
                    types: torsion_slots(&attrs),
                    params: ImproperParams::RyckaertBellemans(rb_coefficients(&attrs, name)?),
                    index: self.impropers.len(),
                });
            }
            (Section::ImproperForce, "Improper") => {
                let attrs = attr_map(e)?;
                self.impropers.push(ImproperTorsionDef {
                    types: torsion_slots(&attrs),
                    params: ImproperParams::Harmonic {
                        k: parse_f64(&attrs, name, "k")?,
                        theta0: parse_f64(&attrs, name, "theta0")?,
                    },
                    index: self.impropers.len(),
                });
            }
            (Section::UreyBradleyForce, "UreyBradley") => {
                let attrs = attr_map(e)?;
                self.urey_bradleys.push(UreyBradleyDef {
                    types: [
                        slot(&attrs, "type1"),
                        slot(&attrs, "type2"),
                        slot(&attrs, "type3"),
                    ],
                    d: parse_f64(&attrs, name, "d")?,
                    k: parse_f64(&attrs, name, "k")?,
                    index: self.urey_bradleys.len(),
                });
            }
            (Section::NonbondedForce, "Atom") => {
                let attrs = attr_map(e)?;
                self.nonbonded.push(NonbondedEntry {
                    type_name: req(&attrs, name, "type")?,
                    params: NonbondedParams {
                        charge: parse_f64(&attrs, name, "charge")?,
                        sigma: parse_f64(&attrs, name, "sigma")?,
                        epsilon: parse_f64(&attrs, name, "epsilon")?,
                    },
                });
            }
            // A recognized section never silently swallows an entry.
            _ => {
                tracing::warn!(
                    element = %name,
                    section = ?section,
                    "Unrecognized entry inside a rule-file section; ignoring"
                );
            }
        }
        Ok(())
    }
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn element_name_end(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn attr_map(e: &BytesStart) -> Result<HashMap<String, String>, RuleFileError> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| RuleFileError::Xml {
            message: err.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| RuleFileError::Xml {
                message: err.to_string(),
            })?
            .into_owned();
        map.insert(key, value);
    }
    Ok(map)
}

fn req(
    attrs: &HashMap<String, String>,
    element: &str,
    key: &str,
) -> Result<String, RuleFileError> {
    attrs
        .get(key)
        .cloned()
        .ok_or_else(|| RuleFileError::MissingAttribute {
            element: element.to_string(),
            attr: key.to_string(),
        })
}

/// Optional attribute; an empty value counts as absent.
fn opt(attrs: &HashMap<String, String>, key: &str) -> Option<String> {
    attrs.get(key).filter(|v| !v.is_empty()).cloned()
}

/// A type slot: missing or empty means wildcard.
fn slot(attrs: &HashMap<String, String>, key: &str) -> TermSlot {
    opt(attrs, key)
}

fn torsion_slots(attrs: &HashMap<String, String>) -> [TermSlot; 4] {
    [
        slot(attrs, "type1"),
        slot(attrs, "type2"),
        slot(attrs, "type3"),
        slot(attrs, "type4"),
    ]
}

fn parse_f64(
    attrs: &HashMap<String, String>,
    element: &str,
    key: &str,
) -> Result<f64, RuleFileError> {
    let raw = req(attrs, element, key)?;
    raw.parse().map_err(|_| RuleFileError::InvalidNumber {
        element: element.to_string(),
        attr: key.to_string(),
        value: raw,
    })
}

fn rb_coefficients(
    attrs: &HashMap<String, String>,
    element: &str,
) -> Result<[f64; 6], RuleFileError> {
    let mut c = [0.0; 6];
    for (i, coeff) in c.iter_mut().enumerate() {
        *coeff = parse_f64(attrs, element, &format!("c{}", i))?;
    }
    Ok(c)
}

fn parse_f64_opt(
    attrs: &HashMap<String, String>,
    element: &str,
    key: &str,
) -> Result<Option<f64>, RuleFileError> {
    match attrs.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| RuleFileError::InvalidNumber {
                element: element.to_string(),
                attr: key.to_string(),
                value: raw.clone(),
            }),
    }
}

/// Indexed `periodicity1`/`k1`/`phase1`, `periodicity2`/..., gathered in
/// component order until the next index is absent.
fn periodic_components(
    attrs: &HashMap<String, String>,
    element: &str,
) -> Result<Vec<PeriodicComponent>, RuleFileError> {
    let mut components = Vec::new();
    for n in 1.. {
        let key = format!("periodicity{}", n);
        if !attrs.contains_key(&key) {
            break;
        }
        let periodicity_raw = req(attrs, element, &key)?;
        let periodicity =
            periodicity_raw
                .parse::<i32>()
                .map_err(|_| RuleFileError::InvalidNumber {
                    element: element.to_string(),
                    attr: key.clone(),
                    value: periodicity_raw.clone(),
                })?;
        components.push(PeriodicComponent {
            periodicity,
            k: parse_f64(attrs, element, &format!("k{}", n))?,
            phase: parse_f64(attrs, element, &format!("phase{}", n))?,
        });
    }
    Ok(components)
}

/// Override lists may be separated by commas, whitespace, or both.
fn split_overrides(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        <ForceField>
         <AtomTypes>
          <Type name="opls_135" class="CT" element="C" mass="12.011"
                def="[C;X4](C)(H)(H)H" desc="alkane CH3" doi="10.1021/ja9621760"/>
          <Type name="opls_140" class="HC" element="H" mass="1.008" def="H[C;X4]"/>
         </AtomTypes>
         <HarmonicBondForce>
          <Bond type1="opls_135" type2="opls_140" length="0.109" k="284512.0"/>
          <Bond type1="" type2="opls_135" length="0.1529" k="224262.4"/>
         </HarmonicBondForce>
         <PeriodicTorsionForce>
          <Proper type1="opls_140" type2="opls_135" type3="opls_135" type4="opls_140"
                  periodicity1="3" k1="0.6276" phase1="0.0"
                  periodicity2="2" k2="0.1" phase2="3.141592653589793"/>
         </PeriodicTorsionForce>
         <NonbondedForce coulomb14scale="0.5" lj14scale="0.5">
          <Atom type="opls_135" charge="-0.18" sigma="0.35" epsilon="0.276144"/>
          <Atom type="opls_140" charge="0.06" sigma="0.25" epsilon="0.12552"/>
         </NonbondedForce>
        </ForceField>
    "#;

    #[test]
    fn parses_atom_types_with_attributes() {
        let file = RuleFile::parse_str(MINIMAL).unwrap();
        assert_eq!(file.atom_types.len(), 2);
        let ct = &file.atom_types[0];
        assert_eq!(ct.name, "opls_135");
        assert_eq!(ct.class.as_deref(), Some("CT"));
        assert_eq!(ct.element.as_deref(), Some("C"));
        assert_eq!(ct.def.as_deref(), Some("[C;X4](C)(H)(H)H"));
        assert_eq!(ct.doi.as_deref(), Some("10.1021/ja9621760"));
        assert_eq!(ct.mass, 12.011);
        assert!(file.atom_types[1].doi.is_none());
    }

    #[test]
    fn empty_type_slot_is_wildcard() {
        let file = RuleFile::parse_str(MINIMAL).unwrap();
        assert_eq!(file.harmonic_bonds.len(), 2);
        assert_eq!(file.harmonic_bonds[1].types[0], None);
        assert_eq!(
            file.harmonic_bonds[1].types[1].as_deref(),
            Some("opls_135")
        );
        assert_eq!(file.harmonic_bonds[1].index, 1);
    }

    #[test]
    fn gathers_indexed_periodicity_components() {
        let file = RuleFile::parse_str(MINIMAL).unwrap();
        assert_eq!(file.propers.len(), 1);
        match &file.propers[0].params {
            TorsionParams::Periodic(components) => {
                assert_eq!(components.len(), 2);
                assert_eq!(components[0].periodicity, 3);
                assert_eq!(components[1].k, 0.1);
            }
            other => panic!("expected periodic params, got {:?}", other),
        }
    }

    #[test]
    fn parses_nonbonded_entries_and_scales() {
        let file = RuleFile::parse_str(MINIMAL).unwrap();
        assert_eq!(file.coulomb14scale, Some(0.5));
        assert_eq!(file.nonbonded.len(), 2);
        assert_eq!(file.nonbonded[0].type_name, "opls_135");
        assert_eq!(file.nonbonded[0].params.charge, -0.18);
    }

    #[test]
    fn accepts_short_section_aliases() {
        let text = r#"
            <ForceField>
             <BondForce>
              <Bond type1="A" type2="B" length="0.1" k="1000.0"/>
             </BondForce>
             <AngleForce>
              <Angle type1="A" type2="B" type3="A" angle="1.9" k="300.0"/>
             </AngleForce>
            </ForceField>
        "#;
        let file = RuleFile::parse_str(text).unwrap();
        assert_eq!(file.harmonic_bonds.len(), 1);
        assert_eq!(file.harmonic_angles.len(), 1);
    }

    #[test]
    fn parses_urey_bradley_and_harmonic_impropers() {
        let text = r#"
            <ForceField>
             <ImproperForce>
              <Improper type1="CL" type2="" type3="" type4="" k="300.0" theta0="0.0"/>
             </ImproperForce>
             <UreyBradleyForce>
              <UreyBradley type1="CTL2" type2="CL" type3="OBL" d="0.25" k="200.0"/>
             </UreyBradleyForce>
            </ForceField>
        "#;
        let file = RuleFile::parse_str(text).unwrap();
        assert_eq!(file.impropers.len(), 1);
        assert!(matches!(
            file.impropers[0].params,
            ImproperParams::Harmonic { k, theta0 } if k == 300.0 && theta0 == 0.0
        ));
        assert_eq!(file.urey_bradleys.len(), 1);
        assert_eq!(file.urey_bradleys[0].d, 0.25);
    }

    #[test]
    fn missing_required_attribute_is_an_error() {
        let text = r#"
            <ForceField>
             <AtomTypes>
              <Type name="broken" element="C"/>
             </AtomTypes>
            </ForceField>
        "#;
        let err = RuleFile::parse_str(text).unwrap_err();
        assert!(matches!(
            err,
            RuleFileError::MissingAttribute { ref attr, .. } if attr == "mass"
        ));
    }

    #[test]
    fn invalid_number_is_an_error() {
        let text = r#"
            <ForceField>
             <BondForce>
              <Bond type1="A" type2="B" length="abc" k="1.0"/>
             </BondForce>
            </ForceField>
        "#;
        let err = RuleFile::parse_str(text).unwrap_err();
        assert!(matches!(err, RuleFileError::InvalidNumber { .. }));
    }

    #[test]
    fn overrides_split_on_commas_and_whitespace() {
        assert_eq!(
            split_overrides(Some("a,b c ,d")),
            vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()]
        );
        assert!(split_overrides(None).is_empty());
        assert!(split_overrides(Some("")).is_empty());
    }

    #[test]
    fn rb_impropers_are_parsed_with_coefficients() {
        let text = r#"
            <ForceField>
             <RBTorsionForce>
              <Improper type1="A" type2="B" type3="B" type4="B"
                        c0="1.0" c1="2.0" c2="3.0" c3="4.0" c4="5.0" c5="6.0"/>
             </RBTorsionForce>
            </ForceField>
        "#;
        let file = RuleFile::parse_str(text).unwrap();
        assert_eq!(file.impropers.len(), 1);
        assert_eq!(file.impropers[0].types[0].as_deref(), Some("A"));
        assert!(matches!(
            file.impropers[0].params,
            ImproperParams::RyckaertBellemans(c) if c[0] == 1.0 && c[5] == 6.0
        ));
    }

    #[test]
    fn rb_torsions_land_in_the_proper_list() {
        let text = r#"
            <ForceField>
             <RBTorsionForce>
              <Proper type1="A" type2="B" type3="B" type4="A"
                      c0="0.1" c1="0.2" c2="0.3" c3="0.4" c4="0.5" c5="0.6"/>
             </RBTorsionForce>
            </ForceField>
        "#;
        let file = RuleFile::parse_str(text).unwrap();
        assert_eq!(file.propers.len(), 1);
        assert!(matches!(
            file.propers[0].params,
            TorsionParams::RyckaertBellemans(c) if c[0] == 0.1 && c[5] == 0.6
        ));
    }
}
