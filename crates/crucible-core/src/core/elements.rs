//! Compile-time element table.
//!
//! Symbols map to atomic number and standard atomic weight. Pseudo-particles
//! (underscore-prefixed symbols used by united-atom force fields) are not
//! listed here; callers treat them as opaque custom elements.

/// Static data for one chemical element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    pub atomic_number: u8,
    /// Standard atomic weight in g/mol.
    pub mass: f64,
}

static ELEMENTS: phf::Map<&'static str, ElementData> = phf::phf_map! {
    "H" => ElementData { atomic_number: 1, mass: 1.008 },
    "He" => ElementData { atomic_number: 2, mass: 4.0026 },
    "Li" => ElementData { atomic_number: 3, mass: 6.94 },
    "B" => ElementData { atomic_number: 5, mass: 10.81 },
    "C" => ElementData { atomic_number: 6, mass: 12.011 },
    "N" => ElementData { atomic_number: 7, mass: 14.007 },
    "O" => ElementData { atomic_number: 8, mass: 15.999 },
    "F" => ElementData { atomic_number: 9, mass: 18.998 },
    "Ne" => ElementData { atomic_number: 10, mass: 20.180 },
    "Na" => ElementData { atomic_number: 11, mass: 22.990 },
    "Mg" => ElementData { atomic_number: 12, mass: 24.305 },
    "Al" => ElementData { atomic_number: 13, mass: 26.982 },
    "Si" => ElementData { atomic_number: 14, mass: 28.085 },
    "P" => ElementData { atomic_number: 15, mass: 30.974 },
    "S" => ElementData { atomic_number: 16, mass: 32.06 },
    "Cl" => ElementData { atomic_number: 17, mass: 35.45 },
    "Ar" => ElementData { atomic_number: 18, mass: 39.948 },
    "K" => ElementData { atomic_number: 19, mass: 39.098 },
    "Ca" => ElementData { atomic_number: 20, mass: 40.078 },
    "Ti" => ElementData { atomic_number: 22, mass: 47.867 },
    "Fe" => ElementData { atomic_number: 26, mass: 55.845 },
    "Ni" => ElementData { atomic_number: 28, mass: 58.693 },
    "Cu" => ElementData { atomic_number: 29, mass: 63.546 },
    "Zn" => ElementData { atomic_number: 30, mass: 65.38 },
    "Br" => ElementData { atomic_number: 35, mass: 79.904 },
    "I" => ElementData { atomic_number: 53, mass: 126.90 },
};

/// Looks up static data for an element symbol.
pub fn element_data(symbol: &str) -> Option<&'static ElementData> {
    ELEMENTS.get(symbol)
}

/// Atomic number for an element symbol, if known.
pub fn atomic_number(symbol: &str) -> Option<u8> {
    ELEMENTS.get(symbol).map(|e| e.atomic_number)
}

/// `true` for underscore-prefixed united-atom / pseudo-particle symbols.
pub fn is_custom_element(symbol: &str) -> bool {
    symbol.starts_with('_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_elements_resolve() {
        assert_eq!(atomic_number("C"), Some(6));
        assert_eq!(atomic_number("Cl"), Some(17));
        assert_eq!(element_data("H").unwrap().mass, 1.008);
    }

    #[test]
    fn unknown_symbols_return_none() {
        assert!(element_data("Xx").is_none());
        assert!(atomic_number("c").is_none());
    }

    #[test]
    fn custom_elements_are_recognized() {
        assert!(is_custom_element("_CH4"));
        assert!(!is_custom_element("C"));
    }
}
