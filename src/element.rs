//! Element symbol table.
//!
//! Atoms carry their element as a symbol string; this module answers the
//! few questions the pipeline asks about a symbol: is it an element, what
//! is its atomic number, and how many bonds does it make when written
//! without brackets.

static SYMBOLS: [&str; 118] = [
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne",
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca",
    "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn",
    "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr",
    "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn",
    "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd",
    "Pm", "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb",
    "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th",
    "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk", "Cf", "Es", "Fm",
    "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds",
    "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Returns `true` if `symbol` is a known element symbol (case-sensitive).
pub fn is_element(symbol: &str) -> bool {
    SYMBOLS.contains(&symbol)
}

/// Atomic number for `symbol`, or `0` for unknown symbols and pseudo atoms.
pub fn atomic_number(symbol: &str) -> u8 {
    SYMBOLS
        .iter()
        .position(|s| *s == symbol)
        .map_or(0, |i| (i + 1) as u8)
}

/// Number of bonds an unbracketed atom of this element makes; the remainder
/// after explicit bonds is filled with implicit hydrogens.
///
/// Elements outside the table never receive implicit hydrogens.
pub fn max_bonds(symbol: &str) -> Option<u8> {
    match symbol {
        "H" | "F" | "Cl" | "Br" | "I" => Some(1),
        "O" | "S" | "Se" => Some(2),
        "B" | "N" | "P" | "As" => Some(3),
        "C" | "Si" | "Ge" => Some(4),
        _ => None,
    }
}

/// Elements that may be written without brackets.
pub fn is_organic_subset(symbol: &str) -> bool {
    matches!(
        symbol,
        "B" | "C" | "N" | "O" | "P" | "S" | "F" | "Cl" | "Br" | "I"
    )
}

/// Elements that may be written in lower case to mark aromaticity.
pub fn can_be_aromatic(symbol: &str) -> bool {
    matches!(symbol, "B" | "C" | "N" | "O" | "P" | "S" | "Se" | "As" | "Te")
}
