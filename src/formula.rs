//! Molecular formula of a depiction graph.
//!
//! [`molecular_formula`] lists carbon first, then hydrogen, then every other
//! element alphabetically. Hidden pseudo-element vertices still count.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::graph::Graph;

/// Builds the molecular formula string, e.g. `C2H6O` for ethanol.
pub fn molecular_formula(graph: &Graph) -> String {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for vertex in graph.vertices() {
        let atom = &vertex.atom;
        *counts.entry(atom.element.as_str()).or_default() += 1;
        let hc = atom.hydrogen_count() as u32;
        if hc > 0 {
            *counts.entry("H").or_default() += hc;
        }
    }

    let mut result = String::new();
    for first in ["C", "H"] {
        if let Some(count) = counts.remove(first) {
            append_element(&mut result, first, count);
        }
    }
    for (sym, count) in &counts {
        append_element(&mut result, sym, *count);
    }
    result
}

fn append_element(buf: &mut String, symbol: &str, count: u32) {
    buf.push_str(symbol);
    if count > 1 {
        write!(buf, "{count}").unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::smiles::parse_smiles;

    fn formula(s: &str) -> String {
        molecular_formula(&build(&parse_smiles(s).unwrap(), true))
    }

    #[test]
    fn simple_molecules() {
        assert_eq!(formula("C"), "CH4");
        assert_eq!(formula("CCO"), "C2H6O");
        assert_eq!(formula("O"), "H2O");
        assert_eq!(formula("c1ccccc1"), "C6H6");
        assert_eq!(formula("CC(=O)O"), "C2H4O2");
    }

    #[test]
    fn hydrogen_second_without_carbon() {
        assert_eq!(formula("N"), "H3N");
        assert_eq!(formula("OS(=O)(=O)O"), "H2O4S");
    }

    #[test]
    fn counts_of_one_have_no_digit() {
        assert_eq!(formula("ClC(Cl)(Cl)Br"), "CBrCl3");
    }

    #[test]
    fn bracket_hydrogens() {
        assert_eq!(formula("[NH4+]"), "H4N");
        assert_eq!(formula("[Na+].[Cl-]"), "ClNa");
    }

    #[test]
    fn stereo_hydrogens_counted_once() {
        assert_eq!(formula("F[C@H](Cl)Br"), "CHBrClF");
        assert_eq!(formula("N[C@@H](C)C(=O)O"), "C3H7NO2");
    }

    #[test]
    fn explicit_hydrogens() {
        assert_eq!(formula("[H]C([H])([H])[H]"), "CH4");
        assert_eq!(formula("[H][H]"), "H2");
        assert_eq!(formula("[2H]C"), "CH4");
    }
}
