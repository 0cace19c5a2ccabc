use std::collections::BTreeMap;

use serde::Serialize;

use crate::bond::BondSymbol;
use crate::element;

/// Tetrahedral chirality tag as parsed.
///
/// Looking from the first neighbour (in parse order) towards the centre,
/// the remaining neighbours run counter-clockwise for [`Chirality::Ccw`]
/// (`@`) and clockwise for [`Chirality::Cw`] (`@@`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Chirality {
    #[default]
    None,
    /// Counterclockwise (`@`).
    Ccw,
    /// Clockwise (`@@`).
    Cw,
}

/// A terminal group folded into its carrier atom's label, e.g. the three
/// fluorines of CF3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PseudoElement {
    pub element: String,
    pub previous_element: Option<String>,
    pub count: u32,
    pub hydrogen_count: u8,
    pub charge: i8,
}

/// Atom payload of a [`Vertex`](crate::graph::Vertex).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Atom {
    /// Element symbol with a capitalized first letter.
    pub element: String,
    /// Written in lower case.
    pub is_aromatic: bool,
    pub is_bracket: bool,
    pub charge: i8,
    /// Mass number. `0` means natural abundance.
    pub isotope: u16,
    pub chirality: Chirality,
    /// `H` count written inside the brackets.
    pub bracket_hydrogens: u8,
    /// `[H]` atoms written as neighbours and suppressed by the builder.
    pub explicit_hydrogens: u8,
    pub atom_class: u16,
    /// Bond symbol leading into this atom when it opens a branch.
    pub branch_bond: Option<BondSymbol>,
    /// Ring-closure labels this atom takes part in, in the order written.
    pub ring_closures: Vec<u16>,
    /// Ids of the perceived rings containing this atom.
    pub rings: Vec<usize>,
    /// Sum of the weights of all incident edges.
    pub bond_count: u8,
    pub is_stereo_center: bool,
    /// `false` once folded into a neighbour as a pseudo-element.
    pub is_drawn: bool,
    /// Keyed by hydrogen count, element and charge.
    pub pseudo_elements: BTreeMap<String, PseudoElement>,
}

impl Atom {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            is_aromatic: false,
            is_bracket: false,
            charge: 0,
            isotope: 0,
            chirality: Chirality::None,
            bracket_hydrogens: 0,
            explicit_hydrogens: 0,
            atom_class: 0,
            branch_bond: None,
            ring_closures: Vec::new(),
            rings: Vec::new(),
            bond_count: 0,
            is_stereo_center: false,
            is_drawn: true,
            pseudo_elements: BTreeMap::new(),
        }
    }

    pub fn is_in_ring(&self) -> bool {
        !self.rings.is_empty()
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element == "H"
    }

    pub fn has_pseudo_elements(&self) -> bool {
        !self.pseudo_elements.is_empty()
    }

    pub fn attach_pseudo_element(
        &mut self,
        element: &str,
        previous_element: Option<&str>,
        hydrogen_count: u8,
        charge: i8,
    ) {
        let key = format!("{hydrogen_count}{element}{charge}");
        self.pseudo_elements
            .entry(key)
            .and_modify(|p| p.count += 1)
            .or_insert_with(|| PseudoElement {
                element: element.to_string(),
                previous_element: previous_element.map(str::to_string),
                count: 1,
                hydrogen_count,
                charge,
            });
    }

    /// Hydrogens implied by valence for an unbracketed atom.
    pub fn implicit_hydrogens(&self) -> u8 {
        if self.is_bracket {
            return 0;
        }
        let Some(max) = element::max_bonds(&self.element) else {
            return 0;
        };
        let mut free = max.saturating_sub(self.bond_count);
        if self.is_aromatic {
            free = free.saturating_sub(1);
        }
        free
    }

    /// Hydrogens carried by this atom that are not vertices of the graph.
    pub fn hydrogen_count(&self) -> u8 {
        if self.is_bracket {
            if self.is_stereo_center {
                // bracket hydrogens were expanded into vertices
                self.explicit_hydrogens
            } else {
                self.bracket_hydrogens.saturating_add(self.explicit_hydrogens)
            }
        } else {
            self.implicit_hydrogens().max(self.explicit_hydrogens)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_hydrogens_from_valence() {
        let mut c = Atom::new("C");
        c.bond_count = 2;
        assert_eq!(c.implicit_hydrogens(), 2);
        c.is_aromatic = true;
        assert_eq!(c.implicit_hydrogens(), 1);
    }

    #[test]
    fn bracket_atoms_have_no_implicit_hydrogens() {
        let mut n = Atom::new("N");
        n.is_bracket = true;
        n.bracket_hydrogens = 4;
        assert_eq!(n.implicit_hydrogens(), 0);
        assert_eq!(n.hydrogen_count(), 4);
    }

    #[test]
    fn suppressed_hydrogen_does_not_double_count() {
        let mut c = Atom::new("C");
        c.explicit_hydrogens = 1;
        assert_eq!(c.hydrogen_count(), 4);
    }

    #[test]
    fn pseudo_elements_accumulate() {
        let mut c = Atom::new("C");
        c.attach_pseudo_element("F", None, 0, 0);
        c.attach_pseudo_element("F", None, 0, 0);
        c.attach_pseudo_element("F", None, 0, 0);
        assert_eq!(c.pseudo_elements.len(), 1);
        assert_eq!(c.pseudo_elements["0F0"].count, 3);
    }
}
