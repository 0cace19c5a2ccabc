use std::collections::BTreeMap;

use crate::atom::Chirality;
use crate::bond::BondSymbol;
use crate::smiles::error::SmilesError;
use crate::smiles::tokenizer::{AtomToken, Token};

/// Atom as written, before any graph bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAtom {
    pub element: String,
    pub is_aromatic: bool,
    pub is_bracket: bool,
    pub isotope: u16,
    pub chirality: Chirality,
    pub hcount: u8,
    pub charge: i8,
    pub atom_class: u16,
}

impl ParsedAtom {
    /// A plain unbracketed atom.
    pub fn organic(element: &str) -> Self {
        Self {
            element: element.to_string(),
            is_aromatic: false,
            is_bracket: false,
            isotope: 0,
            chirality: Chirality::None,
            hcount: 0,
            charge: 0,
            atom_class: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingBond {
    pub label: u16,
    pub bond: Option<BondSymbol>,
}

/// One atom of the parse tree together with everything written after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNode {
    pub atom: ParsedAtom,
    /// Bond to the chain continuation [`next`](Self::next).
    pub bond: Option<BondSymbol>,
    /// Bond leading into this node when it opens a branch.
    pub branch_bond: Option<BondSymbol>,
    pub ringbonds: Vec<RingBond>,
    /// Node ids of the branch heads, in the order written.
    pub branches: Vec<usize>,
    pub next: Option<usize>,
}

impl ParseNode {
    fn new(atom: ParsedAtom) -> Self {
        Self {
            atom,
            bond: None,
            branch_bond: None,
            ringbonds: Vec::new(),
            branches: Vec::new(),
            next: None,
        }
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    pub fn ringbond_count(&self) -> usize {
        self.ringbonds.len()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Rooted parse tree stored as an arena; node `0` is the root.
///
/// Fragments separated by `.` hang off each other as chain continuations
/// with a [`BondSymbol::Dot`] bond, so the tree is always connected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseTree {
    pub nodes: Vec<ParseNode>,
}

impl ParseTree {
    pub const ROOT: usize = 0;

    pub fn node(&self, id: usize) -> &ParseNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a node and returns its id. Used to assemble trees by hand.
    pub fn push(&mut self, atom: ParsedAtom) -> usize {
        self.nodes.push(ParseNode::new(atom));
        self.nodes.len() - 1
    }
}

pub fn build_parse_tree(tokens: &[Token]) -> Result<ParseTree, SmilesError> {
    let mut tree = ParseTree::default();
    let mut stack: Vec<(usize, usize)> = Vec::new(); // (branch point, paren pos)
    let mut current: Option<usize> = None;
    let mut pending_bond: Option<(BondSymbol, usize)> = None;
    let mut open_branch = false;
    let mut ring_opens: BTreeMap<u16, (usize, Option<BondSymbol>)> = BTreeMap::new();

    for token in tokens {
        match token {
            Token::Atom(atom_tok) => {
                let idx = tree.push(parsed_atom(atom_tok));
                let bond = pending_bond.take().map(|(b, _)| b);
                if let Some(cur) = current {
                    if open_branch {
                        tree.nodes[cur].branches.push(idx);
                        tree.nodes[idx].branch_bond = bond;
                        open_branch = false;
                    } else {
                        tree.nodes[cur].next = Some(idx);
                        tree.nodes[cur].bond = bond;
                    }
                }
                current = Some(idx);
            }
            Token::Bond(b, pos) => {
                if current.is_none() || pending_bond.is_some() {
                    return Err(SmilesError::DanglingBond { pos: *pos });
                }
                pending_bond = Some((*b, *pos));
            }
            Token::RingClosure { bond, label, pos } => {
                let cur = current.ok_or(SmilesError::InvalidRingBond {
                    label: *label,
                    pos: *pos,
                })?;
                if let Some((open_idx, open_bond)) = ring_opens.remove(label) {
                    if open_idx == cur {
                        return Err(SmilesError::InvalidRingBond {
                            label: *label,
                            pos: *pos,
                        });
                    }
                    if let (Some(b1), Some(b2)) = (bond, open_bond) {
                        if *b1 != b2 && !(b1.is_directional() && b2.is_directional()) {
                            return Err(SmilesError::RingBondConflict { label: *label });
                        }
                    }
                } else {
                    ring_opens.insert(*label, (cur, *bond));
                }
                tree.nodes[cur].ringbonds.push(RingBond {
                    label: *label,
                    bond: *bond,
                });
            }
            Token::OpenParen(pos) => {
                let cur = current.ok_or(SmilesError::UnmatchedParen { pos: *pos })?;
                if open_branch {
                    return Err(SmilesError::UnexpectedChar { pos: *pos, ch: '(' });
                }
                if let Some((_, bond_pos)) = pending_bond {
                    return Err(SmilesError::DanglingBond { pos: bond_pos });
                }
                stack.push((cur, *pos));
                open_branch = true;
            }
            Token::CloseParen(pos) => {
                if open_branch {
                    return Err(SmilesError::UnmatchedParen { pos: *pos });
                }
                if let Some((_, bond_pos)) = pending_bond {
                    return Err(SmilesError::DanglingBond { pos: bond_pos });
                }
                let (branch_point, _) = stack
                    .pop()
                    .ok_or(SmilesError::UnmatchedParen { pos: *pos })?;
                current = Some(branch_point);
            }
        }
    }

    if let Some(&(_, pos)) = stack.last() {
        return Err(SmilesError::UnmatchedParen { pos });
    }
    if let Some((_, pos)) = pending_bond {
        return Err(SmilesError::DanglingBond { pos });
    }
    if let Some(&label) = ring_opens.keys().next() {
        return Err(SmilesError::UnclosedRing { label });
    }
    if tree.is_empty() {
        return Err(SmilesError::EmptyInput);
    }

    Ok(tree)
}

fn parsed_atom(tok: &AtomToken) -> ParsedAtom {
    ParsedAtom {
        element: tok.element.clone(),
        is_aromatic: tok.is_aromatic,
        is_bracket: tok.is_bracket,
        isotope: tok.isotope,
        chirality: tok.chirality,
        hcount: tok.hcount,
        charge: tok.charge,
        atom_class: tok.atom_class,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::tokenizer::tokenize;

    fn tree(s: &str) -> ParseTree {
        build_parse_tree(&tokenize(s).unwrap()).unwrap()
    }

    #[test]
    fn ethane_tree() {
        let t = tree("CC");
        assert_eq!(t.len(), 2);
        assert_eq!(t.node(0).next, Some(1));
        assert!(!t.node(1).has_next());
    }

    #[test]
    fn chain_bond_is_stored_on_the_preceding_node() {
        let t = tree("C=O");
        assert_eq!(t.node(0).bond, Some(BondSymbol::Double));
        assert_eq!(t.node(1).bond, None);
    }

    #[test]
    fn branch_tree() {
        let t = tree("CC(=O)C");
        assert_eq!(t.node(1).branch_count(), 1);
        assert_eq!(t.node(1).branches, vec![2]);
        assert_eq!(t.node(2).branch_bond, Some(BondSymbol::Double));
        assert_eq!(t.node(1).next, Some(3));
    }

    #[test]
    fn ring_bonds_recorded_on_both_atoms() {
        let t = tree("C1CCCCC1");
        assert_eq!(t.node(0).ringbond_count(), 1);
        assert_eq!(t.node(5).ringbonds[0].label, 1);
    }

    #[test]
    fn fragments_joined_by_dot() {
        let t = tree("[Na+].[Cl-]");
        assert_eq!(t.node(0).next, Some(1));
        assert_eq!(t.node(0).bond, Some(BondSymbol::Dot));
    }

    #[test]
    fn ring_label_reuse() {
        let t = tree("C1CC1C1CC1");
        assert_eq!(t.len(), 6);
    }

    #[test]
    fn unclosed_ring_error() {
        let result = build_parse_tree(&tokenize("C1CC").unwrap());
        assert_eq!(result, Err(SmilesError::UnclosedRing { label: 1 }));
    }

    #[test]
    fn unmatched_paren_error() {
        assert!(matches!(
            build_parse_tree(&tokenize("C(C").unwrap()),
            Err(SmilesError::UnmatchedParen { pos: 1 })
        ));
        assert!(matches!(
            build_parse_tree(&tokenize("CC)C").unwrap()),
            Err(SmilesError::UnmatchedParen { pos: 2 })
        ));
    }

    #[test]
    fn conflicting_ring_bonds() {
        let result = build_parse_tree(&tokenize("C=1CCC#1").unwrap());
        assert_eq!(result, Err(SmilesError::RingBondConflict { label: 1 }));
    }

    #[test]
    fn dangling_bond() {
        assert!(matches!(
            build_parse_tree(&tokenize("CC=").unwrap()),
            Err(SmilesError::DanglingBond { pos: 2 })
        ));
    }
}
