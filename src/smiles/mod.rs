//! SMILES reader producing the parse tree consumed by the graph builder.

pub mod error;
mod parse_tree;
mod tokenizer;

pub use error::SmilesError;
pub use parse_tree::{ParseNode, ParseTree, ParsedAtom, RingBond};

/// Parses a SMILES string into a [`ParseTree`].
pub fn parse_smiles(s: &str) -> Result<ParseTree, SmilesError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    let tokens = tokenizer::tokenize(trimmed)?;
    if tokens.is_empty() {
        return Err(SmilesError::EmptyInput);
    }
    parse_tree::build_parse_tree(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Chirality;
    use crate::bond::BondSymbol;

    #[test]
    fn empty_input() {
        assert_eq!(parse_smiles(""), Err(SmilesError::EmptyInput));
        assert_eq!(parse_smiles("   "), Err(SmilesError::EmptyInput));
    }

    #[test]
    fn acetic_acid() {
        let tree = parse_smiles("CC(=O)O").unwrap();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.node(1).branches, vec![2]);
        assert_eq!(tree.node(1).next, Some(3));
    }

    #[test]
    fn chiral_bracket_atom() {
        let tree = parse_smiles("F[C@H](Cl)Br").unwrap();
        let c = &tree.node(1).atom;
        assert!(c.is_bracket);
        assert_eq!(c.chirality, Chirality::Ccw);
        assert_eq!(c.hcount, 1);
    }

    #[test]
    fn directional_bonds() {
        let tree = parse_smiles("F/C=C/F").unwrap();
        assert_eq!(tree.node(0).bond, Some(BondSymbol::Up));
        assert_eq!(tree.node(1).bond, Some(BondSymbol::Double));
        assert_eq!(tree.node(2).bond, Some(BondSymbol::Up));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(parse_smiles("  CO \n").unwrap().len(), 2);
    }

    #[test]
    fn error_messages() {
        let err = parse_smiles("C1CC").unwrap_err();
        assert_eq!(err.to_string(), "unclosed ring 1");
        let err = parse_smiles("C[Zz]").unwrap_err();
        assert_eq!(err.to_string(), "invalid element 'Z' at position 2");
    }
}
