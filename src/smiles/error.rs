use thiserror::Error;

/// Structural errors raised while reading a SMILES string.
///
/// These are the only errors the pipeline reports; everything downstream of
/// the parse tree recovers locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmilesError {
    /// The input string was empty or contained only whitespace.
    #[error("empty SMILES string")]
    EmptyInput,
    /// An unexpected character was encountered at the given position.
    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },
    /// An unrecognized element symbol was found.
    #[error("invalid element '{text}' at position {pos}")]
    InvalidElement { pos: usize, text: String },
    /// A bracket atom `[` was opened but never closed with `]`.
    #[error("unclosed bracket atom starting at position {pos}")]
    UnclosedBracket { pos: usize },
    /// A ring-opening label was never matched by a ring-closing label.
    #[error("unclosed ring {label}")]
    UnclosedRing { label: u16 },
    /// A parenthesis was opened without a matching close, or vice versa.
    #[error("unmatched parenthesis at position {pos}")]
    UnmatchedParen { pos: usize },
    /// A charge specifier inside a bracket atom could not be parsed.
    #[error("invalid charge at position {pos}")]
    InvalidCharge { pos: usize },
    /// An isotope number overflowed.
    #[error("isotope overflow at position {pos}")]
    InvalidIsotope { pos: usize },
    /// A ring-closure label appeared before any atom.
    #[error("ring bond {label} at position {pos} has no atom")]
    InvalidRingBond { label: u16, pos: usize },
    /// Both ends of a ring closure carry different bond symbols.
    #[error("conflicting bond types on ring closure {label}")]
    RingBondConflict { label: u16 },
    /// A bond symbol was not followed by an atom.
    #[error("bond at position {pos} is not followed by an atom")]
    DanglingBond { pos: usize },
}
