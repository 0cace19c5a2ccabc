use crate::atom::Chirality;
use crate::bond::BondSymbol;
use crate::element;
use crate::smiles::error::SmilesError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Atom(AtomToken),
    Bond(BondSymbol, usize),
    RingClosure {
        bond: Option<BondSymbol>,
        label: u16,
        pos: usize,
    },
    OpenParen(usize),
    CloseParen(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomToken {
    pub element: String,
    pub is_aromatic: bool,
    pub isotope: u16,
    pub chirality: Chirality,
    pub hcount: u8,
    pub charge: i8,
    pub atom_class: u16,
    pub is_bracket: bool,
    pub pos: usize,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, SmilesError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
            }
            '[' => {
                let (tok, next) = parse_bracket_atom(&chars, i)?;
                tokens.push(Token::Atom(tok));
                i = next;
            }
            'B' | 'C'
                if i + 1 < chars.len()
                    && matches!((chars[i], chars[i + 1]), ('B', 'r') | ('C', 'l')) =>
            {
                let symbol: String = chars[i..i + 2].iter().collect();
                tokens.push(Token::Atom(bare_atom(symbol, false, i)));
                i += 2;
            }
            c @ ('B' | 'C' | 'N' | 'O' | 'P' | 'S' | 'F' | 'I') => {
                tokens.push(Token::Atom(bare_atom(c.to_string(), false, i)));
                i += 1;
            }
            c @ ('b' | 'c' | 'n' | 'o' | 'p' | 's') => {
                tokens.push(Token::Atom(bare_atom(c.to_ascii_uppercase().to_string(), true, i)));
                i += 1;
            }
            '(' => {
                tokens.push(Token::OpenParen(i));
                i += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen(i));
                i += 1;
            }
            '%' => {
                let (label, next) = parse_percent_ring(&chars, i)?;
                let bond = try_consume_pending_bond(&mut tokens);
                tokens.push(Token::RingClosure { bond, label, pos: i });
                i = next;
            }
            d @ '0'..='9' => {
                let bond = try_consume_pending_bond(&mut tokens);
                tokens.push(Token::RingClosure {
                    bond,
                    label: (d as u16) - b'0' as u16,
                    pos: i,
                });
                i += 1;
            }
            ch => match BondSymbol::from_char(ch) {
                Some(bond) => {
                    tokens.push(Token::Bond(bond, i));
                    i += 1;
                }
                None => return Err(SmilesError::UnexpectedChar { pos: i, ch }),
            },
        }
    }

    Ok(tokens)
}

fn bare_atom(element: String, aromatic: bool, pos: usize) -> AtomToken {
    AtomToken {
        element,
        is_aromatic: aromatic,
        isotope: 0,
        chirality: Chirality::None,
        hcount: 0,
        charge: 0,
        atom_class: 0,
        is_bracket: false,
        pos,
    }
}

/// A bond written directly before a ring-closure label belongs to the
/// closure, not to the next atom. The fragment separator never does.
fn try_consume_pending_bond(tokens: &mut Vec<Token>) -> Option<BondSymbol> {
    match tokens.last() {
        Some(Token::Bond(b, _)) if *b != BondSymbol::Dot => {
            let b = *b;
            tokens.pop();
            Some(b)
        }
        _ => None,
    }
}

fn parse_percent_ring(chars: &[char], start: usize) -> Result<(u16, usize), SmilesError> {
    let i = start + 1;
    if i + 1 >= chars.len() || !chars[i].is_ascii_digit() || !chars[i + 1].is_ascii_digit() {
        return Err(SmilesError::UnexpectedChar { pos: start, ch: '%' });
    }
    let d1 = (chars[i] as u16) - b'0' as u16;
    let d2 = (chars[i + 1] as u16) - b'0' as u16;
    Ok((d1 * 10 + d2, i + 2))
}

fn parse_bracket_atom(chars: &[char], start: usize) -> Result<(AtomToken, usize), SmilesError> {
    let mut i = start + 1; // skip '['

    let isotope = parse_isotope(chars, &mut i, start)?;
    let (element, is_aromatic) = parse_bracket_element(chars, &mut i, start)?;
    let chirality = parse_chirality(chars, &mut i);
    let hcount = parse_hcount(chars, &mut i);
    let charge = parse_charge(chars, &mut i, start)?;
    let atom_class = parse_atom_class(chars, &mut i);

    if i >= chars.len() || chars[i] != ']' {
        return Err(SmilesError::UnclosedBracket { pos: start });
    }
    i += 1; // skip ']'

    Ok((
        AtomToken {
            element,
            is_aromatic,
            isotope,
            chirality,
            hcount,
            charge,
            atom_class,
            is_bracket: true,
            pos: start,
        },
        i,
    ))
}

fn parse_isotope(chars: &[char], i: &mut usize, start: usize) -> Result<u16, SmilesError> {
    let mut val: u16 = 0;
    while *i < chars.len() && chars[*i].is_ascii_digit() {
        val = val
            .checked_mul(10)
            .and_then(|v| v.checked_add(chars[*i] as u16 - b'0' as u16))
            .ok_or(SmilesError::InvalidIsotope { pos: start })?;
        *i += 1;
    }
    Ok(val)
}

fn parse_bracket_element(
    chars: &[char],
    i: &mut usize,
    bracket_start: usize,
) -> Result<(String, bool), SmilesError> {
    if *i >= chars.len() {
        return Err(SmilesError::UnclosedBracket { pos: bracket_start });
    }

    // Aromatic two-letter symbols first, then single lower-case letters.
    for pat in ["se", "as", "te"] {
        let end = *i + pat.len();
        if end <= chars.len() && chars[*i..end].iter().copied().eq(pat.chars()) {
            *i = end;
            return Ok((capitalize(pat), true));
        }
    }
    if chars[*i].is_ascii_lowercase() {
        let symbol = chars[*i].to_ascii_uppercase().to_string();
        if element::can_be_aromatic(&symbol) {
            *i += 1;
            return Ok((symbol, true));
        }
    }

    if *i + 1 < chars.len() && chars[*i].is_ascii_uppercase() && chars[*i + 1].is_ascii_lowercase()
    {
        let sym: String = chars[*i..=*i + 1].iter().collect();
        if element::is_element(&sym) {
            *i += 2;
            return Ok((sym, false));
        }
    }

    if chars[*i].is_ascii_uppercase() {
        let sym = chars[*i].to_string();
        if element::is_element(&sym) {
            *i += 1;
            return Ok((sym, false));
        }
    }

    Err(SmilesError::InvalidElement {
        pos: *i,
        text: chars.get(*i).map(|c| c.to_string()).unwrap_or_default(),
    })
}

fn capitalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (k, c) in s.chars().enumerate() {
        out.push(if k == 0 { c.to_ascii_uppercase() } else { c });
    }
    out
}

fn parse_chirality(chars: &[char], i: &mut usize) -> Chirality {
    if *i < chars.len() && chars[*i] == '@' {
        *i += 1;
        if *i < chars.len() && chars[*i] == '@' {
            *i += 1;
            Chirality::Cw
        } else {
            Chirality::Ccw
        }
    } else {
        Chirality::None
    }
}

fn parse_hcount(chars: &[char], i: &mut usize) -> u8 {
    if *i < chars.len() && chars[*i] == 'H' {
        *i += 1;
        let mut count: u8 = 1;
        if *i < chars.len() && chars[*i].is_ascii_digit() {
            count = chars[*i] as u8 - b'0';
            *i += 1;
        }
        count
    } else {
        0
    }
}

fn parse_charge(chars: &[char], i: &mut usize, bracket_start: usize) -> Result<i8, SmilesError> {
    if *i >= chars.len() {
        return Ok(0);
    }
    let sign: i8 = match chars[*i] {
        '+' => 1,
        '-' => -1,
        _ => return Ok(0),
    };
    let sign_char = chars[*i];
    *i += 1;

    if *i < chars.len() && chars[*i] == sign_char {
        let mut count: i8 = 1;
        while *i < chars.len() && chars[*i] == sign_char {
            count = count
                .checked_add(1)
                .ok_or(SmilesError::InvalidCharge { pos: bracket_start })?;
            *i += 1;
        }
        return Ok(sign * count);
    }

    if *i < chars.len() && chars[*i].is_ascii_digit() {
        let mut val: i8 = 0;
        while *i < chars.len() && chars[*i].is_ascii_digit() {
            val = val
                .checked_mul(10)
                .and_then(|v| v.checked_add((chars[*i] as u8 - b'0') as i8))
                .ok_or(SmilesError::InvalidCharge { pos: bracket_start })?;
            *i += 1;
        }
        return Ok(sign * val);
    }

    Ok(sign)
}

fn parse_atom_class(chars: &[char], i: &mut usize) -> u16 {
    if *i < chars.len() && chars[*i] == ':' {
        *i += 1;
        let mut val: u16 = 0;
        while *i < chars.len() && chars[*i].is_ascii_digit() {
            val = val.saturating_mul(10).saturating_add(chars[*i] as u16 - b'0' as u16);
            *i += 1;
        }
        val
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(tok: &Token) -> &AtomToken {
        match tok {
            Token::Atom(a) => a,
            other => panic!("expected atom, got {other:?}"),
        }
    }

    #[test]
    fn tokenize_methane() {
        let tokens = tokenize("C").unwrap();
        assert_eq!(tokens.len(), 1);
        let a = atom(&tokens[0]);
        assert_eq!(a.element, "C");
        assert!(!a.is_bracket);
        assert!(!a.is_aromatic);
    }

    #[test]
    fn tokenize_two_letter_organic() {
        let tokens = tokenize("ClCBr").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(atom(&tokens[0]).element, "Cl");
        assert_eq!(atom(&tokens[1]).element, "C");
        assert_eq!(atom(&tokens[2]).element, "Br");
    }

    #[test]
    fn tokenize_bracket_atom() {
        let tokens = tokenize("[NH4+]").unwrap();
        let a = atom(&tokens[0]);
        assert_eq!(a.element, "N");
        assert!(a.is_bracket);
        assert_eq!(a.hcount, 4);
        assert_eq!(a.charge, 1);
    }

    #[test]
    fn tokenize_isotope_and_class() {
        let tokens = tokenize("[13CH3:7]").unwrap();
        let a = atom(&tokens[0]);
        assert_eq!(a.isotope, 13);
        assert_eq!(a.hcount, 3);
        assert_eq!(a.atom_class, 7);
    }

    #[test]
    fn ring_closure_takes_preceding_bond() {
        let tokens = tokenize("C=1CC1").unwrap();
        assert_eq!(tokens.len(), 5);
        assert!(matches!(
            tokens[1],
            Token::RingClosure { bond: Some(BondSymbol::Double), label: 1, .. }
        ));
    }

    #[test]
    fn percent_ring_label() {
        let tokens = tokenize("C%12CC%12").unwrap();
        assert!(matches!(tokens[1], Token::RingClosure { label: 12, .. }));
    }

    #[test]
    fn chirality_tags() {
        let tokens = tokenize("[C@@H](F)Cl").unwrap();
        assert_eq!(atom(&tokens[0]).chirality, Chirality::Cw);
        let tokens = tokenize("[C@H](F)Cl").unwrap();
        assert_eq!(atom(&tokens[0]).chirality, Chirality::Ccw);
    }

    #[test]
    fn aromatic_bracket_selenium() {
        let tokens = tokenize("[se]").unwrap();
        let a = atom(&tokens[0]);
        assert!(a.is_aromatic);
        assert_eq!(a.element, "Se");
    }

    #[test]
    fn charge_variants() {
        for (s, q) in [("[O-]", -1), ("[O-2]", -2), ("[O--]", -2), ("[Fe+3]", 3)] {
            let tokens = tokenize(s).unwrap();
            assert_eq!(atom(&tokens[0]).charge, q, "{s}");
        }
    }

    #[test]
    fn dot_is_a_bond_token() {
        let tokens = tokenize("[Na+].[Cl-]").unwrap();
        assert!(matches!(tokens[1], Token::Bond(BondSymbol::Dot, 5)));
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(matches!(
            tokenize("C?C"),
            Err(SmilesError::UnexpectedChar { pos: 1, ch: '?' })
        ));
        assert!(matches!(tokenize("[Xx]"), Err(SmilesError::InvalidElement { .. })));
        assert!(matches!(tokenize("[C"), Err(SmilesError::UnclosedBracket { pos: 0 })));
    }
}
