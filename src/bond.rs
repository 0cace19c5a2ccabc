use serde::Serialize;

/// Bond symbol as written in SMILES.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum BondSymbol {
    #[default]
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
    /// `/`
    Up,
    /// `\`
    Down,
    /// `.` fragment separator, kept as a zero-order edge so the spanning
    /// tree stays connected.
    Dot,
}

impl BondSymbol {
    pub fn from_char(c: char) -> Option<BondSymbol> {
        Some(match c {
            '-' => BondSymbol::Single,
            '=' => BondSymbol::Double,
            '#' => BondSymbol::Triple,
            '$' => BondSymbol::Quadruple,
            ':' => BondSymbol::Aromatic,
            '/' => BondSymbol::Up,
            '\\' => BondSymbol::Down,
            '.' => BondSymbol::Dot,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            BondSymbol::Single => '-',
            BondSymbol::Double => '=',
            BondSymbol::Triple => '#',
            BondSymbol::Quadruple => '$',
            BondSymbol::Aromatic => ':',
            BondSymbol::Up => '/',
            BondSymbol::Down => '\\',
            BondSymbol::Dot => '.',
        }
    }

    /// Bond order used for valence bookkeeping.
    pub fn weight(self) -> u8 {
        match self {
            BondSymbol::Single | BondSymbol::Aromatic | BondSymbol::Up | BondSymbol::Down => 1,
            BondSymbol::Double => 2,
            BondSymbol::Triple => 3,
            BondSymbol::Quadruple => 4,
            BondSymbol::Dot => 0,
        }
    }

    pub fn is_directional(self) -> bool {
        matches!(self, BondSymbol::Up | BondSymbol::Down)
    }

    /// The same bond read from the other end: `/` and `\` swap.
    pub fn reversed(self) -> BondSymbol {
        match self {
            BondSymbol::Up => BondSymbol::Down,
            BondSymbol::Down => BondSymbol::Up,
            other => other,
        }
    }
}

/// Stereo wedge drawn on a bond, narrow end at the edge source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Wedge {
    #[default]
    None,
    /// Towards the viewer.
    Up,
    /// Away from the viewer.
    Down,
}

/// A bond in the depiction graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub id: usize,
    /// The atom written first.
    pub source: usize,
    pub target: usize,
    pub weight: u8,
    pub bond_type: BondSymbol,
    pub is_aromatic: bool,
    pub wedge: Wedge,
    /// Double bond drawn symmetric about the bond axis instead of with an
    /// offset second line.
    pub center: bool,
}

impl Edge {
    pub fn new(id: usize, source: usize, target: usize, bond_type: BondSymbol) -> Self {
        Self {
            id,
            source,
            target,
            weight: bond_type.weight(),
            bond_type,
            is_aromatic: bond_type == BondSymbol::Aromatic,
            wedge: Wedge::None,
            center: false,
        }
    }

    /// The endpoint opposite `vertex`, if `vertex` is an endpoint.
    pub fn other(&self, vertex: usize) -> Option<usize> {
        if self.source == vertex {
            Some(self.target)
        } else if self.target == vertex {
            Some(self.source)
        } else {
            None
        }
    }

    pub fn connects(&self, a: usize, b: usize) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    /// Directional symbol of this bond read from `from` towards the other end.
    pub fn direction_from(&self, from: usize) -> Option<BondSymbol> {
        if !self.bond_type.is_directional() {
            return None;
        }
        if from == self.source {
            Some(self.bond_type)
        } else if from == self.target {
            Some(self.bond_type.reversed())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_table_weights() {
        assert_eq!(BondSymbol::from_char('-').map(BondSymbol::weight), Some(1));
        assert_eq!(BondSymbol::from_char('=').map(BondSymbol::weight), Some(2));
        assert_eq!(BondSymbol::from_char('#').map(BondSymbol::weight), Some(3));
        assert_eq!(BondSymbol::from_char('$').map(BondSymbol::weight), Some(4));
        assert_eq!(BondSymbol::from_char('/').map(BondSymbol::weight), Some(1));
        assert_eq!(BondSymbol::from_char('.').map(BondSymbol::weight), Some(0));
        assert_eq!(BondSymbol::from_char('x'), None);
    }

    #[test]
    fn char_round_trip() {
        for c in ['-', '=', '#', '$', ':', '/', '\\', '.'] {
            assert_eq!(BondSymbol::from_char(c).map(BondSymbol::as_char), Some(c));
        }
    }

    #[test]
    fn direction_flips_from_target() {
        let e = Edge::new(0, 3, 4, BondSymbol::Up);
        assert_eq!(e.direction_from(3), Some(BondSymbol::Up));
        assert_eq!(e.direction_from(4), Some(BondSymbol::Down));
        assert_eq!(e.direction_from(5), None);
    }

    #[test]
    fn other_endpoint() {
        let e = Edge::new(0, 1, 2, BondSymbol::Single);
        assert_eq!(e.other(1), Some(2));
        assert_eq!(e.other(2), Some(1));
        assert_eq!(e.other(7), None);
        assert!(e.connects(2, 1));
    }
}
