//! Two-dimensional structure depiction from SMILES.
//!
//! A [`Drawer`] parses a SMILES string, builds the molecule graph, perceives
//! rings, folds small terminal groups into labels and computes coordinates.
//! The resulting [`Drawing`] carries everything a renderer needs.

pub mod atom;
pub mod bond;
pub mod builder;
pub mod drawing;
pub mod element;
pub mod error;
pub mod formula;
pub mod graph;
pub mod layout;
pub mod options;
pub mod pseudo;
pub mod rings;
pub mod smiles;
pub mod vector;

pub use atom::{Atom, Chirality, PseudoElement};
pub use bond::{BondSymbol, Edge, Wedge};
pub use drawing::{Drawer, Drawing};
pub use error::DrawError;
pub use formula::molecular_formula;
pub use graph::{Graph, Vertex};
pub use layout::{LayoutReport, LayoutState, OverlapScore};
pub use options::{AtomVisualization, LayoutOptions};
pub use rings::{Ring, RingConnection};
pub use smiles::{parse_smiles, ParseTree, SmilesError};
pub use vector::Vector2;
