use std::collections::BTreeMap;

use tracing::debug;

use crate::atom::{Atom, Chirality};
use crate::bond::BondSymbol;
use crate::graph::{Graph, RingClosure};
use crate::smiles::{ParseNode, ParseTree, ParsedAtom};

/// Link from a pending child back to the vertex it hangs from.
#[derive(Debug, Clone, Copy)]
struct Link {
    vertex: usize,
    bond: Option<BondSymbol>,
}

enum Frame {
    Node {
        node: usize,
        /// Sort key of this child in the parent's neighbour list.
        order: usize,
        parent: Option<Link>,
        is_branch: bool,
    },
    StereoHydrogen {
        order: usize,
        parent: usize,
    },
}

struct OpenRing {
    vertex: usize,
    order: usize,
    bond: Option<BondSymbol>,
}

struct Builder<'a> {
    tree: &'a ParseTree,
    isomeric: bool,
    graph: Graph,
    /// `(sort key, neighbour)` pairs per vertex, sorted once at the end.
    neighbour_keys: Vec<Vec<(usize, usize)>>,
    node_to_vertex: Vec<Option<usize>>,
    suppressed: Vec<bool>,
    open_rings: BTreeMap<u16, OpenRing>,
}

/// Builds the molecule graph from a parse tree.
///
/// Every heavy atom becomes a vertex, numbered in depth-first parse order.
/// Plain terminal `[H]` atoms are folded into their neighbour's explicit
/// hydrogen count. With `isomeric` set, chiral bracket atoms get their
/// bracket hydrogens as explicit vertices so all four neighbours can be
/// placed; without it chirality, isotopes and `/` `\` are dropped.
pub fn build(tree: &ParseTree, isomeric: bool) -> Graph {
    let mut builder = Builder {
        tree,
        isomeric,
        graph: Graph::new(),
        neighbour_keys: Vec::new(),
        node_to_vertex: vec![None; tree.len()],
        suppressed: vec![false; tree.len()],
        open_rings: BTreeMap::new(),
    };
    builder.run();
    builder.finish()
}

impl<'a> Builder<'a> {
    fn run(&mut self) {
        if self.tree.is_empty() {
            return;
        }
        let parse_neighbours = parse_neighbours(self.tree);
        for (i, node) in self.tree.nodes.iter().enumerate() {
            self.suppressed[i] = self.is_suppressible(i, node, &parse_neighbours[i]);
        }

        let mut root = ParseTree::ROOT;
        let mut root_hydrogens = 0u8;
        if self.suppressed[root] {
            // a suppressed H has exactly one neighbour, which takes over as root
            root_hydrogens = 1;
            root = parse_neighbours[root][0];
        }

        let mut stack = vec![Frame::Node {
            node: root,
            order: 0,
            parent: None,
            is_branch: false,
        }];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::StereoHydrogen { order, parent } => {
                    let mut atom = Atom::new("H");
                    atom.is_bracket = true;
                    let id = self.add_vertex(atom, Some(parent));
                    self.add_bond(parent, id, BondSymbol::Single, order, 0);
                }
                Frame::Node {
                    node,
                    order,
                    parent,
                    is_branch,
                } => {
                    if self.suppressed[node] && node != root {
                        if let Some(link) = parent {
                            let atom = &mut self.graph.vertex_mut(link.vertex).atom;
                            atom.explicit_hydrogens = atom.explicit_hydrogens.saturating_add(1);
                        }
                        continue;
                    }
                    let id = self.visit(node, order, parent, is_branch);
                    self.push_children(&mut stack, node, id);
                }
            }
        }

        if root_hydrogens > 0 {
            if let Some(v) = self.node_to_vertex[root] {
                let atom = &mut self.graph.vertex_mut(v).atom;
                atom.explicit_hydrogens = atom.explicit_hydrogens.saturating_add(root_hydrogens);
            }
        }
    }

    fn finish(mut self) -> Graph {
        for (v, keys) in self.neighbour_keys.iter_mut().enumerate() {
            keys.sort_by_key(|&(key, _)| key);
            self.graph.vertex_mut(v).neighbours = keys.iter().map(|&(_, n)| n).collect();
        }
        let tree = self.tree;
        let heavy: Vec<usize> = self
            .node_to_vertex
            .iter()
            .flatten()
            .copied()
            .filter(|&v| !self.graph.vertex(v).atom.is_hydrogen())
            .collect();
        self.graph.atom_idx_to_vertex_id = heavy;
        debug!(
            atoms = tree.len(),
            vertices = self.graph.vertex_count(),
            edges = self.graph.edge_count(),
            ring_closures = self.graph.ring_closures.len(),
            "built graph"
        );
        self.graph
    }

    /// A plain `[H]` with exactly one bonded neighbour that is not a
    /// stereocenter.
    fn is_suppressible(&self, i: usize, node: &ParseNode, neighbours: &[usize]) -> bool {
        let atom = &node.atom;
        if atom.element != "H" || self.tree.len() == 1 {
            return false;
        }
        if atom.charge != 0
            || atom.hcount != 0
            || (self.isomeric && (atom.isotope != 0 || atom.chirality != Chirality::None))
            || !node.ringbonds.is_empty()
            || neighbours.len() != 1
        {
            return false;
        }
        let other = neighbours[0];
        if self.is_stereo_center(&self.tree.node(other).atom) {
            return false;
        }
        // a lone H in its own fragment stays
        let bond = if self.tree.node(other).next == Some(i) {
            self.tree.node(other).bond
        } else if node.next == Some(other) {
            node.bond
        } else {
            None
        };
        bond != Some(BondSymbol::Dot)
    }

    fn is_stereo_center(&self, atom: &ParsedAtom) -> bool {
        self.isomeric && atom.chirality != Chirality::None
    }

    fn add_vertex(&mut self, atom: Atom, parent: Option<usize>) -> usize {
        let id = self.graph.add_vertex(atom, parent);
        self.neighbour_keys.push(Vec::new());
        id
    }

    fn add_bond(
        &mut self,
        source: usize,
        target: usize,
        bond: BondSymbol,
        source_key: usize,
        target_key: usize,
    ) -> usize {
        let edge = self.graph.add_edge(source, target, bond);
        self.neighbour_keys[source].push((source_key, target));
        self.neighbour_keys[target].push((target_key, source));
        edge
    }

    fn resolve(&self, bond: BondSymbol) -> BondSymbol {
        if !self.isomeric && bond.is_directional() {
            BondSymbol::Single
        } else {
            bond
        }
    }

    fn make_atom(&self, parsed: &ParsedAtom, branch_bond: Option<BondSymbol>) -> Atom {
        let mut atom = Atom::new(parsed.element.clone());
        atom.is_aromatic = parsed.is_aromatic;
        atom.is_bracket = parsed.is_bracket;
        atom.charge = parsed.charge;
        atom.bracket_hydrogens = parsed.hcount;
        atom.atom_class = parsed.atom_class;
        atom.branch_bond = branch_bond.map(|b| self.resolve(b));
        if self.isomeric {
            atom.isotope = parsed.isotope;
            atom.chirality = parsed.chirality;
            atom.is_stereo_center = parsed.chirality != Chirality::None;
        }
        atom
    }

    fn stereo_hydrogen_count(&self, node: &ParseNode) -> usize {
        if self.is_stereo_center(&node.atom) && node.atom.is_bracket {
            node.atom.hcount as usize
        } else {
            0
        }
    }

    fn visit(
        &mut self,
        node_id: usize,
        order: usize,
        parent: Option<Link>,
        is_branch: bool,
    ) -> usize {
        let node = self.tree.node(node_id);
        let branch_bond = if is_branch { node.branch_bond } else { None };
        let atom = self.make_atom(&node.atom, branch_bond);
        let id = self.add_vertex(atom, parent.map(|l| l.vertex));
        self.node_to_vertex[node_id] = Some(id);

        if let Some(link) = parent {
            let bond = self.resolve(link.bond.unwrap_or(BondSymbol::Single));
            self.add_bond(link.vertex, id, bond, order, 0);
        }

        let first_ring_key = 1 + self.stereo_hydrogen_count(node);
        for (j, ring_bond) in node.ringbonds.iter().enumerate() {
            let key = first_ring_key + j;
            self.graph.vertex_mut(id).atom.ring_closures.push(ring_bond.label);
            match self.open_rings.remove(&ring_bond.label) {
                Some(open) => {
                    let symbol = match (open.bond, ring_bond.bond) {
                        (Some(b), _) => b,
                        // written at the closing atom, so read from the other end
                        (None, Some(b)) => b.reversed(),
                        (None, None) => BondSymbol::Single,
                    };
                    let symbol = self.resolve(symbol);
                    let edge = self.add_bond(open.vertex, id, symbol, open.order, key);
                    self.graph.ring_closures.push(RingClosure {
                        label: ring_bond.label,
                        first: open.vertex,
                        second: id,
                        edge,
                    });
                }
                None => {
                    self.open_rings.insert(
                        ring_bond.label,
                        OpenRing {
                            vertex: id,
                            order: key,
                            bond: ring_bond.bond,
                        },
                    );
                }
            }
        }
        id
    }

    fn push_children(&self, stack: &mut Vec<Frame>, node_id: usize, vertex: usize) {
        let node = self.tree.node(node_id);
        let hydrogens = self.stereo_hydrogen_count(node);
        let first_branch_key = 1 + hydrogens + node.ringbond_count();

        // reversed so the stack pops them in parse order
        if let Some(next) = node.next {
            stack.push(Frame::Node {
                node: next,
                order: first_branch_key + node.branch_count(),
                parent: Some(Link {
                    vertex,
                    bond: node.bond,
                }),
                is_branch: false,
            });
        }
        for (k, &branch) in node.branches.iter().enumerate().rev() {
            stack.push(Frame::Node {
                node: branch,
                order: first_branch_key + k,
                parent: Some(Link {
                    vertex,
                    bond: self.tree.node(branch).branch_bond,
                }),
                is_branch: true,
            });
        }
        for i in (0..hydrogens).rev() {
            stack.push(Frame::StereoHydrogen {
                order: 1 + i,
                parent: vertex,
            });
        }
    }
}

/// Bonded neighbours of every parse node, ring closures included.
fn parse_neighbours(tree: &ParseTree) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new(); tree.len()];
    let mut open: BTreeMap<u16, usize> = BTreeMap::new();
    for (i, node) in tree.nodes.iter().enumerate() {
        for &child in node.branches.iter().chain(node.next.iter()) {
            out[i].push(child);
            out[child].push(i);
        }
        for ring_bond in &node.ringbonds {
            if let Some(partner) = open.remove(&ring_bond.label) {
                out[i].push(partner);
                out[partner].push(i);
            } else {
                open.insert(ring_bond.label, i);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn graph(s: &str) -> Graph {
        build(&parse_smiles(s).unwrap(), true)
    }

    #[test]
    fn methane() {
        let g = graph("C");
        assert_eq!(g.vertex_count(), 1);
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.vertex(0).atom.hydrogen_count(), 4);
    }

    #[test]
    fn bond_symbols_resolve_to_weights() {
        let g = graph("C=CC#N");
        let weights: Vec<u8> = g.edges().map(|e| e.weight).collect();
        assert_eq!(weights, vec![2, 1, 3]);
        assert_eq!(g.vertex(1).atom.bond_count, 3);
    }

    #[test]
    fn depth_first_ids() {
        let g = graph("CC(O)(N)C");
        let elements: Vec<&str> = g.vertices().map(|v| v.atom.element.as_str()).collect();
        assert_eq!(elements, vec!["C", "C", "O", "N", "C"]);
        assert_eq!(g.vertex(1).children, vec![2, 3, 4]);
        assert_eq!(g.vertex(1).neighbours, vec![0, 2, 3, 4]);
    }

    #[test]
    fn ring_closure_creates_back_edge() {
        let g = graph("C1CCCCC1");
        assert_eq!(g.edge_count(), 6);
        assert_eq!(g.ring_closures.len(), 1);
        let closure = g.ring_closures[0];
        assert_eq!((closure.first, closure.second), (0, 5));
        assert_eq!(g.vertex(0).atom.ring_closures, vec![1]);
        assert_eq!(g.vertex(5).atom.ring_closures, vec![1]);
        assert_eq!(g.vertex(5).parent, Some(4));
        assert_eq!(g.edge(closure.edge).source, 0);
    }

    #[test]
    fn ring_closure_bond_from_either_end() {
        for s in ["C=1CCCC1", "C1CCCC=1"] {
            let g = graph(s);
            let e = g.edge_between(0, 4).unwrap();
            assert_eq!(g.edge(e).bond_type, BondSymbol::Double, "{s}");
        }
    }

    #[test]
    fn ring_closure_neighbour_order() {
        // ring bond comes before the branch and the chain
        let g = graph("C1(F)CCC1");
        assert_eq!(g.vertex(0).neighbours, vec![4, 1, 2]);
    }

    #[test]
    fn terminal_hydrogens_are_folded() {
        let g = graph("[H]C([H])([H])[H]");
        assert_eq!(g.vertex_count(), 1);
        assert_eq!(g.vertex(0).parent, None);
        assert_eq!(g.vertex(0).atom.explicit_hydrogens, 4);
        assert_eq!(g.vertex(0).atom.hydrogen_count(), 4);
    }

    #[test]
    fn sole_hydrogen_is_kept() {
        let g = graph("[H]");
        assert_eq!(g.vertex_count(), 1);
        assert!(g.vertex(0).atom.is_hydrogen());
    }

    #[test]
    fn charged_and_isotopic_hydrogens_are_kept() {
        assert_eq!(graph("[2H]C").vertex_count(), 2);
        assert_eq!(graph("[H+].[Cl-]").vertex_count(), 2);
    }

    #[test]
    fn stereo_hydrogen_inserted() {
        let g = graph("F[C@H](Cl)Br");
        assert_eq!(g.vertex_count(), 5);
        let c = g.vertex(1);
        assert!(c.atom.is_stereo_center);
        assert!(g.vertex(2).atom.is_hydrogen());
        assert_eq!(c.neighbours, vec![0, 2, 3, 4]);
        assert_eq!(c.atom.hydrogen_count(), 0);
        assert_eq!(g.atom_idx_to_vertex_id, vec![0, 1, 3, 4]);
    }

    #[test]
    fn non_isomeric_drops_stereo() {
        let g = build(&parse_smiles("F/C=C/[13C@H](Cl)Br").unwrap(), false);
        assert!(g.edges().all(|e| !e.bond_type.is_directional()));
        assert!(g.vertices().all(|v| v.atom.chirality == Chirality::None));
        assert!(g.vertices().all(|v| v.atom.isotope == 0));
        assert_eq!(g.vertex_count(), 6);
    }

    #[test]
    fn fragments_are_zero_weight_edges() {
        let g = graph("[Na+].[Cl-]");
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edge(0).weight, 0);
        assert_eq!(g.vertex(0).atom.bond_count, 0);
    }

    #[test]
    fn edge_source_is_written_first() {
        let g = graph("F/C=C/F");
        assert_eq!((g.edge(0).source, g.edge(0).target), (0, 1));
        assert_eq!(g.edge(0).direction_from(0), Some(BondSymbol::Up));
        assert_eq!(g.edge(0).direction_from(1), Some(BondSymbol::Down));
    }

    #[test]
    fn branch_bond_recorded_on_atom() {
        let g = graph("CC(=O)O");
        assert_eq!(g.vertex(2).atom.branch_bond, Some(BondSymbol::Double));
        assert_eq!(g.vertex(3).atom.branch_bond, None);
    }
}
