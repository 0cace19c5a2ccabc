use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::atom::Atom;
use crate::bond::{BondSymbol, Edge};
use crate::rings::{Ring, RingConnection};
use crate::vector::Vector2;

/// An atom placed in the plane.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vertex {
    pub id: usize,
    pub atom: Atom,
    pub position: Vector2,
    /// Spanning-tree parent; `None` for the root.
    pub parent: Option<usize>,
    /// Spanning-tree children in parse order.
    pub children: Vec<usize>,
    /// All bonded neighbours, ring closures included, in parse order.
    pub neighbours: Vec<usize>,
    pub positioned: bool,
    /// Position fixed by ring placement and not moved by the tree walk.
    pub force_positioned: bool,
}

impl Vertex {
    fn new(id: usize, atom: Atom, parent: Option<usize>) -> Self {
        Self {
            id,
            atom,
            position: Vector2::ZERO,
            parent,
            children: Vec::new(),
            neighbours: Vec::new(),
            positioned: false,
            force_positioned: false,
        }
    }

    pub fn degree(&self) -> usize {
        self.neighbours.len()
    }

    pub fn set_position(&mut self, position: Vector2) {
        self.position = position;
        self.positioned = true;
    }
}

/// A back-edge of the spanning tree written as a pair of ring-closure labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RingClosure {
    pub label: u16,
    /// Vertex carrying the opening label.
    pub first: usize,
    /// Vertex carrying the closing label.
    pub second: usize,
    pub edge: usize,
}

/// Molecule graph built from a parse tree and laid out in place.
///
/// Vertex and edge ids are the dense petgraph indices.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    inner: UnGraph<Vertex, Edge>,
    pub rings: Vec<Ring>,
    pub ring_connections: Vec<RingConnection>,
    pub ring_closures: Vec<RingClosure>,
    /// Vertex id of every heavy atom, in the order the atoms were written.
    pub atom_idx_to_vertex_id: Vec<usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, atom: Atom, parent: Option<usize>) -> usize {
        let id = self.inner.node_count();
        let idx = self.inner.add_node(Vertex::new(id, atom, parent));
        debug_assert_eq!(idx.index(), id);
        if let Some(p) = parent {
            self.inner[NodeIndex::new(p)].children.push(id);
        }
        id
    }

    /// Adds a bond; `source` is the atom written first. Bond counts of both
    /// atoms grow by the bond weight. Neighbour lists are left to the caller.
    pub fn add_edge(&mut self, source: usize, target: usize, bond_type: BondSymbol) -> usize {
        let id = self.inner.edge_count();
        let edge = Edge::new(id, source, target, bond_type);
        let weight = edge.weight;
        self.inner
            .add_edge(NodeIndex::new(source), NodeIndex::new(target), edge);
        for v in [source, target] {
            let atom = &mut self.inner[NodeIndex::new(v)].atom;
            atom.bond_count = atom.bond_count.saturating_add(weight);
        }
        id
    }

    pub fn vertex(&self, id: usize) -> &Vertex {
        &self.inner[NodeIndex::new(id)]
    }

    pub fn vertex_mut(&mut self, id: usize) -> &mut Vertex {
        &mut self.inner[NodeIndex::new(id)]
    }

    pub fn edge(&self, id: usize) -> &Edge {
        &self.inner[EdgeIndex::new(id)]
    }

    pub fn edge_mut(&mut self, id: usize) -> &mut Edge {
        &mut self.inner[EdgeIndex::new(id)]
    }

    pub fn vertex_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.inner.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.inner.edge_weights()
    }

    pub fn edge_between(&self, a: usize, b: usize) -> Option<usize> {
        self.inner
            .find_edge(NodeIndex::new(a), NodeIndex::new(b))
            .map(|e| e.index())
    }

    /// Ids of the edges incident to `v`, sorted.
    pub fn incident_edges(&self, v: usize) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .inner
            .edges(NodeIndex::new(v))
            .map(|e| e.id().index())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Neighbours of `v` joined by a real bond, i.e. not across a `.`.
    pub fn bonded_neighbours(&self, v: usize) -> Vec<usize> {
        self.vertex(v)
            .neighbours
            .iter()
            .copied()
            .filter(|&n| self.edge_between(v, n).is_some_and(|e| self.edge(e).weight > 0))
            .collect()
    }

    pub fn position(&self, v: usize) -> Vector2 {
        self.vertex(v).position
    }

    pub fn positions(&self) -> Vec<Vector2> {
        self.vertices().map(|v| v.position).collect()
    }

    /// Both endpoints share a ring.
    pub fn is_ring_edge(&self, edge: usize) -> bool {
        let e = self.edge(edge);
        let a = &self.vertex(e.source).atom.rings;
        let b = &self.vertex(e.target).atom.rings;
        a.iter().any(|r| b.contains(r))
    }

    /// Ids of the rings containing both `a` and `b`.
    pub fn common_rings(&self, a: usize, b: usize) -> Vec<usize> {
        let rb = &self.vertex(b).atom.rings;
        self.vertex(a)
            .atom
            .rings
            .iter()
            .copied()
            .filter(|r| rb.contains(r))
            .collect()
    }

    /// Vertices reachable from `start` without crossing the edge
    /// `start`-`blocked`.
    pub fn side_of(&self, start: usize, blocked: usize) -> Vec<usize> {
        let mut seen = vec![false; self.vertex_count()];
        seen[start] = true;
        let mut stack = vec![start];
        let mut out = Vec::new();
        while let Some(v) = stack.pop() {
            out.push(v);
            for &n in &self.vertex(v).neighbours {
                if seen[n] || (v == start && n == blocked) {
                    continue;
                }
                seen[n] = true;
                stack.push(n);
            }
        }
        out.sort_unstable();
        out
    }

    /// Vertices of the spanning subtree rooted at `v`.
    pub fn subtree(&self, v: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![v];
        while let Some(u) = stack.pop() {
            out.push(u);
            stack.extend(self.vertex(u).children.iter().copied());
        }
        out.sort_unstable();
        out
    }

    /// Number of heavy atoms, i.e. vertices that are not hydrogen.
    pub fn heavy_atom_count(&self) -> usize {
        self.vertices().filter(|v| !v.atom.is_hydrogen()).count()
    }
}

impl Serialize for Graph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let vertices: Vec<&Vertex> = self.vertices().collect();
        let edges: Vec<&Edge> = self.edges().collect();
        let mut s = serializer.serialize_struct("Graph", 4)?;
        s.serialize_field("vertices", &vertices)?;
        s.serialize_field("edges", &edges)?;
        s.serialize_field("rings", &self.rings)?;
        s.serialize_field("ringConnections", &self.ring_connections)?;
        s.end()
    }
}
