use std::collections::{BTreeSet, VecDeque};
use std::f64::consts::PI;

use petgraph::unionfind::UnionFind;
use serde::Serialize;
use tracing::debug;

use crate::graph::Graph;
use crate::vector::Vector2;

/// A ring of the smallest set of smallest rings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ring {
    pub id: usize,
    /// Member vertex ids in cyclic order, starting at the lowest id.
    pub members: Vec<usize>,
    pub center: Vector2,
    pub radius: f64,
    pub is_aromatic: bool,
    /// Takes part in at least one bridged [`RingConnection`].
    pub is_bridged: bool,
    /// Lowest ring-closure label on the ring.
    pub closure_label: u16,
    pub positioned: bool,
}

impl Ring {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, vertex: usize) -> bool {
        self.members.contains(&vertex)
    }

    /// Consecutive member pairs, closing edge included.
    pub fn bonds(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.members.len();
        (0..n).map(move |i| (self.members[i], self.members[(i + 1) % n]))
    }

    /// Circumradius of the regular polygon with this many sides.
    pub fn polygon_radius(&self, bond_length: f64) -> f64 {
        polygon_radius(self.members.len(), bond_length)
    }
}

pub fn polygon_radius(sides: usize, bond_length: f64) -> f64 {
    bond_length / (2.0 * (PI / sides.max(3) as f64).sin())
}

/// Two rings sharing at least one vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RingConnection {
    pub id: usize,
    pub first_ring: usize,
    pub second_ring: usize,
    pub vertices: BTreeSet<usize>,
    pub is_bridge: bool,
}

impl RingConnection {
    pub fn other_ring(&self, ring: usize) -> Option<usize> {
        if ring == self.first_ring {
            Some(self.second_ring)
        } else if ring == self.second_ring {
            Some(self.first_ring)
        } else {
            None
        }
    }

    pub fn is_spiro(&self) -> bool {
        self.vertices.len() == 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    len: usize,
    label: u16,
    members: Vec<usize>,
}

/// Finds the smallest set of smallest rings and classifies how they touch.
///
/// Ring members, ring connections and the ring/bridge/aromatic flags on
/// atoms and edges are written into `graph`.
pub fn perceive(graph: &mut Graph) {
    graph.rings.clear();
    graph.ring_connections.clear();
    let expected = graph.ring_closures.len();
    if expected == 0 {
        return;
    }

    let mut candidates = fundamental_cycles(graph);
    candidates.extend(horton_candidates(graph));
    candidates.sort();
    candidates.dedup_by(|a, b| a.members == b.members);

    let selected = select_independent_rings(graph, &candidates, expected);
    for (id, candidate) in selected.into_iter().enumerate() {
        let is_aromatic = candidate
            .members
            .iter()
            .all(|&v| graph.vertex(v).atom.is_aromatic);
        graph.rings.push(Ring {
            id,
            members: candidate.members,
            center: Vector2::ZERO,
            radius: 0.0,
            is_aromatic,
            is_bridged: false,
            closure_label: candidate.label,
            positioned: false,
        });
    }

    let memberships: Vec<(usize, usize)> = graph
        .rings
        .iter()
        .flat_map(|r| r.members.iter().map(move |&v| (v, r.id)))
        .collect();
    for (v, ring) in memberships {
        graph.vertex_mut(v).atom.rings.push(ring);
    }

    let aromatic_edges: Vec<usize> = graph
        .rings
        .iter()
        .filter(|r| r.is_aromatic)
        .flat_map(|r| r.bonds().collect::<Vec<_>>())
        .filter_map(|(a, b)| graph.edge_between(a, b))
        .collect();
    for e in aromatic_edges {
        graph.edge_mut(e).is_aromatic = true;
    }

    connect_rings(graph);

    debug!(
        rings = graph.rings.len(),
        connections = graph.ring_connections.len(),
        bridged = graph.rings.iter().filter(|r| r.is_bridged).count(),
        "perceived rings"
    );
}

fn connect_rings(graph: &mut Graph) {
    let mut connections = Vec::new();
    for i in 0..graph.rings.len() {
        for j in (i + 1)..graph.rings.len() {
            let shared: BTreeSet<usize> = graph.rings[i]
                .members
                .iter()
                .copied()
                .filter(|&v| graph.rings[j].contains(v))
                .collect();
            if shared.is_empty() {
                continue;
            }
            let is_bridge = shared.len() > 2
                || shared
                    .iter()
                    .any(|&v| graph.vertex(v).atom.rings.len() > 2);
            connections.push(RingConnection {
                id: connections.len(),
                first_ring: i,
                second_ring: j,
                vertices: shared,
                is_bridge,
            });
        }
    }
    for c in connections.iter().filter(|c| c.is_bridge) {
        graph.rings[c.first_ring].is_bridged = true;
        graph.rings[c.second_ring].is_bridged = true;
    }
    graph.ring_connections = connections;
}

/// Groups ring ids into ring systems: connected components of the ring
/// adjacency. Systems are ordered by their lowest member vertex, ring ids
/// inside a system ascending.
pub fn ring_systems(graph: &Graph) -> Vec<Vec<usize>> {
    let n = graph.rings.len();
    let mut uf = UnionFind::<usize>::new(n);
    for c in &graph.ring_connections {
        uf.union(c.first_ring, c.second_ring);
    }
    let labels = uf.into_labeling();
    let mut systems: Vec<Vec<usize>> = Vec::new();
    let mut seen: Vec<Option<usize>> = vec![None; n];
    for ring in 0..n {
        let root = labels[ring];
        match seen[root] {
            Some(idx) => systems[idx].push(ring),
            None => {
                seen[root] = Some(systems.len());
                systems.push(vec![ring]);
            }
        }
    }
    systems.sort_by_key(|rings| system_vertices(graph, rings).first().copied());
    systems
}

/// Sorted member vertices of a ring system.
pub fn system_vertices(graph: &Graph, rings: &[usize]) -> Vec<usize> {
    let set: BTreeSet<usize> = rings
        .iter()
        .flat_map(|&r| graph.rings[r].members.iter().copied())
        .collect();
    set.into_iter().collect()
}

/// One cycle per ring closure: the closure edge plus the spanning-tree path
/// between its endpoints.
fn fundamental_cycles(graph: &Graph) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(graph.ring_closures.len());
    for closure in &graph.ring_closures {
        let path_a = path_to_root(graph, closure.first);
        let path_b = path_to_root(graph, closure.second);
        let Some(&lca) = path_a.iter().find(|v| path_b.contains(v)) else {
            continue;
        };
        let mut members: Vec<usize> =
            path_a.iter().copied().take_while(|&v| v != lca).collect();
        members.push(lca);
        let tail: Vec<usize> = path_b.iter().copied().take_while(|&v| v != lca).collect();
        members.extend(tail.into_iter().rev());
        if members.len() < 3 {
            continue;
        }
        out.push(Candidate {
            len: members.len(),
            label: closure.label,
            members: normalize_ring(&members),
        });
    }
    out
}

fn path_to_root(graph: &Graph, start: usize) -> Vec<usize> {
    let mut path = vec![start];
    let mut cur = start;
    while let Some(p) = graph.vertex(cur).parent {
        path.push(p);
        cur = p;
    }
    path
}

fn horton_candidates(graph: &Graph) -> Vec<Candidate> {
    let n = graph.vertex_count();
    let dist = all_pairs_bfs(graph, n);
    let pred = all_pairs_predecessors(graph, n, &dist);

    let mut candidates = Vec::new();
    for edge in graph.edges() {
        if edge.weight == 0 {
            continue;
        }
        let (u, v) = (edge.source, edge.target);
        for w in 0..n {
            let du = dist[w][u];
            let dv = dist[w][v];
            if du == u32::MAX || dv == u32::MAX {
                continue;
            }
            if (du as usize + dv as usize + 1) < 3 {
                continue;
            }
            let path_u = reconstruct_path(&pred, w, u);
            let path_v = reconstruct_path(&pred, w, v);
            if path_u.is_empty()
                || path_v.is_empty()
                || paths_share_internal_node(&path_u, &path_v)
            {
                continue;
            }
            let mut ring = path_u;
            ring.extend(path_v[1..].iter().rev());
            let Some(label) = closing_label(graph, &ring) else {
                continue;
            };
            candidates.push(Candidate {
                len: ring.len(),
                label,
                members: normalize_ring(&ring),
            });
        }
    }
    candidates
}

/// Lowest ring-closure label among the ring's edges.
fn closing_label(graph: &Graph, ring: &[usize]) -> Option<u16> {
    let len = ring.len();
    (0..len)
        .filter_map(|i| graph.edge_between(ring[i], ring[(i + 1) % len]))
        .filter_map(|e| graph.ring_closures.iter().find(|c| c.edge == e))
        .map(|c| c.label)
        .min()
}

fn select_independent_rings(
    graph: &Graph,
    candidates: &[Candidate],
    needed: usize,
) -> Vec<Candidate> {
    let num_edges = graph.edge_count();
    let mut result = Vec::with_capacity(needed);
    let mut basis: Vec<Vec<u64>> = Vec::with_capacity(needed);
    for candidate in candidates {
        if result.len() >= needed {
            break;
        }
        let bv = ring_to_edge_bitvector(graph, &candidate.members, num_edges);
        if bv.iter().all(|&w| w == 0) {
            continue;
        }
        if try_add_to_basis(&mut basis, bv) {
            result.push(candidate.clone());
        }
    }
    result
}

fn all_pairs_bfs(graph: &Graph, n: usize) -> Vec<Vec<u32>> {
    let mut dist = vec![vec![u32::MAX; n]; n];
    for (src, row) in dist.iter_mut().enumerate() {
        row[src] = 0;
        let mut queue = VecDeque::from([src]);
        while let Some(cur) = queue.pop_front() {
            let d = row[cur];
            for &nb in &graph.vertex(cur).neighbours {
                if row[nb] == u32::MAX {
                    row[nb] = d + 1;
                    queue.push_back(nb);
                }
            }
        }
    }
    dist
}

fn all_pairs_predecessors(
    graph: &Graph,
    n: usize,
    dist: &[Vec<u32>],
) -> Vec<Vec<Option<usize>>> {
    let mut pred = vec![vec![None; n]; n];
    for src in 0..n {
        let mut visited = vec![false; n];
        visited[src] = true;
        let mut queue = VecDeque::from([src]);
        while let Some(cur) = queue.pop_front() {
            for &nb in &graph.vertex(cur).neighbours {
                if !visited[nb] && dist[src][nb] == dist[src][cur] + 1 {
                    visited[nb] = true;
                    pred[src][nb] = Some(cur);
                    queue.push_back(nb);
                }
            }
        }
    }
    pred
}

fn reconstruct_path(pred: &[Vec<Option<usize>>], src: usize, dst: usize) -> Vec<usize> {
    let mut path = vec![dst];
    let mut cur = dst;
    while cur != src {
        match pred[src][cur] {
            Some(p) => {
                path.push(p);
                cur = p;
            }
            None => return vec![],
        }
    }
    path.reverse();
    path
}

fn paths_share_internal_node(path_u: &[usize], path_v: &[usize]) -> bool {
    if path_u.len() < 2 || path_v.len() < 2 {
        return false;
    }
    path_u[1..].iter().any(|v| path_v[1..].contains(v))
}

fn ring_to_edge_bitvector(graph: &Graph, ring: &[usize], num_edges: usize) -> Vec<u64> {
    let mut bv = vec![0u64; num_edges.div_ceil(64)];
    let len = ring.len();
    for i in 0..len {
        if let Some(idx) = graph.edge_between(ring[i], ring[(i + 1) % len]) {
            bv[idx / 64] |= 1u64 << (idx % 64);
        }
    }
    bv
}

fn try_add_to_basis(basis: &mut Vec<Vec<u64>>, candidate: Vec<u64>) -> bool {
    let mut v = candidate;
    for row in basis.iter() {
        if let Some(p) = leading_bit(row) {
            if v[p / 64] & (1u64 << (p % 64)) != 0 {
                xor_into(&mut v, row);
            }
        }
    }
    if v.iter().all(|&w| w == 0) {
        return false;
    }
    // keep rows in echelon form: reduce existing rows by the new pivot
    if let Some(p) = leading_bit(&v) {
        for row in basis.iter_mut() {
            if row[p / 64] & (1u64 << (p % 64)) != 0 {
                xor_into(row, &v);
            }
        }
    }
    basis.push(v);
    true
}

fn leading_bit(bv: &[u64]) -> Option<usize> {
    for (i, &word) in bv.iter().enumerate() {
        if word != 0 {
            return Some(i * 64 + word.trailing_zeros() as usize);
        }
    }
    None
}

fn xor_into(a: &mut [u64], b: &[u64]) {
    for (aw, bw) in a.iter_mut().zip(b.iter()) {
        *aw ^= *bw;
    }
}

/// Rotates the ring to start at its lowest vertex, heading towards the
/// smaller of that vertex's two ring neighbours.
fn normalize_ring(ring: &[usize]) -> Vec<usize> {
    let Some(min_pos) = ring
        .iter()
        .enumerate()
        .min_by_key(|&(_, v)| v)
        .map(|(i, _)| i)
    else {
        return vec![];
    };
    let len = ring.len();
    let mut normalized: Vec<usize> = (0..len).map(|i| ring[(min_pos + i) % len]).collect();
    if len > 2 && normalized[1] > normalized[len - 1] {
        normalized[1..].reverse();
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::smiles::parse_smiles;

    fn perceived(s: &str) -> Graph {
        let mut g = build(&parse_smiles(s).unwrap(), true);
        perceive(&mut g);
        g
    }

    fn sizes(g: &Graph) -> Vec<usize> {
        g.rings.iter().map(Ring::size).collect()
    }

    #[test]
    fn acyclic() {
        let g = perceived("CCCC");
        assert!(g.rings.is_empty());
        assert!(g.ring_connections.is_empty());
    }

    #[test]
    fn cyclohexane() {
        let g = perceived("C1CCCCC1");
        assert_eq!(sizes(&g), vec![6]);
        assert_eq!(g.rings[0].members, vec![0, 1, 2, 3, 4, 5]);
        assert!(g.ring_connections.is_empty());
        assert!(g.vertices().all(|v| v.atom.rings == vec![0]));
    }

    #[test]
    fn cyclopropane() {
        assert_eq!(sizes(&perceived("C1CC1")), vec![3]);
    }

    #[test]
    fn benzene_is_aromatic() {
        let g = perceived("c1ccccc1");
        assert!(g.rings[0].is_aromatic);
        assert!(g.edges().all(|e| e.is_aromatic));
        let g = perceived("C1=CC=CC=C1");
        assert!(!g.rings[0].is_aromatic);
    }

    #[test]
    fn decalin_fused() {
        let g = perceived("C1CCC2CCCCC2C1");
        assert_eq!(sizes(&g), vec![6, 6]);
        assert_eq!(g.ring_connections.len(), 1);
        let c = &g.ring_connections[0];
        assert_eq!(c.vertices.len(), 2);
        assert!(!c.is_bridge);
        assert!(g.rings.iter().all(|r| !r.is_bridged));
    }

    #[test]
    fn naphthalene_smallest_rings() {
        // the fundamental cycle of label 1 is the 10-ring
        let g = perceived("c1ccc2ccccc2c1");
        assert_eq!(sizes(&g), vec![6, 6]);
        assert_eq!(g.ring_connections.len(), 1);
    }

    #[test]
    fn anthracene() {
        let g = perceived("c1ccc2cc3ccccc3cc2c1");
        assert_eq!(sizes(&g), vec![6, 6, 6]);
        assert_eq!(g.ring_connections.len(), 2);
    }

    #[test]
    fn spiro() {
        let g = perceived("C1CCC2(CC1)CCC2");
        assert_eq!(sizes(&g), vec![4, 6]);
        assert_eq!(g.ring_connections.len(), 1);
        assert!(g.ring_connections[0].is_spiro());
        assert!(!g.ring_connections[0].is_bridge);
    }

    #[test]
    fn norbornane_is_bridged() {
        let g = perceived("C1CC2CCC1C2");
        assert_eq!(sizes(&g), vec![5, 5]);
        assert_eq!(g.ring_connections.len(), 1);
        assert_eq!(g.ring_connections[0].vertices.len(), 3);
        assert!(g.ring_connections[0].is_bridge);
        assert!(g.rings.iter().all(|r| r.is_bridged));
    }

    #[test]
    fn equal_sizes_prefer_lower_label() {
        let g = perceived("C2CC1CCC2C1");
        assert_eq!(g.rings[0].closure_label, 1);
    }

    #[test]
    fn separate_ring_systems() {
        let g = perceived("C1CC1CCC1CCCC1");
        assert_eq!(sizes(&g), vec![3, 5]);
        assert_eq!(ring_systems(&g), vec![vec![0], vec![1]]);
    }

    #[test]
    fn fused_rings_form_one_system() {
        let g = perceived("c1ccc2ccccc2c1");
        assert_eq!(ring_systems(&g), vec![vec![0, 1]]);
    }

    #[test]
    fn regular_polygon_radius() {
        assert!((polygon_radius(6, 30.0) - 30.0).abs() < 1e-9);
        assert!((polygon_radius(4, 30.0) - 30.0 / 2f64.sqrt()).abs() < 1e-9);
    }
}
