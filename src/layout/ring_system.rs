//! Local geometry of ring systems and their anchoring during the second tree
//! walk.

use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};
use std::f64::consts::PI;

use tracing::trace;

use super::tree::largest_gap;
use crate::graph::Graph;
use crate::options::LayoutOptions;
use crate::rings::{polygon_radius, ring_systems, system_vertices};
use crate::vector::{normalize_angle, Vector2};

const RELAX_ITERATIONS: usize = 300;
const RELAX_STEP: f64 = 0.1;
/// Non-bonded members closer than this many bond lengths push apart.
const REPULSION_RANGE: f64 = 1.5;

struct System {
    rings: Vec<usize>,
    /// Sorted member vertex ids.
    members: Vec<usize>,
    /// Coordinates in the system's own frame, parallel to `members`.
    local: Vec<Vector2>,
}

/// Ring-system geometry computed once per draw and stamped into the graph
/// when the tree walk first reaches a system.
pub(crate) struct RingPlacement {
    systems: Vec<System>,
    owner: Vec<Option<usize>>,
    provisional: Vec<Vector2>,
    embedded: Vec<bool>,
}

impl RingPlacement {
    pub(crate) fn new(graph: &Graph, options: &LayoutOptions, provisional: Vec<Vector2>) -> Self {
        let mut owner = vec![None; graph.vertex_count()];
        let systems: Vec<System> = ring_systems(graph)
            .into_iter()
            .enumerate()
            .map(|(idx, rings)| {
                let members = system_vertices(graph, &rings);
                for &m in &members {
                    owner[m] = Some(idx);
                }
                let coords = local_geometry(graph, &rings, options.bond_length);
                let local = members
                    .iter()
                    .map(|m| coords.get(m).copied().unwrap_or(Vector2::ZERO))
                    .collect();
                System {
                    rings,
                    members,
                    local,
                }
            })
            .collect();
        let embedded = vec![false; systems.len()];
        RingPlacement {
            systems,
            owner,
            provisional,
            embedded,
        }
    }

    pub(crate) fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Positions the whole ring system containing `v` if it has not been
    /// placed yet and returns its members.
    pub(crate) fn embed_at(&mut self, graph: &mut Graph, v: usize) -> Option<Vec<usize>> {
        let idx = self.owner.get(v).copied().flatten()?;
        if self.embedded[idx] {
            return None;
        }
        self.embedded[idx] = true;

        let system = &self.systems[idx];
        let parent = graph
            .vertex(v)
            .parent
            .filter(|&p| graph.vertex(p).positioned && system.members.binary_search(&p).is_err());
        let placed = match parent {
            Some(p) => self.anchor_at_entry(graph, system, v, p),
            None => self.fit_to_provisional(system),
        };
        for (&m, &pos) in system.members.iter().zip(placed.iter()) {
            let vertex = graph.vertex_mut(m);
            vertex.set_position(pos);
            vertex.force_positioned = true;
        }
        for &r in &system.rings {
            graph.rings[r].positioned = true;
        }
        trace!(system = idx, entry = v, anchored = parent.is_some(), "embedded ring system");
        Some(system.members.clone())
    }

    /// Writes centre and radius of every ring from the current positions.
    pub(crate) fn record_ring_geometry(&self, graph: &mut Graph) {
        for (system, &embedded) in self.systems.iter().zip(self.embedded.iter()) {
            for &r in &system.rings {
                let points: Vec<Vector2> = graph.rings[r]
                    .members
                    .iter()
                    .map(|&m| graph.position(m))
                    .collect();
                let center = Vector2::centroid(&points);
                let radius = points.iter().map(|p| p.distance(center)).sum::<f64>()
                    / points.len().max(1) as f64;
                let ring = &mut graph.rings[r];
                ring.center = center;
                ring.radius = radius;
                ring.positioned = embedded;
            }
        }
    }

    /// Rigidly moves the system so that the bond from `parent` enters the
    /// entry vertex through its exterior angle.
    fn anchor_at_entry(
        &self,
        graph: &Graph,
        system: &System,
        entry: usize,
        parent: usize,
    ) -> Vec<Vector2> {
        let Ok(e) = system.members.binary_search(&entry) else {
            return system.local.clone();
        };
        let entry_pos = graph.position(entry);
        let incoming = (graph.position(parent) - entry_pos).angle();
        let prov_entry = self.provisional[entry];
        let delta = incoming - (self.provisional[parent] - prov_entry).angle();
        let target: Vec<Vector2> = system
            .members
            .iter()
            .map(|&m| entry_pos + (self.provisional[m] - prov_entry).rotate(delta))
            .collect();

        let inside: Vec<usize> = graph
            .vertex(entry)
            .neighbours
            .iter()
            .filter_map(|n| system.members.binary_search(n).ok())
            .collect();
        let outside = graph.vertex(entry).neighbours.len() - inside.len();

        let mut best: Option<(f64, Vec<Vector2>)> = None;
        for mirror in [false, true] {
            let local = mirrored(&system.local, mirror);
            let angles: Vec<f64> = inside.iter().map(|&i| (local[i] - local[e]).angle()).collect();
            let (start, gap) = largest_gap(&angles);
            let slot = start + gap / (outside.max(1) + 1) as f64;
            let theta = incoming - slot;
            let placed: Vec<Vector2> = local
                .iter()
                .map(|&p| entry_pos + (p - local[e]).rotate(theta))
                .collect();
            let cost = displacement(&placed, &target);
            if best.as_ref().map_or(true, |(c, _)| cost < *c) {
                best = Some((cost, placed));
            }
        }
        best.map(|(_, placed)| placed)
            .unwrap_or_else(|| system.local.clone())
    }

    /// Least-squares rotation (mirror allowed) of the local frame onto the
    /// provisional positions, anchored at their centroid.
    fn fit_to_provisional(&self, system: &System) -> Vec<Vector2> {
        let target: Vec<Vector2> = system.members.iter().map(|&m| self.provisional[m]).collect();
        let target_center = Vector2::centroid(&target);

        let mut best: Option<(f64, Vec<Vector2>)> = None;
        for mirror in [false, true] {
            let local = mirrored(&system.local, mirror);
            let local_center = Vector2::centroid(&local);
            let (mut cross, mut dot) = (0.0, 0.0);
            for (l, t) in local.iter().zip(target.iter()) {
                let a = *l - local_center;
                let b = *t - target_center;
                cross += a.cross(b);
                dot += a.dot(b);
            }
            let phi = if cross.abs() < 1e-12 && dot.abs() < 1e-12 {
                0.0
            } else {
                cross.atan2(dot)
            };
            let placed: Vec<Vector2> = local
                .iter()
                .map(|&p| target_center + (p - local_center).rotate(phi))
                .collect();
            let cost = displacement(&placed, &target);
            if best.as_ref().map_or(true, |(c, _)| cost < *c) {
                best = Some((cost, placed));
            }
        }
        best.map(|(_, placed)| placed)
            .unwrap_or_else(|| system.local.clone())
    }
}

fn mirrored(points: &[Vector2], mirror: bool) -> Vec<Vector2> {
    if mirror {
        points.iter().map(|p| Vector2::new(p.x, -p.y)).collect()
    } else {
        points.to_vec()
    }
}

fn displacement(a: &[Vector2], b: &[Vector2]) -> f64 {
    a.iter().zip(b.iter()).map(|(p, q)| p.distance_sq(*q)).sum()
}

/// Coordinates of every member of the ring system made of `rings`, in a
/// frame centred on the largest ring.
fn local_geometry(graph: &Graph, rings: &[usize], bond_length: f64) -> BTreeMap<usize, Vector2> {
    let mut coords = BTreeMap::new();
    let Some(&first) = rings
        .iter()
        .max_by_key(|&&r| (graph.rings[r].size(), Reverse(r)))
    else {
        return coords;
    };

    let members = &graph.rings[first].members;
    let n = members.len();
    let radius = polygon_radius(n, bond_length);
    for (k, &m) in members.iter().enumerate() {
        let angle = PI / 2.0 + 2.0 * PI * k as f64 / n as f64;
        coords.insert(m, Vector2::from_angle(angle) * radius);
    }

    let mut centers: BTreeMap<usize, Vector2> = BTreeMap::new();
    centers.insert(first, Vector2::ZERO);
    let mut queue = VecDeque::from([first]);
    while let Some(current) = queue.pop_front() {
        let mut next: Vec<usize> = graph
            .ring_connections
            .iter()
            .filter_map(|c| c.other_ring(current))
            .filter(|r| !centers.contains_key(r) && rings.contains(r))
            .collect();
        next.sort_by_key(|&r| (Reverse(graph.rings[r].size()), r));
        next.dedup();
        for ring in next {
            if centers.contains_key(&ring) {
                continue;
            }
            let parent_center = centers[&current];
            place_ring(graph, ring, current, parent_center, bond_length, &mut coords);
            let points: Vec<Vector2> = graph.rings[ring]
                .members
                .iter()
                .filter_map(|m| coords.get(m).copied())
                .collect();
            centers.insert(ring, Vector2::centroid(&points));
            queue.push_back(ring);
        }
    }

    if rings.iter().any(|&r| graph.rings[r].is_bridged) {
        relax(graph, bond_length, &mut coords);
    }
    coords
}

/// Places the unplaced members of `ring`, which touches the already placed
/// ring `parent`.
fn place_ring(
    graph: &Graph,
    ring: usize,
    parent: usize,
    parent_center: Vector2,
    bond_length: f64,
    coords: &mut BTreeMap<usize, Vector2>,
) {
    let members = &graph.rings[ring].members;
    let n = members.len();
    let placed: Vec<usize> = (0..n).filter(|&i| coords.contains_key(&members[i])).collect();

    match placed.len() {
        0 => {
            trace!(ring, "ring touches nothing placed, using free polygon");
            let center = parent_center + Vector2::new(3.0 * bond_length, 0.0);
            let radius = polygon_radius(n, bond_length);
            for (k, &m) in members.iter().enumerate() {
                let angle = 2.0 * PI * k as f64 / n as f64;
                coords.insert(m, center + Vector2::from_angle(angle) * radius);
            }
        }
        1 => {
            // spiro: continue through the shared vertex
            let i = placed[0];
            let shared = coords[&members[i]];
            let radius = polygon_radius(n, bond_length);
            let center = shared + (shared - parent_center).normalized() * radius;
            let start = (shared - center).angle();
            for k in 1..n {
                let angle = start + 2.0 * PI * k as f64 / n as f64;
                coords.insert(members[(i + k) % n], center + Vector2::from_angle(angle) * radius);
            }
        }
        _ => {
            let parent_members = &graph.rings[parent].members;
            for &i in &placed {
                if coords.contains_key(&members[(i + 1) % n]) {
                    continue;
                }
                let mut j = (i + 1) % n;
                let mut run = Vec::new();
                while !coords.contains_key(&members[j]) {
                    run.push(members[j]);
                    j = (j + 1) % n;
                }
                let (u, w) = (members[i], members[j]);
                let others: Vec<Vector2> = members
                    .iter()
                    .filter(|&&m| m != u && m != w)
                    .filter_map(|m| coords.get(m).copied())
                    .collect();
                let reference = if !others.is_empty() {
                    Vector2::centroid(&others)
                } else if parent_members.contains(&u) && parent_members.contains(&w) {
                    parent_center
                } else {
                    let all: Vec<Vector2> = coords.values().copied().collect();
                    Vector2::centroid(&all)
                };
                let points = arc(coords[&u], coords[&w], reference, run.len(), bond_length);
                for (m, p) in run.into_iter().zip(points) {
                    coords.insert(m, p);
                }
            }
        }
    }
}

/// `count` points on a circular arc from `u` to `w` bulging away from
/// `reference`, spaced as the sides of a regular polygon where possible.
fn arc(u: Vector2, w: Vector2, reference: Vector2, count: usize, bond_length: f64) -> Vec<Vector2> {
    let chord = w - u;
    let d = chord.length();
    let mid = (u + w) * 0.5;
    let radius = polygon_radius(count + 2, bond_length).max(d / 2.0);
    let h = (radius * radius - d * d / 4.0).max(0.0).sqrt();
    let mut normal = chord.perpendicular().normalized();
    if d < 1e-9 {
        trace!("coincident arc endpoints");
        normal = (mid - reference).normalized();
    } else if (reference - mid).dot(normal) > 0.0 {
        normal = -normal;
    }
    let center = mid + normal * h;

    let start = (u - center).angle();
    let ccw = normalize_angle((w - center).angle() - start);
    let cw = ccw - 2.0 * PI;
    let bulge = |sweep: f64| {
        let p = center + Vector2::from_angle(start + sweep / 2.0) * radius;
        p.distance_sq(reference)
    };
    let sweep = if ccw > 1e-9 && bulge(ccw) >= bulge(cw) {
        ccw
    } else {
        cw
    };
    (1..=count)
        .map(|k| {
            let t = k as f64 / (count + 1) as f64;
            center + Vector2::from_angle(start + sweep * t) * radius
        })
        .collect()
}

/// Deterministic spring relaxation of a bridged system: bonds pull towards
/// `bond_length`, non-bonded members closer than the repulsion range push
/// apart.
fn relax(graph: &Graph, bond_length: f64, coords: &mut BTreeMap<usize, Vector2>) {
    let ids: Vec<usize> = coords.keys().copied().collect();
    let mut pos: Vec<Vector2> = coords.values().copied().collect();
    let n = ids.len();
    let mut bonded = vec![vec![false; n]; n];
    for a in 0..n {
        for b in (a + 1)..n {
            if graph.edge_between(ids[a], ids[b]).is_some() {
                bonded[a][b] = true;
                bonded[b][a] = true;
            }
        }
    }

    let range = REPULSION_RANGE * bond_length;
    for _ in 0..RELAX_ITERATIONS {
        let mut force = vec![Vector2::ZERO; n];
        for a in 0..n {
            for b in (a + 1)..n {
                let delta = pos[b] - pos[a];
                let d = delta.length();
                let dir = delta.normalized();
                let push = if bonded[a][b] {
                    d - bond_length
                } else if d < range {
                    d - range
                } else {
                    continue;
                };
                force[a] += dir * (push * 0.5);
                force[b] -= dir * (push * 0.5);
            }
        }
        for (p, f) in pos.iter_mut().zip(force.iter()) {
            *p += *f * RELAX_STEP;
        }
    }
    for (id, p) in ids.into_iter().zip(pos) {
        coords.insert(id, p);
    }
}

#[cfg(test)]
mod tests {
    use super::super::tree::place_tree;
    use super::*;
    use crate::builder::build;
    use crate::rings::perceive;
    use crate::smiles::parse_smiles;

    fn placed(s: &str) -> Graph {
        let options = LayoutOptions::default();
        let mut g = build(&parse_smiles(s).unwrap(), true);
        perceive(&mut g);
        place_tree(&mut g, &options, None);
        let mut placement = RingPlacement::new(&g, &options, g.positions());
        place_tree(&mut g, &options, Some(&mut placement));
        placement.record_ring_geometry(&mut g);
        g
    }

    fn ring_bond_lengths(g: &Graph) -> Vec<f64> {
        g.rings
            .iter()
            .flat_map(|r| r.bonds())
            .map(|(a, b)| g.position(a).distance(g.position(b)))
            .collect()
    }

    #[test]
    fn benzene_is_regular() {
        let g = placed("c1ccccc1");
        assert!(ring_bond_lengths(&g).iter().all(|d| (d - 30.0).abs() < 1e-6));
        let ring = &g.rings[0];
        assert!(ring.positioned);
        assert!((ring.radius - 30.0).abs() < 1e-6);
    }

    #[test]
    fn naphthalene_rings_share_an_edge() {
        let g = placed("c1ccc2ccccc2c1");
        assert!(ring_bond_lengths(&g).iter().all(|d| (d - 30.0).abs() < 1e-6));
        let d = g.rings[0].center.distance(g.rings[1].center);
        assert!((d - 30.0 * 3f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn substituent_points_away_from_ring() {
        let g = placed("Cc1ccccc1");
        let center = g.rings[0].center;
        assert!((g.position(0).distance(center) - 60.0).abs() < 1e-6);
    }

    #[test]
    fn spiro_centres_are_collinear_with_shared_atom() {
        let g = placed("C1CCC2(CC1)CC2");
        assert!(ring_bond_lengths(&g).iter().all(|d| (d - 30.0).abs() < 1e-6));
        let shared = g.position(3);
        let a = g.rings[0].center - shared;
        let b = g.rings[1].center - shared;
        assert!(a.cross(b).abs() < 1e-6);
        assert!(a.dot(b) < 0.0);
    }

    #[test]
    fn bridged_system_stays_bounded() {
        let g = placed("C1CC2CCC1C2");
        for d in ring_bond_lengths(&g) {
            assert!(d.is_finite() && d > 0.5 * 30.0 && d < 1.6 * 30.0, "{d}");
        }
    }

    #[test]
    fn separate_systems_are_embedded_independently() {
        let g = placed("c1ccccc1-c1ccccc1");
        assert_eq!(g.rings.len(), 2);
        assert!(ring_bond_lengths(&g).iter().all(|d| (d - 30.0).abs() < 1e-6));
        let d = g.rings[0].center.distance(g.rings[1].center);
        assert!((d - 90.0).abs() < 1e-6);
    }
}
