use std::f64::consts::PI;

use tracing::trace;

use super::ring_system::RingPlacement;
use crate::graph::Graph;
use crate::options::LayoutOptions;
use crate::vector::{angle_between, normalize_angle, Vector2};

/// Direction from the root towards its virtual parent.
pub(crate) const ROOT_BACK_ANGLE: f64 = 7.0 * PI / 6.0;
/// Angle of the first bond when nothing else constrains it.
pub(crate) const DEFAULT_ANGLE: f64 = PI / 6.0;
/// Chain continuation relative to the incoming bond: a 120° bond angle.
const ZIGZAG_ANGLE: f64 = 2.0 * PI / 3.0;

/// Start angle and width of the widest free sector around a vertex whose
/// bonds point at `occupied`.
pub(crate) fn largest_gap(occupied: &[f64]) -> (f64, f64) {
    if occupied.is_empty() {
        return (0.0, 2.0 * PI);
    }
    let mut angles: Vec<f64> = occupied.iter().map(|&a| normalize_angle(a)).collect();
    angles.sort_by(f64::total_cmp);
    let last = angles[angles.len() - 1];
    let mut best = (last, angles[0] + 2.0 * PI - last);
    for w in angles.windows(2) {
        let gap = w[1] - w[0];
        if gap > best.1 + 1e-9 {
            best = (w[0], gap);
        }
    }
    best
}

/// `count` evenly spaced angles strictly inside the sector.
pub(crate) fn spread(start: f64, gap: f64, count: usize) -> Vec<f64> {
    (1..=count)
        .map(|i| start + gap * i as f64 / (count + 1) as f64)
        .collect()
}

/// Walks the spanning tree from vertex 0 placing every child relative to its
/// parent. Returns the zig-zag turn sign of every vertex.
///
/// Without `rings` this is the provisional pass: ring bonds are drawn short
/// and rings are ignored. With `rings`, every ring system is embedded as a
/// rigid block the first time the walk reaches it.
pub(crate) fn place_tree(
    graph: &mut Graph,
    options: &LayoutOptions,
    mut rings: Option<&mut RingPlacement>,
) -> Vec<f64> {
    let n = graph.vertex_count();
    for v in 0..n {
        let vertex = graph.vertex_mut(v);
        vertex.positioned = false;
        vertex.force_positioned = false;
    }
    let mut turns = vec![1.0; n];
    if n == 0 {
        return turns;
    }
    turns[0] = -1.0;
    graph.vertex_mut(0).set_position(Vector2::ZERO);

    let mut stack = vec![0];
    while let Some(v) = stack.pop() {
        if let Some(placement) = rings.as_deref_mut() {
            if let Some(members) = placement.embed_at(graph, v) {
                stack.extend(members.into_iter().rev().filter(|&m| m != v));
            }
        }
        let placed = place_children(graph, options, &mut turns, v);
        stack.extend(placed.into_iter().rev());
    }

    for v in 0..n {
        if graph.vertex(v).positioned {
            continue;
        }
        // unreachable from the root; park it next to its parent or the origin
        let anchor = graph
            .vertex(v)
            .parent
            .map(|p| graph.position(p))
            .unwrap_or(Vector2::ZERO);
        trace!(vertex = v, "unreached vertex placed at fallback position");
        graph
            .vertex_mut(v)
            .set_position(anchor + Vector2::from_angle(DEFAULT_ANGLE) * options.bond_length);
    }
    turns
}

/// Places the unpositioned spanning-tree children of `v` and returns them in
/// parse order.
fn place_children(
    graph: &mut Graph,
    options: &LayoutOptions,
    turns: &mut [f64],
    v: usize,
) -> Vec<usize> {
    let vertex = graph.vertex(v);
    let pending: Vec<usize> = vertex
        .children
        .iter()
        .copied()
        .filter(|&c| !graph.vertex(c).positioned)
        .collect();
    if pending.is_empty() {
        return pending;
    }
    let origin = vertex.position;
    let occupied: Vec<f64> = vertex
        .neighbours
        .iter()
        .filter(|&&n| graph.vertex(n).positioned)
        .map(|&n| (graph.position(n) - origin).angle())
        .collect();
    let back = match vertex.parent.filter(|&p| graph.vertex(p).positioned) {
        Some(p) => (graph.position(p) - origin).angle(),
        None => occupied.first().copied().unwrap_or(ROOT_BACK_ANGLE),
    };
    let in_ring = vertex.atom.is_in_ring();
    let turn = turns[v];

    let angles = if occupied.len() <= 1 && pending.len() == 1 {
        if occupied.is_empty() || continues_straight(graph, v, pending[0]) {
            vec![back + PI]
        } else {
            vec![back + turn * ZIGZAG_ANGLE]
        }
    } else {
        let base = if occupied.is_empty() { vec![back] } else { occupied };
        let (start, gap) = largest_gap(&base);
        let mut slots = spread(start, gap, pending.len());
        if base.len() == 1 && !in_ring {
            // the chain continuation keeps the zig-zag
            let target = back + turn * ZIGZAG_ANGLE;
            let best = (0..slots.len()).min_by(|&a, &b| {
                angle_between(slots[a], target).total_cmp(&angle_between(slots[b], target))
            });
            if let Some(best) = best {
                let slot = slots.remove(best);
                slots.push(slot);
            }
        }
        slots
    };

    for (&child, &angle) in pending.iter().zip(angles.iter()) {
        let length = bond_length_to(graph, options, v, child);
        graph
            .vertex_mut(child)
            .set_position(origin + Vector2::from_angle(angle) * length);
        turns[child] = -turn;
    }
    pending
}

fn bond_length_to(graph: &Graph, options: &LayoutOptions, v: usize, child: usize) -> f64 {
    match graph.edge_between(v, child) {
        Some(e) if graph.edge(e).weight == 0 => 2.0 * options.bond_length,
        Some(e) if graph.is_ring_edge(e) => options.bond_length * options.short_bond_length,
        _ => options.bond_length,
    }
}

/// Triple bonds, cumulated double bonds and fragment separators are drawn
/// without a bend.
fn continues_straight(graph: &Graph, v: usize, child: usize) -> bool {
    let weight = |a: usize, b: usize| graph.edge_between(a, b).map(|e| graph.edge(e).weight);
    let out = weight(v, child);
    let incoming = graph.vertex(v).parent.and_then(|p| weight(p, v));
    matches!(out, Some(0) | Some(3))
        || incoming == Some(3)
        || (out == Some(2) && incoming == Some(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::smiles::parse_smiles;

    fn provisional(s: &str) -> Graph {
        let mut g = build(&parse_smiles(s).unwrap(), true);
        crate::rings::perceive(&mut g);
        place_tree(&mut g, &LayoutOptions::default(), None);
        g
    }

    fn bond_angle(g: &Graph, a: usize, b: usize, c: usize) -> f64 {
        let u = g.position(a) - g.position(b);
        let w = g.position(c) - g.position(b);
        angle_between(u.angle(), w.angle())
    }

    #[test]
    fn largest_gap_wraps() {
        let (start, gap) = largest_gap(&[0.0]);
        assert_eq!(start, 0.0);
        assert!((gap - 2.0 * PI).abs() < 1e-12);
        let (start, gap) = largest_gap(&[0.0, PI / 2.0]);
        assert!((start - PI / 2.0).abs() < 1e-12);
        assert!((gap - 1.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn chain_zig_zags() {
        let g = provisional("CCCCC");
        for i in 1..4 {
            assert!((bond_angle(&g, i - 1, i, i + 1) - ZIGZAG_ANGLE).abs() < 1e-9);
        }
        // alternating sides keep the chain extended
        assert!(g.position(0).distance(g.position(2)) > 1.7 * 30.0);
        assert!(g.position(0).distance(g.position(4)) > 3.4 * 30.0);
    }

    #[test]
    fn bonds_have_bond_length() {
        let g = provisional("CC(C)(C)CO");
        for e in g.edges() {
            let d = g.position(e.source).distance(g.position(e.target));
            assert!((d - 30.0).abs() < 1e-9);
        }
    }

    #[test]
    fn triple_bond_is_linear() {
        let g = provisional("CC#CC");
        assert!((bond_angle(&g, 0, 1, 2) - PI).abs() < 1e-9);
        assert!((bond_angle(&g, 1, 2, 3) - PI).abs() < 1e-9);
    }

    #[test]
    fn cumulated_double_bonds_are_linear() {
        let g = provisional("C=C=C");
        assert!((bond_angle(&g, 0, 1, 2) - PI).abs() < 1e-9);
    }

    #[test]
    fn branches_spread_evenly() {
        let g = provisional("CC(C)(C)C");
        let mut angles: Vec<f64> = [2, 3, 4].iter().map(|&c| bond_angle(&g, 0, 1, c)).collect();
        angles.sort_by(f64::total_cmp);
        let expected = [PI / 2.0, PI / 2.0, PI];
        for (a, e) in angles.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-9);
        }
    }

    #[test]
    fn fragments_are_twice_as_far() {
        let g = provisional("C.C");
        assert!((g.position(0).distance(g.position(1)) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn ring_bonds_are_short_in_the_provisional_pass() {
        let g = provisional("C1CCCCC1");
        let d = g.position(0).distance(g.position(1));
        assert!((d - 24.0).abs() < 1e-9);
    }
}
