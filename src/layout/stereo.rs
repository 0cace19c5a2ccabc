//! Stereo corrections applied after overlap resolution: cis/trans geometry
//! of marked double bonds and wedge assignment at stereocenters.

use tracing::trace;

use crate::atom::Chirality;
use crate::bond::{BondSymbol, Wedge};
use crate::graph::Graph;
use crate::options::LayoutOptions;

const CIS_TRANS_PASSES: usize = 2;

/// Mirrors the lighter side of every non-ring double bond whose `/` `\`
/// markers disagree with the drawn geometry.
pub(crate) fn enforce_cis_trans(graph: &mut Graph) {
    for _ in 0..CIS_TRANS_PASSES {
        let mut changed = false;
        for e in 0..graph.edge_count() {
            let edge = graph.edge(e);
            if edge.weight != 2 || graph.is_ring_edge(e) {
                continue;
            }
            let (u, v) = (edge.source, edge.target);
            let (Some((a, da)), Some((b, db))) = (marker(graph, u, v), marker(graph, v, u)) else {
                continue;
            };
            // `da` is read from u towards a, `db` from v towards b
            let want_trans = da.reversed() == db;
            let (pu, pv) = (graph.position(u), graph.position(v));
            let axis = pv - pu;
            let side_a = axis.cross(graph.position(a) - pu);
            let side_b = axis.cross(graph.position(b) - pu);
            if side_a == 0.0 || side_b == 0.0 {
                trace!(edge = e, "degenerate double bond geometry");
                continue;
            }
            let is_trans = side_a.signum() != side_b.signum();
            if is_trans == want_trans {
                continue;
            }
            let near = graph.side_of(u, v);
            let far = graph.side_of(v, u);
            let flipped = if far.len() <= near.len() { far } else { near };
            trace!(edge = e, moved = flipped.len(), "re-mirroring double bond side");
            for w in flipped {
                let p = graph.position(w).reflect(pu, pv);
                graph.vertex_mut(w).position = p;
            }
            changed = true;
        }
        if !changed {
            break;
        }
    }
}

/// First neighbour of `u` other than `across` joined by a directional bond,
/// with the bond direction read from `u` towards that neighbour.
fn marker(graph: &Graph, u: usize, across: usize) -> Option<(usize, BondSymbol)> {
    graph
        .bonded_neighbours(u)
        .into_iter()
        .filter(|&n| n != across)
        .find_map(|n| {
            let e = graph.edge_between(u, n)?;
            graph.edge(e).direction_from(n).map(|d| (n, d.reversed()))
        })
}

/// Gives every stereocenter exactly one wedged bond whose direction
/// reproduces its chirality tag.
pub(crate) fn assign_wedges(graph: &mut Graph, options: &LayoutOptions) {
    for v in 0..graph.vertex_count() {
        let atom = &graph.vertex(v).atom;
        if !atom.is_stereo_center || atom.chirality == Chirality::None {
            continue;
        }
        let chirality = atom.chirality;
        let Some(e) = wedge_candidate(graph, v) else {
            trace!(vertex = v, "stereocenter without a wedge candidate");
            continue;
        };
        let Some(n) = graph.edge(e).other(v) else {
            continue;
        };
        let wedge = match orientation(graph, v, n, options.bond_length) {
            Some(c) if c == chirality => Wedge::Up,
            Some(_) => Wedge::Down,
            None => {
                trace!(vertex = v, "degenerate stereocenter geometry, defaulting to up");
                Wedge::Up
            }
        };
        let edge = graph.edge_mut(e);
        if edge.source != v {
            std::mem::swap(&mut edge.source, &mut edge.target);
            edge.bond_type = edge.bond_type.reversed();
        }
        edge.wedge = wedge;
    }
}

/// The incident bond that carries the wedge: non-ring single bonds first,
/// preferring neighbours without a wedge of their own, hydrogens and
/// low-degree atoms. Bonds already wedged by another stereocenter are
/// never taken.
fn wedge_candidate(graph: &Graph, v: usize) -> Option<usize> {
    graph
        .bonded_neighbours(v)
        .into_iter()
        .filter_map(|n| graph.edge_between(v, n).map(|e| (n, e)))
        .filter(|&(_, e)| graph.edge(e).wedge == Wedge::None)
        .min_by_key(|&(n, e)| {
            let neighbour = graph.vertex(n);
            let wedged = graph
                .incident_edges(n)
                .into_iter()
                .any(|other| other != e && graph.edge(other).wedge != Wedge::None);
            (
                graph.is_ring_edge(e),
                graph.edge(e).weight != 1,
                wedged,
                !neighbour.atom.is_hydrogen(),
                neighbour.degree(),
                e,
            )
        })
        .map(|(_, e)| e)
}

/// Handedness of `center` with `lifted` raised `z` above the drawing plane,
/// or `None` when the neighbours are not in a usable arrangement.
fn orientation(graph: &Graph, center: usize, lifted: usize, z: f64) -> Option<Chirality> {
    let neighbours = graph.bonded_neighbours(center);
    let lift = |n: usize| {
        let p = graph.position(n);
        [p.x, p.y, if n == lifted { z } else { 0.0 }]
    };
    let mut points: Vec<[f64; 3]> = neighbours.iter().map(|&n| lift(n)).collect();
    match points.len() {
        4 => {}
        3 => {
            // implicit hydrogen or lone pair sits at the centre, after the
            // preceding atom when one is bonded
            let c = graph.position(center);
            let preceded = graph
                .vertex(center)
                .parent
                .is_some_and(|p| neighbours.contains(&p));
            let at = usize::from(preceded);
            points.insert(at, [c.x, c.y, 0.0]);
        }
        _ => return None,
    }
    let col = |i: usize| {
        [
            points[i][0] - points[0][0],
            points[i][1] - points[0][1],
            points[i][2] - points[0][2],
        ]
    };
    let (a, b, c) = (col(1), col(2), col(3));
    let det = a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
        + a[2] * (b[0] * c[1] - b[1] * c[0]);
    if det.abs() < 1e-9 {
        None
    } else if det < 0.0 {
        Some(Chirality::Ccw)
    } else {
        Some(Chirality::Cw)
    }
}

/// Chirality implied by the drawn wedge at `center`, read back from the
/// final coordinates.
pub fn handedness(graph: &Graph, center: usize) -> Option<Chirality> {
    let e = graph
        .incident_edges(center)
        .into_iter()
        .find(|&e| graph.edge(e).source == center && graph.edge(e).wedge != Wedge::None)?;
    let edge = graph.edge(e);
    let z = match edge.wedge {
        Wedge::Up => 1.0,
        Wedge::Down => -1.0,
        Wedge::None => return None,
    };
    orientation(graph, center, edge.target, z)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use super::*;
    use crate::builder::build;
    use crate::vector::Vector2;
    use crate::layout::layout;
    use crate::rings::perceive;
    use crate::smiles::parse_smiles;

    fn drawn(s: &str) -> Graph {
        let mut g = build(&parse_smiles(s).unwrap(), true);
        perceive(&mut g);
        layout(&mut g, &LayoutOptions::default());
        g
    }

    fn wedged(g: &Graph) -> Vec<usize> {
        g.edges()
            .filter(|e| e.wedge != Wedge::None)
            .map(|e| e.id)
            .collect()
    }

    #[test]
    fn one_wedge_per_stereocenter() {
        for s in ["F[C@H](Cl)Br", "F[C@@H](Cl)Br", "N[C@@H](C)C(=O)O", "C[C@](F)(Cl)Br"] {
            let g = drawn(s);
            let wedges = wedged(&g);
            assert_eq!(wedges.len(), 1, "{s}");
            let center = g.vertices().find(|v| v.atom.is_stereo_center).unwrap().id;
            assert_eq!(g.edge(wedges[0]).source, center, "{s}");
            assert_eq!(handedness(&g, center), Some(g.vertex(center).atom.chirality), "{s}");
        }
    }

    #[test]
    fn opposite_tags_give_opposite_wedges() {
        let a = drawn("C[C@](F)(Cl)Br");
        let b = drawn("C[C@@](F)(Cl)Br");
        assert_eq!(a.positions(), b.positions());
        let wa = a.edge(wedged(&a)[0]);
        let wb = b.edge(wedged(&b)[0]);
        assert_eq!(wa.target, wb.target);
        assert_ne!(wa.wedge, wb.wedge);
    }

    #[test]
    fn fragment_parent_does_not_precede_the_lone_pair() {
        let oriented = |s: &str, center: usize| {
            let mut g = build(&parse_smiles(s).unwrap(), true);
            let ns = g.bonded_neighbours(center);
            for (k, &n) in ns.iter().enumerate() {
                let p = Vector2::from_angle(k as f64 * 2.0 * PI / 3.0) * 30.0;
                g.vertex_mut(n).set_position(p);
            }
            g.vertex_mut(center).set_position(Vector2::new(0.0, 0.0));
            orientation(&g, center, ns[0], 30.0)
        };
        let dotted = oriented("C.[S@](=O)(C)C", 1);
        assert!(dotted.is_some());
        assert_eq!(dotted, oriented("[S@](=O)(C)C", 0));
    }

    #[test]
    fn bond_wedged_by_a_neighbouring_center_is_not_reused() {
        let g = drawn("C1CCC2CCCC[C@@]2(C1)[C@]34CCCCC3CCCC4");
        let centers: Vec<usize> = g
            .vertices()
            .filter(|v| v.atom.is_stereo_center)
            .map(|v| v.id)
            .collect();
        assert_eq!(centers.len(), 2);
        for c in centers {
            let own = g
                .edges()
                .filter(|e| e.source == c && e.wedge != Wedge::None)
                .count();
            assert_eq!(own, 1, "center {c}");
        }
    }

    #[test]
    fn ring_stereocenter_prefers_exocyclic_bond() {
        let g = drawn("C[C@H]1CCCCO1");
        let e = g.edge(wedged(&g)[0]);
        assert!(!g.is_ring_edge(e.id));
    }

    fn is_trans(g: &Graph, a: usize, u: usize, v: usize, b: usize) -> bool {
        let axis = g.position(v) - g.position(u);
        let sa = axis.cross(g.position(a) - g.position(u));
        let sb = axis.cross(g.position(b) - g.position(u));
        sa.signum() != sb.signum()
    }

    #[test]
    fn cis_trans_markers_hold() {
        assert!(is_trans(&drawn("F/C=C/F"), 0, 1, 2, 3));
        assert!(!is_trans(&drawn("F/C=C\\F"), 0, 1, 2, 3));
        assert!(!is_trans(&drawn("C(/F)=C/F"), 1, 0, 2, 3));
        assert!(is_trans(&drawn("C(\\F)=C/F"), 1, 0, 2, 3));
    }

    #[test]
    fn longer_chains_keep_cis_geometry() {
        let g = drawn("CC/C=C\\CC");
        assert!(!is_trans(&g, 1, 2, 3, 4));
    }
}
