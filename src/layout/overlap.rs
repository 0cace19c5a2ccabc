use std::f64::consts::PI;

use serde::Serialize;
use tracing::trace;

use crate::graph::Graph;
use crate::options::LayoutOptions;
use crate::vector::Vector2;

/// Rotation tried per resolver move: 20°.
pub const OVERLAP_ROTATION_STEP: f64 = PI / 9.0;

/// Fraction of the bond length an atom must keep from non-incident bonds.
const SEGMENT_CLEARANCE: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapScore {
    pub total: f64,
    /// Penalty attributed to each vertex; pair penalties count for both.
    pub per_vertex: Vec<f64>,
}

/// Heuristic layout quality: non-bonded atoms closer than a bond length, and
/// atoms sitting on bonds they are not part of. Zero means no overlap.
pub fn overlap_score(graph: &Graph, options: &LayoutOptions) -> OverlapScore {
    let n = graph.vertex_count();
    let b = options.bond_length;
    let mut total = 0.0;
    let mut per_vertex = vec![0.0; n];

    for u in 0..n {
        let pu = graph.position(u);
        for v in (u + 1)..n {
            if graph.edge_between(u, v).is_some() {
                continue;
            }
            let d = pu.distance(graph.position(v));
            if d < b {
                let penalty = (b - d) / b;
                total += penalty;
                per_vertex[u] += penalty;
                per_vertex[v] += penalty;
            }
        }
    }

    for u in 0..n {
        let atom = &graph.vertex(u).atom;
        let labelled = atom.element != "C" || atom.charge != 0 || atom.isotope != 0;
        let label = if labelled { options.label_radius() } else { 0.0 };
        let clearance = SEGMENT_CLEARANCE * b + label;
        if clearance <= 0.0 {
            continue;
        }
        let pu = graph.position(u);
        for edge in graph.edges() {
            if edge.weight == 0 || edge.source == u || edge.target == u {
                continue;
            }
            let (a, c) = (graph.position(edge.source), graph.position(edge.target));
            let d = pu.distance_to_segment(a, c);
            if d < clearance {
                let penalty = (clearance - d) / clearance;
                total += penalty;
                per_vertex[u] += penalty;
            }
        }
    }

    OverlapScore { total, per_vertex }
}

/// Greedy local search over subtree rotations and ring-system mirrors.
/// Returns the total score before the first iteration and after every
/// iteration that accepted a move.
pub(crate) fn resolve(graph: &mut Graph, options: &LayoutOptions) -> Vec<f64> {
    let mut current = overlap_score(graph, options);
    let mut history = vec![current.total];

    for iteration in 0..options.overlap_resolution_iterations {
        let mut accepted = false;
        for (c, parent) in candidates(graph, options, &current) {
            let subtree = graph.subtree(c);
            let original: Vec<Vector2> = subtree.iter().map(|&v| graph.position(v)).collect();
            let pivot = graph.position(parent);
            let axis = graph.position(c);

            let rotated = |step: f64| -> Vec<Vector2> {
                original.iter().map(|p| p.rotate_around(step, pivot)).collect()
            };
            let mut trials = vec![
                rotated(OVERLAP_ROTATION_STEP),
                rotated(-OVERLAP_ROTATION_STEP),
            ];
            if subtree.iter().any(|&v| graph.vertex(v).atom.is_in_ring()) {
                trials.push(original.iter().map(|p| p.reflect(pivot, axis)).collect());
            }

            let mut best: Option<(OverlapScore, Vec<Vector2>)> = None;
            for trial in trials {
                apply(graph, &subtree, &trial);
                let score = overlap_score(graph, options);
                let bar = best.as_ref().map_or(current.total, |(s, _)| s.total);
                if score.total < bar - 1e-12 {
                    best = Some((score, trial));
                }
            }
            match best {
                Some((score, trial)) => {
                    apply(graph, &subtree, &trial);
                    trace!(
                        iteration,
                        vertex = c,
                        from = current.total,
                        to = score.total,
                        "accepted overlap move"
                    );
                    current = score;
                    accepted = true;
                }
                None => apply(graph, &subtree, &original),
            }
        }
        if !accepted {
            break;
        }
        history.push(current.total);
    }
    history
}

/// Subtrees hanging from a non-ring bond whose local overlap exceeds the
/// sensitivity, worst first.
fn candidates(
    graph: &Graph,
    options: &LayoutOptions,
    score: &OverlapScore,
) -> Vec<(usize, usize)> {
    let mut out: Vec<(f64, usize, usize)> = Vec::new();
    for c in 0..graph.vertex_count() {
        let Some(parent) = graph.vertex(c).parent else {
            continue;
        };
        let Some(e) = graph.edge_between(parent, c) else {
            continue;
        };
        if graph.edge(e).weight == 0 || graph.is_ring_edge(e) {
            continue;
        }
        let local: f64 = graph.subtree(c).iter().map(|&v| score.per_vertex[v]).sum();
        if local > options.overlap_sensitivity {
            out.push((local, c, parent));
        }
    }
    out.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    out.into_iter().map(|(_, c, p)| (c, p)).collect()
}

fn apply(graph: &mut Graph, vertices: &[usize], positions: &[Vector2]) {
    for (&v, &p) in vertices.iter().zip(positions.iter()) {
        graph.vertex_mut(v).position = p;
    }
}
