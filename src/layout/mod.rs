//! 2D coordinate generation.
//!
//! A draw request runs the phases of [`LayoutState`] exactly once, in order:
//! a provisional tree walk, ring-system placement with a second tree walk,
//! overlap resolution, stereo correction, and final bond flags.

mod overlap;
mod ring_system;
mod stereo;
mod tree;

use serde::Serialize;
use tracing::trace;

use crate::graph::Graph;
use crate::options::LayoutOptions;
use crate::vector::Vector2;

pub use overlap::{overlap_score, OverlapScore, OVERLAP_ROTATION_STEP};
pub use stereo::handedness;

/// Logs a phase summary at `info` when the options ask for debug output and
/// at `debug` otherwise.
macro_rules! phase {
    ($options:expr, $($arg:tt)+) => {
        if $options.debug {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}
pub(crate) use phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LayoutState {
    Unplaced,
    TreePlaced,
    RingPlaced,
    OverlapResolved,
    StereoAdjusted,
    Done,
}

/// What the layout pass leaves besides the coordinates in the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutReport {
    pub state: LayoutState,
    /// Total overlap score before the first and after every accepted
    /// resolver iteration.
    pub score_history: Vec<f64>,
    pub overlap_score: f64,
}

/// Computes coordinates, wedges and double-bond flags for every vertex and
/// edge of `graph`. Expects ring perception to have run.
pub fn layout(graph: &mut Graph, options: &LayoutOptions) -> LayoutReport {
    let mut state = LayoutState::Unplaced;
    let mut report = LayoutReport {
        state,
        score_history: Vec::new(),
        overlap_score: 0.0,
    };
    if graph.vertex_count() == 0 {
        report.state = LayoutState::Done;
        return report;
    }

    let mut turns = tree::place_tree(graph, options, None);
    advance(&mut state, LayoutState::TreePlaced);

    let provisional = graph.positions();
    let mut placement = ring_system::RingPlacement::new(graph, options, provisional);
    if !graph.rings.is_empty() {
        turns = tree::place_tree(graph, options, Some(&mut placement));
    }
    placement.record_ring_geometry(graph);
    advance(&mut state, LayoutState::RingPlaced);
    phase!(
        options,
        vertices = graph.vertex_count(),
        rings = graph.rings.len(),
        systems = placement.system_count(),
        "placed tree and ring systems"
    );

    report.score_history = overlap::resolve(graph, options);
    advance(&mut state, LayoutState::OverlapResolved);

    stereo::enforce_cis_trans(graph);
    stereo::assign_wedges(graph, options);
    advance(&mut state, LayoutState::StereoAdjusted);

    finish(graph, options, &turns);
    placement.record_ring_geometry(graph);
    report.overlap_score = overlap_score(graph, options).total;
    advance(&mut state, LayoutState::Done);
    report.state = state;
    phase!(
        options,
        score = report.overlap_score,
        iterations = report.score_history.len().saturating_sub(1),
        "layout done"
    );
    report
}

fn advance(state: &mut LayoutState, next: LayoutState) {
    debug_assert!(next > *state);
    trace!(from = ?*state, to = ?next, "layout state");
    *state = next;
}

/// Replaces non-finite coordinates and flags symmetric double bonds.
fn finish(graph: &mut Graph, options: &LayoutOptions, turns: &[f64]) {
    for v in 0..graph.vertex_count() {
        if graph.position(v).is_finite() {
            continue;
        }
        let fallback = graph
            .vertex(v)
            .parent
            .map(|p| graph.position(p))
            .filter(|p| p.is_finite())
            .unwrap_or(Vector2::ZERO);
        let turn = turns.get(v).copied().unwrap_or(1.0);
        trace!(vertex = v, "non-finite position, using fallback");
        let offset = Vector2::from_angle(turn * tree::DEFAULT_ANGLE) * options.bond_length;
        graph.vertex_mut(v).set_position(fallback + offset);
    }

    for e in 0..graph.edge_count() {
        let edge = graph.edge(e);
        if edge.weight != 2 || graph.is_ring_edge(e) {
            continue;
        }
        let (a, b) = (edge.source, edge.target);
        let center =
            graph.bonded_neighbours(a).len() == 1 || graph.bonded_neighbours(b).len() == 1;
        graph.edge_mut(e).center = center;
    }
}
