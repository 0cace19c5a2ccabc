//! Collapsing of terminal heteroatom groups into their carrier's label.

use tracing::trace;

use crate::element;
use crate::graph::Graph;

/// Hides terminal heteroatom groups such as CF3 or SO3H and attaches them
/// to the carrier atom as pseudo-elements. A second pass folds an acetyl
/// carrier (`O` plus `CH3`) into an `Ac` label on its heteroatom
/// neighbour. Hidden vertices still get positions.
pub fn collapse(graph: &mut Graph) {
    for v in 0..graph.vertex_count() {
        let vertex = graph.vertex(v);
        if vertex.atom.is_in_ring() || vertex.atom.element == "P" {
            continue;
        }
        let neighbours = graph.bonded_neighbours(v);
        if neighbours.len() < 3 {
            continue;
        }
        let degree = |n: usize| graph.bonded_neighbours(n).len();
        if vertex.atom.element == "C"
            && neighbours.len() == 3
            && neighbours.iter().all(|&n| graph.vertex(n).atom.element == "N")
        {
            // guanidine
            continue;
        }

        let hetero_terminals = neighbours
            .iter()
            .filter(|&&n| {
                let el = graph.vertex(n).atom.element.as_str();
                el != "C" && el != "H" && degree(n) == 1
            })
            .count();
        let non_terminal: Vec<usize> = neighbours
            .iter()
            .copied()
            .filter(|&n| degree(n) > 1)
            .collect();
        if non_terminal.len() > 1 || hetero_terminals < 2 {
            continue;
        }
        let previous = non_terminal
            .first()
            .map(|&n| graph.vertex(n).atom.element.clone());

        let hidden: Vec<(usize, String, u8, i8)> = neighbours
            .iter()
            .copied()
            .filter(|&n| degree(n) == 1)
            .map(|n| {
                let atom = &graph.vertex(n).atom;
                let (hydrogens, charge) = if atom.is_bracket {
                    (atom.bracket_hydrogens, atom.charge)
                } else {
                    let max = element::max_bonds(&atom.element).unwrap_or(0);
                    (max.saturating_sub(atom.bond_count), 0)
                };
                (n, atom.element.clone(), hydrogens, charge)
            })
            .collect();

        trace!(vertex = v, hidden = hidden.len(), "collapsing terminal group");
        for (n, el, hydrogens, charge) in hidden {
            graph.vertex_mut(n).atom.is_drawn = false;
            graph
                .vertex_mut(v)
                .atom
                .attach_pseudo_element(&el, previous.as_deref(), hydrogens, charge);
        }
    }

    for v in 0..graph.vertex_count() {
        let atom = &graph.vertex(v).atom;
        if atom.element == "C" || atom.element == "H" || !atom.is_drawn {
            continue;
        }
        let acetyls: Vec<usize> = graph
            .bonded_neighbours(v)
            .into_iter()
            .filter(|&n| is_acetyl(graph, n))
            .collect();
        for n in acetyls {
            graph.vertex_mut(n).atom.is_drawn = false;
            graph.vertex_mut(v).atom.attach_pseudo_element("Ac", None, 0, 0);
        }
    }
}

fn is_acetyl(graph: &Graph, v: usize) -> bool {
    let pseudo = &graph.vertex(v).atom.pseudo_elements;
    pseudo.len() == 2
        && pseudo
            .values()
            .any(|p| p.element == "O" && p.hydrogen_count == 0)
        && pseudo
            .values()
            .any(|p| p.element == "C" && p.hydrogen_count == 3)
}
