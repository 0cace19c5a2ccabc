use serde::Serialize;

use crate::builder::build;
use crate::error::DrawError;
use crate::formula::molecular_formula;
use crate::graph::Graph;
use crate::layout::{layout, phase, LayoutReport};
use crate::options::LayoutOptions;
use crate::pseudo;
use crate::rings::{perceive, Ring, RingConnection};
use crate::smiles::{parse_smiles, ParseTree};
use crate::vector::Vector2;

/// Turns SMILES into laid-out molecule graphs. Holds only options, so one
/// drawer can serve any number of requests.
#[derive(Debug, Clone, Default)]
pub struct Drawer {
    options: LayoutOptions,
}

impl Drawer {
    pub fn new(options: LayoutOptions) -> Result<Self, DrawError> {
        options.validate()?;
        Ok(Drawer { options })
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Parses and lays out `smiles`.
    ///
    /// ```
    /// let drawing = chemdepict::Drawer::default().draw("CCO").unwrap();
    /// assert_eq!(drawing.molecular_formula(), "C2H6O");
    /// ```
    pub fn draw(&self, smiles: &str) -> Result<Drawing, DrawError> {
        let tree = parse_smiles(smiles)?;
        Ok(self.draw_tree(&tree))
    }

    /// Lays out an already parsed tree. Never fails.
    pub fn draw_tree(&self, tree: &ParseTree) -> Drawing {
        let mut graph = build(tree, self.options.isomeric);
        perceive(&mut graph);
        pseudo::collapse(&mut graph);
        let report = layout(&mut graph, &self.options);
        let molecular_formula = molecular_formula(&graph);
        phase!(
            self.options,
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            formula = %molecular_formula,
            "drawing ready"
        );
        Drawing {
            graph,
            options: self.options.clone(),
            layout: report,
            molecular_formula,
        }
    }
}

/// A laid-out molecule ready for a renderer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawing {
    graph: Graph,
    options: LayoutOptions,
    layout: LayoutReport,
    molecular_formula: String,
}

impl Drawing {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn rings(&self) -> &[Ring] {
        &self.graph.rings
    }

    pub fn ring_connections(&self) -> &[RingConnection] {
        &self.graph.ring_connections
    }

    pub fn overlap_score(&self) -> f64 {
        self.layout.overlap_score
    }

    pub fn score_history(&self) -> &[f64] {
        &self.layout.score_history
    }

    pub fn molecular_formula(&self) -> &str {
        &self.molecular_formula
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Lower-left and upper-right corners of all vertex positions.
    pub fn bounding_box(&self) -> Option<(Vector2, Vector2)> {
        let mut points = self.graph.vertices().map(|v| v.position);
        let first = points.next()?;
        Some(points.fold((first, first), |(lo, hi), p| {
            (
                Vector2::new(lo.x.min(p.x), lo.y.min(p.y)),
                Vector2::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        }))
    }

    /// Segments a renderer strokes for edge `id`: one per bond order, the
    /// extra lines offset by the bond spacing. Ring double bonds get a
    /// shortened inner line; other double bonds are offset towards their
    /// substituents unless drawn centred.
    pub fn bond_lines(&self, id: usize) -> Vec<(Vector2, Vector2)> {
        if id >= self.graph.edge_count() {
            return Vec::new();
        }
        let edge = self.graph.edge(id);
        let a = self.graph.position(edge.source);
        let b = self.graph.position(edge.target);
        let normal = (b - a).perpendicular().normalized();
        let spacing = self.options.bond_spacing;

        match edge.weight {
            0 => Vec::new(),
            1 => vec![(a, b)],
            2 if !edge.center => {
                let (side, shorten) = match self.inner_side(id) {
                    Some(side) => (side, true),
                    None => (self.substituent_side(id), false),
                };
                let offset = normal * (side * spacing);
                let (mut c, mut d) = (a + offset, b + offset);
                if shorten {
                    let mid = (c + d) * 0.5;
                    let k = self.options.short_bond_length;
                    c = mid + (c - mid) * k;
                    d = mid + (d - mid) * k;
                }
                vec![(a, b), (c, d)]
            }
            n => {
                let half = f64::from(n - 1) / 2.0;
                (0..n)
                    .map(|i| {
                        let offset = normal * ((f64::from(i) - half) * spacing);
                        (a + offset, b + offset)
                    })
                    .collect()
            }
        }
    }

    /// Sign of the normal pointing into the first ring that contains the
    /// edge, if any.
    fn inner_side(&self, id: usize) -> Option<f64> {
        let edge = self.graph.edge(id);
        let ring = *self.graph.common_rings(edge.source, edge.target).first()?;
        let a = self.graph.position(edge.source);
        let b = self.graph.position(edge.target);
        let center = self.graph.rings[ring].center;
        Some(side_sign(a, b, center))
    }

    fn substituent_side(&self, id: usize) -> f64 {
        let edge = self.graph.edge(id);
        let (u, v) = (edge.source, edge.target);
        let others: Vec<Vector2> = self
            .graph
            .bonded_neighbours(u)
            .into_iter()
            .chain(self.graph.bonded_neighbours(v))
            .filter(|&n| n != u && n != v)
            .map(|n| self.graph.position(n))
            .collect();
        if others.is_empty() {
            return 1.0;
        }
        side_sign(
            self.graph.position(u),
            self.graph.position(v),
            Vector2::centroid(&others),
        )
    }
}

fn side_sign(a: Vector2, b: Vector2, towards: Vector2) -> f64 {
    if (b - a).cross(towards - a) < 0.0 {
        -1.0
    } else {
        1.0
    }
}
