use serde::{Deserialize, Serialize};

use crate::error::DrawError;

/// How atoms are shown by a renderer. Layout treats all modes alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomVisualization {
    #[default]
    Default,
    Balls,
    #[serde(rename = "allballs")]
    AllBalls,
}

/// Geometric constants and switches for a draw request.
///
/// Deserializes from camelCase JSON; every missing key takes its default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutOptions {
    pub bond_length: f64,
    /// Perpendicular offset of the extra lines of double and triple bonds.
    pub bond_spacing: f64,
    /// Factor applied to ring bonds during tree placement and to the inner
    /// line of ring double bonds.
    pub short_bond_length: f64,
    /// Local overlap a subtree must exceed before the resolver moves it.
    pub overlap_sensitivity: f64,
    pub overlap_resolution_iterations: usize,
    pub font_size_large: f64,
    pub font_size_small: f64,
    pub atom_visualization: AtomVisualization,
    /// Keep chirality, isotopes and `/` `\` bonds.
    pub isomeric: bool,
    /// Raise phase summaries from `debug` to `info`.
    pub debug: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            bond_length: 30.0,
            bond_spacing: 0.17 * 30.0,
            short_bond_length: 0.8,
            overlap_sensitivity: 0.42,
            overlap_resolution_iterations: 6,
            font_size_large: 11.0,
            font_size_small: 3.0,
            atom_visualization: AtomVisualization::Default,
            isomeric: true,
            debug: false,
        }
    }
}

impl LayoutOptions {
    pub fn from_json(json: &str) -> Result<Self, DrawError> {
        let options: LayoutOptions =
            serde_json::from_str(json).map_err(|e| DrawError::Options(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), DrawError> {
        if !(self.bond_length.is_finite() && self.bond_length > 0.0) {
            return Err(DrawError::Options(format!(
                "bondLength must be positive, got {}",
                self.bond_length
            )));
        }
        let non_negative = [
            ("bondSpacing", self.bond_spacing),
            ("shortBondLength", self.short_bond_length),
            ("overlapSensitivity", self.overlap_sensitivity),
            ("fontSizeLarge", self.font_size_large),
            ("fontSizeSmall", self.font_size_small),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(DrawError::Options(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Radius around an atom label within which bonds count as crossing it.
    pub fn label_radius(&self) -> f64 {
        0.5 * (self.font_size_large + self.font_size_small)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let o = LayoutOptions::default();
        assert_eq!(o.bond_length, 30.0);
        assert!((o.bond_spacing - 5.1).abs() < 1e-12);
        assert_eq!(o.overlap_resolution_iterations, 6);
        assert!(o.isomeric);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let o = LayoutOptions::from_json(r#"{"bondLength": 40, "atomVisualization": "allballs"}"#)
            .unwrap();
        assert_eq!(o.bond_length, 40.0);
        assert_eq!(o.atom_visualization, AtomVisualization::AllBalls);
        assert_eq!(o.short_bond_length, 0.8);
    }

    #[test]
    fn camel_case_keys() {
        let o = LayoutOptions::from_json(
            r#"{"overlapResolutionIterations": 2, "overlapSensitivity": 0.1, "isomeric": false}"#,
        )
        .unwrap();
        assert_eq!(o.overlap_resolution_iterations, 2);
        assert_eq!(o.overlap_sensitivity, 0.1);
        assert!(!o.isomeric);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            LayoutOptions::from_json(r#"{"bondLength": 0}"#),
            Err(DrawError::Options(_))
        ));
        assert!(matches!(
            LayoutOptions::from_json(r#"{"bondLength": "long"}"#),
            Err(DrawError::Options(_))
        ));
        assert!(matches!(
            LayoutOptions::from_json(r#"{"bondSpacing": -1}"#),
            Err(DrawError::Options(_))
        ));
    }
}
