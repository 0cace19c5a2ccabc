use thiserror::Error;

use crate::smiles::SmilesError;

/// Errors reported by [`Drawer`](crate::Drawer).
///
/// Layout itself never fails; degenerate geometry falls back to default
/// angles and positions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DrawError {
    /// The SMILES string is malformed.
    #[error(transparent)]
    Structural(#[from] SmilesError),
    /// Options JSON could not be read or holds an invalid value.
    #[error("invalid layout options: {0}")]
    Options(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_errors_convert() {
        let err: DrawError = SmilesError::UnclosedRing { label: 3 }.into();
        assert_eq!(err.to_string(), "unclosed ring 3");
    }

    #[test]
    fn options_message() {
        let err = DrawError::Options("bondLength must be positive, got 0".into());
        assert_eq!(
            err.to_string(),
            "invalid layout options: bondLength must be positive, got 0"
        );
    }
}
