//! Score grammars, one per source.
//!
//! - MEGADOCK (`ppiscore` output): the first line containing both `.out` and `E =`;
//!   the comma-separated field holding `E =` is followed by a float, possibly with
//!   trailing tokens.
//! - HDOCK (`createpl` complex): the first line starting with `REMARK Score:`; the
//!   remainder is a float.
//! - AlphaFold3 (`*_summary_confidences.json`): numeric `ptm` and `iptm` fields.
//!
//! Only the first line that carries the marker is considered. A marker line whose
//! number does not parse is a failure; later lines are never used as a fallback.

use crate::core::models::score::{Score, SourceKind};
use serde_json::Value;
use thiserror::Error;

pub const HDOCK_SCORE_MARKER: &str = "REMARK Score:";
pub const MEGADOCK_ENERGY_MARKER: &str = "E =";
pub const MEGADOCK_FILE_PATTERN: &str = ".out";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    #[error("No line in the {tool} output matches the score marker")]
    MarkerNotFound { tool: SourceKind },

    #[error("The {tool} score '{text}' is not a finite number")]
    InvalidNumber { tool: SourceKind, text: String },

    #[error("The {tool} output is not valid JSON: {reason}")]
    InvalidDocument { tool: SourceKind, reason: String },

    #[error("The {tool} output has no numeric '{field}' field")]
    MissingField {
        tool: SourceKind,
        field: &'static str,
    },
}

/// Extracts the scalar score of `tool` from `text`.
pub fn extract(tool: SourceKind, text: &str) -> Result<f64, ExtractionFailure> {
    parse_score(tool, text).map(|score| score.value())
}

/// Extracts the full score of `tool`, keeping AlphaFold's components.
pub fn parse_score(tool: SourceKind, text: &str) -> Result<Score, ExtractionFailure> {
    match tool {
        SourceKind::Megadock => parse_megadock(text).map(Score::Single),
        SourceKind::Hdock => parse_hdock(text).map(Score::Single),
        SourceKind::AlphaFold => parse_alphafold(text),
    }
}

fn parse_hdock(text: &str) -> Result<f64, ExtractionFailure> {
    let tool = SourceKind::Hdock;
    let remainder = text
        .lines()
        .find_map(|line| line.strip_prefix(HDOCK_SCORE_MARKER))
        .ok_or(ExtractionFailure::MarkerNotFound { tool })?;
    parse_finite(tool, remainder.trim())
}

fn parse_megadock(text: &str) -> Result<f64, ExtractionFailure> {
    let tool = SourceKind::Megadock;
    let line = text
        .lines()
        .find(|line| line.contains(MEGADOCK_FILE_PATTERN) && line.contains(MEGADOCK_ENERGY_MARKER))
        .ok_or(ExtractionFailure::MarkerNotFound { tool })?;

    let field = line
        .split(',')
        .find(|field| field.contains(MEGADOCK_ENERGY_MARKER))
        .ok_or(ExtractionFailure::MarkerNotFound { tool })?;
    let after_marker = field
        .split_once(MEGADOCK_ENERGY_MARKER)
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    let token = after_marker.split_whitespace().next().unwrap_or_default();
    parse_finite(tool, token)
}

fn parse_alphafold(text: &str) -> Result<Score, ExtractionFailure> {
    let tool = SourceKind::AlphaFold;
    let document: Value =
        serde_json::from_str(text).map_err(|e| ExtractionFailure::InvalidDocument {
            tool,
            reason: e.to_string(),
        })?;

    let field = |name: &'static str| {
        document
            .get(name)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .ok_or(ExtractionFailure::MissingField {
                tool,
                field: name,
            })
    };

    Ok(Score::Confidence {
        ptm: field("ptm")?,
        iptm: field("iptm")?,
    })
}

fn parse_finite(tool: SourceKind, text: &str) -> Result<f64, ExtractionFailure> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ExtractionFailure::InvalidNumber {
            tool,
            text: text.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hdock_score_is_read_from_the_remark_line() {
        let text = "REMARK Generated by createpl\nREMARK Score: -245.31\nATOM ...\n";
        assert_eq!(extract(SourceKind::Hdock, text), Ok(-245.31));
    }

    #[test]
    fn hdock_uses_only_the_first_marker_line() {
        let text = "REMARK Score: oops\nREMARK Score: -1.0\n";
        assert_eq!(
            extract(SourceKind::Hdock, text),
            Err(ExtractionFailure::InvalidNumber {
                tool: SourceKind::Hdock,
                text: "oops".to_string()
            })
        );
    }

    #[test]
    fn hdock_without_marker_fails() {
        assert_eq!(
            extract(SourceKind::Hdock, "ATOM 1\nEND\n"),
            Err(ExtractionFailure::MarkerNotFound {
                tool: SourceKind::Hdock
            })
        );
    }

    #[test]
    fn megadock_energy_field_is_parsed_with_trailing_tokens() {
        let text = "Reading decoys\nout/B-A.out, rank 1, E = 14.25 (kcal), zscore 3.1\n";
        assert_eq!(extract(SourceKind::Megadock, text), Ok(14.25));
    }

    #[test]
    fn megadock_requires_the_file_pattern_on_the_same_line() {
        let text = "E = 3.0\nB-A.out E = 9.5\n";
        assert_eq!(extract(SourceKind::Megadock, text), Ok(9.5));
    }

    #[test]
    fn megadock_malformed_number_is_not_fabricated() {
        let text = "B-A.out, E = -\n";
        assert!(matches!(
            extract(SourceKind::Megadock, text),
            Err(ExtractionFailure::InvalidNumber { .. })
        ));
        let text = "B-A.out, E = NaN\n";
        assert!(matches!(
            extract(SourceKind::Megadock, text),
            Err(ExtractionFailure::InvalidNumber { .. })
        ));
    }

    #[test]
    fn alphafold_score_sums_ptm_and_iptm() {
        let text = r#"{"ptm": 0.75, "iptm": 0.5, "ranking_score": 0.7}"#;
        assert_eq!(
            parse_score(SourceKind::AlphaFold, text),
            Ok(Score::Confidence {
                ptm: 0.75,
                iptm: 0.5
            })
        );
        assert_eq!(extract(SourceKind::AlphaFold, text), Ok(1.25));
    }

    #[test]
    fn alphafold_missing_or_null_iptm_fails() {
        let text = r#"{"ptm": 0.62, "iptm": null}"#;
        assert_eq!(
            extract(SourceKind::AlphaFold, text),
            Err(ExtractionFailure::MissingField {
                tool: SourceKind::AlphaFold,
                field: "iptm"
            })
        );
    }

    #[test]
    fn alphafold_invalid_json_fails_gracefully() {
        assert!(matches!(
            extract(SourceKind::AlphaFold, "{truncated"),
            Err(ExtractionFailure::InvalidDocument { .. })
        ));
    }

    #[test]
    fn empty_text_never_yields_a_score() {
        for kind in SourceKind::ALL {
            assert!(extract(kind, "").is_err());
        }
    }
}
