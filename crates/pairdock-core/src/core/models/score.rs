use super::ids::PairKey;
use phf::{Map, phf_map};
use std::fmt;

/// A score source: one external tool whose per-pair output is reduced to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    Megadock,
    Hdock,
    AlphaFold,
}

static SOURCE_NAMES: Map<&'static str, SourceKind> = phf_map! {
    "megadock" => SourceKind::Megadock,
    "hdock" => SourceKind::Hdock,
    "alphafold" => SourceKind::AlphaFold,
    "alphafold3" => SourceKind::AlphaFold,
    "af" => SourceKind::AlphaFold,
    "af3" => SourceKind::AlphaFold,
};

impl SourceKind {
    /// Canonical column order of the merged table.
    pub const ALL: [SourceKind; 3] = [SourceKind::Megadock, SourceKind::Hdock, SourceKind::AlphaFold];

    pub fn from_name(name: &str) -> Option<Self> {
        SOURCE_NAMES.get(name.trim().to_ascii_lowercase().as_str()).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Megadock => "megadock",
            SourceKind::Hdock => "hdock",
            SourceKind::AlphaFold => "alphafold",
        }
    }

    pub fn column_name(self) -> &'static str {
        match self {
            SourceKind::Megadock => "MEGADOCK_Score",
            SourceKind::Hdock => "HDOCK_Score",
            SourceKind::AlphaFold => "Alphafold_pTM+ipTM",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A score extracted from one tool's output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Single(f64),
    /// AlphaFold confidence metrics; the scalar score is their sum.
    Confidence { ptm: f64, iptm: f64 },
}

impl Score {
    pub fn value(&self) -> f64 {
        match *self {
            Score::Single(v) => v,
            Score::Confidence { ptm, iptm } => ptm + iptm,
        }
    }
}

/// One source's verdict on one pair; `score` is `None` when extraction failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub pair: PairKey,
    pub source: SourceKind,
    pub score: Option<f64>,
}

/// The union of all known scores for one pair, one slot per merged source column.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub pair: PairKey,
    pub scores: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_accepts_aliases_case_insensitively() {
        assert_eq!(SourceKind::from_name("MEGADOCK"), Some(SourceKind::Megadock));
        assert_eq!(SourceKind::from_name(" hdock "), Some(SourceKind::Hdock));
        assert_eq!(SourceKind::from_name("af3"), Some(SourceKind::AlphaFold));
        assert_eq!(SourceKind::from_name("zdock"), None);
    }

    #[test]
    fn canonical_order_matches_merged_columns() {
        let columns: Vec<_> = SourceKind::ALL.iter().map(|s| s.column_name()).collect();
        assert_eq!(
            columns,
            vec!["MEGADOCK_Score", "HDOCK_Score", "Alphafold_pTM+ipTM"]
        );
    }

    #[test]
    fn confidence_score_value_is_the_sum_of_components() {
        let score = Score::Confidence {
            ptm: 0.5,
            iptm: 0.25,
        };
        assert_eq!(score.value(), 0.75);
        assert_eq!(Score::Single(-12.5).value(), -12.5);
    }
}
