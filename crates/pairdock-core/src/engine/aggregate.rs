use crate::core::io::score_table::ScoreTable;
use crate::core::models::ids::PairKey;
use crate::core::models::score::{MergedRow, SourceKind};
use crate::engine::error::EngineError;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Interpretation guide written above the merged table.
pub const LEGEND: &str = "MEGADOCK PPI Score > 12, 80% probability of interaction; \
> 10, 50% probability of interaction; \
> 8, 10% probability of interaction. \
HDOCK docking score < -200, high probability of interaction. \
pTM + ipTM > 0.75, indicating that the model's predictions of protein-protein interface \
interactions and overall complex structure are highly reliable.";

/// The full outer join of one to three score sources.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable {
    /// Column order; `rows[i].scores[j]` belongs to `sources[j]`.
    pub sources: Vec<SourceKind>,
    /// One row per pair present in any source, ordered by pair key.
    pub rows: Vec<MergedRow>,
}

impl MergedTable {
    pub fn columns(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.column_name()).collect()
    }
}

/// Outer-joins `tables` on the canonical pair key in a single pass.
///
/// Every table contributes one column, in the given order. A pair listed twice in
/// the same table keeps its first score. Fails with
/// [`EngineError::AggregationUsage`] when no table has a row.
pub fn merge(tables: &[ScoreTable]) -> Result<MergedTable, EngineError> {
    if tables.iter().all(ScoreTable::is_empty) {
        return Err(EngineError::AggregationUsage);
    }

    let mut sources = Vec::with_capacity(tables.len());
    for table in tables {
        if sources.contains(&table.source) {
            return Err(EngineError::DuplicateSource(table.source));
        }
        sources.push(table.source);
    }

    let width = tables.len();
    let mut joined: BTreeMap<PairKey, Vec<Option<f64>>> = BTreeMap::new();
    for (column, table) in tables.iter().enumerate() {
        for (pair, score) in &table.rows {
            let slot = &mut joined
                .entry(pair.clone())
                .or_insert_with(|| vec![None; width])[column];
            match *slot {
                None => *slot = Some(*score),
                Some(kept) => warn!(
                    source = %table.source,
                    pair = %pair,
                    "Duplicate pair; keeping the first score {} and dropping {}.",
                    kept,
                    score
                ),
            }
        }
    }

    let rows: Vec<MergedRow> = joined
        .into_iter()
        .map(|(pair, scores)| MergedRow { pair, scores })
        .collect();
    debug!(rows = rows.len(), sources = width, "Merged score tables.");

    Ok(MergedTable { sources, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(a: &str, b: &str) -> PairKey {
        PairKey::normalize(a, b).unwrap()
    }

    fn table(source: SourceKind, rows: &[(&str, &str, f64)]) -> ScoreTable {
        let mut table = ScoreTable::new(source);
        table.rows = rows.iter().map(|(a, b, s)| (key(a, b), *s)).collect();
        table
    }

    #[test]
    fn outer_join_collapses_reversed_pairs_and_keeps_absent_slots() {
        let a = table(SourceKind::Megadock, &[("X", "Y", 1.0)]);
        let b = table(SourceKind::Hdock, &[("Y", "X", 2.0), ("P", "Q", 3.0)]);

        let merged = merge(&[a, b]).unwrap();

        assert_eq!(merged.columns(), ["MEGADOCK_Score", "HDOCK_Score"]);
        assert_eq!(
            merged.rows,
            vec![
                MergedRow {
                    pair: key("P", "Q"),
                    scores: vec![None, Some(3.0)],
                },
                MergedRow {
                    pair: key("X", "Y"),
                    scores: vec![Some(1.0), Some(2.0)],
                },
            ]
        );
    }

    #[test]
    fn merge_is_independent_of_row_order() {
        let forward = table(SourceKind::Hdock, &[("A", "B", 1.0), ("C", "D", 2.0)]);
        let backward = table(SourceKind::Hdock, &[("D", "C", 2.0), ("B", "A", 1.0)]);
        assert_eq!(merge(&[forward]).unwrap(), merge(&[backward]).unwrap());
    }

    #[test]
    fn three_sources_produce_three_columns_in_given_order() {
        let merged = merge(&[
            table(SourceKind::Megadock, &[("A", "B", 12.5)]),
            table(SourceKind::Hdock, &[("B", "C", -210.0)]),
            table(SourceKind::AlphaFold, &[("A", "B", 0.81)]),
        ])
        .unwrap();

        assert_eq!(merged.sources, SourceKind::ALL.to_vec());
        assert_eq!(merged.rows.len(), 2);
        assert_eq!(merged.rows[0].scores, vec![Some(12.5), None, Some(0.81)]);
        assert_eq!(merged.rows[1].scores, vec![None, Some(-210.0), None]);
    }

    #[test]
    fn duplicate_pairs_within_a_source_keep_the_first_score() {
        let merged = merge(&[table(
            SourceKind::Megadock,
            &[("A", "B", 1.0), ("B", "A", 9.0)],
        )])
        .unwrap();
        assert_eq!(merged.rows.len(), 1);
        assert_eq!(merged.rows[0].scores, vec![Some(1.0)]);
    }

    #[test]
    fn zero_or_empty_sources_are_a_usage_error() {
        assert!(matches!(merge(&[]), Err(EngineError::AggregationUsage)));
        assert!(matches!(
            merge(&[ScoreTable::new(SourceKind::Hdock)]),
            Err(EngineError::AggregationUsage)
        ));
    }

    #[test]
    fn an_empty_source_still_gets_a_column() {
        let merged = merge(&[
            ScoreTable::new(SourceKind::Megadock),
            table(SourceKind::Hdock, &[("A", "B", -1.0)]),
        ])
        .unwrap();
        assert_eq!(merged.rows[0].scores, vec![None, Some(-1.0)]);
    }

    #[test]
    fn the_same_source_twice_is_rejected() {
        let result = merge(&[
            table(SourceKind::Hdock, &[("A", "B", 1.0)]),
            table(SourceKind::Hdock, &[("C", "D", 1.0)]),
        ]);
        assert!(matches!(
            result,
            Err(EngineError::DuplicateSource(SourceKind::Hdock))
        ));
    }
}
