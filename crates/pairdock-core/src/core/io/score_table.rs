use crate::core::models::ids::PairKey;
use crate::core::models::roles::RoleAssignment;
use crate::core::models::score::{MergedRow, Score, SourceKind};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const COMBINED_ID_COLUMN: &str = "Pair";
pub const PTM_COLUMN: &str = "PTM";
pub const IPTM_COLUMN: &str = "IPTM";

const CONFIDENCE_DECIMALS: i32 = 2;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed table '{path}': {source}", path = path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Table '{path}' has no column named '{column}'", path = path.display())]
    MissingColumn { path: PathBuf, column: String },
}

/// How a source's score table is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// No header; columns `id1, id2, score`.
    Headerless,
    /// A header row; a combined `<id1>-<id2>` column plus numeric columns that are
    /// summed (and rounded) into the score.
    Combined {
        id_column: &'static str,
        value_columns: &'static [&'static str],
        round_decimals: Option<i32>,
    },
}

impl TableLayout {
    pub fn for_source(source: SourceKind) -> Self {
        match source {
            SourceKind::Megadock | SourceKind::Hdock => TableLayout::Headerless,
            SourceKind::AlphaFold => TableLayout::Combined {
                id_column: COMBINED_ID_COLUMN,
                value_columns: &[PTM_COLUMN, IPTM_COLUMN],
                round_decimals: Some(CONFIDENCE_DECIMALS),
            },
        }
    }
}

/// One source's scores keyed by canonical pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    pub source: SourceKind,
    pub rows: Vec<(PairKey, f64)>,
}

impl ScoreTable {
    pub fn new(source: SourceKind) -> Self {
        Self {
            source,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn read_from_path(path: &Path, source: SourceKind) -> Result<Self, TableError> {
        let file = File::open(path).map_err(|e| TableError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::read_from(file, source, path)
    }

    /// Parses a table in the layout of `source`. Rows that cannot be keyed or scored
    /// are skipped with a warning; `origin` only labels errors and log lines.
    pub fn read_from(reader: impl Read, source: SourceKind, origin: &Path) -> Result<Self, TableError> {
        let layout = TableLayout::for_source(source);
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(matches!(layout, TableLayout::Combined { .. }))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let csv_err = |e| TableError::Csv {
            path: origin.to_path_buf(),
            source: e,
        };

        let (id_idx, value_idx) = match layout {
            TableLayout::Headerless => (None, Vec::new()),
            TableLayout::Combined {
                id_column,
                value_columns,
                ..
            } => {
                let headers = csv_reader.headers().map_err(csv_err)?.clone();
                let find = |name: &str| {
                    headers
                        .iter()
                        .position(|h| h == name)
                        .ok_or_else(|| TableError::MissingColumn {
                            path: origin.to_path_buf(),
                            column: name.to_string(),
                        })
                };
                let id_idx = find(id_column)?;
                let value_idx = value_columns
                    .iter()
                    .map(|c| find(c))
                    .collect::<Result<Vec<_>, _>>()?;
                (Some(id_idx), value_idx)
            }
        };

        let mut table = ScoreTable::new(source);
        for (row_idx, record) in csv_reader.records().enumerate() {
            let record = record.map_err(csv_err)?;
            if record.iter().all(str::is_empty) {
                continue;
            }

            let parsed = match (layout, id_idx) {
                (TableLayout::Combined { round_decimals, .. }, Some(id_idx)) => {
                    parse_combined_row(&record, id_idx, &value_idx, round_decimals)
                }
                _ => parse_headerless_row(&record),
            };

            match parsed {
                Ok(row) => table.rows.push(row),
                Err(reason) => warn!(
                    source = %source,
                    row = row_idx + 1,
                    "Skipping row in {:?}: {}",
                    origin,
                    reason
                ),
            }
        }

        debug!(source = %source, rows = table.len(), "Read score table {:?}.", origin);
        Ok(table)
    }
}

fn parse_headerless_row(record: &csv::StringRecord) -> Result<(PairKey, f64), String> {
    if record.len() < 3 {
        return Err(format!("expected 3 columns, found {}", record.len()));
    }
    let key = PairKey::normalize(&record[0], &record[1]).map_err(|e| e.to_string())?;
    let score = parse_float(&record[2])?;
    Ok((key, score))
}

fn parse_combined_row(
    record: &csv::StringRecord,
    id_idx: usize,
    value_idx: &[usize],
    round_decimals: Option<i32>,
) -> Result<(PairKey, f64), String> {
    let combined = record
        .get(id_idx)
        .ok_or_else(|| "missing pair identifier".to_string())?;
    let parts: Vec<&str> = combined.split('-').collect();
    if parts.len() != 2 {
        return Err(format!(
            "pair identifier '{}' is not of the form <id1>-<id2>",
            combined
        ));
    }
    let key = PairKey::normalize(parts[0], parts[1]).map_err(|e| e.to_string())?;

    let mut total = 0.0;
    for &idx in value_idx {
        let field = record
            .get(idx)
            .ok_or_else(|| format!("missing value in column {}", idx + 1))?;
        total += parse_float(field)?;
    }
    let score = match round_decimals {
        Some(decimals) => round_to(total, decimals),
        None => total,
    };
    Ok((key, score))
}

fn parse_float(field: &str) -> Result<f64, String> {
    let value: f64 = field
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", field))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("'{}' is not a finite number", field))
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// A scored pair as reported by a docking batch, in role order.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRow {
    pub roles: RoleAssignment,
    pub score: Score,
}

/// Writes a batch's per-tool result table in the layout that [`ScoreTable::read_from`]
/// expects for the same source.
pub fn write_tool_table(
    writer: impl Write,
    source: SourceKind,
    rows: &[ToolRow],
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_writer(writer);

    match TableLayout::for_source(source) {
        TableLayout::Headerless => {
            for row in rows {
                csv_writer.write_record([
                    row.roles.reference.as_str(),
                    row.roles.mobile.as_str(),
                    &format!("{:.4}", row.score.value()),
                ])?;
            }
        }
        TableLayout::Combined {
            id_column,
            value_columns,
            ..
        } => {
            let mut header = vec![id_column];
            header.extend_from_slice(value_columns);
            csv_writer.write_record(&header)?;
            for row in rows {
                let (ptm, iptm) = match row.score {
                    Score::Confidence { ptm, iptm } => (ptm, iptm),
                    Score::Single(v) => (v, 0.0),
                };
                csv_writer.write_record([
                    row.roles.job_name(),
                    format_float(ptm),
                    format_float(iptm),
                ])?;
            }
        }
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes the merged table: optional legend line, `ID1 ID2 <columns...>` header, then
/// one row per pair with empty cells for absent scores.
pub fn write_merged_table(
    mut writer: impl Write,
    columns: &[&str],
    rows: &[MergedRow],
    legend: Option<&str>,
) -> Result<(), csv::Error> {
    if let Some(legend) = legend {
        writeln!(writer, "{}", legend)?;
    }

    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);

    let mut header = vec!["ID1", "ID2"];
    header.extend_from_slice(columns);
    csv_writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.pair.first().to_string(), row.pair.second().to_string()];
        record.extend(
            row.scores
                .iter()
                .map(|score| score.map(format_float).unwrap_or_default()),
        );
        csv_writer.write_record(&record)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Shortest round-trip representation, keeping a `.0` on integral values.
pub fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::EntityId;
    use std::io::Cursor;

    fn origin() -> PathBuf {
        PathBuf::from("test.tsv")
    }

    fn roles(r: &str, l: &str) -> RoleAssignment {
        RoleAssignment {
            reference: EntityId::parse(r).unwrap(),
            mobile: EntityId::parse(l).unwrap(),
        }
    }

    #[test]
    fn headerless_table_is_normalized() {
        let text = "y\tx\t-12.5\nP\tQ\t3\n";
        let table = ScoreTable::read_from(Cursor::new(text), SourceKind::Megadock, &origin()).unwrap();
        assert_eq!(
            table.rows,
            vec![
                (PairKey::normalize("X", "Y").unwrap(), -12.5),
                (PairKey::normalize("P", "Q").unwrap(), 3.0),
            ]
        );
    }

    #[test]
    fn headerless_table_skips_bad_rows() {
        let text = "A\tB\tnot-a-number\nA\tA\t1.0\nA\tB\nC\tD\t2.0\n";
        let table = ScoreTable::read_from(Cursor::new(text), SourceKind::Hdock, &origin()).unwrap();
        assert_eq!(table.rows, vec![(PairKey::normalize("C", "D").unwrap(), 2.0)]);
    }

    #[test]
    fn combined_table_sums_and_rounds_confidence_columns() {
        let text = "Pair\tPTM\tIPTM\nat1g01110-at1g01010\t0.456\t0.301\n";
        let table =
            ScoreTable::read_from(Cursor::new(text), SourceKind::AlphaFold, &origin()).unwrap();
        assert_eq!(table.len(), 1);
        let (key, score) = &table.rows[0];
        assert_eq!(key.to_string(), "AT1G01010-AT1G01110");
        assert_eq!(*score, 0.76);
    }

    #[test]
    fn combined_table_requires_its_columns() {
        let text = "Pair\tPTM\nA-B\t0.5\n";
        let result = ScoreTable::read_from(Cursor::new(text), SourceKind::AlphaFold, &origin());
        assert!(matches!(
            result,
            Err(TableError::MissingColumn { ref column, .. }) if column == "IPTM"
        ));
    }

    #[test]
    fn combined_table_skips_ambiguous_pair_identifiers() {
        let text = "Pair\tPTM\tIPTM\nA-B-C\t0.5\t0.5\nA-B\t0.1\t0.2\n";
        let table =
            ScoreTable::read_from(Cursor::new(text), SourceKind::AlphaFold, &origin()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn tool_table_for_docking_sources_is_headerless_in_role_order() {
        let rows = vec![ToolRow {
            roles: roles("B", "A"),
            score: Score::Single(-123.456789),
        }];
        let mut out = Vec::new();
        write_tool_table(&mut out, SourceKind::Hdock, &rows).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "B\tA\t-123.4568\n");
    }

    #[test]
    fn tool_table_for_alphafold_carries_both_components() {
        let rows = vec![ToolRow {
            roles: roles("B", "A"),
            score: Score::Confidence {
                ptm: 0.5,
                iptm: 0.25,
            },
        }];
        let mut out = Vec::new();
        write_tool_table(&mut out, SourceKind::AlphaFold, &rows).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Pair\tPTM\tIPTM\nB-A\t0.5\t0.25\n"
        );
    }

    #[test]
    fn tool_table_can_be_read_back_by_the_same_source() {
        let rows = vec![ToolRow {
            roles: roles("Q", "P"),
            score: Score::Single(10.0),
        }];
        let mut out = Vec::new();
        write_tool_table(&mut out, SourceKind::Megadock, &rows).unwrap();
        let table = ScoreTable::read_from(Cursor::new(out), SourceKind::Megadock, &origin()).unwrap();
        assert_eq!(table.rows, vec![(PairKey::normalize("P", "Q").unwrap(), 10.0)]);
    }

    #[test]
    fn alphafold_tool_table_round_trips_through_the_combined_reader() {
        let rows = vec![
            ToolRow {
                roles: roles("at1g01010.1", "q9_human"),
                score: Score::Confidence {
                    ptm: 0.41,
                    iptm: 0.356,
                },
            },
            ToolRow {
                roles: roles("P2", "P1"),
                score: Score::Confidence {
                    ptm: 0.2,
                    iptm: 0.1,
                },
            },
        ];
        let mut out = Vec::new();
        write_tool_table(&mut out, SourceKind::AlphaFold, &rows).unwrap();

        let table = ScoreTable::read_from(Cursor::new(out), SourceKind::AlphaFold, &origin()).unwrap();
        assert_eq!(
            table.rows,
            vec![
                (PairKey::normalize("AT1G01010.1", "Q9_HUMAN").unwrap(), 0.77),
                (PairKey::normalize("P1", "P2").unwrap(), 0.3),
            ]
        );
    }

    #[test]
    fn merged_table_renders_absent_scores_as_empty_cells() {
        let rows = vec![
            MergedRow {
                pair: PairKey::normalize("P", "Q").unwrap(),
                scores: vec![None, Some(3.0)],
            },
            MergedRow {
                pair: PairKey::normalize("X", "Y").unwrap(),
                scores: vec![Some(1.5), Some(2.0)],
            },
        ];
        let mut out = Vec::new();
        write_merged_table(&mut out, &["A_Score", "B_Score"], &rows, Some("legend")).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "legend\nID1\tID2\tA_Score\tB_Score\nP\tQ\t\t3.0\nX\tY\t1.5\t2.0\n"
        );
    }

    #[test]
    fn round_to_rounds_half_away_from_zero() {
        assert_eq!(round_to(0.125, 2), 0.13);
        assert_eq!(round_to(-1.005, 1), -1.0);
    }
}
