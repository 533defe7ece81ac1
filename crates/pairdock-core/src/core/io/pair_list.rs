use crate::core::models::ids::{EntityId, PairKey};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

const HEADER_TOKENS: [&str; 2] = ["ID", "ID1"];

/// One unique pair requested for docking.
///
/// `first` and `second` keep the order of the earliest line that named this pair;
/// that order is the tie-break operand order for role assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRequest {
    pub key: PairKey,
    pub first: EntityId,
    pub second: EntityId,
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairList {
    pub requests: Vec<PairRequest>,
    pub malformed_lines: usize,
    pub duplicates: usize,
}

impl PairList {
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn read_from(reader: impl BufRead) -> io::Result<Self> {
        let mut list = PairList::default();
        let mut seen: HashSet<PairKey> = HashSet::new();
        let mut header_checked = false;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_num = idx + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }

            if !header_checked {
                header_checked = true;
                if HEADER_TOKENS
                    .iter()
                    .any(|token| fields[0].eq_ignore_ascii_case(token))
                {
                    debug!(line = line_num, "Skipping pair list header.");
                    continue;
                }
            }

            if fields.len() != 2 {
                warn!(
                    line = line_num,
                    "Skipping malformed pair line (expected 2 fields, found {}): '{}'",
                    fields.len(),
                    line.trim()
                );
                list.malformed_lines += 1;
                continue;
            }

            let parsed = EntityId::parse(fields[0]).and_then(|first| {
                let second = EntityId::parse(fields[1])?;
                let key = PairKey::from_ids(first.clone(), second.clone())?;
                Ok((key, first, second))
            });

            match parsed {
                Ok((key, first, second)) => {
                    if seen.insert(key.clone()) {
                        list.requests.push(PairRequest {
                            key,
                            first,
                            second,
                            line: line_num,
                        });
                    } else {
                        debug!(line = line_num, pair = %key, "Duplicate pair collapsed.");
                        list.duplicates += 1;
                    }
                }
                Err(e) => {
                    warn!(line = line_num, "Skipping invalid pair: {}", e);
                    list.malformed_lines += 1;
                }
            }
        }

        Ok(list)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }
}
