//! Input/output for the files the batch consumes and produces.
//!
//! - [`pair_list`] - whitespace-separated pair lists with an optional `ID` header
//! - [`catalog`] - per-entity inputs (PDB structures, FASTA sequences) and their size metric
//! - [`score_table`] - per-tool score tables and the merged result table

pub mod catalog;
pub mod pair_list;
pub mod score_table;
