//! # Workflows Module
//!
//! End-to-end entry points of the library.
//!
//! ## Architecture
//!
//! - **Docking Workflow** ([`dock`]) - Reads a pair list, runs one tool over every unique
//!   pair on the worker pool, resuming from whatever artifacts already exist, and writes
//!   the tool's result table.
//! - **Merge Workflow** ([`merge`]) - Outer-joins the result tables of up to three tools
//!   into one table keyed by canonical pair.
//!
//! Both workflows fail only on batch-level problems (unreadable inputs, no usable
//! source). Per-pair problems are reported in the returned outcomes.

pub mod dock;
pub mod merge;
