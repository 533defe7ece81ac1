//! # Engine Module
//!
//! The machinery that turns a list of requested pairs into scored results.
//!
//! ## Architecture
//!
//! - **Artifact probing** ([`probe`]) - Classifies a job's on-disk state as fresh, partial or final
//! - **Tool invocation** ([`invoker`]) - Runs one pipeline stage of an external tool as a process
//! - **Score extraction** ([`extract`]) - Per-source grammars reducing tool output to a score
//! - **Tool back-ends** ([`tools`]) - MEGADOCK, HDOCK and AlphaFold3 pipelines
//! - **Scheduling** ([`scheduler`]) - Bounded worker pool driving every job to a terminal state
//! - **Aggregation** ([`aggregate`]) - Outer join of per-source score tables
//! - **Configuration** ([`config`]) - Batch, scheduler and per-tool parameters
//! - **Progress Monitoring** ([`progress`]) - Progress events for user feedback
//! - **Error Handling** ([`error`]) - Batch-level (fatal) errors
//!
//! Per-pair problems never surface as [`error::EngineError`]; they degrade that pair's
//! outcome to failed or absent and the batch continues.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod extract;
pub mod invoker;
pub mod probe;
pub mod progress;
pub mod scheduler;
pub mod tools;
