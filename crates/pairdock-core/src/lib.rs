//! # pairdock Core Library
//!
//! Orchestration of pairwise structural-docking computations over a batch of protein
//! pairs: canonical pair identities, resumable per-pair jobs driven by external tools,
//! a bounded worker pool, and outer-join aggregation of the resulting score tables.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless identity models (`EntityId`, `PairKey`,
//!   `RoleAssignment`) and file I/O for pair lists, structure/sequence catalogs and
//!   tab-separated score tables.
//!
//! - **[`engine`]: The Logic Core.** Artifact probing, process invocation, score
//!   extraction, the job scheduler, the result aggregator and the tool back-ends
//!   (MEGADOCK, HDOCK, AlphaFold3).
//!
//! - **[`workflows`]: The Public API.** End-to-end `dock` and `merge` procedures that
//!   tie the engine and core together.

pub mod core;
pub mod engine;
pub mod workflows;
