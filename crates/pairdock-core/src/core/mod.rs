//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! - **Identity models** ([`models`]) - Entity identifiers, canonical pair keys and
//!   the size-based role assignment used for naming and invocation.
//! - **File I/O** ([`io`]) - Pair lists, structure and sequence catalogs, and the
//!   tab-separated score tables consumed and produced by the system.

pub mod io;
pub mod models;
