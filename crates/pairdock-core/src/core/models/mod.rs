//! # Core Models Module
//!
//! Identity types for the entities (proteins) and the pairs scheduled for docking.
//!
//! - [`ids`] - `EntityId` and the order-independent `PairKey`
//! - [`roles`] - `RoleAssignment`, the reference/mobile ordering of a pair by size
//! - [`score`] - score sources, extracted scores and merged rows
//!
//! ```ignore
//! use pairdock::core::models::ids::PairKey;
//!
//! let key = PairKey::normalize("at1g01010", "AT1G01110")?;
//! assert_eq!(key, PairKey::normalize("AT1G01110", "at1g01010")?);
//! ```

pub mod ids;
pub mod roles;
pub mod score;
