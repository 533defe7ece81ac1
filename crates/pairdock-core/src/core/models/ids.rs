use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PairError {
    #[error("Identifier is empty")]
    EmptyIdentifier,

    #[error("Identifier '{0}' contains characters outside [A-Za-z0-9_.] or starts with '.'")]
    MalformedIdentifier(String),

    #[error("Self-pair '{0}' is not a valid docking pair")]
    SelfPair(String),
}

/// A case-insensitive entity (protein) identifier, stored in its canonical
/// upper-case form.
///
/// Identifiers end up as file names and as process arguments, so only
/// `[A-Za-z0-9_.]` is accepted and a leading `.` is rejected. `-` is the pair
/// separator in job names and `<id1>-<id2>` table cells, so it never appears
/// inside an identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(String);

impl EntityId {
    pub fn parse(raw: &str) -> Result<Self, PairError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PairError::EmptyIdentifier);
        }
        let valid_chars = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.'));
        if !valid_chars || trimmed.starts_with('.') {
            return Err(PairError::MalformedIdentifier(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Order-independent identity of a two-entity job.
///
/// The two members are normalized and stored in lexicographic order, so
/// `PairKey::normalize(a, b) == PairKey::normalize(b, a)`. The derived `Ord` is the
/// lexicographic order on `(first, second)`, which is the row order of every table
/// the system writes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    first: EntityId,
    second: EntityId,
}

impl PairKey {
    pub fn normalize(a: &str, b: &str) -> Result<Self, PairError> {
        Self::from_ids(EntityId::parse(a)?, EntityId::parse(b)?)
    }

    pub fn from_ids(a: EntityId, b: EntityId) -> Result<Self, PairError> {
        if a == b {
            return Err(PairError::SelfPair(a.0));
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { first, second })
    }

    pub fn first(&self) -> &EntityId {
        &self.first
    }

    pub fn second(&self) -> &EntityId {
        &self.second
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}
