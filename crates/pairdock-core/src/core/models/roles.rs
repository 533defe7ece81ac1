use super::ids::{EntityId, PairError, PairKey};
use std::fmt;

/// The naming/invocation order of a pair: the larger entity is the `reference`
/// (receptor), the other the `mobile` (ligand).
///
/// A `RoleAssignment` never participates in pair identity; it is recomputed from the
/// size metric whenever a job needs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleAssignment {
    pub reference: EntityId,
    pub mobile: EntityId,
}

impl RoleAssignment {
    /// `<reference>-<mobile>`, the stem of every artifact a job writes.
    pub fn job_name(&self) -> String {
        format!("{}-{}", self.reference, self.mobile)
    }

    pub fn pair_key(&self) -> Result<PairKey, PairError> {
        PairKey::from_ids(self.reference.clone(), self.mobile.clone())
    }
}

impl fmt::Display for RoleAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.reference, self.mobile)
    }
}

/// Assigns reference/mobile roles by comparing `size_of` for both operands.
///
/// The operand with the larger size becomes the reference. On a tie the first
/// operand, as passed to this function, wins; callers pass the order in which the
/// pair was first listed, never the `PairKey` order.
pub fn assign_roles<E>(
    first: &EntityId,
    second: &EntityId,
    mut size_of: impl FnMut(&EntityId) -> Result<usize, E>,
) -> Result<RoleAssignment, E> {
    let first_size = size_of(first)?;
    let second_size = size_of(second)?;

    let (reference, mobile) = if first_size >= second_size {
        (first, second)
    } else {
        (second, first)
    };

    Ok(RoleAssignment {
        reference: reference.clone(),
        mobile: mobile.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::convert::Infallible;

    fn id(raw: &str) -> EntityId {
        EntityId::parse(raw).unwrap()
    }

    fn sizes(entries: &[(&str, usize)]) -> HashMap<EntityId, usize> {
        entries.iter().map(|(k, v)| (id(k), *v)).collect()
    }

    #[test]
    fn tie_keeps_the_first_operand_as_reference() {
        let table = sizes(&[("A", 100), ("B", 100)]);
        let lookup = |e: &EntityId| Ok::<_, Infallible>(table[e]);

        let roles = assign_roles(&id("A"), &id("B"), lookup).unwrap();
        assert_eq!(roles.reference, id("A"));
        assert_eq!(roles.mobile, id("B"));

        let swapped = assign_roles(&id("B"), &id("A"), lookup).unwrap();
        assert_eq!(swapped.reference, id("B"));
    }

    #[test]
    fn larger_entity_becomes_reference() {
        let table = sizes(&[("A", 80), ("B", 120)]);
        let roles = assign_roles(&id("A"), &id("B"), |e| Ok::<_, Infallible>(table[e])).unwrap();
        assert_eq!(roles.reference, id("B"));
        assert_eq!(roles.mobile, id("A"));
        assert_eq!(roles.job_name(), "B-A");
    }

    #[test]
    fn role_assignment_does_not_change_pair_identity() {
        let table = sizes(&[("A", 80), ("B", 120)]);
        let roles = assign_roles(&id("A"), &id("B"), |e| Ok::<_, Infallible>(table[e])).unwrap();
        assert_eq!(roles.pair_key().unwrap(), PairKey::normalize("A", "B").unwrap());
    }

    #[test]
    fn size_lookup_errors_propagate() {
        let result = assign_roles(&id("A"), &id("B"), |_| Err::<usize, _>("missing"));
        assert_eq!(result, Err("missing"));
    }
}
