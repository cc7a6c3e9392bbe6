//! Lazy reconstruction of contiguous key groups from a key-clustered
//! record stream.
//!
//! The input contract is equal-key *adjacency*, not a global sort: all values
//! for one key must be contiguous, but clusters need not be ordered between
//! themselves. The produced sequence is forward-only and single-pass;
//! consuming group N+1 finalizes group N.

use crate::fusestream::pipeline::execution::types::{FieldValue, Pair};

/// A key paired with the ordered values contiguously associated with it.
///
/// Groups are transient: they are assembled on the fly by [`GroupIterator`]
/// and consumed immediately by a combine or reduce function, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: FieldValue,
    pub values: Vec<FieldValue>,
}

impl Group {
    pub fn new(key: FieldValue, values: Vec<FieldValue>) -> Self {
        Group { key, values }
    }
}

/// Rebuilds contiguous groups from a sorted pair stream, one group at a time.
///
/// Empty input yields no groups; a group with zero values is never produced.
pub struct GroupIterator<I: Iterator<Item = Pair>> {
    pairs: std::iter::Peekable<I>,
}

impl<I: Iterator<Item = Pair>> GroupIterator<I> {
    pub fn new(pairs: I) -> Self {
        GroupIterator {
            pairs: pairs.peekable(),
        }
    }
}

impl<I: Iterator<Item = Pair>> Iterator for GroupIterator<I> {
    type Item = Group;

    fn next(&mut self) -> Option<Group> {
        let (key, first_value) = self.pairs.next()?;
        let mut values = vec![first_value];
        while let Some((next_key, _)) = self.pairs.peek() {
            if *next_key != key {
                break;
            }
            if let Some((_, value)) = self.pairs.next() {
                values.push(value);
            }
        }
        Some(Group::new(key, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> FieldValue {
        FieldValue::Integer(i)
    }

    fn s(v: &str) -> FieldValue {
        FieldValue::String(v.to_string())
    }

    #[test]
    fn contiguous_keys_form_two_groups() {
        let pairs = vec![(int(1), s("a")), (int(1), s("b")), (int(2), s("c"))];
        let groups: Vec<Group> = GroupIterator::new(pairs.into_iter()).collect();
        assert_eq!(
            groups,
            vec![
                Group::new(int(1), vec![s("a"), s("b")]),
                Group::new(int(2), vec![s("c")]),
            ]
        );
    }

    #[test]
    fn empty_input_yields_no_groups() {
        let groups: Vec<Group> = GroupIterator::new(std::iter::empty()).collect();
        assert!(groups.is_empty(), "expected no groups, got {:?}", groups);
    }

    #[test]
    fn single_pair_yields_final_group() {
        let groups: Vec<Group> =
            GroupIterator::new(vec![(s("k"), int(7))].into_iter()).collect();
        assert_eq!(groups, vec![Group::new(s("k"), vec![int(7)])]);
    }

    #[test]
    fn non_adjacent_equal_keys_stay_separate() {
        // Adjacency, not global order, is the contract: a key recurring
        // after an intervening cluster starts a fresh group.
        let pairs = vec![(int(1), s("a")), (int(2), s("b")), (int(1), s("c"))];
        let groups: Vec<Group> = GroupIterator::new(pairs.into_iter()).collect();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].key, int(1));
        assert_eq!(groups[2].key, int(1));
    }
}
