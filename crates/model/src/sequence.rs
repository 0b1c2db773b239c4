//! Structured ordering keys.
//!
//! A [`SequenceNumber`] is a non-empty tuple of integers written `1.2.3`.
//! Keys compare lexicographically, component by component, and a key sorts
//! before every key it is a proper prefix of. That makes
//! [`SequenceNumber::derive`] the workhorse of the rewrite passes: appending
//! one component to `k` yields a key that sorts after `k` and before the
//! next sibling of `k`, so synthesized properties can be slotted in at the
//! position of the property they replace without renumbering anything.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceNumber {
    components: Vec<i64>,
}

/// The next key would need a component past `i64::MAX`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sequence number '{0}' has no successor at this level")]
pub struct SequenceOverflow(pub SequenceNumber);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sequence number '{input}': {reason}")]
pub struct ParseSequenceError {
    pub input: String,
    pub reason: String,
}

impl SequenceNumber {
    /// Build a key from explicit components.
    ///
    /// Returns `None` for an empty component list; every key has at least
    /// one component.
    pub fn new(components: Vec<i64>) -> Option<Self> {
        if components.is_empty() {
            None
        } else {
            Some(SequenceNumber { components })
        }
    }

    pub fn single(value: i64) -> Self {
        SequenceNumber {
            components: vec![value],
        }
    }

    pub fn components(&self) -> &[i64] {
        &self.components
    }

    /// Key for a property synthesized "at" this key: `self` with `suffix`
    /// appended. Distinct suffixes give distinct keys, all of which sort
    /// strictly between `self` and `self.next_sibling()`.
    pub fn derive(&self, suffix: i64) -> Self {
        let mut components = Vec::with_capacity(self.components.len() + 1);
        components.extend_from_slice(&self.components);
        components.push(suffix);
        SequenceNumber { components }
    }

    /// Key for a copy of this property inherited from the supertype ranked
    /// `rank` among the receiving class's supertypes: `0.rank.self`.
    ///
    /// Inherited copies sort before every top-level key of the receiving
    /// class as long as those keys are positive.
    pub fn inherited(&self, rank: i64) -> Self {
        let mut components = Vec::with_capacity(self.components.len() + 2);
        components.push(0);
        components.push(rank);
        components.extend_from_slice(&self.components);
        SequenceNumber { components }
    }

    /// The key that follows this one among its siblings (last component
    /// incremented).
    pub fn next_sibling(&self) -> Result<Self, SequenceOverflow> {
        let mut components = self.components.clone();
        if let Some(last) = components.last_mut() {
            *last = last.checked_add(1).ok_or_else(|| SequenceOverflow(self.clone()))?;
        }
        Ok(SequenceNumber { components })
    }

    /// First top-level key strictly after this one, ignoring depth.
    pub fn next_top_level(&self) -> Result<Self, SequenceOverflow> {
        self.components[0]
            .checked_add(1)
            .map(SequenceNumber::single)
            .ok_or_else(|| SequenceOverflow(self.clone()))
    }

    /// A key after `self` for appending behind the largest key of a class.
    /// Top-level while the first component allows it, else a child of
    /// `self`, which still sorts after every smaller key.
    pub fn append_after(&self) -> Self {
        self.next_top_level().unwrap_or_else(|_| self.derive(1))
    }

    pub fn is_prefix_of(&self, other: &SequenceNumber) -> bool {
        other.components.len() > self.components.len()
            && other.components[..self.components.len()] == self.components[..]
    }
}

impl Default for SequenceNumber {
    fn default() -> Self {
        SequenceNumber::single(1)
    }
}

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl FromStr for SequenceNumber {
    type Err = ParseSequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseSequenceError {
                input: s.to_owned(),
                reason: "empty".to_owned(),
            });
        }
        let mut components = Vec::new();
        for part in trimmed.split('.') {
            let value = part.trim().parse::<i64>().map_err(|e| ParseSequenceError {
                input: s.to_owned(),
                reason: format!("component '{}': {}", part, e),
            })?;
            components.push(value);
        }
        Ok(SequenceNumber { components })
    }
}

impl Serialize for SequenceNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SequenceNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(s: &str) -> SequenceNumber {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(key("1.2.3").components(), &[1, 2, 3]);
        assert_eq!(key(" 4 ").to_string(), "4");
        assert_eq!(key("-1.0").to_string(), "-1.0");
        assert!("".parse::<SequenceNumber>().is_err());
        assert!("1..2".parse::<SequenceNumber>().is_err());
        assert!("a".parse::<SequenceNumber>().is_err());
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert!(key("1") < key("1.1"));
        assert!(key("1.9") < key("2"));
        assert!(key("1.10") > key("1.9"));
        assert!(key("1").is_prefix_of(&key("1.0")));
        assert!(!key("1").is_prefix_of(&key("1")));
    }

    #[test]
    fn test_derive_between_base_and_sibling() {
        let base = key("3.1");
        let a = base.derive(1);
        let b = base.derive(2);
        assert_eq!(a.to_string(), "3.1.1");
        assert!(base < a && a < b && b < base.next_sibling().unwrap());
    }

    #[test]
    fn test_successor_at_max_is_an_error() {
        let top = SequenceNumber::single(i64::MAX);
        assert_eq!(top.next_top_level(), Err(SequenceOverflow(top.clone())));
        let nested = SequenceNumber::new(vec![1, i64::MAX]).unwrap();
        assert!(nested.next_sibling().is_err());
        assert_eq!(nested.next_top_level().unwrap(), key("2"));
        assert_eq!(key("1.2").next_sibling().unwrap(), key("1.3"));
    }

    #[test]
    fn test_append_after_falls_back_to_child() {
        assert_eq!(key("4.2").append_after(), key("5"));
        let top = SequenceNumber::single(i64::MAX);
        let next = top.append_after();
        assert!(next > top);
        assert_eq!(next, top.derive(1));
        assert!(next.append_after() > next);
    }

    #[test]
    fn test_inherited_sorts_before_own() {
        let grandparent = key("2").inherited(1).inherited(1);
        let parent = key("1").inherited(1);
        let own = key("1");
        assert!(grandparent < parent);
        assert!(parent < own);
        assert_eq!(parent.to_string(), "0.1.1");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&key("1.2")).unwrap();
        assert_eq!(json, "\"1.2\"");
        let back: SequenceNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key("1.2"));
    }

    fn arb_key() -> impl Strategy<Value = SequenceNumber> {
        prop::collection::vec(-50i64..50, 1..5)
            .prop_map(|c| SequenceNumber::new(c).unwrap())
    }

    proptest! {
        #[test]
        fn derive_is_injective(k in arb_key(), s1 in -100i64..100, s2 in -100i64..100) {
            prop_assume!(s1 != s2);
            prop_assert_ne!(k.derive(s1), k.derive(s2));
        }

        #[test]
        fn derive_stays_between_base_and_next_sibling(k in arb_key(), s in -100i64..100) {
            let d = k.derive(s);
            prop_assert!(k < d);
            prop_assert!(d < k.next_sibling().unwrap());
        }

        #[test]
        fn derive_preserves_order_of_suffixes(k in arb_key(), s1 in -100i64..100, s2 in -100i64..100) {
            prop_assert_eq!(s1.cmp(&s2), k.derive(s1).cmp(&k.derive(s2)));
        }
    }
}
