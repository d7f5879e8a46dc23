//! Favorite sets and user identity.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::StationId;

/// Stable identifier supplied by the identity provider.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user's favorite stations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteSet(BTreeSet<StationId>);

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &StationId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationId> {
        self.0.iter()
    }

    /// The set with `id`'s membership flipped, and whether `id` is now a
    /// member.
    pub fn toggled(&self, id: &StationId) -> (Self, bool) {
        let mut next = self.0.clone();
        let added = if next.remove(id) {
            false
        } else {
            next.insert(id.clone());
            true
        };
        (Self(next), added)
    }
}

impl FromIterator<StationId> for FavoriteSet {
    fn from_iter<I: IntoIterator<Item = StationId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> StationId {
        StationId::parse(s).unwrap()
    }

    #[test]
    fn toggled_twice_restores_membership() {
        let original: FavoriteSet = [id("1"), id("2")].into_iter().collect();

        let (once, added) = original.toggled(&id("3"));
        assert!(added);
        assert!(once.contains(&id("3")));

        let (twice, added) = once.toggled(&id("3"));
        assert!(!added);
        assert_eq!(twice, original);
    }

    #[test]
    fn serializes_as_sorted_array() {
        let set: FavoriteSet = [id("20"), id("10")].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["10","20"]"#);

        let back: FavoriteSet = serde_json::from_str(r#"["10","20"]"#).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn user_id_debug() {
        assert_eq!(format!("{:?}", UserId::new("abc")), "UserId(abc)");
    }
}
