//! Module: pipeline::group
//! Responsibility: canonical group keys, stable key hashing, and the
//! insertion-ordered group table built by the grouping pass.
//! Does not own: aggregate evaluation or output conversion.

use crate::{
    feature::Feature,
    value::{Value, canonical_cmp, hash_value},
};
use std::{cmp::Ordering, collections::BTreeMap};

///
/// StableHash
///
/// Fixed-width hash identifier of one canonical group key.
///

pub type StableHash = u64;

/// Derive one stable 64-bit hash from the canonical value hash digest.
#[must_use]
pub const fn stable_hash_from_digest(digest: [u8; 16]) -> StableHash {
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

///
/// GroupKey
///
/// Canonical equality/hash substrate for grouping. Scalars and lists are
/// both keys; lists compare element-wise after canonicalization.
///

#[derive(Clone, Debug, PartialEq)]
pub struct GroupKey {
    canonical: Value,
    hash: StableHash,
}

impl GroupKey {
    /// Canonicalize one evaluated group-by value into a key.
    #[must_use]
    pub fn new(value: Value) -> Self {
        let canonical = value.canonicalize();
        let hash = stable_hash_from_digest(hash_value(&canonical));

        Self { canonical, hash }
    }

    #[must_use]
    pub const fn hash(&self) -> StableHash {
        self.hash
    }

    #[must_use]
    pub const fn canonical_value(&self) -> &Value {
        &self.canonical
    }

    /// Canonical equality; hash collisions never merge distinct keys.
    #[must_use]
    pub fn same_key(&self, other: &Self) -> bool {
        self.hash == other.hash && canonical_cmp(&self.canonical, &other.canonical) == Ordering::Equal
    }
}

///
/// Group
///
/// One group: the raw key value of its first member plus the buffered
/// members in append order.
///

#[derive(Clone, Debug)]
pub struct Group {
    key: GroupKey,
    value: Value,
    members: Vec<Feature>,
}

impl Group {
    #[must_use]
    pub const fn key(&self) -> &GroupKey {
        &self.key
    }

    /// The group-by value as evaluated on the first member.
    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn members(&self) -> &[Feature] {
        &self.members
    }

    /// First appended member; every group has one.
    #[must_use]
    pub fn first(&self) -> Option<&Feature> {
        self.members.first()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True when at least one member carries a non-empty geometry.
    #[must_use]
    pub fn has_geometry(&self) -> bool {
        self.members.iter().any(Feature::has_geometry)
    }
}

///
/// GroupTable
///
/// Groups in first-occurrence order, indexed by stable-hash bucket with a
/// canonical equality check inside each bucket.
///

#[derive(Debug, Default)]
pub struct GroupTable {
    groups: Vec<Group>,
    buckets: BTreeMap<StableHash, Vec<usize>>,
}

impl GroupTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `feature` to the group of `value`, creating the group when the
    /// key is unseen. Returns true when a group was created.
    pub fn insert(&mut self, value: Value, feature: Feature) -> bool {
        let key = GroupKey::new(value.clone());
        let bucket = self.buckets.entry(key.hash()).or_default();
        if let Some(&slot) = bucket
            .iter()
            .find(|&&slot| self.groups[slot].key.same_key(&key))
        {
            self.groups[slot].members.push(feature);
            return false;
        }

        bucket.push(self.groups.len());
        self.groups.push(Group {
            key,
            value,
            members: vec![feature],
        });

        true
    }

    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    #[must_use]
    pub fn into_groups(self) -> Vec<Group> {
        self.groups
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn member(id: i64) -> Feature {
        Feature::new(id, Vec::new())
    }

    #[test]
    fn numerically_equal_keys_share_one_group() {
        let mut table = GroupTable::new();

        assert!(table.insert(Value::Int(1), member(1)));
        assert!(!table.insert(Value::Float(1.0), member(2)));
        assert!(table.insert(Value::Float(0.0), member(3)));
        assert!(!table.insert(Value::Float(-0.0), member(4)));
        assert!(table.insert(Value::Null, member(5)));
        assert!(!table.insert(Value::Null, member(6)));

        assert_eq!(table.len(), 3);
        let sizes: Vec<usize> = table.groups().iter().map(Group::len).collect();
        assert_eq!(sizes, vec![2, 2, 2]);
    }

    #[test]
    #[expect(clippy::cast_precision_loss)]
    fn large_integral_keys_share_one_group() {
        let big = 1i64 << 60;
        let mut table = GroupTable::new();

        assert!(table.insert(Value::Int(big), member(1)));
        assert!(!table.insert(Value::Float(big as f64), member(2)));
        assert!(table.insert(Value::Int(big + 1), member(3)));

        assert_eq!(table.len(), 2);
        assert_eq!(table.groups()[0].len(), 2);
        assert!(table.groups()[0].key().same_key(&GroupKey::new(Value::Float(big as f64))));
    }

    #[test]
    fn group_keeps_the_raw_value_of_its_first_member() {
        let mut table = GroupTable::new();
        table.insert(Value::Float(2.0), member(1));
        table.insert(Value::Int(2), member(2));

        let group = &table.groups()[0];
        assert_eq!(group.value(), &Value::Float(2.0));
        assert_eq!(group.key().canonical_value(), &Value::Int(2));
        assert_eq!(group.first().map(|f| f.id), Some(1));
    }

    #[test]
    fn list_keys_compare_element_wise() {
        let mut table = GroupTable::new();

        table.insert(Value::List(vec![Value::Int(1), Value::from("a")]), member(1));
        table.insert(Value::List(vec![Value::Float(1.0), Value::from("a")]), member(2));
        table.insert(Value::List(vec![Value::from("a"), Value::Int(1)]), member(3));

        assert_eq!(table.len(), 2);
        assert_eq!(table.groups()[0].len(), 2);
    }

    #[test]
    fn same_key_requires_canonical_equality() {
        let a = GroupKey::new(Value::from("a"));
        let b = GroupKey::new(Value::from("b"));

        assert!(!a.same_key(&b));
        assert!(a.same_key(&GroupKey::new(Value::from("a"))));
    }

    #[test]
    fn has_geometry_ignores_empty_geometries() {
        let mut table = GroupTable::new();
        table.insert(
            Value::Null,
            member(1).with_geometry(Geometry::empty_collection()),
        );
        assert!(!table.groups()[0].has_geometry());

        let point = Geometry::from_wkt("POINT(1 2)").expect("point should parse");
        table.insert(Value::Null, member(2).with_geometry(point));
        assert!(table.groups()[0].has_geometry());
    }
}
