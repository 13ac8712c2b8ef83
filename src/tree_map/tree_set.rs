use std::cmp::Ordering::{self, *};
use std::fmt::{Debug, Formatter};
use std::iter::FusedIterator;

use super::{Iter, TreeMap};

/// A sorted set of values.
///
/// The implementation is a thin wrapper around [`TreeMap`] with unit
/// values, so it inherits the map's red-black balancing, its O(log n)
/// operations, and its choice of natural or comparator ordering.
#[derive(Clone)]
pub struct TreeSet<V>(TreeMap<V, ()>);

impl<V: Ord> TreeSet<V> {
    /// Creates a new, empty set ordered by the values' `Ord` instance.
    pub fn new() -> Self {
        TreeSet(TreeMap::new())
    }

    /// Creates a new, empty set ordered by the given comparator.
    ///
    /// The comparator preconditions of [`TreeMap::with_comparator`]
    /// apply unchanged.
    pub fn with_comparator<F>(cmp: F) -> Self
    where
        F: Fn(&V, &V) -> Ordering + 'static,
    {
        TreeSet(TreeMap::with_comparator(cmp))
    }

    /// Removes all the entries from the set.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Tests if the set contains the given value.
    pub fn contains(&self, value: &V) -> bool {
        self.0.contains_key(value)
    }

    /// Returns a reference to the element matching value, if it exists.
    pub fn get(&self, value: &V) -> Option<&V> {
        self.0.get_key_value(value).map(|(k, _)| k)
    }

    /// Inserts the given value.  Returns true if the set did not already
    /// contain it and false otherwise.
    ///
    /// # Examples
    /// ```
    /// use tree_collections::TreeSet;
    ///
    /// let mut s = TreeSet::new();
    /// assert!(s.insert(3));
    /// assert!(!s.insert(3));
    /// assert_eq!(s.len(), 1);
    /// ```
    pub fn insert(&mut self, value: V) -> bool {
        self.0.insert(value, ()).is_none()
    }

    /// Removes the given value.  Returns true if the value was present
    /// and false otherwise.
    pub fn remove(&mut self, value: &V) -> bool {
        self.0.remove(value).is_some()
    }

    /// Returns the least value in the set.
    pub fn first(&self) -> Option<&V> {
        self.0.first_key_value().map(|(k, _)| k)
    }

    /// Returns the greatest value in the set.
    pub fn last(&self) -> Option<&V> {
        self.0.last_key_value().map(|(k, _)| k)
    }

    /// Returns an iterator over the set's values in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.0.iter().map(|(k, _)| k)
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set holds no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator of the values in either self or other.
    ///
    /// Both sets must use the same ordering strategy; the merge compares
    /// heads with self's strategy.
    pub fn union<'a>(&'a self, other: &'a Self) -> Union<'a, V> {
        Union(MergeIter {
            lhs: self.0.iter(),
            rhs: other.0.iter(),
        })
    }

    /// Returns an iterator of the values in both self and other.
    pub fn intersection<'a>(&'a self, other: &'a Self) -> Intersection<'a, V> {
        Intersection(MergeIter {
            lhs: self.0.iter(),
            rhs: other.0.iter(),
        })
    }

    /// Returns an iterator of the values in self and not in other.
    pub fn difference<'a>(&'a self, other: &'a Self) -> Difference<'a, V> {
        Difference(MergeIter {
            lhs: self.0.iter(),
            rhs: other.0.iter(),
        })
    }

    /// Returns an iterator of the values in self or other but not both.
    pub fn symmetric_difference<'a>(
        &'a self,
        other: &'a Self,
    ) -> SymmetricDifference<'a, V> {
        SymmetricDifference(MergeIter {
            lhs: self.0.iter(),
            rhs: other.0.iter(),
        })
    }

    /// Returns true if self and other have no common values.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.intersection(other).next().is_none()
    }

    /// Tests if self is a subset of other.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().all(|v| other.contains(v))
    }

    /// Tests if self is a superset of other.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }
}

impl<V: Ord> Default for TreeSet<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Ord> Extend<V> for TreeSet<V> {
    fn extend<T: IntoIterator<Item = V>>(&mut self, iter: T) {
        for v in iter {
            self.insert(v);
        }
    }
}

impl<V: Ord> FromIterator<V> for TreeSet<V> {
    fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
        let mut set = TreeSet::new();
        set.extend(iter);
        set
    }
}

impl<V: Ord, const N: usize> From<[V; N]> for TreeSet<V> {
    fn from(vs: [V; N]) -> Self {
        TreeSet::from_iter(vs)
    }
}

impl<V: Debug> Debug for TreeSet<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.iter().map(|(k, _)| k)).finish()
    }
}

enum MergeItem<'a, V> {
    LeftOnly(&'a V),
    Both(&'a V),
    RightOnly(&'a V),
}

// A simultaneous in-order walk of two sets.  Each step classifies the
// lesser head (or the matching pair) without materializing either side.
struct MergeIter<'a, V> {
    lhs: Iter<'a, V, ()>,
    rhs: Iter<'a, V, ()>,
}

impl<'a, V: Ord> Iterator for MergeIter<'a, V> {
    type Item = MergeItem<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let Some(peek_lhs) = self.lhs.peek_key() else {
            return self.rhs.next().map(|e| MergeItem::RightOnly(e.0));
        };

        let Some(peek_rhs) = self.rhs.peek_key() else {
            return self.lhs.next().map(|e| MergeItem::LeftOnly(e.0));
        };

        match self.lhs.map.cmp_keys(peek_lhs, peek_rhs) {
            Less => self.lhs.next().map(|e| MergeItem::LeftOnly(e.0)),

            Equal => {
                self.lhs.next();
                self.rhs.next().map(|e| MergeItem::Both(e.0))
            }

            Greater => self.rhs.next().map(|e| MergeItem::RightOnly(e.0)),
        }
    }
}

impl<'a, V: Ord> FusedIterator for MergeIter<'a, V> {}

/// Iterator produced by [`TreeSet::union`].
pub struct Union<'a, V>(MergeIter<'a, V>);

impl<'a, V: Ord> Iterator for Union<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        use MergeItem::*;
        self.0.next().map(|i| match i {
            LeftOnly(v) | Both(v) | RightOnly(v) => v,
        })
    }
}

impl<'a, V: Ord> FusedIterator for Union<'a, V> {}

/// Iterator produced by [`TreeSet::intersection`].
pub struct Intersection<'a, V>(MergeIter<'a, V>);

impl<'a, V: Ord> Iterator for Intersection<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.0.next()? {
                MergeItem::Both(v) => return Some(v),
                _ => (),
            }
        }
    }
}

impl<'a, V: Ord> FusedIterator for Intersection<'a, V> {}

/// Iterator produced by [`TreeSet::difference`].
pub struct Difference<'a, V>(MergeIter<'a, V>);

impl<'a, V: Ord> Iterator for Difference<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.0.next()? {
                MergeItem::LeftOnly(v) => return Some(v),
                _ => (),
            }
        }
    }
}

impl<'a, V: Ord> FusedIterator for Difference<'a, V> {}

/// Iterator produced by [`TreeSet::symmetric_difference`].
pub struct SymmetricDifference<'a, V>(MergeIter<'a, V>);

impl<'a, V: Ord> Iterator for SymmetricDifference<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.0.next()? {
                MergeItem::LeftOnly(v) | MergeItem::RightOnly(v) => {
                    return Some(v)
                }
                MergeItem::Both(_) => (),
            }
        }
    }
}

impl<'a, V: Ord> FusedIterator for SymmetricDifference<'a, V> {}
