//! # Ordered collections backed by a red-black tree
//!
//! `tree-collections` provides [`TreeMap`], a map sorted by key, and
//! [`TreeSet`], a thin set wrapper around it.  Both are backed by a
//! [red-black tree](https://en.wikipedia.org/wiki/Red%E2%80%93black_tree)
//! whose nodes live in an index-addressed arena, so lookups, insertions,
//! and removals are O(log n) and the tree never forms `Rc` cycles despite
//! keeping parent back-links for cheap in-order traversal.
//!
//! Keys are compared either through their `Ord` instance or through a
//! comparator supplied at construction; the choice is fixed for the life
//! of the collection.  The collections are single-threaded and in-memory.

mod tree_map;
pub use tree_map::Cursor;
pub use tree_map::CursorInvalidated;
pub use tree_map::Iter;
pub use tree_map::TreeMap;
pub use tree_map::{
    Difference, Intersection, SymmetricDifference, TreeSet, Union,
};
