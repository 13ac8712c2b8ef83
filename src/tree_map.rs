#![warn(missing_docs)]
use std::cmp::Ordering::{self, *};
use std::fmt::{Debug, Formatter};
use std::iter::FusedIterator;
use std::mem::replace;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrd};

mod tree_set;
pub use tree_set::{
    Difference, Intersection, SymmetricDifference, TreeSet, Union,
};

// Nodes live in an arena and refer to each other by index.  The left and
// right links are the ownership edges; parent is a navigational back-link.
type Link = Option<usize>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Black,
}

#[derive(Clone)]
struct Node<K, V> {
    key: K,
    val: V,
    color: Color,
    left: Link,
    right: Link,
    parent: Link,
}

// How a map compares keys.  Chosen at construction and never changed, so
// lookup, insertion, and removal cannot disagree about the key order.
enum KeyOrdering<K> {
    Natural,
    Comparator(Rc<dyn Fn(&K, &K) -> Ordering>),
}

impl<K> Clone for KeyOrdering<K> {
    fn clone(&self) -> Self {
        match self {
            KeyOrdering::Natural => KeyOrdering::Natural,
            KeyOrdering::Comparator(f) => {
                KeyOrdering::Comparator(Rc::clone(f))
            }
        }
    }
}

fn next_map_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(0);
    NEXT_ID.fetch_add(1, AtomicOrd::Relaxed)
}

/// A map from keys to values sorted by key.
///
/// Internally, the map is a [red-black
/// tree](https://en.wikipedia.org/wiki/Red%E2%80%93black_tree): a binary
/// search tree whose coloring discipline bounds its height at
/// `2 * log2(n + 1)`, making every operation O(log n).  Nodes are stored
/// in an arena and linked by index, with parent back-links for the
/// successor walks that drive in-order traversal.
///
/// Keys are ordered either by their `Ord` instance ([`TreeMap::new`]) or
/// by a caller-supplied comparator ([`TreeMap::with_comparator`]).  The
/// strategy is fixed when the map is created.
///
/// Every structural change (an insertion of a new key, a removal, the
/// rebalancing they trigger) bumps an internal modification counter.
/// Detached [`Cursor`]s snapshot that counter and refuse to advance once
/// it moves, rather than walk links that may no longer exist.
pub struct TreeMap<K, V> {
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    root: Link,
    len: usize,
    mods: u64,
    id: u64,
    ordering: KeyOrdering<K>,
}

impl<K: Clone, V: Clone> Clone for TreeMap<K, V> {
    fn clone(&self) -> Self {
        TreeMap {
            nodes: self.nodes.clone(),
            free: self.free.clone(),
            root: self.root,
            len: self.len,
            mods: self.mods,
            // a clone is a different map; cursors do not carry over
            id: next_map_id(),
            ordering: self.ordering.clone(),
        }
    }
}

impl<K: Debug, V: Debug> Debug for TreeMap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.root {
            None => f.write_str("TreeMap(EMPTY)"),
            Some(rt) => {
                f.write_fmt(format_args!("TreeMap(#{}, ", self.len))?;
                self.fmt_node(f, rt)?;
                f.write_str(")")
            }
        }
    }
}

impl<K: Debug, V: Debug> TreeMap<K, V> {
    fn fmt_node(
        &self,
        f: &mut Formatter<'_>,
        idx: usize,
    ) -> std::fmt::Result {
        let n = self.node(idx);
        let c = match n.color {
            Color::Red => 'r',
            Color::Black => 'b',
        };
        f.write_fmt(format_args!("({} {{{:?}: {:?}}} ", c, n.key, n.val))?;

        match n.left {
            None => f.write_str(".")?,
            Some(lf) => self.fmt_node(f, lf)?,
        }

        f.write_str(" ")?;

        match n.right {
            None => f.write_str(".")?,
            Some(rt) => self.fmt_node(f, rt)?,
        }

        f.write_str(")")
    }
}

impl<K, V> TreeMap<K, V> {
    fn node(&self, idx: usize) -> &Node<K, V> {
        self.nodes[idx].as_ref().expect("stale node index")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        self.nodes[idx].as_mut().expect("stale node index")
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    // Unlinks nothing; callers must have detached idx from the tree.
    fn release(&mut self, idx: usize) -> (K, V) {
        let n = self.nodes[idx].take().expect("double free of tree node");
        self.free.push(idx);
        (n.key, n.val)
    }

    // Null-tolerant accessors in the style of the classic red-black
    // fix-up routines: an absent node reads as a black leaf.
    fn color(&self, link: Link) -> Color {
        link.map_or(Color::Black, |i| self.node(i).color)
    }

    fn set_color(&mut self, link: Link, color: Color) {
        if let Some(i) = link {
            self.node_mut(i).color = color;
        }
    }

    fn parent(&self, link: Link) -> Link {
        link.and_then(|i| self.node(i).parent)
    }

    fn left(&self, link: Link) -> Link {
        link.and_then(|i| self.node(i).left)
    }

    fn right(&self, link: Link) -> Link {
        link.and_then(|i| self.node(i).right)
    }

    fn minimum(&self, mut idx: usize) -> usize {
        while let Some(lf) = self.node(idx).left {
            idx = lf;
        }
        idx
    }

    fn maximum(&self, mut idx: usize) -> usize {
        while let Some(rt) = self.node(idx).right {
            idx = rt;
        }
        idx
    }

    // The next node in ascending key order: the minimum of the right
    // subtree, or the nearest ancestor of which idx lies in the left
    // subtree.
    fn successor(&self, idx: usize) -> Link {
        if let Some(rt) = self.node(idx).right {
            return Some(self.minimum(rt));
        }

        let mut child = idx;
        let mut above = self.node(idx).parent;
        while let Some(up) = above {
            if self.node(up).right == Some(child) {
                child = up;
                above = self.node(up).parent;
            } else {
                return Some(up);
            }
        }
        None
    }

    fn predecessor(&self, idx: usize) -> Link {
        if let Some(lf) = self.node(idx).left {
            return Some(self.maximum(lf));
        }

        let mut child = idx;
        let mut above = self.node(idx).parent;
        while let Some(up) = above {
            if self.node(up).left == Some(child) {
                child = up;
                above = self.node(up).parent;
            } else {
                return Some(up);
            }
        }
        None
    }

    //        p                r
    //       / \              / \
    //      x   r     =>     p   z
    //         / \          / \
    //        y   z        x   y
    //
    // The original parent of p and its child slot are read before any
    // link is rewritten, so the promoted node lands in the slot p
    // actually occupied.
    fn rotate_left(&mut self, link: Link) {
        let Some(p) = link else { return };
        let Some(r) = self.node(p).right else { return };

        let y = self.node(r).left;
        self.node_mut(p).right = y;
        if let Some(y) = y {
            self.node_mut(y).parent = Some(p);
        }

        let above = self.node(p).parent;
        self.node_mut(r).parent = above;
        match above {
            None => self.root = Some(r),
            Some(up) => {
                if self.node(up).left == Some(p) {
                    self.node_mut(up).left = Some(r);
                } else {
                    self.node_mut(up).right = Some(r);
                }
            }
        }

        self.node_mut(r).left = Some(p);
        self.node_mut(p).parent = Some(r);
    }

    fn rotate_right(&mut self, link: Link) {
        let Some(p) = link else { return };
        let Some(l) = self.node(p).left else { return };

        let y = self.node(l).right;
        self.node_mut(p).left = y;
        if let Some(y) = y {
            self.node_mut(y).parent = Some(p);
        }

        let above = self.node(p).parent;
        self.node_mut(l).parent = above;
        match above {
            None => self.root = Some(l),
            Some(up) => {
                if self.node(up).right == Some(p) {
                    self.node_mut(up).right = Some(l);
                } else {
                    self.node_mut(up).left = Some(l);
                }
            }
        }

        self.node_mut(l).right = Some(p);
        self.node_mut(p).parent = Some(l);
    }

    // Swaps the payloads of two distinct arena slots, leaving the links
    // and colors in place.  Used when removal relocates the successor's
    // entry into the doomed node's position.
    fn swap_entry(&mut self, a: usize, b: usize) {
        debug_assert_ne!(a, b);
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(hi);
        let na = head[lo].as_mut().expect("stale node index");
        let nb = tail[0].as_mut().expect("stale node index");
        std::mem::swap(&mut na.key, &mut nb.key);
        std::mem::swap(&mut na.val, &mut nb.val);
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops all entries from the map.
    pub fn clear(&mut self) {
        if self.root.is_some() {
            self.mods += 1;
        }
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.len = 0;
    }

    /// Returns the entry with the least key, or `None` on an empty map.
    ///
    /// # Examples
    /// ```
    /// use tree_collections::TreeMap;
    /// let m = TreeMap::from([(2, 'b'), (1, 'a')]);
    /// assert_eq!(m.first_key_value(), Some((&1, &'a')));
    /// ```
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.root.map(|rt| {
            let n = self.node(self.minimum(rt));
            (&n.key, &n.val)
        })
    }

    /// Returns the entry with the greatest key, or `None` on an empty
    /// map.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.root.map(|rt| {
            let n = self.node(self.maximum(rt));
            (&n.key, &n.val)
        })
    }

    /// Creates an iterator over the map entries, sorted by key.
    ///
    /// The iterator walks parent links (successor/predecessor), so it
    /// needs no auxiliary stack and can be restarted at any time by
    /// calling `iter` again.
    ///
    /// # Examples
    /// ```
    /// use tree_collections::TreeMap;
    ///
    /// let m = TreeMap::from([(0, 1), (1, 2), (2, 3)]);
    /// for (i, (k, v)) in m.iter().enumerate() {
    ///     assert_eq!(&i, k);
    ///     assert_eq!(&(i + 1), v);
    /// }
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            map: self,
            front: self.root.map(|rt| self.minimum(rt)),
            back: self.root.map(|rt| self.maximum(rt)),
            len: self.len,
        }
    }

    /// Produces an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|p| p.0)
    }

    /// Produces an iterator over the values of the map, ordered by their
    /// associated keys.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|p| p.1)
    }

    /// Applies f to each entry of the map in order of the keys.
    pub fn for_each<F: FnMut((&K, &V))>(&self, mut f: F) {
        let mut next = self.root.map(|rt| self.minimum(rt));
        while let Some(idx) = next {
            next = self.successor(idx);
            let n = self.node(idx);
            f((&n.key, &n.val));
        }
    }

    /// Applies f to each entry in key order, passing the value mutably.
    ///
    /// This is the mutating counterpart of [`for_each`](#method.for_each);
    /// keys stay immutable because rewriting a key could break the search
    /// order.
    ///
    /// # Examples
    /// ```
    /// use tree_collections::TreeMap;
    ///
    /// let mut m = TreeMap::from([(0, 0), (1, 1), (2, 2)]);
    /// m.for_each_mut(|(k, v)| *v += k);
    /// assert_eq!(m.get(&2), Some(&4));
    /// ```
    pub fn for_each_mut<F: FnMut((&K, &mut V))>(&mut self, mut f: F) {
        let mut next = self.root.map(|rt| self.minimum(rt));
        while let Some(idx) = next {
            next = self.successor(idx);
            let n = self.node_mut(idx);
            f((&n.key, &mut n.val));
        }
    }

    /// Takes a detached cursor positioned before the least entry.
    ///
    /// Unlike [`iter`](#method.iter), a cursor does not borrow the map.
    /// It snapshots the map's identity and modification counter instead,
    /// and [`advance`](#method.advance) fails fast if the tree has been
    /// structurally modified since the cursor was taken.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            next: self.root.map(|rt| self.minimum(rt)),
            map_id: self.id,
            mods: self.mods,
        }
    }

    /// Steps a cursor to its next entry.
    ///
    /// Returns `Ok(None)` once the cursor has passed the greatest key and
    /// `Err(CursorInvalidated)` if the cursor was taken from a different
    /// map or the tree has been structurally modified since.  Overwriting
    /// the value of an existing key is not a structural change and leaves
    /// cursors valid.
    ///
    /// # Examples
    /// ```
    /// use tree_collections::TreeMap;
    ///
    /// let mut m = TreeMap::from([(1, 'a'), (2, 'b')]);
    /// let mut cur = m.cursor();
    /// assert_eq!(m.advance(&mut cur), Ok(Some((&1, &'a'))));
    ///
    /// m.insert(3, 'c');
    /// assert!(m.advance(&mut cur).is_err());
    /// ```
    pub fn advance<'a>(
        &'a self,
        cursor: &mut Cursor,
    ) -> Result<Option<(&'a K, &'a V)>, CursorInvalidated> {
        if cursor.map_id != self.id || cursor.mods != self.mods {
            return Err(CursorInvalidated);
        }

        let Some(idx) = cursor.next else { return Ok(None) };
        cursor.next = self.successor(idx);
        let n = self.node(idx);
        Ok(Some((&n.key, &n.val)))
    }
}

impl<K: Ord, V> TreeMap<K, V> {
    /// Creates a new, empty map ordered by the keys' `Ord` instance.
    ///
    /// # Examples
    /// ```
    /// use tree_collections::TreeMap;
    /// let m: TreeMap<usize, usize> = TreeMap::new();
    /// assert!(m.is_empty());
    /// ```
    pub fn new() -> Self {
        TreeMap {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
            mods: 0,
            id: next_map_id(),
            ordering: KeyOrdering::Natural,
        }
    }

    /// Creates a new, empty map ordered by the given comparator.
    ///
    /// The comparator must be a consistent total order (antisymmetric and
    /// transitive).  The map applies it to every comparison it makes and
    /// never cross-checks it against `Ord`; an inconsistent comparator
    /// silently corrupts the search order.
    ///
    /// # Examples
    /// ```
    /// use tree_collections::TreeMap;
    ///
    /// let mut m = TreeMap::with_comparator(|a: &i32, b: &i32| b.cmp(a));
    /// m.insert(1, "one");
    /// m.insert(2, "two");
    /// assert_eq!(m.first_key_value(), Some((&2, &"two")));
    /// ```
    pub fn with_comparator<F>(cmp: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        TreeMap {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
            mods: 0,
            id: next_map_id(),
            ordering: KeyOrdering::Comparator(Rc::new(cmp)),
        }
    }

    fn cmp_keys(&self, a: &K, b: &K) -> Ordering {
        match &self.ordering {
            KeyOrdering::Natural => a.cmp(b),
            KeyOrdering::Comparator(f) => f(a, b),
        }
    }

    fn find(&self, key: &K) -> Link {
        let mut curr = self.root;
        while let Some(idx) = curr {
            match self.cmp_keys(key, &self.node(idx).key) {
                Less => curr = self.node(idx).left,
                Equal => return Some(idx),
                Greater => curr = self.node(idx).right,
            }
        }
        None
    }

    /// Tests if the map contains an entry for the given key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Returns a reference to the value associated with the key.
    ///
    /// # Examples
    /// ```
    /// use tree_collections::TreeMap;
    ///
    /// let mut m = TreeMap::new();
    /// m.insert(0, 100);
    /// assert_eq!(m.get(&0), Some(&100));
    /// assert_eq!(m.get(&1), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|idx| &self.node(idx).val)
    }

    /// Returns a mutable reference to the value associated with the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let idx = self.find(key)?;
        Some(&mut self.node_mut(idx).val)
    }

    /// Returns the stored key and value for the given key.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.find(key).map(|idx| {
            let n = self.node(idx);
            (&n.key, &n.val)
        })
    }

    /// Inserts a key-value pair into the map.
    ///
    /// If the key is already present, its value is overwritten in place
    /// and the previous value is returned; the tree shape, the entry
    /// count, and outstanding cursors are unaffected.  Otherwise the new
    /// entry is attached as a red leaf and the tree is recolored and
    /// rotated as needed to stay balanced.
    ///
    /// # Examples
    /// ```
    /// use tree_collections::TreeMap;
    ///
    /// let mut m = TreeMap::new();
    /// assert_eq!(m.insert(1, "a"), None);
    /// assert_eq!(m.insert(1, "b"), Some("a"));
    /// assert_eq!(m.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, val: V) -> Option<V> {
        let Some(mut t) = self.root else {
            let idx = self.alloc(Node {
                key,
                val,
                color: Color::Black,
                left: None,
                right: None,
                parent: None,
            });
            self.root = Some(idx);
            self.len = 1;
            self.mods += 1;
            return None;
        };

        let (above, dir) = loop {
            match self.cmp_keys(&key, &self.node(t).key) {
                Equal => {
                    return Some(replace(&mut self.node_mut(t).val, val));
                }

                Less => match self.node(t).left {
                    Some(lf) => t = lf,
                    None => break (t, Less),
                },

                Greater => match self.node(t).right {
                    Some(rt) => t = rt,
                    None => break (t, Greater),
                },
            }
        };

        let idx = self.alloc(Node {
            key,
            val,
            color: Color::Red,
            left: None,
            right: None,
            parent: Some(above),
        });
        if dir == Less {
            self.node_mut(above).left = Some(idx);
        } else {
            self.node_mut(above).right = Some(idx);
        }

        self.fix_after_insertion(idx);
        self.len += 1;
        self.mods += 1;
        None
    }

    // Repairs a double-red violation introduced by attaching a red leaf.
    // Walks upward recoloring while the uncle is red; otherwise one or
    // two rotations finish the repair.  The root is forced black at the
    // end regardless of how the loop exited.
    fn fix_after_insertion(&mut self, idx: usize) {
        let mut x = Some(idx);

        while x.is_some()
            && x != self.root
            && self.color(self.parent(x)) == Color::Red
        {
            let grand = self.parent(self.parent(x));

            if self.parent(x) == self.left(grand) {
                let uncle = self.right(grand);
                if self.color(uncle) == Color::Red {
                    self.set_color(self.parent(x), Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grand, Color::Red);
                    x = grand;
                } else {
                    if x == self.right(self.parent(x)) {
                        x = self.parent(x);
                        self.rotate_left(x);
                    }
                    self.set_color(self.parent(x), Color::Black);
                    let grand = self.parent(self.parent(x));
                    self.set_color(grand, Color::Red);
                    self.rotate_right(grand);
                }
            } else {
                let uncle = self.left(grand);
                if self.color(uncle) == Color::Red {
                    self.set_color(self.parent(x), Color::Black);
                    self.set_color(uncle, Color::Black);
                    self.set_color(grand, Color::Red);
                    x = grand;
                } else {
                    if x == self.left(self.parent(x)) {
                        x = self.parent(x);
                        self.rotate_right(x);
                    }
                    self.set_color(self.parent(x), Color::Black);
                    let grand = self.parent(self.parent(x));
                    self.set_color(grand, Color::Red);
                    self.rotate_left(grand);
                }
            }
        }

        self.set_color(self.root, Color::Black);
    }

    /// Removes a key from the map and returns the unmapped value.
    ///
    /// # Examples
    /// ```
    /// use tree_collections::TreeMap;
    ///
    /// let mut m = TreeMap::new();
    /// m.insert(1, 2);
    /// m.insert(2, 3);
    /// assert_eq!(m.remove(&2), Some(3));
    /// assert_eq!(m.remove(&2), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.find(key)?;
        Some(self.delete_entry(idx).1)
    }

    fn delete_entry(&mut self, mut p: usize) -> (K, V) {
        self.mods += 1;
        self.len -= 1;

        // An internal node with two children trades payloads with its
        // successor (the minimum of the right subtree, which has no left
        // child); the successor's slot is then the one unlinked.
        if self.node(p).left.is_some() {
            if let Some(rt) = self.node(p).right {
                let succ = self.minimum(rt);
                self.swap_entry(p, succ);
                p = succ;
            }
        }

        let replacement = self.node(p).left.or(self.node(p).right);

        if let Some(r) = replacement {
            // splice p out between its parent and its sole child
            let above = self.node(p).parent;
            self.node_mut(r).parent = above;
            match above {
                None => self.root = Some(r),
                Some(up) => {
                    if self.node(up).left == Some(p) {
                        self.node_mut(up).left = Some(r);
                    } else {
                        self.node_mut(up).right = Some(r);
                    }
                }
            }

            if self.node(p).color == Color::Black {
                self.fix_after_deletion(Some(r));
            }
        } else if self.node(p).parent.is_none() {
            self.root = None;
        } else {
            // p is a childless non-root; rebalance around it while it is
            // still linked, then detach it
            if self.node(p).color == Color::Black {
                self.fix_after_deletion(Some(p));
            }

            if let Some(up) = self.node(p).parent {
                if self.node(up).left == Some(p) {
                    self.node_mut(up).left = None;
                } else if self.node(up).right == Some(p) {
                    self.node_mut(up).right = None;
                }
            }
        }

        self.release(p)
    }

    // Restores the black-height balance after a black node was removed.
    // x carries a conceptual extra unit of blackness; the loop pushes it
    // up through the three standard sibling cases until it lands on a red
    // node or the root.
    fn fix_after_deletion(&mut self, mut x: Link) {
        while x != self.root && self.color(x) == Color::Black {
            if x == self.left(self.parent(x)) {
                let mut sib = self.right(self.parent(x));

                if self.color(sib) == Color::Red {
                    self.set_color(sib, Color::Black);
                    self.set_color(self.parent(x), Color::Red);
                    self.rotate_left(self.parent(x));
                    sib = self.right(self.parent(x));
                }

                if self.color(self.left(sib)) == Color::Black
                    && self.color(self.right(sib)) == Color::Black
                {
                    self.set_color(sib, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.right(sib)) == Color::Black {
                        self.set_color(self.left(sib), Color::Black);
                        self.set_color(sib, Color::Red);
                        self.rotate_right(sib);
                        sib = self.right(self.parent(x));
                    }
                    self.set_color(sib, self.color(self.parent(x)));
                    self.set_color(self.parent(x), Color::Black);
                    self.set_color(self.right(sib), Color::Black);
                    self.rotate_left(self.parent(x));
                    x = self.root;
                }
            } else {
                let mut sib = self.left(self.parent(x));

                if self.color(sib) == Color::Red {
                    self.set_color(sib, Color::Black);
                    self.set_color(self.parent(x), Color::Red);
                    self.rotate_right(self.parent(x));
                    sib = self.left(self.parent(x));
                }

                if self.color(self.right(sib)) == Color::Black
                    && self.color(self.left(sib)) == Color::Black
                {
                    self.set_color(sib, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.color(self.left(sib)) == Color::Black {
                        self.set_color(self.right(sib), Color::Black);
                        self.set_color(sib, Color::Red);
                        self.rotate_left(sib);
                        sib = self.left(self.parent(x));
                    }
                    self.set_color(sib, self.color(self.parent(x)));
                    self.set_color(self.parent(x), Color::Black);
                    self.set_color(self.left(sib), Color::Black);
                    self.rotate_right(self.parent(x));
                    x = self.root;
                }
            }
        }

        self.set_color(x, Color::Black);
    }

    #[cfg(test)]
    fn chk(&self) {
        let occupied = self.nodes.iter().filter(|s| s.is_some()).count();
        assert_eq!(occupied, self.len);
        assert_eq!(self.nodes.len(), self.len + self.free.len());

        match self.root {
            None => assert_eq!(self.len, 0),
            Some(rt) => {
                assert_eq!(self.node(rt).parent, None);
                assert_eq!(self.node(rt).color, Color::Black);
                let (count, _) = self.chk_node(rt, None, None);
                assert_eq!(count, self.len);
            }
        }
    }

    // Verifies the search order, parent links, the red-red prohibition,
    // and a uniform black height; returns (node count, black height).
    #[cfg(test)]
    fn chk_node(
        &self,
        idx: usize,
        lo: Option<&K>,
        hi: Option<&K>,
    ) -> (usize, usize) {
        let n = self.node(idx);

        if let Some(lo) = lo {
            assert_eq!(self.cmp_keys(lo, &n.key), Less);
        }
        if let Some(hi) = hi {
            assert_eq!(self.cmp_keys(&n.key, hi), Less);
        }

        if n.color == Color::Red {
            assert_ne!(self.color(n.left), Color::Red);
            assert_ne!(self.color(n.right), Color::Red);
        }

        let (lf_count, lf_black) = match n.left {
            None => (0, 1),
            Some(lf) => {
                assert_eq!(self.node(lf).parent, Some(idx));
                self.chk_node(lf, lo, Some(&n.key))
            }
        };

        let (rt_count, rt_black) = match n.right {
            None => (0, 1),
            Some(rt) => {
                assert_eq!(self.node(rt).parent, Some(idx));
                self.chk_node(rt, Some(&n.key), hi)
            }
        };

        assert_eq!(lf_black, rt_black);

        let own = (n.color == Color::Black) as usize;
        (lf_count + rt_count + 1, lf_black + own)
    }

    #[cfg(test)]
    fn height(&self) -> usize {
        fn ht<K, V>(map: &TreeMap<K, V>, link: Link) -> usize {
            link.map_or(0, |i| {
                let n = map.node(i);
                1 + ht(map, n.left).max(ht(map, n.right))
            })
        }
        ht(self, self.root)
    }
}

impl<K: Ord, V> Default for TreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> Extend<(K, V)> for TreeMap<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for TreeMap<K, V> {
    fn from(vs: [(K, V); N]) -> Self {
        TreeMap::from_iter(vs)
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for TreeMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = TreeMap::new();
        map.extend(iter);
        map
    }
}

/// A borrowing iterator over a map's entries in ascending key order.
pub struct Iter<'a, K, V> {
    map: &'a TreeMap<K, V>,
    front: Link,
    back: Link,
    len: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    // Used by the set-algebra merge to compare heads without consuming.
    fn peek_key(&self) -> Option<&'a K> {
        if self.len == 0 {
            return None;
        }
        self.front.map(|idx| &self.map.node(idx).key)
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let idx = self.front?;
        self.len -= 1;
        self.front = if self.len == 0 {
            None
        } else {
            self.map.successor(idx)
        };
        let n = self.map.node(idx);
        Some((&n.key, &n.val))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let idx = self.back?;
        self.len -= 1;
        self.back = if self.len == 0 {
            None
        } else {
            self.map.predecessor(idx)
        };
        let n = self.map.node(idx);
        Some((&n.key, &n.val))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {
    fn len(&self) -> usize {
        self.len
    }
}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

/// A detached traversal position over a [`TreeMap`].
///
/// A cursor holds no borrow of its map.  It records the map's identity
/// and modification counter when taken; [`TreeMap::advance`] checks both
/// before touching the tree and reports [`CursorInvalidated`] instead of
/// following links that a later insertion or removal may have rewritten.
#[derive(Clone, Copy, Debug)]
pub struct Cursor {
    next: Link,
    map_id: u64,
    mods: u64,
}

/// The error returned when advancing a [`Cursor`] whose map has been
/// structurally modified since the cursor was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorInvalidated;

impl std::fmt::Display for CursorInvalidated {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("cursor invalidated by a structural map modification")
    }
}

impl std::error::Error for CursorInvalidated {}

#[cfg(test)]
mod test {
    extern crate quickcheck;
    use super::*;
    use quickcheck::quickcheck;

    fn bal_test(vs: Vec<(u8, u32)>) {
        let mut map = TreeMap::new();
        for &(k, v) in vs.iter() {
            map.insert(k, v);
            map.chk();
        }
    }

    fn rm_test(vs: Vec<(i8, u32)>) {
        let mut map = TreeMap::new();
        let mut btree = std::collections::BTreeMap::new();

        for &(k, v) in vs.iter() {
            match k {
                1..=i8::MAX => {
                    let k = k % 32;
                    assert_eq!(map.insert(k, v), btree.insert(k, v));
                }

                0 | i8::MIN => (),

                _ => {
                    let k = -k % 32;
                    assert_eq!(map.remove(&k), btree.remove(&k));
                }
            }

            assert!(map.iter().cmp(btree.iter()).is_eq());
            map.chk();
        }
    }

    // systematically try deleting each element of map
    fn chk_all_removes(map: TreeMap<u8, u8>) {
        for (k, v) in map.clone().iter() {
            let mut map2 = map.clone();
            assert_eq!(map2.remove(k), Some(*v));
            assert_eq!(map2.get(k), None);
            map2.chk();
        }
    }

    fn drain_in_order(vs: Vec<u8>) {
        let mut map: TreeMap<_, _> =
            vs.iter().map(|&k| (k, k as u16 + 100)).collect();
        let mut keys: Vec<u8> = map.keys().copied().collect();

        for k in vs {
            let expect = keys.binary_search(&k).ok().map(|_| k as u16 + 100);
            let got = map.remove(&k);
            assert_eq!(got, expect);
            if let Ok(pos) = keys.binary_search(&k) {
                keys.remove(pos);
            }
            map.chk();
        }

        assert_eq!(map.len(), 0);
        assert_eq!(map.first_key_value(), None);
    }

    #[test]
    fn insert_ordered_scenario() {
        let mut map = TreeMap::new();
        for k in [10, 20, 30, 15, 25, 5] {
            map.insert(k, k * 10);
            map.chk();
        }

        assert_eq!(map.len(), 6);
        assert_eq!(map.first_key_value(), Some((&5, &50)));
        assert_eq!(map.last_key_value(), Some((&30, &300)));

        let keys: Vec<i32> = map.keys().copied().collect();
        assert_eq!(keys, vec![5, 10, 15, 20, 25, 30]);
    }

    #[test]
    fn overwrite_keeps_len_and_shape() {
        let mut map = TreeMap::from([(1, 'a'), (2, 'b'), (3, 'c')]);
        let mods_before = map.mods;

        assert_eq!(map.insert(2, 'x'), Some('b'));
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&2), Some(&'x'));
        assert_eq!(map.mods, mods_before);
        map.chk();
    }

    #[test]
    fn remove_root_until_empty() {
        let mut map: TreeMap<_, _> = (0..32).map(|x| (x, x)).collect();
        while let Some((&k, _)) = map.first_key_value() {
            assert!(map.remove(&k).is_some());
            map.chk();
        }
        assert!(map.is_empty());
    }

    #[test]
    fn rm_each_test() {
        // build map in order to encourage skewing
        let map: TreeMap<_, _> = (0..32).map(|x| (x, x + 100)).collect();
        chk_all_removes(map);

        // build map in reverse order to encourage opposite skewing
        let map: TreeMap<_, _> = (0..32).rev().map(|x| (x, x + 100)).collect();
        chk_all_removes(map);
    }

    #[test]
    fn height_within_rb_bound() {
        let mut map = TreeMap::new();
        for k in 0..1024u32 {
            map.insert(k, ());
        }

        let bound = 2.0 * ((map.len() + 1) as f64).log2();
        assert!((map.height() as f64) <= bound);
        map.chk();
    }

    #[test]
    fn comparator_matches_natural_order() {
        let keys = [5u8, 3, 250, 8, 0, 77, 42, 9, 1, 128];

        let mut natural = TreeMap::new();
        let mut by_cmp = TreeMap::with_comparator(|a: &u8, b: &u8| a.cmp(b));
        for &k in keys.iter() {
            natural.insert(k, ());
            by_cmp.insert(k, ());
            natural.chk();
            by_cmp.chk();
        }

        assert!(natural.iter().cmp(by_cmp.iter()).is_eq());
        assert_eq!(natural.height(), by_cmp.height());
    }

    #[test]
    fn reverse_comparator_reverses_traversal() {
        let keys = [4u8, 1, 9, 2, 7];

        let mut rev = TreeMap::with_comparator(|a: &u8, b: &u8| b.cmp(a));
        for &k in keys.iter() {
            rev.insert(k, ());
            rev.chk();
        }

        let got: Vec<u8> = rev.keys().copied().collect();
        assert_eq!(got, vec![9, 7, 4, 2, 1]);
        assert_eq!(rev.first_key_value(), Some((&9, &())));
        assert_eq!(rev.last_key_value(), Some((&1, &())));
        assert_eq!(rev.get(&7), Some(&()));
        assert_eq!(rev.remove(&7), Some(()));
        rev.chk();
    }

    #[test]
    fn iter_is_double_ended() {
        let map: TreeMap<_, _> = (0..6).map(|x| (x, x)).collect();

        let mut iter = map.iter();
        assert_eq!(iter.next(), Some((&0, &0)));
        assert_eq!(iter.next_back(), Some((&5, &5)));
        assert_eq!(iter.next(), Some((&1, &1)));
        assert_eq!(iter.len(), 3);

        let rest: Vec<i32> = iter.map(|(k, _)| *k).collect();
        assert_eq!(rest, vec![2, 3, 4]);
    }

    #[test]
    fn cursor_walks_in_order() {
        let map = TreeMap::from([(2, 'b'), (1, 'a'), (3, 'c')]);

        let mut cur = map.cursor();
        assert_eq!(map.advance(&mut cur), Ok(Some((&1, &'a'))));
        assert_eq!(map.advance(&mut cur), Ok(Some((&2, &'b'))));
        assert_eq!(map.advance(&mut cur), Ok(Some((&3, &'c'))));
        assert_eq!(map.advance(&mut cur), Ok(None));
        assert_eq!(map.advance(&mut cur), Ok(None));
    }

    #[test]
    fn cursor_invalidated_by_structural_change() {
        let mut map = TreeMap::from([(1, 'a'), (2, 'b')]);

        let mut cur = map.cursor();
        map.insert(3, 'c');
        assert_eq!(map.advance(&mut cur), Err(CursorInvalidated));

        let mut cur = map.cursor();
        map.remove(&1);
        assert_eq!(map.advance(&mut cur), Err(CursorInvalidated));
    }

    #[test]
    fn cursor_survives_value_overwrite() {
        let mut map = TreeMap::from([(1, 'a'), (2, 'b')]);

        let mut cur = map.cursor();
        assert_eq!(map.insert(2, 'z'), Some('b'));
        assert_eq!(map.advance(&mut cur), Ok(Some((&1, &'a'))));
        assert_eq!(map.advance(&mut cur), Ok(Some((&2, &'z'))));
    }

    #[test]
    fn cursor_rejects_other_map() {
        let m1 = TreeMap::from([(1, 'a')]);
        let m2 = TreeMap::from([(1, 'a')]);

        let mut cur = m1.cursor();
        assert_eq!(m2.advance(&mut cur), Err(CursorInvalidated));
    }

    #[test]
    fn arena_slots_are_reused() {
        let mut map = TreeMap::new();
        for k in 0..16 {
            map.insert(k, k);
        }
        for k in 0..8 {
            map.remove(&k);
        }
        for k in 16..24 {
            map.insert(k, k);
        }

        // removals left free slots; the later insertions refill them
        assert_eq!(map.nodes.len(), 16);
        map.chk();
    }

    #[test]
    fn clear_resets_and_invalidates() {
        let mut map = TreeMap::from([(1, 'a'), (2, 'b')]);
        let mut cur = map.cursor();

        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.get(&1), None);
        assert_eq!(map.advance(&mut cur), Err(CursorInvalidated));
        map.chk();
    }

    #[test]
    fn bal_test_regr1() {
        bal_test(vec![(4, 0), (0, 0), (5, 0), (1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn bal_test_regr2() {
        bal_test(vec![(3, 0), (0, 0), (1, 0), (2, 0), (4, 0)]);
    }

    #[test]
    fn rm_test_regr1() {
        rm_test(vec![(101, 0), (100, 0), (1, 0), (-100, 0)]);
    }

    #[test]
    fn rm_test_regr2() {
        rm_test(vec![
            (99, 0),
            (1, 0),
            (103, 0),
            (3, 0),
            (98, 0),
            (2, 0),
            (8, 0),
            (4, 0),
            (5, 0),
            (6, 0),
            (7, 0),
            (102, 0),
            (9, 0),
            (97, 0),
            (-102, 0),
            (10, 0),
            (-97, 0),
        ]);
    }

    quickcheck! {
        fn qc_bal_test(vs: Vec<(u8, u32)>) -> () {
            bal_test(vs);
        }

        fn qc_rm_test(vs: Vec<(i8, u32)>) -> () {
            rm_test(vs);
        }

        fn qc_rm_test2(vs: Vec<(u8, u8)>) -> () {
            let map = vs.into_iter().collect();
            chk_all_removes(map);
        }

        fn qc_drain(vs: Vec<u8>) -> () {
            drain_in_order(vs);
        }

        fn qc_round_trip(vs: Vec<(u16, u16)>) -> () {
            let map: TreeMap<_, _> = vs.iter().copied().collect();
            let btree: std::collections::BTreeMap<_, _> =
                vs.iter().copied().collect();

            assert_eq!(map.len(), btree.len());
            for (k, v) in btree.iter() {
                assert_eq!(map.get(k), Some(v));
            }
            map.chk();
        }

        fn qc_comparator_equivalence(vs: Vec<(u8, u8)>) -> () {
            let natural: TreeMap<_, _> = vs.iter().copied().collect();
            let mut by_cmp =
                TreeMap::with_comparator(|a: &u8, b: &u8| a.cmp(b));
            for &(k, v) in vs.iter() {
                by_cmp.insert(k, v);
            }

            assert!(natural.iter().cmp(by_cmp.iter()).is_eq());
            by_cmp.chk();
        }
    }
}
