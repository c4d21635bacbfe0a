//! Arena-backed red-black tree shared by both engines.
//!
//! Nodes live in a `SlotMap` and refer to each other by `NodeId`, so parent
//! links are plain indices and rotations are index reassignment. The tree
//! only knows shape and color; callers decide where an item goes (through
//! [`RbTree::locate`] or their own descent) and the tree rebalances.
//!
//! Removal relinks the in-order successor into the removed node's position
//! instead of moving items between nodes, so a `NodeId` stays attached to its
//! item for as long as the item is in the tree. Cursors and the hash tree
//! bins' linear lists rely on that.

use core::cmp::Ordering;
use slotmap::{new_key_type, SecondaryMap, SlotMap};

new_key_type! {
    pub(crate) struct NodeId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// Where a new node would be attached: under `parent` on `side`, or as the
/// root when `None`.
pub(crate) type Slot = Option<(NodeId, Side)>;

#[derive(Clone, Debug)]
struct RbNode<T> {
    item: T,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    color: Color,
}

#[derive(Clone, Debug)]
pub(crate) struct RbTree<T> {
    nodes: SlotMap<NodeId, RbNode<T>>,
    root: Option<NodeId>,
}

impl<T> Default for RbTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RbTree<T> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            root: None,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub(crate) fn root(&self) -> Option<NodeId> {
        self.root
    }

    #[inline]
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[inline]
    pub(crate) fn item(&self, id: NodeId) -> &T {
        &self.nodes[id].item
    }

    #[inline]
    pub(crate) fn item_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id].item
    }

    #[inline]
    pub(crate) fn left(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].left
    }

    #[inline]
    pub(crate) fn right(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].right
    }

    #[cfg(test)]
    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    #[inline]
    fn color_of(&self, id: Option<NodeId>) -> Color {
        id.map_or(Color::Black, |n| self.nodes[n].color)
    }

    #[inline]
    fn set_color(&mut self, id: Option<NodeId>, color: Color) {
        if let Some(n) = id {
            self.nodes[n].color = color;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    pub(crate) fn first(&self) -> Option<NodeId> {
        self.root.map(|r| self.leftmost(r))
    }

    pub(crate) fn last(&self) -> Option<NodeId> {
        self.root.map(|r| self.rightmost(r))
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(l) = self.nodes[id].left {
            id = l;
        }
        id
    }

    fn rightmost(&self, mut id: NodeId) -> NodeId {
        while let Some(r) = self.nodes[id].right {
            id = r;
        }
        id
    }

    /// In-order successor: leftmost node of the right subtree, or the first
    /// ancestor reached from a left child.
    pub(crate) fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(r) = self.nodes[id].right {
            return Some(self.leftmost(r));
        }
        let mut child = id;
        let mut parent = self.nodes[id].parent;
        while let Some(p) = parent {
            if self.nodes[p].right != Some(child) {
                break;
            }
            child = p;
            parent = self.nodes[p].parent;
        }
        parent
    }

    pub(crate) fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(l) = self.nodes[id].left {
            return Some(self.rightmost(l));
        }
        let mut child = id;
        let mut parent = self.nodes[id].parent;
        while let Some(p) = parent {
            if self.nodes[p].left != Some(child) {
                break;
            }
            child = p;
            parent = self.nodes[p].parent;
        }
        parent
    }

    /// Binary descent. `probe(item)` reports how the target compares to
    /// `item`. Returns the matching node, or the slot a new node belongs in.
    pub(crate) fn locate<F>(&self, mut probe: F) -> Result<NodeId, Slot>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut cur = match self.root {
            Some(r) => r,
            None => return Err(None),
        };
        loop {
            let node = &self.nodes[cur];
            let (next, side) = match probe(&node.item) {
                Ordering::Equal => return Ok(cur),
                Ordering::Less => (node.left, Side::Left),
                Ordering::Greater => (node.right, Side::Right),
            };
            match next {
                Some(n) => cur = n,
                None => return Err(Some((cur, side))),
            }
        }
    }

    /// Links a red node at `slot` and restores balance.
    pub(crate) fn insert_at(&mut self, slot: Slot, item: T) -> NodeId {
        let parent = slot.map(|(p, _)| p);
        let id = self.nodes.insert(RbNode {
            item,
            parent,
            left: None,
            right: None,
            color: Color::Red,
        });
        match slot {
            None => {
                debug_assert!(self.root.is_none(), "root slot requested on non-empty tree");
                self.root = Some(id);
            }
            Some((p, Side::Left)) => self.nodes[p].left = Some(id),
            Some((p, Side::Right)) => self.nodes[p].right = Some(id),
        }
        self.fix_after_insertion(id);
        id
    }

    fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self.nodes[x].right else {
            return;
        };
        let y_left = self.nodes[y].left;
        self.nodes[x].right = y_left;
        if let Some(b) = y_left {
            self.nodes[b].parent = Some(x);
        }
        let xp = self.nodes[x].parent;
        self.nodes[y].parent = xp;
        self.replace_child(xp, x, Some(y));
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
    }

    fn rotate_right(&mut self, x: NodeId) {
        let Some(y) = self.nodes[x].left else {
            return;
        };
        let y_right = self.nodes[y].right;
        self.nodes[x].left = y_right;
        if let Some(b) = y_right {
            self.nodes[b].parent = Some(x);
        }
        let xp = self.nodes[x].parent;
        self.nodes[y].parent = xp;
        self.replace_child(xp, x, Some(y));
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
    }

    /// Points whichever link of `parent` held `old` at `new` (the root link
    /// when `parent` is `None`). Does not touch `new`'s parent pointer.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                if self.nodes[p].left == Some(old) {
                    self.nodes[p].left = new;
                } else {
                    self.nodes[p].right = new;
                }
            }
        }
    }

    fn fix_after_insertion(&mut self, mut x: NodeId) {
        while let Some(p) = self.nodes[x].parent {
            if self.nodes[p].color == Color::Black {
                break;
            }
            // A red parent is never the root, so the grandparent exists.
            let Some(g) = self.nodes[p].parent else {
                break;
            };
            if self.nodes[g].left == Some(p) {
                let uncle = self.nodes[g].right;
                if self.color_of(uncle) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.nodes[g].color = Color::Red;
                    x = g;
                } else {
                    if self.nodes[p].right == Some(x) {
                        x = p;
                        self.rotate_left(x);
                    }
                    let p = self.nodes[x].parent.unwrap_or(x);
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.nodes[g].left;
                if self.color_of(uncle) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.nodes[g].color = Color::Red;
                    x = g;
                } else {
                    if self.nodes[p].left == Some(x) {
                        x = p;
                        self.rotate_right(x);
                    }
                    let p = self.nodes[x].parent.unwrap_or(x);
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root;
        self.set_color(root, Color::Black);
    }

    /// Unlinks `z` and returns its item, or `None` for a stale id.
    ///
    /// A node with two children is replaced by its in-order successor, which
    /// takes over `z`'s links and color; the successor's old position (with
    /// at most one child) is what actually leaves the tree shape.
    pub(crate) fn remove(&mut self, z: NodeId) -> Option<T> {
        let (z_left, z_right, z_parent) = {
            let n = self.nodes.get(z)?;
            (n.left, n.right, n.parent)
        };

        let removed_color;
        let fix_node;
        let fix_parent;

        match (z_left, z_right) {
            (None, _) | (_, None) => {
                let child = z_left.or(z_right);
                removed_color = self.nodes[z].color;
                fix_node = child;
                fix_parent = z_parent;
                self.replace_child(z_parent, z, child);
                if let Some(c) = child {
                    self.nodes[c].parent = z_parent;
                }
            }
            (Some(l), Some(r)) => {
                let y = self.leftmost(r);
                removed_color = self.nodes[y].color;
                let y_right = self.nodes[y].right;
                fix_node = y_right;
                if y == r {
                    fix_parent = Some(y);
                } else {
                    let y_parent = self.nodes[y].parent;
                    fix_parent = y_parent;
                    if let Some(yp) = y_parent {
                        self.nodes[yp].left = y_right;
                    }
                    if let Some(c) = y_right {
                        self.nodes[c].parent = y_parent;
                    }
                    self.nodes[y].right = Some(r);
                    self.nodes[r].parent = Some(y);
                }
                self.replace_child(z_parent, z, Some(y));
                self.nodes[y].parent = z_parent;
                self.nodes[y].left = Some(l);
                self.nodes[l].parent = Some(y);
                self.nodes[y].color = self.nodes[z].color;
            }
        }

        if removed_color == Color::Black {
            self.fix_after_deletion(fix_node, fix_parent);
        }
        self.nodes.remove(z).map(|n| n.item)
    }

    /// Absorbs the missing black on the path through `x` (which may be nil,
    /// hence the separately tracked parent).
    fn fix_after_deletion(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        while x != self.root && self.color_of(x) == Color::Black {
            let Some(p) = parent else {
                break;
            };
            if self.nodes[p].left == x {
                let mut w = self.nodes[p].right;
                if self.color_of(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.nodes[p].color = Color::Red;
                    self.rotate_left(p);
                    w = self.nodes[p].right;
                }
                let Some(wn) = w else {
                    x = Some(p);
                    parent = self.nodes[p].parent;
                    continue;
                };
                let (wl, wr) = (self.nodes[wn].left, self.nodes[wn].right);
                if self.color_of(wl) == Color::Black && self.color_of(wr) == Color::Black {
                    self.nodes[wn].color = Color::Red;
                    x = Some(p);
                    parent = self.nodes[p].parent;
                } else {
                    let mut wn = wn;
                    if self.color_of(wr) == Color::Black {
                        self.set_color(wl, Color::Black);
                        self.nodes[wn].color = Color::Red;
                        self.rotate_right(wn);
                        wn = match self.nodes[p].right {
                            Some(n) => n,
                            None => break,
                        };
                    }
                    self.nodes[wn].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    let wr = self.nodes[wn].right;
                    self.set_color(wr, Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let mut w = self.nodes[p].left;
                if self.color_of(w) == Color::Red {
                    self.set_color(w, Color::Black);
                    self.nodes[p].color = Color::Red;
                    self.rotate_right(p);
                    w = self.nodes[p].left;
                }
                let Some(wn) = w else {
                    x = Some(p);
                    parent = self.nodes[p].parent;
                    continue;
                };
                let (wl, wr) = (self.nodes[wn].left, self.nodes[wn].right);
                if self.color_of(wl) == Color::Black && self.color_of(wr) == Color::Black {
                    self.nodes[wn].color = Color::Red;
                    x = Some(p);
                    parent = self.nodes[p].parent;
                } else {
                    let mut wn = wn;
                    if self.color_of(wl) == Color::Black {
                        self.set_color(wr, Color::Black);
                        self.nodes[wn].color = Color::Red;
                        self.rotate_left(wn);
                        wn = match self.nodes[p].left {
                            Some(n) => n,
                            None => break,
                        };
                    }
                    self.nodes[wn].color = self.nodes[p].color;
                    self.nodes[p].color = Color::Black;
                    let wl = self.nodes[wn].left;
                    self.set_color(wl, Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    /// Node ids in in-order sequence.
    pub(crate) fn in_order_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len());
        let mut cur = self.first();
        while let Some(id) = cur {
            out.push(id);
            cur = self.successor(id);
        }
        out
    }

    /// Mutable access to several items at once, in the order given by `ids`.
    /// Ids not in the tree are skipped.
    pub(crate) fn items_mut_in(&mut self, ids: &[NodeId]) -> Vec<&mut T> {
        let mut rank: SecondaryMap<NodeId, usize> = SecondaryMap::with_capacity(ids.len());
        for (i, &id) in ids.iter().enumerate() {
            rank.insert(id, i);
        }
        let mut slots: Vec<Option<&mut T>> = (0..ids.len()).map(|_| None).collect();
        for (id, node) in self.nodes.iter_mut() {
            if let Some(&r) = rank.get(id) {
                slots[r] = Some(&mut node.item);
            }
        }
        slots.into_iter().flatten().collect()
    }

    /// Consumes the tree, yielding items in in-order sequence.
    pub(crate) fn into_items_in_order(self) -> Vec<T> {
        let ids = self.in_order_ids();
        self.into_items(&ids)
    }

    /// Consumes the tree, yielding the items of `ids` in that order.
    pub(crate) fn into_items(mut self, ids: &[NodeId]) -> Vec<T> {
        ids.iter()
            .filter_map(|&id| self.nodes.remove(id).map(|n| n.item))
            .collect()
    }

    /// Builds a balanced tree from items already in order, in O(n).
    ///
    /// Subtrees are split at the midpoint; only the deepest level, which may
    /// be incomplete, is colored red so every root-to-nil path carries the
    /// same number of black nodes.
    pub(crate) fn from_sorted<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let mut items = items.into_iter();
        let n = items.len();
        let mut tree = Self {
            nodes: SlotMap::with_capacity_and_key(n),
            root: None,
        };
        let red_level = Self::red_level(n);
        tree.root = tree.build(0, 0, n, red_level, &mut items);
        if let Some(r) = tree.root {
            tree.nodes[r].parent = None;
        }
        tree
    }

    /// Depth of the deepest, possibly incomplete, level of a midpoint-built
    /// tree with `n` nodes.
    fn red_level(n: usize) -> usize {
        let mut level = 0;
        let mut m = n as isize - 1;
        while m >= 0 {
            level += 1;
            m = m / 2 - 1;
        }
        level
    }

    /// Builds `[lo, hi)` at depth `level`, consuming items left to right.
    fn build<I>(
        &mut self,
        level: usize,
        lo: usize,
        hi: usize,
        red_level: usize,
        items: &mut I,
    ) -> Option<NodeId>
    where
        I: Iterator<Item = T>,
    {
        if lo >= hi {
            return None;
        }
        let mid = lo + (hi - lo - 1) / 2;
        let left = self.build(level + 1, lo, mid, red_level, items);
        let item = items.next()?;
        let color = if level == red_level {
            Color::Red
        } else {
            Color::Black
        };
        let id = self.nodes.insert(RbNode {
            item,
            parent: None,
            left,
            right: None,
            color,
        });
        if let Some(l) = left {
            self.nodes[l].parent = Some(id);
        }
        let right = self.build(level + 1, mid + 1, hi, red_level, items);
        self.nodes[id].right = right;
        if let Some(r) = right {
            self.nodes[r].parent = Some(id);
        }
        Some(id)
    }

    /// Verifies the red-black invariants, parent links, and that each
    /// in-order neighbor pair satisfies `ordered(prev, next)`. Returns the
    /// black height.
    pub(crate) fn check<F>(&self, mut ordered: F) -> Result<usize, String>
    where
        F: FnMut(&T, &T) -> bool,
    {
        let Some(root) = self.root else {
            return if self.nodes.is_empty() {
                Ok(0)
            } else {
                Err(format!("no root but {} nodes", self.nodes.len()))
            };
        };
        if self.nodes[root].color != Color::Black {
            return Err("root is red".into());
        }
        if self.nodes[root].parent.is_some() {
            return Err("root has a parent".into());
        }
        let (height, count) = self.check_subtree(root)?;
        if count != self.nodes.len() {
            return Err(format!(
                "{} nodes reachable but {} allocated",
                count,
                self.nodes.len()
            ));
        }
        let ids = self.in_order_ids();
        for pair in ids.windows(2) {
            if !ordered(self.item(pair[0]), self.item(pair[1])) {
                return Err("in-order sequence out of order".into());
            }
        }
        Ok(height)
    }

    fn check_subtree(&self, id: NodeId) -> Result<(usize, usize), String> {
        let node = &self.nodes[id];
        let mut heights = [1usize; 2];
        let mut count = 1;
        for (i, child) in [node.left, node.right].into_iter().enumerate() {
            if let Some(c) = child {
                if !self.nodes.contains_key(c) {
                    return Err("dangling child link".into());
                }
                if self.nodes[c].parent != Some(id) {
                    return Err("child does not point back to parent".into());
                }
                if node.color == Color::Red && self.nodes[c].color == Color::Red {
                    return Err("red node with red child".into());
                }
                let (h, n) = self.check_subtree(c)?;
                heights[i] = h;
                count += n;
            }
        }
        if heights[0] != heights[1] {
            return Err(format!(
                "black height mismatch: {} vs {}",
                heights[0], heights[1]
            ));
        }
        let own = usize::from(node.color == Color::Black);
        Ok((heights[0] + own, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(tree: &mut RbTree<i32>, v: i32) -> Option<NodeId> {
        match tree.locate(|x| v.cmp(x)) {
            Ok(_) => None,
            Err(slot) => Some(tree.insert_at(slot, v)),
        }
    }

    fn items(tree: &RbTree<i32>) -> Vec<i32> {
        tree.in_order_ids().into_iter().map(|id| *tree.item(id)).collect()
    }

    fn check(tree: &RbTree<i32>) {
        tree.check(|a, b| a < b).unwrap();
    }

    #[test]
    fn ascending_inserts_stay_balanced() {
        let mut t = RbTree::new();
        for v in 0..1000 {
            insert(&mut t, v);
            check(&t);
        }
        // A red-black tree of n nodes is at most 2*log2(n+1) deep.
        let depth = t
            .in_order_ids()
            .into_iter()
            .map(|mut id| {
                let mut d = 1;
                while let Some(p) = t.parent(id) {
                    d += 1;
                    id = p;
                }
                d
            })
            .max()
            .unwrap();
        assert!(depth <= 20, "depth {depth} too large");
    }

    #[test]
    fn duplicate_locates_existing() {
        let mut t = RbTree::new();
        let id = insert(&mut t, 5).unwrap();
        assert!(insert(&mut t, 5).is_none());
        assert_eq!(t.locate(|x| 5.cmp(x)), Ok(id));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn removal_keeps_ids_attached_to_items() {
        let mut t = RbTree::new();
        let ids: Vec<_> = (0..64).map(|v| insert(&mut t, v).unwrap()).collect();
        // Remove interior nodes, which exercises the two-children path.
        for v in (0..64).step_by(3) {
            assert_eq!(t.remove(ids[v as usize]), Some(v));
            check(&t);
        }
        for (v, id) in ids.iter().enumerate() {
            if v % 3 != 0 {
                assert_eq!(*t.item(*id), v as i32);
            } else {
                assert!(!t.contains(*id));
            }
        }
    }

    #[test]
    fn remove_everything_in_scrambled_order() {
        let mut t = RbTree::new();
        let mut ids = Vec::new();
        for v in 0..200 {
            ids.push((v, insert(&mut t, (v * 37) % 200).unwrap()));
        }
        for (_, id) in ids.iter().rev().step_by(2) {
            t.remove(*id);
            check(&t);
        }
        for (_, id) in ids.iter().rev().skip(1).step_by(2) {
            t.remove(*id);
            check(&t);
        }
        assert!(t.is_empty());
        assert_eq!(t.root(), None);
    }

    #[test]
    fn neighbours() {
        let mut t = RbTree::new();
        for v in [50, 20, 80, 10, 30, 70, 90] {
            insert(&mut t, v);
        }
        let first = t.first().unwrap();
        assert_eq!(*t.item(first), 10);
        assert_eq!(t.predecessor(first), None);
        let next = t.successor(first).unwrap();
        assert_eq!(*t.item(next), 20);
        let last = t.last().unwrap();
        assert_eq!(*t.item(last), 90);
        assert_eq!(*t.item(t.predecessor(last).unwrap()), 80);
        assert_eq!(t.successor(last), None);
    }

    #[test]
    fn sorted_build_is_valid_for_every_size() {
        for n in 0..130 {
            let t = RbTree::from_sorted(0..n);
            check(&t);
            assert_eq!(items(&t), (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn sorted_build_accepts_further_mutation() {
        let mut t = RbTree::from_sorted((0..50).map(|v| v * 2));
        for v in (1..100).step_by(2) {
            insert(&mut t, v);
            check(&t);
        }
        assert_eq!(items(&t), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn items_mut_follow_requested_order() {
        let mut t = RbTree::new();
        for v in [3, 1, 2] {
            insert(&mut t, v);
        }
        let ids = t.in_order_ids();
        for (i, item) in t.items_mut_in(&ids).into_iter().enumerate() {
            *item += 10 * i as i32;
        }
        assert_eq!(items(&t), vec![1, 12, 23]);
        assert_eq!(t.into_items_in_order(), vec![1, 12, 23]);
    }
}
