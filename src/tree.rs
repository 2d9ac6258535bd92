//! The recursive AVL tree algebra behind `AvlTreeMap`.
//!
//! Every mutating operation consumes a subtree and returns the subtree that
//! replaces it, rebalancing on the way back up. Absence is the `Empty`
//! variant, so there is no shared sentinel object and no parent links.

use std::borrow::Borrow;
use std::cmp::{self, Ordering};
use std::fmt;
use std::mem;

use tracing::trace;

use crate::error::{Error, Result};

/// A possibly empty subtree.
#[derive(Clone)]
pub(crate) enum Subtree<K, V> {
    Empty,
    Occupied(Box<Node<K, V>>),
}

#[derive(Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) left: Subtree<K, V>,
    pub(crate) right: Subtree<K, V>,
    height: usize,
}

impl<K, V> Default for Subtree<K, V> {
    fn default() -> Self {
        Subtree::Empty
    }
}

impl<K, V> Subtree<K, V> {
    pub(crate) fn height(&self) -> usize {
        match self {
            Subtree::Empty => 0,
            Subtree::Occupied(node) => node.height,
        }
    }

    fn balance(&self) -> isize {
        match self {
            Subtree::Empty => 0,
            Subtree::Occupied(node) => node.balance(),
        }
    }

    /// Detaches the subtree, leaving `Empty` in its place.
    pub(crate) fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Calls `f` for every entry in ascending key order.
    pub(crate) fn for_each<F>(&self, f: &mut F)
    where
        F: FnMut(&K, &V),
    {
        if let Subtree::Occupied(node) = self {
            node.left.for_each(f);
            f(&node.key, &node.value);
            node.right.for_each(f);
        }
    }

    /// Counts the nodes by walking the whole subtree.
    pub(crate) fn size(&self) -> usize {
        match self {
            Subtree::Empty => 0,
            Subtree::Occupied(node) => node.left.size() + 1 + node.right.size(),
        }
    }

    pub(crate) fn first(&self) -> Option<(&K, &V)> {
        let mut current = self;
        let mut found = None;
        while let Subtree::Occupied(node) = current {
            found = Some((&node.key, &node.value));
            current = &node.left;
        }
        found
    }

    pub(crate) fn last(&self) -> Option<(&K, &V)> {
        let mut current = self;
        let mut found = None;
        while let Subtree::Occupied(node) = current {
            found = Some((&node.key, &node.value));
            current = &node.right;
        }
        found
    }

    fn rebalance(self) -> Self {
        match self {
            Subtree::Empty => Subtree::Empty,
            Subtree::Occupied(node) => Subtree::Occupied(node.rebalance()),
        }
    }

    fn fmt_shape(&self, f: &mut fmt::Formatter<'_>, depth: usize, label: &str) -> fmt::Result
    where
        K: fmt::Display,
    {
        match self {
            Subtree::Empty => Ok(()),
            Subtree::Occupied(node) => {
                writeln!(
                    f,
                    "{:indent$}{}{} (height {})",
                    "",
                    label,
                    node.key,
                    node.height,
                    indent = depth * 2
                )?;
                node.left.fmt_shape(f, depth + 1, "L: ")?;
                node.right.fmt_shape(f, depth + 1, "R: ")
            }
        }
    }

    fn fmt_signature(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        K: fmt::Display,
    {
        match self {
            Subtree::Empty => Ok(()),
            Subtree::Occupied(node) => {
                f.write_str("(")?;
                if let Subtree::Occupied(_) = node.left {
                    node.left.fmt_signature(f)?;
                    f.write_str(" ")?;
                }
                write!(f, "{}", node.key)?;
                if let Subtree::Occupied(_) = node.right {
                    f.write_str(" ")?;
                    node.right.fmt_signature(f)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl<K: Ord, V> Subtree<K, V> {
    /// Inserts or overwrites `key`.
    /// Returns the replacement subtree and the overwritten value, if any.
    pub(crate) fn store(self, key: K, value: V) -> (Self, Option<V>) {
        match self {
            Subtree::Empty => (Subtree::Occupied(Node::leaf(key, value)), None),
            Subtree::Occupied(node) => {
                let (node, previous) = node.store(key, value);
                (Subtree::Occupied(node), previous)
            }
        }
    }

    pub(crate) fn retrieve<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.retrieve_entry(key).map(|(_, value)| value)
    }

    pub(crate) fn retrieve_entry<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self {
            Subtree::Empty => None,
            Subtree::Occupied(node) => match key.cmp(node.key.borrow()) {
                Ordering::Less => node.left.retrieve_entry(key),
                Ordering::Equal => Some((&node.key, &node.value)),
                Ordering::Greater => node.right.retrieve_entry(key),
            },
        }
    }

    pub(crate) fn retrieve_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self {
            Subtree::Empty => None,
            Subtree::Occupied(node) => match key.cmp(node.key.borrow()) {
                Ordering::Less => node.left.retrieve_mut(key),
                Ordering::Equal => Some(&mut node.value),
                Ordering::Greater => node.right.retrieve_mut(key),
            },
        }
    }

    /// Removes `key`.
    /// Returns the removed entry, if any, and the replacement subtree.
    pub(crate) fn delete<Q>(self, key: &Q) -> (Option<(K, V)>, Self)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self {
            Subtree::Empty => (None, Subtree::Empty),
            Subtree::Occupied(node) => node.delete(key),
        }
    }

    /// Walks the whole subtree checking key order, stored heights and the AVL condition.
    pub(crate) fn verify(&self) -> Result<()> {
        self.verify_within(None, None).map(|_| ())
    }

    /// Returns the computed height of a valid subtree.
    fn verify_within(&self, lower: Option<&K>, upper: Option<&K>) -> Result<usize> {
        let node = match self {
            Subtree::Empty => return Ok(0),
            Subtree::Occupied(node) => node,
        };
        if lower.is_some_and(|lower| *lower >= node.key)
            || upper.is_some_and(|upper| *upper <= node.key)
        {
            return Err(Error::Unordered);
        }

        let left_height = node.left.verify_within(lower, Some(&node.key))?;
        let right_height = node.right.verify_within(Some(&node.key), upper)?;

        let computed = 1 + cmp::max(left_height, right_height);
        if node.height != computed {
            return Err(Error::HeightMismatch {
                stored: node.height,
                computed,
            });
        }

        let balance = left_height as isize - right_height as isize;
        if !(-1..=1).contains(&balance) {
            return Err(Error::Unbalanced { balance });
        }

        Ok(computed)
    }
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, value: V) -> Box<Self> {
        Box::new(Node {
            key,
            value,
            left: Subtree::Empty,
            right: Subtree::Empty,
            height: 1,
        })
    }

    pub(crate) fn into_entry(self: Box<Self>) -> (K, V) {
        let Node { key, value, .. } = *self;
        (key, value)
    }

    fn balance(&self) -> isize {
        self.left.height() as isize - self.right.height() as isize
    }

    fn update_height(&mut self) {
        self.height = 1 + cmp::max(self.left.height(), self.right.height());
    }

    /// Restores the AVL condition at this node if necessary and adjusts its height.
    /// The initial balance must not exceed +2 or -2, which always holds after a single update.
    fn rebalance(mut self: Box<Self>) -> Box<Self> {
        let balance = self.balance();
        debug_assert!((-2..=2).contains(&balance));
        if balance > 1 {
            if self.left.balance() >= 0 {
                trace!(case = "LL", "rotating subtree");
                self.rotate_right()
            } else {
                trace!(case = "LR", "rotating subtree");
                self.rotate_left_right()
            }
        } else if balance < -1 {
            if self.right.balance() <= 0 {
                trace!(case = "RR", "rotating subtree");
                self.rotate_left()
            } else {
                trace!(case = "RL", "rotating subtree");
                self.rotate_right_left()
            }
        } else {
            self.update_height();
            self
        }
    }

    //     D        B
    //    / \      / \
    //   B   e -> a   D
    //  / \          / \
    // a   c        c   e
    fn rotate_right(mut self: Box<Self>) -> Box<Self> {
        let mut pivot = match self.left.take() {
            Subtree::Occupied(pivot) => pivot,
            Subtree::Empty => return self,
        };
        self.left = pivot.right.take();
        self.update_height();
        pivot.right = Subtree::Occupied(self);
        pivot.update_height();
        pivot
    }

    //   B            D
    //  / \          / \
    // a   D   ->   B   e
    //    / \      / \
    //   c   e    a   c
    fn rotate_left(mut self: Box<Self>) -> Box<Self> {
        let mut pivot = match self.right.take() {
            Subtree::Occupied(pivot) => pivot,
            Subtree::Empty => return self,
        };
        self.right = pivot.left.take();
        self.update_height();
        pivot.left = Subtree::Occupied(self);
        pivot.update_height();
        pivot
    }

    //     F            D
    //    / \         /   \
    //   B   g       B     F
    //  / \     ->  / \   / \
    // a   D       a   c e   g
    //    / \
    //   c   e
    fn rotate_left_right(mut self: Box<Self>) -> Box<Self> {
        let mut left = match self.left.take() {
            Subtree::Occupied(left) => left,
            Subtree::Empty => return self,
        };
        let mut pivot = match left.right.take() {
            Subtree::Occupied(pivot) => pivot,
            Subtree::Empty => {
                self.left = Subtree::Occupied(left);
                return self.rotate_right();
            }
        };
        self.left = pivot.right.take();
        left.right = pivot.left.take();
        left.update_height();
        self.update_height();
        pivot.left = Subtree::Occupied(left);
        pivot.right = Subtree::Occupied(self);
        pivot.update_height();
        pivot
    }

    //   B              D
    //  / \           /   \
    // a   F         B     F
    //    / \   ->  / \   / \
    //   D   g     a   c e   g
    //  / \
    // c   e
    fn rotate_right_left(mut self: Box<Self>) -> Box<Self> {
        let mut right = match self.right.take() {
            Subtree::Occupied(right) => right,
            Subtree::Empty => return self,
        };
        let mut pivot = match right.left.take() {
            Subtree::Occupied(pivot) => pivot,
            Subtree::Empty => {
                self.right = Subtree::Occupied(right);
                return self.rotate_left();
            }
        };
        self.right = pivot.left.take();
        right.left = pivot.right.take();
        right.update_height();
        self.update_height();
        pivot.left = Subtree::Occupied(self);
        pivot.right = Subtree::Occupied(right);
        pivot.update_height();
        pivot
    }

    /// Unlinks this node's children and returns the subtree that takes its place.
    /// The promoted predecessor or successor node is reused, not copied.
    fn delete_self(&mut self) -> Subtree<K, V> {
        match (self.left.take(), self.right.take()) {
            (Subtree::Empty, Subtree::Empty) => Subtree::Empty,
            (Subtree::Occupied(left), right) if right.height() < left.height => {
                let (mut promoted, remainder) = left.delete_max();
                promoted.left = remainder;
                promoted.right = right;
                Subtree::Occupied(promoted)
            }
            (left, Subtree::Occupied(right)) => {
                let (mut promoted, remainder) = right.delete_min();
                promoted.left = left;
                promoted.right = remainder;
                Subtree::Occupied(promoted)
            }
            // Only reachable with an empty right side, already covered above.
            (left, Subtree::Empty) => left,
        }
    }

    /// Detaches the node with the smallest key.
    /// Returns it along with the rebalanced remainder.
    fn delete_min(mut self: Box<Self>) -> (Box<Self>, Subtree<K, V>) {
        match self.left.take() {
            Subtree::Empty => {
                let remainder = self.right.take();
                (self, remainder)
            }
            Subtree::Occupied(left) => {
                let (min, remainder) = left.delete_min();
                self.left = remainder;
                (min, Subtree::Occupied(self.rebalance()))
            }
        }
    }

    /// Detaches the node with the largest key.
    /// Returns it along with the rebalanced remainder.
    fn delete_max(mut self: Box<Self>) -> (Box<Self>, Subtree<K, V>) {
        match self.right.take() {
            Subtree::Empty => {
                let remainder = self.left.take();
                (self, remainder)
            }
            Subtree::Occupied(right) => {
                let (max, remainder) = right.delete_max();
                self.right = remainder;
                (max, Subtree::Occupied(self.rebalance()))
            }
        }
    }
}

impl<K: Ord, V> Node<K, V> {
    fn store(mut self: Box<Self>, key: K, value: V) -> (Box<Self>, Option<V>) {
        let previous = match key.cmp(&self.key) {
            Ordering::Less => {
                let (left, previous) = self.left.take().store(key, value);
                self.left = left;
                previous
            }
            Ordering::Equal => {
                // Overwrite in place, the shape does not change.
                let previous = mem::replace(&mut self.value, value);
                return (self, Some(previous));
            }
            Ordering::Greater => {
                let (right, previous) = self.right.take().store(key, value);
                self.right = right;
                previous
            }
        };
        (self.rebalance(), previous)
    }

    fn delete<Q>(mut self: Box<Self>, key: &Q) -> (Option<(K, V)>, Subtree<K, V>)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match key.cmp(self.key.borrow()) {
            Ordering::Less => {
                let (removed, left) = self.left.take().delete(key);
                self.left = left;
                (removed, Subtree::Occupied(self.rebalance()))
            }
            Ordering::Greater => {
                let (removed, right) = self.right.take().delete(key);
                self.right = right;
                (removed, Subtree::Occupied(self.rebalance()))
            }
            Ordering::Equal => {
                let replacement = self.delete_self().rebalance();
                (Some(self.into_entry()), replacement)
            }
        }
    }
}

/// Renders the tree shape, one node per line, children indented below their parent.
pub(crate) struct Shape<'a, K, V>(pub(crate) &'a Subtree<K, V>);

impl<K: fmt::Display, V> fmt::Display for Shape<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_shape(f, 0, "")
    }
}

/// Renders the parenthesized structure, e.g. `((1) 2 (3))`.
pub(crate) struct Signature<'a, K, V>(pub(crate) &'a Subtree<K, V>);

impl<K: fmt::Display, V> fmt::Display for Signature<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_signature(f)
    }
}

#[cfg(test)]
mod tests {
    use super::{Node, Shape, Signature, Subtree};
    use crate::error::Error;

    fn build(keys: &[i32]) -> Subtree<i32, i32> {
        keys.iter().fold(Subtree::Empty, |tree, &key| {
            let (tree, previous) = tree.store(key, key * 10);
            assert!(previous.is_none());
            tree.verify().unwrap();
            tree
        })
    }

    fn keys(tree: &Subtree<i32, i32>) -> Vec<i32> {
        let mut keys = Vec::new();
        tree.for_each(&mut |key: &i32, _: &i32| keys.push(*key));
        keys
    }

    #[test]
    fn test_empty() {
        let tree = Subtree::<i32, i32>::Empty;
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.retrieve(&1), None);
        assert_eq!(tree.verify(), Ok(()));
        assert_eq!(tree.size(), 0);
        assert!(tree.first().is_none());
        assert_eq!(Signature(&tree).to_string(), "");

        let (removed, tree) = tree.delete(&1);
        assert!(removed.is_none());
        assert!(matches!(tree, Subtree::Empty));
    }

    #[test]
    fn test_single_right_rotation() {
        let tree = build(&[3, 2, 1]);
        assert_eq!(tree.height(), 2);
        assert_eq!(Signature(&tree).to_string(), "((1) 2 (3))");
    }

    #[test]
    fn test_single_left_rotation() {
        let tree = build(&[1, 2, 3]);
        assert_eq!(tree.height(), 2);
        assert_eq!(Signature(&tree).to_string(), "((1) 2 (3))");
    }

    #[test]
    fn test_double_rotations() {
        let tree = build(&[1, 3, 2]);
        assert_eq!(tree.height(), 2);
        assert_eq!(Signature(&tree).to_string(), "((1) 2 (3))");

        let tree = build(&[3, 1, 2]);
        assert_eq!(tree.height(), 2);
        assert_eq!(Signature(&tree).to_string(), "((1) 2 (3))");
    }

    #[test]
    fn test_overwrite_keeps_shape() {
        let tree = build(&[4, 2, 6, 1, 3, 5, 7]);
        let before = Signature(&tree).to_string();
        let height = tree.height();

        let (tree, previous) = tree.store(3, -3);
        assert_eq!(previous, Some(30));
        assert_eq!(tree.retrieve(&3), Some(&-3));
        assert_eq!(tree.height(), height);
        assert_eq!(Signature(&tree).to_string(), before);
        assert_eq!(tree.verify(), Ok(()));
        assert_eq!(tree.size(), 7);
    }

    #[test]
    fn test_delete_node_with_two_children() {
        let tree = build(&[10, 20, 30, 40, 50]);
        assert_eq!(tree.size(), 5);
        let (removed, tree) = tree.delete(&30);
        assert_eq!(removed, Some((30, 300)));
        assert_eq!(keys(&tree), vec![10, 20, 40, 50]);
        assert_eq!(tree.verify(), Ok(()));
        assert_eq!(tree.size(), 4);
    }

    #[test]
    fn test_delete_promotes_predecessor_from_taller_side() {
        //      4              3
        //     / \            / \
        //    2   5   ->     2   5
        //   / \            /
        //  1   3          1
        let tree = build(&[4, 2, 5, 1, 3]);
        assert_eq!(Signature(&tree).to_string(), "(((1) 2 (3)) 4 (5))");
        let (removed, tree) = tree.delete(&4);
        assert_eq!(removed, Some((4, 40)));
        assert_eq!(Signature(&tree).to_string(), "(((1) 2) 3 (5))");
        tree.verify().unwrap();
    }

    #[test]
    fn test_delete_promotes_successor_on_tie() {
        let tree = build(&[2, 1, 3]);
        let (removed, tree) = tree.delete(&2);
        assert_eq!(removed, Some((2, 20)));
        assert_eq!(Signature(&tree).to_string(), "((1) 3)");
        tree.verify().unwrap();
    }

    #[test]
    fn test_delete_missing_key() {
        let tree = build(&[1, 2, 3]);
        let (removed, tree) = tree.delete(&42);
        assert!(removed.is_none());
        assert_eq!(tree.verify(), Ok(()));
        assert_eq!(tree.size(), 3);
    }

    #[test]
    fn test_delete_rebalances() {
        //   2          3
        //  / \        / \
        // 1   3  ->  2   4
        //      \
        //       4
        let tree = build(&[2, 1, 3, 4]);
        let (removed, tree) = tree.delete(&1);
        assert_eq!(removed, Some((1, 10)));
        assert_eq!(Signature(&tree).to_string(), "((2) 3 (4))");
        assert_eq!(tree.height(), 2);
    }

    #[test]
    fn test_first_last() {
        let tree = build(&[5, 3, 8, 1, 4, 9]);
        assert_eq!(tree.first(), Some((&1, &10)));
        assert_eq!(tree.last(), Some((&9, &90)));
    }

    #[test]
    fn test_shape() {
        let tree = build(&[1, 2, 3]);
        assert_eq!(
            Shape(&tree).to_string(),
            "2 (height 2)\n  L: 1 (height 1)\n  R: 3 (height 1)\n"
        );
    }

    #[test]
    fn test_verify_rejects_wrong_height() {
        let mut tree = build(&[1, 2, 3]);
        if let Subtree::Occupied(node) = &mut tree {
            node.height = 7;
        }
        assert_eq!(
            tree.verify(),
            Err(Error::HeightMismatch {
                stored: 7,
                computed: 2
            })
        );
    }

    #[test]
    fn test_verify_rejects_unordered_keys() {
        //   5
        //  /
        // 9
        let mut root = Node::leaf(5, 50);
        root.left = Subtree::Occupied(Node::leaf(9, 90));
        root.update_height();
        assert_eq!(Subtree::Occupied(root).verify(), Err(Error::Unordered));

        // 5
        //          //   5
        let mut root = Node::leaf(5, 50);
        root.right = Subtree::Occupied(Node::leaf(5, 51));
        root.update_height();
        assert_eq!(Subtree::Occupied(root).verify(), Err(Error::Unordered));
    }

    #[test]
    fn test_verify_rejects_unbalanced() {
        // 1
        //          //   2
        //            //     3
        let mut middle = Node::leaf(2, 20);
        middle.right = Subtree::Occupied(Node::leaf(3, 30));
        middle.update_height();
        let mut root = Node::leaf(1, 10);
        root.right = Subtree::Occupied(middle);
        root.update_height();
        let tree = Subtree::Occupied(root);
        assert_eq!(tree.size(), 3);
        assert_eq!(tree.verify(), Err(Error::Unbalanced { balance: -2 }));

        //     3
        //    /
        //   2
        //  /
        // 1
        let mut middle = Node::leaf(2, 20);
        middle.left = Subtree::Occupied(Node::leaf(1, 10));
        middle.update_height();
        let mut root = Node::leaf(3, 30);
        root.left = Subtree::Occupied(middle);
        root.update_height();
        assert_eq!(
            Subtree::Occupied(root).verify(),
            Err(Error::Unbalanced { balance: 2 })
        );
    }
}
