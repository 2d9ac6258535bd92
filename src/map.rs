//! An ordered map implemented with an AVL tree.

use std::borrow::{Borrow, Cow};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::iter::FromIterator;
use std::ops::Index;
use std::sync::Arc;

use tracing::debug;

use crate::default::{Builder, DefaultPolicy};
use crate::error::{Error, Result};
use crate::tree::{Shape, Signature, Subtree};

mod iter;

pub use iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};

/// An ordered map implemented with an AVL tree.
///
/// ```
/// use avl_map::AvlTreeMap;
/// let mut map = AvlTreeMap::new();
/// map.insert(0, "zero");
/// map.insert(1, "one");
/// map.insert(2, "two");
/// assert_eq!(map.get(&1), Some(&"one"));
/// map.remove(&1);
/// assert!(map.get(&1).is_none());
/// ```
#[derive(Clone)]
pub struct AvlTreeMap<K, V> {
    root: Subtree<K, V>,
    num_nodes: usize,
    default: DefaultPolicy<V>,
}

impl<K, V> AvlTreeMap<K, V> {
    /// Creates an empty map without a default value.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self::with_policy(DefaultPolicy::None)
    }

    /// Creates an empty map whose [`fetch`](Self::fetch) resolves absent keys to `value`.
    pub fn with_default(value: V) -> Self {
        Self::with_policy(DefaultPolicy::Fixed(value))
    }

    /// Creates an empty map whose [`fetch`](Self::fetch) resolves absent keys
    /// to a fresh result of `generate`, called once per lookup.
    pub fn with_default_fn<F>(generate: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        Self::with_policy(DefaultPolicy::Generated(Arc::new(generate)))
    }

    /// Returns a builder for configuring the default value policy.
    pub fn builder() -> Builder<K, V> {
        Builder::new()
    }

    pub(crate) fn with_policy(default: DefaultPolicy<V>) -> Self {
        Self {
            root: Subtree::Empty,
            num_nodes: 0,
            default,
        }
    }

    /// Returns the default value policy.
    pub fn default_policy(&self) -> &DefaultPolicy<V> {
        &self.default
    }

    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        matches!(self.root, Subtree::Empty)
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the height of the tree, 0 for an empty map and 1 for a single entry.
    pub fn height(&self) -> usize {
        self.root.height()
    }

    /// Clears the map, deallocating all memory.
    /// The default value policy is kept.
    pub fn clear(&mut self) {
        debug!(len = self.num_nodes, "clearing map");
        self.root = Subtree::Empty;
        self.num_nodes = 0;
    }

    /// Returns the entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.root.first()
    }

    /// Returns the entry with the largest key.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.root.last()
    }

    /// Calls `f` for every entry in ascending key order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        self.root.for_each(&mut f);
    }

    /// Calls `f` for every key in ascending order.
    pub fn for_each_key<F>(&self, mut f: F)
    where
        F: FnMut(&K),
    {
        self.root.for_each(&mut |key: &K, _: &V| f(key));
    }

    /// Calls `f` for every value in ascending key order.
    pub fn for_each_value<F>(&self, mut f: F)
    where
        F: FnMut(&V),
    {
        self.root.for_each(&mut |_: &K, value: &V| f(value));
    }

    /// Gets an iterator over the entries of the map in sorted order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.root, self.num_nodes)
    }

    /// Gets a mutable iterator over the entries of the map in sorted order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.root, self.num_nodes)
    }

    /// Gets an iterator over the keys of the map in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Gets an iterator over the values of the map in key order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Gets a mutable iterator over the values of the map in key order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// Renders the tree shape for debugging, one node per line with its height.
    /// The format is not stable.
    pub fn dump(&self) -> String
    where
        K: fmt::Display,
    {
        Shape(&self.root).to_string()
    }

    /// Renders the parenthesized tree structure for debugging, e.g. `((1) 2 (3))`.
    /// An empty map renders as an empty string.
    pub fn signature(&self) -> String
    where
        K: fmt::Display,
    {
        Signature(&self.root).to_string()
    }

    /// Copies all entries into a `HashMap`.
    pub fn to_hash_map(&self) -> HashMap<K, V>
    where
        K: Clone + Hash + Eq,
        V: Clone,
    {
        self.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl<K: Ord, V> AvlTreeMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    /// Never consults the default value policy.
    ///
    /// The key may be any borrowed form of the map's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.root.retrieve(key)
    }

    /// Returns the value corresponding to the key, or the default if the key is absent.
    ///
    /// A fixed default is borrowed, a generated default is created fresh on every call.
    /// Returns `None` only if the key is absent and no default is configured.
    pub fn fetch<Q>(&self, key: &Q) -> Option<Cow<'_, V>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        V: Clone,
    {
        match self.root.retrieve(key) {
            Some(value) => Some(Cow::Borrowed(value)),
            None => self.default.resolve(),
        }
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.root.retrieve_mut(key)
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.root.retrieve_entry(key)
    }

    /// Returns true if the map contains a value for the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.root.retrieve(key).is_some()
    }

    /// Inserts a key-value pair into the map.
    /// Returns the previous value if the key was already present, the key itself is kept.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (root, previous) = self.root.take().store(key, value);
        self.root = root;
        if previous.is_none() {
            self.num_nodes += 1;
        }
        previous
    }

    /// Converts `key` into the map's key type, then inserts like [`insert`](Self::insert).
    ///
    /// ```
    /// use avl_map::AvlTreeMap;
    /// let mut map = AvlTreeMap::<String, i32>::new();
    /// map.insert_from("b", 2);
    /// map.insert_from('a', 1);
    /// assert_eq!(map.keys().collect::<Vec<_>>(), ["a", "b"]);
    /// ```
    pub fn insert_from<T>(&mut self, key: T, value: V) -> Option<V>
    where
        T: Into<K>,
    {
        self.insert(key.into(), value)
    }

    /// Removes a key from the map.
    /// Returns the value at the key if the key was previously in the map.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the map.
    /// Returns the stored key and value if the key was previously in the map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (removed, root) = self.root.take().delete(key);
        self.root = root;
        if removed.is_some() {
            debug_assert!(self.num_nodes >= 1);
            self.num_nodes -= 1;
        }
        removed
    }

    /// Walks the tree and checks key order, node heights, the AVL condition
    /// and the cached length.
    pub fn verify(&self) -> Result<()> {
        self.root.verify()?;
        let counted = self.root.size();
        if counted != self.num_nodes {
            return Err(Error::LengthMismatch {
                cached: self.num_nodes,
                counted,
            });
        }
        Ok(())
    }

    /// Asserts that the internal tree structure is consistent.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        if let Err(err) = self.verify() {
            panic!("inconsistent tree: {err}");
        }
    }
}

impl<K, V> Default for AvlTreeMap<K, V> {
    /// Creates an empty map.
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Maps are equal if they hold equal entries; the default policy is not compared.
impl<K: PartialEq, V: PartialEq> PartialEq for AvlTreeMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for AvlTreeMap<K, V> {}

impl<K, Q, V> Index<&Q> for AvlTreeMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlTreeMap<K, V> {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        iter.into_iter().for_each(move |(key, value)| {
            self.insert(key, value);
        });
    }
}

impl<'a, K, V> Extend<(&'a K, &'a V)> for AvlTreeMap<K, V>
where
    K: Ord + Copy + 'a,
    V: Copy + 'a,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        self.extend(iter.into_iter().map(|(&key, &value)| (key, value)));
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut AvlTreeMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V> IntoIterator for AvlTreeMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.root, self.num_nodes)
    }
}

impl<K: Hash + Eq, V> From<AvlTreeMap<K, V>> for HashMap<K, V> {
    fn from(map: AvlTreeMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::AvlTreeMap;
    use crate::error::Error;

    #[test]
    fn test_verify_rejects_stale_length() {
        let mut map: AvlTreeMap<i32, ()> = (0..5).map(|key| (key, ())).collect();
        assert_eq!(map.verify(), Ok(()));

        map.num_nodes = 3;
        assert_eq!(
            map.verify(),
            Err(Error::LengthMismatch {
                cached: 3,
                counted: 5
            })
        );
    }

    #[test]
    #[should_panic(expected = "inconsistent tree")]
    fn test_check_consistency_panics() {
        let mut map: AvlTreeMap<i32, ()> = (0..5).map(|key| (key, ())).collect();
        map.num_nodes = 6;
        map.check_consistency();
    }
}
