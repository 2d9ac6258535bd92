//! An ordered map implemented with an AVL tree.
//!
//! [`AvlTreeMap`] keeps its entries sorted by key and guarantees logarithmic
//! height after every insertion and removal. Absent keys can resolve to a
//! configured default through [`AvlTreeMap::fetch`].
//!
//! ```
//! use avl_map::AvlTreeMap;
//!
//! let mut map = AvlTreeMap::with_default(0);
//! map.insert("b", 2);
//! map.insert("a", 1);
//! assert_eq!(map.fetch("c").as_deref(), Some(&0));
//! assert_eq!(map.keys().copied().collect::<Vec<_>>(), ["a", "b"]);
//! ```

mod default;
mod error;
mod map;
mod tree;

pub use default::{Builder, DefaultPolicy, Generator};
pub use error::{Error, Result};
pub use map::{AvlTreeMap, IntoIter, Iter, IterMut, Keys, Values, ValuesMut};

#[cfg(test)]
mod proptests;
