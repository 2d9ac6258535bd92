//! What a lookup of an absent key resolves to.

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::map::AvlTreeMap;

/// Shared, thread-safe default value generator.
pub type Generator<V> = Arc<dyn Fn() -> V + Send + Sync>;

/// Default value policy of an [`AvlTreeMap`], consulted by [`AvlTreeMap::fetch`].
#[derive(Clone)]
pub enum DefaultPolicy<V> {
    /// Absent keys resolve to nothing.
    None,
    /// Absent keys resolve to a borrow of this value.
    Fixed(V),
    /// Absent keys resolve to a fresh value from this generator, called once per lookup.
    Generated(Generator<V>),
}

impl<V> DefaultPolicy<V> {
    pub(crate) fn resolve(&self) -> Option<Cow<'_, V>>
    where
        V: Clone,
    {
        match self {
            DefaultPolicy::None => None,
            DefaultPolicy::Fixed(value) => Some(Cow::Borrowed(value)),
            DefaultPolicy::Generated(generate) => Some(Cow::Owned(generate())),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for DefaultPolicy<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultPolicy::None => f.write_str("None"),
            DefaultPolicy::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            DefaultPolicy::Generated(_) => f.write_str("Generated(..)"),
        }
    }
}

/// Configures an [`AvlTreeMap`] before construction.
///
/// A fixed default value and a default generator are mutually exclusive;
/// configuring both makes [`Builder::build`] fail.
///
/// ```
/// use avl_map::{AvlTreeMap, Error};
/// let map = AvlTreeMap::<String, i32>::builder().default_value(0).build().unwrap();
/// assert_eq!(map.fetch("missing").as_deref(), Some(&0));
///
/// let conflicting = AvlTreeMap::<String, i32>::builder()
///     .default_value(0)
///     .default_with(|| 1)
///     .build();
/// assert_eq!(conflicting.unwrap_err(), Error::ConflictingDefaults);
/// ```
pub struct Builder<K, V> {
    default_value: Option<V>,
    default_with: Option<Generator<V>>,
    keys: PhantomData<fn() -> K>,
}

impl<K, V> Builder<K, V> {
    /// Creates a builder without any default configured.
    pub fn new() -> Self {
        Self {
            default_value: None,
            default_with: None,
            keys: PhantomData,
        }
    }

    /// Resolves absent keys to `value`.
    pub fn default_value(mut self, value: V) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Resolves absent keys to a fresh result of `generate` on every lookup.
    pub fn default_with<F>(mut self, generate: F) -> Self
    where
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.default_with = Some(Arc::new(generate));
        self
    }

    /// Creates the empty map.
    /// Fails with [`Error::ConflictingDefaults`] if both defaults were configured.
    pub fn build(self) -> Result<AvlTreeMap<K, V>> {
        let policy = match (self.default_value, self.default_with) {
            (Some(_), Some(_)) => {
                debug!("rejecting map with both a default value and a default generator");
                return Err(Error::ConflictingDefaults);
            }
            (Some(value), None) => DefaultPolicy::Fixed(value),
            (None, Some(generate)) => DefaultPolicy::Generated(generate),
            (None, None) => DefaultPolicy::None,
        };
        Ok(AvlTreeMap::with_policy(policy))
    }
}

impl<K, V> Default for Builder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
