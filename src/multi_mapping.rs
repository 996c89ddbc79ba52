//! The multi-mapping capability traits.
//!
//! [`MultiMapping`] and [`MutableMultiMapping`] describe any collection that can hold several values
//! per key in a meaningful order. An implementor supplies a handful of primitives and receives the
//! rest of the multi-mapping API as provided methods. Implementors with a better strategy for a
//! provided method (for example, [`MultiDict`](crate::MultiDict) removes every occurrence of a key in
//! one pass instead of popping them one by one) override it.
//!
//! # Examples
//!
//! A minimal implementation over a vector of pairs:
//!
//! ```
//! use multicollections::{MultiMapping, MutableMultiMapping};
//!
//! #[derive(Default)]
//! struct Pairs(Vec<(&'static str, i32)>);
//!
//! impl MultiMapping for Pairs {
//!     type Key = &'static str;
//!     type Value = i32;
//!
//!     fn len(&self) -> usize {
//!         self.0.len()
//!     }
//!
//!     fn iter(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)> {
//!         self.0.iter().map(|(k, v)| (k, v))
//!     }
//!
//!     fn get_all(&self, key: &Self::Key) -> impl Iterator<Item = &Self::Value> {
//!         self.0.iter().filter(move |(k, _)| k == key).map(|(_, v)| v)
//!     }
//! }
//!
//! impl MutableMultiMapping for Pairs {
//!     fn add(&mut self, key: Self::Key, value: Self::Value) {
//!         self.0.push((key, value));
//!     }
//!
//!     fn set(&mut self, key: Self::Key, value: Self::Value) -> Option<Self::Value> {
//!         let first = self.0.iter().position(|(k, _)| *k == key);
//!         let Some(first) = first else {
//!             self.0.push((key, value));
//!             return None;
//!         };
//!         let previous = std::mem::replace(&mut self.0[first].1, value);
//!         let mut position = 0;
//!         self.0.retain(|(k, _)| {
//!             position += 1;
//!             *k != key || position - 1 == first
//!         });
//!         Some(previous)
//!     }
//!
//!     fn pop_one(&mut self, key: &Self::Key) -> Option<Self::Value> {
//!         let first = self.0.iter().position(|(k, _)| k == key)?;
//!         Some(self.0.remove(first).1)
//!     }
//! }
//!
//! let mut pairs = Pairs::default();
//! pairs.add("a", 1);
//! pairs.add("b", 2);
//! pairs.add("a", 3);
//! assert_eq!(pairs.get_one(&"a"), Some(&1));
//! assert_eq!(pairs.pop_all(&"a"), Some(vec![1, 3]));
//! assert_eq!(pairs.len(), 1);
//! ```

use alloc::vec;
use alloc::vec::Vec;
use core::hash::Hash;

use hashbrown::HashSet;

use crate::Error;

/// A read-only collection holding any number of values per key, in a defined order.
///
/// Required primitives: [`len`](MultiMapping::len), [`iter`](MultiMapping::iter) and
/// [`get_all`](MultiMapping::get_all). Everything else is derived from them.
pub trait MultiMapping {
    /// The key type.
    type Key: Eq;
    /// The value type.
    type Value;

    /// Returns the number of entries, counting every occurrence of every key.
    fn len(&self) -> usize;

    /// Iterates over every `(key, value)` entry in order. Keys repeat once per occurrence.
    fn iter(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)>;

    /// Iterates over every value stored for `key` in order. Empty if `key` is absent.
    fn get_all(&self, key: &Self::Key) -> impl Iterator<Item = &Self::Value>;

    /// Returns `true` if there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the first value stored for `key`.
    fn get_one(&self, key: &Self::Key) -> Option<&Self::Value> {
        self.get_all(key).next()
    }

    /// Returns the first value stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent.
    fn try_get_one(&self, key: &Self::Key) -> Result<&Self::Value, Error> {
        self.get_one(key).ok_or(Error::KeyNotFound)
    }

    /// Iterates over every value stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent.
    fn try_get_all(&self, key: &Self::Key) -> Result<impl Iterator<Item = &Self::Value>, Error> {
        if self.contains_key(key) {
            Ok(self.get_all(key))
        } else {
            Err(Error::KeyNotFound)
        }
    }

    /// Returns `true` if `key` has at least one occurrence.
    fn contains_key(&self, key: &Self::Key) -> bool {
        self.get_one(key).is_some()
    }

    /// Returns the number of occurrences of `key`.
    fn count(&self, key: &Self::Key) -> usize {
        self.get_all(key).count()
    }

    /// Returns `true` if `value` is stored under `key`.
    fn contains_entry(&self, key: &Self::Key, value: &Self::Value) -> bool
    where
        Self::Value: PartialEq,
    {
        self.get_all(key).any(|v| v == value)
    }

    /// Iterates over the keys in order, once per occurrence.
    fn keys(&self) -> impl Iterator<Item = &Self::Key> {
        self.iter().map(|(k, _)| k)
    }

    /// Iterates over the values in order.
    fn values(&self) -> impl Iterator<Item = &Self::Value> {
        self.iter().map(|(_, v)| v)
    }
}

/// A [`MultiMapping`] that can be modified.
///
/// Required primitives: [`add`](MutableMultiMapping::add), [`set`](MutableMultiMapping::set) and
/// [`pop_one`](MutableMultiMapping::pop_one). `set` and `pop_one` depend on where the first
/// occurrence lives, which the read-only primitives cannot express.
pub trait MutableMultiMapping: MultiMapping {
    /// Appends a new entry without touching existing occurrences of `key`.
    fn add(&mut self, key: Self::Key, value: Self::Value);

    /// Collapses `key` to a single entry holding `value`.
    ///
    /// The entry stays at the position of the first prior occurrence, or is appended if there was
    /// none. All other prior occurrences are removed. Returns the value previously stored at the first
    /// occurrence.
    fn set(&mut self, key: Self::Key, value: Self::Value) -> Option<Self::Value>;

    /// Removes and returns the first value stored for `key`.
    fn pop_one(&mut self, key: &Self::Key) -> Option<Self::Value>;

    /// Removes and returns the first value stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent; nothing is removed.
    fn try_pop_one(&mut self, key: &Self::Key) -> Result<Self::Value, Error> {
        self.pop_one(key).ok_or(Error::KeyNotFound)
    }

    /// Ensures `key` has an occurrence by [`add`](MutableMultiMapping::add)ing `default` if it is
    /// absent, and returns the value at the first occurrence.
    ///
    /// # Panics
    ///
    /// Panics if the implementation's `add` does not make `key` visible to
    /// [`get_one`](MultiMapping::get_one).
    fn get_one_or_insert(&mut self, key: Self::Key, default: Self::Value) -> &Self::Value
    where
        Self::Key: Clone,
    {
        if !self.contains_key(&key) {
            self.add(key.clone(), default);
        }
        self.get_one(&key)
            .expect("`MutableMultiMapping::get_one_or_insert()` - key is missing after insertion!")
    }

    /// Removes every occurrence of `key`, returning the values in order.
    ///
    /// Returns `None` if `key` is absent.
    fn pop_all(&mut self, key: &Self::Key) -> Option<Vec<Self::Value>> {
        let mut values = vec![self.pop_one(key)?];
        while let Some(value) = self.pop_one(key) {
            values.push(value);
        }
        Some(values)
    }

    /// Removes every occurrence of `key`, returning the values in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent.
    fn try_pop_all(&mut self, key: &Self::Key) -> Result<Vec<Self::Value>, Error> {
        self.pop_all(key).ok_or(Error::KeyNotFound)
    }

    /// Removes every occurrence of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent.
    fn remove(&mut self, key: &Self::Key) -> Result<(), Error> {
        self.try_pop_all(key).map(drop)
    }

    /// Removes and returns an arbitrary entry.
    ///
    /// The provided implementation removes the first entry.
    fn pop_item(&mut self) -> Option<(Self::Key, Self::Value)>
    where
        Self::Key: Clone,
    {
        let key = self.keys().next()?.clone();
        let value = self.pop_one(&key)?;
        Some((key, value))
    }

    /// Removes and returns an arbitrary entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] if there are no entries.
    fn try_pop_item(&mut self) -> Result<(Self::Key, Self::Value), Error>
    where
        Self::Key: Clone,
    {
        self.pop_item().ok_or(Error::Empty)
    }

    /// Removes every entry.
    fn clear(&mut self)
    where
        Self::Key: Clone,
    {
        loop {
            let Some(key) = self.keys().next().cloned() else {
                break;
            };
            self.pop_all(&key);
        }
    }

    /// Appends every pair from `iter`, never replacing.
    fn extend_pairs<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (Self::Key, Self::Value)>,
    {
        for (key, value) in iter {
            self.add(key, value);
        }
    }

    /// Appends the pairs from `iter` whose key was absent before the call.
    ///
    /// Presence is decided once, against the entries that existed when `merge` was called, so every
    /// pair for a new key is kept.
    fn merge<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (Self::Key, Self::Value)>,
        Self::Key: Hash + Clone,
    {
        let existing: HashSet<Self::Key> = self.keys().cloned().collect();
        for (key, value) in iter {
            if !existing.contains(&key) {
                self.add(key, value);
            }
        }
    }

    /// Updates from `iter`, replacing keys that existed before the call.
    ///
    /// The first pair for a pre-existing key [`set`](MutableMultiMapping::set)s it; later pairs for
    /// that key, and all pairs for new keys, are [`add`](MutableMultiMapping::add)ed. A key's
    /// pre-existing duplicates are collapsed while duplicates within `iter` all survive.
    fn update<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (Self::Key, Self::Value)>,
        Self::Key: Hash + Clone,
    {
        let mut existing: HashSet<Self::Key> = self.keys().cloned().collect();
        for (key, value) in iter {
            if existing.remove(&key) {
                self.set(key, value);
            } else {
                self.add(key, value);
            }
        }
    }
}
