use alloc::vec::{self, Vec};
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{BuildHasher, Hash, Hasher};
use core::iter::FusedIterator;
use core::ops::Index;
use core::slice;

use hashbrown::DefaultHashBuilder;

use crate::raw::{Bucket, RawMultiDict};
use crate::{Error, MultiMapping, MutableMultiMapping};

mod bulk;
mod capacity;
#[cfg(feature = "serde")]
mod serde;

/// An insertion-ordered hash map that can hold several values per key.
///
/// Entries are kept in the order they were inserted, across all keys. [`add`] appends a new entry
/// without touching existing occurrences of its key, so a key may appear any number of times.
/// Single-valued operations act on the *first* occurrence of a key: [`get_one`] reads it,
/// [`pop_one`] removes it, and [`set`] overwrites it in place while removing every later occurrence.
///
/// Iterators obtained from [`MultiDict::iter`], [`MultiDict::keys`], [`MultiDict::values`] or
/// [`MultiDict::into_iter`] yield every entry in insertion order; a key repeats once per occurrence.
/// All iterators borrow the map, so the map cannot be modified while an iteration is in progress.
///
/// Keys must implement [`Eq`] and [`Hash`]. It is a logic error for a key to be modified in such a
/// way that its hash or equality changes while it is in the map. The behavior resulting from such a
/// logic error is not specified, but will be encapsulated to the `MultiDict` that observed the logic
/// error and not result in undefined behavior.
///
/// # Examples
///
/// ```
/// use multicollections::MultiDict;
///
/// let mut headers = MultiDict::new();
///
/// headers.add("Accept", "text/html");
/// headers.add("Host", "example.com");
/// headers.add("Accept", "application/json");
///
/// // every occurrence counts
/// assert_eq!(headers.len(), 3);
///
/// // single-valued access reads the first occurrence
/// assert_eq!(headers.get_one("Accept"), Some(&"text/html"));
/// assert_eq!(headers["Host"], "example.com");
///
/// // multi-valued access reads them all, in insertion order
/// let accept: Vec<_> = headers.get_all("Accept").copied().collect();
/// assert_eq!(accept, ["text/html", "application/json"]);
///
/// // `set` keeps the first position and drops the rest
/// headers.set("Accept", "*/*");
/// let entries: Vec<_> = headers.iter().map(|(&k, &v)| (k, v)).collect();
/// assert_eq!(entries, [("Accept", "*/*"), ("Host", "example.com")]);
/// ```
///
/// A `MultiDict` with a known list of entries can be initialized from an array. Duplicates are
/// kept:
///
/// ```
/// use multicollections::MultiDict;
///
/// let map = MultiDict::from([("a", 1), ("b", 2), ("a", 3)]);
/// assert_eq!(map.len(), 3);
/// assert_eq!(map.count("a"), 2);
/// ```
///
/// # Implementation
///
/// Entries live in a vector alongside the key index, a hash table mapping each distinct key to the
/// ascending list of positions it occupies. Lookups, [`add`] and [`pop_item`] are O(1). Operations
/// that remove entries from the middle of the entry vector compact it in a single O(n) pass and
/// rebuild the key index.
///
/// [`add`]: MultiDict::add
/// [`get_one`]: MultiDict::get_one
/// [`pop_one`]: MultiDict::pop_one
/// [`pop_item`]: MultiDict::pop_item
/// [`set`]: MultiDict::set
pub struct MultiDict<K, V, S = DefaultHashBuilder> {
    raw: RawMultiDict<K, V, S>,
}

/// An iterator over the entries of a `MultiDict`, in insertion order.
///
/// This `struct` is created by the [`iter`] method on [`MultiDict`]. See its
/// documentation for more.
///
/// # Examples
///
/// ```
/// use multicollections::MultiDict;
///
/// let map = MultiDict::from([(1, "a"), (2, "b"), (1, "c")]);
/// let mut iter = map.iter();
/// assert_eq!(iter.next(), Some((&1, &"a")));
/// assert_eq!(iter.next_back(), Some((&1, &"c")));
/// assert_eq!(iter.next(), Some((&2, &"b")));
/// assert_eq!(iter.next(), None);
/// ```
///
/// [`iter`]: MultiDict::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    inner: slice::Iter<'a, Bucket<K, V>>,
}

/// A mutable iterator over the entries of a `MultiDict`, in insertion order.
///
/// This `struct` is created by the [`iter_mut`] method on [`MultiDict`]. Keys are
/// yielded by shared reference only.
///
/// [`iter_mut`]: MultiDict::iter_mut
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IterMut<'a, K, V> {
    inner: slice::IterMut<'a, Bucket<K, V>>,
}

/// An owning iterator over the entries of a `MultiDict`, in insertion order.
///
/// This `struct` is created by the [`into_iter`] method on [`MultiDict`]
/// (provided by the [`IntoIterator`] trait).
///
/// [`into_iter`]: IntoIterator::into_iter
pub struct IntoIter<K, V> {
    inner: vec::IntoIter<Bucket<K, V>>,
}

/// An iterator over the keys of a `MultiDict`, once per occurrence.
///
/// This `struct` is created by the [`keys`] method on [`MultiDict`].
///
/// [`keys`]: MultiDict::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// An iterator over the values of a `MultiDict`, in insertion order.
///
/// This `struct` is created by the [`values`] method on [`MultiDict`].
///
/// [`values`]: MultiDict::values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

/// A mutable iterator over the values of a `MultiDict`.
///
/// This `struct` is created by the [`values_mut`] method on [`MultiDict`].
///
/// [`values_mut`]: MultiDict::values_mut
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

/// An owning iterator over the keys of a `MultiDict`, once per occurrence.
///
/// This `struct` is created by the [`into_keys`] method on [`MultiDict`].
///
/// [`into_keys`]: MultiDict::into_keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IntoKeys<K, V> {
    inner: IntoIter<K, V>,
}

/// An owning iterator over the values of a `MultiDict`.
///
/// This `struct` is created by the [`into_values`] method on [`MultiDict`].
///
/// [`into_values`]: MultiDict::into_values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IntoValues<K, V> {
    inner: IntoIter<K, V>,
}

/// An iterator over every value stored for one key, in insertion order.
///
/// This `struct` is created by the [`get_all`] method on [`MultiDict`]. It walks the key's
/// positions directly and never visits entries belonging to other keys.
///
/// [`get_all`]: MultiDict::get_all
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct GetAll<'a, K, V> {
    entries: &'a [Bucket<K, V>],
    positions: slice::Iter<'a, usize>,
}

impl<K, V> MultiDict<K, V, DefaultHashBuilder> {
    /// Makes a new, empty `MultiDict`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map = MultiDict::new();
    ///
    /// // entries can now be added to the empty map
    /// map.add(1, "a");
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<K, V, S> MultiDict<K, V, S> {
    /// Makes a new, empty `MultiDict` which will use the given hash builder to hash keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::{DefaultHashBuilder, MultiDict};
    ///
    /// let mut map = MultiDict::with_hasher(DefaultHashBuilder::default());
    /// map.add(1, 2);
    /// ```
    #[must_use]
    pub fn with_hasher(hash_builder: S) -> Self {
        MultiDict {
            raw: RawMultiDict::with_hasher(hash_builder),
        }
    }

    /// Returns a reference to the map's [`BuildHasher`].
    pub const fn hasher(&self) -> &S {
        self.raw.hasher()
    }

    /// Returns the number of entries in the map, counting every occurrence of every key.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut a = MultiDict::new();
    /// assert_eq!(a.len(), 0);
    /// a.add(1, "a");
    /// a.add(1, "b");
    /// assert_eq!(a.len(), 2);
    /// ```
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the number of distinct keys in the map.
    ///
    /// This is an extension and is not part of the standard `HashMap` API.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let map = MultiDict::from([("a", 1), ("b", 2), ("a", 3)]);
    /// assert_eq!(map.key_count(), 2);
    /// ```
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.raw.key_count()
    }

    /// Clears the map, removing all entries. Keeps the allocated memory for reuse.
    ///
    /// # Complexity
    ///
    /// O(n) to drop the entries; no per-key work is done.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut a = MultiDict::new();
    /// a.add(1, "a");
    /// a.clear();
    /// a.clear();
    /// assert!(a.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Gets an iterator over the entries of the map, in insertion order.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let map = MultiDict::from([(3, "c"), (1, "a"), (3, "d")]);
    /// let entries: Vec<_> = map.iter().collect();
    /// assert_eq!(entries, [(&3, &"c"), (&1, &"a"), (&3, &"d")]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.raw.entries().iter(),
        }
    }

    /// Gets a mutable iterator over the entries of the map, in insertion order.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map = MultiDict::from([("a", 1), ("b", 2), ("a", 3)]);
    /// for (key, value) in map.iter_mut() {
    ///     if *key == "a" {
    ///         *value *= 10;
    ///     }
    /// }
    /// let values: Vec<_> = map.values().copied().collect();
    /// assert_eq!(values, [10, 2, 30]);
    /// ```
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.raw.entries_mut().iter_mut(),
        }
    }

    /// Gets an iterator over the keys of the map, once per occurrence.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let map = MultiDict::from([("a", 1), ("b", 2), ("a", 3)]);
    /// let keys: Vec<_> = map.keys().copied().collect();
    /// assert_eq!(keys, ["a", "b", "a"]);
    /// ```
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.iter(),
        }
    }

    /// Gets an iterator over the values of the map, in insertion order.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let map = MultiDict::from([("a", 1), ("b", 2), ("a", 3)]);
    /// let values: Vec<_> = map.values().copied().collect();
    /// assert_eq!(values, [1, 2, 3]);
    /// ```
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.iter(),
        }
    }

    /// Gets a mutable iterator over the values of the map, in insertion order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Creates a consuming iterator visiting all the keys, once per occurrence.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let map = MultiDict::from([(2, "b"), (1, "a"), (2, "c")]);
    /// let keys: Vec<i32> = map.into_keys().collect();
    /// assert_eq!(keys, [2, 1, 2]);
    /// ```
    pub fn into_keys(self) -> IntoKeys<K, V> {
        IntoKeys {
            inner: self.into_iter(),
        }
    }

    /// Creates a consuming iterator visiting all the values, in insertion order.
    pub fn into_values(self) -> IntoValues<K, V> {
        IntoValues {
            inner: self.into_iter(),
        }
    }
}

impl<K, V, S> MultiDict<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Returns a reference to the first value stored for `key`.
    ///
    /// The key may be any borrowed form of the map's key type, but [`Hash`] and [`Eq`] on the
    /// borrowed form *must* match those for the key type.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let map = MultiDict::from([("a", 1), ("a", 2)]);
    /// assert_eq!(map.get_one("a"), Some(&1));
    /// assert_eq!(map.get_one("b"), None);
    /// ```
    pub fn get_one<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.raw.first(key)
    }

    /// Returns a mutable reference to the first value stored for `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map = MultiDict::from([("a", 1), ("a", 2)]);
    /// if let Some(first) = map.get_one_mut("a") {
    ///     *first = 10;
    /// }
    /// assert_eq!(map.get_all("a").copied().collect::<Vec<_>>(), [10, 2]);
    /// ```
    pub fn get_one_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.raw.first_mut(key)
    }

    /// Returns a reference to the first value stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::{Error, MultiDict, WithDefault};
    ///
    /// let map = MultiDict::from([("a", 1)]);
    /// assert_eq!(map.try_get_one("a"), Ok(&1));
    /// assert_eq!(map.try_get_one("b"), Err(Error::KeyNotFound));
    /// assert_eq!(map.try_get_one("b").with_default(&0), Ok(&0));
    /// ```
    pub fn try_get_one<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_one(key).ok_or(Error::KeyNotFound)
    }

    /// Gets an iterator over every value stored for `key`, in insertion order.
    ///
    /// The iterator is empty if `key` is absent.
    ///
    /// # Complexity
    ///
    /// O(1) to create, O(1) per value returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let map = MultiDict::from([("a", 1), ("b", 2), ("a", 3)]);
    /// let values: Vec<_> = map.get_all("a").copied().collect();
    /// assert_eq!(values, [1, 3]);
    /// assert_eq!(map.get_all("c").next(), None);
    /// ```
    pub fn get_all<Q>(&self, key: &Q) -> GetAll<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        GetAll {
            entries: self.raw.entries(),
            positions: self.raw.positions(key).unwrap_or_default().iter(),
        }
    }

    /// Gets an iterator over every value stored for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent.
    pub fn try_get_all<Q>(&self, key: &Q) -> Result<GetAll<'_, K, V>, Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let positions = self.raw.positions(key).ok_or(Error::KeyNotFound)?;
        Ok(GetAll {
            entries: self.raw.entries(),
            positions: positions.iter(),
        })
    }

    /// Returns the number of occurrences of `key`.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.raw.positions(key).map_or(0, <[usize]>::len)
    }

    /// Returns `true` if the map holds at least one value for `key`.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let map = MultiDict::from([(1, "a")]);
    /// assert!(map.contains_key(&1));
    /// assert!(!map.contains_key(&2));
    /// ```
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.raw.positions(key).is_some()
    }

    /// Returns `true` if the pair `(key, value)` is one of the map's entries.
    ///
    /// Only the occurrences of `key` are compared.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let map = MultiDict::from([("a", 1), ("b", 2), ("a", 3)]);
    /// assert!(map.contains_entry("a", &3));
    /// assert!(!map.contains_entry("b", &3));
    /// ```
    #[must_use]
    pub fn contains_entry<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: PartialEq,
    {
        self.get_all(key).any(|v| v == value)
    }

    /// Appends an entry, leaving existing occurrences of `key` untouched.
    ///
    /// # Complexity
    ///
    /// O(1) amortized
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map = MultiDict::new();
    /// map.add("a", 1);
    /// map.add("a", 2);
    /// assert_eq!(map.len(), 2);
    /// assert_eq!(map["a"], 1);
    /// ```
    pub fn add(&mut self, key: K, value: V) {
        self.raw.push(key, value);
    }

    /// Collapses `key` to a single entry holding `value`.
    ///
    /// If `key` is present, its first occurrence is overwritten in place and every other occurrence
    /// is removed; the stored key is kept and `key` is dropped. Otherwise the entry is appended.
    ///
    /// Returns the value previously stored at the first occurrence, if any.
    ///
    /// # Complexity
    ///
    /// O(1) when `key` has at most one occurrence, O(n) otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map = MultiDict::from([("a", 1), ("b", 2), ("a", 3)]);
    /// assert_eq!(map.set("a", 99), Some(1));
    /// assert_eq!(map, MultiDict::from([("a", 99), ("b", 2)]));
    ///
    /// assert_eq!(map.set("c", 4), None);
    /// assert_eq!(map.len(), 3);
    /// ```
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        self.raw.replace_first(key, value)
    }

    /// Ensures `key` has an occurrence by appending `default` if it is absent, and returns a
    /// mutable reference to the value at the first occurrence.
    ///
    /// An existing key is left untouched: `default` and `key` are dropped and no entry is added.
    ///
    /// # Complexity
    ///
    /// O(1) amortized
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map = MultiDict::from([("a", 1), ("a", 2)]);
    ///
    /// *map.get_one_or_insert("a", 12) += 10;
    /// assert_eq!(map["a"], 11);
    /// assert_eq!(map.len(), 2);
    ///
    /// assert_eq!(*map.get_one_or_insert("b", 12), 12);
    /// assert_eq!(map.keys().last(), Some(&"b"));
    /// ```
    pub fn get_one_or_insert(&mut self, key: K, default: V) -> &mut V {
        self.raw.first_or_insert_with(key, || default)
    }

    /// Ensures `key` has an occurrence by appending the result of the default function if it is
    /// absent, and returns a mutable reference to the value at the first occurrence.
    ///
    /// `default` is only called when `key` is absent.
    ///
    /// # Complexity
    ///
    /// O(1) amortized
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map: MultiDict<&str, Vec<u32>> = MultiDict::new();
    ///
    /// map.get_one_or_insert_with("poneyland", Vec::new).push(3);
    /// map.get_one_or_insert_with("poneyland", || unreachable!()).push(4);
    /// assert_eq!(map["poneyland"], [3, 4]);
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn get_one_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        self.raw.first_or_insert_with(key, default)
    }

    /// Removes the first occurrence of `key` and returns its value.
    ///
    /// # Complexity
    ///
    /// O(1) when the first occurrence is the last entry, O(n) otherwise.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map = MultiDict::from([("a", 1), ("b", 2), ("a", 3)]);
    /// assert_eq!(map.pop_one("a"), Some(1));
    /// assert_eq!(map.pop_one("a"), Some(3));
    /// assert_eq!(map.pop_one("a"), None);
    /// ```
    pub fn pop_one<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.raw.pop_first(key)
    }

    /// Removes the first occurrence of `key` and returns its value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent; the map is left unchanged.
    pub fn try_pop_one<Q>(&mut self, key: &Q) -> Result<V, Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.pop_one(key).ok_or(Error::KeyNotFound)
    }

    /// Removes every occurrence of `key`, returning the values in insertion order.
    ///
    /// Returns `None` if `key` is absent.
    ///
    /// # Complexity
    ///
    /// O(n), regardless of the number of occurrences.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map = MultiDict::from([("a", 1), ("b", 2), ("a", 3)]);
    /// assert_eq!(map.pop_all("a"), Some(vec![1, 3]));
    /// assert_eq!(map, MultiDict::from([("b", 2)]));
    /// assert_eq!(map.pop_all("a"), None);
    /// ```
    pub fn pop_all<Q>(&mut self, key: &Q) -> Option<Vec<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.raw.pop_all(key)
    }

    /// Removes every occurrence of `key`, returning the values in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent.
    pub fn try_pop_all<Q>(&mut self, key: &Q) -> Result<Vec<V>, Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.pop_all(key).ok_or(Error::KeyNotFound)
    }

    /// Removes every occurrence of `key`, discarding the values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if `key` is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::{Error, MultiDict};
    ///
    /// let mut map = MultiDict::from([("a", 1), ("a", 2)]);
    /// assert_eq!(map.remove("a"), Ok(()));
    /// assert_eq!(map.remove("a"), Err(Error::KeyNotFound));
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Result<(), Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.try_pop_all(key).map(drop)
    }

    /// Removes and returns the most recently inserted entry.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map = MultiDict::from([("a", 1), ("b", 2)]);
    /// assert_eq!(map.pop_item(), Some(("b", 2)));
    /// assert_eq!(map.pop_item(), Some(("a", 1)));
    /// assert_eq!(map.pop_item(), None);
    /// ```
    pub fn pop_item(&mut self) -> Option<(K, V)> {
        self.raw.pop_last()
    }

    /// Removes and returns the most recently inserted entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] if the map has no entries.
    pub fn try_pop_item(&mut self) -> Result<(K, V), Error> {
        self.pop_item().ok_or(Error::Empty)
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> MultiMapping for MultiDict<K, V, S> {
    type Key = K;
    type Value = V;

    fn len(&self) -> usize {
        self.raw.len()
    }

    fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        MultiDict::iter(self)
    }

    fn get_all(&self, key: &K) -> impl Iterator<Item = &V> {
        MultiDict::get_all(self, key)
    }

    fn get_one(&self, key: &K) -> Option<&V> {
        self.raw.first(key)
    }

    fn contains_key(&self, key: &K) -> bool {
        self.raw.positions(key).is_some()
    }

    fn count(&self, key: &K) -> usize {
        MultiDict::count(self, key)
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> MutableMultiMapping for MultiDict<K, V, S> {
    fn add(&mut self, key: K, value: V) {
        self.raw.push(key, value);
    }

    fn set(&mut self, key: K, value: V) -> Option<V> {
        self.raw.replace_first(key, value)
    }

    fn pop_one(&mut self, key: &K) -> Option<V> {
        self.raw.pop_first(key)
    }

    fn get_one_or_insert(&mut self, key: K, default: V) -> &V
    where
        K: Clone,
    {
        self.raw.first_or_insert_with(key, || default)
    }

    fn pop_all(&mut self, key: &K) -> Option<Vec<V>> {
        self.raw.pop_all(key)
    }

    /// Removes the most recently inserted entry.
    fn pop_item(&mut self) -> Option<(K, V)>
    where
        K: Clone,
    {
        self.raw.pop_last()
    }

    fn clear(&mut self)
    where
        K: Clone,
    {
        self.raw.clear();
    }

    fn extend_pairs<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.extend(iter);
    }

    fn merge<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Hash + Clone,
    {
        self.raw.merge(iter);
    }

    fn update<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Hash + Clone,
    {
        self.raw.update(iter);
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for MultiDict<K, V, S> {
    fn clone(&self) -> Self {
        MultiDict {
            raw: self.raw.clone(),
        }
    }
}

impl<K: Hash, V: Hash, S> Hash for MultiDict<K, V, S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for (k, v) in self {
            k.hash(state);
            v.hash(state);
        }
    }
}

/// Two maps are equal when they hold the same entries in the same order.
impl<K: PartialEq, V: PartialEq, S> PartialEq for MultiDict<K, V, S> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq, S> Eq for MultiDict<K, V, S> {}

impl<K: PartialOrd, V: PartialOrd, S> PartialOrd for MultiDict<K, V, S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K: Ord, V: Ord, S> Ord for MultiDict<K, V, S> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for MultiDict<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S: Default> Default for MultiDict<K, V, S> {
    fn default() -> Self {
        MultiDict::with_hasher(S::default())
    }
}

impl<K, V, S> FromIterator<(K, V)> for MultiDict<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = MultiDict::with_hasher(S::default());
        map.extend(iter);
        map
    }
}

/// Appends every pair, never replacing.
impl<K, V, S> Extend<(K, V)> for MultiDict<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (k, v) in iter {
            self.add(k, v);
        }
    }
}

impl<'a, K, V, S> Extend<(&'a K, &'a V)> for MultiDict<K, V, S>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher,
{
    fn extend<T: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<'a, K, V, S> IntoIterator for &'a MultiDict<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut MultiDict<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V, S> IntoIterator for MultiDict<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Gets an owning iterator over the entries of the map, in insertion order.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let map = MultiDict::from([(2, "b"), (1, "a"), (2, "c")]);
    /// let entries: Vec<_> = map.into_iter().collect();
    /// assert_eq!(entries, [(2, "b"), (1, "a"), (2, "c")]);
    /// ```
    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter {
            inner: self.raw.into_entries().into_iter(),
        }
    }
}

/// Indexes the first value stored for a key.
impl<K, Q, V, S> Index<&Q> for MultiDict<K, V, S>
where
    K: Borrow<Q> + Hash + Eq,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present in the `MultiDict`.
    fn index(&self, key: &Q) -> &V {
        self.get_one(key).expect("no entry found for key")
    }
}

impl<K: Hash + Eq, V, const N: usize> From<[(K, V); N]> for MultiDict<K, V> {
    /// Converts a `[(K, V); N]` into a `MultiDict<K, V>`, keeping every pair in order.
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(Bucket::refs)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    fn last(mut self) -> Option<Self::Item> {
        self.next_back()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(Bucket::refs)
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Iter {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<K, V> Default for Iter<'_, K, V> {
    /// Creates an empty `multi_dict::Iter`.
    ///
    /// ```
    /// # use multicollections::multi_dict;
    /// let iter: multi_dict::Iter<'_, u8, u8> = Default::default();
    /// assert_eq!(iter.len(), 0);
    /// ```
    fn default() -> Self {
        Iter {
            inner: slice::Iter::default(),
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(Bucket::ref_mut)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(Bucket::ref_mut)
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

impl<K, V> fmt::Debug for IterMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterMut").field("remaining", &self.inner.len()).finish()
    }
}

impl<K, V> Default for IterMut<'_, K, V> {
    fn default() -> Self {
        IterMut {
            inner: slice::IterMut::default(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next().map(Bucket::into_pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<(K, V)> {
        self.inner.next_back().map(Bucket::into_pair)
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for IntoIter<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.as_slice().iter().map(Bucket::refs)).finish()
    }
}

impl<K, V> Default for IntoIter<K, V> {
    /// Creates an empty `multi_dict::IntoIter`.
    ///
    /// ```
    /// # use multicollections::multi_dict;
    /// let iter: multi_dict::IntoIter<u8, u8> = Default::default();
    /// assert_eq!(iter.len(), 0);
    /// ```
    fn default() -> Self {
        IntoIter {
            inner: vec::IntoIter::default(),
        }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    fn last(mut self) -> Option<Self::Item> {
        self.next_back()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Keys<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<K, V> Default for Keys<'_, K, V> {
    fn default() -> Self {
        Keys {
            inner: Iter::default(),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    fn last(mut self) -> Option<Self::Item> {
        self.next_back()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Values {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V: fmt::Debug> fmt::Debug for Values<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<K, V> Default for Values<'_, K, V> {
    /// Creates an empty `multi_dict::Values`.
    ///
    /// ```
    /// # use multicollections::multi_dict;
    /// let iter: multi_dict::Values<'_, u8, u8> = Default::default();
    /// assert_eq!(iter.len(), 0);
    /// ```
    fn default() -> Self {
        Values {
            inner: Iter::default(),
        }
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for ValuesMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

impl<K, V> fmt::Debug for ValuesMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuesMut").field("remaining", &self.inner.len()).finish()
    }
}

impl<K, V> Default for ValuesMut<'_, K, V> {
    fn default() -> Self {
        ValuesMut {
            inner: IterMut::default(),
        }
    }
}

impl<K, V> Iterator for IntoKeys<K, V> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoKeys<K, V> {
    fn next_back(&mut self) -> Option<K> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for IntoKeys<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoKeys<K, V> {}

impl<K: fmt::Debug, V> fmt::Debug for IntoKeys<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.inner.as_slice().iter().map(|bucket| &bucket.key)).finish()
    }
}

impl<K, V> Default for IntoKeys<K, V> {
    fn default() -> Self {
        IntoKeys {
            inner: IntoIter::default(),
        }
    }
}

impl<K, V> Iterator for IntoValues<K, V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoValues<K, V> {
    fn next_back(&mut self) -> Option<V> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for IntoValues<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoValues<K, V> {}

impl<K, V: fmt::Debug> fmt::Debug for IntoValues<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.inner.as_slice().iter().map(|bucket| &bucket.value)).finish()
    }
}

impl<K, V> Default for IntoValues<K, V> {
    fn default() -> Self {
        IntoValues {
            inner: IntoIter::default(),
        }
    }
}

impl<'a, K, V> Iterator for GetAll<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        let entries = self.entries;
        self.positions.next().map(|&position| &entries[position].value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.positions.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for GetAll<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let entries = self.entries;
        self.positions.next_back().map(|&position| &entries[position].value)
    }
}

impl<K, V> ExactSizeIterator for GetAll<'_, K, V> {
    fn len(&self) -> usize {
        self.positions.len()
    }
}

impl<K, V> FusedIterator for GetAll<'_, K, V> {}

impl<K, V> Clone for GetAll<'_, K, V> {
    fn clone(&self) -> Self {
        GetAll {
            entries: self.entries,
            positions: self.positions.clone(),
        }
    }
}

impl<K, V: fmt::Debug> fmt::Debug for GetAll<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<K, V> Default for GetAll<'_, K, V> {
    /// Creates an empty `multi_dict::GetAll`.
    ///
    /// ```
    /// # use multicollections::multi_dict;
    /// let iter: multi_dict::GetAll<'_, u8, u8> = Default::default();
    /// assert_eq!(iter.len(), 0);
    /// ```
    fn default() -> Self {
        GetAll {
            entries: &[],
            positions: slice::Iter::default(),
        }
    }
}
