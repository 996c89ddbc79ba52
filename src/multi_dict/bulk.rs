use core::hash::{BuildHasher, Hash};

use super::MultiDict;

impl<K, V, S> MultiDict<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Appends the pairs from `iter` whose key had no occurrence before the call.
    ///
    /// Presence is decided against the entries that existed when `merge` was called, so a key that
    /// is new to the map keeps every value `iter` supplies for it.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map = MultiDict::from([("a", 1)]);
    /// map.merge([("a", 2), ("b", 3), ("b", 4)]);
    /// assert_eq!(map, MultiDict::from([("a", 1), ("b", 3), ("b", 4)]));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1) per pair.
    pub fn merge<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.raw.merge(iter);
    }

    /// Updates the map from `iter`, replacing keys that existed before the call.
    ///
    /// For a pre-existing key, the first pair in `iter` overwrites the key's first occurrence in
    /// place and removes its other pre-existing occurrences. Every later pair for that key is
    /// appended, as is every pair for a key new to the map.
    ///
    /// If `iter` panics, the pairs it already yielded stay applied, including the removal of the
    /// duplicates they displaced.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map = MultiDict::from([("a", 1), ("b", 2), ("a", 3)]);
    /// map.update([("a", 10), ("c", 30), ("a", 11)]);
    ///
    /// let entries: Vec<_> = map.into_iter().collect();
    /// assert_eq!(entries, [("a", 10), ("b", 2), ("c", 30), ("a", 11)]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1) per pair, plus a single O(n) compaction when pre-existing duplicates were removed.
    pub fn update<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.raw.update(iter);
    }
}
