use hashbrown::DefaultHashBuilder;

use super::MultiDict;
use crate::raw::RawMultiDict;

impl<K, V> MultiDict<K, V, DefaultHashBuilder> {
    /// Creates an empty map with room for at least `capacity` entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let map: MultiDict<i32, i32> = MultiDict::with_capacity(32);
    /// assert!(map.is_empty());
    /// assert!(map.capacity() >= 32);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(capacity) for memory allocation.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S> MultiDict<K, V, S> {
    /// Creates an empty map with room for at least `capacity` entries, using `hash_builder` to
    /// hash keys.
    #[must_use]
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        MultiDict {
            raw: RawMultiDict::with_capacity_and_hasher(capacity, hash_builder),
        }
    }

    /// Returns the number of entries the map can hold without reallocating its entry vector.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Reserves capacity for at least `additional` more entries.
    ///
    /// # Panics
    ///
    /// Panics if the new allocation size overflows `usize`.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map: MultiDict<&str, i32> = MultiDict::new();
    /// map.reserve(10);
    /// assert!(map.capacity() >= 10);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        self.raw.reserve(additional);
    }

    /// Shrinks the capacity of the map as much as possible.
    ///
    /// # Examples
    ///
    /// ```
    /// use multicollections::MultiDict;
    ///
    /// let mut map: MultiDict<i32, i32> = MultiDict::with_capacity(100);
    /// map.add(1, 2);
    /// map.add(1, 3);
    /// map.shrink_to_fit();
    /// assert!(map.capacity() >= 2);
    /// assert_eq!(map.count(&1), 2);
    /// ```
    pub fn shrink_to_fit(&mut self) {
        self.raw.shrink_to_fit();
    }
}
