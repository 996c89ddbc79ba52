use alloc::vec::Vec;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::mem;

use hashbrown::HashSet;
use hashbrown::hash_table::{Entry, HashTable};
use smallvec::{SmallVec, smallvec};

use super::bucket::Bucket;

/// Entry Log positions of every occurrence of one key, in ascending order.
pub(crate) type Positions = SmallVec<[usize; 1]>;

/// The core engine backing `MultiDict`.
///
/// Two structures are kept jointly consistent:
///
/// - the Entry Log (`entries`), the source of truth for order and multiplicity;
/// - the Position Index (`index`), one non-empty ascending `Positions` list per distinct key.
///
/// The index stores no keys. A list is matched to its key by comparing against
/// `entries[positions[0]]`, and rehashed from the cached bucket hashes.
///
/// Appending and removing the trailing entry are O(1). Every other removal compacts the Entry Log
/// in a single pass and rebuilds the index from scratch; positions are never shifted in place.
#[derive(Clone)]
pub(crate) struct RawMultiDict<K, V, S> {
    /// Every entry, in insertion order.
    entries: Vec<Bucket<K, V>>,
    /// Key to ascending positions in `entries`.
    index: HashTable<Positions>,
    /// Hasher used for lookups and for the cached bucket hashes.
    hash_builder: S,
}

/// Removes the entries collected in `doomed` when dropped.
///
/// `update` marks duplicates while it consumes a caller-supplied iterator; the marked entries are
/// removed even if that iterator or a `Hash` impl panics midway.
struct CompactOnDrop<'a, K: Eq, V, S> {
    raw: &'a mut RawMultiDict<K, V, S>,
    doomed: Vec<usize>,
}

impl<K: Eq, V, S> Drop for CompactOnDrop<'_, K, V, S> {
    fn drop(&mut self) {
        if !self.doomed.is_empty() {
            self.doomed.sort_unstable();
            self.raw.extract(&self.doomed);
        }
    }
}

/// Returns a predicate matching the `Positions` list owned by `key`.
fn equivalent<'a, K, V, Q>(entries: &'a [Bucket<K, V>], hash: u64, key: &'a Q) -> impl Fn(&Positions) -> bool + 'a
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
{
    move |positions| {
        let bucket = &entries[positions[0]];
        bucket.hash == hash && bucket.key.borrow() == key
    }
}

/// Returns a hasher for `Positions` lists that reads the cached bucket hashes.
fn rehash<K, V>(entries: &[Bucket<K, V>]) -> impl Fn(&Positions) -> u64 + '_ {
    move |positions| entries[positions[0]].hash
}

impl<K, V, S> RawMultiDict<K, V, S> {
    /// Creates a new, empty engine using `hash_builder`.
    pub(crate) fn with_hasher(hash_builder: S) -> Self {
        Self {
            entries: Vec::new(),
            index: HashTable::new(),
            hash_builder,
        }
    }

    /// Creates a new, empty engine with room for `capacity` entries.
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns the number of entries, counting every occurrence.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the Entry Log is empty.
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of distinct keys.
    pub(crate) fn key_count(&self) -> usize {
        self.index.len()
    }

    /// Returns the Entry Log capacity.
    pub(crate) fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub(crate) const fn hasher(&self) -> &S {
        &self.hash_builder
    }

    pub(crate) fn entries(&self) -> &[Bucket<K, V>] {
        &self.entries
    }

    /// Keys are never handed out mutably, so the index stays valid.
    pub(crate) fn entries_mut(&mut self) -> &mut [Bucket<K, V>] {
        &mut self.entries
    }

    pub(crate) fn into_entries(self) -> Vec<Bucket<K, V>> {
        self.entries
    }

    /// Clears both structures, keeping their allocations.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        let Self {
            entries,
            index,
            ..
        } = self;
        entries.reserve(additional);
        index.reserve(additional, rehash(entries));
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        let Self {
            entries,
            index,
            ..
        } = self;
        entries.shrink_to_fit();
        index.shrink_to_fit(rehash(entries));
    }
}

impl<K: Eq, V, S> RawMultiDict<K, V, S> {
    /// Appends an entry whose hash is already known.
    fn push_hashed(&mut self, hash: u64, key: K, value: V) {
        let position = self.entries.len();
        let Self {
            entries,
            index,
            ..
        } = self;
        match index.entry(hash, equivalent(entries, hash, &key), rehash(entries)) {
            Entry::Occupied(mut occupied) => occupied.get_mut().push(position),
            Entry::Vacant(vacant) => {
                vacant.insert(smallvec![position]);
            }
        }
        entries.push(Bucket {
            hash,
            key,
            value,
        });
    }

    /// Removes the entries at `doomed` (ascending, unique) in one pass, then rebuilds the index.
    ///
    /// Returns the removed buckets in their original order.
    fn extract(&mut self, doomed: &[usize]) -> Vec<Bucket<K, V>> {
        debug_assert!(
            doomed.windows(2).all(|pair| pair[0] < pair[1]),
            "`RawMultiDict::extract()` - positions are not ascending!"
        );

        let entries = mem::take(&mut self.entries);
        let mut kept = Vec::with_capacity(entries.capacity());
        let mut removed = Vec::with_capacity(doomed.len());
        let mut doomed_positions = doomed.iter().copied().peekable();

        for (position, bucket) in entries.into_iter().enumerate() {
            if doomed_positions.next_if_eq(&position).is_some() {
                removed.push(bucket);
            } else {
                kept.push(bucket);
            }
        }
        debug_assert!(doomed_positions.next().is_none(), "`RawMultiDict::extract()` - position out of bounds!");

        self.entries = kept;
        self.rebuild_index();

        #[cfg(feature = "tracing")]
        tracing::trace!(removed = removed.len(), remaining = self.entries.len(), "compacted entry log");

        removed
    }

    /// Recomputes the Position Index by scanning the Entry Log.
    fn rebuild_index(&mut self) {
        let Self {
            entries,
            index,
            ..
        } = self;
        let entries: &[Bucket<K, V>] = entries;
        index.clear();

        for (position, bucket) in entries.iter().enumerate() {
            match index.entry(bucket.hash, equivalent(entries, bucket.hash, &bucket.key), rehash(entries)) {
                Entry::Occupied(mut occupied) => occupied.get_mut().push(position),
                Entry::Vacant(vacant) => {
                    vacant.insert(smallvec![position]);
                }
            }
        }
    }

    /// Removes and returns the trailing entry.
    ///
    /// Only the trailing position of that entry's key is touched.
    pub(crate) fn pop_last(&mut self) -> Option<(K, V)> {
        let position = self.entries.len().checked_sub(1)?;
        let Self {
            entries,
            index,
            ..
        } = self;

        let bucket = &entries[position];
        match index.find_entry(bucket.hash, equivalent(entries, bucket.hash, &bucket.key)) {
            Ok(mut occupied) => {
                let positions = occupied.get_mut();
                debug_assert_eq!(positions.last(), Some(&position), "`RawMultiDict::pop_last()` - stale positions!");
                positions.pop();
                if positions.is_empty() {
                    occupied.remove();
                }
            }
            Err(_) => unreachable!("`RawMultiDict::pop_last()` - key is missing from the position index!"),
        }

        entries.pop().map(Bucket::into_pair)
    }
}

impl<K, V, S> RawMultiDict<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Returns the positions of every occurrence of `key`.
    pub(crate) fn positions<Q>(&self, key: &Q) -> Option<&[usize]>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.hash_builder.hash_one(key);
        self.index.find(hash, equivalent(&self.entries, hash, key)).map(|positions| positions.as_slice())
    }

    pub(crate) fn first<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let &position = self.positions(key)?.first()?;
        Some(&self.entries[position].value)
    }

    pub(crate) fn first_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let &position = self.positions(key)?.first()?;
        Some(&mut self.entries[position].value)
    }

    /// Appends an entry unconditionally.
    pub(crate) fn push(&mut self, key: K, value: V) {
        let hash = self.hash_builder.hash_one(&key);
        self.push_hashed(hash, key, value);
    }

    /// Returns the value at the first occurrence of `key`, appending `default()` if absent.
    ///
    /// `key` is dropped when an occurrence already exists.
    pub(crate) fn first_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let hash = self.hash_builder.hash_one(&key);
        let position = match self.index.find(hash, equivalent(&self.entries, hash, &key)) {
            Some(positions) => positions[0],
            None => {
                let position = self.entries.len();
                self.push_hashed(hash, key, default());
                position
            }
        };
        &mut self.entries[position].value
    }

    /// Overwrites the first occurrence of `key` and removes all others, or appends if absent.
    ///
    /// The stored key is kept; `key` is dropped when an occurrence already exists.
    pub(crate) fn replace_first(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hash_builder.hash_one(&key);
        let Some(positions) = self.index.find(hash, equivalent(&self.entries, hash, &key)) else {
            self.push_hashed(hash, key, value);
            return None;
        };

        let first = positions[0];
        let rest = Positions::from_slice(&positions[1..]);
        let previous = mem::replace(&mut self.entries[first].value, value);
        if !rest.is_empty() {
            self.extract(&rest);
        }
        Some(previous)
    }

    /// Removes and returns the value at the first occurrence of `key`.
    pub(crate) fn pop_first<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let &first = self.positions(key)?.first()?;
        if first + 1 == self.entries.len() {
            return self.pop_last().map(|(_, value)| value);
        }
        self.extract(&[first]).pop().map(Bucket::into_value)
    }

    /// Removes every occurrence of `key`, returning the values in insertion order.
    pub(crate) fn pop_all<Q>(&mut self, key: &Q) -> Option<Vec<V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let doomed = Positions::from_slice(self.positions(key)?);
        Some(self.extract(&doomed).into_iter().map(Bucket::into_value).collect())
    }

    /// Appends only the pairs whose key was absent before the call.
    ///
    /// Positions are only ever appended during the batch, so a key predates the batch exactly
    /// when its first position lies below the starting length.
    pub(crate) fn merge<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let existing = self.entries.len();
        for (key, value) in iter {
            let hash = self.hash_builder.hash_one(&key);
            let present = self
                .index
                .find(hash, equivalent(&self.entries, hash, &key))
                .is_some_and(|positions| positions[0] < existing);
            if !present {
                self.push_hashed(hash, key, value);
            }
        }
    }

    /// Replaces pre-existing keys and appends everything else.
    ///
    /// The first pair for a key that predates the batch overwrites that key's first occurrence and
    /// marks its other pre-existing occurrences for removal. Later pairs for the same key, and all
    /// pairs for new keys, are appended. Marked entries are removed in a single compaction once the
    /// batch ends, whether it finishes or unwinds.
    pub(crate) fn update<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let existing = self.entries.len();
        let mut replaced: HashSet<usize> = HashSet::new();
        let mut guard = CompactOnDrop {
            raw: self,
            doomed: Vec::new(),
        };

        for (key, value) in iter {
            let hash = guard.raw.hash_builder.hash_one(&key);
            let target = guard
                .raw
                .index
                .find(hash, equivalent(&guard.raw.entries, hash, &key))
                .filter(|positions| positions[0] < existing && !replaced.contains(&positions[0]));

            match target {
                Some(positions) => {
                    let first = positions[0];
                    guard.doomed.extend_from_slice(&positions[1..]);
                    replaced.insert(first);
                    guard.raw.entries[first].value = value;
                }
                None => guard.raw.push_hashed(hash, key, value),
            }
        }
    }

    /// Asserts that the Position Index matches a fresh scan of the Entry Log.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let mut indexed = 0;
        for positions in self.index.iter() {
            assert!(!positions.is_empty(), "empty positions list");
            assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "positions not ascending");
            let key = &self.entries[positions[0]].key;
            assert!(positions.iter().all(|&position| self.entries[position].key == *key), "foreign key in list");
            indexed += positions.len();
        }
        assert_eq!(indexed, self.entries.len(), "index does not cover the entry log");

        for (position, bucket) in self.entries.iter().enumerate() {
            assert_eq!(bucket.hash, self.hash_builder.hash_one(&bucket.key), "stale cached hash");
            assert!(
                self.positions(&bucket.key).is_some_and(|positions| positions.contains(&position)),
                "position {position} is not indexed"
            );
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::vec;
    use hashbrown::DefaultHashBuilder;
    use proptest::prelude::*;

    type Raw = RawMultiDict<u8, u32, DefaultHashBuilder>;

    fn raw() -> Raw {
        RawMultiDict::with_hasher(DefaultHashBuilder::default())
    }

    fn pairs(raw: &Raw) -> Vec<(u8, u32)> {
        raw.entries().iter().map(|bucket| (bucket.key, bucket.value)).collect()
    }

    fn model_set(model: &mut Vec<(u8, u32)>, key: u8, value: u32) {
        if let Some(first) = model.iter().position(|&(k, _)| k == key) {
            model[first].1 = value;
            let mut position = 0;
            model.retain(|&(k, _)| {
                let keep = k != key || position == first;
                position += 1;
                keep
            });
        } else {
            model.push((key, value));
        }
    }

    #[test]
    fn replace_first_collapses_duplicates() {
        let mut raw = raw();
        raw.push(1, 1);
        raw.push(2, 2);
        raw.push(1, 3);

        assert_eq!(raw.replace_first(1, 99), Some(1));
        assert_eq!(pairs(&raw), vec![(1, 99), (2, 2)]);
        assert_eq!(raw.positions(&2), Some(&[1][..]));
        raw.assert_invariants();
    }

    #[test]
    fn pop_last_only_touches_its_key() {
        let mut raw = raw();
        raw.push(1, 10);
        raw.push(2, 20);
        raw.push(1, 30);

        assert_eq!(raw.pop_last(), Some((1, 30)));
        assert_eq!(raw.positions(&1), Some(&[0][..]));
        assert_eq!(raw.pop_last(), Some((2, 20)));
        assert_eq!(raw.positions(&2), None);
        assert_eq!(raw.key_count(), 1);
        raw.assert_invariants();
    }

    #[test]
    fn update_keeps_batch_duplicates() {
        let mut raw = raw();
        raw.push(1, 1);
        raw.push(2, 2);
        raw.push(1, 3);

        raw.update([(1, 10), (3, 30), (1, 11), (3, 31)]);
        assert_eq!(pairs(&raw), vec![(1, 10), (2, 2), (3, 30), (1, 11), (3, 31)]);
        raw.assert_invariants();
    }

    #[test]
    fn first_or_insert_with_reads_the_first_occurrence() {
        let mut raw = raw();
        raw.push(1, 1);
        raw.push(2, 2);
        raw.push(1, 3);

        *raw.first_or_insert_with(1, || unreachable!()) += 10;
        assert_eq!(*raw.first_or_insert_with(3, || 30), 30);
        assert_eq!(pairs(&raw), vec![(1, 11), (2, 2), (1, 3), (3, 30)]);
        assert_eq!(raw.positions(&3), Some(&[3][..]));
        raw.assert_invariants();
    }

    #[test]
    fn merge_uses_a_snapshot_of_existing_keys() {
        let mut raw = raw();
        raw.push(1, 1);

        raw.merge([(1, 10), (2, 20), (2, 21)]);
        assert_eq!(pairs(&raw), vec![(1, 1), (2, 20), (2, 21)]);
        raw.assert_invariants();
    }

    #[test]
    fn reserve_and_shrink_keep_the_index() {
        let mut raw = raw();
        for i in 0..64 {
            raw.push(i % 7, u32::from(i));
        }
        raw.reserve(1024);
        assert!(raw.capacity() >= 1088);
        raw.assert_invariants();
        raw.shrink_to_fit();
        raw.assert_invariants();
        assert_eq!(raw.positions(&3).map(<[usize]>::len), Some(9));
    }

    proptest! {
        #[test]
        fn raw_behaves_like_vec(operations in prop::collection::vec(strategy(), 0..256)) {
            let mut model: Vec<(u8, u32)> = Vec::new();
            let mut raw = raw();

            for operation in operations {
                match operation {
                    Operation::Push(key, value) => {
                        raw.push(key, value);
                        model.push((key, value));
                    }
                    Operation::ReplaceFirst(key, value) => {
                        let expected = model.iter().find(|&&(k, _)| k == key).map(|&(_, v)| v);
                        prop_assert_eq!(raw.replace_first(key, value), expected);
                        model_set(&mut model, key, value);
                    }
                    Operation::FirstOrInsert(key, value) => {
                        let expected = match model.iter().find(|&&(k, _)| k == key) {
                            Some(&(_, v)) => v,
                            None => {
                                model.push((key, value));
                                value
                            }
                        };
                        prop_assert_eq!(*raw.first_or_insert_with(key, || value), expected);
                    }
                    Operation::PopFirst(key) => {
                        let first = model.iter().position(|&(k, _)| k == key);
                        let expected = first.map(|i| model.remove(i).1);
                        prop_assert_eq!(raw.pop_first(&key), expected);
                    }
                    Operation::PopAll(key) => {
                        let values: Vec<u32> = model.iter().filter(|&&(k, _)| k == key).map(|&(_, v)| v).collect();
                        let expected = if values.is_empty() { None } else { Some(values) };
                        model.retain(|&(k, _)| k != key);
                        prop_assert_eq!(raw.pop_all(&key), expected);
                    }
                    Operation::PopLast => {
                        prop_assert_eq!(raw.pop_last(), model.pop());
                    }
                    Operation::Merge(batch) => {
                        let existing: Vec<u8> = model.iter().map(|&(k, _)| k).collect();
                        model.extend(batch.iter().copied().filter(|(k, _)| !existing.contains(k)));
                        raw.merge(batch);
                    }
                    Operation::Update(batch) => {
                        let mut existing: Vec<u8> = model.iter().map(|&(k, _)| k).collect();
                        existing.sort_unstable();
                        existing.dedup();
                        for &(key, value) in &batch {
                            if let Some(i) = existing.iter().position(|&k| k == key) {
                                existing.swap_remove(i);
                                model_set(&mut model, key, value);
                            } else {
                                model.push((key, value));
                            }
                        }
                        raw.update(batch);
                    }
                    Operation::Clear => {
                        raw.clear();
                        model.clear();
                    }
                    Operation::ShrinkToFit => raw.shrink_to_fit(),
                }

                raw.assert_invariants();
                prop_assert_eq!(raw.len(), model.len());
                prop_assert_eq!(raw.is_empty(), model.is_empty());
                prop_assert_eq!(pairs(&raw), model.clone());
            }
        }
    }

    #[derive(Clone, Debug)]
    enum Operation {
        Push(u8, u32),
        ReplaceFirst(u8, u32),
        FirstOrInsert(u8, u32),
        PopFirst(u8),
        PopAll(u8),
        PopLast,
        Merge(Vec<(u8, u32)>),
        Update(Vec<(u8, u32)>),
        Clear,
        ShrinkToFit,
    }

    fn key() -> impl Strategy<Value = u8> {
        0..16u8
    }

    fn batch() -> impl Strategy<Value = Vec<(u8, u32)>> {
        prop::collection::vec((key(), any::<u32>()), 0..8)
    }

    fn strategy() -> impl Strategy<Value = Operation> {
        prop_oneof![
            20 => (key(), any::<u32>()).prop_map(|(key, value)| Operation::Push(key, value)),
            5 => (key(), any::<u32>()).prop_map(|(key, value)| Operation::ReplaceFirst(key, value)),
            3 => (key(), any::<u32>()).prop_map(|(key, value)| Operation::FirstOrInsert(key, value)),
            5 => key().prop_map(Operation::PopFirst),
            3 => key().prop_map(Operation::PopAll),
            3 => Just(Operation::PopLast),
            2 => batch().prop_map(Operation::Merge),
            2 => batch().prop_map(Operation::Update),
            1 => Just(Operation::Clear),
            1 => Just(Operation::ShrinkToFit),
        ]
    }
}
