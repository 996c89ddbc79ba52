/// A single Entry Log slot.
///
/// The hash of `key` is computed once on insertion and cached so the Position Index can be
/// rebuilt, grown and shrunk without calling back into the user's `Hash` impl.
#[derive(Clone, Debug)]
pub(crate) struct Bucket<K, V> {
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
}

impl<K, V> Bucket<K, V> {
    #[inline]
    pub(crate) const fn refs(&self) -> (&K, &V) {
        (&self.key, &self.value)
    }

    #[inline]
    pub(crate) const fn ref_mut(&mut self) -> (&K, &mut V) {
        (&self.key, &mut self.value)
    }

    #[inline]
    pub(crate) fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }

    #[inline]
    pub(crate) fn into_value(self) -> V {
        self.value
    }
}
