//! `serde` support: a `MultiDict` is written as a sequence of `(key, value)` pairs in insertion
//! order, so duplicate keys survive formats whose maps cannot repeat a key.

use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;

use ::serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use ::serde::ser::{Serialize, Serializer};

use super::MultiDict;

/// Upper bound on pre-allocation driven by an untrusted size hint.
const MAX_PREALLOCATED_ENTRIES: usize = 4096;

impl<K, V, S> Serialize for MultiDict<K, V, S>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, K, V, S> Deserialize<'de> for MultiDict<K, V, S>
where
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(MultiDictVisitor(PhantomData))
    }
}

struct MultiDictVisitor<K, V, S>(PhantomData<fn() -> MultiDict<K, V, S>>);

impl<'de, K, V, S> Visitor<'de> for MultiDictVisitor<K, V, S>
where
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
{
    type Value = MultiDict<K, V, S>;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a sequence of [key, value] pairs")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let capacity = seq.size_hint().unwrap_or(0).min(MAX_PREALLOCATED_ENTRIES);
        let mut map = MultiDict::with_capacity_and_hasher(capacity, S::default());
        while let Some((key, value)) = seq.next_element::<(K, V)>()? {
            map.add(key, value);
        }
        Ok(map)
    }

    /// Self-describing formats that hand over a map are accepted too; every entry is appended.
    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let capacity = access.size_hint().unwrap_or(0).min(MAX_PREALLOCATED_ENTRIES);
        let mut map = MultiDict::with_capacity_and_hasher(capacity, S::default());
        while let Some((key, value)) = access.next_entry::<K, V>()? {
            map.add(key, value);
        }
        Ok(map)
    }
}
