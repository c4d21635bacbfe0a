//! Serialization for both engines (feature `serde`).
//!
//! Both maps serialize as a struct whose `entries` field is a flat sequence
//! `k0, v0, k1, v1, ...` in iteration order, preceded by size metadata:
//!
//! - `TreeBinHashMap`: `{ load_factor, capacity, len, entries }`. Reading
//!   back clamps the load factor to a sane range and presizes the table for
//!   `len` entries before inserting.
//! - `TreeMap`: `{ len, entries }`. Sorted input is rebuilt with the linear
//!   bulk build; anything else falls back to one insertion per entry.
//!
//! A `len` that disagrees with the number of entries is an error.

use crate::config::{HashMapConfig, DEFAULT_LOAD_FACTOR, SANE_LOAD_FACTORS};
use crate::hash_map::TreeBinHashMap;
use crate::order::{BinOrder, KeyOrder};
use crate::tree_map::TreeMap;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeSeq, SerializeStruct, Serializer};

const HASH_MAP_FIELDS: &[&str] = &["load_factor", "capacity", "len", "entries"];
const TREE_MAP_FIELDS: &[&str] = &["len", "entries"];

/// Writes `(k, v)` pairs as one flat sequence.
struct Flat<I>(I);

impl<'a, K, V, I> Serialize for Flat<I>
where
    K: Serialize + 'a,
    V: Serialize + 'a,
    I: Iterator<Item = (&'a K, &'a V)> + ExactSizeIterator + Clone,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let pairs = self.0.clone();
        let mut seq = serializer.serialize_seq(Some(pairs.len() * 2))?;
        for (k, v) in pairs {
            seq.serialize_element(k)?;
            seq.serialize_element(v)?;
        }
        seq.end()
    }
}

/// Reads a flat sequence back into pairs.
struct FlatPairs<K, V>(Vec<(K, V)>);

impl<'de, K, V> Deserialize<'de> for FlatPairs<K, V>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(FlatPairsVisitor {
            phantom: PhantomData,
        })
    }
}

struct FlatPairsVisitor<K, V> {
    phantom: PhantomData<(K, V)>,
}

impl<'de, K, V> Visitor<'de> for FlatPairsVisitor<K, V>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
{
    type Value = FlatPairs<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a flat sequence of keys and values")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        // Untrusted size hints are capped.
        let hint = seq.size_hint().unwrap_or(0).min(1 << 12) / 2;
        let mut pairs = Vec::with_capacity(hint);
        while let Some(k) = seq.next_element::<K>()? {
            let v = seq
                .next_element::<V>()?
                .ok_or_else(|| de::Error::custom("key without a value"))?;
            pairs.push((k, v));
        }
        Ok(FlatPairs(pairs))
    }
}

enum Field {
    LoadFactor,
    Capacity,
    Len,
    Entries,
    Other,
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_identifier(FieldVisitor)
    }
}

struct FieldVisitor;

impl<'de> Visitor<'de> for FieldVisitor {
    type Value = Field;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a field name")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Field, E> {
        Ok(match v {
            "load_factor" => Field::LoadFactor,
            "capacity" => Field::Capacity,
            "len" => Field::Len,
            "entries" => Field::Entries,
            _ => Field::Other,
        })
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Field, E> {
        Ok(match v {
            0 => Field::LoadFactor,
            1 => Field::Capacity,
            2 => Field::Len,
            3 => Field::Entries,
            _ => Field::Other,
        })
    }
}

fn check_len<E: de::Error>(len: usize, found: usize) -> Result<(), E> {
    if len == found {
        Ok(())
    } else {
        Err(de::Error::invalid_length(found, &"as many entries as the recorded len"))
    }
}

impl<K, V, S, O> Serialize for TreeBinHashMap<K, V, S, O>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut st = serializer.serialize_struct("TreeBinHashMap", HASH_MAP_FIELDS.len())?;
        st.serialize_field("load_factor", &self.load_factor())?;
        st.serialize_field("capacity", &self.capacity())?;
        st.serialize_field("len", &self.len())?;
        st.serialize_field("entries", &Flat(self.iter()))?;
        st.end()
    }
}

impl<'de, K, V, S, O> Deserialize<'de> for TreeBinHashMap<K, V, S, O>
where
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
    O: BinOrder<K> + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_struct(
            "TreeBinHashMap",
            HASH_MAP_FIELDS,
            HashMapVisitor {
                phantom: PhantomData,
            },
        )
    }
}

struct HashMapVisitor<K, V, S, O> {
    phantom: PhantomData<(K, V, S, O)>,
}

impl<K, V, S, O> HashMapVisitor<K, V, S, O>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    O: BinOrder<K> + Default,
{
    fn rebuild<E: de::Error>(
        load_factor: f32,
        len: usize,
        pairs: Vec<(K, V)>,
    ) -> Result<TreeBinHashMap<K, V, S, O>, E> {
        check_len(len, pairs.len())?;
        let (min, max) = SANE_LOAD_FACTORS;
        let load_factor = if load_factor.is_nan() {
            DEFAULT_LOAD_FACTOR
        } else {
            load_factor.clamp(min, max)
        };
        let config = HashMapConfig::new()
            .load_factor(load_factor)
            .initial_capacity(HashMapConfig::table_size_for_len(len, load_factor));
        let mut map = TreeBinHashMap::with_parts(config, S::default(), O::default())
            .map_err(de::Error::custom)?;
        for (k, v) in pairs {
            map.insert(k, v);
        }
        Ok(map)
    }
}

impl<'de, K, V, S, O> Visitor<'de> for HashMapVisitor<K, V, S, O>
where
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
    S: BuildHasher + Default,
    O: BinOrder<K> + Default,
{
    type Value = TreeBinHashMap<K, V, S, O>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a TreeBinHashMap")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let load_factor: f32 = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let _capacity: usize = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        let len: usize = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(2, &self))?;
        let FlatPairs(pairs) = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(3, &self))?;
        Self::rebuild(load_factor, len, pairs)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut load_factor = None;
        let mut len = None;
        let mut pairs = None;
        while let Some(field) = map.next_key::<Field>()? {
            match field {
                Field::LoadFactor => load_factor = Some(map.next_value::<f32>()?),
                Field::Len => len = Some(map.next_value::<usize>()?),
                Field::Entries => pairs = Some(map.next_value::<FlatPairs<K, V>>()?.0),
                Field::Capacity | Field::Other => {
                    map.next_value::<de::IgnoredAny>()?;
                }
            }
        }
        let load_factor = load_factor.unwrap_or(DEFAULT_LOAD_FACTOR);
        let pairs = pairs.ok_or_else(|| de::Error::missing_field("entries"))?;
        let len = len.unwrap_or(pairs.len());
        Self::rebuild(load_factor, len, pairs)
    }
}

impl<K, V, C> Serialize for TreeMap<K, V, C>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut st = serializer.serialize_struct("TreeMap", TREE_MAP_FIELDS.len())?;
        st.serialize_field("len", &self.len())?;
        st.serialize_field("entries", &Flat(self.iter()))?;
        st.end()
    }
}

impl<'de, K, V, C> Deserialize<'de> for TreeMap<K, V, C>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
    C: KeyOrder<K> + Default,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_struct(
            "TreeMap",
            TREE_MAP_FIELDS,
            TreeMapVisitor {
                phantom: PhantomData,
            },
        )
    }
}

struct TreeMapVisitor<K, V, C> {
    phantom: PhantomData<(K, V, C)>,
}

impl<K, V, C> TreeMapVisitor<K, V, C>
where
    C: KeyOrder<K> + Default,
{
    fn rebuild<E: de::Error>(len: usize, pairs: Vec<(K, V)>) -> Result<TreeMap<K, V, C>, E> {
        check_len(len, pairs.len())?;
        let order = C::default();
        let sorted = pairs
            .windows(2)
            .all(|w| order.compare(&w[0].0, &w[1].0) == Ordering::Less);
        if sorted {
            return TreeMap::from_sorted(order, pairs).map_err(de::Error::custom);
        }
        let mut map = TreeMap::with_order(order);
        for (k, v) in pairs {
            map.try_insert(k, v).map_err(de::Error::custom)?;
        }
        Ok(map)
    }
}

impl<'de, K, V, C> Visitor<'de> for TreeMapVisitor<K, V, C>
where
    K: Deserialize<'de>,
    V: Deserialize<'de>,
    C: KeyOrder<K> + Default,
{
    type Value = TreeMap<K, V, C>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a TreeMap")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let len: usize = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let FlatPairs(pairs) = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        Self::rebuild(len, pairs)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut len = None;
        let mut pairs = None;
        while let Some(field) = map.next_key::<Field>()? {
            match field {
                Field::Len => len = Some(map.next_value::<usize>()?),
                Field::Entries => pairs = Some(map.next_value::<FlatPairs<K, V>>()?.0),
                _ => {
                    map.next_value::<de::IgnoredAny>()?;
                }
            }
        }
        let pairs = pairs.ok_or_else(|| de::Error::missing_field("entries"))?;
        let len = len.unwrap_or(pairs.len());
        Self::rebuild(len, pairs)
    }
}
