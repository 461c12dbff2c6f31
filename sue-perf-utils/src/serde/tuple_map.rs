//! Module that allows to (de-)serialize a `BTreeMap` with non-string keys (e.g. tuples) with
//! `serde`, which JSON objects cannot represent directly.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Helper struct that allows (de-)serialization of a `BTreeMap` as a list of `{key, val}` entries.
///
/// Example:
/// ```ignore
/// serde_json::to_string_pretty(&SerializeTupleMap::from(counts))?;
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializeTupleMap<K: Ord, V>(
    #[serde(with = "crate::serde::tuple_map")]
    #[serde(bound(
        deserialize = "K: Ord + Deserialize<'de>, V: Deserialize<'de>",
        serialize = "K: Serialize, V: Serialize",
    ))]
    pub BTreeMap<K, V>,
);

impl<K: Ord, V> From<BTreeMap<K, V>> for SerializeTupleMap<K, V> {
    fn from(map: BTreeMap<K, V>) -> Self {
        Self(map)
    }
}

impl<K: Ord, V> From<SerializeTupleMap<K, V>> for BTreeMap<K, V> {
    fn from(val: SerializeTupleMap<K, V>) -> Self {
        val.0
    }
}

/// Helper struct that allows (de-)serialization of a single entry.
#[derive(Deserialize, Serialize)]
struct Entry<K, V> {
    key: K,
    val: V,
}

/// Serialize a map as a sequence of entries, in key order.
pub fn serialize<K: Serialize, V: Serialize, S: Serializer>(
    map: &BTreeMap<K, V>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(map.iter().map(|(key, val)| Entry { key, val }))
}

/// Deserialize a map from a sequence of entries. Later entries win on duplicate keys.
pub fn deserialize<'de, K: Deserialize<'de> + Ord, V: Deserialize<'de>, D>(
    deserializer: D,
) -> Result<BTreeMap<K, V>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Entry<K, V>>::deserialize(deserializer)
        .map(|v| v.into_iter().map(|entry| (entry.key, entry.val)).collect())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tuple_keys_as_json() {
        let map: BTreeMap<(u32, u32), usize> = [((1, 2), 10), ((1, 3), 7), ((2, 2), 1)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&SerializeTupleMap::from(map.clone())).unwrap();
        assert_eq!(
            json,
            r#"[{"key":[1,2],"val":10},{"key":[1,3],"val":7},{"key":[2,2],"val":1}]"#
        );
        let back: SerializeTupleMap<(u32, u32), usize> = serde_json::from_str(&json).unwrap();
        assert_eq!(BTreeMap::from(back), map);
    }
}
