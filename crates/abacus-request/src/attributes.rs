//! Insertion-ordered attribute map.

use std::collections::HashMap;

use abacus_types::AttributeKey;

/// Map from [`AttributeKey`] to `V` that iterates in first-insertion order.
///
/// Request attributes must come out in the order the client declared them,
/// so that results echo attributes back in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMap<V> {
    entries: Vec<(AttributeKey, V)>,
    index: HashMap<AttributeKey, usize>,
}

impl<V> Default for AttributeMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V> AttributeMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &AttributeKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &AttributeKey) -> Option<&V> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn get_mut(&mut self, key: &AttributeKey) -> Option<&mut V> {
        self.index.get(key).map(|&i| &mut self.entries[i].1)
    }

    /// Inserts `value` unless `key` is already present.
    ///
    /// Returns `false`, leaving the map untouched, if the key exists.
    pub fn insert_new(&mut self, key: AttributeKey, value: V) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        true
    }

    /// Returns the value for `key`, inserting `default()` at the end first
    /// if the key is new.
    pub fn get_or_insert_with(
        &mut self,
        key: &AttributeKey,
        default: impl FnOnce() -> V,
    ) -> &mut V {
        let position = match self.index.get(key) {
            Some(&position) => position,
            None => {
                let position = self.entries.len();
                self.entries.push((key.clone(), default()));
                self.index.insert(key.clone(), position);
                position
            }
        };
        &mut self.entries[position].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttributeKey, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &AttributeKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Transforms every value, keeping keys and order.
    pub fn map_values<U>(self, mut f: impl FnMut(V) -> U) -> AttributeMap<U> {
        AttributeMap {
            entries: self.entries.into_iter().map(|(k, v)| (k, f(v))).collect(),
            index: self.index,
        }
    }
}

impl<V> IntoIterator for AttributeMap<V> {
    type Item = (AttributeKey, V);
    type IntoIter = std::vec::IntoIter<(AttributeKey, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> AttributeKey {
        AttributeKey::unissued("cat", id)
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut map = AttributeMap::new();
        for id in ["z", "a", "m"] {
            assert!(map.insert_new(key(id), id.len()));
        }
        let ids: Vec<&str> = map.keys().map(AttributeKey::attribute_id).collect();
        assert_eq!(ids, ["z", "a", "m"]);
    }

    #[test]
    fn insert_new_keeps_first_value() {
        let mut map = AttributeMap::new();
        assert!(map.insert_new(key("a"), 1));
        assert!(!map.insert_new(key("a"), 2));
        assert_eq!(map.get(&key("a")), Some(&1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn get_or_insert_with_appends_once() {
        let mut map: AttributeMap<Vec<u8>> = AttributeMap::new();
        map.get_or_insert_with(&key("a"), Vec::new).push(1);
        map.get_or_insert_with(&key("b"), Vec::new).push(2);
        map.get_or_insert_with(&key("a"), Vec::new).push(3);

        let collected: Vec<_> = map
            .into_iter()
            .map(|(k, v)| (k.attribute_id().to_string(), v))
            .collect();
        assert_eq!(collected, [("a".to_string(), vec![1, 3]), ("b".to_string(), vec![2])]);
    }
}
