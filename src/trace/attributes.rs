//! Bounded, evicting attribute storage.

use crate::common::{Array, Key, KeyValue, StringValue, Value};
use std::collections::{HashMap, VecDeque};

/// An insertion-ordered attribute map with a capped entry count that retains
/// the most recently set entries.
///
/// Oversized string values are truncated before storage. The map keeps a
/// running count of every effective `insert`; the number of dropped entries
/// is derived from it rather than stored separately.
///
/// The map itself performs no locking; callers provide mutual exclusion (the
/// owning span's lock).
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AttributesMap {
    map: HashMap<Key, Value>,
    insertion_order: VecDeque<Key>,
    capacity: u32,
    max_value_len: u32,
    total_added: u32,
}

impl AttributesMap {
    /// Create a new `AttributesMap` holding at most `capacity` entries, with
    /// string values truncated to `max_value_len` bytes.
    pub(crate) fn new(capacity: u32, max_value_len: u32) -> Self {
        AttributesMap {
            map: HashMap::new(),
            insertion_order: VecDeque::new(),
            capacity,
            max_value_len,
            total_added: 0,
        }
    }

    /// Inserts a key-value pair, evicting the oldest entry if at capacity.
    ///
    /// Empty keys and empty string values are ignored. Re-inserting an
    /// existing key overwrites its value and refreshes its recency.
    pub(crate) fn insert(&mut self, item: KeyValue) {
        if item.key.as_str().is_empty() {
            return;
        }
        if matches!(&item.value, Value::String(s) if s.as_str().is_empty()) {
            return;
        }
        if self.capacity == 0 {
            // Still counted: the put was effective, the entry just cannot be
            // retained.
            self.total_added += 1;
            return;
        }

        let value = truncate_value(item.value, self.max_value_len);

        if let Some(existing) = self.map.get_mut(&item.key) {
            *existing = value;
            self.refresh_recency(&item.key);
            self.total_added += 1;
            return;
        }

        if self.insertion_order.len() as u32 == self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.map.remove(&oldest);
            }
        }
        self.insertion_order.push_back(item.key.clone());
        self.map.insert(item.key, value);
        self.total_added += 1;
    }

    /// Returns the value for the given key, if present.
    pub(crate) fn get(&self, key: &Key) -> Option<&Value> {
        self.map.get(key)
    }

    /// Returns the number of entries currently in the map.
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the map is empty.
    #[allow(dead_code)]
    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The number of effective inserts over the map's lifetime, including
    /// overwrites and inserts whose entry was later evicted.
    pub(crate) fn total_added(&self) -> u32 {
        self.total_added
    }

    /// The number of entries no longer present, derived from the lifetime
    /// insert count and the current size.
    pub(crate) fn dropped_count(&self) -> u32 {
        self.total_added.saturating_sub(self.map.len() as u32)
    }

    /// An oldest-to-newest iterator over the entries.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.insertion_order
            .iter()
            .filter_map(|key| self.map.get_key_value(key))
    }

    /// Snapshot the entries oldest-to-newest into an owned vector.
    pub(crate) fn to_vec(&self) -> Vec<KeyValue> {
        self.iter()
            .map(|(key, value)| KeyValue {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    fn refresh_recency(&mut self, key: &Key) {
        if self.insertion_order.back() == Some(key) {
            return;
        }
        if let Some(idx) = self.insertion_order.iter().position(|k| k == key) {
            self.insertion_order.remove(idx);
            self.insertion_order.push_back(key.clone());
        }
    }
}

/// Truncate string-typed values (and string array elements) to `max_len`
/// bytes, backing off to a char boundary so code points are never split.
/// Non-string values pass through untouched.
pub(crate) fn truncate_value(value: Value, max_len: u32) -> Value {
    match value {
        Value::String(s) => Value::String(truncate_string(s, max_len)),
        Value::Array(Array::String(values)) => Value::Array(Array::String(
            values
                .into_iter()
                .map(|s| truncate_string(s, max_len))
                .collect(),
        )),
        other => other,
    }
}

fn truncate_string(value: StringValue, max_len: u32) -> StringValue {
    let max_len = max_len as usize;
    let s = value.as_str();
    if s.len() <= max_len {
        return value;
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    StringValue::from(s[..cut].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(capacity: u32) -> AttributesMap {
        AttributesMap::new(capacity, u32::MAX)
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let capacity = 10;
        let mut attrs = map(capacity);
        for i in 0..100 {
            attrs.insert(KeyValue::new(format!("key {i}"), i));
            assert!(attrs.len() as u32 <= capacity);
            assert!(attrs.total_added() >= attrs.len() as u32);
        }
        assert_eq!(attrs.total_added(), 100);
        assert_eq!(attrs.dropped_count(), 90);
    }

    #[test]
    fn oldest_entries_are_evicted_first() {
        let capacity = 3;
        let mut attrs = map(capacity);
        for i in 0..5 {
            attrs.insert(KeyValue::new(format!("k{i}"), i));
        }
        // the last `capacity` distinct keys survive, in insertion order
        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["k2", "k3", "k4"]);
        assert_eq!(attrs.get(&Key::new("k4")), Some(&Value::I64(4)));
    }

    #[test]
    fn reinsert_overwrites_and_refreshes_recency() {
        let mut attrs = map(2);
        attrs.insert(KeyValue::new("a", 1));
        attrs.insert(KeyValue::new("b", 2));
        attrs.insert(KeyValue::new("a", 3));
        // "a" was refreshed, so "b" is now the oldest and gets evicted
        attrs.insert(KeyValue::new("c", 4));

        let keys: Vec<&str> = attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "c"]);
        assert_eq!(attrs.get(&Key::new("a")), Some(&Value::I64(3)));
        assert_eq!(attrs.total_added(), 4);
    }

    #[test]
    fn empty_key_and_empty_string_value_are_ignored() {
        let mut attrs = map(4);
        attrs.insert(KeyValue::new("", "anything"));
        attrs.insert(KeyValue::new("key", ""));
        assert_eq!(attrs.len(), 0);
        assert_eq!(attrs.total_added(), 0);
    }

    #[test]
    fn long_string_values_are_truncated() {
        let mut attrs = AttributesMap::new(4, 5);
        attrs.insert(KeyValue::new("long", "abcdefghij"));
        attrs.insert(KeyValue::new("short", "abc"));
        assert_eq!(attrs.get(&Key::new("long")), Some(&Value::from("abcde")));
        assert_eq!(attrs.get(&Key::new("short")), Some(&Value::from("abc")));
    }

    #[test]
    fn string_array_values_are_truncated_element_wise() {
        let mut attrs = AttributesMap::new(4, 2);
        attrs.insert(KeyValue::new(
            "arr",
            Value::Array(Array::String(vec!["abcd".into(), "x".into()])),
        ));
        assert_eq!(
            attrs.get(&Key::new("arr")),
            Some(&Value::Array(Array::String(vec!["ab".into(), "x".into()])))
        );
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let truncated = truncate_value(Value::from("aé".to_string()), 2);
        // "é" is two bytes; cutting mid-char backs off to the boundary
        assert_eq!(truncated, Value::from("a"));
    }

    #[test]
    fn non_string_values_are_not_truncated() {
        let mut attrs = AttributesMap::new(4, 1);
        attrs.insert(KeyValue::new("n", 123456i64));
        assert_eq!(attrs.get(&Key::new("n")), Some(&Value::I64(123456)));
    }

    #[test]
    fn zero_capacity_counts_but_stores_nothing() {
        let mut attrs = AttributesMap::new(0, u32::MAX);
        attrs.insert(KeyValue::new("a", 1));
        assert_eq!(attrs.len(), 0);
        assert_eq!(attrs.total_added(), 1);
        assert_eq!(attrs.dropped_count(), 1);
    }
}
