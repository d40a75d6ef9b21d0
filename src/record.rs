//! Decode targets: the attribute-assignment contract and the generic record.

use std::fmt;

use crate::errors::ReadError;
use crate::value::Value;

/// A decode target. Serializers assign each decoded value to its named
/// attribute through this trait, and expressions read already-assigned
/// attributes back out of it.
///
/// Caller-supplied types implement this to receive fields by name;
/// [GenericRecord] implements it as an ordered name/value map.
pub trait Record {
    /// Assigns a decoded value to the named attribute.
    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), ReadError>;

    /// Reads an already-assigned attribute, `None` when not yet decoded.
    fn get_attr(&self, name: &str) -> Option<Value>;
}

/// Ordered name/value map used when no concrete target type is supplied,
/// and for all nested sub-records (array elements, groups).
///
/// Attributes iterate in decode order.
#[derive(Clone, Default, PartialEq)]
pub struct GenericRecord {
    entries: Vec<(String, Value)>,
}

impl GenericRecord {
    pub fn new() -> Self {
        GenericRecord::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Record for GenericRecord {
    fn set_attr(&mut self, name: &str, value: Value) -> Result<(), ReadError> {
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
        Ok(())
    }

    fn get_attr(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl fmt::Debug for GenericRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.entries {
            map.entry(key, value);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut record = GenericRecord::new();
        record.set_attr("id", Value::Unsigned(7)).unwrap();
        assert_eq!(record.get("id"), Some(&Value::Unsigned(7)));
        assert_eq!(record.get_attr("id"), Some(Value::Unsigned(7)));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut record = GenericRecord::new();
        record.set_attr("a", Value::Unsigned(1)).unwrap();
        record.set_attr("b", Value::Unsigned(2)).unwrap();
        record.set_attr("a", Value::Unsigned(3)).unwrap();

        let keys: Vec<&str> = record.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&Value::Unsigned(3)));
    }

    #[test]
    fn test_iteration_preserves_decode_order() {
        let mut record = GenericRecord::new();
        record.set_attr("z", Value::Unsigned(1)).unwrap();
        record.set_attr("a", Value::Unsigned(2)).unwrap();

        let keys: Vec<&str> = record.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
