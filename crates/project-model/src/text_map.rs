//! Insertion-ordered `name -> text` mappings.
//!
//! Variables are emitted into bash in document order, so a later variable
//! may reference an earlier one (`darkness_img: $assets/blackness.png`).
//! Overriding a key replaces its value but keeps its original position.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

/// An ordered mapping of names to opaque text values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextMap {
    entries: Vec<(String, String)>,
}

impl TextMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or replace a value. A replaced key keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Apply every entry of `other` on top of this map (last writer wins).
    pub fn extend_from(&mut self, other: &TextMap) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    /// Keep only the entries whose name satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|(key, _)| keep(key));
    }

    /// Rewrite every value in place.
    pub fn map_values(&mut self, mut f: impl FnMut(&str) -> String) {
        for (_, value) in &mut self.entries {
            *value = f(value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TextMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = TextMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// Render a YAML scalar as the text it would be spelled as in a shell script.
///
/// Sequences and mappings have no text form and are rejected.
pub fn scalar_text(value: serde_yaml::Value) -> Result<String, String> {
    use serde_yaml::Value;

    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        Value::Tagged(tagged) => scalar_text(tagged.value),
        Value::Sequence(_) => Err("expected a scalar value, found a sequence".to_string()),
        Value::Mapping(_) => Err("expected a scalar value, found a mapping".to_string()),
    }
}

impl<'de> Deserialize<'de> for TextMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TextMapVisitor;

        impl<'de> Visitor<'de> for TextMapVisitor {
            type Value = TextMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of names to scalar values")
            }

            fn visit_unit<E: de::Error>(self) -> Result<TextMap, E> {
                Ok(TextMap::new())
            }

            fn visit_none<E: de::Error>(self) -> Result<TextMap, E> {
                Ok(TextMap::new())
            }

            fn visit_map<A>(self, mut access: A) -> Result<TextMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = TextMap::new();
                while let Some((name, value)) =
                    access.next_entry::<String, serde_yaml::Value>()?
                {
                    let text = scalar_text(value)
                        .map_err(|e| de::Error::custom(format!("`{name}`: {e}")))?;
                    map.insert(name, text);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_any(TextMapVisitor)
    }
}
