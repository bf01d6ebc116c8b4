//! value::json
//!
//! `LensValue` adapter for `serde_json::Value`.
//!
//! JSON objects are the keyed-mapping node shape: their entries are the
//! children. Arrays, strings, numbers, booleans, and null are leaves - a
//! lens addresses fields by name, not by index.

use serde_json::Value;

use super::traits::LensValue;

impl LensValue for Value {
    fn get(&self, key: &str) -> Option<Self> {
        self.as_object().and_then(|map| map.get(key)).cloned()
    }

    fn with_value(&self, value: Option<Self>, key: &str) -> Self {
        match self.as_object() {
            Some(map) => {
                let mut map = map.clone();
                match value {
                    Some(value) => {
                        map.insert(key.to_string(), value);
                    }
                    None => {
                        map.remove(key);
                    }
                }
                Value::Object(map)
            }
            // Leaves cannot hold children; the lens layer decides whether a
            // missing parent is materialized from a default or is an error.
            None => self.clone(),
        }
    }
}
