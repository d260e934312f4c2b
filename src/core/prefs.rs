//! The preference store.
//!
//! A flat map from dotted keys (`tools.avrdude.upload.pattern`) to string
//! values. Values are either plain facts or templates containing `{key}`
//! placeholders; expansion lives in [`crate::resolver::expand`].

use std::collections::HashMap;

/// Flat dotted-key preference map. Last write wins.
#[derive(Debug, Clone, Default)]
pub struct PreferenceStore {
    values: HashMap<String, String>,
}

impl PreferenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        PreferenceStore {
            values: HashMap::new(),
        }
    }

    /// Insert or replace a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw (unexpanded) value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Check whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Merge `key=value` lines as produced by a preference dump.
    ///
    /// Lines are trimmed and split on the first `=`; lines without a `=`
    /// or with an empty key are skipped. Returns the number of keys read.
    pub fn merge_dump(&mut self, dump: &str) -> usize {
        let mut count = 0;
        for line in dump.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            self.set(key, value);
            count += 1;
        }
        count
    }

    /// Iterate over keys in sorted order.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PreferenceStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = PreferenceStore::new();
        for (k, v) in iter {
            store.set(k, v);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut store = PreferenceStore::new();
        store.set("serial.port", "/dev/ttyUSB0");
        store.set("serial.port", "/dev/ttyACM0");
        assert_eq!(store.get("serial.port"), Some("/dev/ttyACM0"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_merge_dump() {
        let mut store = PreferenceStore::new();
        let dump = "\
build.mcu=atmega328p
  upload.tool=avrdude
recipe.c.o.pattern=\"{compiler.path}{compiler.c.cmd}\" -DARDUINO={runtime.ide.version}
this line has no separator
=orphan
";
        let count = store.merge_dump(dump);
        assert_eq!(count, 3);
        assert_eq!(store.get("build.mcu"), Some("atmega328p"));
        assert_eq!(store.get("upload.tool"), Some("avrdude"));
        assert_eq!(
            store.get("recipe.c.o.pattern"),
            Some("\"{compiler.path}{compiler.c.cmd}\" -DARDUINO={runtime.ide.version}")
        );
    }

    #[test]
    fn test_from_iter_and_sorted_keys() {
        let store: PreferenceStore = [("b.key", "2"), ("a.key", "1")].into_iter().collect();
        assert_eq!(store.sorted_keys(), vec!["a.key", "b.key"]);
    }
}
