// Copyright 2016 LambdaStack All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Library Documentation
//!
//! `HeaderDict` is the case-insensitive header dictionary described in
//! `spec.md` §3 ("Header dictionary"): a map from header name to value where
//! lookups are case-insensitive but the case a caller used on `add`/`set` is
//! preserved for emission. Multiple values added under the same name (modulo
//! case) are kept and joined with a comma on read, mirroring the original
//! `dpl_dict_t` (`original_source/.../src/dict.c`), which chains same-key
//! entries in a bucket rather than overwriting them.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct HeaderDict {
    // Keyed by lower-cased name; value holds the original case used on first
    // insertion plus every value added under that name.
    entries: BTreeMap<String, (String, Vec<String>)>,
}

impl HeaderDict {
    pub fn new() -> HeaderDict {
        HeaderDict { entries: BTreeMap::new() }
    }

    /// Appends a value, keeping any value(s) already present under this name.
    pub fn add(&mut self, key: &str, value: &str) {
        let lower = key.to_ascii_lowercase();
        let entry = self
            .entries
            .entry(lower)
            .or_insert_with(|| (key.to_string(), Vec::new()));
        entry.1.push(value.to_string());
    }

    /// Replaces any existing value(s) under this name with a single value.
    pub fn set(&mut self, key: &str, value: &str) {
        let lower = key.to_ascii_lowercase();
        self.entries.insert(lower, (key.to_string(), vec![value.to_string()]));
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(&key.to_ascii_lowercase());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    /// Joins multiple values with a comma, as the teacher's `canonical_values` does.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|(_, values)| values.join(","))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates in sorted (lower-cased key) order as `(original_case_key, joined_value)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, String)> {
        self.entries.iter().map(|(_, (orig, values))| (orig.as_str(), values.join(",")))
    }

    /// Iterates in sorted (lower-cased key) order as `(lower_key, joined_value)`;
    /// this is the ordering the signers need.
    pub fn iter_lower(&self) -> impl Iterator<Item = (&str, String)> {
        self.entries.iter().map(|(lower, (_, values))| (lower.as_str(), values.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive_but_preserves_case_on_emission() {
        let mut d = HeaderDict::new();
        d.set("Content-Type", "text/plain");
        assert_eq!(d.get("content-type"), Some("text/plain".to_string()));
        assert_eq!(d.iter().next().unwrap().0, "Content-Type");
    }

    #[test]
    fn set_replaces_add_accumulates() {
        let mut d = HeaderDict::new();
        d.add("X-Amz-Meta-A", "1");
        d.add("x-amz-meta-a", "2");
        assert_eq!(d.get("X-AMZ-META-A"), Some("1,2".to_string()));

        d.set("X-Amz-Meta-A", "final");
        assert_eq!(d.get("x-amz-meta-a"), Some("final".to_string()));
    }

    #[test]
    fn iter_lower_is_sorted_ascii() {
        let mut d = HeaderDict::new();
        d.set("Zebra", "1");
        d.set("Apple", "2");
        let keys: Vec<&str> = d.iter_lower().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["apple", "zebra"]);
    }
}
