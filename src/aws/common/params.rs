/*
 Copyright 2016 LambdaStack All rights reserved.

 Licensed under the Apache License, Version 2.0 (the "License");
 you may not use this file except in compliance with the License.
 You may obtain a copy of the License at

 http://www.apache.org/licenses/LICENSE-2.0

 Unless required by applicable law or agreed to in writing, software
 distributed under the License is distributed on an "AS IS" BASIS,
 WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 See the License for the specific language governing permissions and
 limitations under the License.
*/

/*
 Portions borrowed from the rusoto project. See README.md
*/

//! Query parameters for a `Request` (subresources, presign query form, etc).
//!
//! `spec.md` §4.5 allows duplicate keys in the canonical query string, so
//! unlike the teacher's `BTreeMap<String, String>`, `Params` is an ordered
//! multimap: a plain `Vec` of pairs, sorted on demand at signing time.

pub type Params = Vec<(String, String)>;

/// Key:value pair for a service parameter.
pub trait ServiceParams {
    fn put(&mut self, key: &str, val: &str);
    fn get_first(&self, key: &str) -> Option<&str>;
}

impl ServiceParams for Params {
    fn put(&mut self, key: &str, val: &str) {
        self.push((key.into(), val.into()));
    }

    fn get_first(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_preserves_duplicates() {
        let mut p = Params::new();
        p.put("k", "1");
        p.put("k", "2");
        assert_eq!(p.len(), 2);
        assert_eq!(p.get_first("k"), Some("1"));
    }
}
