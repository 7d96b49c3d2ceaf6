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
//! Metadata mapping per `spec.md` §4.7: a backend-neutral `Metadata` dict
//! (bare key names, no prefix) translates to/from the header conventions of
//! each backend, and `SystemMetadata` is extracted from the small set of
//! stable headers every backend returns (`content-length`, `last-modified`,
//! `etag`).
//!
//! The SRWS/Sproxyd variant folds all user metadata into one header,
//! `x-scal-usermd`, base64-encoded over the n-tinydb record format used by
//! the original C client (`original_source/libdroplet/src/ntinydb.c`): a
//! flat sequence of `<flag:1><keylen:u32be><key><vallen:u32be><val>` records.

use std::collections::BTreeMap;

use rustc_serialize::base64::{FromBase64, ToBase64, STANDARD};

use crate::aws::common::dict::HeaderDict;
use crate::aws::errors::core::{DplError, ErrorKind};
use crate::aws::s3::acl::CannedAcl;

/// Backend-neutral user metadata: bare keys (no `x-amz-meta-`/etc. prefix).
pub type Metadata = BTreeMap<String, String>;

/// Extracted from the stable headers every backend returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemMetadata {
    pub size: Option<u64>,
    pub mtime: Option<String>,
    pub etag: Option<String>,
    pub canned_acl: Option<CannedAcl>,
    pub storage_class: Option<String>,
}

/// Strips surrounding double quotes from an ETag header value, per `spec.md`
/// §4.7 ("surrounding double quotes stripped").
pub fn strip_etag_quotes(raw: &str) -> String {
    raw.trim_matches('"').to_string()
}

/// Extracts `SystemMetadata` from the stable reply headers common to every
/// backend: `content-length → size`, `last-modified → mtime`, `etag → etag`.
pub fn system_metadata_from_headers(headers: &HeaderDict) -> SystemMetadata {
    SystemMetadata {
        size: headers.get("content-length").and_then(|v| v.parse::<u64>().ok()),
        mtime: headers.get("last-modified"),
        etag: headers.get("etag").map(|v| strip_etag_quotes(&v)),
        canned_acl: None,
        storage_class: headers.get("x-amz-storage-class"),
    }
}

/// Adds every entry of `meta` to `headers` with the given prefix.
fn add_prefixed(headers: &mut HeaderDict, prefix: &str, meta: &Metadata) {
    for (key, value) in meta.iter() {
        headers.add(&format!("{}{}", prefix, key), value);
    }
}

/// Pulls every header beginning with `prefix` (case-insensitively) back out
/// into a bare-keyed `Metadata` dict.
fn strip_prefixed(headers: &HeaderDict, prefix: &str) -> Metadata {
    let lower_prefix = prefix.to_ascii_lowercase();
    let mut meta = Metadata::new();
    for (key, value) in headers.iter_lower() {
        if let Some(bare) = key.strip_prefix(lower_prefix.as_str()) {
            meta.insert(bare.to_string(), value);
        }
    }
    meta
}

/// S3: `x-amz-meta-<key>`.
pub fn s3_metadata_to_headers(meta: &Metadata) -> HeaderDict {
    let mut headers = HeaderDict::new();
    add_prefixed(&mut headers, "x-amz-meta-", meta);
    headers
}

pub fn s3_headers_to_metadata(headers: &HeaderDict) -> Metadata {
    strip_prefixed(headers, "x-amz-meta-")
}

/// CDMI: `x-object-meta-<key>` on objects, `x-container-meta-<key>` on
/// containers (`original_source/.../backend/cdmi/replyparser.c` names both
/// prefixes in its "common routine for x-object-meta-* and
/// x-container-meta-*").
pub fn cdmi_metadata_to_headers(meta: &Metadata, is_container: bool) -> HeaderDict {
    let prefix = if is_container { "x-container-meta-" } else { "x-object-meta-" };
    let mut headers = HeaderDict::new();
    add_prefixed(&mut headers, prefix, meta);
    headers
}

pub fn cdmi_headers_to_metadata(headers: &HeaderDict, is_container: bool) -> Metadata {
    let prefix = if is_container { "x-container-meta-" } else { "x-object-meta-" };
    strip_prefixed(headers, prefix)
}

/// Swift: `X-Object-Meta-<key>` on objects, `X-Container-Meta-<key>` on
/// containers.
pub fn swift_metadata_to_headers(meta: &Metadata, is_container: bool) -> HeaderDict {
    let prefix = if is_container { "X-Container-Meta-" } else { "X-Object-Meta-" };
    let mut headers = HeaderDict::new();
    add_prefixed(&mut headers, prefix, meta);
    headers
}

pub fn swift_headers_to_metadata(headers: &HeaderDict, is_container: bool) -> Metadata {
    let prefix = if is_container { "x-container-meta-" } else { "x-object-meta-" };
    strip_prefixed(headers, prefix)
}

const USERMD_HEADER: &str = "x-scal-usermd";

/// Encodes a `Metadata` dict as n-tinydb records, per `ntinydb.c`'s
/// `dpl_ntinydb_set`: `<flag=0:1><keylen:u32be><key><vallen:u32be><val>`.
pub fn ntinydb_encode(meta: &Metadata) -> Vec<u8> {
    let mut blob = Vec::new();
    for (key, value) in meta.iter() {
        blob.push(0u8); // flag, always 0 in the original encoder
        blob.extend_from_slice(&(key.len() as u32).to_be_bytes());
        blob.extend_from_slice(key.as_bytes());
        blob.extend_from_slice(&(value.len() as u32).to_be_bytes());
        blob.extend_from_slice(value.as_bytes());
    }
    blob
}

/// Decodes an n-tinydb blob back into a `Metadata` dict. Iteration stops at
/// the first truncated record, per `spec.md` §4.7.
pub fn ntinydb_decode(blob: &[u8]) -> Metadata {
    let mut meta = Metadata::new();
    let mut i = 0usize;
    loop {
        if i + 1 > blob.len() {
            break;
        }
        i += 1; // flag, unused on read

        if i + 4 > blob.len() {
            break;
        }
        let keylen = u32::from_be_bytes([blob[i], blob[i + 1], blob[i + 2], blob[i + 3]]) as usize;
        i += 4;

        if i + keylen > blob.len() {
            break;
        }
        let key = match std::str::from_utf8(&blob[i..i + keylen]) {
            Ok(s) => s.to_string(),
            Err(_) => break,
        };
        i += keylen;

        if i + 4 > blob.len() {
            break;
        }
        let vallen = u32::from_be_bytes([blob[i], blob[i + 1], blob[i + 2], blob[i + 3]]) as usize;
        i += 4;

        if i + vallen > blob.len() {
            break;
        }
        let value = match std::str::from_utf8(&blob[i..i + vallen]) {
            Ok(s) => s.to_string(),
            Err(_) => break,
        };
        i += vallen;

        meta.insert(key, value);
    }
    meta
}

/// SRWS: all user metadata packed into one base64-encoded `x-scal-usermd` header.
pub fn srws_metadata_to_headers(meta: &Metadata) -> HeaderDict {
    let mut headers = HeaderDict::new();
    if !meta.is_empty() {
        let encoded = ntinydb_encode(meta).to_base64(STANDARD);
        headers.set(USERMD_HEADER, &encoded);
    }
    headers
}

pub fn srws_headers_to_metadata(headers: &HeaderDict) -> Result<Metadata, DplError> {
    match headers.get(USERMD_HEADER) {
        None => Ok(Metadata::new()),
        Some(encoded) => {
            let blob = encoded
                .from_base64()
                .map_err(|e| DplError::new(ErrorKind::InvalidArgument, &e.to_string()))?;
            Ok(ntinydb_decode(&blob))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> Metadata {
        let mut m = Metadata::new();
        m.insert("color".to_string(), "red".to_string());
        m.insert("owner".to_string(), "alice".to_string());
        m
    }

    #[test]
    fn s3_round_trips_through_headers() {
        let meta = sample_metadata();
        let headers = s3_metadata_to_headers(&meta);
        assert_eq!(headers.get("x-amz-meta-color"), Some("red".to_string()));
        assert_eq!(s3_headers_to_metadata(&headers), meta);
    }

    #[test]
    fn cdmi_object_vs_container_prefix() {
        let meta = sample_metadata();
        let object_headers = cdmi_metadata_to_headers(&meta, false);
        let container_headers = cdmi_metadata_to_headers(&meta, true);
        assert!(object_headers.contains("x-object-meta-color"));
        assert!(container_headers.contains("x-container-meta-color"));
        assert_eq!(cdmi_headers_to_metadata(&object_headers, false), meta);
    }

    #[test]
    fn swift_object_vs_container_prefix() {
        let meta = sample_metadata();
        let object_headers = swift_metadata_to_headers(&meta, false);
        assert!(object_headers.contains("x-object-meta-color"));
        assert_eq!(swift_headers_to_metadata(&object_headers, false), meta);
    }

    #[test]
    fn ntinydb_encode_decode_is_identity() {
        let meta = sample_metadata();
        let blob = ntinydb_encode(&meta);
        assert_eq!(ntinydb_decode(&blob), meta);
    }

    #[test]
    fn ntinydb_stops_at_truncated_record() {
        let mut blob = ntinydb_encode(&sample_metadata());
        blob.truncate(blob.len() - 2);
        // Still decodes the first complete record(s), never panics on the tail.
        let _ = ntinydb_decode(&blob);
    }

    #[test]
    fn srws_round_trips_base64_ntinydb_through_header() {
        let meta = sample_metadata();
        let headers = srws_metadata_to_headers(&meta);
        assert!(headers.contains(USERMD_HEADER));
        assert_eq!(srws_headers_to_metadata(&headers).unwrap(), meta);
    }

    #[test]
    fn srws_empty_metadata_omits_header() {
        let headers = srws_metadata_to_headers(&Metadata::new());
        assert!(!headers.contains(USERMD_HEADER));
    }

    #[test]
    fn strip_etag_quotes_removes_surrounding_quotes() {
        assert_eq!(strip_etag_quotes("\"abc123\""), "abc123");
        assert_eq!(strip_etag_quotes("abc123"), "abc123");
    }
}
