// Copyright 2017 LambdaStack All rights reserved.
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
//! The request builder of `spec.md` §4.1: a mutable accumulator of method,
//! bucket, resource, range, conditions, copy directives and metadata, that
//! `build()` turns into a per-method `HeaderDict` ready for signing, and
//! `gen_http_request()` turns into the request-line-plus-headers block
//! `writev` sends on the wire.
//!
//! Grounded in `original_source/.../src/request.c` (`dpl_req_add_range`,
//! `dpl_req_build`'s per-method header assembly) and the S3 backend's
//! `req_build` (the copy-source header shape, the canned-ACL/storage-class
//! headers).

use chrono::Utc;
use rustc_serialize::base64::{ToBase64, STANDARD};

use crate::aws::common::context::Context;
use crate::aws::common::dict::HeaderDict;
use crate::aws::common::encode::{encode_uri, encode_uri_object_key};
use crate::aws::common::metadata::Metadata;
use crate::aws::common::params::Params;
use crate::aws::errors::core::{DplError, DplResult, ErrorKind};
use crate::aws::s3::acl::CannedAcl;

/// The reference implementation bounds the range list to a small constant (`spec.md` §4.1).
pub const MAX_RANGES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Head,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Delete => "DELETE",
        }
    }
}

/// Which of the four conditional predicates this is (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    IfMatch,
    IfNoneMatch,
    IfModifiedSince,
    IfUnmodifiedSince,
}

impl ConditionKind {
    /// The header name to emit, picking the `x-amz-copy-source-if-*` variant
    /// when the predicate targets the copy source rather than the object.
    fn header_name(&self, on_copy_source: bool) -> &'static str {
        match (self, on_copy_source) {
            (ConditionKind::IfMatch, false) => "If-Match",
            (ConditionKind::IfNoneMatch, false) => "If-None-Match",
            (ConditionKind::IfModifiedSince, false) => "If-Modified-Since",
            (ConditionKind::IfUnmodifiedSince, false) => "If-Unmodified-Since",
            (ConditionKind::IfMatch, true) => "x-amz-copy-source-if-match",
            (ConditionKind::IfNoneMatch, true) => "x-amz-copy-source-if-none-match",
            (ConditionKind::IfModifiedSince, true) => "x-amz-copy-source-if-modified-since",
            (ConditionKind::IfUnmodifiedSince, true) => "x-amz-copy-source-if-unmodified-since",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub kind: ConditionKind,
    pub on_copy_source: bool,
    pub value: String,
}

/// `spec.md` §3: copy directives. Only `Copy` and `MetadataReplace` are
/// understood at the request-builder layer for any backend; the SRWS-only
/// directives are accepted here and rejected by `Backend::copy_directive_supported`
/// at the call layer instead, so the set stays in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirective {
    Copy,
    Link,
    Symlink,
    Move,
    MkDent,
    RmDent,
    MvDent,
    MetadataReplace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Reg,
    Dir,
    Cap,
    Dom,
    ChrDev,
    BlkDev,
    Fifo,
    Socket,
    Symlink,
    Any,
    Undef,
}

impl Default for ObjectType {
    fn default() -> ObjectType {
        ObjectType::Undef
    }
}

#[derive(Debug, Clone)]
pub struct CopySource {
    pub bucket: String,
    pub resource: String,
    pub subresource: Option<String>,
}

/// Default behavior flags are `{keep_alive, virtual_hosting}` (`spec.md` §4.1 `new`).
#[derive(Debug, Clone, Copy)]
pub struct BehaviorFlags {
    pub virtual_hosting: bool,
    pub keep_alive: bool,
    pub md5: bool,
    pub expect_100: bool,
    pub query_string_form: bool,
}

impl Default for BehaviorFlags {
    fn default() -> BehaviorFlags {
        BehaviorFlags {
            virtual_hosting: true,
            keep_alive: true,
            md5: false,
            expect_100: false,
            query_string_form: false,
        }
    }
}

/// The mutable request builder of `spec.md` §3/§4.1. Valid only between
/// `new` and being consumed by a `Client` call; it borrows the `Context` it
/// was created from rather than owning a copy, per `spec.md` §9's "keep these
/// as borrow-style references" design note.
pub struct Request<'a> {
    pub ctx: &'a Context,
    pub method: Method,
    pub bucket: Option<String>,
    pub resource: String,
    pub subresource: Option<String>,
    pub ranges: Vec<(Option<u64>, Option<u64>)>,
    pub conditions: Vec<Condition>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_type: Option<String>,
    data: Option<Vec<u8>>,
    data_enabled: bool,
    pub metadata: Metadata,
    pub canned_acl: Option<CannedAcl>,
    pub storage_class: Option<String>,
    pub mtime: Option<i64>,
    pub copy_source: Option<CopySource>,
    pub copy_directive: Option<CopyDirective>,
    pub behavior: BehaviorFlags,
    pub expires: Option<i64>,
    pub object_type: ObjectType,
}

impl<'a> Request<'a> {
    pub fn new(ctx: &'a Context, method: Method, resource: &str) -> Request<'a> {
        Request {
            ctx,
            method,
            bucket: None,
            resource: resource.to_string(),
            subresource: None,
            ranges: Vec::new(),
            conditions: Vec::new(),
            cache_control: None,
            content_disposition: None,
            content_encoding: None,
            content_type: None,
            data: None,
            data_enabled: false,
            metadata: Metadata::new(),
            canned_acl: None,
            storage_class: None,
            mtime: None,
            copy_source: None,
            copy_directive: None,
            behavior: BehaviorFlags::default(),
            expires: None,
            object_type: ObjectType::default(),
        }
    }

    pub fn set_bucket(&mut self, bucket: &str) -> &mut Self {
        self.bucket = Some(bucket.to_string());
        self
    }

    pub fn set_subresource(&mut self, subresource: &str) -> &mut Self {
        self.subresource = Some(subresource.to_string());
        self
    }

    /// Appends a range; at most `MAX_RANGES`. Either endpoint may be `None`
    /// ("open"), but not both (`spec.md` §8 boundary behaviors).
    pub fn add_range(&mut self, start: Option<u64>, end: Option<u64>) -> DplResult<&mut Self> {
        if start.is_none() && end.is_none() {
            return Err(DplError::new(ErrorKind::InvalidArgument, "a range needs at least one bound"));
        }
        if self.ranges.len() >= MAX_RANGES {
            return Err(DplError::new(ErrorKind::Limit, "too many ranges on one request"));
        }
        self.ranges.push((start, end));
        Ok(self)
    }

    pub fn add_condition(&mut self, kind: ConditionKind, on_copy_source: bool, value: &str) -> &mut Self {
        self.conditions.push(Condition { kind, on_copy_source, value: value.to_string() });
        self
    }

    pub fn add_metadatum(&mut self, key: &str, value: &str) -> &mut Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn add_metadata(&mut self, meta: &Metadata) -> &mut Self {
        self.metadata.extend(meta.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Enables the inline data body; `build()` uses its length for
    /// `Content-Length` and, if MD5 behavior is set, its MD5 digest.
    pub fn set_data(&mut self, data: Vec<u8>) -> &mut Self {
        self.data = Some(data);
        self.data_enabled = true;
        self
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn set_copy_source(&mut self, bucket: &str, resource: &str, subresource: Option<&str>, directive: CopyDirective) -> &mut Self {
        self.copy_source = Some(CopySource {
            bucket: bucket.to_string(),
            resource: resource.to_string(),
            subresource: subresource.map(|s| s.to_string()),
        });
        self.copy_directive = Some(directive);
        self
    }

    fn range_header_value(&self) -> DplResult<String> {
        let parts: DplResult<Vec<String>> = self
            .ranges
            .iter()
            .map(|(start, end)| match (start, end) {
                (Some(s), Some(e)) => Ok(format!("{}-{}", s, e)),
                (Some(s), None) => Ok(format!("{}-", s)),
                (None, Some(e)) => Ok(format!("-{}", e)),
                (None, None) => Err(DplError::new(ErrorKind::InvalidArgument, "a range needs at least one bound")),
            })
            .collect();
        Ok(format!("bytes={}", parts?.join(",")))
    }

    /// Per-method header assembly, per `spec.md` §4.1.
    pub fn build(&self) -> DplResult<HeaderDict> {
        let mut headers = HeaderDict::new();

        match self.method {
            Method::Get | Method::Head => {
                if !self.ranges.is_empty() {
                    headers.set("Range", &self.range_header_value()?);
                }
                for cond in &self.conditions {
                    headers.set(cond.kind.header_name(cond.on_copy_source), &cond.value);
                }
            }
            Method::Put | Method::Post => {
                if self.data_enabled {
                    let len = self.data.as_ref().map(|d| d.len()).unwrap_or(0);
                    headers.set("Content-Length", &len.to_string());
                    if self.behavior.md5 {
                        let digest = md5::compute(self.data.as_deref().unwrap_or(&[]));
                        headers.set("Content-MD5", &digest.0.to_base64(STANDARD));
                    }
                }
                if let Some(ref v) = self.content_type {
                    headers.set("Content-Type", v);
                }
                if let Some(ref v) = self.content_encoding {
                    headers.set("Content-Encoding", v);
                }
                if let Some(ref v) = self.content_disposition {
                    headers.set("Content-Disposition", v);
                }
                if let Some(ref v) = self.cache_control {
                    headers.set("Cache-Control", v);
                }
                if self.behavior.expect_100 {
                    headers.set("Expect", "100-continue");
                }
                if let Some(acl) = self.canned_acl {
                    headers.set("x-amz-acl", &crate::aws::s3::acl::canned_acl_in_aws_format(&acl));
                }
                if let Some(ref sc) = self.storage_class {
                    headers.set("x-amz-storage-class", sc);
                }
                // User metadata is backend-specific (`x-amz-meta-*` for S3,
                // `X-Object-Meta-*` for Swift, ...); the `Client` merges it in
                // via `Backend::metadata_to_headers` after `build()` returns.
                if let Some(ref copy) = self.copy_source {
                    let mut value = format!("/{}/{}", copy.bucket, encode_uri_object_key(&copy.resource));
                    if let Some(ref sub) = copy.subresource {
                        value.push('?');
                        value.push_str(sub);
                    }
                    headers.set("x-amz-copy-source", &value);

                    match self.copy_directive {
                        None | Some(CopyDirective::Copy) => {}
                        Some(CopyDirective::MetadataReplace) => {
                            headers.set("x-amz-metadata-directive", "REPLACE");
                        }
                        Some(_) => {
                            return Err(DplError::new(ErrorKind::NotSupported, "copy directive not supported at the request-builder layer"));
                        }
                    }

                    for cond in self.conditions.iter().filter(|c| c.on_copy_source) {
                        headers.set(cond.kind.header_name(true), &cond.value);
                    }
                }
            }
            Method::Delete => {}
        }

        if self.behavior.keep_alive {
            headers.set("Connection", "Keep-Alive");
        }
        headers.set("Date", &Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string());

        Ok(headers)
    }

    /// The resource path, percent-encoded slash-preserving, with the
    /// subresource (if any) as the query string (`spec.md` §4.1).
    fn encoded_path_and_query(&self) -> String {
        let mut path = encode_uri_object_key(&self.resource);
        if let Some(ref sub) = self.subresource {
            path.push('?');
            path.push_str(sub);
        }
        path
    }

    /// Writes `METHOD SP path SP HTTP/1.1 CRLF` followed by one `Name: value
    /// CRLF` per header; the caller appends the final blank-line CRLF and the
    /// body as a separate `writev` segment (`spec.md` §4.1).
    pub fn gen_http_request(&self, headers: &HeaderDict, extra_query: Option<&Params>) -> String {
        let mut path = self.encoded_path_and_query();
        if let Some(params) = extra_query {
            if !params.is_empty() {
                let joiner = if path.contains('?') { '&' } else { '?' };
                path.push(joiner);
                let pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", encode_uri(k), encode_uri(v))).collect();
                path.push_str(&pairs.join("&"));
            }
        }

        let mut out = format!("{} {} HTTP/1.1\r\n", self.method.as_str(), path);
        for (name, value) in headers.iter() {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::common::context::{EndpointEntry, SignatureVersion};
    use crate::aws::common::credentials::AwsCredentials;
    use crate::aws::common::region::Region;
    use chrono::{Duration, Utc};

    fn test_ctx() -> Context {
        Context::new(
            AwsCredentials::new("ak", "sk", None, Utc::now() + Duration::seconds(600)),
            Region::UsEast1,
            SignatureVersion::V4,
            vec![EndpointEntry::new("s3.amazonaws.com", 443)],
        )
    }

    #[test]
    fn range_with_only_start_is_open_ended() {
        let ctx = test_ctx();
        let mut req = Request::new(&ctx, Method::Get, "/key");
        req.add_range(Some(10), None).unwrap();
        let headers = req.build().unwrap();
        assert_eq!(headers.get("Range"), Some("bytes=10-".to_string()));
    }

    #[test]
    fn range_with_only_end_is_open_ended() {
        let ctx = test_ctx();
        let mut req = Request::new(&ctx, Method::Get, "/key");
        req.add_range(None, Some(500)).unwrap();
        let headers = req.build().unwrap();
        assert_eq!(headers.get("Range"), Some("bytes=-500".to_string()));
    }

    #[test]
    fn range_with_neither_bound_is_rejected() {
        let ctx = test_ctx();
        let mut req = Request::new(&ctx, Method::Get, "/key");
        let err = req.add_range(None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn more_than_max_ranges_is_rejected() {
        let ctx = test_ctx();
        let mut req = Request::new(&ctx, Method::Get, "/key");
        for i in 0..MAX_RANGES {
            req.add_range(Some(i as u64), Some(i as u64 + 1)).unwrap();
        }
        let err = req.add_range(Some(99), Some(100)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Limit);
    }

    #[test]
    fn put_emits_content_length_and_tracks_metadata_for_the_caller() {
        let ctx = test_ctx();
        let mut req = Request::new(&ctx, Method::Put, "/key");
        req.set_data(b"hello".to_vec());
        req.add_metadatum("color", "red");
        let headers = req.build().unwrap();
        assert_eq!(headers.get("Content-Length"), Some("5".to_string()));
        // Metadata headers are added by `Backend::metadata_to_headers`, not `build()`.
        assert_eq!(req.metadata.get("color"), Some(&"red".to_string()));
    }

    #[test]
    fn put_with_md5_behavior_emits_content_md5() {
        let ctx = test_ctx();
        let mut req = Request::new(&ctx, Method::Put, "/key");
        req.behavior.md5 = true;
        req.set_data(b"hello".to_vec());
        let headers = req.build().unwrap();
        assert!(headers.contains("content-md5"));
    }

    #[test]
    fn copy_with_metadata_replace_emits_directive_header() {
        let ctx = test_ctx();
        let mut req = Request::new(&ctx, Method::Put, "/dst");
        req.set_copy_source("srcbucket", "/src key", None, CopyDirective::MetadataReplace);
        let headers = req.build().unwrap();
        assert_eq!(headers.get("x-amz-copy-source"), Some("/srcbucket/src%20key".to_string()));
        assert_eq!(headers.get("x-amz-metadata-directive"), Some("REPLACE".to_string()));
    }

    #[test]
    fn copy_with_unsupported_directive_is_rejected() {
        let ctx = test_ctx();
        let mut req = Request::new(&ctx, Method::Put, "/dst");
        req.set_copy_source("srcbucket", "/src", None, CopyDirective::Move);
        let err = req.build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
    }

    #[test]
    fn gen_http_request_writes_request_line_and_headers() {
        let ctx = test_ctx();
        let req = Request::new(&ctx, Method::Get, "/a/b");
        let mut headers = HeaderDict::new();
        headers.set("Host", "example.com");
        let out = req.gen_http_request(&headers, None);
        assert!(out.starts_with("GET /a/b HTTP/1.1\r\n"));
        assert!(out.contains("Host: example.com\r\n"));
    }

    #[test]
    fn keep_alive_and_date_are_always_present() {
        let ctx = test_ctx();
        let req = Request::new(&ctx, Method::Delete, "/key");
        let headers = req.build().unwrap();
        assert_eq!(headers.get("Connection"), Some("Keep-Alive".to_string()));
        assert!(headers.contains("date"));
    }
}
