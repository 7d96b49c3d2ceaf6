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
//! The `Backend` vtable of `SPEC_FULL.md` §4.8: one implementation per wire
//! protocol, each answering how to sign a request, how to translate bare
//! `Metadata` to/from that protocol's header convention, and which copy
//! directives it understands. `Client<B: Backend>` (`client.rs`) is generic
//! over this trait so the request-execution flow is written once.

use chrono::Utc;

use crate::aws::common::context::{Context, SignatureVersion};
use crate::aws::common::dict::HeaderDict;
use crate::aws::common::metadata::{
    cdmi_headers_to_metadata, cdmi_metadata_to_headers, s3_headers_to_metadata, s3_metadata_to_headers, srws_headers_to_metadata,
    srws_metadata_to_headers, swift_headers_to_metadata, swift_metadata_to_headers, system_metadata_from_headers, Metadata, SystemMetadata,
};
use crate::aws::common::request::{CopyDirective, Request};
use crate::aws::common::signature;
use crate::aws::errors::core::DplResult;

/// One implementation per protocol (`SPEC_FULL.md` §4.8). `sign` mutates the
/// request's header dict in place and returns the `Authorization` header
/// value for backends that have one (S3 V2/V4); backends that authenticate
/// out of band (Swift's token, SRWS, CDMI) return `None` and add nothing.
pub trait Backend {
    fn sign(&self, req: &Request<'_>, headers: &mut HeaderDict, ctx: &Context) -> DplResult<Option<String>>;

    fn metadata_to_headers(&self, meta: &Metadata) -> HeaderDict;

    fn headers_to_metadata(&self, headers: &HeaderDict) -> DplResult<(Metadata, SystemMetadata)>;

    fn copy_directive_supported(&self, directive: CopyDirective) -> bool;
}

/// Amazon S3: HMAC request signing, V2 or V4 per `Context::signature`.
pub struct S3Backend;

impl Backend for S3Backend {
    fn sign(&self, req: &Request<'_>, headers: &mut HeaderDict, ctx: &Context) -> DplResult<Option<String>> {
        let bucket = req.bucket.as_deref();
        match ctx.signature {
            SignatureVersion::V2 => {
                let auth = signature::sign_v2_header(req.method.as_str(), headers, bucket, &req.resource, req.subresource.as_deref(), &ctx.credentials);
                Ok(Some(auth))
            }
            SignatureVersion::V4 => {
                let canonical_uri = crate::aws::common::encode::encode_uri_object_key(&req.resource);
                let params = Vec::new();
                let auth = signature::sign_v4_header(
                    req.method.as_str(),
                    &canonical_uri,
                    &params,
                    req.subresource.as_deref(),
                    headers,
                    &ctx.region.to_string(),
                    "s3",
                    req.data(),
                    &ctx.credentials,
                    Utc::now(),
                )?;
                Ok(Some(auth))
            }
        }
    }

    fn metadata_to_headers(&self, meta: &Metadata) -> HeaderDict {
        s3_metadata_to_headers(meta)
    }

    fn headers_to_metadata(&self, headers: &HeaderDict) -> DplResult<(Metadata, SystemMetadata)> {
        Ok((s3_headers_to_metadata(headers), system_metadata_from_headers(headers)))
    }

    fn copy_directive_supported(&self, directive: CopyDirective) -> bool {
        matches!(directive, CopyDirective::Copy | CopyDirective::MetadataReplace)
    }
}

/// OpenStack Swift: a token is obtained once out of band and attached to
/// every request as `X-Auth-Token`; there is no per-request signature.
pub struct SwiftBackend;

impl Backend for SwiftBackend {
    fn sign(&self, _req: &Request<'_>, headers: &mut HeaderDict, ctx: &Context) -> DplResult<Option<String>> {
        if let Some(token) = ctx.credentials.token() {
            headers.set("X-Auth-Token", token);
        }
        Ok(None)
    }

    fn metadata_to_headers(&self, meta: &Metadata) -> HeaderDict {
        swift_metadata_to_headers(meta, false)
    }

    fn headers_to_metadata(&self, headers: &HeaderDict) -> DplResult<(Metadata, SystemMetadata)> {
        Ok((swift_headers_to_metadata(headers, false), system_metadata_from_headers(headers)))
    }

    fn copy_directive_supported(&self, directive: CopyDirective) -> bool {
        matches!(directive, CopyDirective::Copy)
    }
}

/// Scality SRWS/Sproxyd: unsigned, user metadata packed into one
/// `x-scal-usermd` header, and a broader set of copy directives than S3
/// understands (`libdroplet/srws/backend.c`).
pub struct SrwsBackend;

impl Backend for SrwsBackend {
    fn sign(&self, _req: &Request<'_>, _headers: &mut HeaderDict, _ctx: &Context) -> DplResult<Option<String>> {
        Ok(None)
    }

    fn metadata_to_headers(&self, meta: &Metadata) -> HeaderDict {
        srws_metadata_to_headers(meta)
    }

    fn headers_to_metadata(&self, headers: &HeaderDict) -> DplResult<(Metadata, SystemMetadata)> {
        let meta = srws_headers_to_metadata(headers)?;
        Ok((meta, system_metadata_from_headers(headers)))
    }

    fn copy_directive_supported(&self, directive: CopyDirective) -> bool {
        matches!(
            directive,
            CopyDirective::Copy
                | CopyDirective::Link
                | CopyDirective::Symlink
                | CopyDirective::Move
                | CopyDirective::MkDent
                | CopyDirective::RmDent
                | CopyDirective::MvDent
        )
    }
}

/// CDMI: unsigned, `x-object-meta-`/`x-container-meta-` metadata, content
/// negotiation left to the caller's `Content-Type`/`Accept` headers.
pub struct CdmiBackend {
    pub is_container: bool,
}

impl Backend for CdmiBackend {
    fn sign(&self, _req: &Request<'_>, _headers: &mut HeaderDict, _ctx: &Context) -> DplResult<Option<String>> {
        Ok(None)
    }

    fn metadata_to_headers(&self, meta: &Metadata) -> HeaderDict {
        cdmi_metadata_to_headers(meta, self.is_container)
    }

    fn headers_to_metadata(&self, headers: &HeaderDict) -> DplResult<(Metadata, SystemMetadata)> {
        Ok((cdmi_headers_to_metadata(headers, self.is_container), system_metadata_from_headers(headers)))
    }

    fn copy_directive_supported(&self, directive: CopyDirective) -> bool {
        matches!(directive, CopyDirective::Copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::common::context::EndpointEntry;
    use crate::aws::common::credentials::AwsCredentials;
    use crate::aws::common::request::Method;
    use crate::aws::errors::core::ErrorKind;
    use chrono::Duration;

    fn test_ctx(sig: SignatureVersion) -> Context {
        Context::new(
            AwsCredentials::new("ak", "sk", None, Utc::now() + Duration::seconds(600)),
            crate::aws::common::region::Region::UsEast1,
            sig,
            vec![EndpointEntry::new("s3.amazonaws.com", 443)],
        )
    }

    #[test]
    fn s3_backend_v2_produces_aws_authorization_scheme() {
        let ctx = test_ctx(SignatureVersion::V2);
        let req = Request::new(&ctx, Method::Get, "/key");
        let mut headers = HeaderDict::new();
        headers.set("Date", "Fri, 24 May 2013 00:00:00 GMT");
        let backend = S3Backend;
        let auth = backend.sign(&req, &mut headers, &ctx).unwrap().unwrap();
        assert!(auth.starts_with("AWS ak:"));
    }

    #[test]
    fn s3_backend_v4_produces_aws4_hmac_scheme() {
        let ctx = test_ctx(SignatureVersion::V4);
        let mut req = Request::new(&ctx, Method::Put, "/key");
        req.set_bucket("bucket");
        let mut headers = HeaderDict::new();
        headers.set("Host", "bucket.s3.amazonaws.com");
        let backend = S3Backend;
        let auth = backend.sign(&req, &mut headers, &ctx).unwrap().unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=ak/"));
    }

    #[test]
    fn swift_backend_attaches_token_and_signs_nothing() {
        let mut ctx = test_ctx(SignatureVersion::V4);
        ctx.credentials = AwsCredentials::new("ak", "sk", Some("tok123".to_string()), Utc::now() + Duration::seconds(600));
        let req = Request::new(&ctx, Method::Get, "/key");
        let mut headers = HeaderDict::new();
        let backend = SwiftBackend;
        let auth = backend.sign(&req, &mut headers, &ctx).unwrap();
        assert!(auth.is_none());
        assert_eq!(headers.get("X-Auth-Token"), Some("tok123".to_string()));
    }

    #[test]
    fn s3_rejects_unsupported_copy_directive() {
        assert!(!S3Backend.copy_directive_supported(CopyDirective::Move));
        assert!(S3Backend.copy_directive_supported(CopyDirective::MetadataReplace));
    }

    #[test]
    fn srws_supports_the_broader_directive_set() {
        assert!(SrwsBackend.copy_directive_supported(CopyDirective::MvDent));
        assert!(!SrwsBackend.copy_directive_supported(CopyDirective::MetadataReplace));
    }

    #[test]
    fn srws_headers_to_metadata_surfaces_decode_error() {
        let mut headers = HeaderDict::new();
        headers.set("x-scal-usermd", "not valid base64!!");
        let err = SrwsBackend.headers_to_metadata(&headers).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn cdmi_backend_uses_container_prefix_when_configured() {
        let mut meta = Metadata::new();
        meta.insert("k".to_string(), "v".to_string());
        let backend = CdmiBackend { is_container: true };
        let headers = backend.metadata_to_headers(&meta);
        assert!(headers.contains("x-container-meta-k"));
    }
}
