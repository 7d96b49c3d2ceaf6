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
//

//! S3-specific pieces that sit above the backend-neutral `common` modules.
//!
//! The bucket/object XML request-and-reply machinery the original
//! `aws-sdk-rust` carried here (`bucket.rs`, `object.rs`, `s3client.rs`,
//! `writeparse.rs`, ...) parsed `ListBucket`/`ListAllMyBuckets` XML bodies,
//! which is out of scope (`spec.md` §1); `Client<S3Backend>` in
//! `common::client` returns those bodies raw instead. Only the canned-ACL
//! vocabulary, which the request builder emits directly, survives here.

/// `acl` is the canned-ACL enum the request builder emits as `x-amz-acl`.
pub mod acl;
