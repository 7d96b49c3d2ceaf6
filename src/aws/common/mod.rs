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

//! Contains both `Library` and `Client` documentation.

/// `backend` is the per-protocol vtable (`Backend` trait): S3, Swift, SRWS
/// and CDMI each implement signing, metadata mapping and supported copy
/// directives.
pub mod backend;
/// `client` is the crate-level façade, `Client<B: Backend>`, tying the
/// request builder, signer, pool and reply reader into one call per verb.
pub mod client;
/// `credentials` contains the type, struct, enum and impls that are credentials related.
pub mod credentials;
/// `context` holds the per-client configuration and mutable state (endpoint list,
/// credentials, pool parameters) threaded through every request.
pub mod context;
/// `dict` is the case-insensitive header dictionary shared by the request
/// builder, the signers and the reply reader.
pub mod dict;
/// Functions needed for percent-encoding
pub mod encode;
/// `metadata` maps the backend-neutral user/system metadata record onto the
/// header conventions of each backend (S3, Swift, CDMI, SRWS).
pub mod metadata;
/// `params` contains the type, struct, enum and impls that related to URI parameters.
pub mod params;
/// `pool` is the connection pool and round-robin host dispatcher.
pub mod pool;
/// `region` contains the type, struct, enum and impls for Region related functions.
pub mod region;
/// `reply` is the buffered reply reader state machine (status line, headers, body).
pub mod reply;
/// `request` contains the type, struct, enum and impls that are HTTP Request related.
pub mod request;
/// `signature` contains the type, struct, enum and impls that are signature related (V2 and V4),
/// used by `S3Backend::sign` for header-based signing and by `Client::genurl` for presigning.
pub mod signature;
/// `wire` is the raw socket/TLS transport: connect-with-timeout, vectored writes,
/// and the MSG_PEEK idle probe used by the pool to test a cached connection.
pub mod wire;
