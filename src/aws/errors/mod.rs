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

/// `creds` contains `CredentialsError`, surfaced by the credentials provider chain.
pub mod creds;
/// `core` contains `ErrorKind`/`DplError`, the error type every backend operation returns.
pub mod core;

pub use self::core::{DplError, DplResult, ErrorKind};
pub use self::creds::CredentialsError;
