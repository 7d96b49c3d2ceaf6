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
//! `ErrorKind` mirrors the `dpl_status_t` codes returned throughout the
//! original C client (`original_source/.../include/droplet.h`): every
//! operation in this crate that can fail surfaces one of these, wrapped in a
//! `DplError` that additionally carries a human-readable message.

use std::error::Error;
use std::fmt;
use std::io;

use openssl::error::ErrorStack as SslErrorStack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Success,
    Failure,
    NoMemory,
    InvalidArgument,
    NotFound,
    Io,
    Limit,
    Timeout,
    PermissionDenied,
    PreconditionFailed,
    Conflict,
    Redirect,
    RangeUnavailable,
    NotSupported,
    Exists,
    IsDirectory,
    NotDirectory,
    NameTooLong,
    NotEmpty,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            ErrorKind::Success => "SUCCESS",
            ErrorKind::Failure => "FAILURE",
            ErrorKind::NoMemory => "ENOMEM",
            ErrorKind::InvalidArgument => "EINVAL",
            ErrorKind::NotFound => "ENOENT",
            ErrorKind::Io => "EIO",
            ErrorKind::Limit => "ELIMIT",
            ErrorKind::Timeout => "ETIMEOUT",
            ErrorKind::PermissionDenied => "EPERM",
            ErrorKind::PreconditionFailed => "EPRECOND",
            ErrorKind::Conflict => "ECONFLICT",
            ErrorKind::Redirect => "EREDIRECT",
            ErrorKind::RangeUnavailable => "ERANGEUNAVAIL",
            ErrorKind::NotSupported => "ENOTSUPP",
            ErrorKind::Exists => "EEXIST",
            ErrorKind::IsDirectory => "EISDIR",
            ErrorKind::NotDirectory => "ENOTDIR",
            ErrorKind::NameTooLong => "ENAMETOOLONG",
            ErrorKind::NotEmpty => "ENOTEMPTY",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct DplError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DplError {
    pub fn new(kind: ErrorKind, message: &str) -> DplError {
        DplError {
            kind,
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for DplError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for DplError {}

impl From<io::Error> for DplError {
    fn from(err: io::Error) -> DplError {
        let kind = match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::Timeout,
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => ErrorKind::Exists,
            _ => ErrorKind::Io,
        };
        DplError::new(kind, &err.to_string())
    }
}

impl From<SslErrorStack> for DplError {
    fn from(err: SslErrorStack) -> DplError {
        DplError::new(ErrorKind::Io, &err.to_string())
    }
}

pub type DplResult<T> = Result<T, DplError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_kind_and_message() {
        let e = DplError::new(ErrorKind::NotFound, "no such bucket");
        assert_eq!(e.to_string(), "ENOENT: no such bucket");
    }

    #[test]
    fn io_timeout_maps_to_timeout_kind() {
        let io_err = io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded");
        let e: DplError = io_err.into();
        assert_eq!(e.kind(), ErrorKind::Timeout);
    }
}
