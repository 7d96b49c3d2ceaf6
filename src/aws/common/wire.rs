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
//! Vectored write-with-timeout and a line-oriented buffered reader over
//! either a plaintext `TcpStream` or a TLS `SslStream`, per `spec.md` §4.6.
//!
//! Grounded in `original_source/core/.../conn.c`'s `do_connect` (non-blocking
//! connect with `poll`-driven timeout) and `writev_all`/`writev_all_ssl`
//! (plaintext uses the vector directly; TLS flattens it into one buffer
//! because `SSL_write` has no vectored form).

use std::io::{self, IoSlice, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use openssl::ssl::{SslConnector, SslMethod, SslStream, SslVerifyMode};

use crate::aws::errors::core::{DplError, DplResult, ErrorKind};

/// Either a plaintext socket or a TLS session over one, matching the
/// `Connection`'s HTTP variant in `spec.md` §3 (the `FILE` variant is a
/// POSIX-backend concern, out of scope here).
pub enum Transport {
    Plain(TcpStream),
    Tls(Box<SslStream<TcpStream>>),
}

impl Transport {
    /// Non-blocking `connect(2)` with poll-driven timeout (`do_connect`).
    /// `std::net::TcpStream::connect_timeout` already implements the
    /// "connect, then poll for writable within the deadline" dance this
    /// crate's C ancestor hand-rolled with `ioctl(FIONBIO)`/`poll`.
    pub fn connect_plain(addr: SocketAddr, connect_timeout: Duration) -> DplResult<Transport> {
        let stream = TcpStream::connect_timeout(&addr, connect_timeout).map_err(|e| {
            if e.kind() == io::ErrorKind::TimedOut {
                DplError::new(ErrorKind::Timeout, "connect timed out")
            } else {
                DplError::from(e)
            }
        })?;
        stream.set_nodelay(true).ok();
        Ok(Transport::Plain(stream))
    }

    /// Attaches TLS to an already-connected plaintext socket (`init_ssl_conn`
    /// in the original: the handshake happens only once the socket is
    /// writable, which `connect_plain` already guarantees).
    pub fn upgrade_tls(stream: TcpStream, host: &str, verify_cert: bool) -> DplResult<Transport> {
        let mut builder = SslConnector::builder(SslMethod::tls())?;
        if !verify_cert {
            builder.set_verify(SslVerifyMode::NONE);
        }
        let connector = builder.build();
        let ssl_stream = connector
            .connect(host, stream)
            .map_err(|e| DplError::new(ErrorKind::Io, &e.to_string()))?;
        Ok(Transport::Tls(Box::new(ssl_stream)))
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> DplResult<()> {
        let stream = match self {
            Transport::Plain(s) => s,
            Transport::Tls(s) => s.get_ref(),
        };
        stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Non-destructive idle probe used by the pool on check-out: a
    /// zero-timeout `MSG_PEEK` read. Matches `conn.c`'s use of
    /// `recv(MSG_DONTWAIT|MSG_PEEK)` to detect a peer-closed idle socket
    /// before handing it back out.
    pub fn peek_is_alive(&self) -> bool {
        let stream = match self {
            Transport::Plain(s) => s,
            Transport::Tls(s) => s.get_ref(),
        };
        // A zero `Duration` is rejected by `set_read_timeout` (`ErrorKind::InvalidInput`);
        // one microsecond is the closest stand-in for the original's zero-timeout poll.
        stream.set_read_timeout(Some(Duration::from_micros(1))).ok();
        let mut buf = [0u8; 1];
        let result = match stream.peek(&mut buf) {
            Ok(0) => false,
            Ok(_) => true,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => true,
            Err(_) => false,
        };
        result
    }

    /// Vectored write with a per-write timeout on the plaintext path
    /// (`writev_all_plaintext`); the TLS path flattens into one buffer and
    /// issues a single `SSL_write`, since OpenSSL has no vectored write and
    /// the per-write timeout is therefore not enforceable there
    /// (REDESIGN FLAG 4 / `spec.md` §4.6 "documented as ignored").
    pub fn write_all_vectored(&mut self, bufs: &[&[u8]], write_timeout: Duration) -> DplResult<()> {
        match self {
            Transport::Plain(stream) => {
                stream.set_write_timeout(Some(write_timeout))?;
                // `write_all_vectored`/`IoSlice::advance_slices` are both
                // nightly-only; `write_vectored` (stable) may still perform a
                // short write across the buffer list, so the base/len
                // bookkeeping `writev_all_plaintext` does by hand is done by
                // hand here too, trimming `remaining` as bytes drain.
                let mut remaining: Vec<&[u8]> = bufs.iter().copied().filter(|b| !b.is_empty()).collect();
                while !remaining.is_empty() {
                    let slices: Vec<IoSlice> = remaining.iter().map(|b| IoSlice::new(b)).collect();
                    let written = match stream.write_vectored(&slices) {
                        Ok(0) => return Err(DplError::new(ErrorKind::Io, "write returned zero bytes")),
                        Ok(n) => n,
                        Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(ref e) if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock => {
                            return Err(DplError::new(ErrorKind::Timeout, "write timed out"));
                        }
                        Err(e) => return Err(DplError::from(e)),
                    };
                    let mut to_skip = written;
                    while to_skip > 0 {
                        let front_len = remaining[0].len();
                        if to_skip < front_len {
                            remaining[0] = &remaining[0][to_skip..];
                            to_skip = 0;
                        } else {
                            to_skip -= front_len;
                            remaining.remove(0);
                        }
                    }
                }
                Ok(())
            }
            Transport::Tls(stream) => {
                let mut flat = Vec::with_capacity(bufs.iter().map(|b| b.len()).sum());
                for b in bufs {
                    flat.extend_from_slice(b);
                }
                stream.write_all(&flat).map_err(DplError::from)
            }
        }
    }

    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(stream) => stream.read(buf),
            Transport::Tls(stream) => stream.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn connect_plain_succeeds_against_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let _ = listener.accept();
        });
        let transport = Transport::connect_plain(addr, Duration::from_secs(2));
        assert!(transport.is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn connect_plain_times_out_on_unroutable_address() {
        // TEST-NET-1 (RFC 5737) is reserved for documentation and will not
        // respond; a short timeout keeps the test fast.
        let addr: SocketAddr = "192.0.2.1:81".parse().unwrap();
        let result = Transport::connect_plain(addr, Duration::from_millis(200));
        assert!(result.is_err());
    }

    #[test]
    fn write_all_vectored_plain_writes_every_byte_across_parts() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            sock.read_to_end(&mut buf).unwrap();
            buf
        });

        let mut transport = Transport::connect_plain(addr, Duration::from_secs(2)).unwrap();
        transport.write_all_vectored(&[b"hello ", b"world"], Duration::from_secs(2)).unwrap();
        drop(transport);

        let received = handle.join().unwrap();
        assert_eq!(received, b"hello world");
    }
}
