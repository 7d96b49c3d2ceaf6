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
//! Connection pool & host dispatcher, per `spec.md` §4.3. Grounded in
//! `original_source/core/.../conn.c`: `conn_hashcode`/`conn_get` (bucket
//! lookup by `hash(addr, port) mod n_conn_buckets`), the idle-probe in
//! `conn_get` (`recv(MSG_DONTWAIT|MSG_PEEK)`), and `dpl_try_connect`'s
//! round-robin-with-blacklist retry loop.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::aws::common::context::Context;
use crate::aws::common::wire::Transport;
use crate::aws::errors::core::{DplError, DplResult, ErrorKind};

struct Slot {
    transport: Transport,
    addr: SocketAddr,
    created_at: Instant,
    last_released: Instant,
    hits: u32,
}

/// A connection checked out of the pool; exclusively owned by the caller
/// until passed back to `release`/`terminate` (`spec.md` §3 invariant: "a
/// connection returned to a caller is removed from the pool's bucket
/// chain").
pub struct Conn {
    pub transport: Transport,
    pub addr: SocketAddr,
    pub host: String,
    created_at: Instant,
    hits: u32,
}

fn hash_addr(addr: SocketAddr) -> u64 {
    let mut hasher = DefaultHasher::new();
    addr.hash(&mut hasher);
    hasher.finish()
}

/// Fixed-size array of singly-linked buckets (`spec.md` §4.3); here a
/// `Vec<Vec<Slot>>`, which is the bucket-chain shape without hand-rolling a
/// linked list in safe Rust.
pub struct Pool {
    buckets: Vec<Vec<Slot>>,
    n_conn_fds: usize,
    n_conn_max: usize,
}

impl Pool {
    pub fn new(n_buckets: usize, n_conn_max: usize) -> Pool {
        Pool {
            buckets: (0..n_buckets.max(1)).map(|_| Vec::new()).collect(),
            n_conn_fds: 0,
            n_conn_max,
        }
    }

    pub fn n_conn_fds(&self) -> usize {
        self.n_conn_fds
    }

    pub fn has_capacity(&self) -> bool {
        self.n_conn_fds < self.n_conn_max
    }

    fn bucket_index(&self, addr: SocketAddr) -> usize {
        (hash_addr(addr) as usize) % self.buckets.len()
    }

    /// Checks out an idle connection to `addr`, if one exists and is still
    /// usable; evicts (and destroys) it instead if the idle probe finds it
    /// dead, or it has exceeded `max_hits`/`idle_time`.
    fn take(&mut self, addr: SocketAddr, max_hits: u32, idle_time: Duration, now: Instant) -> Option<Conn> {
        let idx = self.bucket_index(addr);
        let pos = self.buckets[idx].iter().position(|s| s.addr == addr)?;
        let slot = self.buckets[idx].remove(pos);

        let stale = slot.hits >= max_hits || now.saturating_duration_since(slot.last_released) > idle_time;
        if stale || !slot.transport.peek_is_alive() {
            self.n_conn_fds -= 1;
            return None;
        }

        Some(Conn {
            transport: slot.transport,
            addr,
            host: String::new(),
            created_at: slot.created_at,
            hits: slot.hits + 1,
        })
    }

    fn adopt_new(&mut self, transport: Transport, addr: SocketAddr, host: String, now: Instant) -> Conn {
        self.n_conn_fds += 1;
        Conn { transport, addr, host, created_at: now, hits: 0 }
    }

    fn release(&mut self, conn: Conn, now: Instant) {
        let idx = self.bucket_index(conn.addr);
        self.buckets[idx].push(Slot {
            transport: conn.transport,
            addr: conn.addr,
            created_at: conn.created_at,
            last_released: now,
            hits: conn.hits,
        });
    }

    fn terminate(&mut self, _conn: Conn) {
        self.n_conn_fds -= 1;
    }
}

fn resolve(host: &str, port: u16) -> DplResult<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(DplError::from)?
        .next()
        .ok_or_else(|| DplError::new(ErrorKind::NotFound, "DNS resolution returned no addresses"))
}

/// Host-dispatch + pool check-out: round-robins the endpoint list (skipping
/// blacklisted entries), resolves an address, reuses a pooled connection or
/// opens a new one, and on creation failure blacklists the host (unless
/// virtual-hosting is enabled, per `spec.md` §4.3) before trying the next
/// endpoint. At most one full pass over the endpoint list is attempted.
pub fn try_connect(ctx: &Context, bucket: Option<&str>) -> DplResult<Conn> {
    let n_endpoints = ctx.lock_state().endpoints.len();
    if n_endpoints == 0 {
        return Err(DplError::new(ErrorKind::InvalidArgument, "context has no endpoints configured"));
    }

    let mut last_err = DplError::new(ErrorKind::Failure, "no endpoint available");

    for _ in 0..n_endpoints {
        let now = Instant::now();
        let (_idx, host, port) = {
            let mut state = ctx.lock_state();
            let start = state.cur_host;
            let picked = (0..state.endpoints.len()).map(|o| (start + o) % state.endpoints.len()).find(|&i| !state.endpoints[i].is_blacklisted(now));
            let idx = match picked {
                Some(i) => i,
                None => return Err(DplError::new(ErrorKind::Failure, "all endpoints are blacklisted")),
            };
            state.cur_host = (idx + 1) % state.endpoints.len();
            (idx, state.endpoints[idx].host.clone(), state.endpoints[idx].port)
        };

        let connect_host = match (ctx.virtual_hosting, bucket) {
            (true, Some(b)) if !b.is_empty() => format!("{}.{}", b, host),
            _ => host.clone(),
        };

        let addr = match resolve(&connect_host, port) {
            Ok(a) => a,
            Err(e) => {
                last_err = e;
                continue;
            }
        };

        {
            let mut state = ctx.lock_state();
            if let Some(conn) = state.pool.take(addr, ctx.pool.n_conn_max_hits, ctx.pool.conn_idle_time, now) {
                trace!("reusing pooled connection to {}", connect_host);
                return Ok(Conn { host: connect_host, ..conn });
            }
        }

        if !ctx.lock_state().pool.has_capacity() {
            last_err = DplError::new(ErrorKind::Failure, "connection pool is at capacity");
            continue;
        }

        match open_new(ctx, &connect_host, addr) {
            Ok(transport) => {
                let conn = ctx.lock_state().pool.adopt_new(transport, addr, connect_host.clone(), now);
                debug!("opened new connection to {}", connect_host);
                return Ok(conn);
            }
            Err(e) => {
                warn!("connect to {} failed: {}", connect_host, e);
                if !(ctx.virtual_hosting && bucket.is_some()) {
                    // Blacklisting a bucket-specific virtual-hosted name would
                    // never match the endpoint list's bare host entries.
                    ctx.blacklist_host(&host, now);
                }
                last_err = e;
                continue;
            }
        }
    }

    Err(last_err)
}

fn open_new(ctx: &Context, host: &str, addr: SocketAddr) -> DplResult<Transport> {
    let plain = Transport::connect_plain(addr, ctx.connect_timeout)?;
    if ctx.use_tls {
        let stream = match plain {
            Transport::Plain(s) => s,
            Transport::Tls(_) => unreachable!("connect_plain never returns a TLS transport"),
        };
        Transport::upgrade_tls(stream, host, ctx.verify_tls_cert)
    } else {
        Ok(plain)
    }
}

/// Returns a connection to the pool (`dpl_conn_release`).
pub fn release(ctx: &Context, conn: Conn) {
    conn.transport.set_read_timeout(None).ok();
    ctx.lock_state().pool.release(conn, Instant::now());
}

/// Closes a connection immediately, decrementing `n_conn_fds`
/// (`dpl_conn_terminate`); mandatory after any I/O error, a 5xx reply, or an
/// explicit `Connection: close` (`spec.md` §4.3/§7). Termination alone does
/// not blacklist the host — a plain `Connection: close` on an otherwise
/// successful reply is not a failure signal; callers that tore the
/// connection down because of an I/O error or a 5xx additionally call
/// `Context::blacklist_host` themselves (`spec.md` §7 "Transient network" /
/// "Server 5xx").
pub fn terminate(ctx: &Context, conn: Conn) {
    ctx.lock_state().pool.terminate(conn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::common::credentials::AwsCredentials;
    use crate::aws::common::context::{EndpointEntry, SignatureVersion};
    use crate::aws::common::region::Region;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::net::TcpListener;

    fn test_credentials() -> AwsCredentials {
        AwsCredentials::new("ak", "sk", None, Utc::now() + ChronoDuration::seconds(600))
    }

    fn local_listener() -> (TcpListener, String, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr.ip().to_string(), addr.port())
    }

    #[test]
    fn pool_hash_bucketing_is_consistent_for_same_address() {
        let pool = Pool::new(4, 8);
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(pool.bucket_index(addr), pool.bucket_index(addr));
    }

    #[test]
    fn reuse_then_expire_matches_worked_scenario() {
        let (listener, host, port) = local_listener();
        let accept_thread = std::thread::spawn(move || {
            for _ in 0..2 {
                let _ = listener.accept();
            }
        });

        let mut ctx = Context::new(test_credentials(), Region::UsEast1, SignatureVersion::V4, vec![EndpointEntry::new(&host, port)]);
        ctx.use_tls = false;
        ctx.pool.conn_idle_time = Duration::from_millis(50);

        let conn1 = try_connect(&ctx, None).unwrap();
        assert_eq!(ctx.lock_state().pool.n_conn_fds(), 0); // checked out, not in any bucket
        release(&ctx, conn1);
        assert_eq!(ctx.lock_state().pool.n_conn_fds(), 1);

        let conn2 = try_connect(&ctx, None).unwrap();
        assert_eq!(conn2.hits, 1);
        release(&ctx, conn2);
        assert_eq!(ctx.lock_state().pool.n_conn_fds(), 1);

        std::thread::sleep(Duration::from_millis(120));

        let conn3 = try_connect(&ctx, None).unwrap();
        assert_eq!(conn3.hits, 0); // the idle entry was destroyed, this is a fresh connection
        release(&ctx, conn3);
        assert_eq!(ctx.lock_state().pool.n_conn_fds(), 1);

        accept_thread.join().unwrap();
    }

    #[test]
    fn blacklist_on_connect_failure_routes_to_next_endpoint() {
        let (listener, host_b, port_b) = local_listener();
        let accept_thread = std::thread::spawn(move || {
            let _ = listener.accept();
        });

        let mut ctx = Context::new(
            test_credentials(),
            Region::UsEast1,
            SignatureVersion::V4,
            vec![EndpointEntry::new("192.0.2.1", 81), EndpointEntry::new(&host_b, port_b)],
        );
        ctx.use_tls = false;
        ctx.connect_timeout = Duration::from_millis(200);

        let conn = try_connect(&ctx, None).unwrap();
        assert_eq!(conn.host, host_b);

        let state = ctx.lock_state();
        assert!(state.endpoints[0].is_blacklisted(Instant::now()));

        drop(state);
        release(&ctx, conn);
        accept_thread.join().unwrap();
    }
}
