// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Request sending and response validation over UDP.
//!
//! The transport policy lives in [`ClientOptions`]: a per-attempt timeout
//! (default 1 s), a retry count (default 2 retries after the first
//! attempt), and source verification, which silently discards datagrams
//! arriving from an address other than the queried server and lets the
//! attempt time out instead.

use log::debug;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use roughtime_proto::crypto::chained_nonce;
use roughtime_proto::request::{make_request, BuiltRequest, RequestOptions};
use roughtime_proto::verify::{verify_response, Exchange};
use roughtime_proto::VerifiedTime;

/// Per-attempt timeout applied to each send/receive round.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Additional attempts after the first one times out.
pub const DEFAULT_RETRIES: u32 = 2;

/// Receive buffer size; responses are bounded by the request size, but
/// foreign servers may send more.
const RECV_BUF_SIZE: usize = 4096;

/// Transport and request policy for a client exchange.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Timeout for each individual attempt.
    pub timeout: Duration,
    /// Number of retries after the first attempt.
    pub retries: u32,
    /// Discard responses whose source address is not the queried server,
    /// counting them as a timeout on that attempt.
    pub verify_source: bool,
    /// How the request itself is built (versions, nonce, size).
    pub request: RequestOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            verify_source: true,
            request: RequestOptions::default(),
        }
    }
}

/// Decode a base64-encoded Ed25519 public key (32 bytes).
///
/// # Examples
///
/// ```
/// let pk = roughtime_client::decode_public_key(
///     "0GD7c3yP8xEc4Zl2zeuN2SlLvDVVocjsPSL8/Rl/7zg="
/// ).unwrap();
/// assert_eq!(pk.len(), 32);
/// ```
pub fn decode_public_key(base64_key: &str) -> io::Result<[u8; 32]> {
    let bytes = base64_decode(base64_key).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid base64 public key: {e}"),
        )
    })?;
    if bytes.len() != 32 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("public key must be 32 bytes, got {}", bytes.len()),
        ));
    }
    let mut pk = [0u8; 32];
    pk.copy_from_slice(&bytes);
    Ok(pk)
}

/// Build a chained request: the nonce commits to a previous response via
/// `SHA-512(previous_response ‖ blind)`, so a sequence of exchanges can
/// later prove its order.
pub fn build_chained_request(
    previous_response: &[u8],
    blind: &[u8; 32],
    options: &RequestOptions,
) -> io::Result<BuiltRequest> {
    let version = roughtime_proto::version::choose_version(Some(&options.versions));
    let nonce = chained_nonce(previous_response, blind, version.nonce_length());
    let mut options = options.clone();
    options.nonce = Some(nonce);
    make_request(&options).map_err(io::Error::from)
}

/// Query a server and validate the response, with default options.
///
/// # Arguments
///
/// * `addr` - Server address (e.g. `"roughtime.cloudflare.com:2003"`)
/// * `public_key` - The server's Ed25519 long-term public key
pub fn request<A: ToSocketAddrs>(addr: A, public_key: &[u8; 32]) -> io::Result<VerifiedTime> {
    request_with_options(addr, public_key, &ClientOptions::default())
}

/// Query a server and validate the response.
pub fn request_with_options<A: ToSocketAddrs>(
    addr: A,
    public_key: &[u8; 32],
    options: &ClientOptions,
) -> io::Result<VerifiedTime> {
    let mut request_options = options.request.clone();
    request_options.server_public_key = Some(*public_key);
    let built = make_request(&request_options)?;

    let (response, _peer) = send_request(addr, &built.bytes, options)?;
    finish_exchange(&built, &response, public_key)
}

/// Send a prebuilt request with timeouts and retries, returning the raw
/// response bytes and the responding address.
pub fn send_request<A: ToSocketAddrs>(
    addr: A,
    payload: &[u8],
    options: &ClientOptions,
) -> io::Result<(Vec<u8>, SocketAddr)> {
    let target = resolve(addr.to_socket_addrs()?.collect())?;
    let sock = UdpSocket::bind(bind_addr_for(&target))?;
    sock.set_write_timeout(Some(options.timeout))?;

    let mut recv_buf = [0u8; RECV_BUF_SIZE];
    for attempt in 0..=options.retries {
        let sent = sock.send_to(payload, target)?;
        debug!("roughtime: attempt {attempt}, sent {sent} bytes to {target}");

        let deadline = Instant::now() + options.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            sock.set_read_timeout(Some(remaining))?;
            match sock.recv_from(&mut recv_buf) {
                Ok((len, peer)) => {
                    if options.verify_source && peer.ip() != target.ip() {
                        debug!("roughtime: discarding datagram from unexpected source {peer}");
                        continue;
                    }
                    debug!("roughtime: received {len} bytes from {peer}");
                    return Ok((recv_buf[..len].to_vec(), peer));
                }
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    break;
                }
                Err(e) => return Err(e),
            }
        }
    }

    Err(io::Error::new(
        io::ErrorKind::TimedOut,
        "no response from roughtime server",
    ))
}

/// Query a server and validate the response, async, with default options.
pub async fn async_request<A: tokio::net::ToSocketAddrs>(
    addr: A,
    public_key: &[u8; 32],
) -> io::Result<VerifiedTime> {
    async_request_with_options(addr, public_key, &ClientOptions::default()).await
}

/// Query a server and validate the response, async.
pub async fn async_request_with_options<A: tokio::net::ToSocketAddrs>(
    addr: A,
    public_key: &[u8; 32],
    options: &ClientOptions,
) -> io::Result<VerifiedTime> {
    let mut request_options = options.request.clone();
    request_options.server_public_key = Some(*public_key);
    let built = make_request(&request_options)?;

    let (response, _peer) = async_send_request(addr, &built.bytes, options).await?;
    finish_exchange(&built, &response, public_key)
}

/// Send a prebuilt request with timeouts and retries, async.
pub async fn async_send_request<A: tokio::net::ToSocketAddrs>(
    addr: A,
    payload: &[u8],
    options: &ClientOptions,
) -> io::Result<(Vec<u8>, SocketAddr)> {
    let target = resolve(tokio::net::lookup_host(addr).await?.collect())?;
    let sock = tokio::net::UdpSocket::bind(bind_addr_for(&target)).await?;

    for attempt in 0..=options.retries {
        let sent = sock.send_to(payload, target).await?;
        debug!("roughtime: attempt {attempt}, sent {sent} bytes to {target}");

        match tokio::time::timeout(options.timeout, async {
            let mut recv_buf = [0u8; RECV_BUF_SIZE];
            loop {
                let (len, peer) = sock.recv_from(&mut recv_buf).await?;
                if options.verify_source && peer.ip() != target.ip() {
                    debug!("roughtime: discarding datagram from unexpected source {peer}");
                    continue;
                }
                debug!("roughtime: received {len} bytes from {peer}");
                return Ok::<_, io::Error>((recv_buf[..len].to_vec(), peer));
            }
        })
        .await
        {
            Ok(result) => return result,
            Err(_) => continue, // attempt timed out
        }
    }

    Err(io::Error::new(
        io::ErrorKind::TimedOut,
        "no response from roughtime server",
    ))
}

fn finish_exchange(
    built: &BuiltRequest,
    response: &[u8],
    public_key: &[u8; 32],
) -> io::Result<VerifiedTime> {
    let observed_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let verified = verify_response(&Exchange {
        request: &built.bytes,
        response,
        server_public_key: public_key,
        observed_at,
    })?;
    Ok(verified)
}

/// Pick the target address, preferring IPv4 (many Roughtime deployments
/// are v4-only behind v6-capable resolvers).
fn resolve(mut addrs: Vec<SocketAddr>) -> io::Result<SocketAddr> {
    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "address resolved to no socket addresses",
        ));
    }
    addrs.sort_by_key(|a| match a {
        SocketAddr::V4(_) => 0,
        SocketAddr::V6(_) => 1,
    });
    Ok(addrs[0])
}

/// Select the bind address matching the target's address family.
fn bind_addr_for(target: &SocketAddr) -> &'static str {
    match target {
        SocketAddr::V4(_) => "0.0.0.0:0",
        SocketAddr::V6(_) => "[::]:0",
    }
}

// ── Minimal base64 decoder ──────────────────────────────────────────

fn base64_decode(input: &str) -> Result<Vec<u8>, &'static str> {
    let input = input.trim_end_matches('=');
    let mut out = Vec::with_capacity(input.len() * 3 / 4);
    let mut buf = 0u32;
    let mut bits = 0u32;

    for ch in input.bytes() {
        let val = match ch {
            b'A'..=b'Z' => ch - b'A',
            b'a'..=b'z' => ch - b'a' + 26,
            b'0'..=b'9' => ch - b'0' + 52,
            b'+' => 62,
            b'/' => 63,
            b'\n' | b'\r' | b' ' => continue,
            _ => return Err("invalid base64 character"),
        };
        buf = (buf << 6) | val as u32;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((buf >> bits) as u8);
            buf &= (1 << bits) - 1;
        }
    }

    Ok(out)
}
