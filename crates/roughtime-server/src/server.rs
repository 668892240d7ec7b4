// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime server using the Tokio runtime.
//!
//! A single async task drains the socket: one awaited `recv_from`, then as
//! many non-blocking receives as are queued (up to the batch cap), then one
//! [`respond_batch`](crate::pipeline::respond_batch) over the lot. Under
//! load the batch fills and every response in it shares one signature;
//! idle, it degrades to request-at-a-time with no added latency.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() -> std::io::Result<()> {
//! use roughtime_server::server::RoughtimeServer;
//!
//! let server = RoughtimeServer::builder()
//!     .listen("[::]:2002")
//!     .radius_seconds(10)
//!     .build()
//!     .await?;
//!
//! server.run().await
//! # }
//! ```

use log::{debug, info, warn};
use std::io;
use std::sync::Arc;
use tokio::net::UdpSocket;

use ring::rand::SystemRandom;
use roughtime_proto::crypto::SigningKey;
use roughtime_proto::request::MIN_REQUEST_SIZE;
use roughtime_proto::response::DEFAULT_RADIUS_SECONDS;

use crate::error::ServerError;
use crate::keys::{OnlineCertSet, DEFAULT_VALIDITY_SECS};
use crate::metrics::ServerMetrics;
use crate::now_micros;
use crate::pipeline::{respond_batch, ResponderConfig};

/// Largest datagram the server will read.
const RECV_BUF_SIZE: usize = 4096;

/// Default cap on requests answered with one shared signature.
const DEFAULT_MAX_BATCH: usize = 64;

/// Builder for configuring and creating a [`RoughtimeServer`].
pub struct RoughtimeServerBuilder {
    listen_addr: String,
    long_term_seed: Option<[u8; 32]>,
    validity_secs: u64,
    radius_seconds: u32,
    min_request_size: usize,
    max_batch: usize,
    metrics: Option<Arc<ServerMetrics>>,
}

impl RoughtimeServerBuilder {
    fn new() -> Self {
        RoughtimeServerBuilder {
            listen_addr: "[::]:2002".to_string(),
            long_term_seed: None,
            validity_secs: DEFAULT_VALIDITY_SECS,
            radius_seconds: DEFAULT_RADIUS_SECONDS,
            min_request_size: MIN_REQUEST_SIZE,
            max_batch: DEFAULT_MAX_BATCH,
            metrics: None,
        }
    }

    /// Set the listen address (default `"[::]:2002"`).
    pub fn listen(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Use the given raw 32-byte seed as the long-term key. Without this, a
    /// fresh key is generated at build time (fine for testing; a production
    /// deployment wants a stable identity).
    pub fn long_term_seed(mut self, seed: [u8; 32]) -> Self {
        self.long_term_seed = Some(seed);
        self
    }

    /// Delegation validity window in seconds (default 3,600). The online
    /// key is re-minted when the window lapses.
    pub fn validity_secs(mut self, secs: u64) -> Self {
        self.validity_secs = secs;
        self
    }

    /// Radius reported in signed payloads, in seconds (default 10).
    pub fn radius_seconds(mut self, radius: u32) -> Self {
        self.radius_seconds = radius;
        self
    }

    /// Anti-amplification floor on request datagrams (default 1024 bytes;
    /// 0 disables).
    pub fn min_request_size(mut self, bytes: usize) -> Self {
        self.min_request_size = bytes;
        self
    }

    /// Cap on how many queued requests are answered per batch (default 64).
    pub fn max_batch(mut self, max: usize) -> Self {
        self.max_batch = max.max(1);
        self
    }

    /// Attach a shared metrics instance updated on every datagram.
    pub fn metrics(mut self, metrics: Arc<ServerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Bind the socket, mint the initial certificate set, and build.
    pub async fn build(self) -> io::Result<RoughtimeServer> {
        let rng = SystemRandom::new();
        let long_term = match self.long_term_seed {
            Some(seed) => SigningKey::from_seed(&seed).map_err(ServerError::from)?,
            None => SigningKey::generate(&rng).map_err(ServerError::from)?,
        };

        let certs = OnlineCertSet::mint(
            &long_term,
            &rng,
            now_micros() / 1_000_000,
            self.validity_secs,
        )
        .map_err(ServerError::from)?;
        if let Some(m) = &self.metrics {
            m.inc_certs_minted();
        }

        let sock = UdpSocket::bind(&self.listen_addr).await?;
        info!("roughtime server listening on {}", self.listen_addr);

        Ok(RoughtimeServer {
            sock,
            rng,
            long_term,
            certs,
            validity_secs: self.validity_secs,
            config: ResponderConfig {
                radius_seconds: self.radius_seconds,
                min_request_size: self.min_request_size,
            },
            max_batch: self.max_batch,
            metrics: self.metrics,
        })
    }
}

/// A batching Roughtime server.
///
/// Created via [`RoughtimeServer::builder()`]; call
/// [`run()`](RoughtimeServer::run) to start serving.
pub struct RoughtimeServer {
    sock: UdpSocket,
    rng: SystemRandom,
    long_term: SigningKey,
    certs: OnlineCertSet,
    validity_secs: u64,
    config: ResponderConfig,
    max_batch: usize,
    metrics: Option<Arc<ServerMetrics>>,
}

impl RoughtimeServer {
    /// Create a builder for configuring the server.
    pub fn builder() -> RoughtimeServerBuilder {
        RoughtimeServerBuilder::new()
    }

    /// The long-term public key clients validate against.
    pub fn public_key(&self) -> [u8; 32] {
        self.long_term.public_key()
    }

    /// The local address the server is bound to.
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.sock.local_addr()
    }

    /// Re-mint the online certificate set if its window has lapsed.
    fn refresh_certs(&mut self, now_unix: u64) -> Result<(), ServerError> {
        if !self.certs.is_expired(now_unix) {
            return Ok(());
        }
        self.certs = OnlineCertSet::mint(&self.long_term, &self.rng, now_unix, self.validity_secs)?;
        if let Some(m) = &self.metrics {
            m.inc_certs_minted();
        }
        info!(
            "re-minted online certificates, window ends {}",
            self.certs.expires_at()
        );
        Ok(())
    }

    /// Run the server, answering requests until a socket error occurs.
    pub async fn run(mut self) -> io::Result<()> {
        let mut recv_buf = [0u8; RECV_BUF_SIZE];

        loop {
            let mut batch: Vec<(Vec<u8>, std::net::SocketAddr)> = Vec::new();

            let (len, peer) = self.sock.recv_from(&mut recv_buf).await?;
            batch.push((recv_buf[..len].to_vec(), peer));

            // Drain whatever else is already queued, up to the cap.
            while batch.len() < self.max_batch {
                match self.sock.try_recv_from(&mut recv_buf) {
                    Ok((len, peer)) => batch.push((recv_buf[..len].to_vec(), peer)),
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                    Err(e) => return Err(e),
                }
            }

            let now = now_micros();
            if let Err(e) = self.refresh_certs(now / 1_000_000) {
                warn!("certificate refresh failed: {e}");
                continue;
            }

            if let Some(m) = &self.metrics {
                m.add_requests_received(batch.len() as u64);
                m.inc_batches_processed();
            }

            let requests: Vec<Vec<u8>> = batch.iter().map(|(buf, _)| buf.clone()).collect();
            let responses = respond_batch(&requests, &self.certs, &self.config, now);

            for ((request, peer), response) in batch.into_iter().zip(responses) {
                match response {
                    // A reply must never out-size the query it answers.
                    Some(response) if response.len() <= request.len() => {
                        let _ = self.sock.send_to(&response, peer).await;
                        if let Some(m) = &self.metrics {
                            m.inc_responses_sent();
                        }
                    }
                    Some(_) => {
                        debug!("suppressed oversized response to {peer}");
                        if let Some(m) = &self.metrics {
                            m.inc_requests_dropped();
                        }
                    }
                    None => {
                        debug!("dropped unanswerable request from {peer}");
                        if let Some(m) = &self.metrics {
                            m.inc_requests_dropped();
                        }
                    }
                }
            }
        }
    }
}
