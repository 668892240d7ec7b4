// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Lock-free server metrics using atomic counters.
//!
//! All counters use relaxed ordering on the hot path; snapshots are
//! approximate when read concurrently.

use std::sync::atomic::{AtomicU64, Ordering};

/// Runtime server metrics, updated atomically on every datagram.
///
/// Create an instance, wrap it in `Arc`, and pass it to
/// [`RoughtimeServerBuilder::metrics`](crate::server::RoughtimeServerBuilder::metrics);
/// read it from any other task via [`ServerMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct ServerMetrics {
    /// Datagrams received (valid and invalid).
    pub requests_received: AtomicU64,
    /// Responses sent.
    pub responses_sent: AtomicU64,
    /// Datagrams that produced no response (parse failure, policy floor,
    /// unbatchable version, internal error).
    pub requests_dropped: AtomicU64,
    /// Batches processed.
    pub batches_processed: AtomicU64,
    /// Online certificate sets minted (including the initial one).
    pub certs_minted: AtomicU64,
}

impl ServerMetrics {
    /// Create a metrics instance with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            responses_sent: self.responses_sent.load(Ordering::Relaxed),
            requests_dropped: self.requests_dropped.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            certs_minted: self.certs_minted.load(Ordering::Relaxed),
        }
    }

    #[inline]
    pub(crate) fn add_requests_received(&self, n: u64) {
        self.requests_received.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_responses_sent(&self) {
        self.responses_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_requests_dropped(&self) {
        self.requests_dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_batches_processed(&self) {
        self.batches_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_certs_minted(&self) {
        self.certs_minted.fetch_add(1, Ordering::Relaxed);
    }
}

/// A copyable snapshot of [`ServerMetrics`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MetricsSnapshot {
    /// Datagrams received.
    pub requests_received: u64,
    /// Responses sent.
    pub responses_sent: u64,
    /// Datagrams that produced no response.
    pub requests_dropped: u64,
    /// Batches processed.
    pub batches_processed: u64,
    /// Online certificate sets minted.
    pub certs_minted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zero() {
        let snap = ServerMetrics::new().snapshot();
        assert_eq!(snap, MetricsSnapshot::default());
    }

    #[test]
    fn test_increments() {
        let m = ServerMetrics::new();
        m.add_requests_received(3);
        m.inc_responses_sent();
        m.inc_requests_dropped();
        m.inc_batches_processed();
        m.inc_certs_minted();
        let snap = m.snapshot();
        assert_eq!(snap.requests_received, 3);
        assert_eq!(snap.responses_sent, 1);
        assert_eq!(snap.requests_dropped, 1);
        assert_eq!(snap.batches_processed, 1);
        assert_eq!(snap.certs_minted, 1);
    }
}
