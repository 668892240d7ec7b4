// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime server: online-certificate minting, the single/batch respond
//! pipelines, and a tokio UDP loop.
//!
//! The pipelines in [`pipeline`] are pure functions over a parsed batch and
//! a certificate set, so they can be unit-tested and benchmarked without a
//! socket; [`server::RoughtimeServer`] is the thin loop that feeds them.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() -> std::io::Result<()> {
//! use roughtime_server::server::RoughtimeServer;
//!
//! let server = RoughtimeServer::builder()
//!     .listen("[::]:2002")
//!     .build()
//!     .await?;
//!
//! println!("long-term public key: {:02x?}", server.public_key());
//! server.run().await
//! # }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod keys;
pub mod metrics;
pub mod pipeline;
pub mod server;

pub use error::ServerError;
pub use keys::OnlineCertSet;
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use pipeline::{respond_batch, respond_single, ResponderConfig};
pub use server::RoughtimeServer;

/// Current Unix time in microseconds, the pipeline's clock input.
pub(crate) fn now_micros() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
