// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Roughtime client for authenticated coarse time.
//!
//! Builds a padded request, sends it over UDP with per-attempt timeouts and
//! retries, and runs the full validation pipeline over the response: Merkle
//! proof, delegation certificate, response signature, and the delegation
//! time window.
//!
//! # Sync API
//!
//! ```no_run
//! let pk = roughtime_client::decode_public_key(
//!     "0GD7c3yP8xEc4Zl2zeuN2SlLvDVVocjsPSL8/Rl/7zg=",
//! ).unwrap();
//! let time = roughtime_client::request("roughtime.cloudflare.com:2003", &pk).unwrap();
//! println!("{} seconds since epoch (±{}s)",
//!     time.midpoint_seconds(), time.radius_seconds());
//! ```
//!
//! # Async API (tokio)
//!
//! ```no_run
//! # async fn example() -> std::io::Result<()> {
//! let pk = roughtime_client::decode_public_key(
//!     "0GD7c3yP8xEc4Zl2zeuN2SlLvDVVocjsPSL8/Rl/7zg=",
//! )?;
//! let time = roughtime_client::async_request("roughtime.cloudflare.com:2003", &pk).await?;
//! println!("{} seconds since epoch", time.midpoint_seconds());
//! # Ok(())
//! # }
//! ```
//!
//! Errors are reported as [`std::io::Error`]; validation failures wrap a
//! [`roughtime_proto::RoughtimeError`] reachable via `io::Error::get_ref()`.

#![warn(missing_docs)]

pub mod client;

pub use client::{
    async_request, async_request_with_options, async_send_request, build_chained_request,
    decode_public_key, request, request_with_options, send_request, ClientOptions,
};
pub use roughtime_proto::request::RequestOptions;
pub use roughtime_proto::VerifiedTime;
