// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Fetch authenticated time from a public Roughtime server.
//!
//! Run with: `cargo run --example fetch_time -- <host:port> <base64-public-key>`
//!
//! Defaults to Cloudflare's server when no arguments are given.

fn main() -> std::io::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let addr = args
        .next()
        .unwrap_or_else(|| "roughtime.cloudflare.com:2003".to_string());
    let key_b64 = args
        .next()
        .unwrap_or_else(|| "0GD7c3yP8xEc4Zl2zeuN2SlLvDVVocjsPSL8/Rl/7zg=".to_string());

    let public_key = roughtime_client::decode_public_key(&key_b64)?;
    let time = roughtime_client::request(&addr, &public_key)?;

    println!(
        "{addr} ({}): {} seconds since epoch, ±{}s",
        time.version,
        time.midpoint_seconds(),
        time.radius_seconds()
    );
    Ok(())
}
