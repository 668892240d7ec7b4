// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Example Roughtime server.
//!
//! Run with: `cargo run --example server`

use roughtime_server::server::RoughtimeServer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let server = RoughtimeServer::builder().listen("[::]:2002").build().await?;

    let key = server.public_key();
    println!("roughtime server listening on {}", server.local_addr()?);
    print!("long-term public key: ");
    for b in key {
        print!("{b:02x}");
    }
    println!();

    server.run().await
}
