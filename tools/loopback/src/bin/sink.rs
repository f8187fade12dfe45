// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use std::{
    io::Read,
    net::{TcpListener, TcpStream},
    thread,
};

const BLOCK_SIZE: usize = 8192;

/// Accepts loopback connections and drains them
#[derive(Debug, Parser)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 5001)]
    port: u16,
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();
    let listener = TcpListener::bind(("0.0.0.0", args.port))?;

    for stream in listener.incoming() {
        let stream = stream?;
        thread::spawn(move || {
            if let Err(error) = drain(stream) {
                eprintln!("receive failed: {error}");
            }
        });
    }

    Ok(())
}

fn drain(mut stream: TcpStream) -> std::io::Result<()> {
    let mut buffer = [0u8; BLOCK_SIZE];
    loop {
        if stream.read(&mut buffer)? == 0 {
            return Ok(());
        }
    }
}
