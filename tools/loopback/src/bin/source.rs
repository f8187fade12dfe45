// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use std::{
    io::Write,
    net::TcpStream,
    time::{Duration, Instant},
};

const BLOCK_SIZE: usize = 8192;

/// Streams fixed-size blocks to a loopback sink over a ledbat TCP flow
#[derive(Debug, Parser)]
struct Args {
    /// Port to connect to
    #[arg(short, long, default_value_t = 5001)]
    port: u16,

    /// Stop after sending at least this many bytes
    #[arg(short, long)]
    count: Option<u64>,

    /// Stop after this many seconds
    #[arg(short = 't', long)]
    duration: Option<u64>,

    /// Host to connect to
    host: String,
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();

    let mut stream = TcpStream::connect((args.host.as_str(), args.port))?;
    set_congestion_control(&stream)?;

    let deadline = args
        .duration
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let block = [1u8; BLOCK_SIZE];
    let mut sent = 0u64;

    loop {
        stream.write_all(&block)?;
        sent += BLOCK_SIZE as u64;

        if args.count.is_some_and(|count| sent > count) {
            break;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            eprintln!("exiting after duration");
            break;
        }
    }

    Ok(())
}

/// Selects the ledbat congestion control algorithm for the socket
#[cfg(target_os = "linux")]
fn set_congestion_control(stream: &TcpStream) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    let name = ledbat_core::NAME.as_bytes();
    let result = unsafe {
        libc::setsockopt(
            stream.as_raw_fd(),
            libc::IPPROTO_TCP,
            libc::TCP_CONGESTION,
            name.as_ptr() as *const libc::c_void,
            name.len() as libc::socklen_t,
        )
    };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn set_congestion_control(_stream: &TcpStream) -> std::io::Result<()> {
    Ok(())
}
