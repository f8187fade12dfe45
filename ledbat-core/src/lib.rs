// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod config;
mod delay_history;
mod delay_tracker;
pub mod error;
pub mod ledbat;
mod remote_clock;
pub mod transport;

pub use config::{Config, SlowStartMode, Tunables};
pub use error::Error;
pub use ledbat::{Endpoint, Ledbat};
pub use transport::{NoopPublisher, Publisher, Transport};

/// The ASCII name under which the host selects this algorithm per socket
pub const NAME: &str = "ledbat";
