// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::fmt;

/// Errors reported to the host when a flow cannot use the controller
///
/// All of these occur at flow init or parameter-set time; the data path
/// absorbs degenerate inputs through the controller's validity flags instead
/// of surfacing errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// Backing storage for a delay history could not be allocated
    AllocFailed,
    /// A configuration value is outside its accepted range
    BadConfig(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AllocFailed => write!(f, "delay history allocation failed"),
            Self::BadConfig(reason) => write!(f, "invalid configuration: {reason}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
