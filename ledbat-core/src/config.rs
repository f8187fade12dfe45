// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::error::Error;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Immutable per-flow configuration snapshot
///
/// The history lengths and the host tick rate are captured when a flow is
/// initialized; changing them later only affects newly initialized flows.
/// Hot-path parameters live in [`Tunables`] instead and apply immediately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    base_history_len: u16,
    noise_filter_len: u16,
    hz: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_history_len: Self::DEFAULT_BASE_HISTORY_LEN,
            noise_filter_len: Self::DEFAULT_NOISE_FILTER_LEN,
            hz: Self::DEFAULT_HZ,
        }
    }
}

impl Config {
    /// Number of one-minute base-delay buckets retained
    pub const DEFAULT_BASE_HISTORY_LEN: u16 = 10;
    /// Number of recent one-way delay samples retained
    pub const DEFAULT_NOISE_FILTER_LEN: u16 = 4;
    /// Host tick rate, in ticks per second
    pub const DEFAULT_HZ: u32 = 1000;

    /// Sets the number of one-minute buckets the base-delay tracker spans
    pub fn with_base_history_len(mut self, len: u16) -> Result<Self, Error> {
        if len == 0 {
            return Err(Error::BadConfig("base history length must be at least 1"));
        }
        self.base_history_len = len;
        Ok(self)
    }

    /// Sets the number of recent samples the noise filter retains
    pub fn with_noise_filter_len(mut self, len: u16) -> Result<Self, Error> {
        if len == 0 {
            return Err(Error::BadConfig("noise filter length must be at least 1"));
        }
        self.noise_filter_len = len;
        Ok(self)
    }

    /// Sets the host tick rate
    pub fn with_hz(mut self, hz: u32) -> Result<Self, Error> {
        if hz == 0 {
            return Err(Error::BadConfig("host tick rate must be at least 1"));
        }
        self.hz = hz;
        Ok(self)
    }

    #[inline]
    pub fn base_history_len(&self) -> u16 {
        self.base_history_len
    }

    #[inline]
    pub fn noise_filter_len(&self) -> u16 {
        self.noise_filter_len
    }

    #[inline]
    pub fn hz(&self) -> u32 {
        self.hz
    }

    /// Converts a duration in microseconds into host ticks, rounding down
    #[inline]
    pub(crate) fn ticks_from_us(&self, us: u32) -> u32 {
        (u64::from(us) * u64::from(self.hz) / 1_000_000) as u32
    }
}

/// Slow-start behavior of the window controller
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlowStartMode {
    /// Never slow start; every window update is a congestion-avoidance step
    #[default]
    Off = 0,
    /// Slow start up to the host's slow start threshold
    HostThreshold = 1,
    /// Slow start up to the fixed threshold configured in [`Tunables`]
    FixedThreshold = 2,
}

impl SlowStartMode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::HostThreshold,
            2 => Self::FixedThreshold,
            _ => Self::Off,
        }
    }
}

/// Hot-path parameters, shared by every flow built from one [`Endpoint`]
///
/// All fields are read on each use with relaxed loads so runtime changes take
/// effect on the next window update of every live flow.
///
/// [`Endpoint`]: crate::ledbat::Endpoint
#[derive(Debug)]
pub struct Tunables {
    target: AtomicU32,
    gain_num: AtomicU32,
    gain_den: AtomicU32,
    do_ss: AtomicU8,
    ssthresh: AtomicU32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self::new()
    }
}

impl Tunables {
    /// Target extra queuing delay, in delay units
    pub const DEFAULT_TARGET: u32 = 100;
    /// Fixed slow start threshold used by [`SlowStartMode::FixedThreshold`]
    pub const DEFAULT_SSTHRESH: u32 = 0xffff;

    pub const fn new() -> Self {
        Self {
            target: AtomicU32::new(Self::DEFAULT_TARGET),
            gain_num: AtomicU32::new(1),
            gain_den: AtomicU32::new(1),
            do_ss: AtomicU8::new(SlowStartMode::Off as u8),
            ssthresh: AtomicU32::new(Self::DEFAULT_SSTHRESH),
        }
    }

    #[inline]
    pub fn target(&self) -> u32 {
        self.target.load(Ordering::Relaxed)
    }

    pub fn set_target(&self, target: u32) {
        self.target.store(target, Ordering::Relaxed);
    }

    /// Multiplicative scale applied to the delay offset, as `(num, den)`
    #[inline]
    pub fn gain(&self) -> (u32, u32) {
        (
            self.gain_num.load(Ordering::Relaxed),
            self.gain_den.load(Ordering::Relaxed),
        )
    }

    pub fn set_gain(&self, num: u32, den: u32) -> Result<(), Error> {
        if den == 0 {
            return Err(Error::BadConfig("gain denominator must be nonzero"));
        }
        self.gain_num.store(num, Ordering::Relaxed);
        self.gain_den.store(den, Ordering::Relaxed);
        Ok(())
    }

    #[inline]
    pub fn slow_start_mode(&self) -> SlowStartMode {
        SlowStartMode::from_u8(self.do_ss.load(Ordering::Relaxed))
    }

    pub fn set_slow_start_mode(&self, mode: SlowStartMode) {
        self.do_ss.store(mode as u8, Ordering::Relaxed);
    }

    #[inline]
    pub fn ssthresh(&self) -> u32 {
        self.ssthresh.load(Ordering::Relaxed)
    }

    pub fn set_ssthresh(&self, ssthresh: u32) {
        self.ssthresh.store(ssthresh, Ordering::Relaxed);
    }
}
