// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use core::cmp::{max, min};

/// Host transport surface the controller reads and drives
///
/// The host owns sequence numbers, retransmissions, timers and the actual
/// congestion window; the controller only observes the fields below and
/// adjusts the window through [`set_snd_cwnd`]. All units follow the host:
/// windows are in segments, timestamps in the host's tick domain.
///
/// [`set_snd_cwnd`]: Transport::set_snd_cwnd
pub trait Transport {
    /// Congestion window, in segments
    fn snd_cwnd(&self) -> u32;

    fn set_snd_cwnd(&mut self, cwnd: u32);

    /// Upper bound the host places on the congestion window
    fn snd_cwnd_clamp(&self) -> u32;

    /// Host slow start threshold, in segments
    fn snd_ssthresh(&self) -> u32;

    /// Smoothed RTT in microseconds, carrying three fractional bits
    fn srtt_us(&self) -> u32;

    /// Peer timestamp carried by the most recent acknowledgement
    fn rcv_tsval(&self) -> u32;

    /// Echoed local timestamp carried by the most recent acknowledgement
    fn rcv_tsecr(&self) -> u32;

    /// True when the flow is limited by the congestion window rather than
    /// by the application
    fn is_cwnd_limited(&self) -> bool;

    /// Standard TCP slow start: grow the window by the acked count, up to
    /// the slow start threshold. Returns the acked count left unconsumed.
    fn slow_start(&mut self, acked: u32) -> u32 {
        let cwnd = min(
            self.snd_cwnd().saturating_add(acked),
            self.snd_ssthresh(),
        );
        let residual = acked.saturating_sub(cwnd.saturating_sub(self.snd_cwnd()));
        self.set_snd_cwnd(min(cwnd, self.snd_cwnd_clamp()));
        residual
    }

    /// Reno slow start threshold: half the window, floor of two segments
    fn reno_ssthresh(&self) -> u32 {
        max(self.snd_cwnd() >> 1, 2)
    }
}

/// Observer for controller events
pub trait Publisher {
    /// Invoked when a valid one-way delay sample has been recorded
    fn on_delay_sampled(&mut self, owd: u32, current_delay: u32, base_delay: u32);

    /// Invoked after every congestion-avoidance window update
    fn on_window_updated(&mut self, congestion_window: u32, accumulator: u32);

    /// Invoked when the controller leaves the slow start phase
    fn on_slow_start_exited(&mut self, congestion_window: u32);

    /// Invoked when an idle gap on the flow resets the congestion window
    fn on_idle_reset(&mut self, idle_ticks: u32);
}

/// Discards every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    #[inline]
    fn on_delay_sampled(&mut self, _owd: u32, _current_delay: u32, _base_delay: u32) {}

    #[inline]
    fn on_window_updated(&mut self, _congestion_window: u32, _accumulator: u32) {}

    #[inline]
    fn on_slow_start_exited(&mut self, _congestion_window: u32) {}

    #[inline]
    fn on_idle_reset(&mut self, _idle_ticks: u32) {}
}

#[cfg(feature = "event-tracing")]
pub mod tracing {
    /// Emits controller events through the `tracing` crate
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Publisher;

    impl super::Publisher for Publisher {
        #[inline]
        fn on_delay_sampled(&mut self, owd: u32, current_delay: u32, base_delay: u32) {
            ::tracing::trace!(owd, current_delay, base_delay, "delay sampled");
        }

        #[inline]
        fn on_window_updated(&mut self, congestion_window: u32, accumulator: u32) {
            ::tracing::debug!(congestion_window, accumulator, "window updated");
        }

        #[inline]
        fn on_slow_start_exited(&mut self, congestion_window: u32) {
            ::tracing::debug!(congestion_window, "slow start exited");
        }

        #[inline]
        fn on_idle_reset(&mut self, idle_ticks: u32) {
            ::tracing::debug!(idle_ticks, "idle reset");
        }
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use alloc::vec::Vec;

    /// In-memory host socket for driving the controller in tests
    #[derive(Clone, Copy, Debug)]
    pub struct Transport {
        pub snd_cwnd: u32,
        pub snd_cwnd_clamp: u32,
        pub snd_ssthresh: u32,
        pub srtt_us: u32,
        pub rcv_tsval: u32,
        pub rcv_tsecr: u32,
        pub cwnd_limited: bool,
    }

    impl Default for Transport {
        fn default() -> Self {
            Self {
                snd_cwnd: 10,
                snd_cwnd_clamp: u32::MAX,
                snd_ssthresh: 0x7fff_ffff,
                // smoothed 100ms, in the host's << 3 fixed point
                srtt_us: 100_000 << 3,
                rcv_tsval: 0,
                rcv_tsecr: 0,
                cwnd_limited: true,
            }
        }
    }

    impl super::Transport for Transport {
        fn snd_cwnd(&self) -> u32 {
            self.snd_cwnd
        }

        fn set_snd_cwnd(&mut self, cwnd: u32) {
            self.snd_cwnd = cwnd;
        }

        fn snd_cwnd_clamp(&self) -> u32 {
            self.snd_cwnd_clamp
        }

        fn snd_ssthresh(&self) -> u32 {
            self.snd_ssthresh
        }

        fn srtt_us(&self) -> u32 {
            self.srtt_us
        }

        fn rcv_tsval(&self) -> u32 {
            self.rcv_tsval
        }

        fn rcv_tsecr(&self) -> u32 {
            self.rcv_tsecr
        }

        fn is_cwnd_limited(&self) -> bool {
            self.cwnd_limited
        }
    }

    /// Records every event for assertions
    #[derive(Clone, Debug, Default)]
    pub struct Publisher {
        pub delay_samples: Vec<(u32, u32, u32)>,
        pub window_updates: Vec<(u32, u32)>,
        pub slow_start_exits: Vec<u32>,
        pub idle_resets: Vec<u32>,
    }

    impl super::Publisher for Publisher {
        fn on_delay_sampled(&mut self, owd: u32, current_delay: u32, base_delay: u32) {
            self.delay_samples.push((owd, current_delay, base_delay));
        }

        fn on_window_updated(&mut self, congestion_window: u32, accumulator: u32) {
            self.window_updates.push((congestion_window, accumulator));
        }

        fn on_slow_start_exited(&mut self, congestion_window: u32) {
            self.slow_start_exits.push(congestion_window);
        }

        fn on_idle_reset(&mut self, idle_ticks: u32) {
            self.idle_resets.push(idle_ticks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{testing, Transport as _};

    #[test]
    fn slow_start_consumes_acked_up_to_ssthresh() {
        let mut transport = testing::Transport {
            snd_cwnd: 10,
            snd_ssthresh: 16,
            ..Default::default()
        };

        // fully consumed below the threshold
        assert_eq!(transport.slow_start(2), 0);
        assert_eq!(transport.snd_cwnd, 12);

        // partially consumed across the threshold
        assert_eq!(transport.slow_start(10), 6);
        assert_eq!(transport.snd_cwnd, 16);

        // nothing to consume at the threshold
        assert_eq!(transport.slow_start(3), 3);
        assert_eq!(transport.snd_cwnd, 16);
    }

    #[test]
    fn slow_start_respects_the_clamp() {
        let mut transport = testing::Transport {
            snd_cwnd: 10,
            snd_ssthresh: 100,
            snd_cwnd_clamp: 12,
            ..Default::default()
        };

        assert_eq!(transport.slow_start(5), 0);
        assert_eq!(transport.snd_cwnd, 12);
    }

    #[test]
    fn reno_ssthresh_halves_with_a_floor() {
        let mut transport = testing::Transport::default();
        transport.snd_cwnd = 10;
        assert_eq!(transport.reno_ssthresh(), 5);

        transport.snd_cwnd = 3;
        assert_eq!(transport.reno_ssthresh(), 2);

        transport.snd_cwnd = 1;
        assert_eq!(transport.reno_ssthresh(), 2);
    }
}
