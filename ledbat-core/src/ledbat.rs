// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{
    config::{Config, SlowStartMode, Tunables},
    delay_tracker::DelayTracker,
    error::Error,
    remote_clock::RemoteClock,
    transport::{Publisher, Transport},
};
use alloc::sync::Arc;

/// A congestion controller implementing LEDBAT (Low Extra Delay Background
/// Transport) as described in draft-shalunov-ledbat-congestion-00, derived
/// from the TCP-LP approach of estimating one-way delay from timestamp
/// echoes.
///
/// The controller keeps a long-horizon minimum of the one-way delay as an
/// estimate of the path's propagation delay and drives the congestion window
/// so that the delay it adds on top stays at a small configured target,
/// yielding to loss-based senders while still progressing on an idle path.
///
/// One instance holds the state of one flow. The host serializes all calls
/// for a flow; nothing here blocks or allocates outside of [`new`]. Dropping
/// the instance releases the history storage.
///
/// [`new`]: Ledbat::new
#[derive(Clone, Debug)]
pub struct Ledbat {
    remote_clock: RemoteClock,
    delay: DelayTracker,
    /// Fractional extension of the congestion window, in `cwnd * target` units
    cwnd_cnt: u32,
    /// Host tick of the most recent acknowledgement; zero before the first
    last_ack: u32,
    flags: Flags,
    config: Config,
    tunables: Arc<Tunables>,
}

/// Validity predicates of the controller's delay signal
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Flags {
    /// the smoothed remote tick-rate estimate is usable
    valid_rhz: bool,
    /// the most recent one-way delay sample was strictly positive
    valid_owd: bool,
    /// slow start may run on the next window update
    can_slow_start: bool,
}

impl Ledbat {
    /// Creates the controller state for one flow
    ///
    /// The length parameters in `config` are fixed for the lifetime of the
    /// flow; the `tunables` are shared and read on every update.
    pub fn new(config: Config, tunables: Arc<Tunables>) -> Result<Self, Error> {
        let delay = DelayTracker::new(&config)?;
        let can_slow_start = tunables.slow_start_mode() != SlowStartMode::Off;
        Ok(Self {
            remote_clock: RemoteClock::default(),
            delay,
            cwnd_cnt: 0,
            last_ack: 0,
            flags: Flags {
                can_slow_start,
                ..Default::default()
            },
            config,
            tunables,
        })
    }

    /// Processes one acknowledgement sample
    ///
    /// `now` is the host's monotonic tick; `rtt_us` is the RTT measurement
    /// the host attached to the acknowledgement, discarded unless positive.
    /// Derives a one-way delay sample from the timestamp echo, folds it into
    /// the delay histories, and restarts the window if the flow sat idle for
    /// longer than the smoothed RTT.
    pub fn on_ack_sample<T: Transport, Pub: Publisher>(
        &mut self,
        transport: &mut T,
        now: u32,
        rtt_us: i32,
        publisher: &mut Pub,
    ) {
        if rtt_us <= 0 {
            return;
        }

        self.delay.anchor(now);

        let tsval = transport.rcv_tsval();
        let tsecr = transport.rcv_tsecr();
        let hz = self.config.hz();

        let remote_hz = self.remote_clock.update(tsval, tsecr, hz);
        self.flags.valid_rhz = remote_hz > 0;

        let owd = if self.flags.valid_rhz {
            self.remote_clock.owd(tsval, tsecr, hz)
        } else {
            0
        };
        self.flags.valid_owd = owd > 0;

        if !self.flags.valid_rhz || !self.flags.valid_owd {
            return;
        }

        self.delay.record(now, owd);
        publisher.on_delay_sampled(owd, self.delay.current_delay(), self.delay.base_delay());

        if self.last_ack != 0 {
            let idle = now.wrapping_sub(self.last_ack);
            if idle > self.config.ticks_from_us(transport.srtt_us() >> 3) {
                // the flow sat idle; force a fresh startup
                transport.set_snd_cwnd(1);
                publisher.on_idle_reset(idle);
            }
        }
        self.last_ack = now;
    }

    /// Runs one congestion-avoidance step
    ///
    /// Grows the window by one segment once the fractional accumulator
    /// overflows `cwnd * target`, shrinks it by one when the accumulator
    /// goes negative, and optionally slow starts below the threshold. Does
    /// nothing without a valid delay signal or while the application, not
    /// the window, limits the flow.
    pub fn on_cong_avoid<T: Transport, Pub: Publisher>(
        &mut self,
        transport: &mut T,
        _ack: u32,
        mut acked: u32,
        publisher: &mut Pub,
    ) {
        if !self.flags.valid_owd {
            return;
        }

        if !transport.is_cwnd_limited() {
            return;
        }

        if transport.snd_cwnd() <= 1 {
            self.flags.can_slow_start = true;
        }

        let mode = self.tunables.slow_start_mode();
        if mode != SlowStartMode::Off && self.flags.can_slow_start {
            let ssthresh = match mode {
                SlowStartMode::FixedThreshold => self.tunables.ssthresh(),
                _ => transport.snd_ssthresh(),
            };
            if transport.snd_cwnd() <= ssthresh {
                acked = transport.slow_start(acked);
                if acked == 0 {
                    return;
                }
            }
        }
        if self.flags.can_slow_start {
            self.flags.can_slow_start = false;
            publisher.on_slow_start_exited(transport.snd_cwnd());
        }

        let target = self.tunables.target();
        let current_delay = i64::from(self.delay.current_delay());
        let base_delay = i64::from(self.delay.base_delay());
        let queue_delay = current_delay - base_delay;

        let mut offset = i64::from(target) - queue_delay;
        let (gain_num, gain_den) = self.tunables.gain();
        offset = offset * i64::from(gain_num) / i64::from(gain_den);

        // do not ramp faster than one segment per window of acks
        offset = offset.min(i64::from(target));

        let cwnd_cnt = i64::from(self.cwnd_cnt) + offset;
        if cwnd_cnt >= 0 {
            self.cwnd_cnt = cwnd_cnt as u32;
            if u64::from(self.cwnd_cnt) >= u64::from(transport.snd_cwnd()) * u64::from(target) {
                if transport.snd_cwnd() < transport.snd_cwnd_clamp() {
                    transport.set_snd_cwnd(transport.snd_cwnd() + 1);
                }
                self.cwnd_cnt = 0;
            }
        } else if transport.snd_cwnd() > 1 {
            let cwnd = transport.snd_cwnd() - 1;
            transport.set_snd_cwnd(cwnd);
            // snap the accumulator near the top of its range so one deep
            // excursion cannot trigger a second decrement immediately
            self.cwnd_cnt =
                (u64::from(cwnd - 1) * u64::from(target)).min(u64::from(u32::MAX)) as u32;
        } else {
            self.cwnd_cnt = 0;
        }

        publisher.on_window_updated(transport.snd_cwnd(), self.cwnd_cnt);
    }

    /// Slow start threshold the host should adopt after a loss event
    ///
    /// No LEDBAT-specific backoff is imposed; the delay response recovers
    /// from loss on its own.
    pub fn ssthresh<T: Transport>(&self, transport: &T) -> u32 {
        match self.tunables.slow_start_mode() {
            SlowStartMode::FixedThreshold => self.tunables.ssthresh(),
            _ => transport.reno_ssthresh(),
        }
    }
}

/// Builds per-flow [`Ledbat`] controllers around shared configuration
#[derive(Clone, Debug, Default)]
pub struct Endpoint {
    config: Config,
    tunables: Arc<Tunables>,
}

impl Endpoint {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tunables: Arc::new(Tunables::new()),
        }
    }

    /// Hot-path parameters shared by every flow built from this endpoint
    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the controller state for a newly opened flow
    pub fn new_controller(&self) -> Result<Ledbat, Error> {
        Ledbat::new(self.config, self.tunables.clone())
    }
}
