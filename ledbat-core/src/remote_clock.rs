// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

/// Sub-tick units per second carried by a one-way delay sample
pub(crate) const OWD_RESOLUTION: u32 = 1000;

/// Estimator for the peer's timestamp-clock tick rate
///
/// The peer's timestamp frequency is unknown, so it is inferred from the
/// ratio between consecutive peer timestamps and the echoed local timestamps
/// they arrived with, then smoothed with a 63/64 + 1/64 exponential average.
/// The smoothing runs in a fixed-point domain carrying six fractional bits.
///
/// The reference pair is refreshed on every call, including calls that
/// cannot produce a measurement (missing references or no delta to divide
/// by), so the next acknowledgement always measures against the most recent
/// echo.
#[derive(Clone, Debug, Default)]
pub(crate) struct RemoteClock {
    remote_hz: u32,
    remote_ref_time: u32,
    local_ref_time: u32,
}

impl RemoteClock {
    /// Folds a timestamp echo into the smoothed tick-rate estimate
    ///
    /// Returns the updated estimate in ticks per second; zero means no
    /// usable estimate exists yet.
    pub fn update(&mut self, tsval: u32, tsecr: u32, hz: u32) -> u32 {
        let mut rhz = i64::from(self.remote_hz) << 6;

        if self.remote_ref_time != 0
            && self.local_ref_time != 0
            && tsval != self.remote_ref_time
            && tsecr != self.local_ref_time
        {
            // Timestamps are near-monotone; a wrapped 32-bit difference is a
            // small signed delta.
            let remote_delta = i64::from(tsval.wrapping_sub(self.remote_ref_time) as i32);
            let local_delta = i64::from(tsecr.wrapping_sub(self.local_ref_time) as i32);
            let mut m = (i64::from(hz) * remote_delta / local_delta).abs();

            if rhz > 0 {
                // 63/64 old + 1/64 new
                m -= rhz >> 6;
                rhz += m;
            } else {
                rhz = m << 6;
            }
        }

        self.remote_ref_time = tsval;
        self.local_ref_time = tsecr;
        self.remote_hz = (rhz >> 6) as u32;
        self.remote_hz
    }

    /// Derives a one-way delay sample from a timestamp echo
    ///
    /// Each timestamp is normalized into [`OWD_RESOLUTION`] units per second
    /// before the subtraction, so the result is relative rather than
    /// absolute; its floor over many samples sits a constant offset above
    /// the propagation delay, which the base-delay tracker removes.
    pub fn owd(&self, tsval: u32, tsecr: u32, hz: u32) -> u32 {
        debug_assert!(self.remote_hz > 0);
        debug_assert!(hz > 0);

        let owd = i64::from(tsval) * i64::from(OWD_RESOLUTION / self.remote_hz)
            - i64::from(tsecr) * i64::from(OWD_RESOLUTION / hz);
        owd.unsigned_abs() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bolero::{check, generator::*};

    const HZ: u32 = 1000;

    #[test]
    fn first_echo_only_stores_references() {
        let mut clock = RemoteClock::default();
        assert_eq!(clock.update(1000, 500, HZ), 0);
        assert_eq!(clock.remote_ref_time, 1000);
        assert_eq!(clock.local_ref_time, 500);
        assert_eq!(clock.remote_hz, 0);
    }

    #[test]
    fn second_echo_computes_rate_and_owd() {
        let mut clock = RemoteClock::default();
        clock.update(1000, 500, HZ);

        // m = 1000 * (2000 - 1000) / (1500 - 500) = 1000
        assert_eq!(clock.update(2000, 1500, HZ), 1000);
        assert_eq!(clock.owd(2000, 1500, HZ), 500);
    }

    #[test]
    fn repeated_timestamps_skip_the_measurement() {
        let mut clock = RemoteClock::default();
        clock.update(1000, 500, HZ);
        clock.update(2000, 1500, HZ);

        // no peer delta: the estimate survives, the references move
        assert_eq!(clock.update(2000, 1600, HZ), 1000);
        assert_eq!(clock.remote_ref_time, 2000);
        assert_eq!(clock.local_ref_time, 1600);

        // no local delta either
        assert_eq!(clock.update(2500, 1600, HZ), 1000);
        assert_eq!(clock.local_ref_time, 1600);
    }

    #[test]
    fn estimate_is_smoothed() {
        let mut clock = RemoteClock::default();
        clock.update(1000, 500, HZ);
        clock.update(2000, 1500, HZ);

        // a doubled instantaneous rate moves the estimate by 1/64:
        // rhz = 64000 + (2000 - 1000) = 65000 -> 65000 >> 6 = 1015
        assert_eq!(clock.update(4000, 2500, HZ), 1015);
    }

    #[test]
    fn steady_rate_is_a_fixed_point() {
        let mut clock = RemoteClock::default();
        clock.update(1000, 500, HZ);
        for ack in 1..50u32 {
            let estimate = clock.update(1000 + ack * 1000, 500 + ack * 1000, HZ);
            assert_eq!(estimate, 1000);
        }
    }

    #[test]
    fn reversed_clock_direction_is_tolerated() {
        let mut clock = RemoteClock::default();
        clock.update(5000, 500, HZ);

        // the peer timestamp runs backwards; the magnitude still measures
        assert_eq!(clock.update(4000, 1500, HZ), 1000);
    }

    #[test]
    fn wrapping_timestamps_measure_the_small_delta() {
        let mut clock = RemoteClock::default();
        clock.update(u32::MAX - 499, 500, HZ);

        // the peer timestamp wraps through zero between samples
        assert_eq!(clock.update(500, 1500, HZ), 1000);
    }

    /// Identical inputs against identical prior state produce identical
    /// estimates.
    #[test]
    fn estimator_is_deterministic() {
        check!()
            .with_generator(produce::<Vec<(u32, u32)>>())
            .for_each(|echoes| {
                let mut a = RemoteClock::default();
                let mut b = RemoteClock::default();
                for &(tsval, tsecr) in echoes {
                    assert_eq!(a.update(tsval, tsecr, HZ), b.update(tsval, tsecr, HZ));
                    assert_eq!(a.remote_hz, b.remote_hz);
                }
            });
    }

    #[test]
    fn owd_uses_integer_resolution_factors() {
        let mut clock = RemoteClock::default();
        clock.update(100, 500, 100);
        clock.update(200, 600, 100);
        assert_eq!(clock.remote_hz, 100);

        // remote factor 1000/100 = 10, local factor 1000/100 = 10
        assert_eq!(clock.owd(200, 150, 100), 500);
    }
}
