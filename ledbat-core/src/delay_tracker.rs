// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

use crate::{config::Config, delay_history::DelayHistory, error::Error};

/// Width of one base-history bucket, in seconds
const BUCKET_SECS: u32 = 60;

/// The twin delay histories behind the controller's delay estimates
///
/// The noise filter keeps the most recent samples; its minimum is the
/// current-delay estimate. The base history is bucketed by time: within a
/// bucket only the minimum observed sample is kept, and when a bucket's
/// minute is over the next sample opens a new bucket, evicting the oldest.
/// The minimum across buckets is the base-delay estimate, approximating the
/// path's propagation delay over the last `base_history_len` minutes.
#[derive(Clone, Debug)]
pub(crate) struct DelayTracker {
    noise_filter: DelayHistory,
    base_history: DelayHistory,
    /// Host tick at which the current bucket opened; zero before the first sample
    last_rollover: u32,
    bucket_ticks: u32,
}

impl DelayTracker {
    pub fn new(config: &Config) -> Result<Self, Error> {
        Ok(Self {
            noise_filter: DelayHistory::new(usize::from(config.noise_filter_len()) + 1)?,
            base_history: DelayHistory::new(usize::from(config.base_history_len()) + 1)?,
            last_rollover: 0,
            bucket_ticks: BUCKET_SECS.saturating_mul(config.hz()),
        })
    }

    /// Anchors the first bucket to the first tick the flow was observed on
    #[inline]
    pub fn anchor(&mut self, now: u32) {
        if self.last_rollover == 0 {
            self.last_rollover = now;
        }
    }

    /// Folds a valid one-way delay sample into both histories
    pub fn record(&mut self, now: u32, owd: u32) {
        self.noise_filter.push(owd);

        if self.base_history.is_empty() {
            self.base_history.push(owd);
        } else if now.wrapping_sub(self.last_rollover) > self.bucket_ticks {
            // the minute is over; open a new bucket
            self.last_rollover = now;
            self.base_history.push(owd);
        } else {
            self.base_history.lower_latest(owd);
        }
    }

    /// Minimum over the recent sample window
    #[inline]
    pub fn current_delay(&self) -> u32 {
        self.noise_filter.min_delay()
    }

    /// Minimum over the retained buckets
    #[inline]
    pub fn base_delay(&self) -> u32 {
        self.base_history.min_delay()
    }
}
