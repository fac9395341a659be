//! Processing bodies that turn a payload into [`Stats`].

use std::convert::Infallible;
use std::thread;
use std::time::Duration;

use crate::task::Stats;

/// Fixed cost of the synthetic workload, in seconds.
pub const BASE_DELAY_SECS: f64 = 0.5;

/// Synthetic cost per character, in seconds.
pub const PER_CHAR_DELAY_SECS: f64 = 0.1;

/// Computes the canonical stats of a payload without doing any work.
///
/// `processing_time` is the synthetic duration `0.5 + 0.1 * char_count`.
pub fn canonical(payload: &str) -> Stats {
    let char_count = payload.chars().count();
    Stats {
        char_count,
        word_count: payload.split_whitespace().count(),
        processing_time: synthetic_duration(char_count),
    }
}

/// The synthetic duration, in seconds, for a payload of `char_count` characters.
pub fn synthetic_duration(char_count: usize) -> f64 {
    BASE_DELAY_SECS + PER_CHAR_DELAY_SECS * char_count as f64
}

/// A workload that sleeps for the synthetic duration before reporting
/// canonical stats.
///
/// The reported `processing_time` is always the unscaled synthetic
/// duration, so results are reproducible whatever the scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticDelay {
    time_scale: f64,
}

impl SyntheticDelay {
    /// Sleeps `time_scale` times the synthetic duration.
    ///
    /// Negative or non-finite scales are treated as zero.
    pub fn new(time_scale: f64) -> Self {
        let time_scale = if time_scale.is_finite() && time_scale > 0.0 {
            time_scale
        } else {
            0.0
        };
        SyntheticDelay { time_scale }
    }

    /// The scale applied to the synthetic duration.
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Runs the workload for one payload.
    pub fn process(&self, payload: &str) -> Result<Stats, Infallible> {
        let stats = canonical(payload);
        let sleep = stats.processing_time * self.time_scale;
        if sleep > 0.0 {
            thread::sleep(Duration::from_secs_f64(sleep));
        }
        Ok(stats)
    }
}

impl Default for SyntheticDelay {
    fn default() -> Self {
        SyntheticDelay::new(1.0)
    }
}
