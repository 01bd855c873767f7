//! Time span configuration and the stepping clock derived from it.

use serde::{Deserialize, Serialize};

use super::error::ReconstructionError;

/// Tolerance added before truncating the step count, so spans that are an
/// exact multiple of the interval are not cut short by rounding.
const STEP_COUNT_EPSILON: f64 = 1e-6;

/// Requested reconstruction span in Ma.
///
/// `begin_time` may be older or younger than `end_time`. Reconstructing from
/// an older to a younger time runs forward in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub begin_time: f64,
    pub end_time: f64,
    /// Step magnitude in Myr, must be positive.
    pub time_interval: f64,
}

impl Default for TimeSpan {
    fn default() -> Self {
        Self {
            begin_time: 10.0,
            end_time: 0.0,
            time_interval: 1.0,
        }
    }
}

impl TimeSpan {
    pub fn new(begin_time: f64, end_time: f64, time_interval: f64) -> Self {
        Self {
            begin_time,
            end_time,
            time_interval,
        }
    }

    /// Checks that the span can be stepped through.
    pub fn validate(&self) -> Result<(), ReconstructionError> {
        if !self.begin_time.is_finite() || !self.end_time.is_finite() {
            return Err(ReconstructionError::InvalidConfiguration(format!(
                "begin and end times must be finite (got {} and {})",
                self.begin_time, self.end_time
            )));
        }
        if !(self.time_interval > 0.0) || !self.time_interval.is_finite() {
            return Err(ReconstructionError::InvalidConfiguration(format!(
                "time interval must be positive (got {})",
                self.time_interval
            )));
        }
        Ok(())
    }
}

/// Discrete clock stepping from the begin time to the end time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationClock {
    begin_time: f64,
    end_time: f64,
    time_step: f64,
    num_times: usize,
    time_index: usize,
}

impl SimulationClock {
    /// Derives the number of sample times and the signed step for a span.
    ///
    /// The step count is `1 + floor(eps + span / step)`. A span shorter than
    /// one interval is collapsed to two times, begin and end, with the whole
    /// span as the step.
    pub fn new(span: &TimeSpan) -> Result<Self, ReconstructionError> {
        span.validate()?;

        let duration = span.end_time - span.begin_time;
        let mut time_step = if duration < 0.0 {
            -span.time_interval
        } else {
            span.time_interval
        };
        let mut num_times = 1 + (STEP_COUNT_EPSILON + duration / time_step).floor() as usize;
        if num_times == 1 {
            num_times = 2;
            time_step = duration;
        }

        Ok(Self {
            begin_time: span.begin_time,
            end_time: span.end_time,
            time_step,
            num_times,
            time_index: 0,
        })
    }

    pub fn begin_time(&self) -> f64 {
        self.begin_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Signed step; negative when reconstructing forward in time.
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Step magnitude.
    pub fn time_interval(&self) -> f64 {
        self.time_step.abs()
    }

    /// Number of sample times including begin and end.
    pub fn num_times(&self) -> usize {
        self.num_times
    }

    pub fn time_index(&self) -> usize {
        self.time_index
    }

    pub fn time_at(&self, index: usize) -> f64 {
        self.begin_time + index as f64 * self.time_step
    }

    pub fn current_time(&self) -> f64 {
        self.time_at(self.time_index)
    }

    pub fn next_time(&self) -> f64 {
        self.time_at(self.time_index + 1)
    }

    /// True once the clock sits on its final sample time.
    pub fn is_last(&self) -> bool {
        self.time_index + 1 >= self.num_times
    }

    /// Moves to the next sample time; returns false if already at the last.
    pub fn advance(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.time_index += 1;
        true
    }

    pub fn reset(&mut self) {
        self.time_index = 0;
    }

    /// All sample times in stepping order.
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.num_times).map(|index| self.time_at(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(begin: f64, end: f64, interval: f64) -> SimulationClock {
        SimulationClock::new(&TimeSpan::new(begin, end, interval)).unwrap()
    }

    #[test]
    fn test_forward_steps() {
        let c = clock(10.0, 0.0, 1.0);
        assert_eq!(c.num_times(), 11);
        assert_eq!(c.time_step(), -1.0);
        assert_eq!(c.time_interval(), 1.0);
        let times: Vec<f64> = c.times().collect();
        assert_eq!(times.first(), Some(&10.0));
        assert_eq!(times.last(), Some(&0.0));
    }

    #[test]
    fn test_step_count_is_time_symmetric() {
        for (a, b, interval) in [(10.0, 0.0, 1.0), (100.0, 37.0, 5.0), (0.3, 0.0, 0.1), (250.0, 0.0, 7.5)] {
            let forward = clock(a, b, interval);
            let backward = clock(b, a, interval);
            assert_eq!(forward.num_times(), backward.num_times(), "{a} -> {b} by {interval}");
            assert_eq!(forward.time_step(), -backward.time_step());
        }
    }

    #[test]
    fn test_exact_multiple_not_truncated() {
        // 0.3 / 0.1 is slightly below 3 in floating point
        let c = clock(0.3, 0.0, 0.1);
        assert_eq!(c.num_times(), 4);
    }

    #[test]
    fn test_partial_final_interval_dropped() {
        let c = clock(10.0, 0.0, 3.0);
        assert_eq!(c.num_times(), 4);
        assert_eq!(c.time_at(3), 1.0);
    }

    #[test]
    fn test_interval_longer_than_span_collapses_to_two_times() {
        let c = clock(5.0, 3.0, 10.0);
        assert_eq!(c.num_times(), 2);
        assert_eq!(c.time_step(), -2.0);
        assert_eq!(c.time_at(1), 3.0);
    }

    #[test]
    fn test_advance_stops_at_last_time() {
        let mut c = clock(2.0, 0.0, 1.0);
        assert!(c.advance());
        assert!(c.advance());
        assert!(c.is_last());
        assert!(!c.advance());
        assert_eq!(c.current_time(), 0.0);
        c.reset();
        assert_eq!(c.current_time(), 2.0);
    }

    #[test]
    fn test_invalid_interval() {
        for interval in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = SimulationClock::new(&TimeSpan::new(10.0, 0.0, interval)).unwrap_err();
            assert!(matches!(err, ReconstructionError::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn test_non_finite_times() {
        let err = SimulationClock::new(&TimeSpan::new(f64::INFINITY, 0.0, 1.0)).unwrap_err();
        assert!(matches!(err, ReconstructionError::InvalidConfiguration(_)));
    }
}
