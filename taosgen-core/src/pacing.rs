//! `TimeIntervalStrategy`: inter-write pacing, grounded directly on
//! `original_source/src/actions/core/insert/src/writer/src/TimeIntervalStrategy.cpp`.

use crate::error::GeneratorError;
use crate::schema::TimestampPrecision;
use serde::{Deserialize, Serialize};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalStrategyKind {
    Fixed,
    FirstToFirst,
    LastToFirst,
    Literal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitStrategyKind {
    Sleep,
    BusyWait,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeIntervalConfig {
    pub enabled: bool,
    pub interval_strategy: IntervalStrategyKind,
    pub wait_strategy: WaitStrategyKind,
    /// Milliseconds, used by `Fixed`.
    pub base_interval_ms: i64,
    /// Milliseconds, used by `FirstToFirst`/`LastToFirst` clamping. `None`
    /// means unbounded on that side.
    pub min_interval_ms: Option<i64>,
    pub max_interval_ms: Option<i64>,
}

pub struct TimeIntervalStrategy {
    config: TimeIntervalConfig,
    precision: TimestampPrecision,
    is_first_write: bool,
}

impl TimeIntervalStrategy {
    pub fn new(config: TimeIntervalConfig, precision: TimestampPrecision) -> Self {
        Self {
            config,
            precision,
            is_first_write: true,
        }
    }

    fn clamp_interval(&self, interval_us: i64) -> i64 {
        let mut v = interval_us;
        if let Some(min) = self.config.min_interval_ms {
            if v < min * 1000 {
                v = min * 1000;
            }
        }
        if let Some(max) = self.config.max_interval_ms {
            if v > max * 1000 {
                v = max * 1000;
            }
        }
        v
    }

    fn wait_time_us(&self, current_start: i64, last_start: i64, last_end: i64) -> Result<i64, GeneratorError> {
        Ok(match self.config.interval_strategy {
            IntervalStrategyKind::Fixed => self.config.base_interval_ms * 1000,
            IntervalStrategyKind::FirstToFirst => {
                let raw = self.precision.to_micros(current_start) - self.precision.to_micros(last_start);
                self.clamp_interval(raw)
            }
            IntervalStrategyKind::LastToFirst => {
                let raw = self.precision.to_micros(current_start) - self.precision.to_micros(last_end);
                self.clamp_interval(raw)
            }
            IntervalStrategyKind::Literal => {
                let now_us = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .expect("system clock is after the Unix epoch")
                    .as_micros() as i64;
                self.precision.to_micros(current_start) - now_us
            }
        })
    }

    /// Wait however long the configured strategy prescribes before the next
    /// write. On the very first write, every strategy except `Literal`
    /// returns immediately.
    pub fn apply_wait(
        &mut self,
        current_start: i64,
        last_start: i64,
        last_end: i64,
    ) -> Result<(), GeneratorError> {
        if !self.config.enabled
            || (self.is_first_write && self.config.interval_strategy != IntervalStrategyKind::Literal)
        {
            self.is_first_write = false;
            return Ok(());
        }
        self.is_first_write = false;

        let wait_us = self.wait_time_us(current_start, last_start, last_end)?;
        if wait_us > 0 {
            match self.config.wait_strategy {
                WaitStrategyKind::Sleep => {
                    std::thread::sleep(std::time::Duration::from_micros(wait_us as u64));
                }
                WaitStrategyKind::BusyWait => {
                    let start = Instant::now();
                    while start.elapsed().as_micros() < wait_us as u128 {
                        std::hint::spin_loop();
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(strategy: IntervalStrategyKind) -> TimeIntervalConfig {
        TimeIntervalConfig {
            enabled: true,
            interval_strategy: strategy,
            wait_strategy: WaitStrategyKind::Sleep,
            base_interval_ms: 50,
            min_interval_ms: Some(10),
            max_interval_ms: Some(1000),
        }
    }

    #[test]
    fn first_write_returns_immediately_for_non_literal() {
        let mut strategy = TimeIntervalStrategy::new(config(IntervalStrategyKind::Fixed), TimestampPrecision::Ms);
        let start = Instant::now();
        strategy.apply_wait(0, 0, 0).unwrap();
        assert!(start.elapsed().as_millis() < 20);
    }

    #[test]
    fn literal_strategy_waits_about_the_requested_amount() {
        let mut strategy = TimeIntervalStrategy::new(config(IntervalStrategyKind::Literal), TimestampPrecision::Ms);
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as i64;
        let target = now_ms + 100;
        let start = Instant::now();
        strategy.apply_wait(target, 0, 0).unwrap();
        let elapsed = start.elapsed().as_millis();
        assert!((90..=260).contains(&elapsed), "elapsed={elapsed}");
    }

    #[test]
    fn fixed_interval_clamps_are_not_applied() {
        let mut strategy = TimeIntervalStrategy::new(config(IntervalStrategyKind::Fixed), TimestampPrecision::Ms);
        strategy.apply_wait(0, 0, 0).unwrap(); // consume the first-write freebie
        let start = Instant::now();
        strategy.apply_wait(1, 0, 0).unwrap();
        assert!(start.elapsed().as_millis() >= 45);
    }
}
