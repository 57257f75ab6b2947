//! The timestamp generator: a strictly increasing `t0, t0+step, t0+2*step, …`
//! sequence, parameterized by precision and a start/step that may arrive
//! either as an integer literal or a string encoding.

use crate::error::GeneratorError;
use crate::schema::{TimestampConfig, TimestampPrecision};

/// Parse either a bare integer epoch (already in the target precision) or a
/// `"YYYY-MM-DD HH:MM:SS"` literal into an epoch value in `precision` units.
pub fn parse_timestamp_literal(literal: &str, precision: TimestampPrecision) -> Result<i64, GeneratorError> {
    let trimmed = literal.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    parse_datetime(trimmed, precision).ok_or_else(|| GeneratorError::InvalidTimestamp(literal.to_string()))
}

/// Parse a step, which may be a bare integer count of `precision` units, or
/// a suffixed duration string like `"500ms"`/`"1s"`.
pub fn parse_step_literal(literal: &str, precision: TimestampPrecision) -> Result<i64, GeneratorError> {
    let trimmed = literal.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    let (number_part, unit) = trimmed.split_at(
        trimmed
            .find(|c: char| c.is_alphabetic())
            .ok_or_else(|| GeneratorError::InvalidTimestamp(literal.to_string()))?,
    );
    let n: i64 = number_part
        .parse()
        .map_err(|_| GeneratorError::InvalidTimestamp(literal.to_string()))?;
    let as_ns = match unit {
        "ns" => n,
        "us" => n * 1_000,
        "ms" => n * 1_000_000,
        "s" => n * 1_000_000_000,
        other => return Err(GeneratorError::UnknownPrecision(other.to_string())),
    };
    Ok(match precision {
        TimestampPrecision::Ns => as_ns,
        TimestampPrecision::Us => as_ns / 1_000,
        TimestampPrecision::Ms => as_ns / 1_000_000,
    })
}

/// Minimal `"YYYY-MM-DD HH:MM:SS"` parser (UTC, no timezone support) good
/// enough to anchor the checkpoint-recovery scenario in `spec.md` §8.
fn parse_datetime(s: &str, precision: TimestampPrecision) -> Option<i64> {
    let (date, time) = s.split_once(' ')?;
    let mut date_parts = date.split('-');
    let year: i64 = date_parts.next()?.parse().ok()?;
    let month: i64 = date_parts.next()?.parse().ok()?;
    let day: i64 = date_parts.next()?.parse().ok()?;
    let mut time_parts = time.split(':');
    let hour: i64 = time_parts.next()?.parse().ok()?;
    let min: i64 = time_parts.next()?.parse().ok()?;
    let sec: i64 = time_parts.next()?.parse().ok()?;

    let days_since_epoch = days_from_civil(year, month, day);
    let secs = days_since_epoch * 86_400 + hour * 3_600 + min * 60 + sec;
    Some(match precision {
        TimestampPrecision::Ms => secs * 1_000,
        TimestampPrecision::Us => secs * 1_000_000,
        TimestampPrecision::Ns => secs * 1_000_000_000,
    })
}

/// Howard Hinnant's civil-from-days algorithm, inverted: days since the Unix
/// epoch for a given proleptic Gregorian (year, month, day).
fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe - 719468
}

pub struct TimestampGenerator {
    start: i64,
    step: i64,
    current: i64,
}

impl TimestampGenerator {
    pub fn new(config: &TimestampConfig) -> Result<Self, GeneratorError> {
        let start = parse_timestamp_literal(&config.start_timestamp, config.precision)?;
        let step = parse_step_literal(&config.step, config.precision)?;
        Ok(Self {
            start,
            step,
            current: start,
        })
    }

    pub fn from_parts(start: i64, step: i64) -> Self {
        Self { start, step, current: start }
    }

    pub fn next(&mut self) -> i64 {
        let v = self.current;
        self.current += self.step;
        v
    }

    pub fn reset(&mut self) {
        self.current = self.start;
    }

    pub fn set_start(&mut self, start: i64) {
        self.start = start;
        self.current = start;
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    pub fn start(&self) -> i64 {
        self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_increasing_sequence() {
        let mut gen = TimestampGenerator::from_parts(1000, 10);
        let vals: Vec<i64> = (0..5).map(|_| gen.next()).collect();
        assert_eq!(vals, vec![1000, 1010, 1020, 1030, 1040]);
    }

    #[test]
    fn reset_returns_to_start() {
        let mut gen = TimestampGenerator::from_parts(1000, 10);
        gen.next();
        gen.next();
        gen.reset();
        assert_eq!(gen.next(), 1000);
    }

    #[test]
    fn parses_datetime_literal_scenario_five() {
        // "2021-05-03 08:00:00" == 1620000000000 ms, per spec.md §8 scenario 5.
        let ts = parse_timestamp_literal("2021-05-03 08:00:00", TimestampPrecision::Ms).unwrap();
        assert_eq!(ts, 1620000000000);
    }

    #[test]
    fn parses_suffixed_step() {
        assert_eq!(
            parse_step_literal("1000ms", TimestampPrecision::Ms).unwrap(),
            1000
        );
        assert_eq!(parse_step_literal("1s", TimestampPrecision::Ms).unwrap(), 1000);
    }
}
