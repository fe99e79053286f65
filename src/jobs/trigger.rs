//! Schedule descriptors and fire-time computation.
//!
//! A descriptor is an interval N in minutes. It expands to the 5-field
//! expression `*/N * * * *`; the `cron` and `tokio-cron-scheduler` crates
//! take a leading seconds field, so evaluation uses `0 */N * * * *`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use super::error::{JobError, JobResult};

/// Largest interval a minute-field step can express.
pub const MAX_INTERVAL_MINUTES: u32 = 59;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleDescriptor {
    minutes: u32,
}

impl ScheduleDescriptor {
    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Standard 5-field form, `*/N * * * *`
    pub fn expression(&self) -> String {
        format!("*/{} * * * *", self.minutes)
    }

    /// Seconds-first form understood by `cron` and `tokio-cron-scheduler`
    pub fn runtime_expression(&self) -> String {
        format!("0 {}", self.expression())
    }

    fn schedule(&self) -> JobResult<Schedule> {
        Schedule::from_str(&self.runtime_expression()).map_err(|e| {
            JobError::InvalidScheduleDescriptor {
                descriptor: self.minutes.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

impl FromStr for ScheduleDescriptor {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| JobError::InvalidScheduleDescriptor {
            descriptor: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("interval must be a positive integer number of minutes"));
        }

        let minutes: u32 = trimmed
            .parse()
            .map_err(|_| invalid("interval is out of range"))?;

        match minutes {
            0 => Err(invalid("interval must be a positive integer number of minutes")),
            m if m > MAX_INTERVAL_MINUTES => Err(invalid("interval must not exceed 59 minutes")),
            m => Ok(Self { minutes: m }),
        }
    }
}

impl fmt::Display for ScheduleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.minutes)
    }
}

/// The next `count` fire times strictly after `reference`, in order.
///
/// Pure and restartable: calling again with the last returned time as the
/// reference continues the sequence.
pub fn next_fire_times(
    descriptor: &ScheduleDescriptor,
    reference: DateTime<Utc>,
    count: usize,
) -> JobResult<Vec<DateTime<Utc>>> {
    let schedule = descriptor.schedule()?;
    Ok(schedule.after(&reference).take(count).collect())
}
