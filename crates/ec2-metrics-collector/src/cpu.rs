// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CPU utilization sampled from `/proc/stat`.
//!
//! The aggregate `cpu` line holds cumulative jiffies since boot:
//!
//! ```text
//! cpu  user nice system idle iowait irq softirq steal guest guest_nice
//! ```
//!
//! Utilization over a window is the busy share of the jiffies elapsed between two readings.
//! `idle` and `iowait` count as not busy; `guest` time is already included in `user` and is
//! ignored.

use crate::constants::PROC_STAT_PATH;
use crate::error::CollectorError;
use crate::round::{percent, round_plus};
use std::fs;
use std::time::Duration;
use tracing::debug;

/// Cumulative CPU time across all cores, in jiffies.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CpuTimes {
    pub busy: u64,
    pub idle: u64,
}

impl CpuTimes {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.busy.saturating_add(self.idle)
    }

    /// Parses the aggregate `cpu` line of `/proc/stat` text.
    pub fn parse(contents: &str) -> Result<Self, CollectorError> {
        let malformed = |reason: &str| CollectorError::Parse {
            path: PROC_STAT_PATH.to_string(),
            reason: reason.to_string(),
        };

        let line = contents
            .lines()
            .find(|line| line.split_whitespace().next() == Some("cpu"))
            .ok_or_else(|| malformed("aggregate cpu line not found"))?;

        let values = line
            .split_whitespace()
            .skip(1)
            .take(8)
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| malformed(&format!("invalid cpu counter: {e}")))?;

        // user, nice, system and idle are present on every kernel we care about
        if values.len() < 4 {
            return Err(malformed("too few cpu counters"));
        }

        let idle = values[3] + values.get(4).copied().unwrap_or(0);
        let busy: u64 = values
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 3 && *i != 4)
            .map(|(_, v)| *v)
            .sum();

        Ok(CpuTimes { busy, idle })
    }

    /// Reads the current counters from `/proc/stat`.
    pub fn read() -> Result<Self, CollectorError> {
        Self::read_from_path(PROC_STAT_PATH)
    }

    pub fn read_from_path(path: &str) -> Result<Self, CollectorError> {
        let contents = fs::read_to_string(path).map_err(|source| CollectorError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&contents)
    }
}

/// Busy share of the jiffies elapsed between `start` and `end`, to one decimal place.
///
/// Returns 0 when no time elapsed or the counters went backwards.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn utilization_between(start: &CpuTimes, end: &CpuTimes) -> f64 {
    let busy = end.busy.saturating_sub(start.busy);
    let total = end.total().saturating_sub(start.total());
    round_plus(percent(busy as f64, total as f64), 1)
}

/// Samples CPU utilization over `interval`.
pub async fn sample_cpu_utilization(interval: Duration) -> Result<f64, CollectorError> {
    let start = CpuTimes::read()?;
    tokio::time::sleep(interval).await;
    let end = CpuTimes::read()?;

    let utilization = utilization_between(&start, &end);
    debug!("CPU utilization over {interval:?}: {utilization}%");
    Ok(utilization)
}
