// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Memory and swap usage from `/proc/meminfo`.
//!
//! Available memory counts reclaimable page cache and buffers as free:
//!
//! ```text
//! available = MemFree + Buffers + Cached
//! used      = MemTotal - available
//! ```
//!
//! Swap is reported three ways, each under its own name: `swap_utilization_percent` is the
//! share of swap in use, `swap_used_bytes` is `SwapTotal - SwapFree`, and `swap_cached_bytes`
//! is the kernel's `SwapCached` counter (pages present both in RAM and in swap).

use crate::constants::{MEMINFO_UNIT_BYTES, PROC_MEMINFO_PATH};
use crate::error::CollectorError;
use crate::round::{percent, round};
use std::collections::HashMap;
use std::fs;
use tracing::debug;

/// Parsed `/proc/meminfo` counters, normalized to bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemInfo {
    entries: HashMap<String, u64>,
}

impl MemInfo {
    /// Parses the text of a meminfo file.
    ///
    /// Values suffixed with `kB` are converted to bytes; unitless values (page counts such as
    /// `HugePages_Total`) are kept as-is. Malformed lines are skipped.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let mut entries = HashMap::new();
        for line in contents.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let mut fields = rest.split_whitespace();
            let Some(value) = fields.next().and_then(|v| v.parse::<u64>().ok()) else {
                debug!("Skipping malformed meminfo line: {line}");
                continue;
            };
            let value = match fields.next() {
                Some("kB") => value.saturating_mul(MEMINFO_UNIT_BYTES),
                _ => value,
            };
            entries.insert(key.trim().to_string(), value);
        }
        MemInfo { entries }
    }

    /// Reads and parses `/proc/meminfo`.
    pub fn read() -> Result<Self, CollectorError> {
        Self::read_from_path(PROC_MEMINFO_PATH)
    }

    /// Reads and parses a meminfo file at `path`.
    pub fn read_from_path(path: &str) -> Result<Self, CollectorError> {
        let contents = fs::read_to_string(path).map_err(|source| CollectorError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(Self::parse(&contents))
    }

    /// Returns the counter for `key` in bytes (or raw units for unitless counters).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries.get(key).copied()
    }

    fn get_or_zero(&self, key: &str) -> u64 {
        self.get(key).unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.get("MemTotal")
    }

    #[must_use]
    pub fn available(&self) -> u64 {
        self.get_or_zero("MemFree")
            .saturating_add(self.get_or_zero("Buffers"))
            .saturating_add(self.get_or_zero("Cached"))
    }
}

/// Memory and swap usage at one point in time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MemoryStats {
    /// Used memory as a whole percentage of total memory.
    pub utilization_percent: f64,
    pub used_bytes: f64,
    pub available_bytes: f64,
    pub total_bytes: f64,
    /// Used swap as a whole percentage of total swap; 0 when no swap is configured.
    pub swap_utilization_percent: f64,
    /// `SwapTotal - SwapFree`.
    pub swap_used_bytes: f64,
    /// The kernel's `SwapCached` counter.
    pub swap_cached_bytes: f64,
}

impl MemoryStats {
    /// Derives usage from parsed meminfo counters.
    ///
    /// Fails only when `MemTotal` is absent; every other counter defaults to zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_meminfo(info: &MemInfo) -> Result<Self, CollectorError> {
        let total = info
            .total()
            .ok_or(CollectorError::MissingField { field: "MemTotal" })?;
        let available = info.available().min(total);
        let used = total - available;

        let swap_total = info.get_or_zero("SwapTotal");
        let swap_used = swap_total.saturating_sub(info.get_or_zero("SwapFree"));

        Ok(MemoryStats {
            utilization_percent: round(percent(used as f64, total as f64)),
            used_bytes: used as f64,
            available_bytes: available as f64,
            total_bytes: total as f64,
            swap_utilization_percent: round(percent(swap_used as f64, swap_total as f64)),
            swap_used_bytes: swap_used as f64,
            swap_cached_bytes: info.get_or_zero("SwapCached") as f64,
        })
    }
}

/// Measures current memory and swap usage from `/proc/meminfo`.
pub fn measure_memory() -> Result<MemoryStats, CollectorError> {
    MemoryStats::from_meminfo(&MemInfo::read()?)
}

/// Measures memory usage from a meminfo file at `path`.
pub fn measure_memory_from_path(path: &str) -> Result<MemoryStats, CollectorError> {
    MemoryStats::from_meminfo(&MemInfo::read_from_path(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MB_IN_KB: u64 = 1024;

    fn meminfo_text(total_mb: u64, free_mb: u64, buffers_mb: u64, cached_mb: u64) -> String {
        format!(
            "MemTotal:       {} kB\n\
             MemFree:        {} kB\n\
             MemAvailable:   {} kB\n\
             Buffers:        {} kB\n\
             Cached:         {} kB\n\
             SwapCached:     2048 kB\n\
             SwapTotal:      1048576 kB\n\
             SwapFree:       786432 kB\n\
             HugePages_Total:       0\n",
            total_mb * MB_IN_KB,
            free_mb * MB_IN_KB,
            free_mb * MB_IN_KB,
            buffers_mb * MB_IN_KB,
            cached_mb * MB_IN_KB,
        )
    }

    #[test]
    fn test_parse_converts_kb_to_bytes() {
        let info = MemInfo::parse("MemTotal:       2048 kB\nHugePages_Total:       4\n");
        assert_eq!(info.get("MemTotal"), Some(2048 * 1024));
        assert_eq!(info.get("HugePages_Total"), Some(4));
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let info = MemInfo::parse("garbage\nMemFree: lots kB\nMemTotal: 10 kB\n");
        assert_eq!(info.get("MemFree"), None);
        assert_eq!(info.get("MemTotal"), Some(10 * 1024));
    }

    #[test]
    fn test_quarter_of_memory_used() {
        // 2000 MB total, 1500 MB free-ish => 500 MB used
        let info = MemInfo::parse(&meminfo_text(2000, 1000, 100, 400));
        let stats = MemoryStats::from_meminfo(&info).unwrap();

        assert_eq!(stats.utilization_percent, 25.0);
        assert_eq!(stats.used_bytes, (500 * 1024 * 1024) as f64);
        assert_eq!(stats.available_bytes, (1500 * 1024 * 1024) as f64);
        assert_eq!(stats.total_bytes, (2000 * 1024 * 1024) as f64);
    }

    #[test]
    fn test_small_utilization_rounds_up() {
        // 1000 kB total, 994 kB available => 0.6 %
        let info = MemInfo::parse("MemTotal: 1000 kB\nMemFree: 994 kB\n");
        let stats = MemoryStats::from_meminfo(&info).unwrap();
        assert_eq!(stats.utilization_percent, 1.0);
    }

    #[test]
    fn test_swap_outputs_stay_distinct() {
        let info = MemInfo::parse(&meminfo_text(2000, 1000, 100, 400));
        let stats = MemoryStats::from_meminfo(&info).unwrap();

        // 256 MB of 1 GB swap in use
        assert_eq!(stats.swap_utilization_percent, 25.0);
        assert_eq!(stats.swap_used_bytes, (256 * 1024 * 1024) as f64);
        assert_eq!(stats.swap_cached_bytes, (2048 * 1024) as f64);
    }

    #[test]
    fn test_no_swap_configured() {
        let info = MemInfo::parse("MemTotal: 1000 kB\nMemFree: 500 kB\n");
        let stats = MemoryStats::from_meminfo(&info).unwrap();
        assert_eq!(stats.swap_utilization_percent, 0.0);
        assert_eq!(stats.swap_used_bytes, 0.0);
        assert_eq!(stats.swap_cached_bytes, 0.0);
    }

    #[test]
    fn test_missing_total_is_an_error() {
        let info = MemInfo::parse("MemFree: 500 kB\n");
        let err = MemoryStats::from_meminfo(&info).unwrap_err();
        assert!(matches!(
            err,
            CollectorError::MissingField { field: "MemTotal" }
        ));
    }

    #[test]
    fn test_measure_memory_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(meminfo_text(2000, 1000, 100, 400).as_bytes())
            .unwrap();

        let stats = measure_memory_from_path(file.path().to_str().unwrap()).unwrap();
        assert_eq!(stats.utilization_percent, 25.0);
    }

    #[test]
    fn test_measure_memory_missing_file() {
        let err = measure_memory_from_path("/this/path/does/not/exist").unwrap_err();
        assert!(matches!(err, CollectorError::Io { .. }));
    }
}
