// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Disk space and inode usage for a path, like `df` and `df -i`.
//!
//! One `statfs(2)` call per measurement. Space figures use the blocks available to
//! unprivileged users, so blocks reserved for root count as used:
//!
//! - **Total**: `block_size × blocks`
//! - **Available**: `block_size × blocks_available`
//! - **Used**: `total - available`
//! - **Inodes**: `100 × (1 - files_free / files)`
//!
//! Filesystems reporting zero blocks or zero inodes (procfs, some btrfs and overlay mounts)
//! get 0 % rather than NaN.

#![allow(clippy::module_name_repetitions)]

use crate::error::CollectorError;
use crate::round::{percent, round};
use std::io;

/// Raw counters returned by `statfs(2)`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FsCounters {
    pub block_size: u64,
    pub blocks: u64,
    pub blocks_available: u64,
    pub files: u64,
    pub files_free: u64,
}

/// Space and inode usage of the filesystem holding a path.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DiskStats {
    /// Used space as a whole percentage of total space.
    pub utilization_percent: f64,
    pub used_bytes: f64,
    pub available_bytes: f64,
    pub total_bytes: f64,
    /// Used inodes as a whole percentage of total inodes.
    pub inode_utilization_percent: f64,
}

impl DiskStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_counters(counters: &FsCounters) -> Self {
        let total = counters.block_size.saturating_mul(counters.blocks);
        let available = counters
            .block_size
            .saturating_mul(counters.blocks_available)
            .min(total);
        Self::from_bytes(
            total as f64,
            available as f64,
            counters.files as f64,
            counters.files_free as f64,
        )
    }

    /// Builds stats from byte and inode totals.
    #[must_use]
    pub fn from_bytes(total: f64, available: f64, inodes: f64, inodes_free: f64) -> Self {
        let used = total - available;
        let inode_utilization_percent = if inodes == 0.0 {
            0.0
        } else {
            round(100.0 * (1.0 - inodes_free / inodes))
        };

        DiskStats {
            utilization_percent: round(percent(used, total)),
            used_bytes: used,
            available_bytes: available,
            total_bytes: total,
            inode_utilization_percent,
        }
    }
}

/// Queries filesystem counters for `path`.
///
/// The OS error is forwarded unmodified inside [`CollectorError::Statfs`].
#[cfg(unix)]
#[allow(clippy::unnecessary_cast, clippy::cast_sign_loss)]
pub fn statfs_counters(path: &str) -> Result<FsCounters, CollectorError> {
    let stat = nix::sys::statfs::statfs(path).map_err(|errno| CollectorError::Statfs {
        path: path.to_string(),
        source: io::Error::from(errno),
    })?;

    Ok(FsCounters {
        block_size: stat.block_size() as u64,
        blocks: stat.blocks() as u64,
        blocks_available: stat.blocks_available() as u64,
        files: stat.files() as u64,
        files_free: stat.files_free() as u64,
    })
}

#[cfg(not(unix))]
pub fn statfs_counters(path: &str) -> Result<FsCounters, CollectorError> {
    Err(CollectorError::Statfs {
        path: path.to_string(),
        source: io::Error::new(io::ErrorKind::Unsupported, "statfs is not available"),
    })
}

/// Measures space and inode usage of the filesystem containing `path`.
pub fn measure_disk(path: &str) -> Result<DiskStats, CollectorError> {
    let counters = statfs_counters(path)?;
    Ok(DiskStats::from_counters(&counters))
}
