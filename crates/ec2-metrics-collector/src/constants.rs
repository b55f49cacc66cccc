// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Paths of the kernel interfaces the collectors read.

/// Memory counters, one `Key:   value kB` entry per line.
pub const PROC_MEMINFO_PATH: &str = "/proc/meminfo";

/// Cumulative CPU time in jiffies; the first `cpu` line aggregates all cores.
pub const PROC_STAT_PATH: &str = "/proc/stat";

/// Filesystem types known to the kernel; virtual ones carry a `nodev` prefix.
pub const PROC_FILESYSTEMS_PATH: &str = "/proc/filesystems";

/// Current mount table.
pub const PROC_MOUNTS_PATH: &str = "/proc/mounts";

/// Legacy mount table, used when `/proc/mounts` is unavailable.
pub const ETC_MTAB_PATH: &str = "/etc/mtab";

/// Root of the proc filesystem.
pub const PROC_PATH: &str = "/proc";

/// `/proc/meminfo` reports sizes in kibibytes.
pub(crate) const MEMINFO_UNIT_BYTES: u64 = 1024;
