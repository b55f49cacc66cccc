// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Physical partitions from the kernel mount table.
//!
//! A filesystem type is physical when `/proc/filesystems` lists it without the `nodev` marker.
//! Mounts of any other type (proc, sysfs, tmpfs, cgroup, ...) are dropped.

use crate::constants::{ETC_MTAB_PATH, PROC_FILESYSTEMS_PATH, PROC_MOUNTS_PATH};
use crate::error::CollectorError;
use std::collections::HashSet;
use std::fs;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Block device, empty when the mount table reports `none`.
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
}

/// Parses `/proc/filesystems` text into the set of device-backed filesystem types.
#[must_use]
pub fn parse_physical_fs_types(contents: &str) -> HashSet<String> {
    contents
        .lines()
        .filter(|line| !line.starts_with("nodev"))
        .map(str::trim)
        .filter(|fs_type| !fs_type.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Parses mount table text, keeping mounts whose type is in `physical`.
#[must_use]
pub fn parse_mounts(contents: &str, physical: &HashSet<String>) -> Vec<Partition> {
    contents
        .lines()
        .filter(|line| !line.starts_with("none"))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            if !physical.contains(fs_type) {
                return None;
            }
            Some(Partition {
                device: if device == "none" {
                    String::new()
                } else {
                    device.to_string()
                },
                mount_point: mount_point.to_string(),
                fs_type: fs_type.to_string(),
            })
        })
        .collect()
}

fn read(path: &str) -> Result<String, CollectorError> {
    fs::read_to_string(path).map_err(|source| CollectorError::Io {
        path: path.to_string(),
        source,
    })
}

/// Lists mounted physical partitions.
///
/// Reads `/proc/mounts`, falling back to `/etc/mtab` when it is missing.
pub fn physical_partitions() -> Result<Vec<Partition>, CollectorError> {
    let physical = parse_physical_fs_types(&read(PROC_FILESYSTEMS_PATH)?);
    let mounts = match read(PROC_MOUNTS_PATH) {
        Ok(contents) => contents,
        Err(e) => {
            debug!("Falling back to {ETC_MTAB_PATH}: {e}");
            read(ETC_MTAB_PATH)?
        }
    };
    Ok(parse_mounts(&mounts, &physical))
}
