// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Host statistics for EC2 instances.
//!
//! Every collector is a stateless function over an OS interface: `/proc/meminfo`,
//! `statfs(2)`, `/proc/stat`, `/proc/mounts` and the `/proc/<pid>` tree. Nothing is cached
//! between calls, so each reading reflects the host at the moment it was taken.
//!
//! - [`memory`]: memory and swap usage
//! - [`disk`]: space and inode usage for a path
//! - [`cpu`]: CPU utilization sampled over a window
//! - [`partitions`]: physical mount points
//! - [`process`]: process liveness by name
//! - [`round`]: half-up rounding used by every percentage

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod constants;
pub mod cpu;
pub mod disk;
pub mod error;
pub mod memory;
pub mod partitions;
pub mod process;
pub mod round;

pub use error::CollectorError;
