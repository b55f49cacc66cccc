// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Process liveness by command name.

use crate::constants::PROC_PATH;
use std::fs;
use tracing::{debug, trace};

/// Enumerates numeric `/proc/<pid>` directories under `path`.
///
/// Returns an empty list when `path` cannot be read.
pub fn get_pid_list_from_path(path: &str) -> Vec<i64> {
    let Ok(entries) = fs::read_dir(path) else {
        debug!("Could not list {path}");
        return Vec::new();
    };

    entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            if !entry.file_type().ok()?.is_dir() {
                return None;
            }
            entry.file_name().to_str()?.parse::<i64>().ok()
        })
        .collect()
}

/// Returns whether any process under `proc_path` has `comm` equal to `name`.
///
/// The kernel truncates `comm` to 15 bytes, so `name` is compared after the same truncation.
pub fn is_process_running_in(proc_path: &str, name: &str) -> bool {
    let wanted = truncate_comm(name);
    let running = get_pid_list_from_path(proc_path).into_iter().any(|pid| {
        fs::read_to_string(format!("{proc_path}/{pid}/comm"))
            .map(|comm| comm.trim_end() == wanted)
            .unwrap_or(false)
    });
    trace!("Process {name} running: {running}");
    running
}

/// Returns whether a process named `name` is running on this host.
#[must_use]
pub fn is_process_running(name: &str) -> bool {
    is_process_running_in(PROC_PATH, name)
}

fn truncate_comm(name: &str) -> &str {
    const TASK_COMM_LEN: usize = 15;
    if name.len() <= TASK_COMM_LEN {
        return name;
    }
    let mut end = TASK_COMM_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
