// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;

/// Errors raised while reading host statistics
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("can't read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("statfs failed for {path}: {source}")]
    Statfs {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("{field} missing from meminfo")]
    MissingField { field: &'static str },
}
