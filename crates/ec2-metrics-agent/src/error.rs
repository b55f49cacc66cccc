// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use ec2_cloudwatch::error::{MetadataError, RemoteError};

/// Errors that abort an agent run
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to fetch instance metadata: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Unable to determine region: set EC2_METRICS_REGION or run on an EC2 instance")]
    MissingRegion,

    #[error("Failed to publish metrics: {0}")]
    Publish(#[from] RemoteError),
}
