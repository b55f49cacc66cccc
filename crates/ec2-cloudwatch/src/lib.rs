// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CloudWatch plumbing for EC2 host metrics.
//!
//! - [`metadata`]: fetch the instance identity document
//! - [`dimensions`]: turn metadata into CloudWatch dimensions
//! - [`metric`]: metric datums and the ordered batch they are assembled into
//! - [`autoscaling`]: resolve the autoscaling group owning an instance
//! - [`publisher`]: submit a batch with `PutMetricData`
//! - [`error`]: error types shared by the remote calls

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod autoscaling;
pub mod dimensions;
pub mod error;
pub mod metadata;
pub mod metric;
pub mod publisher;

/// Loads AWS configuration (credentials chain, retry defaults) for `region`.
pub async fn load_sdk_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_sdk_cloudwatch::config::Region::new(region.to_string()))
        .load()
        .await
}
