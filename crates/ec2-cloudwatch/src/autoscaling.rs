// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Autoscaling group membership of an instance.
//!
//! [`resolve_group`] turns an empty answer into [`AutoscalingError::NotFound`], which callers
//! treat as "publish without the group" rather than a failure.

use crate::error::{AutoscalingError, RemoteError};
use async_trait::async_trait;
use aws_sdk_autoscaling::types::AutoScalingInstanceDetails;
use tracing::debug;

/// Looks up the autoscaling groups owning an instance.
#[async_trait]
pub trait GroupLookup: Send + Sync {
    /// Returns the group names of at most `max_records` membership records for `instance_id`.
    async fn describe_instance(
        &self,
        instance_id: &str,
        max_records: i32,
    ) -> Result<Vec<String>, RemoteError>;
}

/// [`GroupLookup`] backed by `DescribeAutoScalingInstances`.
#[derive(Debug, Clone)]
pub struct AutoscalingClient {
    client: aws_sdk_autoscaling::Client,
}

impl AutoscalingClient {
    #[must_use]
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        AutoscalingClient {
            client: aws_sdk_autoscaling::Client::new(config),
        }
    }

    pub async fn for_region(region: &str) -> Self {
        Self::new(&crate::load_sdk_config(region).await)
    }
}

#[async_trait]
impl GroupLookup for AutoscalingClient {
    async fn describe_instance(
        &self,
        instance_id: &str,
        max_records: i32,
    ) -> Result<Vec<String>, RemoteError> {
        let output = self
            .client
            .describe_auto_scaling_instances()
            .instance_ids(instance_id)
            .max_records(max_records)
            .send()
            .await
            .map_err(RemoteError::from_sdk)?;

        let instances: Option<&[AutoScalingInstanceDetails]> =
            output.auto_scaling_instances().into();

        Ok(instances
            .unwrap_or_default()
            .iter()
            .filter_map(|details| {
                let group: Option<&str> = details.auto_scaling_group_name().into();
                group.map(str::to_string)
            })
            .collect())
    }
}

/// Resolves the autoscaling group of `instance_id` with a single-record lookup.
pub async fn resolve_group<L>(lookup: &L, instance_id: &str) -> Result<String, AutoscalingError>
where
    L: GroupLookup + ?Sized,
{
    let groups = lookup.describe_instance(instance_id, 1).await?;
    match groups.into_iter().next() {
        Some(group) => {
            debug!("Instance {instance_id} belongs to autoscaling group {group}");
            Ok(group)
        }
        None => Err(AutoscalingError::NotFound(instance_id.to_string())),
    }
}

/// Resolves the autoscaling group of `instance_id` in `region`.
pub async fn resolve_group_in_region(
    instance_id: &str,
    region: &str,
) -> Result<String, AutoscalingError> {
    let client = AutoscalingClient::for_region(region).await;
    resolve_group(&client, instance_id).await
}
