// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use async_trait::async_trait;
use ec2_cloudwatch::autoscaling::GroupLookup;
use ec2_cloudwatch::error::RemoteError;
use ec2_cloudwatch::metadata::InstanceMetadata;
use ec2_cloudwatch::metric::MetricDatum;
use ec2_cloudwatch::publisher::MetricSink;
use ec2_metrics_agent::config::AgentConfig;
use std::sync::Mutex;

pub const NOT_A_PROCESS: &str = "no-such-proc-x";

/// Records every call; fails each one when `fail_with` is set.
#[derive(Default)]
pub struct MockSink {
    pub calls: Mutex<Vec<(String, Vec<MetricDatum>)>>,
    pub fail_with: Option<RemoteError>,
}

impl MockSink {
    pub fn failing(error: RemoteError) -> Self {
        MockSink {
            calls: Mutex::default(),
            fail_with: Some(error),
        }
    }

    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, data)| data.len())
            .collect()
    }
}

#[async_trait]
impl MetricSink for MockSink {
    async fn put_metric_data(
        &self,
        namespace: &str,
        data: &[MetricDatum],
    ) -> Result<String, RemoteError> {
        self.calls
            .lock()
            .unwrap()
            .push((namespace.to_string(), data.to_vec()));
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok("PutMetricDataOutput { _request_id: Some(\"test\") }".to_string()),
        }
    }
}

/// Answers every lookup with the same result.
pub struct MockLookup(pub Result<Vec<String>, RemoteError>);

#[async_trait]
impl GroupLookup for MockLookup {
    async fn describe_instance(
        &self,
        _instance_id: &str,
        _max_records: i32,
    ) -> Result<Vec<String>, RemoteError> {
        self.0.clone()
    }
}

pub fn metadata() -> InstanceMetadata {
    [
        ("instanceId", "i-123"),
        ("imageId", "ami-1"),
        ("instanceType", "t2.micro"),
        ("region", "us-east-1"),
    ]
    .into_iter()
    .collect()
}

/// Reports one disk path and one process that is never running, so the batch does not depend
/// on the host's memory or process table.
pub fn config_for(disk_path: &str) -> AgentConfig {
    AgentConfig {
        namespace: "Test/EC2".to_string(),
        memory: false,
        swap: false,
        disk_paths: vec![disk_path.to_string()],
        processes: vec![NOT_A_PROCESS.to_string()],
        ..Default::default()
    }
}
