// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Submission of a metric batch to CloudWatch.
//!
//! A batch goes out in exactly one `PutMetricData` call. There is no retry or splitting at
//! this layer; callers holding more than [`MAX_DATUMS_PER_REQUEST`] datums split first.
//!
//! [`MAX_DATUMS_PER_REQUEST`]: crate::metric::MAX_DATUMS_PER_REQUEST

use crate::error::RemoteError;
use crate::metric::{MetricBatch, MetricDatum};
use async_trait::async_trait;
use aws_sdk_cloudwatch::types::{
    Dimension as SdkDimension, MetricDatum as SdkMetricDatum, StandardUnit,
};
use tracing::{debug, info};

/// Destination for metric datums.
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Submits `data` under `namespace` in one call, returning the raw response rendering.
    async fn put_metric_data(
        &self,
        namespace: &str,
        data: &[MetricDatum],
    ) -> Result<String, RemoteError>;
}

/// [`MetricSink`] backed by the CloudWatch `PutMetricData` API.
#[derive(Debug, Clone)]
pub struct CloudWatchPublisher {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatchPublisher {
    #[must_use]
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        CloudWatchPublisher {
            client: aws_sdk_cloudwatch::Client::new(config),
        }
    }

    pub async fn for_region(region: &str) -> Self {
        Self::new(&crate::load_sdk_config(region).await)
    }
}

#[async_trait]
impl MetricSink for CloudWatchPublisher {
    async fn put_metric_data(
        &self,
        namespace: &str,
        data: &[MetricDatum],
    ) -> Result<String, RemoteError> {
        let output = self
            .client
            .put_metric_data()
            .namespace(namespace)
            .set_metric_data(Some(data.iter().map(to_sdk_datum).collect()))
            .send()
            .await
            .map_err(RemoteError::from_sdk)?;
        Ok(format!("{output:?}"))
    }
}

fn to_sdk_datum(datum: &MetricDatum) -> SdkMetricDatum {
    let dimensions = datum
        .dimensions
        .iter()
        .map(|d| {
            SdkDimension::builder()
                .name(d.name.clone())
                .value(d.value.clone())
                .build()
        })
        .collect();

    SdkMetricDatum::builder()
        .metric_name(datum.name.clone())
        .unit(StandardUnit::from(datum.unit.as_str()))
        .value(datum.value)
        .set_dimensions(Some(dimensions))
        .build()
}

/// Publishes `data` under `namespace` through `sink` in one call, logging the raw response.
pub async fn publish<S>(sink: &S, data: &[MetricDatum], namespace: &str) -> Result<String, RemoteError>
where
    S: MetricSink + ?Sized,
{
    debug!("Publishing {} datums to namespace {namespace}", data.len());
    let response = sink.put_metric_data(namespace, data).await?;
    info!("{response}");
    Ok(response)
}

/// Publishes `batch` under `namespace` to CloudWatch in `region`.
pub async fn publish_to_region(
    batch: &MetricBatch,
    namespace: &str,
    region: &str,
) -> Result<String, RemoteError> {
    let publisher = CloudWatchPublisher::for_region(region).await;
    publish(&publisher, batch.as_slice(), namespace).await
}
