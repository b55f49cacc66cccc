// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use aws_sdk_cloudwatch::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::fmt::{Debug, Display};

/// Errors fetching the instance identity document
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("can't reach metadata endpoint - {}", cause_chain(.0))]
    Network(#[source] reqwest::Error),

    #[error("can't decode metadata document - {0}")]
    Parse(String),
}

/// Renders `err` followed by each of its sources, outermost first.
fn cause_chain(err: &reqwest::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !rendered.ends_with(&cause_text) {
            rendered.push_str(": ");
            rendered.push_str(&cause_text);
        }
        source = std::error::Error::source(cause);
    }
    rendered
}

/// Errors returned by an AWS API call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The service answered with a modelled error carrying a code.
    #[error("[{code}] {message}")]
    Service { code: String, message: String },

    /// Anything else: dispatch, timeout, credential or unparseable response failures.
    #[error("{0}")]
    Other(String),
}

impl RemoteError {
    /// Classifies an SDK error by whether the service reported an error code.
    pub fn from_sdk<E, R>(err: SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: Debug,
    {
        let service = err.as_service_error();
        let code = service.and_then(|e| e.code());
        let message = service.and_then(|e| e.message());
        Self::from_parts(code, message, DisplayErrorContext(&err))
    }

    /// Builds the service variant when `code` is present, otherwise keeps `raw` as-is.
    pub fn from_parts(code: Option<&str>, message: Option<&str>, raw: impl Display) -> Self {
        match code {
            Some(code) => RemoteError::Service {
                code: code.to_string(),
                message: message.unwrap_or_default().to_string(),
            },
            None => RemoteError::Other(raw.to_string()),
        }
    }
}

/// Errors resolving the autoscaling group of an instance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AutoscalingError {
    /// The instance is not part of any autoscaling group. Expected for standalone hosts.
    #[error("no autoscaling group found for {0}")]
    NotFound(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let error = RemoteError::from_parts(
            Some("InvalidParameterValue"),
            Some("The value NaN for parameter MetricData.member.1.Value is invalid."),
            "ignored",
        );
        assert_eq!(
            error.to_string(),
            "[InvalidParameterValue] The value NaN for parameter MetricData.member.1.Value is invalid."
        );
    }

    #[test]
    fn test_service_error_without_message() {
        let error = RemoteError::from_parts(Some("Throttling"), None, "ignored");
        assert_eq!(
            error,
            RemoteError::Service {
                code: "Throttling".to_string(),
                message: String::new(),
            }
        );
    }

    #[test]
    fn test_missing_code_keeps_raw_error() {
        let error = RemoteError::from_parts(None, Some("message"), "dispatch failure: timed out");
        assert_eq!(
            error,
            RemoteError::Other("dispatch failure: timed out".to_string())
        );
    }

    #[test]
    fn test_construction_failure_is_not_a_service_error() {
        let sdk_error: SdkError<aws_sdk_cloudwatch::operation::put_metric_data::PutMetricDataError, ()> =
            SdkError::construction_failure("invalid namespace");
        let error = RemoteError::from_sdk(sdk_error);
        match error {
            RemoteError::Other(raw) => assert!(raw.contains("invalid namespace")),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_service_error_keeps_code_and_message() {
        let sdk_error: SdkError<aws_sdk_cloudwatch::operation::put_metric_data::PutMetricDataError, ()> =
            SdkError::service_error(
                aws_sdk_cloudwatch::operation::put_metric_data::PutMetricDataError::generic(
                    aws_sdk_cloudwatch::error::ErrorMetadata::builder()
                        .code("InvalidParameterValue")
                        .message("bad")
                        .build(),
                ),
                (),
            );

        assert_eq!(
            RemoteError::from_sdk(sdk_error),
            RemoteError::Service {
                code: "InvalidParameterValue".to_string(),
                message: "bad".to_string(),
            }
        );
    }

    #[test]
    fn test_not_found_is_distinct_from_remote() {
        let not_found = AutoscalingError::NotFound("i-123".to_string());
        assert_eq!(not_found.to_string(), "no autoscaling group found for i-123");

        let remote: AutoscalingError = RemoteError::Other("boom".to_string()).into();
        assert!(matches!(remote, AutoscalingError::Remote(_)));
        assert_eq!(remote.to_string(), "boom");
    }
}
