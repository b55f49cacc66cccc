// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::metadata::{
    InstanceMetadata, FILE_SYSTEM_KEY, IMAGE_ID_KEY, INSTANCE_ID_KEY, INSTANCE_TYPE_KEY,
};
use serde::Serialize;

/// Dimension name used for autoscaling group level datums.
pub const AUTOSCALING_GROUP_DIMENSION: &str = "AutoScalingGroupName";

/// Metadata keys and the dimension names they are published under, in emission order.
const DIMENSION_FIELDS: [(&str, &str); 4] = [
    (INSTANCE_ID_KEY, "InstanceId"),
    (IMAGE_ID_KEY, "ImageId"),
    (INSTANCE_TYPE_KEY, "InstanceType"),
    (FILE_SYSTEM_KEY, "FileSystem"),
];

/// A name/value pair identifying a metric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Dimension {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Maps metadata to dimensions in the fixed order InstanceId, ImageId, InstanceType,
/// FileSystem, skipping fields the metadata does not have.
#[must_use]
pub fn build_dimensions(metadata: &InstanceMetadata) -> Vec<Dimension> {
    DIMENSION_FIELDS
        .iter()
        .filter_map(|(key, name)| metadata.get(key).map(|value| Dimension::new(*name, value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(dimensions: &[Dimension]) -> Vec<&str> {
        dimensions.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_all_fields_present() {
        let metadata: InstanceMetadata = [
            ("fileSystem", "/"),
            ("instanceType", "t2.micro"),
            ("imageId", "ami-1"),
            ("instanceId", "i-123"),
        ]
        .into_iter()
        .collect();

        let dimensions = build_dimensions(&metadata);
        assert_eq!(
            names(&dimensions),
            vec!["InstanceId", "ImageId", "InstanceType", "FileSystem"]
        );
        assert_eq!(dimensions[0], Dimension::new("InstanceId", "i-123"));
        assert_eq!(dimensions[3], Dimension::new("FileSystem", "/"));
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let metadata: InstanceMetadata = [("fileSystem", "/data"), ("instanceId", "i-123")]
            .into_iter()
            .collect();

        let dimensions = build_dimensions(&metadata);
        assert_eq!(names(&dimensions), vec!["InstanceId", "FileSystem"]);
    }

    #[test]
    fn test_empty_metadata() {
        assert!(build_dimensions(&InstanceMetadata::new()).is_empty());
    }

    #[test]
    fn test_unrelated_fields_are_ignored() {
        let metadata: InstanceMetadata = [("region", "eu-west-1"), ("accountId", "123456789012")]
            .into_iter()
            .collect();
        assert!(build_dimensions(&metadata).is_empty());
    }
}
