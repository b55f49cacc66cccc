// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Metric datums and the batch they are assembled into before submission.

use crate::dimensions::Dimension;
use serde::Serialize;
use std::fmt;

/// Largest number of datums CloudWatch accepts in one `PutMetricData` request.
///
/// [`MetricBatch`] never splits itself; callers with larger batches use
/// [`MetricBatch::chunks`].
pub const MAX_DATUMS_PER_REQUEST: usize = 1000;

/// CloudWatch standard units used by the host collectors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    Percent,
    Bytes,
    Count,
    None,
}

impl Unit {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Percent => "Percent",
            Unit::Bytes => "Bytes",
            Unit::Count => "Count",
            Unit::None => "None",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDatum {
    pub name: String,
    pub unit: Unit,
    pub value: f64,
    pub dimensions: Vec<Dimension>,
}

/// Ordered list of datums for one submission.
///
/// Appending keeps insertion order and never deduplicates: the same metric name with
/// different dimensions is a distinct CloudWatch series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricBatch {
    data: Vec<MetricDatum>,
}

impl MetricBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a datum built from its parts.
    pub fn add_metric(
        &mut self,
        name: impl Into<String>,
        unit: Unit,
        value: f64,
        dimensions: Vec<Dimension>,
    ) -> &mut Self {
        self.push(MetricDatum {
            name: name.into(),
            unit,
            value,
            dimensions,
        })
    }

    pub fn push(&mut self, datum: MetricDatum) -> &mut Self {
        self.data.push(datum);
        self
    }

    /// Moves every datum of `other` to the end of this batch.
    pub fn append(&mut self, other: MetricBatch) -> &mut Self {
        self.data.extend(other.data);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetricDatum> {
        self.data.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[MetricDatum] {
        &self.data
    }

    /// Splits the batch into request-sized slices of at most `max` datums, in order.
    pub fn chunks(&self, max: usize) -> std::slice::Chunks<'_, MetricDatum> {
        self.data.chunks(max.max(1))
    }
}

impl<'a> IntoIterator for &'a MetricBatch {
    type Item = &'a MetricDatum;
    type IntoIter = std::slice::Iter<'a, MetricDatum>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for MetricBatch {
    type Item = MetricDatum;
    type IntoIter = std::vec::IntoIter<MetricDatum>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}
