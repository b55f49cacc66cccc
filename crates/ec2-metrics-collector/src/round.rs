// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Half-up rounding for reported values.
//!
//! CloudWatch receives whole percentages, so every ratio goes through [`round`]. The rounding
//! is `floor(x + 0.5)`: halves always move toward positive infinity (`2.5 -> 3`,
//! `-2.5 -> -2`), unlike `f64::round` which moves them away from zero.

/// Rounds `value` half-up.
///
/// # Examples
///
/// ```
/// use ec2_metrics_collector::round::round;
///
/// assert_eq!(round(2.5), 3.0);
/// assert_eq!(round(-2.5), -2.0);
/// assert_eq!(round(74.49), 74.0);
/// ```
#[must_use]
pub fn round(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Rounds `value` half-up to `places` decimal places.
///
/// # Examples
///
/// ```
/// use ec2_metrics_collector::round::round_plus;
///
/// assert_eq!(round_plus(123.456, 2), 123.46);
/// assert_eq!(round_plus(123.454, 2), 123.45);
/// ```
#[must_use]
pub fn round_plus(value: f64, places: i32) -> f64 {
    let shift = 10f64.powi(places);
    round(value * shift) / shift
}

/// Returns `part` as a percentage of `whole`.
///
/// A zero or non-finite `whole` yields `0.0` rather than NaN or infinity; some filesystems
/// report zero blocks or zero inodes.
#[must_use]
pub fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 || !whole.is_finite() {
        return 0.0;
    }
    part / whole * 100.0
}
