//! Least-squares trend fitting over a discharge segment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::segment::Segment;

/// A fitted discharge trend. Ephemeral, derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Fitted slope in balance units per second. Always negative.
    pub slope_per_second: f64,
    /// Fitted value at the epoch (the regression intercept).
    pub intercept_value: f64,
    /// Projected zero-crossing instant. None when the projected epoch
    /// falls outside the representable calendar range.
    pub exhaustion_time: Option<DateTime<Utc>>,
}

/// Average consumption over a segment, for trend summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentConsumption {
    /// Balance units consumed between the first and last reading.
    pub units_used: f64,
    pub duration_hours: f64,
    /// Average discharge rate in units per hour.
    pub units_per_hour: f64,
    /// The same rate expressed in watts (one unit = 1 kWh).
    pub watts: f64,
}

fn epoch_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp_millis() as f64 / 1000.0
}

/// Fit ordinary least squares `value = slope * t + intercept` over a
/// segment's readings (t in epoch seconds) and project the zero crossing.
///
/// Returns None when the segment has fewer than two readings, when all
/// readings share a timestamp, or when the fitted slope is not negative
/// (a flat or rising trend has no meaningful depletion time).
pub fn fit(segment: &Segment) -> Option<PredictionResult> {
    if segment.len() < 2 {
        return None;
    }

    let n = segment.len() as f64;
    let t_mean = segment
        .readings
        .iter()
        .map(|r| epoch_seconds(&r.recorded_at))
        .sum::<f64>()
        / n;
    let v_mean = segment.readings.iter().map(|r| r.value).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for r in &segment.readings {
        let dt = epoch_seconds(&r.recorded_at) - t_mean;
        sxx += dt * dt;
        sxy += dt * (r.value - v_mean);
    }

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    if !slope.is_finite() || slope >= 0.0 {
        return None;
    }
    let intercept = v_mean - slope * t_mean;

    let zero_epoch = -intercept / slope;
    let exhaustion_time = if zero_epoch.is_finite() {
        let secs = zero_epoch.floor() as i64;
        let nanos = ((zero_epoch - zero_epoch.floor()) * 1e9) as u32;
        DateTime::from_timestamp(secs, nanos)
    } else {
        None
    };

    Some(PredictionResult {
        slope_per_second: slope,
        intercept_value: intercept,
        exhaustion_time,
    })
}

/// Average discharge rate over a segment. None for segments with fewer
/// than two readings or no elapsed time.
pub fn segment_consumption(segment: &Segment) -> Option<SegmentConsumption> {
    let first = segment.first()?;
    let last = segment.last()?;
    if segment.len() < 2 {
        return None;
    }

    let duration_hours =
        (epoch_seconds(&last.recorded_at) - epoch_seconds(&first.recorded_at)) / 3600.0;
    if duration_hours <= 0.0 {
        return None;
    }

    let units_used = first.value - last.value;
    let units_per_hour = units_used / duration_hours;
    Some(SegmentConsumption {
        units_used,
        duration_hours,
        units_per_hour,
        watts: units_per_hour * 1000.0,
    })
}
