//! Discharge segmentation.
//!
//! A series of readings is split into segments at recharge boundaries: a
//! reading whose value strictly exceeds its predecessor starts a new
//! segment. Equal consecutive values (a flat period) stay in the current
//! segment. A meter correction that raises the value is indistinguishable
//! from a recharge and is treated as one.

use crate::storage::Reading;

/// One uninterrupted discharge period: a maximal run of readings with
/// non-increasing values. Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub readings: Vec<Reading>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn first(&self) -> Option<&Reading> {
        self.readings.first()
    }

    pub fn last(&self) -> Option<&Reading> {
        self.readings.last()
    }
}

/// Partition a chronological series into discharge segments.
///
/// The first reading opens the first segment. Every later reading either
/// extends the current segment (value less than or equal to its
/// predecessor) or opens a new one (value strictly greater). An empty
/// series yields no segments; any non-empty series yields at least one.
pub fn segment(series: &[Reading]) -> Vec<Segment> {
    let Some(first) = series.first() else {
        return Vec::new();
    };

    let mut segments = Vec::new();
    let mut current = vec![first.clone()];

    for pair in series.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.value > prev.value {
            segments.push(Segment { readings: current });
            current = vec![next.clone()];
        } else {
            current.push(next.clone());
        }
    }
    segments.push(Segment { readings: current });

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn reading(secs: i64, value: f64) -> Reading {
        Reading {
            recorded_at: Utc.timestamp_opt(secs, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn single_reading_yields_one_segment() {
        let segments = segment(&[reading(0, 80.0)]);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 1);
    }

    #[test]
    fn monotonic_discharge_is_one_segment() {
        let series = vec![reading(0, 80.0), reading(3600, 70.0), reading(7200, 60.0)];
        let segments = segment(&series);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].readings, series);
    }

    #[test]
    fn recharge_starts_a_new_segment() {
        let series = vec![
            reading(0, 80.0),
            reading(3600, 70.0),
            reading(7200, 90.0),
            reading(10800, 85.0),
        ];
        let segments = segment(&series);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].readings, &series[..2]);
        assert_eq!(segments[1].readings, &series[2..]);
    }

    #[test]
    fn flat_period_stays_in_the_same_segment() {
        let series = vec![reading(0, 80.0), reading(3600, 80.0), reading(7200, 75.0)];
        let segments = segment(&series);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 3);
    }

    #[test]
    fn recharge_as_last_reading_yields_trailing_singleton() {
        let series = vec![reading(0, 80.0), reading(3600, 70.0), reading(7200, 95.0)];
        let segments = segment(&series);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].len(), 1);
        assert_eq!(segments[1].first().unwrap().value, 95.0);
    }

    #[test]
    fn empty_series_yields_no_segments() {
        assert!(segment(&[]).is_empty());
    }

    proptest! {
        /// Concatenating the segments reproduces the input series exactly,
        /// every segment is internally non-increasing, and each segment
        /// after the first starts strictly above its predecessor's last
        /// value.
        #[test]
        fn segmentation_invariants(values in proptest::collection::vec(0.0f64..200.0, 1..40)) {
            let series: Vec<Reading> = values
                .iter()
                .enumerate()
                .map(|(i, v)| reading(i as i64 * 600, *v))
                .collect();

            let segments = segment(&series);

            let rejoined: Vec<Reading> = segments
                .iter()
                .flat_map(|s| s.readings.iter().cloned())
                .collect();
            prop_assert_eq!(&rejoined, &series);

            for seg in &segments {
                prop_assert!(!seg.is_empty());
                for pair in seg.readings.windows(2) {
                    prop_assert!(pair[1].value <= pair[0].value);
                }
            }

            for pair in segments.windows(2) {
                let boundary_prev = pair[0].last().unwrap().value;
                let boundary_next = pair[1].first().unwrap().value;
                prop_assert!(boundary_next > boundary_prev);
            }
        }
    }
}
