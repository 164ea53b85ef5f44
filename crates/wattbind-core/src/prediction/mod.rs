//! Electricity-depletion prediction.
//!
//! The pipeline: a room's reading history is split into discharge
//! segments at recharge boundaries, a least-squares line is fitted to the
//! most recent segment, and the zero crossing of that line is the
//! projected exhaustion time. Earlier segments are irrelevant -- a
//! recharge reset the baseline.

mod segment;
mod trend;

pub use segment::{segment, Segment};
pub use trend::{fit, segment_consumption, PredictionResult, SegmentConsumption};

use crate::error::StorageError;
use crate::storage::{HistoryDb, RoomKey};

/// Predict when a room's balance reaches zero, from its stored history.
///
/// Returns Ok(None) when no prediction is possible: fewer than two
/// readings overall, a single-reading latest segment, or a non-negative
/// fitted slope.
pub fn predict_depletion(
    history: &HistoryDb,
    room: &RoomKey,
) -> Result<Option<PredictionResult>, StorageError> {
    let series = history.series(room)?;
    if series.len() < 2 {
        return Ok(None);
    }

    let segments = segment(&series);
    let Some(latest) = segments.last() else {
        return Ok(None);
    };
    Ok(fit(latest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Reading;
    use chrono::{TimeZone, Utc};

    const T0: i64 = 1_700_000_000;

    fn reading(offset_secs: i64, value: f64) -> Reading {
        Reading {
            recorded_at: Utc.timestamp_opt(T0 + offset_secs, 0).unwrap(),
            value,
        }
    }

    fn room() -> RoomKey {
        RoomKey::new("North", "Building 5", "A544")
    }

    #[test]
    fn single_reading_has_no_prediction() {
        let db = HistoryDb::open_memory().unwrap();
        db.append(&room(), &reading(0, 80.0)).unwrap();
        assert!(predict_depletion(&db, &room()).unwrap().is_none());
    }

    #[test]
    fn empty_history_has_no_prediction() {
        let db = HistoryDb::open_memory().unwrap();
        assert!(predict_depletion(&db, &room()).unwrap().is_none());
    }

    #[test]
    fn prediction_uses_only_the_latest_segment() {
        let db = HistoryDb::open_memory().unwrap();
        // Old era: steep discharge. Recharge at +2h, then shallow discharge.
        db.append(&room(), &reading(0, 80.0)).unwrap();
        db.append(&room(), &reading(3600, 70.0)).unwrap();
        db.append(&room(), &reading(7200, 90.0)).unwrap();
        db.append(&room(), &reading(10800, 85.0)).unwrap();

        let result = predict_depletion(&db, &room()).unwrap().unwrap();
        // The latest segment discharges 5 units/hour from 90; the old
        // 10 units/hour era must not leak into the fit.
        assert!((result.slope_per_second - (-5.0 / 3600.0)).abs() < 1e-12);

        let exhaustion = result.exhaustion_time.unwrap();
        let expected = Utc.timestamp_opt(T0 + 7200 + 18 * 3600, 0).unwrap();
        assert!((exhaustion - expected).num_seconds().abs() <= 1);
    }

    #[test]
    fn recharge_followed_by_single_reading_is_unpredictable() {
        let db = HistoryDb::open_memory().unwrap();
        db.append(&room(), &reading(0, 80.0)).unwrap();
        db.append(&room(), &reading(3600, 70.0)).unwrap();
        db.append(&room(), &reading(7200, 95.0)).unwrap();

        assert!(predict_depletion(&db, &room()).unwrap().is_none());
    }
}
