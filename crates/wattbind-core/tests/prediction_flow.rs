//! End-to-end prediction scenarios over a real (on-disk) history store.

use chrono::{TimeZone, Utc};
use wattbind_core::{predict_depletion, segment, HistoryDb, Reading, RoomKey};

const T0: i64 = 1_700_000_000;

fn reading(offset_secs: i64, value: f64) -> Reading {
    Reading {
        recorded_at: Utc.timestamp_opt(T0 + offset_secs, 0).unwrap(),
        value,
    }
}

fn room() -> RoomKey {
    RoomKey::new("云塘", "至诚轩5栋A区", "A544")
}

#[test]
fn steady_discharge_predicts_eight_hours_out() {
    let dir = tempfile::tempdir().unwrap();
    let db = HistoryDb::open_at(&dir.path().join("wattbind.db")).unwrap();

    // 80 -> 70 -> 60 over two hours: -10 kWh/hour, empty at t0 + 8h.
    db.append(&room(), &reading(0, 80.0)).unwrap();
    db.append(&room(), &reading(3600, 70.0)).unwrap();
    db.append(&room(), &reading(7200, 60.0)).unwrap();

    let series = db.series(&room()).unwrap();
    assert_eq!(segment(&series).len(), 1);

    let result = predict_depletion(&db, &room()).unwrap().unwrap();
    assert!((result.slope_per_second - (-10.0 / 3600.0)).abs() < 1e-12);

    let exhaustion = result.exhaustion_time.unwrap();
    let expected = Utc.timestamp_opt(T0 + 8 * 3600, 0).unwrap();
    assert!((exhaustion - expected).num_seconds().abs() <= 1);
}

#[test]
fn recharge_splits_history_and_prediction_uses_the_new_era() {
    let dir = tempfile::tempdir().unwrap();
    let db = HistoryDb::open_at(&dir.path().join("wattbind.db")).unwrap();

    db.append(&room(), &reading(0, 80.0)).unwrap();
    db.append(&room(), &reading(3600, 70.0)).unwrap();
    db.append(&room(), &reading(7200, 90.0)).unwrap(); // recharge
    db.append(&room(), &reading(10800, 85.0)).unwrap();

    let series = db.series(&room()).unwrap();
    let segments = segment(&series);
    assert_eq!(segments.len(), 2);
    assert_eq!(
        segments[0]
            .readings
            .iter()
            .map(|r| r.value)
            .collect::<Vec<_>>(),
        vec![80.0, 70.0]
    );
    assert_eq!(
        segments[1]
            .readings
            .iter()
            .map(|r| r.value)
            .collect::<Vec<_>>(),
        vec![90.0, 85.0]
    );

    // -5 kWh/hour from the post-recharge era, not -10 from the old one.
    let result = predict_depletion(&db, &room()).unwrap().unwrap();
    assert!((result.slope_per_second - (-5.0 / 3600.0)).abs() < 1e-12);
}

#[test]
fn single_reading_gives_one_segment_and_no_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let db = HistoryDb::open_at(&dir.path().join("wattbind.db")).unwrap();

    db.append(&room(), &reading(0, 80.0)).unwrap();

    let series = db.series(&room()).unwrap();
    assert_eq!(segment(&series).len(), 1);
    assert!(predict_depletion(&db, &room()).unwrap().is_none());
}

#[test]
fn appends_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wattbind.db");

    {
        let db = HistoryDb::open_at(&path).unwrap();
        assert!(db.append(&room(), &reading(0, 80.0)).unwrap());
        assert!(!db.append(&room(), &reading(600, 80.0)).unwrap());
        assert!(db.append(&room(), &reading(3600, 71.5)).unwrap());
    }

    let db = HistoryDb::open_at(&path).unwrap();
    let series = db.series(&room()).unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series[1].value, 71.5);

    // The dedup guard also applies across reopens.
    assert!(!db.append(&room(), &reading(7200, 71.5)).unwrap());
}
