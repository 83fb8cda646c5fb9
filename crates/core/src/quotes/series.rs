use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

/// One intraday observation. The timestamp keeps the exchange's UTC offset
/// so RFC 3339 serialization preserves timezone info end to end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub timestamp: DateTime<FixedOffset>,
    pub close: f64,
}

/// Ascending (timestamp, close) pairs for one symbol, nulls already dropped.
/// Reconstructed per request, never persisted.
pub type PriceSeries = Vec<PricePoint>;

/// Restricts a series to its most recent calendar day.
///
/// The day is the local-offset date of the last point; every returned point
/// falls on that date. `None` when the series is empty.
pub fn last_day(series: &[PricePoint]) -> Option<(NaiveDate, Vec<PricePoint>)> {
    let date = series.last()?.timestamp.date_naive();
    let points = series
        .iter()
        .filter(|p| p.timestamp.date_naive() == date)
        .cloned()
        .collect();
    Some((date, points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(day: u32, hour: u32, min: u32, close: f64) -> PricePoint {
        let est = chrono::FixedOffset::west_opt(5 * 3600).unwrap();
        PricePoint {
            timestamp: est.with_ymd_and_hms(2024, 3, day, hour, min, 0).unwrap(),
            close,
        }
    }

    #[test]
    fn keeps_only_the_latest_date() {
        let series = vec![
            point(11, 15, 59, 100.0),
            point(12, 9, 30, 101.0),
            point(12, 9, 31, 101.5),
        ];

        let (date, points) = last_day(&series).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(points, vec![point(12, 9, 30, 101.0), point(12, 9, 31, 101.5)]);
        assert!(points.iter().all(|p| p.timestamp.date_naive() == date));
    }

    #[test]
    fn date_matches_the_last_timestamp() {
        let series = vec![point(11, 9, 30, 99.0), point(11, 16, 0, 100.0)];
        let (date, points) = last_day(&series).unwrap();
        assert_eq!(date, points.last().unwrap().timestamp.date_naive());
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn empty_series_has_no_last_day() {
        assert!(last_day(&[]).is_none());
    }

    #[test]
    fn serializes_timestamp_with_offset() {
        let v = serde_json::to_value(point(12, 9, 30, 101.25)).unwrap();
        assert_eq!(v["timestamp"], "2024-03-12T09:30:00-05:00");
        assert_eq!(v["close"], 101.25);
    }
}
