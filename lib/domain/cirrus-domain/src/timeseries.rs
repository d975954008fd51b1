use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub granularity: f64,
}

impl Measure {
    pub fn new(timestamp: DateTime<Utc>, value: f64, granularity: f64) -> Self {
        Self {
            timestamp,
            value,
            granularity,
        }
    }
}

/// Latest finite measure. On equal timestamps the later entry wins.
pub fn latest_measure(measures: &[Measure]) -> Option<&Measure> {
    measures
        .iter()
        .filter(|measure| measure.value.is_finite())
        .fold(None, |latest: Option<&Measure>, measure| match latest {
            Some(current) if current.timestamp > measure.timestamp => Some(current),
            _ => Some(measure),
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub tenant_name: String,
    pub resource_id: String,
    pub metric_name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, minute, 0).unwrap()
    }

    #[test]
    fn latest_measure_picks_most_recent_timestamp() {
        let measures = vec![Measure::new(at(5), 5.0, 300.0), Measure::new(at(10), 9.0, 300.0)];
        assert_eq!(latest_measure(&measures).map(|m| m.value), Some(9.0));
    }

    #[test]
    fn latest_measure_does_not_depend_on_order() {
        let measures = vec![Measure::new(at(10), 9.0, 300.0), Measure::new(at(5), 5.0, 300.0)];
        assert_eq!(latest_measure(&measures).map(|m| m.value), Some(9.0));
    }

    #[test]
    fn latest_measure_skips_non_finite_values() {
        let later = at(10) + Duration::seconds(1);
        let measures = vec![Measure::new(at(10), 3.0, 60.0), Measure::new(later, f64::NAN, 60.0)];
        assert_eq!(latest_measure(&measures).map(|m| m.value), Some(3.0));
    }

    #[test]
    fn empty_window_has_no_latest() {
        assert!(latest_measure(&[]).is_none());
    }
}
