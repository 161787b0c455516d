//! Temporal enrichment of series points
//!
//! Annotates each dated value with calendar features (weekday, ISO week,
//! month, quarter, weekend flag, sine/cosine cyclical encodings) and groups
//! points by period for seasonality analysis.

use chrono::{DateTime, Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

use crate::error::{Error, Result};
use crate::stats;

/// Sine/cosine encodings of the cyclical calendar features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclicalFeatures {
    pub day_of_week_sin: f64,
    pub day_of_week_cos: f64,
    pub month_sin: f64,
    pub month_cos: f64,
    pub day_of_year_sin: f64,
    pub day_of_year_cos: f64,
}

/// A series value annotated with calendar features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalPoint {
    pub date: NaiveDate,
    pub value: f64,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    pub day_of_month: u32,
    /// ISO 8601 week number
    pub week_of_year: u32,
    /// 1-12
    pub month: u32,
    /// 1-4
    pub quarter: u32,
    pub is_weekend: bool,
    pub cyclical: CyclicalFeatures,
}

/// Calendar period used for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Month,
    Quarter,
    DayOfWeek,
}

impl PeriodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Month => "month",
            PeriodKind::Quarter => "quarter",
            PeriodKind::DayOfWeek => "day_of_week",
        }
    }

    pub fn all() -> &'static [PeriodKind] {
        &[PeriodKind::Month, PeriodKind::Quarter, PeriodKind::DayOfWeek]
    }

    fn key(&self, point: &TemporalPoint) -> u32 {
        match self {
            PeriodKind::Month => point.month,
            PeriodKind::Quarter => point.quarter,
            PeriodKind::DayOfWeek => point.day_of_week,
        }
    }

    /// Group values by this period's key
    pub fn group(&self, points: &[TemporalPoint]) -> BTreeMap<u32, Vec<f64>> {
        let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for point in points {
            groups.entry(self.key(point)).or_default().push(point.value);
        }
        groups
    }

    /// Human-readable name of a group key
    pub fn label(&self, key: u32) -> String {
        match self {
            PeriodKind::Month => [
                "January",
                "February",
                "March",
                "April",
                "May",
                "June",
                "July",
                "August",
                "September",
                "October",
                "November",
                "December",
            ]
            .get(key.saturating_sub(1) as usize)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("month {}", key)),
            PeriodKind::Quarter => format!("Q{}", key),
            PeriodKind::DayOfWeek => [
                "Monday",
                "Tuesday",
                "Wednesday",
                "Thursday",
                "Friday",
                "Saturday",
                "Sunday",
            ]
            .get(key as usize)
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("weekday {}", key)),
        }
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sampling granularity inferred from date gaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

/// Map `value` on a cycle of length `period` onto the unit circle
pub fn cyclical_encoding(value: f64, period: f64) -> (f64, f64) {
    if period <= 0.0 {
        return (0.0, 1.0);
    }
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

fn days_in_year(year: i32) -> f64 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366.0
    } else {
        365.0
    }
}

/// Annotate one dated value
pub fn enrich_point(date: NaiveDate, value: f64) -> TemporalPoint {
    let day_of_week = date.weekday().num_days_from_monday();
    let month = date.month();
    let (day_of_week_sin, day_of_week_cos) = cyclical_encoding(day_of_week as f64, 7.0);
    let (month_sin, month_cos) = cyclical_encoding((month - 1) as f64, 12.0);
    let (day_of_year_sin, day_of_year_cos) =
        cyclical_encoding(date.ordinal0() as f64, days_in_year(date.year()));

    TemporalPoint {
        date,
        value,
        day_of_week,
        day_of_month: date.day(),
        week_of_year: date.iso_week().week(),
        month,
        quarter: (month - 1) / 3 + 1,
        is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        cyclical: CyclicalFeatures {
            day_of_week_sin,
            day_of_week_cos,
            month_sin,
            month_cos,
            day_of_year_sin,
            day_of_year_cos,
        },
    }
}

/// Annotate a whole series
pub fn enrich(points: &[(NaiveDate, f64)]) -> Vec<TemporalPoint> {
    points
        .iter()
        .map(|&(date, value)| enrich_point(date, value))
        .collect()
}

pub fn group_by_month(points: &[TemporalPoint]) -> BTreeMap<u32, Vec<f64>> {
    PeriodKind::Month.group(points)
}

pub fn group_by_quarter(points: &[TemporalPoint]) -> BTreeMap<u32, Vec<f64>> {
    PeriodKind::Quarter.group(points)
}

pub fn group_by_day_of_week(points: &[TemporalPoint]) -> BTreeMap<u32, Vec<f64>> {
    PeriodKind::DayOfWeek.group(points)
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp (date part kept)
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.date_naive())
        .map_err(|_| Error::InvalidData(format!("Unrecognized date: {}", s)))
}

/// Infer sampling granularity from the median gap between consecutive dates
pub fn infer_granularity(dates: &[NaiveDate]) -> Granularity {
    let gaps: Vec<f64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect();
    let median_gap = stats::median(&gaps);
    if median_gap <= 2.0 {
        Granularity::Daily
    } else if median_gap <= 10.0 {
        Granularity::Weekly
    } else {
        Granularity::Monthly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_enrich_point_calendar_fields() {
        // 2024-03-16 is a Saturday in ISO week 11
        let p = enrich_point(date(2024, 3, 16), 42.0);
        assert_eq!(p.day_of_week, 5);
        assert_eq!(p.day_of_month, 16);
        assert_eq!(p.week_of_year, 11);
        assert_eq!(p.month, 3);
        assert_eq!(p.quarter, 1);
        assert!(p.is_weekend);

        let monday = enrich_point(date(2024, 10, 7), 1.0);
        assert_eq!(monday.day_of_week, 0);
        assert_eq!(monday.quarter, 4);
        assert!(!monday.is_weekend);
    }

    #[test]
    fn test_cyclical_encoding_wraps() {
        let (s0, c0) = cyclical_encoding(0.0, 7.0);
        let (s7, c7) = cyclical_encoding(7.0, 7.0);
        assert!((s0 - s7).abs() < 1e-9);
        assert!((c0 - c7).abs() < 1e-9);
        assert_eq!(cyclical_encoding(3.0, 0.0), (0.0, 1.0));
    }

    #[test]
    fn test_group_by_periods() {
        let series: Vec<(NaiveDate, f64)> = (0..14)
            .map(|i| (date(2024, 1, 1) + chrono::Duration::days(i), i as f64))
            .collect();
        let points = enrich(&series);

        let weekdays = group_by_day_of_week(&points);
        assert_eq!(weekdays.len(), 7);
        assert!(weekdays.values().all(|v| v.len() == 2));

        assert_eq!(group_by_month(&points).len(), 1);
        assert_eq!(group_by_quarter(&points).keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_period_labels() {
        assert_eq!(PeriodKind::Month.label(12), "December");
        assert_eq!(PeriodKind::Quarter.label(3), "Q3");
        assert_eq!(PeriodKind::DayOfWeek.label(6), "Sunday");
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-05-01").unwrap(), date(2024, 5, 1));
        assert_eq!(
            parse_date("2024-05-01T13:45:00Z").unwrap(),
            date(2024, 5, 1)
        );
        assert!(parse_date("May 1st").is_err());
    }

    #[test]
    fn test_infer_granularity() {
        let daily: Vec<NaiveDate> = (0..5).map(|i| date(2024, 1, 1 + i)).collect();
        assert_eq!(infer_granularity(&daily), Granularity::Daily);

        let weekly: Vec<NaiveDate> = (0..5).map(|i| date(2024, 1, 1 + i * 7)).collect();
        assert_eq!(infer_granularity(&weekly), Granularity::Weekly);

        let monthly: Vec<NaiveDate> = (1..=5).map(|m| date(2024, m, 1)).collect();
        assert_eq!(infer_granularity(&monthly), Granularity::Monthly);
    }
}
