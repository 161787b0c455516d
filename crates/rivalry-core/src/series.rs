//! Comparison series ingestion
//!
//! Upstream rows carry one value per term keyed by the term's display name.
//! Columns are matched to terms by normalized name (case, whitespace, hyphen
//! and underscore insensitive), never by position, and a term that matches
//! more than one column is rejected rather than guessed.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{TermRef, Terms};
use crate::temporal::parse_date;

fn separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s\-_]+").expect("valid regex"))
}

/// One sampled date with values keyed by column name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, column: impl Into<String>, value: f64) -> Self {
        self.values.insert(column.into(), Value::from(value));
        self
    }

    /// Finite numeric value of a column, if present
    pub fn value(&self, column: &str) -> Option<f64> {
        self.values
            .get(column)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }
}

/// Lowercase and strip whitespace, hyphens and underscores
pub fn normalize_term(name: &str) -> String {
    separator_re()
        .replace_all(name.trim(), "")
        .to_lowercase()
}

/// Find the single column whose normalized name matches `term`
pub fn resolve_column(points: &[SeriesPoint], term: &str) -> Result<String> {
    let wanted = normalize_term(term);
    let columns: BTreeSet<&String> = points.iter().flat_map(|p| p.values.keys()).collect();
    let matches: Vec<String> = columns
        .into_iter()
        .filter(|c| normalize_term(c) == wanted)
        .cloned()
        .collect();

    match matches.as_slice() {
        [] => Err(Error::TermNotFound(term.to_string())),
        [only] => Ok(only.clone()),
        _ => Err(Error::AmbiguousTerm {
            term: term.to_string(),
            columns: matches,
        }),
    }
}

/// Sort by date and keep the last row for each duplicated date
pub fn clean_series(points: &[SeriesPoint]) -> Vec<SeriesPoint> {
    let mut by_date: BTreeMap<NaiveDate, SeriesPoint> = BTreeMap::new();
    for point in points {
        if by_date.insert(point.date, point.clone()).is_some() {
            warn!(date = %point.date, "Duplicate series date, keeping last row");
        }
    }
    by_date.into_values().collect()
}

/// One term's dated values in date order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

impl TermSeries {
    pub fn new(name: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|(d, _)| *d).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|(d, _)| *d)
    }
}

/// Date-aligned view of both sides (dates present in both series only)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSeries {
    pub dates: Vec<NaiveDate>,
    pub term_a: Vec<f64>,
    pub term_b: Vec<f64>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// The two series under comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSeries {
    pub term_a: TermSeries,
    pub term_b: TermSeries,
}

impl ComparisonSeries {
    /// Build from upstream rows, matching each term to its column by normalized name
    pub fn from_points(points: &[SeriesPoint], terms: &Terms) -> Result<Self> {
        let cleaned = clean_series(points);
        let column_a = resolve_column(&cleaned, &terms.term_a)?;
        let column_b = resolve_column(&cleaned, &terms.term_b)?;
        if column_a == column_b {
            return Err(Error::InvalidData(format!(
                "Both terms resolve to column {}",
                column_a
            )));
        }

        let extract = |column: &str| -> Vec<(NaiveDate, f64)> {
            cleaned
                .iter()
                .filter_map(|p| p.value(column).map(|v| (p.date, v)))
                .collect()
        };

        let series = Self {
            term_a: TermSeries::new(terms.term_a.clone(), extract(&column_a)),
            term_b: TermSeries::new(terms.term_b.clone(), extract(&column_b)),
        };

        debug!(
            rows = points.len(),
            term_a_points = series.term_a.len(),
            term_b_points = series.term_b.len(),
            "Resolved comparison series"
        );
        Ok(series)
    }

    /// Build from parallel columns that must share one date axis
    pub fn from_columns(
        terms: &Terms,
        dates: &[NaiveDate],
        term_a: &[f64],
        term_b: &[f64],
    ) -> Result<Self> {
        if dates.len() != term_a.len() {
            return Err(Error::SeriesMisaligned {
                left: dates.len(),
                right: term_a.len(),
            });
        }
        if term_a.len() != term_b.len() {
            return Err(Error::SeriesMisaligned {
                left: term_a.len(),
                right: term_b.len(),
            });
        }

        let points: Vec<SeriesPoint> = dates
            .iter()
            .zip(term_a.iter().zip(term_b))
            .map(|(&date, (&a, &b))| {
                SeriesPoint::new(date)
                    .with_value(terms.term_a.clone(), a)
                    .with_value(terms.term_b.clone(), b)
            })
            .collect();
        Self::from_points(&points, terms)
    }

    pub fn term(&self, term: TermRef) -> &TermSeries {
        match term {
            TermRef::TermB => &self.term_b,
            _ => &self.term_a,
        }
    }

    /// Join both sides on date
    pub fn aligned(&self) -> AlignedSeries {
        let b_by_date: BTreeMap<NaiveDate, f64> = self.term_b.points.iter().copied().collect();
        let mut aligned = AlignedSeries::default();
        for &(date, a) in &self.term_a.points {
            if let Some(&b) = b_by_date.get(&date) {
                aligned.dates.push(date);
                aligned.term_a.push(a);
                aligned.term_b.push(b);
            }
        }
        aligned
    }

    /// Latest date present on either side
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.term_a.last_date().max(self.term_b.last_date())
    }

    /// Canonical rows keyed by term name, used for input hashing
    pub fn to_points(&self) -> Vec<SeriesPoint> {
        let mut rows: BTreeMap<NaiveDate, SeriesPoint> = BTreeMap::new();
        for side in [&self.term_a, &self.term_b] {
            for &(date, value) in &side.points {
                let row = rows.entry(date).or_insert_with(|| SeriesPoint::new(date));
                row.values.insert(side.name.clone(), Value::from(value));
            }
        }
        rows.into_values().collect()
    }
}

/// Read a `date,<column>,<column>...` table; blank or non-numeric cells are skipped
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<SeriesPoint>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let date_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("date"))
        .unwrap_or(0);

    let mut points = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let Some(raw_date) = record.get(date_idx) else {
            continue;
        };
        let mut point = SeriesPoint::new(parse_date(raw_date)?);

        for (idx, header) in headers.iter().enumerate() {
            if idx == date_idx {
                continue;
            }
            match record.get(idx).map(str::parse::<f64>) {
                Some(Ok(v)) if v.is_finite() => {
                    point.values.insert(header.to_string(), Value::from(v));
                }
                Some(_) => {
                    debug!(date = raw_date, column = header, "Skipping non-numeric cell");
                }
                None => {}
            }
        }
        points.push(point);
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_normalize_term() {
        assert_eq!(normalize_term("Visual Studio-Code"), "visualstudiocode");
        assert_eq!(normalize_term("  rust_lang "), "rustlang");
    }

    #[test]
    fn test_resolve_column_by_normalized_name() {
        let points = vec![SeriesPoint::new(date(1))
            .with_value("Visual Studio Code", 10.0)
            .with_value("Sublime-Text", 5.0)];
        assert_eq!(
            resolve_column(&points, "visual-studio-code").unwrap(),
            "Visual Studio Code"
        );
        assert_eq!(resolve_column(&points, "sublime text").unwrap(), "Sublime-Text");
        assert!(matches!(
            resolve_column(&points, "vim"),
            Err(Error::TermNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_column_rejects_ambiguity() {
        let points = vec![SeriesPoint::new(date(1))
            .with_value("Foo Bar", 1.0)
            .with_value("foo-bar", 2.0)];
        match resolve_column(&points, "foobar") {
            Err(Error::AmbiguousTerm { columns, .. }) => assert_eq!(columns.len(), 2),
            other => panic!("expected ambiguity error, got {:?}", other),
        }
    }

    #[test]
    fn test_clean_series_sorts_and_dedupes() {
        let points = vec![
            SeriesPoint::new(date(3)).with_value("a", 3.0),
            SeriesPoint::new(date(1)).with_value("a", 1.0),
            SeriesPoint::new(date(3)).with_value("a", 30.0),
        ];
        let cleaned = clean_series(&points);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].date, date(1));
        assert_eq!(cleaned[1].value("a"), Some(30.0));
    }

    #[test]
    fn test_from_points_ignores_column_order() {
        let terms = Terms::new("Rust", "Go");
        let points = vec![
            SeriesPoint::new(date(1)).with_value("go", 20.0).with_value("rust", 10.0),
            SeriesPoint::new(date(2)).with_value("go", 21.0).with_value("rust", 11.0),
        ];
        let series = ComparisonSeries::from_points(&points, &terms).unwrap();
        assert_eq!(series.term_a.values(), vec![10.0, 11.0]);
        assert_eq!(series.term_b.values(), vec![20.0, 21.0]);
        assert_eq!(series.term_a.name, "Rust");
    }

    #[test]
    fn test_from_columns_length_mismatch_fails() {
        let terms = Terms::new("a", "b");
        let result = ComparisonSeries::from_columns(&terms, &[date(1), date(2)], &[1.0, 2.0], &[1.0]);
        assert!(matches!(
            result,
            Err(Error::SeriesMisaligned { left: 2, right: 1 })
        ));
    }

    #[test]
    fn test_aligned_uses_dates_not_indices() {
        let series = ComparisonSeries {
            term_a: TermSeries::new("a", vec![(date(1), 1.0), (date(2), 2.0), (date(3), 3.0)]),
            term_b: TermSeries::new("b", vec![(date(2), 20.0), (date(3), 30.0), (date(4), 40.0)]),
        };
        let aligned = series.aligned();
        assert_eq!(aligned.dates, vec![date(2), date(3)]);
        assert_eq!(aligned.term_a, vec![2.0, 3.0]);
        assert_eq!(aligned.term_b, vec![20.0, 30.0]);
    }

    #[test]
    fn test_read_csv() {
        let data = "Date,Rust,Go\n2024-01-01,10,20\n2024-01-02,,21\n2024-01-03,12,n/a\n";
        let points = read_csv(data.as_bytes()).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].value("Rust"), Some(10.0));
        assert_eq!(points[1].value("Rust"), None);
        assert_eq!(points[2].value("Go"), None);
    }

    #[test]
    fn test_series_point_json_shape() {
        let json = r#"{"date":"2024-01-05","Rust":42,"Go":17.5}"#;
        let point: SeriesPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.value("Rust"), Some(42.0));
        assert_eq!(point.value("Go"), Some(17.5));
        assert_eq!(point.date, date(5));
    }
}
