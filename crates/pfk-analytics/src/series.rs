//! Date-indexed value series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One `(date, value)` point. Serializes as `{"date": "YYYY-MM-DD", "value": ..}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

/// Ascending, duplicate-free series of dated values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DateSeries {
    points: Vec<DatedValue>,
}

impl DateSeries {
    /// Sorts by date; on duplicate dates the first point wins.
    pub fn new(mut points: Vec<DatedValue>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self { points }
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, value)| DatedValue { date, value })
                .collect(),
        )
    }

    pub fn points(&self) -> &[DatedValue] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&DatedValue> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&DatedValue> {
        self.points.last()
    }

    /// Most recent value at or before `date`.
    ///
    /// `None` when `date` precedes the series or the found value is NaN.
    pub fn asof(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.points.partition_point(|p| p.date <= date);
        if idx == 0 {
            return None;
        }
        let v = self.points[idx - 1].value;
        (!v.is_nan()).then_some(v)
    }

    /// Maximum value seen up to and including each point.
    pub fn running_peak(&self) -> Vec<f64> {
        let mut peak = f64::NEG_INFINITY;
        self.points
            .iter()
            .map(|p| {
                peak = peak.max(p.value);
                peak
            })
            .collect()
    }

    /// `(value - peak) / peak` at each point; always <= 0 for positive values.
    pub fn drawdowns(&self) -> Vec<f64> {
        self.points
            .iter()
            .zip(self.running_peak())
            .map(|(p, peak)| (p.value - peak) / peak)
            .collect()
    }

    /// Date of the deepest drawdown and its depth. Ties keep the earliest date.
    pub fn max_drawdown_point(&self) -> Option<(NaiveDate, f64)> {
        let mut best: Option<(NaiveDate, f64)> = None;
        for (p, dd) in self.points.iter().zip(self.drawdowns()) {
            if dd.is_nan() {
                continue;
            }
            match best {
                Some((_, b)) if dd >= b => {}
                _ => best = Some((p.date, dd)),
            }
        }
        best
    }

    /// Date of the highest value on or before `until`. Ties keep the earliest date.
    pub fn argmax_through(&self, until: NaiveDate) -> Option<NaiveDate> {
        let mut best: Option<&DatedValue> = None;
        for p in self.points.iter().take_while(|p| p.date <= until) {
            if p.value.is_nan() {
                continue;
            }
            match best {
                Some(b) if p.value <= b.value => {}
                _ => best = Some(p),
            }
        }
        best.map(|p| p.date)
    }

    /// Day-over-day fractional change. The first point has none.
    pub fn pct_change(&self) -> Vec<(NaiveDate, Option<f64>)> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let prev = if i == 0 { None } else { Some(self.points[i - 1].value) };
                (p.date, prev.and_then(|prev| finite(p.value / prev - 1.0)))
            })
            .collect()
    }

    /// Change from the previous point to the point dated exactly `date`.
    pub fn pct_change_on(&self, date: NaiveDate) -> Option<f64> {
        let idx = self.points.binary_search_by_key(&date, |p| p.date).ok()?;
        if idx == 0 {
            return None;
        }
        finite(self.points[idx].value / self.points[idx - 1].value - 1.0)
    }

    /// Fractional change between the as-of values at `start` and `end`.
    ///
    /// `None` when the window lies entirely outside the series, either as-of
    /// lookup finds nothing, or the ratio is not finite.
    pub fn period_return(&self, start: NaiveDate, end: NaiveDate) -> Option<f64> {
        let (first, last) = (self.first()?.date, self.last()?.date);
        if end < first || start > last {
            return None;
        }
        let start_val = self.asof(start)?;
        let end_val = self.asof(end)?;
        finite(end_val / start_val - 1.0)
    }
}

fn finite(x: f64) -> Option<f64> {
    x.is_finite().then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn new_sorts_and_drops_duplicate_dates() {
        let s = DateSeries::from_pairs([(d(2024, 1, 3), 2.0), (d(2024, 1, 2), 1.0), (d(2024, 1, 3), 9.0)]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.first().unwrap().date, d(2024, 1, 2));
        assert_eq!(s.last().unwrap().value, 2.0);
    }

    #[test]
    fn asof_before_series_is_none() {
        let s = DateSeries::from_pairs([(d(2024, 1, 2), 1.0)]);
        assert_eq!(s.asof(d(2024, 1, 1)), None);
        assert_eq!(s.asof(d(2024, 1, 2)), Some(1.0));
        assert_eq!(s.asof(d(2030, 1, 1)), Some(1.0));
    }

    #[test]
    fn argmax_through_ignores_later_peaks() {
        let s = DateSeries::from_pairs([
            (d(2024, 1, 1), 5.0),
            (d(2024, 1, 2), 7.0),
            (d(2024, 1, 3), 3.0),
            (d(2024, 1, 4), 9.0),
        ]);
        assert_eq!(s.argmax_through(d(2024, 1, 3)), Some(d(2024, 1, 2)));
        assert_eq!(s.argmax_through(d(2023, 12, 31)), None);
    }

    #[test]
    fn pct_change_on_first_point_is_none() {
        let s = DateSeries::from_pairs([(d(2024, 1, 1), 100.0), (d(2024, 1, 2), 90.0)]);
        assert_eq!(s.pct_change_on(d(2024, 1, 1)), None);
        assert!((s.pct_change_on(d(2024, 1, 2)).unwrap() + 0.1).abs() < 1e-12);
        assert_eq!(s.pct_change_on(d(2024, 1, 5)), None);
    }
}
