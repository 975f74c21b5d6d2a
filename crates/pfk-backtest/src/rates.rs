//! Step-function schedule of annualized policy rates.

use chrono::NaiveDate;

/// Annualized rates effective from given dates, stored as fractions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RateSchedule {
    /// Sorted ascending by effective date, unique dates.
    entries: Vec<(NaiveDate, f64)>,
}

impl RateSchedule {
    /// Build from `(effective_date, percent)` pairs (3.25 => 0.0325).
    /// Later duplicates of the same date win.
    pub fn from_percent_history<I>(history: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut entries: Vec<(NaiveDate, f64)> = history
            .into_iter()
            .map(|(d, pct)| (d, pct / 100.0))
            .collect();
        entries.sort_by_key(|(d, _)| *d);

        let mut dedup: Vec<(NaiveDate, f64)> = Vec::with_capacity(entries.len());
        for (d, r) in entries {
            match dedup.last_mut() {
                Some(last) if last.0 == d => last.1 = r,
                _ => dedup.push((d, r)),
            }
        }
        Self { entries: dedup }
    }

    /// A single rate for every date.
    pub fn flat(rate: f64) -> Self {
        Self {
            entries: vec![(NaiveDate::MIN, rate)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rate in effect on `date`.
    ///
    /// Dates before the first entry take the first entry's rate; an empty
    /// schedule yields 0.
    pub fn rate_on(&self, date: NaiveDate) -> f64 {
        let idx = self.entries.partition_point(|(d, _)| *d <= date);
        if idx == 0 {
            self.entries.first().map(|(_, r)| *r).unwrap_or(0.0)
        } else {
            self.entries[idx - 1].1
        }
    }
}
