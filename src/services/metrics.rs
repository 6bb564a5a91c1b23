//! Reporting formulas shared by the stats endpoints.
//!
//! Everything here is a pure function of already-aggregated numbers.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};

/// Month-over-month change in percent.
///
/// A zero baseline reports 0 when both sides are zero and ±100 otherwise.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 {
            100.0
        } else if current < 0.0 {
            -100.0
        } else {
            0.0
        };
    }
    (current - previous) / previous * 100.0
}

/// `part / whole * 100`, zero when `whole` is zero
pub fn share_percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Completed over assigned on a 0 to 5 scale
pub fn performance_score(completed: usize, assigned: usize) -> f64 {
    if assigned == 0 {
        return 0.0;
    }
    completed as f64 / assigned as f64 * 5.0
}

/// Estimated over actual hours in percent; `None` when no hours were logged
pub fn efficiency_percent(estimated_hours: f64, actual_hours: f64) -> Option<f64> {
    (actual_hours > 0.0).then(|| estimated_hours / actual_hours * 100.0)
}

pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds() as f64 / 86_400.0
}

/// Half-open calendar month `[start, end)` in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    pub fn containing(at: DateTime<Utc>) -> Self {
        let start = first_of_month(at.year(), at.month()).unwrap_or(at);
        Self {
            start,
            end: start.checked_add_months(Months::new(1)).unwrap_or(start),
        }
    }

    pub fn previous(&self) -> Self {
        self.back(1)
    }

    /// The month `months` before this one
    pub fn back(&self, months: u32) -> Self {
        let start = self.start.checked_sub_months(Months::new(months)).unwrap_or(self.start);
        Self::containing(start)
    }

    /// Short month name, e.g. `Jan`
    pub fn short_label(&self) -> String {
        self.start.format("%b").to_string()
    }

    /// e.g. `Jan 2025`
    pub fn long_label(&self) -> String {
        self.start.format("%b %Y").to_string()
    }
}

fn first_of_month(year: i32, month: u32) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive))
}

/// Midnight on January 1st of the year containing `at`
pub fn start_of_year(at: DateTime<Utc>) -> DateTime<Utc> {
    first_of_month(at.year(), 1).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_change_conventions() {
        assert_eq!(percent_change(0.0, 0.0), 0.0);
        assert_eq!(percent_change(42.0, 0.0), 100.0);
        assert_eq!(percent_change(-5.0, 0.0), -100.0);
        assert_eq!(percent_change(150.0, 100.0), 50.0);
        assert_eq!(percent_change(50.0, 100.0), -50.0);
    }

    #[test]
    fn share_guards_zero_denominator() {
        assert_eq!(share_percent(10.0, 0.0), 0.0);
        assert_eq!(share_percent(300.0, 1300.0).round(), 23.0);
    }

    #[test]
    fn rounding_to_cents() {
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(2.675000001), 2.68);
    }

    #[test]
    fn std_dev_is_population() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(std_dev(&values), 2.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn performance_and_efficiency() {
        assert_eq!(performance_score(3, 4), 3.75);
        assert_eq!(performance_score(0, 0), 0.0);
        assert_eq!(efficiency_percent(8.0, 10.0), Some(80.0));
        assert_eq!(efficiency_percent(8.0, 0.0), None);
    }

    #[test]
    fn month_windows() {
        let at = Utc.with_ymd_and_hms(2025, 3, 17, 12, 30, 0).unwrap();
        let march = MonthWindow::containing(at);
        assert_eq!(march.start, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(march.end, Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap());

        let january = march.back(2);
        assert_eq!(january.long_label(), "Jan 2025");
        assert_eq!(march.back(3).long_label(), "Dec 2024");
        assert_eq!(march.previous().short_label(), "Feb");
        assert_eq!(start_of_year(at), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn days_between_is_fractional() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap();
        assert_eq!(days_between(start, end), 2.5);
    }
}
