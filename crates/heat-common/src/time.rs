//! Date windows for imagery and reference-year queries.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{HeatError, HeatResult};

/// A half-open date range `[start, end)` used to filter image collections.
///
/// Earth Engine's `filterDate` treats the end date as exclusive, and the local
/// raster store does the same so both backends select the same scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> HeatResult<Self> {
        if end <= start {
            return Err(HeatError::invalid(
                "dateWindow",
                format!("Date window end {end} must be after start {start}."),
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse ISO dates (`YYYY-MM-DD`).
    pub fn parse(start: &str, end: &str) -> HeatResult<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| HeatError::invalid("dateWindow", format!("Invalid date: {s}")))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// The calendar year `year`, written the way the imagery query expects
    /// (`YYYY-01-01` to `YYYY-12-31`). The end is exclusive, so scenes taken
    /// on 31 December are intentionally left out of the window.
    pub fn calendar_year(year: i32) -> HeatResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| HeatError::invalid("year", format!("Invalid year: {year}")))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| HeatError::invalid("year", format!("Invalid year: {year}")))?;
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_year_bounds() {
        let window = DateWindow::calendar_year(2023).unwrap();
        assert_eq!(window.start_str(), "2023-01-01");
        assert_eq!(window.end_str(), "2023-12-31");
        assert!(window.contains(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap()));
        // End is exclusive, matching filterDate.
        assert!(!window.contains(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
        assert!(!window.contains(NaiveDate::from_ymd_opt(2022, 12, 31).unwrap()));
    }

    #[test]
    fn test_inverted_window_rejected() {
        assert!(DateWindow::parse("2023-12-31", "2023-01-01").is_err());
        assert!(DateWindow::parse("2023-01-01", "2023-01-01").is_err());
        assert!(DateWindow::parse("2023-13-01", "2024-01-01").is_err());
    }
}
