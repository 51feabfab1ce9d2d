//! Sales report consumption.
//!
//! Report computation is owned by the order service; this module only
//! models the response shape and the inclusive date range used to query
//! it. Export to a spreadsheet file lives in [`crate::export`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::orders::PaymentMethod;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Inclusive report period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SyncError> {
        if start > end {
            return Err(SyncError::Config(format!(
                "report range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse a `YYYY-MM-DD` pair.
    pub fn parse(start: &str, end: &str) -> Result<Self, SyncError> {
        let start = NaiveDate::parse_from_str(start.trim(), DATE_FORMAT)
            .map_err(|e| SyncError::Config(format!("invalid start date {start:?}: {e}")))?;
        let end = NaiveDate::parse_from_str(end.trim(), DATE_FORMAT)
            .map_err(|e| SyncError::Config(format!("invalid end date {end:?}: {e}")))?;
        Self::new(start, end)
    }

    pub fn start_str(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }

    /// Fragment embedded in export filenames.
    pub fn file_fragment(&self) -> String {
        format!("{}_{}", self.start_str(), self.end_str())
    }
}

// ---------------------------------------------------------------------------
// Report payload
// ---------------------------------------------------------------------------

/// One completed order in the report period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub order_number: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub items_count: u32,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
}

/// Period totals, split by payment method.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_orders: u64,
    pub cash_orders: u64,
    pub cash_total: f64,
    pub card_orders: u64,
    pub card_total: f64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesReport {
    #[serde(alias = "orders")]
    pub rows: Vec<ReportRow>,
    pub summary: ReportSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inclusive_range() {
        let range = DateRange::parse("2026-08-01", "2026-08-25").unwrap();
        assert_eq!(range.start_str(), "2026-08-01");
        assert_eq!(range.end_str(), "2026-08-25");
        assert_eq!(range.file_fragment(), "2026-08-01_2026-08-25");
    }

    #[test]
    fn single_day_range_is_valid() {
        assert!(DateRange::parse("2026-08-25", "2026-08-25").is_ok());
    }

    #[test]
    fn rejects_inverted_range() {
        let err = DateRange::parse("2026-08-25", "2026-08-01").unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(DateRange::parse("25/08/2026", "2026-08-25").is_err());
        assert!(DateRange::parse("2026-08-01", "someday").is_err());
    }

    #[test]
    fn report_deserializes_with_orders_alias() {
        let raw = r#"{
            "orders": [{
                "order_number": "ORD-25082026-00001",
                "created_at": "2026-08-25T10:00:00Z",
                "completed_at": "2026-08-25T10:40:00Z",
                "items_count": 3,
                "subtotal": 20.0,
                "tax": 4.8,
                "total": 24.8,
                "payment_method": "cash"
            }],
            "summary": {
                "total_orders": 1,
                "cash_orders": 1,
                "cash_total": 24.8,
                "card_orders": 0,
                "card_total": 0.0,
                "total_revenue": 24.8
            }
        }"#;
        let report: SalesReport = serde_json::from_str(raw).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].payment_method, Some(PaymentMethod::Cash));
        assert_eq!(report.summary.total_orders, 1);
    }
}
