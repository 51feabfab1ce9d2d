//! Spreadsheet export of sales reports.
//!
//! Writes the report rows as CSV followed by an appended summary block.
//! Pure with respect to dashboard state; the filename embeds the report's
//! date range.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::SyncError;
use crate::reports::{DateRange, SalesReport};

const ROW_HEADER: [&str; 8] = [
    "Order #",
    "Created",
    "Completed",
    "Items",
    "Subtotal",
    "Tax",
    "Total",
    "Payment",
];

/// Filename for an exported report, e.g.
/// `sales-report_2026-08-01_2026-08-25.csv`.
pub fn export_filename(range: &DateRange) -> String {
    format!("sales-report_{}.csv", range.file_fragment())
}

/// Write the report into `dir` and return the full path of the file.
pub fn export_report(
    report: &SalesReport,
    range: &DateRange,
    dir: &Path,
) -> Result<PathBuf, SyncError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(range));
    let file = std::fs::File::create(&path)?;
    write_report(report, file)?;
    Ok(path)
}

/// Serialize the report as CSV into any writer.
pub fn write_report<W: Write>(report: &SalesReport, mut out: W) -> Result<(), SyncError> {
    {
        let mut writer = csv::Writer::from_writer(&mut out);
        writer.write_record(ROW_HEADER)?;
        for row in &report.rows {
            writer.write_record([
                row.order_number.as_str(),
                &row.created_at.to_rfc3339(),
                &row
                    .completed_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
                &row.items_count.to_string(),
                &format!("{:.2}", row.subtotal),
                &format!("{:.2}", row.tax),
                &format!("{:.2}", row.total),
                row.payment_method.map(|m| m.as_str()).unwrap_or(""),
            ])?;
        }
        writer.flush()?;
    }

    // Truly blank line between the rows and the appended summary block;
    // a csv record would come out as a quoted empty field instead.
    out.write_all(b"\n")?;

    let summary = &report.summary;
    let mut writer = csv::Writer::from_writer(&mut out);
    writer.write_record(["Total Orders", &summary.total_orders.to_string()])?;
    writer.write_record(["Cash Orders", &summary.cash_orders.to_string()])?;
    writer.write_record(["Cash Total", &format!("{:.2}", summary.cash_total)])?;
    writer.write_record(["Card Orders", &summary.card_orders.to_string()])?;
    writer.write_record(["Card Total", &format!("{:.2}", summary.card_total)])?;
    writer.write_record(["Total Revenue", &format!("{:.2}", summary.total_revenue)])?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::PaymentMethod;
    use crate::reports::{ReportRow, ReportSummary};
    use chrono::{TimeZone, Utc};

    fn sample_report() -> SalesReport {
        SalesReport {
            rows: vec![
                ReportRow {
                    order_number: "ORD-25082026-00001".to_string(),
                    created_at: Utc.with_ymd_and_hms(2026, 8, 25, 10, 0, 0).unwrap(),
                    completed_at: Some(Utc.with_ymd_and_hms(2026, 8, 25, 10, 40, 0).unwrap()),
                    items_count: 3,
                    subtotal: 20.0,
                    tax: 4.8,
                    total: 24.8,
                    payment_method: Some(PaymentMethod::Cash),
                },
                ReportRow {
                    order_number: "ORD-25082026-00002".to_string(),
                    created_at: Utc.with_ymd_and_hms(2026, 8, 25, 11, 0, 0).unwrap(),
                    completed_at: None,
                    items_count: 1,
                    subtotal: 10.0,
                    tax: 2.4,
                    total: 12.4,
                    payment_method: Some(PaymentMethod::Card),
                },
            ],
            summary: ReportSummary {
                total_orders: 2,
                cash_orders: 1,
                cash_total: 24.8,
                card_orders: 1,
                card_total: 12.4,
                total_revenue: 37.2,
            },
        }
    }

    #[test]
    fn filename_embeds_date_range() {
        let range = DateRange::parse("2026-08-01", "2026-08-25").unwrap();
        assert_eq!(
            export_filename(&range),
            "sales-report_2026-08-01_2026-08-25.csv"
        );
    }

    #[test]
    fn writes_rows_then_summary_block() {
        let mut buf = Vec::new();
        write_report(&sample_report(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("Order #,Created,Completed"));
        assert!(lines[1].starts_with("ORD-25082026-00001,"));
        assert!(lines[1].ends_with(",cash"));
        assert!(lines[2].contains(",12.40,card"));
        // Blank separator between rows and summary
        assert_eq!(lines[3], "");
        assert!(lines.contains(&"Total Orders,2"));
        assert!(lines.contains(&"Cash Total,24.80"));
        assert!(lines.contains(&"Total Revenue,37.20"));
    }

    #[test]
    fn export_creates_file_in_target_dir() {
        let dir = std::env::temp_dir().join("staff-dashboard-export-test");
        let range = DateRange::parse("2026-08-01", "2026-08-25").unwrap();

        let path = export_report(&sample_report(), &range, &dir).unwrap();
        assert!(path.ends_with("sales-report_2026-08-01_2026-08-25.csv"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Total Revenue,37.20"));
        let _ = std::fs::remove_file(path);
    }
}
