//! Output formatting module
//!
//! Handles:
//! - Human-readable status rows for the terminal
//! - JSON status rows (one object per line)
//! - CSV export of the full history (see [`export`])

use anyhow::Result;

use crate::models::{Category, StatusRecord};

pub mod export;

pub use export::{export_csv, ExportSummary};

/// Width of the host column in human output; longer hosts push the row wider
const HOST_COLUMN_WIDTH: usize = 40;

/// Format a status record as an aligned human-readable row.
///
/// Invalid records carry the operator's raw input in `host` and show `-` for
/// the port.
pub fn format_record_human(record: &StatusRecord) -> String {
    let category = match record.category {
        Category::Stratum => "STRATUM",
        Category::Host => "HOST",
    };
    let port = match record.port {
        Some(port) => port.to_string(),
        None => "-".to_string(),
    };

    format!(
        "[{}] {:<7} {:<width$} {:>5}  {}",
        record.formatted_time(),
        category,
        record.host,
        port,
        record.status,
        width = HOST_COLUMN_WIDTH
    )
}

/// Format a status record as a single-line JSON object.
pub fn format_record_json(record: &StatusRecord) -> Result<String> {
    Ok(serde_json::to_string(record)?)
}

/// Format a record in the selected output mode
pub fn format_record(record: &StatusRecord, json: bool) -> Result<String> {
    if json {
        format_record_json(record)
    } else {
        Ok(format_record_human(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Endpoint, Status};
    use chrono::{Local, TimeZone};

    fn at_noon() -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 12, 0, 5).single().unwrap()
    }

    #[test]
    fn test_human_row_for_reachable_stratum() {
        let endpoint = Endpoint::stratum("stratum+tcp://10.0.0.1:3333", "10.0.0.1", 3333);
        let record = StatusRecord::observe(&endpoint, at_noon(), 1, Some(true));

        let row = format_record_human(&record);
        assert!(row.starts_with("[2024-03-09 12:00:05] STRATUM 10.0.0.1 "));
        assert!(row.contains(" 3333  UP"));
    }

    #[test]
    fn test_human_row_for_invalid_target_shows_raw_input_and_dash() {
        let endpoint = Endpoint::invalid("stratum+tcp://no-port", Category::Stratum);
        let record = StatusRecord::observe(&endpoint, at_noon(), 2, None);

        let row = format_record_human(&record);
        assert!(row.contains("stratum+tcp://no-port"));
        assert!(row.contains("    -  INVALID"));
    }

    #[test]
    fn test_human_rows_align() {
        let short = Endpoint::resolved_host("1.1.1.1:53", "1.1.1.1:53".parse().unwrap());
        let long = Endpoint::resolved_host("10.200.30.40:8080", "10.200.30.40:8080".parse().unwrap());
        let a = format_record_human(&StatusRecord::observe(&short, at_noon(), 1, Some(false)));
        let b = format_record_human(&StatusRecord::observe(&long, at_noon(), 1, Some(false)));

        assert_eq!(a.len(), b.len());
        assert!(a.ends_with("DOWN"));
    }

    #[test]
    fn test_json_row_fields() {
        let endpoint = Endpoint::resolved_host("8.8.8.8:53", "8.8.8.8:53".parse().unwrap());
        let record = StatusRecord::observe(&endpoint, at_noon(), 4, Some(true));

        let line = format_record_json(&record).unwrap();
        assert!(!line.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["category"], "host");
        assert_eq!(value["host"], "8.8.8.8");
        assert_eq!(value["port"], 53);
        assert_eq!(value["status"], "UP");
        assert_eq!(value["cycle"], 4);
        assert!(value["timestamp"].as_str().unwrap().starts_with("2024-03-09T12:00:05"));
    }

    #[test]
    fn test_json_row_for_invalid_has_null_port() {
        let endpoint = Endpoint::invalid("bad", Category::Host);
        let record = StatusRecord::observe(&endpoint, at_noon(), 1, None);

        let value: serde_json::Value = serde_json::from_str(&format_record(&record, true).unwrap()).unwrap();
        assert!(value["port"].is_null());
        assert_eq!(value["status"], "INVALID");
    }
}
