//! CSV export of the status history
//!
//! Writes one file per category with the header `Time,Host,Port,Status` and
//! one row per record, oldest first.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::constants::{EXPORT_HEADER, HOST_EXPORT_FILE, STRATUM_EXPORT_FILE};
use crate::models::{Category, StatusRecord};
use crate::monitor::StatusSink;

/// Files written by [`export_csv`] and how many rows each holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub stratum_path: PathBuf,
    pub stratum_rows: usize,
    pub host_path: PathBuf,
    pub host_rows: usize,
}

/// Export the full history of both categories into `dir`, creating it if needed.
///
/// Existing files are overwritten.
pub fn export_csv(sink: &StatusSink, dir: &Path) -> Result<ExportSummary> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;

    let stratum = sink.all(Category::Stratum);
    let hosts = sink.all(Category::Host);

    let stratum_path = dir.join(STRATUM_EXPORT_FILE);
    write_file(&stratum_path, &render_csv(&stratum))?;
    let host_path = dir.join(HOST_EXPORT_FILE);
    write_file(&host_path, &render_csv(&hosts))?;

    log::info!(
        "Exported {} stratum and {} host records to {}",
        stratum.len(),
        hosts.len(),
        dir.display()
    );

    Ok(ExportSummary {
        stratum_path,
        stratum_rows: stratum.len(),
        host_path,
        host_rows: hosts.len(),
    })
}

/// Render records as CSV text, header included
pub fn render_csv(records: &[StatusRecord]) -> String {
    let mut out = String::new();
    out.push_str(&EXPORT_HEADER.join(","));
    out.push('\n');

    for record in records {
        let _ = writeln!(
            out,
            "{},{},{},{}",
            escape_field(&record.formatted_time()),
            escape_field(&record.host),
            record.port_text(),
            record.status
        );
    }
    out
}

/// Quote a field when it contains a delimiter, quote or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("Failed to write export file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Endpoint;
    use chrono::{Local, TimeZone};
    use tempfile::tempdir;

    fn timestamp() -> chrono::DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().unwrap()
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_render_rows() {
        let up = Endpoint::stratum("stratum+tcp://10.0.0.1:3333", "10.0.0.1", 3333);
        let bad = Endpoint::invalid("stratum+tcp://no-port", Category::Stratum);
        let records = vec![
            StatusRecord::observe(&up, timestamp(), 1, Some(true)),
            StatusRecord::observe(&bad, timestamp(), 1, None),
        ];

        let csv = render_csv(&records);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Time,Host,Port,Status");
        assert_eq!(lines[1], "2024-01-02 03:04:05,10.0.0.1,3333,UP");
        assert_eq!(lines[2], "2024-01-02 03:04:05,stratum+tcp://no-port,,INVALID");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_export_writes_both_files() {
        let sink = StatusSink::new();
        let host = Endpoint::resolved_host("8.8.8.8:53", "8.8.8.8:53".parse().unwrap());
        sink.extend(vec![
            StatusRecord::observe(&host, timestamp(), 1, Some(false)),
            StatusRecord::observe(&host, timestamp(), 2, Some(true)),
        ]);

        let dir = tempdir().unwrap();
        let out = dir.path().join("logs");
        let summary = export_csv(&sink, &out).unwrap();

        assert_eq!(summary.host_rows, 2);
        assert_eq!(summary.stratum_rows, 0);

        let hosts = std::fs::read_to_string(&summary.host_path).unwrap();
        assert_eq!(
            hosts,
            "Time,Host,Port,Status\n2024-01-02 03:04:05,8.8.8.8,53,DOWN\n2024-01-02 03:04:05,8.8.8.8,53,UP\n"
        );
        let stratum = std::fs::read_to_string(&summary.stratum_path).unwrap();
        assert_eq!(stratum, "Time,Host,Port,Status\n");
    }
}
