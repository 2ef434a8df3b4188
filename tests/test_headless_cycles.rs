use assert_cmd::Command;
use predicates::prelude::*;
use std::net::TcpListener;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    config: String,
    /// Accepts connections for as long as the fixture lives
    _listener: TcpListener,
    open_port: u16,
    closed_port: u16,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let open_port = listener.local_addr().unwrap().port();
        let closed_port = {
            let probe = TcpListener::bind("127.0.0.1:0").unwrap();
            probe.local_addr().unwrap().port()
        };

        Self {
            config: config.to_string_lossy().to_string(),
            dir,
            _listener: listener,
            open_port,
            closed_port,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("stratum-watch").unwrap();
        cmd.args(["-c", &self.config, "--no-defaults", "--interval", "5", "--timeout", "1"])
            .timeout(std::time::Duration::from_secs(20));
        cmd
    }
}

#[test]
fn test_single_cycle_reports_up_and_down() {
    let fx = Fixture::new();
    let open = format!("127.0.0.1:{}", fx.open_port);
    let closed = format!("127.0.0.1:{}", fx.closed_port);

    let output = fx
        .command()
        .args(["--host", &open, "--host", &closed, "--cycles", "1"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "unexpected output: {stdout}");
    assert!(lines[0].contains("HOST") && lines[0].ends_with("UP"));
    assert!(lines[1].contains(&fx.closed_port.to_string()) && lines[1].ends_with("DOWN"));
}

#[test]
fn test_json_output_lines() {
    let fx = Fixture::new();
    let stratum = format!("stratum+tcp://127.0.0.1:{}", fx.open_port);

    let output = fx
        .command()
        .args(["--stratum", &stratum, "--stratum", "stratum+tcp://no-port", "--cycles", "1", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let rows: Vec<serde_json::Value> = stdout.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["category"], "stratum");
    assert_eq!(rows[0]["status"], "UP");
    assert_eq!(rows[0]["port"], fx.open_port);
    assert_eq!(rows[1]["status"], "INVALID");
    assert_eq!(rows[1]["host"], "stratum+tcp://no-port");
    assert_eq!(rows[0]["timestamp"], rows[1]["timestamp"]);
}

#[test]
fn test_export_on_exit() {
    let fx = Fixture::new();
    let export_dir = fx.dir.path().join("export");
    let host = format!("127.0.0.1:{}", fx.open_port);
    let stratum = format!("stratum+tcp://127.0.0.1:{}", fx.closed_port);

    fx.command()
        .args(["--host", &host, "--stratum", &stratum, "--cycles", "1", "--quiet"])
        .arg("--export-dir")
        .arg(&export_dir)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let hosts = std::fs::read_to_string(export_dir.join("host_log.csv")).unwrap();
    let host_lines: Vec<&str> = hosts.lines().collect();
    assert_eq!(host_lines[0], "Time,Host,Port,Status");
    assert_eq!(host_lines.len(), 2);
    assert!(host_lines[1].ends_with(&format!(",127.0.0.1,{},UP", fx.open_port)));

    let stratum = std::fs::read_to_string(export_dir.join("stratum_log.csv")).unwrap();
    let stratum_lines: Vec<&str> = stratum.lines().collect();
    assert_eq!(stratum_lines.len(), 2);
    assert!(stratum_lines[1].ends_with(&format!(",127.0.0.1,{},DOWN", fx.closed_port)));
}

#[test]
fn test_empty_watch_lists_still_complete() {
    let fx = Fixture::new();

    let mut cmd = Command::cargo_bin("stratum-watch").unwrap();
    cmd.args(["-c", &fx.config, "--no-defaults", "--cycles", "2", "--interval", "0.1"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
