use assert_cmd::Command;
use serde_json::{json, Value};
use std::io::Write;
use std::str;
use tempfile::NamedTempFile;

const RANGES: &str = "\
# start_ip,end_ip,country_iso,country_name,region,city
5.5.0.0,5.5.255.255,DE,Germany,Bavaria,Munich
81.2.69.0,81.2.69.255,GB,United Kingdom,,
2a02:ff00::,2a02:ff00:ffff:ffff:ffff:ffff:ffff:ffff,IT,Italy,Lazio,Rome
";

fn ranges_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create range table");
    file.write_all(RANGES.as_bytes())
        .expect("failed to write range table");
    file
}

fn command() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("geoipenrich").unwrap();
    cmd.env_remove("GEOIP_MMDB_DIR").env_remove("RUST_LOG");
    cmd
}

/// Run geoipenrich with a fallback range table as its only location source
/// and return stdout lines
fn run_geoipenrich(input: &str, args: &[&str]) -> Vec<String> {
    let ranges = ranges_file();
    let output = command()
        .arg("--fallback-ranges")
        .arg(ranges.path())
        .args(args)
        .write_stdin(input)
        .output()
        .expect("failed to execute");

    assert!(output.status.success(), "geoipenrich failed: {:?}", output);
    str::from_utf8(&output.stdout)
        .expect("Failed to read stdout as UTF-8")
        .lines()
        .map(str::to_string)
        .collect()
}

fn parse(line: &str) -> Value {
    serde_json::from_str(line).expect("output line is not JSON")
}

#[test]
fn strict_schema_enrichment() {
    let lines = run_geoipenrich(r#"{"source_ip":"5.5.1.2","message":"login"}"#, &[]);
    assert_eq!(lines.len(), 1);
    assert_eq!(
        parse(&lines[0]),
        json!({
            "source_ip": "5.5.1.2",
            "message": "login",
            "source_geo_coordinates": "0.0,0.0",
            "source_geo_country_iso": "DE",
            "source_geo_city": "Munich",
            "source_geo_region": "Bavaria",
            "source_geo_country": "Germany",
            "source_geo_timezone": "N/A",
            "source_geo_name": "Munich, DE",
        })
    );
}

#[test]
fn input_fields_keep_their_order() {
    let lines = run_geoipenrich(r#"{"z":1,"source_ip":"5.5.1.2","a":2}"#, &[]);
    assert!(
        lines[0].starts_with(r#"{"z":1,"source_ip":"5.5.1.2","a":2,"source_geo_coordinates""#),
        "unexpected field order: {}",
        lines[0]
    );
}

#[test]
fn reserved_and_unknown_addresses() {
    let input = concat!(
        r#"{"host_ip":"192.168.1.1"}"#,
        "\n",
        r#"{"destination_ip":"8.8.8.8"}"#,
        "\n",
        r#"{"source_ip":"not-an-ip"}"#,
        "\n",
    );
    let lines = run_geoipenrich(input, &[]);
    assert_eq!(lines.len(), 3);
    assert_eq!(
        parse(&lines[0]),
        json!({"host_ip": "192.168.1.1", "host_reserved_ip": true})
    );
    assert_eq!(parse(&lines[1]), json!({"destination_ip": "8.8.8.8"}));
    assert_eq!(parse(&lines[2]), json!({"source_ip": "not-an-ip"}));
}

#[test]
fn strict_schema_skips_unmapped_fields() {
    let lines = run_geoipenrich(r#"{"client":"5.5.1.2"}"#, &[]);
    assert_eq!(parse(&lines[0]), json!({"client": "5.5.1.2"}));
}

#[test]
fn legacy_mode() {
    let input = r#"{"client":"2a02:ff00::1","gl2_source":"5.5.1.1"}"#;
    let lines = run_geoipenrich(input, &["--legacy"]);
    assert_eq!(
        parse(&lines[0]),
        json!({
            "client": "2a02:ff00::1",
            "gl2_source": "5.5.1.1",
            "client_geolocation": "0.0,0.0",
            "client_country_code": "IT",
            "client_city_name": "Rome",
            "client_region": "Lazio",
            "client_country": "Italy",
            "client_timezone": "N/A",
        })
    );
}

#[test]
fn legacy_mode_without_timezone() {
    let lines = run_geoipenrich(
        r#"{"client":"81.2.69.160"}"#,
        &["--legacy", "--no-legacy-timezone"],
    );
    assert_eq!(
        parse(&lines[0]),
        json!({
            "client": "81.2.69.160",
            "client_geolocation": "0.0,0.0",
            "client_country_code": "GB",
            "client_city_name": "N/A",
            "client_region": "N/A",
            "client_country": "United Kingdom",
        })
    );
}

#[test]
fn strict_mode_drops_placeholder_names() {
    let lines = run_geoipenrich(r#"{"source_ip":"81.2.69.160"}"#, &[]);
    let record = parse(&lines[0]);
    assert_eq!(record["source_geo_city"], "N/A");
    assert_eq!(record["source_geo_country"], "United Kingdom");
    assert!(record.get("source_geo_name").is_none());
}

#[test]
fn non_object_lines_pass_through() {
    let input = "plain text 5.5.1.2\n\n[1,2,3]\n   \n{\"source_ip\":\"5.5.1.2\"}\n";
    let lines = run_geoipenrich(input, &[]);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "plain text 5.5.1.2");
    assert_eq!(lines[1], "[1,2,3]");
    assert_eq!(parse(&lines[2])["source_geo_city"], "Munich");
}

#[test]
fn without_databases_records_pass_through() {
    let output = command()
        .write_stdin("{\"source_ip\":\"5.5.1.2\"}\n")
        .output()
        .expect("failed to execute");

    assert!(output.status.success());
    assert_eq!(
        str::from_utf8(&output.stdout).unwrap(),
        "{\"source_ip\":\"5.5.1.2\"}\n"
    );
}

#[test]
fn configuration_file() {
    let ranges = ranges_file();
    let mut config = NamedTempFile::new().unwrap();
    let doc = json!({
        "enabled": true,
        "enforce_graylog_schema": false,
        "legacy_timezone": false,
        "fallback_range_table_path": ranges.path().to_str().unwrap(),
    });
    write!(config, "{doc}").unwrap();

    let output = command()
        .arg("--config")
        .arg(config.path())
        .write_stdin("{\"peer\":\"5.5.1.2\"}\n")
        .output()
        .expect("failed to execute");

    assert!(output.status.success());
    let record = parse(str::from_utf8(&output.stdout).unwrap().trim_end());
    assert_eq!(record["peer_city_name"], "Munich");
    assert!(record.get("peer_timezone").is_none());
}

#[test]
fn invalid_configuration_fails() {
    let mut config = NamedTempFile::new().unwrap();
    write!(config, "{{\"db_vendor_type\": \"NOPE\"}}").unwrap();

    let output = command()
        .arg("--config")
        .arg(config.path())
        .write_stdin("")
        .output()
        .expect("failed to execute");

    assert!(!output.status.success());
    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("failed to load configuration"), "{stderr}");
}

#[test]
fn missing_input_file_fails() {
    let output = command()
        .arg("/nonexistent/records.json")
        .output()
        .expect("failed to execute");

    assert!(!output.status.success());
    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("/nonexistent/records.json"), "{stderr}");
}

#[test]
fn stats_are_printed_to_stderr() {
    let ranges = ranges_file();
    let output = command()
        .arg("--fallback-ranges")
        .arg(ranges.path())
        .arg("--stats")
        .write_stdin("{\"source_ip\":\"5.5.1.2\"}\n{\"host_ip\":\"10.0.0.1\"}\n")
        .output()
        .expect("failed to execute");

    assert!(output.status.success());
    let stderr = str::from_utf8(&output.stderr).unwrap();
    assert!(stderr.contains("lookups: count=1 "), "{stderr}");
}

#[test]
fn reads_files_and_stdin_marker() {
    let mut records = NamedTempFile::new().unwrap();
    writeln!(records, "{{\"source_ip\":\"5.5.1.2\"}}").unwrap();
    let ranges = ranges_file();

    let output = command()
        .arg("--fallback-ranges")
        .arg(ranges.path())
        .arg(records.path())
        .arg("-")
        .write_stdin("{\"source_ip\":\"2a02:ff00::5\"}\n")
        .output()
        .expect("failed to execute");

    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(parse(lines[0])["source_geo_city"], "Munich");
    assert_eq!(parse(lines[1])["source_geo_city"], "Rome");
}
