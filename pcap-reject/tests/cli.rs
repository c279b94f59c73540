use assert_cmd::Command;

fn pcap_reject() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

#[test]
fn cli_help() {
    let output = pcap_reject().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FILTER"));
    assert!(stdout.contains("PRIORITY"));
}

#[test]
fn cli_missing_filter() {
    let output = pcap_reject().output().unwrap();
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}

#[test]
fn cli_too_many_arguments() {
    let output = pcap_reject().args(["tcp", "1", "2"]).output().unwrap();
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}

#[test]
fn cli_priority_out_of_range() {
    let output = pcap_reject().args(["udp", "40000"]).output().unwrap();
    assert!(!output.status.success());
    let output = pcap_reject().args(["udp", "high"]).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn cli_missing_config_file() {
    let output = pcap_reject()
        .args(["-c", "/nonexistent/pcap-reject.toml", "tcp"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[cfg(not(feature = "live"))]
#[test]
fn cli_no_capture_backend() {
    let output = pcap_reject()
        .args(["-q", "tcp or udp", "-5"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no capture backend"));
}
