// e2e/cli.rs — black-box tests of the `tdc` binary.
//
// Covers exit codes, header framing, --raw, --force, --list, --generator
// and --stats, using std::process::Command against the built binary.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn tdc_bin() -> PathBuf {
    // CARGO_BIN_EXE_tdc is set by Cargo when running integration tests.
    if let Ok(p) = std::env::var("CARGO_BIN_EXE_tdc") {
        return PathBuf::from(p);
    }
    let mut p = std::env::current_exe().unwrap();
    p.pop();
    if p.ends_with("deps") {
        p.pop();
    }
    p.push("tdc");
    p
}

fn make_input(content: &[u8]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("input.txt");
    fs::write(&path, content).unwrap();
    (dir, path)
}

// ── 1. compress / decompress roundtrip with default output names ─────────────

#[test]
fn roundtrip_with_default_names() {
    let (dir, input) = make_input(b"compress me, please, compress me again");
    let original = fs::read(&input).unwrap();

    let status = Command::new(tdc_bin())
        .args(["--algorithm", "lz78", input.to_str().unwrap()])
        .status()
        .unwrap();
    assert!(status.success());

    let compressed = dir.path().join("input.txt.tdc");
    assert!(compressed.exists(), "default output must carry the .tdc suffix");

    let restored = dir.path().join("restored.txt");
    let status = Command::new(tdc_bin())
        .args([
            "--decompress",
            "-o",
            restored.to_str().unwrap(),
            compressed.to_str().unwrap(),
        ])
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(fs::read(&restored).unwrap(), original);
}

// ── 2. header framing ────────────────────────────────────────────────────────

#[test]
fn header_roundtrip() {
    let content = "asdfghjklöä".as_bytes();
    let (dir, input) = make_input(content);

    // non-raw: header + '%'
    let compressed = dir.path().join("with_header.tdc");
    let status = Command::new(tdc_bin())
        .args([
            "--algorithm",
            "lz78(ascii)",
            "-o",
            compressed.to_str().unwrap(),
            input.to_str().unwrap(),
        ])
        .status()
        .unwrap();
    assert!(status.success());
    let bytes = fs::read(&compressed).unwrap();
    assert!(
        bytes.starts_with(b"lz78(coder=ascii())%"),
        "header: {:?}",
        String::from_utf8_lossy(&bytes[..bytes.len().min(40)])
    );

    // raw: no header
    let raw = dir.path().join("raw.tdc");
    let status = Command::new(tdc_bin())
        .args([
            "--algorithm",
            "lz78(ascii)",
            "--raw",
            "-o",
            raw.to_str().unwrap(),
            input.to_str().unwrap(),
        ])
        .status()
        .unwrap();
    assert!(status.success());
    let raw_bytes = fs::read(&raw).unwrap();
    assert!(!raw_bytes.starts_with(b"lz78(coder=ascii())%"));

    // non-raw decompression picks the algorithm from the header
    let restored = dir.path().join("r1.txt");
    let status = Command::new(tdc_bin())
        .args([
            "--decompress",
            "-o",
            restored.to_str().unwrap(),
            compressed.to_str().unwrap(),
        ])
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(fs::read(&restored).unwrap(), content);

    // raw decompression needs --algorithm
    let restored = dir.path().join("r2.txt");
    let status = Command::new(tdc_bin())
        .args([
            "--decompress",
            "--raw",
            "--algorithm",
            "lz78(ascii)",
            "-o",
            restored.to_str().unwrap(),
            raw.to_str().unwrap(),
        ])
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(fs::read(&restored).unwrap(), content);
}

#[test]
fn missing_header_is_a_runtime_error() {
    let (dir, input) = make_input(b"this file has no header marker at all");
    let out = dir.path().join("out.txt");
    let output = Command::new(tdc_bin())
        .args(["--decompress", "-o", out.to_str().unwrap(), input.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

// ── 3. exit codes ────────────────────────────────────────────────────────────

#[test]
fn missing_algorithm_is_a_usage_error() {
    let (_dir, input) = make_input(b"data");
    let output = Command::new(tdc_bin()).arg(input.to_str().unwrap()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_input_file_is_a_runtime_error() {
    let output = Command::new(tdc_bin())
        .args(["--algorithm", "lz78", "/nonexistent/path/xyz"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn unknown_algorithm_is_a_runtime_error() {
    let (_dir, input) = make_input(b"data");
    let output = Command::new(tdc_bin())
        .args(["--algorithm", "definitely_not_real", input.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown algorithm"), "{stderr}");
}

#[test]
fn existing_target_needs_force() {
    let (dir, input) = make_input(b"data data data");
    let target = dir.path().join("out.tdc");
    fs::write(&target, b"already here").unwrap();

    let output = Command::new(tdc_bin())
        .args([
            "--algorithm",
            "lz78",
            "-o",
            target.to_str().unwrap(),
            input.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(fs::read(&target).unwrap(), b"already here");

    let status = Command::new(tdc_bin())
        .args([
            "--algorithm",
            "lz78",
            "--force",
            "-o",
            target.to_str().unwrap(),
            input.to_str().unwrap(),
        ])
        .status()
        .unwrap();
    assert!(status.success());
    assert_ne!(fs::read(&target).unwrap(), b"already here");
}

// ── 4. list / version / help ─────────────────────────────────────────────────

#[test]
fn list_shows_the_catalogue() {
    let output = Command::new(tdc_bin()).arg("--list").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for needle in ["lz78", "lzss_lcp", "lzw", "noop", "fib"] {
        assert!(stdout.contains(needle), "missing '{needle}' in --list output");
    }
}

#[test]
fn version_and_help() {
    let output = Command::new(tdc_bin()).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));

    let output = Command::new(tdc_bin()).arg("--help").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).to_lowercase().contains("usage"));
}

// ── 5. generators and stats ──────────────────────────────────────────────────

#[test]
fn generated_input_compresses() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("fib.tdc");
    let status = Command::new(tdc_bin())
        .args([
            "--algorithm",
            "lz78",
            "--generator",
            "fib(n=15)",
            "-o",
            out.to_str().unwrap(),
        ])
        .status()
        .unwrap();
    assert!(status.success());
    assert!(out.exists());
}

#[test]
fn stats_emit_json_with_phase_tree() {
    let (dir, input) = make_input(&b"statistics need some data to chew on ".repeat(20));
    let out = dir.path().join("out.tdc");
    let output = Command::new(tdc_bin())
        .args([
            "--algorithm",
            "lz78",
            "--stats",
            "--stats-title",
            "matrix smoke",
            "-o",
            out.to_str().unwrap(),
            input.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stats output must be JSON");
    assert_eq!(json["meta"]["title"], "matrix smoke");
    assert_eq!(json["meta"]["config"], "lz78()");
    assert!(json["meta"]["inputSize"].as_u64().unwrap() > 0);
    let data = &json["data"];
    assert_eq!(data["title"], "root");
    for key in ["timeStart", "timeEnd", "timeDelta", "memOff", "memPeak", "memFinal", "sub", "stats"]
    {
        assert!(data.get(key).is_some(), "missing key {key}");
    }
}

// ── 6. stdout / stdin plumbing ───────────────────────────────────────────────

#[test]
fn usestdout_writes_to_stdout() {
    let (_dir, input) = make_input(b"stream me");
    let output = Command::new(tdc_bin())
        .args(["--algorithm", "lz78(ascii)", "--usestdout", input.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.starts_with(b"lz78(coder=ascii())%"));
}
