use std::fs;
use std::process::Command;

#[test]
fn test_cli_cache_clear_removes_tracked_files_only() {
    let bin = env!("CARGO_BIN_EXE_ordforge");
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.png"), b"img").unwrap();
    fs::write(dir.path().join("b.txt"), b"text").unwrap();
    fs::write(dir.path().join("keep.bin"), b"untracked").unwrap();

    let out = Command::new(bin)
        .arg("cache-clear")
        .env("ORDFORGE_CACHE_DIR", dir.path())
        .output()
        .expect("failed to run ordforge cache-clear");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("removed 2 cached files"), "stdout: {stdout}");
    assert!(!dir.path().join("a.png").exists());
    assert!(!dir.path().join("b.txt").exists());
    assert!(dir.path().join("keep.bin").exists());
}

#[test]
fn test_cli_cache_info_reports_usage_json() {
    let bin = env!("CARGO_BIN_EXE_ordforge");
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), vec![0u8; 42]).unwrap();

    let out = Command::new(bin)
        .arg("cache-info")
        .env("ORDFORGE_CACHE_DIR", dir.path())
        .output()
        .expect("failed to run ordforge cache-info");
    assert!(out.status.success());
    let v: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("cache-info did not print JSON");
    assert_eq!(v["totalBytes"], 42);
    assert_eq!(v["files"][0]["name"], "a.txt");
}
