use std::fs;
use std::process::Command;

// With an explicit container override and --dry-run, the CLI prints the
// exact command and never touches docker.
#[test]
fn test_cli_inscribe_dry_run_prints_command() {
    let bin = env!("CARGO_BIN_EXE_ordforge");
    let dir = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    let file = dir.path().join("hello.txt");
    fs::write(&file, b"hello inscription").unwrap();

    let out = Command::new(bin)
        .args([
            "inscribe",
            "--file",
            file.to_str().unwrap(),
            "--fee-rate",
            "12",
            "--dry-run",
        ])
        .env("ORDFORGE_TEST_DISABLE_DOCKER", "1")
        .env("ORD_RPC_HOST", "mynode")
        .env("ORDFORGE_CACHE_DIR", cache.path())
        .output()
        .expect("failed to run ordforge inscribe");
    assert!(
        out.status.success(),
        "exit {:?}\nstderr:\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    let line = stdout.trim();
    assert!(
        line.starts_with("docker exec mynode ord wallet inscribe --fee-rate 12 --file /data/hello"),
        "unexpected command: {line}"
    );
    assert!(line.ends_with(".txt"), "unexpected command: {line}");
}

#[test]
fn test_cli_inscribe_rejects_bad_fee_rate() {
    let bin = env!("CARGO_BIN_EXE_ordforge");
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("hello.txt");
    fs::write(&file, b"x").unwrap();

    let out = Command::new(bin)
        .args([
            "inscribe",
            "--file",
            file.to_str().unwrap(),
            "--fee-rate",
            "0",
            "--dry-run",
        ])
        .env("ORDFORGE_TEST_DISABLE_DOCKER", "1")
        .output()
        .expect("failed to run ordforge inscribe");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("fee rate"), "stderr: {stderr}");
}
