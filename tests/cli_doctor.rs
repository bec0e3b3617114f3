use std::process::Command;

#[test]
fn test_cli_doctor_exits_zero_without_docker() {
    let bin = env!("CARGO_BIN_EXE_ordforge");
    let dir = tempfile::tempdir().unwrap();
    let out = Command::new(bin)
        .arg("doctor")
        .env("ORDFORGE_TEST_DISABLE_DOCKER", "1")
        .env("ORDFORGE_CACHE_DIR", dir.path())
        // Unroutable endpoints so the fee chain falls through quickly
        .env("MEMPOOL_API_URL", "http://127.0.0.1:1")
        .output()
        .expect("failed to run ordforge doctor");
    assert!(
        out.status.success(),
        "ordforge doctor exited non-zero: {:?}\nstdout:\n{}\nstderr:\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("doctor: completed diagnostics."));
    assert!(stderr.contains("ord container:"));
    assert!(stderr.contains("fee estimate:"));
}
