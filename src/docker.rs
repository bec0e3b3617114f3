#![allow(clippy::module_name_repetitions)]
//! Docker CLI plumbing: runtime discovery, container probes, cp/exec wrappers.
//!
//! Probes (`container_is_running`, `running_containers`) swallow every
//! failure and report "not there"; callers fall through to the next
//! candidate. Transfers and execs surface the raw docker output instead.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use which::which;

use crate::util::{ExecOutput, ExecRequest, ExecService};

const PS_TIMEOUT: Duration = Duration::from_secs(5);
const CP_TIMEOUT: Duration = Duration::from_secs(60);

pub fn runtime_path() -> io::Result<PathBuf> {
    if let Ok(p) = which("docker") {
        return Ok(p);
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "Docker is required but was not found in PATH.",
    ))
}

/// True when probing is disabled for tests or docker is absent.
fn probing_disabled() -> bool {
    std::env::var("ORDFORGE_TEST_DISABLE_DOCKER").ok().as_deref() == Some("1")
}

fn exec_service() -> ExecService {
    ExecService::new(PS_TIMEOUT)
}

/// Does a container with exactly this name respond to `docker ps`?
pub fn container_is_running(name: &str) -> bool {
    if probing_disabled() {
        return false;
    }
    let Ok(runtime) = runtime_path() else {
        return false;
    };
    let out = exec_service().run(
        ExecRequest::new(runtime)
            .args(["ps", "--filter"])
            .arg(format!("name=^{name}$"))
            .args(["--format", "{{.Names}}"]),
    );
    match out {
        Ok(o) if o.success() => o.stdout.lines().any(|l| l.trim() == name),
        _ => false,
    }
}

/// Names of all running containers; empty on any failure.
pub fn running_containers() -> Vec<String> {
    if probing_disabled() {
        return Vec::new();
    }
    let Ok(runtime) = runtime_path() else {
        return Vec::new();
    };
    let out = exec_service().run(
        ExecRequest::new(runtime)
            .arg("ps")
            .args(["--format", "{{.Names}}"]),
    );
    match out {
        Ok(o) if o.success() => o
            .stdout
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Docker network names; empty on any failure.
pub fn networks() -> Vec<String> {
    if probing_disabled() {
        return Vec::new();
    }
    let Ok(runtime) = runtime_path() else {
        return Vec::new();
    };
    let out = exec_service().run(
        ExecRequest::new(runtime)
            .args(["network", "ls"])
            .args(["--format", "{{.Name}}"]),
    );
    match out {
        Ok(o) if o.success() => o
            .stdout
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// `docker cp <local> <container>:<dest_dir>/<file name>`.
pub fn copy_into_container(container: &str, local: &Path, dest_dir: &str) -> io::Result<()> {
    let runtime = runtime_path()?;
    let file_name = local
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "source path has no file name"))?
        .to_string_lossy()
        .to_string();
    let dest = format!("{container}:{}/{file_name}", dest_dir.trim_end_matches('/'));
    let out = ExecService::new(CP_TIMEOUT)
        .run(
            ExecRequest::new(runtime)
                .arg("cp")
                .arg(local)
                .arg(&dest),
        )
        .map_err(io::Error::other)?;
    if out.success() {
        Ok(())
    } else {
        Err(io::Error::other(out.combined()))
    }
}

/// `docker exec <container> <args...>` with a caller-supplied timeout.
pub fn exec_in_container(
    container: &str,
    args: &[String],
    timeout: Duration,
) -> io::Result<ExecOutput> {
    let runtime = runtime_path()?;
    ExecService::new(timeout)
        .run(
            ExecRequest::new(runtime)
                .arg("exec")
                .arg(container)
                .args(args.iter().map(String::as_str)),
        )
        .map_err(io::Error::other)
}

/// Confirm a path landed inside the container (`docker exec ls <path>`).
pub fn path_exists_in_container(container: &str, path: &str) -> bool {
    if probing_disabled() {
        return false;
    }
    exec_in_container(
        container,
        &["ls".to_string(), path.to_string()],
        PS_TIMEOUT,
    )
    .map(|o| o.success())
    .unwrap_or(false)
}
