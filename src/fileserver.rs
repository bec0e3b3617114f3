//! Lifecycle for the one auxiliary HTTP file-server child that exposes the
//! cache directory to the container network. The handle is owned by the
//! server state; start/stop are paired methods and the child is killed on
//! drop.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use serde::Serialize;
use which::which;

use crate::probe::first_success;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileServerStatus {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

#[derive(Debug)]
struct ChildHandle {
    child: Child,
    port: u16,
    dir: PathBuf,
}

/// Owned handle for the auxiliary file-server process.
#[derive(Debug, Default)]
pub struct FileServer {
    handle: Option<ChildHandle>,
}

impl FileServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `python -m http.server` on the cache directory. Errors when a
    /// server is already running or no python interpreter is found.
    pub fn start(&mut self, dir: &Path, port: u16) -> io::Result<FileServerStatus> {
        if self.status().running {
            return Err(io::Error::other("file server is already running"));
        }
        let python = first_success(
            ["python3", "python"],
            |c| which(c).is_ok(),
            "python3",
        )
        .value;
        let child = Command::new(python)
            .arg("-m")
            .arg("http.server")
            .arg(port.to_string())
            .arg("--bind")
            .arg("0.0.0.0")
            .arg("--directory")
            .arg(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        self.handle = Some(ChildHandle {
            child,
            port,
            dir: dir.to_path_buf(),
        });
        Ok(self.status())
    }

    /// Kill the child if present; true when something was stopped.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(mut h) => {
                let _ = h.child.kill();
                let _ = h.child.wait();
                true
            }
            None => false,
        }
    }

    pub fn status(&mut self) -> FileServerStatus {
        // Reap a child that exited on its own.
        let exited = match self.handle.as_mut() {
            Some(h) => h.child.try_wait().map(|s| s.is_some()).unwrap_or(true),
            None => false,
        };
        if exited {
            self.handle = None;
        }
        match &self.handle {
            Some(h) => FileServerStatus {
                running: true,
                pid: Some(h.child.id()),
                port: Some(h.port),
                directory: Some(h.dir.display().to_string()),
            },
            None => FileServerStatus {
                running: false,
                pid: None,
                port: None,
                directory: None,
            },
        }
    }
}

impl Drop for FileServer {
    fn drop(&mut self) {
        self.stop();
    }
}
