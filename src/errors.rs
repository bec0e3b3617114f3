//! Error mapping: io::ErrorKind::NotFound exits 127 (command not found),
//! everything else exits 1. Staging failures carry container diagnostics.

use std::fmt;
use std::io;

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (docker or ord missing)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

/// Failure while moving a staged file into the target container.
#[derive(Debug)]
pub enum StageError {
    Io(io::Error),
    /// Copy failed into the named container and every alternative.
    Copy {
        container: String,
        detail: String,
        container_running: bool,
        running: Vec<String>,
    },
}

impl From<io::Error> for StageError {
    fn from(e: io::Error) -> Self {
        StageError::Io(e)
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Io(e) => write!(f, "{e}"),
            StageError::Copy {
                container,
                detail,
                container_running,
                running,
            } => {
                write!(
                    f,
                    "failed to copy into container '{container}': {detail} \
                     (container running: {}; running containers: {})",
                    if *container_running { "yes" } else { "no" },
                    if running.is_empty() {
                        "none".to_string()
                    } else {
                        running.join(", ")
                    }
                )
            }
        }
    }
}

pub fn exit_code_for_stage_error(e: &StageError) -> u8 {
    match e {
        StageError::Io(ioe) => exit_code_for_io_error(ioe),
        StageError::Copy { .. } => 1,
    }
}
