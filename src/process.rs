//! Terminate processes by command name (a `killall` equivalent)

use anyhow::{Context, Result};
use std::fs;
use tracing::{debug, info, warn};

use crate::constants::paths;

/// PIDs whose `/proc/<pid>/comm` equals `name`, excluding ourselves
pub fn find_by_name(name: &str) -> Result<Vec<u32>> {
    let own_pid = std::process::id();
    let mut pids = Vec::new();

    for entry in fs::read_dir(paths::PROC_DIR)
        .context(format!("Failed to read {}", paths::PROC_DIR))?
    {
        let Ok(entry) = entry else { continue };
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.parse::<u32>().ok())
        else {
            continue;
        };
        if pid == own_pid {
            continue;
        }

        // Processes can exit between listing and reading
        let comm_path = paths::PROC_COMM_FORMAT.replace("{}", &pid.to_string());
        if let Ok(comm) = fs::read_to_string(&comm_path) {
            if comm.trim_end() == name {
                pids.push(pid);
            }
        }
    }

    Ok(pids)
}

/// Send SIGTERM to every process called `name`. Returns how many were signalled.
#[cfg(unix)]
pub fn terminate_by_name(name: &str) -> Result<usize> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pids = find_by_name(name)?;
    if pids.is_empty() {
        info!(process = name, "No running process to terminate");
        return Ok(0);
    }

    let mut signalled = 0;
    for pid in pids {
        let Ok(raw) = i32::try_from(pid) else { continue };
        match kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => {
                debug!(pid, process = name, "Sent SIGTERM");
                signalled += 1;
            }
            Err(e) => warn!(pid, process = name, error = %e, "Failed to signal process"),
        }
    }
    info!(process = name, count = signalled, "Terminated processes");
    Ok(signalled)
}

#[cfg(not(unix))]
pub fn terminate_by_name(name: &str) -> Result<usize> {
    anyhow::bail!("terminating '{name}' is only supported on unix")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_name_ignores_unknown() {
        let pids = find_by_name("no-such-process-name").unwrap();
        assert!(pids.is_empty());
    }

    #[test]
    fn test_find_by_name_excludes_self() {
        let own = fs::read_to_string(format!("/proc/{}/comm", std::process::id())).unwrap();
        let pids = find_by_name(own.trim_end()).unwrap();
        assert!(!pids.contains(&std::process::id()));
    }

    #[test]
    fn test_terminate_nothing() {
        assert_eq!(terminate_by_name("no-such-process-name").unwrap(), 0);
    }
}
