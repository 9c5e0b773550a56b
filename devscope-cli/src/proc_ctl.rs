use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("signal process {pid}: {source}")]
    Kill { pid: u32, source: io::Error },
}

fn send(pid: u32, signal: i32) -> Result<(), SignalError> {
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if rc != 0 {
        return Err(SignalError::Kill {
            pid,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Graceful stop (SIGTERM).
pub fn terminate(pid: u32) -> Result<(), SignalError> {
    send(pid, libc::SIGTERM)
}

/// Forceful stop (SIGKILL).
pub fn kill(pid: u32) -> Result<(), SignalError> {
    send(pid, libc::SIGKILL)
}
