use std::time::Duration;

use tokio::process::Child;

/// SIGTERM, then SIGKILL once `grace` elapses.
#[cfg(unix)]
pub async fn kill_graceful(child: &mut Child, grace: Duration) -> std::io::Result<()> {
    if let Some(id) = child.id() {
        // SAFETY: signalling a pid we spawned and have not yet reaped.
        let rc = unsafe { libc::kill(id as libc::pid_t, libc::SIGTERM) };
        if rc == 0 && tokio::time::timeout(grace, child.wait()).await.is_ok() {
            return Ok(());
        }
    }
    child.kill().await
}

#[cfg(not(unix))]
pub async fn kill_graceful(child: &mut Child, _grace: Duration) -> std::io::Result<()> {
    child.kill().await
}
