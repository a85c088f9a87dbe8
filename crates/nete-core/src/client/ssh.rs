//! SSH tunnels to a remote backend's Unix socket.
//!
//! The remote socket path is discovered by running `nete socket` on the
//! remote host, then `ssh -N -L` forwards a local socket to it.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use super::ClientError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const SOCKET_NAME: &str = "ssh.socket";

/// A running `ssh -N -L` process and the local end of its forward.
///
/// The process is killed and the temporary directory removed when the
/// tunnel is dropped.
#[derive(Debug)]
pub(crate) struct SshTunnel {
    child: Child,
    dir: PathBuf,
    socket_path: PathBuf,
}

impl SshTunnel {
    pub(crate) async fn open(
        host: &str,
        port: u16,
        username: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let destination = destination(host, username);
        let remote_socket = discover_remote_socket(&destination, port).await?;

        let dir = tunnel_dir()?;
        let socket_path = dir.join(SOCKET_NAME);
        info!(
            %destination,
            remote = %remote_socket,
            local = %socket_path.display(),
            "opening ssh tunnel"
        );

        let child = Command::new("ssh")
            .args(forward_args(&socket_path, &remote_socket, port, &destination))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(error) => {
                let _ = std::fs::remove_dir_all(&dir);
                return Err(ClientError::Ssh(format!("Could not start ssh: {error}")));
            }
        };

        let mut tunnel = Self {
            child,
            dir,
            socket_path,
        };
        tunnel.wait_until_ready(timeout).await?;
        Ok(tunnel)
    }

    pub(crate) fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub(crate) async fn close(mut self) {
        if let Err(error) = self.child.kill().await {
            debug!(%error, "ssh tunnel already gone");
        }
    }

    async fn wait_until_ready(&mut self, timeout: Duration) -> Result<(), ClientError> {
        let deadline = Instant::now() + timeout;
        while !self.socket_path.exists() {
            if let Some(status) = self.child.try_wait().map_err(ssh_io_error)? {
                return Err(ClientError::Ssh(format!(
                    "ssh exited before the tunnel was ready ({status})"
                )));
            }
            if Instant::now() >= deadline {
                return Err(ClientError::Ssh(
                    "Timed out waiting for the ssh tunnel".to_string(),
                ));
            }
            sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

async fn discover_remote_socket(destination: &str, port: u16) -> Result<String, ClientError> {
    let output = Command::new("ssh")
        .args(["-p", &port.to_string(), destination, "nete", "socket"])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(ssh_io_error)?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let socket = stdout.trim();
    if !output.status.success() || socket.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClientError::Ssh(format!(
            "Could not find out socket path on remote side (output of `nete socket` was: {} {})",
            socket,
            stderr.trim()
        )));
    }
    Ok(socket.to_string())
}

fn destination(host: &str, username: Option<&str>) -> String {
    username.map_or_else(|| host.to_string(), |user| format!("{user}@{host}"))
}

fn forward_args(local: &Path, remote: &str, port: u16, destination: &str) -> Vec<String> {
    vec![
        "-N".to_string(),
        "-o".to_string(),
        "ExitOnForwardFailure=yes".to_string(),
        "-p".to_string(),
        port.to_string(),
        "-L".to_string(),
        format!("{}:{remote}", local.display()),
        destination.to_string(),
    ]
}

fn tunnel_dir() -> Result<PathBuf, ClientError> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let dir = dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(format!("nete-ssh-{}-{nanos}", std::process::id()));
    std::fs::create_dir_all(&dir).map_err(ssh_io_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
            .map_err(ssh_io_error)?;
    }

    Ok(dir)
}

fn ssh_io_error(error: std::io::Error) -> ClientError {
    ClientError::Ssh(error.to_string())
}
