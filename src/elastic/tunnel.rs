use anyhow::{Context, Result};
use rand::Rng;
use std::process::Command;

use crate::error::EsopsError;

/// Pick an ephemeral local port for the tunnel when the user did not fix one.
pub fn random_local_port() -> u16 {
    rand::thread_rng().gen_range(1024..65024)
}

/// An SSH control-master tunnel forwarding a local port to a remote service.
///
/// The tunnel is opened with `-f -N -M -S <control>` so a later `-O exit`
/// through the same control socket tears it down. Dropping the guard closes
/// the tunnel if it is still open, so a failed copy loop cannot leak one.
pub struct SshTunnel {
    host: String,
    control_path: String,
    local_port: u16,
    verbose: bool,
    open: bool,
}

impl SshTunnel {
    pub fn open(host: &str, local_port: u16, remote_port: u16, verbose: bool) -> Result<Self> {
        let control_path = format!(
            "/tmp/{}:{}:%p",
            host,
            rand::thread_rng().gen_range(0..1_000_000)
        );
        let forward = format!("{local_port}:localhost:{remote_port}");
        let args = [
            "-4",
            "-f",
            "-N",
            "-M",
            "-S",
            control_path.as_str(),
            "-L",
            forward.as_str(),
            host,
        ];

        if verbose {
            println!("open_ssh_tunnel cmd:\n  ssh {}", args.join(" "));
        }

        let status = Command::new("ssh")
            .args(args)
            .status()
            .with_context(|| format!("failed to run ssh for {host}"))?;

        if !status.success() {
            return Err(EsopsError::TunnelFailed(format!(
                "ssh exited with {status} while opening tunnel to {host}"
            ))
            .into());
        }

        Ok(Self {
            host: host.to_string(),
            control_path,
            local_port,
            verbose,
            open: true,
        })
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;

        let args = [
            "-S",
            self.control_path.as_str(),
            "-O",
            "exit",
            self.host.as_str(),
        ];
        if self.verbose {
            println!("close_ssh_tunnel cmd:\n  ssh {}", args.join(" "));
        }

        match Command::new("ssh").args(args).status() {
            Ok(status) if status.success() => {}
            Ok(status) => {
                eprintln!("warning: close_ssh_tunnel: ssh returned {status}");
            }
            Err(err) => {
                eprintln!("warning: close_ssh_tunnel: failed to run ssh: {err}");
            }
        }
    }
}

impl Drop for SshTunnel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::random_local_port;

    #[test]
    fn random_port_stays_unprivileged() {
        for _ in 0..100 {
            let port = random_local_port();
            assert!(port >= 1024);
        }
    }
}
