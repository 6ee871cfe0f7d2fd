use anyhow::Result;

use crate::commands::{CommandReport, ensure_binary_available};
use crate::config::EsopsConfig;
use crate::elastic::curl::{CurlRunner, is_bad_connection};
use crate::elastic::mirror::{self, CopyDecision, IndexFilter};
use crate::elastic::tunnel::{SshTunnel, random_local_port};

#[derive(Debug, Clone, Default)]
pub struct MirrorOptions {
    pub hosts: Vec<String>,
    pub local_port: Option<u16>,
    pub remote_port: Option<u16>,
    /// Maximum number of copy attempts; 0 means unlimited.
    pub num: u64,
    pub list_only: bool,
    pub prefix: Option<String>,
    pub filter: IndexFilter,
    pub verbose: bool,
}

pub fn run(opts: &MirrorOptions, cfg: &EsopsConfig) -> Result<CommandReport> {
    let mut report = CommandReport::new("mirror");

    if !ensure_binary_available("ssh", &mut report) {
        return Ok(report);
    }
    if !ensure_binary_available("curl", &mut report) {
        return Ok(report);
    }

    let hosts = if opts.hosts.is_empty() {
        cfg.mirror.hosts.clone()
    } else {
        opts.hosts.clone()
    };
    let local_port = opts.local_port.unwrap_or_else(random_local_port);
    let remote_port = opts.remote_port.unwrap_or(cfg.mirror.remote_port);
    let curl = CurlRunner::new(opts.verbose);

    let mut remaining = opts.num;
    let counting = opts.num > 0;

    for host in &hosts {
        println!("\nConnecting to: {host}");

        let mut tunnel = match SshTunnel::open(host, local_port, remote_port, opts.verbose) {
            Ok(tunnel) => tunnel,
            Err(err) => {
                report.issue(format!("tunnel to {host} failed: {err}"));
                continue;
            }
        };

        let indices = match mirror::list_indices(&curl, tunnel.local_port(), &opts.filter) {
            Ok(indices) => indices,
            Err(err) => {
                report.issue(format!("listing indices on {host} failed: {err}"));
                tunnel.close();
                continue;
            }
        };

        if opts.list_only {
            println!("\nIndexes:\n");
            println!("{indices:?}");
            report.detail(format!("{host}: listed {} indices", indices.len()));
            tunnel.close();
            continue;
        }

        let mut copied = 0u64;
        for index in &indices {
            let to_index = match &opts.prefix {
                Some(prefix) => format!("{prefix}-{index}"),
                None => format!("{host}-{index}"),
            };
            println!("{host}: {index}  to localhost: {to_index}");

            match mirror::check_copy(&curl, tunnel.local_port(), index, &to_index) {
                Ok(decision) => {
                    if matches!(decision, CopyDecision::Copy | CopyDecision::Recopy) {
                        copied += 1;
                        if counting {
                            remaining -= 1;
                            if remaining == 0 {
                                println!("\nReached maximum attempts set\n");
                                break;
                            }
                            println!("{remaining} attempts left");
                        }
                    }
                }
                Err(err) if is_bad_connection(&err) => {
                    println!("\nError: failed to connect to {host}");
                    println!("         skipping the rest of copying for {host}\n");
                    report.issue(format!("{host}: connection lost mid-copy"));
                    break;
                }
                Err(err) => {
                    tunnel.close();
                    return Err(err);
                }
            }
        }

        report.detail(format!(
            "{host}: {} indices checked, {copied} copied",
            indices.len()
        ));
        tunnel.close();

        if counting && remaining == 0 {
            break;
        }
    }

    Ok(report)
}
