use anyhow::{Context, Result};
use serde_json::Value;
use std::process::Command;

use crate::error::EsopsError;

/// Runs `curl` as a subprocess for all mirror-side HTTP calls.
///
/// A nonzero curl exit is reported as [`EsopsError::BadConnection`]; callers
/// treat that as "give up on this host" rather than a fatal error.
#[derive(Debug, Clone, Copy)]
pub struct CurlRunner {
    pub verbose: bool,
}

impl CurlRunner {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn run(&self, args: &[&str]) -> Result<String> {
        if self.verbose {
            println!("curl_run: curl {}", args.join(" "));
        }

        let out = Command::new("curl")
            .args(args)
            .output()
            .context("failed to run curl")?;

        let stdout = String::from_utf8_lossy(&out.stdout).to_string();
        let stderr = String::from_utf8_lossy(&out.stderr).to_string();

        if !out.status.success() {
            println!("Error: curl_run: unable to connect with curl!");
            println!("   command: curl {}", args.join(" "));
            println!("  response: {}\n  {}\n  {}", out.status, stdout, stderr);
            return Err(EsopsError::BadConnection(format!(
                "curl {} exited with {}",
                args.join(" "),
                out.status
            ))
            .into());
        }

        if self.verbose {
            println!("  response: {stdout} : {stderr}");
        }

        Ok(stdout)
    }

    pub fn run_json(&self, args: &[&str]) -> Result<Value> {
        let raw = self.run(args)?;
        serde_json::from_str(&raw)
            .with_context(|| format!("curl returned non-JSON output: {}", raw.trim()))
    }
}

/// True when `err` is a curl connection failure, the signal to skip the rest
/// of the current host.
pub fn is_bad_connection(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<EsopsError>(),
        Some(EsopsError::BadConnection(_))
    )
}
