use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::EsopsError;

pub fn dump_file_path(dir: &Path, prefix: &str, index: &str) -> PathBuf {
    dir.join(format!("{prefix}{index}.json"))
}

/// Dump each index from the local Elasticsearch to `<dir>/<prefix><index>.json`
/// by driving `elasticdump`. Files that already exist are left alone.
/// Returns the paths that were written.
pub fn dump_indices(
    indices: &[String],
    dir: &Path,
    prefix: &str,
    verbose: bool,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for index in indices {
        let path = dump_file_path(dir, prefix, index);
        println!("elasticdump: dumping: '{index}'");

        if path.exists() {
            println!("    WARNING: File Exists, Skipping: {}\n", path.display());
            continue;
        }

        println!("                  to: '{}'", path.display());

        let input = format!("--input=http://localhost:9200/{index}");
        let output = format!("--output={}", path.display());
        let out = Command::new("elasticdump")
            .args([&input, &output])
            .output()
            .context("failed to run elasticdump")?;

        let stdout = String::from_utf8_lossy(&out.stdout).to_string();
        let stderr = String::from_utf8_lossy(&out.stderr).to_string();

        if !out.status.success() {
            println!("Error: elasticdump: dump failed!");
            println!("   command: elasticdump {input} {output}");
            println!("  response: {}\n  {}\n  {}", out.status, stdout, stderr);
            return Err(EsopsError::DumpFailed(format!(
                "elasticdump exited with {} for index {index}",
                out.status
            ))
            .into());
        }

        if verbose {
            println!("  response: {stdout} : {stderr}");
        }

        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::dump_file_path;
    use std::path::Path;

    #[test]
    fn dump_path_carries_prefix_and_extension() {
        let got = dump_file_path(Path::new("/dumps"), "pumpkin-", "logstash-2024.01.01");
        assert_eq!(
            got,
            Path::new("/dumps/pumpkin-logstash-2024.01.01.json")
        );
    }
}
