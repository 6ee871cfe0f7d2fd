use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, ensure_binary_available};
use crate::elastic::curl::CurlRunner;
use crate::elastic::dump;
use crate::elastic::mirror::{self, IndexFilter};

#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    pub dump_dir: PathBuf,
    pub prefix: String,
    pub list_only: bool,
    pub filter: IndexFilter,
    pub verbose: bool,
}

/// Dump pulls from the local Elasticsearch, so no tunnel is involved.
pub fn run(opts: &DumpOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("dump");

    if !ensure_binary_available("curl", &mut report) {
        return Ok(report);
    }
    if !opts.list_only && !ensure_binary_available("elasticdump", &mut report) {
        return Ok(report);
    }

    let curl = CurlRunner::new(opts.verbose);
    let indices = mirror::list_indices(&curl, 9200, &opts.filter)?;

    if opts.list_only {
        println!(
            "\nList of files that WOULD dump to '{}':\n",
            opts.dump_dir.display()
        );
        println!("{indices:?}");
        report.detail(format!("{} indices would be dumped", indices.len()));
        return Ok(report);
    }

    println!("\nDumping to '{}':\n", opts.dump_dir.display());
    let written = dump::dump_indices(&indices, &opts.dump_dir, &opts.prefix, opts.verbose)?;

    report.detail(format!(
        "{} of {} indices dumped to {}",
        written.len(),
        indices.len(),
        opts.dump_dir.display()
    ));
    Ok(report)
}
