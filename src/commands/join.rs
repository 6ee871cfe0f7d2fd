use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::fsdb::pslsplit::{PSL_COLUMNS, split_domain};
use crate::fsdb::{Table, io as fsdb_io};

#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    pub infiles: Vec<PathBuf>,
    pub outfile: Option<PathBuf>,
    pub sort_key: Option<String>,
    pub add_header: bool,
    /// Columns holding domain names to decompose.
    pub psl_keys: Vec<String>,
    /// Also emit merged `_pslpfx`/`_psldom`/`_pslpub` columns across keys.
    pub psl_merged: bool,
}

fn split_column(table: &Table, key: &str) -> Result<Vec<[String; 3]>> {
    let values = table
        .column_values(key)
        .with_context(|| format!("psl key column `{key}` not found"))?;
    Ok(values
        .iter()
        .map(|v| match split_domain(v) {
            Some((pfx, dom, publ)) => [pfx, dom, publ],
            None => Default::default(),
        })
        .collect())
}

fn add_psl_columns(table: &mut Table, opts: &JoinOptions) -> Result<()> {
    // Merged columns take the latest non-empty split for each row, in
    // psl-key order.
    let mut merged: Vec<[String; 3]> = vec![Default::default(); table.rows.len()];

    for key in &opts.psl_keys {
        let splits = split_column(table, key)?;
        for (i, suffix) in PSL_COLUMNS.iter().enumerate() {
            let column = format!("{key}{suffix}");
            let values = splits.iter().map(|s| s[i].clone()).collect();
            table.add_column(&column, values);
        }
        for (slot, split) in merged.iter_mut().zip(&splits) {
            if !split[1].is_empty() {
                *slot = split.clone();
            }
        }
    }

    if opts.psl_merged {
        for (i, suffix) in PSL_COLUMNS.iter().enumerate() {
            let values = merged.iter().map(|s| s[i].clone()).collect();
            table.add_column(suffix, values);
        }
    }
    Ok(())
}

pub fn run(opts: &JoinOptions) -> Result<CommandReport> {
    let mut report = CommandReport::new("join");

    if opts.infiles.is_empty() {
        bail!("join requires at least one input file");
    }

    let mut table = Table::default();
    for path in &opts.infiles {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let part = fsdb_io::read_table(file)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        report.detail(format!("{}: {} rows", path.display(), part.rows.len()));
        table.concat(part);
    }

    if let Some(key) = &opts.sort_key {
        if !table.sort_by_column(key) {
            report.issue(format!("sort key `{key}` not found in any input"));
        } else {
            table.move_column_first(key);
        }
    }

    if !opts.psl_keys.is_empty() {
        add_psl_columns(&mut table, opts)?;
    }

    match &opts.outfile {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            fsdb_io::write_table(file, &table, opts.add_header)?;
            report.detail(format!(
                "{} rows written to {}",
                table.rows.len(),
                path.display()
            ));
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            fsdb_io::write_table(&mut handle, &table, opts.add_header)?;
            handle.flush()?;
            report.detail(format!("{} rows written to stdout", table.rows.len()));
        }
    }

    Ok(report)
}
