use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::config::EsopsConfig;
use crate::elastic::query::BoolQuery;
use crate::elastic::scroll::{ScrollOptions, scroll_search};
use crate::fsdb::flatten::flatten_source;
use crate::fsdb::timeparse::parse_epoch_secs;
use crate::fsdb::{Table, io as fsdb_io};

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub host: String,
    pub port: u16,
    pub index: String,
    /// Stop after this many hits; 0 means everything.
    pub size: u64,
    pub query: BoolQuery,
    pub fields: Vec<String>,
    pub flatten: bool,
    pub add_header: bool,
    pub insecure: bool,
    pub url_prefix: bool,
    /// Output path; stdout when unset.
    pub outfile: Option<PathBuf>,
}

/// Drop zero rows, rewrite the time column to epoch seconds, and sort by it.
/// Rows whose value does not parse keep their original cell.
fn normalize_time_column(table: &mut Table, time_field: &str) -> bool {
    let Some(idx) = table.column_index(time_field) else {
        println!("WARNING: Did not find {time_field} in header. Not transforming");
        return false;
    };

    table.rows.retain(|row| row[idx] != "0");
    for row in &mut table.rows {
        if let Some(epoch) = parse_epoch_secs(&row[idx]) {
            row[idx] = epoch.to_string();
        }
    }
    table.sort_by_column_numeric(time_field);
    true
}

fn hits_to_table(hits: &[Value], flatten: bool, fields: Option<&[String]>) -> Table {
    println!("Flattening Results");
    let mut records = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(source) = hit.get("_source").and_then(Value::as_object) else {
            continue;
        };
        records.push(flatten_source(source, flatten, fields));
    }
    Table::from_records(&records)
}

pub fn run(opts: &ExportOptions, cfg: &EsopsConfig) -> Result<CommandReport> {
    let mut report = CommandReport::new("export");

    let scroll = ScrollOptions {
        host: opts.host.clone(),
        port: opts.port,
        insecure: opts.insecure,
        url_prefix: opts.url_prefix,
        scroll_wait: cfg.export.scroll_wait.clone(),
        scroll_size: cfg.export.scroll_size,
        size_cap: opts.size,
    };

    let body = opts.query.build();
    let hits = scroll_search(&scroll, &opts.index, &body)
        .context("query to elasticsearch failed")?;
    if hits.is_empty() {
        bail!("query to elasticsearch returned no documents");
    }
    report.detail(format!("{} documents fetched from {}", hits.len(), opts.index));

    let fields = if opts.fields.is_empty() {
        None
    } else {
        Some(opts.fields.as_slice())
    };
    let mut table = hits_to_table(&hits, opts.flatten, fields);

    if table.move_column_first(&opts.query.time_field) {
        println!("Sorting Results.");
        normalize_time_column(&mut table, &opts.query.time_field);
    } else {
        println!(
            "WARNING: Did not find {} in header. Not transforming",
            opts.query.time_field
        );
    }

    println!("Writing results to file.");
    match &opts.outfile {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            fsdb_io::write_table(file, &table, opts.add_header)?;
            report.detail(format!("{} rows written to {}", table.rows.len(), path.display()));
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hits_without_source_are_skipped() {
        let hits = vec![json!({}), json!({ "_source": { "a": 1 } })];
        let table = hits_to_table(&hits, false, None);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.columns, vec!["a"]);
    }

    #[test]
    fn time_column_normalizes_and_sorts() {
        let hits = vec![
            json!({ "_source": { "@timestamp": "1970-01-01T00:02:00Z", "v": "b" } }),
            json!({ "_source": { "@timestamp": "60", "v": "a" } }),
            json!({ "_source": { "@timestamp": "0", "v": "dropped" } }),
        ];
        let mut table = hits_to_table(&hits, false, None);
        assert!(table.move_column_first("@timestamp"));
        assert!(normalize_time_column(&mut table, "@timestamp"));

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["60", "a"]);
        assert_eq!(table.rows[1], vec!["120", "b"]);
    }

    #[test]
    fn missing_time_column_is_left_alone() {
        let hits = vec![json!({ "_source": { "v": "a" } })];
        let mut table = hits_to_table(&hits, false, None);
        assert!(!normalize_time_column(&mut table, "@timestamp"));
        assert_eq!(table.rows.len(), 1);
    }
}
