use anyhow::{Context, Result, bail};
use std::io::{BufRead, BufReader, Read, Write};

use crate::fsdb::Table;

/// Read an fsdb stream. The first line must be a `#fsdb` header; column
/// names may carry a `:type` suffix, which is dropped. Later comment lines
/// are skipped. Rows go through the same csv dialect the write path uses,
/// so quoted cells holding tabs or quotes survive a round trip.
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut reader = BufReader::new(reader);

    let mut header = String::new();
    let read = reader
        .read_line(&mut header)
        .context("failed to read fsdb header")?;
    if read == 0 {
        bail!("empty fsdb input");
    }
    let columns = parse_header(header.trim_end())?;

    let mut table = Table::with_columns(columns);
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(reader);
    for record in csv.records() {
        let record = record.context("failed to read fsdb row")?;
        let mut row: Vec<String> = record.iter().map(ToOwned::to_owned).collect();
        row.resize(table.columns.len(), String::new());
        table.rows.push(row);
    }

    Ok(table)
}

fn parse_header(line: &str) -> Result<Vec<String>> {
    if !line.starts_with("#fsdb") {
        bail!("missing #fsdb header, got: {line}");
    }

    let mut tokens = line.split_whitespace().skip(1).peekable();
    // Skip separator flags such as `-F t`.
    while let Some(tok) = tokens.peek() {
        if *tok == "-F" {
            tokens.next();
            tokens.next();
        } else if tok.starts_with('-') {
            tokens.next();
        } else {
            break;
        }
    }

    let columns: Vec<String> = tokens
        .map(|tok| tok.split(':').next().unwrap_or(tok).to_string())
        .collect();
    if columns.is_empty() {
        bail!("fsdb header names no columns: {line}");
    }
    Ok(columns)
}

/// Write a table as tab-separated rows, optionally preceded by the
/// `#fsdb -F t <columns>` header line.
pub fn write_table<W: Write>(mut writer: W, table: &Table, add_header: bool) -> Result<()> {
    if add_header {
        let mut header = String::from("#fsdb -F t");
        for col in &table.columns {
            header.push(' ');
            header.push_str(col);
        }
        writeln!(writer, "{header}")?;
    }

    let mut csv = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);
    for row in &table.rows {
        csv.write_record(row)?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_header_and_rows() {
        let mut table = Table::with_columns(vec!["ts".to_string(), "ip".to_string()]);
        table.rows.push(vec!["100".to_string(), "10.0.0.1".to_string()]);

        let mut buf = Vec::new();
        write_table(&mut buf, &table, true).expect("write");
        let text = String::from_utf8(buf.clone()).expect("utf8");
        assert!(text.starts_with("#fsdb -F t ts ip\n"));

        let back = read_table(buf.as_slice()).expect("read");
        assert_eq!(back, table);
    }

    #[test]
    fn cells_with_tabs_round_trip() {
        let mut table = Table::with_columns(vec!["input".to_string(), "ip".to_string()]);
        table.rows.push(vec![
            "cat /etc/passwd\twhoami".to_string(),
            "10.0.0.1".to_string(),
        ]);
        table
            .rows
            .push(vec!["echo \"hi\"".to_string(), "10.0.0.2".to_string()]);

        let mut buf = Vec::new();
        write_table(&mut buf, &table, true).expect("write");
        let back = read_table(buf.as_slice()).expect("read");
        assert_eq!(back, table);
    }

    #[test]
    fn header_type_suffixes_are_dropped() {
        let cols = parse_header("#fsdb -F t ts:l ip:s").expect("parse");
        assert_eq!(cols, vec!["ts", "ip"]);
    }

    #[test]
    fn rejects_non_fsdb_input() {
        assert!(read_table("ts\tip\n100\tx\n".as_bytes()).is_err());
    }

    #[test]
    fn short_rows_are_padded() {
        let table = read_table("#fsdb -F t a b c\n1\t2\n".as_bytes()).expect("read");
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn comment_lines_are_skipped() {
        let table =
            read_table("#fsdb -F t a\n1\n#  | some trailer\n2\n".as_bytes()).expect("read");
        assert_eq!(table.rows.len(), 2);
    }
}
