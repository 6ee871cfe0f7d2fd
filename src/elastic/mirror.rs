use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::elastic::curl::CurlRunner;

/// Index name filters applied to the `_cat/indices` listing.
#[derive(Debug, Clone, Default)]
pub struct IndexFilter {
    pub include: Option<String>,
    pub exclude: Option<String>,
    /// Drop only `users` and dot-indices instead of the full default set.
    pub exclude_override: bool,
    pub sort: bool,
    pub reverse: bool,
}

/// What to do with one index pair after comparing document counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDecision {
    /// Source index does not exist; nothing to do.
    SourceMissing,
    /// Destination does not exist yet.
    Copy,
    /// Counts match; leave the destination alone.
    UpToDate,
    /// Destination is behind; delete it and copy again.
    Recopy,
    /// Destination has more documents than the source. Should not happen.
    CountRegression,
}

pub fn decide(source_count: Option<u64>, dest_count: Option<u64>) -> CopyDecision {
    match (source_count, dest_count) {
        (None, _) => CopyDecision::SourceMissing,
        (Some(_), None) => CopyDecision::Copy,
        (Some(s), Some(d)) if s == d => CopyDecision::UpToDate,
        (Some(s), Some(d)) if s > d => CopyDecision::Recopy,
        _ => CopyDecision::CountRegression,
    }
}

/// Sort rank for index names carrying an embedded `-YYYY.MM.DD` date, so a
/// listing sorts chronologically instead of lexically. Names without a date
/// rank 0 and stay at the front.
pub fn index_date_rank(name: &str) -> u64 {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    let re = DATE_RE.get_or_init(|| {
        Regex::new(r"(?P<name>.+-)\d\d(?P<year>\d\d)\.(?P<month>\d+)\.(?P<day>\d+)")
            .expect("static regex")
    });
    let Some(caps) = re.captures(name) else {
        return 0;
    };

    // Host number, if any, sits at the end of the first name segment, so
    // tpot2-logstash-... ranks after tpot-logstash-... for the same date.
    let base = caps.name("name").map(|m| m.as_str()).unwrap_or("");
    let first = base.split('-').next().unwrap_or("");
    let digits: String = first
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .chars()
        .rev()
        .collect();
    let num: u64 = digits.parse().unwrap_or(0);

    let year: u64 = caps["year"].parse().unwrap_or(0);
    let month: u64 = caps["month"].parse().unwrap_or(0);
    let day: u64 = caps["day"].parse().unwrap_or(0);

    num * 1_000_000 + year * 10_000 + month * 100 + day
}

fn build_exclude_regex(filter: &IndexFilter) -> Result<Regex> {
    let base = if filter.exclude_override {
        r"^(users|\.)".to_string()
    } else {
        r"^(users|\.|filebeat|metricbeat)".to_string()
    };
    let pattern = match &filter.exclude {
        Some(extra) if !extra.trim().is_empty() => format!("{base}|{extra}"),
        _ => base,
    };
    Regex::new(&pattern).with_context(|| format!("invalid exclude regex: {pattern}"))
}

/// List index names visible through the given port, filtered and optionally
/// sorted by embedded date.
pub fn list_indices(curl: &CurlRunner, port: u16, filter: &IndexFilter) -> Result<Vec<String>> {
    let url = format!("http://localhost:{port}/_cat/indices/");
    let raw = curl.run(&["-X", "GET", &url])?;

    // _cat/indices lines look like `health status index uuid pri rep ...`.
    let names = raw
        .lines()
        .filter_map(|line| line.split_whitespace().nth(2))
        .map(ToOwned::to_owned)
        .collect::<Vec<_>>();

    let exclude = build_exclude_regex(filter)?;
    let mut filtered: Vec<String> = names
        .into_iter()
        .filter(|name| !exclude.is_match(name))
        .collect();

    if let Some(include) = &filter.include {
        let include =
            Regex::new(include).with_context(|| format!("invalid include regex: {include}"))?;
        filtered.retain(|name| include.is_match(name));
    }

    if filter.sort {
        filtered.sort_by_key(|name| index_date_rank(name));
        if filter.reverse {
            filtered.reverse();
        }
    }

    Ok(filtered)
}

/// Document count of an index, or `None` when the index does not exist.
pub fn index_count(curl: &CurlRunner, port: u16, index: &str) -> Result<Option<u64>> {
    let url = format!("http://localhost:{port}/{index}/_count");
    let parsed = curl.run_json(&["-X", "GET", &url])?;
    Ok(parsed.get("count").and_then(Value::as_u64))
}

pub fn delete_index(curl: &CurlRunner, port: u16, index: &str) -> Result<()> {
    let url = format!("http://localhost:{port}/{index}/");
    curl.run(&["-X", "DELETE", &url])?;
    Ok(())
}

/// Result of a `_reindex` call.
#[derive(Debug, Clone)]
pub struct CopyOutcome {
    pub created: Option<u64>,
    pub failures: Vec<Value>,
}

/// Copy one index from the tunneled remote into the local Elasticsearch.
///
/// The destination is created first and its mapping field limit raised from
/// the Elasticsearch default 1000 to the 2000 the T-Pot stack needs; errors
/// on those two preparation calls surface during the copy itself.
pub fn copy_index(
    curl: &CurlRunner,
    tunnel_port: u16,
    from_index: &str,
    to_index: &str,
) -> Result<CopyOutcome> {
    let create_url = format!("http://localhost:9200/{to_index}");
    curl.run(&["-X", "PUT", &create_url])?;

    let settings_url = format!("http://localhost:9200/{to_index}/_settings");
    curl.run(&[
        "-X",
        "PUT",
        &settings_url,
        "-H",
        "Content-Type: application/json",
        "-d",
        "{ \"index.mapping.total_fields.limit\": 2000 }",
    ])?;

    let body = serde_json::json!({
        "source": {
            "remote": { "host": format!("http://localhost:{tunnel_port}") },
            "index": from_index,
            "query": { "match_all": {} },
        },
        "dest": { "index": to_index },
    })
    .to_string();

    let parsed = curl.run_json(&[
        "-X",
        "POST",
        "http://localhost:9200/_reindex?pretty",
        "-H",
        "Content-Type: application/json",
        "-d",
        &body,
    ])?;

    let created = parsed.get("created").and_then(Value::as_u64);
    let failures = parsed
        .get("failures")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    match created {
        Some(n) => println!("    Documents Created: {n}"),
        None => println!("Error: copy failed:\n  {parsed}"),
    }
    if !failures.is_empty() {
        println!("    Failures found: {}", failures.len());
        for fail in &failures {
            println!("{fail}");
        }
    }

    Ok(CopyOutcome { created, failures })
}

/// Compare source and destination counts and copy when needed. Returns the
/// decision that was acted on.
pub fn check_copy(
    curl: &CurlRunner,
    tunnel_port: u16,
    from_index: &str,
    to_index: &str,
) -> Result<CopyDecision> {
    let dest = index_count(curl, 9200, to_index)?;
    let source = index_count(curl, tunnel_port, from_index)?;

    let decision = decide(source, dest);
    match decision {
        CopyDecision::SourceMissing => {
            println!("  Index Not Found: Skipping: '{from_index}'\n");
        }
        CopyDecision::Copy => {
            println!("  Copying:  {}:{}", from_index, source.unwrap_or(0));
            copy_index(curl, tunnel_port, from_index, to_index)?;
        }
        CopyDecision::UpToDate => {
            println!(
                "  Exists already: Skipping: {} == {}:{}",
                source.unwrap_or(0),
                to_index,
                dest.unwrap_or(0)
            );
        }
        CopyDecision::Recopy => {
            println!("  Deleting and Copying: document sizes do not match:");
            println!(
                "    {}:{} > {}:{}",
                from_index,
                source.unwrap_or(0),
                to_index,
                dest.unwrap_or(0)
            );
            delete_index(curl, 9200, to_index)?;
            copy_index(curl, tunnel_port, from_index, to_index)?;
        }
        CopyDecision::CountRegression => {
            println!(
                "ERROR: destination ahead of source: {}:{} < {}:{}",
                from_index,
                source.unwrap_or(0),
                to_index,
                dest.unwrap_or(0)
            );
        }
    }

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decide_covers_all_count_cases() {
        assert_eq!(decide(None, Some(5)), CopyDecision::SourceMissing);
        assert_eq!(decide(Some(5), None), CopyDecision::Copy);
        assert_eq!(decide(Some(5), Some(5)), CopyDecision::UpToDate);
        assert_eq!(decide(Some(9), Some(5)), CopyDecision::Recopy);
        assert_eq!(decide(Some(5), Some(9)), CopyDecision::CountRegression);
    }

    #[test]
    fn date_rank_orders_daily_indices() {
        let a = index_date_rank("logstash-2024.01.02");
        let b = index_date_rank("logstash-2024.01.10");
        let c = index_date_rank("logstash-2024.02.01");
        assert!(a < b && b < c);
    }

    #[test]
    fn date_rank_uses_trailing_host_number() {
        let plain = index_date_rank("tpot-logstash-2024.03.01");
        let numbered = index_date_rank("tpot2-logstash-2024.03.01");
        assert!(plain < numbered);
    }

    #[test]
    fn undated_names_rank_zero() {
        assert_eq!(index_date_rank("users"), 0);
    }

    #[test]
    fn default_exclude_drops_beats_and_dot_indices() {
        let filter = IndexFilter::default();
        let re = build_exclude_regex(&filter).expect("regex");
        assert!(re.is_match(".kibana"));
        assert!(re.is_match("users"));
        assert!(re.is_match("filebeat-7.0"));
        assert!(re.is_match("metricbeat-7.0"));
        assert!(!re.is_match("logstash-2024.01.01"));
    }

    #[test]
    fn exclude_override_keeps_beats() {
        let filter = IndexFilter {
            exclude_override: true,
            ..IndexFilter::default()
        };
        let re = build_exclude_regex(&filter).expect("regex");
        assert!(!re.is_match("filebeat-7.0"));
        assert!(re.is_match(".kibana"));
    }

    #[test]
    fn user_exclude_is_appended() {
        let filter = IndexFilter {
            exclude: Some("^honeytrap".to_string()),
            ..IndexFilter::default()
        };
        let re = build_exclude_regex(&filter).expect("regex");
        assert!(re.is_match("honeytrap-2024.01.01"));
        assert!(!re.is_match("logstash-2024.01.01"));
    }
}
