use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate, Utc};

use crate::commands::{CommandReport, ensure_binary_available};
use crate::config::EsopsConfig;
use crate::elastic::curl::{CurlRunner, is_bad_connection};
use crate::elastic::mirror;
use crate::elastic::tunnel::{SshTunnel, random_local_port};

#[derive(Debug, Clone, Default)]
pub struct MirrorRangeOptions {
    pub sensors: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub local_port: Option<u16>,
    pub remote_port: Option<u16>,
    pub verbose: bool,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

fn parse_date(raw: &str) -> Result<NaiveDate> {
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), fmt) {
            return Ok(date);
        }
    }
    bail!("unrecognized date `{raw}`; expected YYYY-MM-DD")
}

/// Indices on the sensors settle for two days before they are safe to copy,
/// so the newest allowed end date is two days ago.
pub fn resolve_range(
    start: Option<&str>,
    end: Option<&str>,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate)> {
    let newest_allowed = today - Duration::days(2);

    let end_date = match end {
        Some(raw) => {
            let parsed = parse_date(raw)?;
            if parsed > newest_allowed {
                bail!(
                    "end date cannot be newer than 2 days ago: entered {parsed}, two days ago {newest_allowed}"
                );
            }
            parsed
        }
        None => newest_allowed,
    };

    let start_date = match start {
        Some(raw) => parse_date(raw)?,
        None => end_date,
    };

    if start_date > end_date {
        bail!("start date {start_date} is after end date {end_date}");
    }

    Ok((start_date, end_date))
}

fn daily_index(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}-{}", date.format("%Y.%m.%d"))
}

pub fn run(opts: &MirrorRangeOptions, cfg: &EsopsConfig) -> Result<CommandReport> {
    let mut report = CommandReport::new("mirror-range");

    if !ensure_binary_available("ssh", &mut report) {
        return Ok(report);
    }
    if !ensure_binary_available("curl", &mut report) {
        return Ok(report);
    }

    let (start_date, end_date) = resolve_range(
        opts.start_date.as_deref(),
        opts.end_date.as_deref(),
        Utc::now().date_naive(),
    )
    .context("invalid date range")?;

    if opts.verbose {
        println!("start date: {start_date}");
        println!("  end date: {end_date}");
    }

    let sensors = if opts.sensors.is_empty() {
        cfg.mirror_range.sensors.clone()
    } else {
        opts.sensors.clone()
    };
    let local_port = opts.local_port.unwrap_or_else(random_local_port);
    let remote_port = opts.remote_port.unwrap_or(cfg.mirror_range.remote_port);
    let curl = CurlRunner::new(opts.verbose);

    for sensor in &sensors {
        println!("\nConnecting to: {sensor}");

        let mut tunnel = match SshTunnel::open(sensor, local_port, remote_port, opts.verbose) {
            Ok(tunnel) => tunnel,
            Err(err) => {
                report.issue(format!("tunnel to {sensor} failed: {err}"));
                continue;
            }
        };

        let mut day = start_date;
        let mut checked = 0u64;
        while day <= end_date {
            let from_index = daily_index(&cfg.mirror_range.index_prefix, day);
            let to_index = format!("{sensor}-{from_index}");
            println!("{sensor}: {from_index}  to localhost: {to_index}");

            match mirror::check_copy(&curl, tunnel.local_port(), &from_index, &to_index) {
                Ok(_) => checked += 1,
                Err(err) if is_bad_connection(&err) => {
                    println!("\nError: failed to connect to {sensor}");
                    println!("         skipping the rest of copying for {sensor}\n");
                    report.issue(format!("{sensor}: connection lost mid-copy"));
                    break;
                }
                Err(err) => {
                    tunnel.close();
                    return Err(err);
                }
            }

            day += Duration::days(1);
        }

        report.detail(format!("{sensor}: {checked} daily indices checked"));
        tunnel.close();
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn default_range_is_single_day_two_days_ago() {
        let (start, end) = resolve_range(None, None, day(2024, 3, 10)).expect("range");
        assert_eq!(start, day(2024, 3, 8));
        assert_eq!(end, day(2024, 3, 8));
    }

    #[test]
    fn end_date_newer_than_two_days_ago_is_rejected() {
        let got = resolve_range(None, Some("2024-03-09"), day(2024, 3, 10));
        assert!(got.is_err());
    }

    #[test]
    fn explicit_range_parses_multiple_formats() {
        let (start, end) =
            resolve_range(Some("2024.03.01"), Some("2024-03-05"), day(2024, 3, 10))
                .expect("range");
        assert_eq!(start, day(2024, 3, 1));
        assert_eq!(end, day(2024, 3, 5));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let got = resolve_range(Some("2024-03-06"), Some("2024-03-05"), day(2024, 3, 10));
        assert!(got.is_err());
    }

    #[test]
    fn daily_index_formats_zero_padded() {
        assert_eq!(
            daily_index("logstash", day(2024, 3, 5)),
            "logstash-2024.03.05"
        );
    }
}
