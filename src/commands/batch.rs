use anyhow::Result;

use crate::commands::CommandReport;
use crate::config::EsopsConfig;
use crate::feed::kafka_io::{LoadOptions, load_topic, send_rollups};
use crate::feed::windows::{aggregate, print_ranked};
use crate::feed::{Event, parse_event};

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub beginning: bool,
    pub window_secs: Option<u64>,
    pub group_id: Option<String>,
    /// Per-topic message cap for debugging; 0 means drain.
    pub max: u64,
    /// Print rollups to stdout instead of producing to Kafka.
    pub debug: bool,
    pub verbose: bool,
}

pub fn run(opts: &BatchOptions, cfg: &EsopsConfig) -> Result<CommandReport> {
    let mut report = CommandReport::new("batch");

    let load = LoadOptions {
        beginning: opts.beginning,
        group_id: opts
            .group_id
            .clone()
            .unwrap_or_else(|| cfg.batch.group_id.clone()),
        max: opts.max,
        verbose: opts.verbose,
    };
    let window_secs = opts.window_secs.unwrap_or(cfg.batch.window_secs) as i64;

    let mut topics: Vec<(String, Vec<Event>)> = Vec::new();
    let mut skipped = 0u64;
    for topic in &cfg.batch.topics {
        let raw = load_topic(&cfg.batch.brokers, topic, &load)?;
        let mut events = Vec::with_capacity(raw.len());
        for value in &raw {
            match parse_event(value, &cfg.batch.risk_field) {
                Some(event) => events.push(event),
                None => skipped += 1,
            }
        }
        report.detail(format!("{topic}: {} events loaded", events.len()));
        topics.push((topic.clone(), events));
    }
    if skipped > 0 {
        report.detail(format!("{skipped} events skipped for missing fields"));
    }

    let summaries = aggregate(&mut topics, window_secs, opts.verbose)?;
    report.detail(format!("{} windows aggregated", summaries.len()));

    let mut forwarded = 0u64;
    for summary in &summaries {
        if opts.verbose {
            print_ranked(summary);
        }

        let payloads: Vec<_> = summary
            .ranked()
            .iter()
            .map(|roll| roll.to_wire(&cfg.batch.out_tag, &cfg.batch.risk_field))
            .collect();

        if opts.debug {
            for payload in &payloads {
                println!("{payload}");
            }
        } else if !payloads.is_empty() {
            send_rollups(&cfg.batch.brokers, &cfg.batch.out_topic, &payloads)?;
            forwarded += payloads.len() as u64;
        }
    }

    if opts.debug {
        report.detail("debug mode: rollups printed, none forwarded".to_string());
    } else {
        report.detail(format!(
            "{forwarded} rollups forwarded to {}",
            cfg.batch.out_topic
        ));
    }

    Ok(report)
}
