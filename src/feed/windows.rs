use anyhow::{Result, bail};
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::feed::Event;

/// Per-IP rollup for one time window, merged across every topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Rollup {
    pub ip: String,
    /// Total events for this IP across all topics in the window.
    pub count: u64,
    /// Number of topics that saw this IP in the window.
    pub sensors: u64,
    pub window_start: i64,
    pub window_end: i64,
    /// Maximum risk over every contributing event.
    pub risk: f64,
}

impl Rollup {
    /// Wire shape for the output topic.
    pub fn to_wire(&self, tag: &str, risk_field: &str) -> Value {
        json!({
            "value": self.ip,
            "datatype": "ip_address",
            "tag": tag,
            "other_attributes": {
                "count": self.count,
                "sensors": self.sensors,
                "winstart": self.window_start,
                "winend": self.window_end,
                (risk_field): self.risk,
            }
        })
    }
}

/// All rollups for one fixed-duration window.
#[derive(Debug, Clone, Default)]
pub struct WindowSummary {
    pub start: i64,
    pub end: i64,
    pub rollups: BTreeMap<String, Rollup>,
}

impl WindowSummary {
    /// Rollups ordered by sensor count, then event count, both descending.
    pub fn ranked(&self) -> Vec<&Rollup> {
        let mut out: Vec<&Rollup> = self.rollups.values().collect();
        out.sort_by(|a, b| {
            b.sensors
                .cmp(&a.sensors)
                .then_with(|| b.count.cmp(&a.count))
        });
        out
    }
}

/// Bucket the per-topic event streams into fixed windows anchored at the
/// earliest timestamp seen anywhere, rolling up per-IP counts and max risk.
///
/// Every window between the first and last event is emitted, including empty
/// ones, so the caller's progress output matches the wall-clock coverage.
pub fn aggregate(
    topics: &mut Vec<(String, Vec<Event>)>,
    window_secs: i64,
    verbose: bool,
) -> Result<Vec<WindowSummary>> {
    let mut mark_time = i64::MAX;
    let mut last_time = i64::MIN;

    for (topic, events) in topics.iter_mut() {
        if events.is_empty() {
            continue;
        }
        if verbose {
            println!("Sorting {topic}");
        }
        events.sort_by_key(|e| e.timestamp);
        mark_time = mark_time.min(events[0].timestamp);
        last_time = last_time.max(events[events.len() - 1].timestamp);
    }

    if mark_time == i64::MAX || mark_time <= 0 {
        bail!("no starting timestamps found");
    }

    let windows = (last_time - mark_time + window_secs - 1) / window_secs;
    println!("\nProcessing from {mark_time} to {last_time}");
    println!("   windows {windows}");

    let mut summaries = Vec::new();
    while mark_time < last_time {
        let mark_end = mark_time + window_secs;
        let mut summary = WindowSummary {
            start: mark_time,
            end: mark_end,
            rollups: BTreeMap::new(),
        };

        println!();
        for (topic, events) in topics.iter_mut() {
            println!("{topic} list length: {}", events.len());

            // Per-topic rollup first, so the sensor count below reflects
            // topics rather than raw events.
            let mut per_topic: BTreeMap<String, (u64, f64)> = BTreeMap::new();
            while events.first().is_some_and(|e| e.timestamp < mark_end) {
                let entry = events.remove(0);
                let slot = per_topic.entry(entry.ip).or_insert((0, entry.risk));
                slot.0 += 1;
                if slot.1 < entry.risk {
                    slot.1 = entry.risk;
                }
            }

            for (ip, (count, risk)) in per_topic {
                summary
                    .rollups
                    .entry(ip.clone())
                    .and_modify(|roll| {
                        roll.count += count;
                        roll.sensors += 1;
                        if roll.risk < risk {
                            roll.risk = risk;
                        }
                    })
                    .or_insert(Rollup {
                        ip,
                        count,
                        sensors: 1,
                        window_start: mark_time,
                        window_end: mark_end,
                        risk,
                    });
            }
        }

        println!(
            "rollup time range: {mark_time} to {mark_end}, length: {}",
            summary.rollups.len()
        );

        summaries.push(summary);
        mark_time += window_secs;
    }

    Ok(summaries)
}

/// Print the ranked summary of one window, one line per IP.
pub fn print_ranked(summary: &WindowSummary) {
    for (i, roll) in summary.ranked().iter().enumerate() {
        println!(
            "{:03}  ip: {:>15}   count: {:04}  sensors: {}  ws: {}  we: {}",
            i + 1,
            roll.ip,
            roll.count,
            roll.sensors,
            roll.window_start,
            roll.window_end
        );
    }
}
