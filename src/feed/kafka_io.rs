use anyhow::{Result, anyhow};
use kafka::consumer::{Consumer, FetchOffset, GroupOffsetStorage};
use kafka::producer::{Producer, Record, RequiredAcks};
use serde_json::Value;
use std::time::Duration;

/// How to read each input topic.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Ignore committed group offsets and read the topic from the start.
    pub beginning: bool,
    pub group_id: String,
    /// Stop after this many messages per topic; 0 means drain the topic.
    pub max: u64,
    pub verbose: bool,
}

/// Drain one topic into raw JSON messages. Non-JSON payloads are dropped.
pub fn load_topic(brokers: &[String], topic: &str, opts: &LoadOptions) -> Result<Vec<Value>> {
    if opts.verbose {
        println!("\nLoading topic: {topic}\n");
    }

    let mut builder = Consumer::from_hosts(brokers.to_vec())
        .with_topic(topic.to_string())
        .with_fallback_offset(FetchOffset::Earliest);
    if !opts.beginning {
        // The group id keeps track of the last pull between runs.
        builder = builder
            .with_group(opts.group_id.clone())
            .with_offset_storage(Some(GroupOffsetStorage::Kafka));
    }
    let mut consumer = builder
        .create()
        .map_err(|err| anyhow!("kafka consumer for {topic}: {err}"))?;

    let mut out = Vec::new();
    'drain: loop {
        let sets = consumer
            .poll()
            .map_err(|err| anyhow!("kafka poll on {topic}: {err}"))?;
        if sets.is_empty() {
            break;
        }
        for set in sets.iter() {
            for message in set.messages() {
                if let Ok(value) = serde_json::from_slice::<Value>(message.value) {
                    out.push(value);
                }
                if opts.max != 0 && out.len() as u64 >= opts.max {
                    break 'drain;
                }
            }
            consumer
                .consume_messageset(set)
                .map_err(|err| anyhow!("kafka consume on {topic}: {err}"))?;
        }
    }

    if !opts.beginning {
        consumer
            .commit_consumed()
            .map_err(|err| anyhow!("kafka commit on {topic}: {err}"))?;
    }

    Ok(out)
}

/// Send each rollup payload to the output topic.
pub fn send_rollups(brokers: &[String], topic: &str, payloads: &[Value]) -> Result<()> {
    let mut producer = Producer::from_hosts(brokers.to_vec())
        .with_ack_timeout(Duration::from_secs(1))
        .with_required_acks(RequiredAcks::One)
        .create()
        .map_err(|err| anyhow!("kafka producer: {err}"))?;

    for payload in payloads {
        let bytes = serde_json::to_vec(payload)?;
        producer
            .send(&Record::from_value(topic, bytes))
            .map_err(|err| anyhow!("kafka send to {topic}: {err}"))?;
    }

    Ok(())
}
