pub mod kafka_io;
pub mod windows;

use serde_json::Value;

/// One IP-reputation event pulled off a topic, reduced to the fields the
/// window aggregation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub timestamp: i64,
    pub ip: String,
    pub risk: f64,
}

/// Extract an [`Event`] from a raw message. Events missing the timestamp,
/// value, or risk field are skipped by returning `None`.
pub fn parse_event(raw: &Value, risk_field: &str) -> Option<Event> {
    let timestamp = match raw.get("timestamp")? {
        // Float timestamps truncate toward zero rather than skipping.
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    let ip = raw.get("value")?.as_str()?.to_string();
    let risk = raw.get("other_attributes")?.get(risk_field)?.as_f64()?;

    Some(Event {
        timestamp,
        ip,
        risk,
    })
}

#[cfg(test)]
mod tests {
    use super::parse_event;
    use serde_json::json;

    #[test]
    fn parses_complete_event() {
        let raw = json!({
            "timestamp": 1700000000,
            "value": "10.0.0.1",
            "tag": "badips",
            "other_attributes": { "commands_risk": 3 }
        });
        let ev = parse_event(&raw, "commands_risk").expect("event");
        assert_eq!(ev.timestamp, 1_700_000_000);
        assert_eq!(ev.ip, "10.0.0.1");
        assert_eq!(ev.risk, 3.0);
    }

    #[test]
    fn string_timestamps_are_accepted() {
        let raw = json!({
            "timestamp": "1700000000",
            "value": "10.0.0.1",
            "other_attributes": { "commands_risk": 0 }
        });
        assert!(parse_event(&raw, "commands_risk").is_some());
    }

    #[test]
    fn float_timestamps_truncate() {
        let raw = json!({
            "timestamp": 1700000000.5,
            "value": "10.0.0.1",
            "other_attributes": { "commands_risk": 1 }
        });
        let ev = parse_event(&raw, "commands_risk").expect("event");
        assert_eq!(ev.timestamp, 1_700_000_000);
    }

    #[test]
    fn missing_fields_skip_the_event() {
        let raw = json!({ "value": "10.0.0.1" });
        assert!(parse_event(&raw, "commands_risk").is_none());

        let raw = json!({
            "timestamp": 1,
            "value": "10.0.0.1",
            "other_attributes": {}
        });
        assert!(parse_event(&raw, "commands_risk").is_none());
    }
}
