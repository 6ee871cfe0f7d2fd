use anyhow::{Result, anyhow};
use serde_json::{Map, Value, json};
use std::str::FromStr;

/// A `name:value` pair from the command line, used for match clauses and
/// date-range bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}

impl FromStr for NameValue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((name, value)) = s.split_once(':') else {
            return Err(anyhow!("expected name:value, got `{s}`"));
        };
        if name.is_empty() || value.is_empty() {
            return Err(anyhow!("expected name:value, got `{s}`"));
        }
        Ok(Self {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// Bool-query inputs for the export search.
#[derive(Debug, Clone, Default)]
pub struct BoolQuery {
    pub must: Vec<NameValue>,
    pub must_not: Vec<NameValue>,
    pub should: Vec<NameValue>,
    pub date_range: Vec<NameValue>,
    pub time_field: String,
}

fn match_clauses(pairs: &[NameValue]) -> Vec<Value> {
    pairs
        .iter()
        .map(|nv| json!({ "match": { (nv.name.clone()): nv.value.clone() } }))
        .collect()
}

impl BoolQuery {
    /// Render the Elasticsearch query body. A date range, when given, leads
    /// the `must` list as a range clause on the time field.
    pub fn build(&self) -> Value {
        let mut must = Vec::new();
        if !self.date_range.is_empty() {
            let mut bounds = Map::new();
            for nv in &self.date_range {
                bounds.insert(nv.name.clone(), Value::String(nv.value.clone()));
            }
            must.push(json!({ "range": { (self.time_field.clone()): Value::Object(bounds) } }));
        }
        must.extend(match_clauses(&self.must));

        json!({
            "query": {
                "bool": {
                    "must": must,
                    "must_not": match_clauses(&self.must_not),
                    "should": match_clauses(&self.should),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_value_parses_and_rejects() {
        let nv: NameValue = "src_ip:10.0.0.1".parse().expect("parse");
        assert_eq!(nv.name, "src_ip");
        assert_eq!(nv.value, "10.0.0.1");
        assert!("noseparator".parse::<NameValue>().is_err());
        assert!(":empty".parse::<NameValue>().is_err());
    }

    #[test]
    fn value_may_contain_colons() {
        let nv: NameValue = "ts:2024-01-01T00:00:00".parse().expect("parse");
        assert_eq!(nv.value, "2024-01-01T00:00:00");
    }

    #[test]
    fn date_range_leads_must() {
        let q = BoolQuery {
            must: vec!["type:cowrie".parse().expect("nv")],
            date_range: vec!["gte:2024-01-01".parse().expect("nv")],
            time_field: "@timestamp".to_string(),
            ..BoolQuery::default()
        };
        let body = q.build();
        let must = body["query"]["bool"]["must"].as_array().expect("must");
        assert_eq!(must.len(), 2);
        assert_eq!(must[0]["range"]["@timestamp"]["gte"], "2024-01-01");
        assert_eq!(must[1]["match"]["type"], "cowrie");
    }

    #[test]
    fn empty_query_builds_empty_bool() {
        let body = BoolQuery::default().build();
        assert_eq!(
            body["query"]["bool"]["must"].as_array().map(Vec::len),
            Some(0)
        );
    }
}
