use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::time::Duration;

/// Connection and paging options for the export search.
#[derive(Debug, Clone)]
pub struct ScrollOptions {
    pub host: String,
    pub port: u16,
    /// Use HTTPS without certificate verification.
    pub insecure: bool,
    /// Prepend the `es` path segment to every URL.
    pub url_prefix: bool,
    pub scroll_wait: String,
    pub scroll_size: u64,
    /// Stop after this many hits; 0 means no cap.
    pub size_cap: u64,
}

impl ScrollOptions {
    fn base_url(&self) -> String {
        let scheme = if self.insecure { "https" } else { "http" };
        let prefix = if self.url_prefix { "/es" } else { "" };
        format!("{scheme}://{}:{}{prefix}", self.host, self.port)
    }
}

fn build_client(opts: &ScrollOptions) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .danger_accept_invalid_certs(opts.insecure)
        .build()
        .context("failed to build HTTP client")
}

fn hits_of(page: &Value) -> Vec<Value> {
    page.get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Run the query through the scroll API and collect every hit, stopping early
/// at the size cap when one is set.
pub fn scroll_search(opts: &ScrollOptions, index: &str, query: &Value) -> Result<Vec<Value>> {
    let client = build_client(opts)?;
    let base = opts.base_url();

    let mut body = query.clone();
    if let Some(obj) = body.as_object_mut() {
        obj.insert("size".to_string(), json!(opts.scroll_size));
    }

    let search_url = format!("{base}/{index}/_search?scroll={}", opts.scroll_wait);
    let mut page: Value = client
        .post(&search_url)
        .json(&body)
        .send()
        .with_context(|| format!("search request to {search_url} failed"))?
        .json()
        .context("search response was not JSON")?;

    if let Some(err) = page.get("error") {
        anyhow::bail!("search failed: {err}");
    }

    let mut results = Vec::new();
    let scroll_url = format!("{base}/_search/scroll");

    loop {
        let hits = hits_of(&page);
        if hits.is_empty() {
            break;
        }
        results.extend(hits);

        if opts.size_cap > 0 && results.len() as u64 >= opts.size_cap {
            results.truncate(opts.size_cap as usize);
            break;
        }

        let scroll_id = page
            .get("_scroll_id")
            .and_then(Value::as_str)
            .context("scroll response missing _scroll_id")?
            .to_string();

        page = client
            .post(&scroll_url)
            .json(&json!({ "scroll": opts.scroll_wait, "scroll_id": scroll_id }))
            .send()
            .context("scroll continuation request failed")?
            .json()
            .context("scroll continuation response was not JSON")?;
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ScrollOptions {
        ScrollOptions {
            host: "localhost".to_string(),
            port: 9200,
            insecure: false,
            url_prefix: false,
            scroll_wait: "30s".to_string(),
            scroll_size: 10_000,
            size_cap: 0,
        }
    }

    #[test]
    fn base_url_plain() {
        assert_eq!(opts().base_url(), "http://localhost:9200");
    }

    #[test]
    fn base_url_with_prefix_and_tls() {
        let mut o = opts();
        o.insecure = true;
        o.url_prefix = true;
        assert_eq!(o.base_url(), "https://localhost:9200/es");
    }

    #[test]
    fn hits_extraction_tolerates_missing_fields() {
        assert!(hits_of(&json!({})).is_empty());
        let page = json!({ "hits": { "hits": [ { "_source": {} } ] } });
        assert_eq!(hits_of(&page).len(), 1);
    }
}
