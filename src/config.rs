use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub hosts: Vec<String>,
    pub remote_port: u16,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["pumpkin".to_string()],
            remote_port: 9200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorRangeConfig {
    pub sensors: Vec<String>,
    pub remote_port: u16,
    pub index_prefix: String,
}

impl Default for MirrorRangeConfig {
    fn default() -> Self {
        Self {
            sensors: vec![
                "tpot".to_string(),
                "tpot2".to_string(),
                "tpot3".to_string(),
                "tpot4".to_string(),
            ],
            remote_port: 64298,
            index_prefix: "logstash".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub scroll_wait: String,
    pub scroll_size: u64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scroll_wait: "30s".to_string(),
            scroll_size: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub brokers: Vec<String>,
    pub topics: Vec<String>,
    pub out_topic: String,
    pub group_id: String,
    pub window_secs: u64,
    pub out_tag: String,
    pub risk_field: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9091".to_string()],
            topics: vec![
                "badips_tpot1".to_string(),
                "badips_tpot2".to_string(),
                "badips_tpot3".to_string(),
                "badips_tpot4".to_string(),
            ],
            out_topic: "tpots_cumulative".to_string(),
            group_id: "mytpot".to_string(),
            window_secs: 86_400,
            out_tag: "cumulative:badips:tpots".to_string(),
            risk_field: "commands_risk".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EsopsConfig {
    pub mirror: MirrorConfig,
    pub mirror_range: MirrorRangeConfig,
    pub export: ExportConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialEsopsConfig {
    mirror: Option<MirrorConfig>,
    mirror_range: Option<MirrorRangeConfig>,
    export: Option<ExportConfig>,
    batch: Option<BatchConfig>,
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_u16(var: &str, fallback: u16) -> u16 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u16>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_csv(var: &str, fallback: &[String]) -> Vec<String> {
    match env::var(var) {
        Ok(v) => {
            let out = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>();
            if out.is_empty() { fallback.to_vec() } else { out }
        }
        Err(_) => fallback.to_vec(),
    }
}

fn validate(cfg: &EsopsConfig) -> Result<()> {
    if cfg.mirror.remote_port == 0 {
        return Err(anyhow!("invalid mirror remote port: must be >= 1"));
    }
    if cfg.mirror_range.remote_port == 0 {
        return Err(anyhow!("invalid mirror-range remote port: must be >= 1"));
    }
    if cfg.mirror_range.index_prefix.trim().is_empty() {
        return Err(anyhow!("invalid mirror-range index prefix: cannot be empty"));
    }
    if cfg.export.scroll_size == 0 {
        return Err(anyhow!("invalid export scroll size: must be >= 1"));
    }
    if cfg.export.scroll_wait.trim().is_empty() {
        return Err(anyhow!("invalid export scroll wait: cannot be empty"));
    }
    if cfg.batch.brokers.is_empty() {
        return Err(anyhow!("invalid batch brokers: need at least one"));
    }
    if cfg.batch.window_secs == 0 {
        return Err(anyhow!("invalid batch window: must be >= 1 second"));
    }
    if cfg.batch.risk_field.trim().is_empty() {
        return Err(anyhow!("invalid batch risk field: cannot be empty"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("ESOPS_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".esops").join("esops.toml"))
}

fn merge_file_config(base: &mut EsopsConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialEsopsConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse esops config {}: {err}", path.display()))?;
    if let Some(mirror) = parsed.mirror {
        base.mirror = mirror;
    }
    if let Some(mirror_range) = parsed.mirror_range {
        base.mirror_range = mirror_range;
    }
    if let Some(export) = parsed.export {
        base.export = export;
    }
    if let Some(batch) = parsed.batch {
        base.batch = batch;
    }
    Ok(())
}

pub fn load_config() -> Result<EsopsConfig> {
    let mut cfg = EsopsConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.mirror.hosts = env_or_csv("ESOPS_MIRROR_HOSTS", &cfg.mirror.hosts);
    cfg.mirror.remote_port = env_or_u16("ESOPS_MIRROR_RPORT", cfg.mirror.remote_port);
    cfg.mirror_range.sensors = env_or_csv("ESOPS_RANGE_SENSORS", &cfg.mirror_range.sensors);
    cfg.mirror_range.remote_port = env_or_u16("ESOPS_RANGE_RPORT", cfg.mirror_range.remote_port);
    cfg.mirror_range.index_prefix =
        env_or_string("ESOPS_RANGE_INDEX_PREFIX", &cfg.mirror_range.index_prefix);
    cfg.export.scroll_wait = env_or_string("ESOPS_SCROLL_WAIT", &cfg.export.scroll_wait);
    cfg.export.scroll_size = env_or_u64("ESOPS_SCROLL_SIZE", cfg.export.scroll_size);
    cfg.batch.brokers = env_or_csv("ESOPS_KAFKA_BROKERS", &cfg.batch.brokers);
    cfg.batch.topics = env_or_csv("ESOPS_BATCH_TOPICS", &cfg.batch.topics);
    cfg.batch.out_topic = env_or_string("ESOPS_BATCH_OUT_TOPIC", &cfg.batch.out_topic);
    cfg.batch.group_id = env_or_string("ESOPS_BATCH_GROUP_ID", &cfg.batch.group_id);
    cfg.batch.window_secs = env_or_u64("ESOPS_BATCH_WINDOW_SECS", cfg.batch.window_secs);
    cfg.batch.out_tag = env_or_string("ESOPS_BATCH_TAG", &cfg.batch.out_tag);
    cfg.batch.risk_field = env_or_string("ESOPS_BATCH_RISK_FIELD", &cfg.batch.risk_field);

    validate(&cfg)?;
    Ok(cfg)
}
