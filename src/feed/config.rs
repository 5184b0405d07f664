// src/feed/config.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;

const ENV_PATH: &str = "FEED_CONFIG_PATH";

/// Boot-time configuration for the feed engine. Supports TOML or JSON.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Base URL of the dashboard API, no trailing slash.
    pub api_base_url: String,
    /// IANA timezone the product's calendar days are defined in.
    pub reference_timezone: String,
    pub refresh_interval_secs: u64,
    pub fetch_limit: u32,
    /// League keys the product supports; empty accepts everything.
    pub leagues: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.gameday.example/v1".to_string(),
            reference_timezone: "America/New_York".to_string(),
            refresh_interval_secs: 30,
            fetch_limit: 200,
            leagues: vec!["NBA".into(), "NFL".into(), "MLB".into(), "NHL".into()],
        }
    }
}

impl FeedConfig {
    pub fn reference_tz(&self) -> Result<Tz> {
        self.reference_timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid reference_timezone {:?}: {e}", self.reference_timezone))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

/// Load config from an explicit path. Format is picked by extension with a
/// content sniff as backup.
pub fn load_config_from(path: &Path) -> Result<FeedConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feed config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load config using env var + fallbacks:
/// 1) $FEED_CONFIG_PATH
/// 2) config/feed.toml
/// 3) config/feed.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<FeedConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("FEED_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/feed.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/feed.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(FeedConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<FeedConfig> {
    let try_toml = hint_ext == "toml" || s.contains('=');
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported feed config format"))
}

fn parse_toml(s: &str) -> Result<FeedConfig> {
    let mut cfg: FeedConfig = toml::from_str(s)?;
    cfg.leagues = clean_leagues(cfg.leagues);
    Ok(cfg)
}

fn parse_json(s: &str) -> Result<FeedConfig> {
    let mut cfg: FeedConfig = serde_json::from_str(s)?;
    cfg.leagues = clean_leagues(cfg.leagues);
    Ok(cfg)
}

fn clean_leagues(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() {
            set.insert(t.to_string());
        }
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_parse_into_same_shape() {
        let toml_src = r#"
            api_base_url = "https://api.test/v1"
            reference_timezone = "America/New_York"
            refresh_interval_secs = 15
            fetch_limit = 50
            leagues = [" NBA ", "", "NFL", "NFL"]
        "#;
        let json_src = r#"{
            "api_base_url": "https://api.test/v1",
            "reference_timezone": "America/New_York",
            "refresh_interval_secs": 15,
            "fetch_limit": 50,
            "leagues": ["NBA", "NFL"]
        }"#;
        let t = parse_toml(toml_src).unwrap();
        assert_eq!(t.api_base_url, "https://api.test/v1");
        assert_eq!(t.refresh_interval_secs, 15);
        assert_eq!(t.leagues, vec!["NBA".to_string(), "NFL".to_string()]);

        let j = parse_json(json_src).unwrap();
        assert_eq!(j.leagues, t.leagues);
        assert_eq!(j.fetch_limit, 50);
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg = parse_toml(r#"refresh_interval_secs = 5"#).unwrap();
        assert_eq!(cfg.refresh_interval_secs, 5);
        assert_eq!(cfg.reference_timezone, "America/New_York");
        assert!(cfg.fetch_limit > 0);
    }

    #[test]
    fn reference_tz_parses_and_rejects() {
        let cfg = FeedConfig::default();
        assert!(cfg.reference_tz().is_ok());
        let bad = FeedConfig {
            reference_timezone: "Mars/Olympus_Mons".into(),
            ..FeedConfig::default()
        };
        assert!(bad.reference_tz().is_err());
    }

    #[test]
    fn interval_never_goes_below_one_second() {
        let cfg = FeedConfig {
            refresh_interval_secs: 0,
            ..FeedConfig::default()
        };
        assert_eq!(cfg.interval(), Duration::from_secs(1));
    }
}
