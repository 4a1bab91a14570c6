//! Blocking client for The Blue Alliance APIv3.
//!
//! TBA serves strong ETags, so every GET is conditional against an
//! on-disk cache and a `304 Not Modified` is answered from cache without
//! re-downloading the body.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use log::debug;
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_NONE_MATCH};
use serde::{Deserialize, Serialize};

use crate::matches::Match;
use crate::provider::MatchProvider;

const TBA_BASE_URL: &str = "https://www.thebluealliance.com/api/v3";
const AUTH_HEADER: &str = "X-TBA-Auth-Key";
const REQUEST_TIMEOUT_SECS: u64 = 10;

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "tba_insights";
const CACHE_FILE: &str = "tba_cache.json";

static CLIENT: OnceCell<Client> = OnceCell::new();

fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct ResponseCache {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    fetched_at: u64,
}

pub struct TbaClient {
    auth_key: String,
    cache_path: Option<PathBuf>,
    cache: Mutex<ResponseCache>,
}

impl TbaClient {
    pub fn new(auth_key: impl Into<String>) -> Self {
        Self::with_cache_path(auth_key, default_cache_path())
    }

    /// Reads the auth key from `TBA_AUTH_KEY`.
    pub fn from_env() -> Result<Self> {
        let auth_key = env::var("TBA_AUTH_KEY").context("TBA_AUTH_KEY is not set")?;
        Ok(Self::new(auth_key))
    }

    /// `None` disables the on-disk cache (conditional GETs still run
    /// within the client's lifetime).
    pub fn with_cache_path(auth_key: impl Into<String>, cache_path: Option<PathBuf>) -> Self {
        let cache = cache_path.as_deref().map(load_cache).unwrap_or_default();
        Self {
            auth_key: auth_key.into(),
            cache_path,
            cache: Mutex::new(cache),
        }
    }

    fn get(&self, path: &str) -> Result<String> {
        let url = format!("{TBA_BASE_URL}/{path}");
        let cached = {
            let cache = self.cache.lock().expect("tba cache lock poisoned");
            cache.entries.get(&url).cloned()
        };

        let mut req = http_client()?.get(&url).header(AUTH_HEADER, &self.auth_key);
        if let Some(entry) = cached.as_ref()
            && let Some(etag) = entry.etag.as_ref()
        {
            req = req.header(IF_NONE_MATCH, etag);
        }

        let resp = req.send().with_context(|| format!("request {url} failed"))?;
        let status = resp.status();

        if status == StatusCode::NOT_MODIFIED {
            if let Some(entry) = cached {
                debug!("tba cache hit for {path}");
                return Ok(entry.body);
            }
            anyhow::bail!("received 304 for {url} without a cached body");
        }

        let etag = resp
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().with_context(|| format!("reading body of {url}"))?;
        if !status.is_success() {
            anyhow::bail!("tba returned http {status} for {url}: {body}");
        }

        self.store(url, body.clone(), etag);
        Ok(body)
    }

    fn store(&self, url: String, body: String, etag: Option<String>) {
        let mut cache = self.cache.lock().expect("tba cache lock poisoned");
        cache.version = CACHE_VERSION;
        cache.entries.insert(
            url,
            CacheEntry {
                body,
                etag,
                fetched_at: unix_now(),
            },
        );
        if let Some(path) = self.cache_path.as_deref() {
            if let Err(err) = save_cache(path, &cache) {
                debug!("failed to persist tba cache: {err:#}");
            }
        }
    }
}

impl MatchProvider for TbaClient {
    fn event_matches(&self, event_key: &str) -> Result<Vec<Match>> {
        parse_matches_json(&self.get(&format!("event/{event_key}/matches"))?)
    }

    fn team_matches(&self, team_key: &str, year: u16) -> Result<Vec<Match>> {
        parse_matches_json(&self.get(&format!("team/{team_key}/matches/{year}"))?)
    }

    fn team_event_keys(&self, team_key: &str, year: u16) -> Result<Vec<String>> {
        parse_keys_json(&self.get(&format!("team/{team_key}/events/{year}/keys"))?)
    }

    fn event_team_keys(&self, event_key: &str) -> Result<Vec<String>> {
        parse_keys_json(&self.get(&format!("event/{event_key}/teams/keys"))?)
    }
}

/// TBA answers `null` (not an empty array) for keys it does not know.
pub fn parse_matches_json(raw: &str) -> Result<Vec<Match>> {
    if raw.trim() == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).context("parse match list json")
}

pub fn parse_keys_json(raw: &str) -> Result<Vec<String>> {
    if raw.trim() == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).context("parse key list json")
}

fn load_cache(path: &std::path::Path) -> ResponseCache {
    let Ok(raw) = fs::read_to_string(path) else {
        return ResponseCache::default();
    };
    let cache = serde_json::from_str::<ResponseCache>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return ResponseCache::default();
    }
    cache
}

fn save_cache(path: &std::path::Path, cache: &ResponseCache) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok();
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize tba cache")?;
    fs::write(&tmp, json).context("write tba cache")?;
    fs::rename(&tmp, path).context("swap tba cache")?;
    Ok(())
}

fn default_cache_path() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(CACHE_FILE));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR).join(CACHE_FILE))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_bodies_parse_as_empty() {
        assert!(parse_matches_json("null").unwrap().is_empty());
        assert!(parse_keys_json("null").unwrap().is_empty());
    }

    #[test]
    fn stale_cache_version_is_discarded() {
        let raw = r#"{"version": 0, "entries": {"u": {"body": "x", "etag": null, "fetched_at": 1}}}"#;
        let dir = env::temp_dir().join("tba_insights_test_cache");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("stale.json");
        fs::write(&path, raw).unwrap();
        let cache = load_cache(&path);
        assert!(cache.entries.is_empty());
        fs::remove_file(&path).ok();
    }
}
