use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::header::{
    ACCEPT, ETAG, HeaderMap, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
    USER_AGENT,
};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::LookupError;
use crate::http_client::{POOL_USER_AGENT, check_status, get_text, http_client};

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "fightpool";
const CACHE_FILE: &str = "lookup_cache.json";

static CACHE: Mutex<Option<LookupCacheFile>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct LookupCacheFile {
    version: u32,
    entries: HashMap<String, CachedBody>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedBody {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

impl CachedBody {
    fn is_fresh(&self, ttl: Duration, now: u64) -> bool {
        now.saturating_sub(self.fetched_at) < ttl.as_secs()
    }
}

/// GET through the on-disk lookup cache.
///
/// Entries younger than `http.cache_ttl` are served without a request; older
/// ones are revalidated with ETag / Last-Modified. With the cache disabled
/// this is a plain [`get_text`].
pub fn fetch_text_cached(
    url: &str,
    query: &[(&str, &str)],
    timeout: Duration,
    http: &HttpConfig,
) -> std::result::Result<String, LookupError> {
    if !http.cache_enabled {
        return get_text(url, query, timeout);
    }

    let full_url = Url::parse_with_params(url, query)
        .map_err(|e| LookupError::parse(format!("bad url {url}: {e}")))?;
    let key = full_url.to_string();
    let now = now_secs();

    let cached = {
        let mut guard = CACHE.lock().unwrap_or_else(PoisonError::into_inner);
        let cache = guard.get_or_insert_with(load_cache_file);
        cache.entries.get(&key).cloned()
    };
    if let Some(entry) = cached.as_ref()
        && entry.is_fresh(http.cache_ttl, now)
    {
        debug!(url = %key, "lookup cache hit");
        return Ok(entry.body.clone());
    }

    let client = http_client().map_err(|e| LookupError::network(format!("{e:#}")))?;
    let mut req = client
        .get(full_url)
        .timeout(timeout)
        .header(USER_AGENT, POOL_USER_AGENT)
        .header(ACCEPT, "application/json");
    if let Some(entry) = cached.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = req.send()?;
    let status = resp.status();
    let headers = resp.headers().clone();
    if status == StatusCode::NOT_MODIFIED {
        let Some(mut entry) = cached else {
            return Err(LookupError::network("received 304 without cached body"));
        };
        debug!(url = %key, "lookup cache revalidated");
        entry.fetched_at = now;
        let body = entry.body.clone();
        store_entry(&key, entry);
        return Ok(body);
    }

    let body = resp.text()?;
    check_status(status, &body)?;

    store_entry(
        &key,
        CachedBody {
            body: body.clone(),
            etag: header_string(&headers, ETAG),
            last_modified: header_string(&headers, LAST_MODIFIED),
            fetched_at: now,
        },
    );
    Ok(body)
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn store_entry(key: &str, entry: CachedBody) {
    let mut guard = CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.version = CACHE_VERSION;
    cache.entries.insert(key.to_string(), entry);
    if let Err(err) = save_cache_file(cache) {
        debug!(error = %err, "lookup cache not saved");
    }
}

fn load_cache_file() -> LookupCacheFile {
    let Some(path) = cache_path() else {
        return LookupCacheFile::default();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return LookupCacheFile::default();
    };
    let cache = serde_json::from_str::<LookupCacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return LookupCacheFile::default();
    }
    cache
}

fn save_cache_file(cache: &LookupCacheFile) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).context("create lookup cache dir")?;
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize lookup cache")?;
    fs::write(&tmp, json).context("write lookup cache")?;
    fs::rename(&tmp, &path).context("swap lookup cache")?;
    Ok(())
}

fn cache_path() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("FIGHTPOOL_CACHE_DIR")
        && !dir.trim().is_empty()
    {
        return Some(PathBuf::from(dir).join(CACHE_FILE));
    }
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(CACHE_FILE));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR).join(CACHE_FILE))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
