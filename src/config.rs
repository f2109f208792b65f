use std::env;
use std::time::Duration;

use crate::odds_fetch::OddsFetchConfig;

const DEFAULT_ROSTER_API_BASE: &str =
    "https://glory-api.pinkyellow.computer/api/collections/fighters/entries";
const DEFAULT_WIKIDATA_API: &str = "https://www.wikidata.org/w/api.php";
const DEFAULT_WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";

#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Metadata lookups (knowledge base, odds, page images).
    pub timeout: Duration,
    /// Roster slug lookups and article bodies.
    pub long_timeout: Duration,
    pub roster_sync_timeout: Duration,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
}

impl HttpConfig {
    pub fn from_env() -> Self {
        Self {
            timeout: Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS", 10).clamp(1, 120)),
            long_timeout: Duration::from_secs(env_u64("HTTP_LONG_TIMEOUT_SECS", 20).clamp(1, 300)),
            roster_sync_timeout: Duration::from_secs(
                env_u64("ROSTER_SYNC_TIMEOUT_SECS", 30).clamp(1, 600),
            ),
            cache_enabled: env_bool("HTTP_CACHE_ENABLED", true),
            cache_ttl: Duration::from_secs(env_u64("HTTP_CACHE_TTL_SECS", 6 * 3600)),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            long_timeout: Duration::from_secs(20),
            roster_sync_timeout: Duration::from_secs(30),
            cache_enabled: false,
            cache_ttl: Duration::from_secs(6 * 3600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FighterLookupConfig {
    pub enabled: bool,
    pub roster_api_base: String,
    pub wikidata_api: String,
    pub wikipedia_api: String,
}

impl FighterLookupConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_bool("FIGHTER_LOOKUP_ENABLED", true),
            roster_api_base: env_string("ROSTER_API_BASE")
                .unwrap_or_else(|| DEFAULT_ROSTER_API_BASE.to_string()),
            wikidata_api: env_string("WIKIDATA_API")
                .unwrap_or_else(|| DEFAULT_WIKIDATA_API.to_string()),
            wikipedia_api: env_string("WIKIPEDIA_API")
                .unwrap_or_else(|| DEFAULT_WIKIPEDIA_API.to_string()),
        }
    }
}

impl Default for FighterLookupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            roster_api_base: DEFAULT_ROSTER_API_BASE.to_string(),
            wikidata_api: DEFAULT_WIKIDATA_API.to_string(),
            wikipedia_api: DEFAULT_WIKIPEDIA_API.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub http: HttpConfig,
    pub fighters: FighterLookupConfig,
    pub odds: OddsFetchConfig,
    pub fetch_parallelism: usize,
}

impl PoolConfig {
    pub fn from_env() -> Self {
        Self {
            http: HttpConfig::from_env(),
            fighters: FighterLookupConfig::from_env(),
            odds: OddsFetchConfig::from_env(),
            fetch_parallelism: fetch_parallelism(),
        }
    }
}

fn fetch_parallelism() -> usize {
    env::var("FETCH_PARALLELISM")
        .ok()
        .and_then(|val| val.trim().parse::<usize>().ok())
        .unwrap_or(4)
        .clamp(1, 16)
}

pub(crate) fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| parse_bool_flag(&v))
        .unwrap_or(default)
}

pub(crate) fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_bool_flag(raw: &str) -> bool {
    let t = raw.trim().to_ascii_lowercase();
    !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
}
