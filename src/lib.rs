pub mod config;
pub mod country;
pub mod enrich;
pub mod error;
pub mod fighter;
pub mod fighter_resolver;
pub mod http_cache;
pub mod http_client;
pub mod import;
pub mod logging;
pub mod model;
pub mod names;
pub mod odds_fetch;
pub mod odds_resolver;
pub mod roster_fetch;
pub mod scoring;
pub mod wikidata_fetch;
pub mod wikipedia_fetch;
