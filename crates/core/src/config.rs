use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub postgres: PostgresConfig,
    pub backend: BackendConfig,
}

/// Well-known env keys that identify a profile when prefixed.
const PROFILE_MARKER_KEYS: &[&str] = &[
    "REDIS_HOST",
    "POSTGRES_URL",
    "AI_MODEL_NAME",
    "INTERNAL_API_SECRET",
];

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `AURIS_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("AURIS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            redis: RedisConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            backend: BackendConfig::from_env_profiled(p),
        }
    }

    /// Discover available profiles by scanning env vars for `{PREFIX}_{MARKER_KEY}` patterns.
    /// Always includes "default" (the unprefixed config).
    pub fn available_profiles() -> Vec<String> {
        let mut profiles = std::collections::BTreeSet::new();
        profiles.insert("default".to_string());

        for (key, _) in env::vars() {
            for marker in PROFILE_MARKER_KEYS {
                if let Some(prefix) = key.strip_suffix(&format!("_{}", marker)) {
                    if !prefix.is_empty()
                        && prefix.chars().all(|c| c.is_ascii_uppercase() || c == '_')
                    {
                        profiles.insert(prefix.to_string());
                    }
                }
            }
        }

        profiles.into_iter().collect()
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:   port={}, max_concurrent_jobs={}", self.server.port, self.server.max_concurrent_jobs);
        tracing::info!("  redis:    {}:{}", self.redis.host, self.redis.port);
        tracing::info!("  postgres: configured={}", self.postgres.is_configured());
        tracing::info!("  backend:  model={}, parallel={}", self.backend.ai_model_name, self.backend.max_parallel_compute);
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": {
                "port": self.server.port,
                "max_concurrent_jobs": self.server.max_concurrent_jobs,
            },
            "redis": { "host": self.redis.host, "port": self.redis.port },
            "postgres": { "configured": self.postgres.is_configured() },
            "backend": {
                "ai_model_name": self.backend.ai_model_name,
                "max_parallel_compute": self.backend.max_parallel_compute,
                "ollama_host": self.backend.ollama_host,
                "llm_model": self.backend.llm_model,
            },
        })
    }
}

// ── Server / job API ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub internal_api_secret: Option<String>,
    /// Worker pool size — number of jobs the pool runs concurrently.
    pub max_concurrent_jobs: usize,
    pub media_path: PathBuf,
    pub downloads_path: PathBuf,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 8080),
            internal_api_secret: profiled_env_opt(p, "INTERNAL_API_SECRET"),
            max_concurrent_jobs: profiled_env_usize(p, "MAX_CONCURRENT_JOBS", 4),
            media_path: PathBuf::from(profiled_env_or(p, "MEDIA_PATH", "media")),
            downloads_path: PathBuf::from(profiled_env_or(p, "DOWNLOADS_PATH", "downloads")),
        }
    }
}

// ── Redis (job store, dedup, real-time counters) ──────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
}

impl RedisConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "REDIS_HOST", "localhost"),
            port: profiled_env_u16(p, "REDIS_PORT", 6379),
            password: profiled_env_opt(p, "REDIS_PASSWORD"),
        }
    }

    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(pw) => format!("redis://:{}@{}:{}", pw, self.host, self.port),
            None => format!("redis://{}:{}", self.host, self.port),
        }
    }
}

// ── PostgreSQL (vector store, analytics) ──────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "POSTGRES_URL"),
            max_connections: profiled_env_u32(p, "POSTGRES_MAX_CONNECTIONS", 10),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    pub fn connection_string(&self) -> String {
        self.url
            .clone()
            .unwrap_or_else(|| "postgres://postgres@localhost/auris".to_string())
    }
}

// ── Compute back-end (embedder, separator, enricher, downloader) ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Parallelism gate size — concurrent compute-heavy jobs across the whole pool.
    pub max_parallel_compute: usize,
    pub ai_model_name: String,
    pub ollama_host: String,
    pub llm_model: String,
    /// `HttpEmbedder` target (embedding-modality plugins only).
    pub embedder_endpoint: String,
    pub embedder_dimensions: usize,
    /// `SubprocessSeparator` target (stem-separation-modality plugins only).
    pub separator_binary: String,
    pub separator_timeout_secs: u64,
    /// `LlmEnricher` tuning (enrichment-modality plugins only).
    pub enricher_max_concurrent: usize,
    pub enricher_timeout_secs: u64,
    /// `SubprocessDownloader` target (download-modality plugins only).
    pub downloader_binary: String,
}

impl BackendConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_parallel_compute: profiled_env_usize(p, "MAX_PARALLEL_COMPUTE", 2),
            ai_model_name: profiled_env_or(p, "AI_MODEL_NAME", "clap-htsat-fused"),
            ollama_host: profiled_env_or(p, "OLLAMA_HOST", "http://localhost:11434"),
            llm_model: profiled_env_or(p, "LLM_MODEL", "llama3.2"),
            embedder_endpoint: profiled_env_or(p, "EMBEDDER_ENDPOINT", "http://localhost:9100/embed"),
            embedder_dimensions: profiled_env_usize(p, "EMBEDDER_DIMENSIONS", 512),
            separator_binary: profiled_env_or(p, "SEPARATOR_BINARY", "demucs"),
            separator_timeout_secs: profiled_env_u32(p, "SEPARATOR_TIMEOUT_SECS", 300) as u64,
            enricher_max_concurrent: profiled_env_usize(p, "ENRICHER_MAX_CONCURRENT", 4),
            enricher_timeout_secs: profiled_env_u32(p, "ENRICHER_TIMEOUT_SECS", 60) as u64,
            downloader_binary: profiled_env_or(p, "DOWNLOADER_BINARY", "yt-dlp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_picks_up_defaults() {
        let cfg = Config::for_profile("");
        assert_eq!(cfg.profile_label(), "default");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.backend.max_parallel_compute, 2);
    }

    #[test]
    fn profiled_key_overrides_unprefixed_key() {
        std::env::set_var("PORT", "1000");
        std::env::set_var("PROD_PORT", "2000");
        let cfg = Config::for_profile("PROD");
        assert_eq!(cfg.server.port, 2000);
        std::env::remove_var("PORT");
        std::env::remove_var("PROD_PORT");
    }

    #[test]
    fn redis_connection_url_embeds_password_when_set() {
        let mut cfg = RedisConfig::from_env_profiled("");
        cfg.password = Some("secret".to_string());
        assert!(cfg.connection_url().contains("secret@"));
    }

    #[test]
    fn redacted_summary_never_includes_secret_values() {
        std::env::set_var("INTERNAL_API_SECRET", "topsecret");
        let cfg = Config::for_profile("");
        let summary = cfg.redacted_summary().to_string();
        assert!(!summary.contains("topsecret"));
        std::env::remove_var("INTERNAL_API_SECRET");
    }
}
