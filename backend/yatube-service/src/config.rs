/// Configuration management for yatube-service
///
/// Everything is read from environment variables (a `.env` file is loaded
/// by `main` first). Unset variables fall back to development defaults;
/// malformed values and unsafe production settings are rejected.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::security::token::MIN_SECRET_LEN;

const DEV_SESSION_SECRET: &str = "yatube-development-session-secret-change-me";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub feed: FeedConfig,
    pub session: SessionConfig,
    pub media: MediaConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

/// Where posts, users and follows are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    /// Process-local tables; data is lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'",
                other
            )),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub max_connections: u32,
}

/// Page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis URL; the in-process cache is used when unset
    pub redis_url: Option<String>,
    pub index_ttl_secs: u64,
}

/// Listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub posts_per_page: u64,
}

/// Session token configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(skip_serializing)]
    pub secret: String,
    pub ttl_hours: i64,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("ttl_hours", &self.ttl_hours)
            .finish()
    }
}

/// Uploaded image storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub root: PathBuf,
    pub max_upload_bytes: usize,
}

/// Parse an optional variable, treating a malformed value as an error
fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} has an invalid value: '{}'", name, raw)),
        _ => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("YATUBE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("YATUBE_PORT", 8000)?,
        };

        let database = DatabaseConfig {
            backend: parse_var("STORAGE_BACKEND", StorageBackend::Postgres)?,
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/yatube".to_string()),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
        };
        if app.is_production() && database.backend == StorageBackend::Memory {
            return Err("STORAGE_BACKEND=memory is not allowed in production".to_string());
        }

        let cache = CacheConfig {
            redis_url: std::env::var("REDIS_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            index_ttl_secs: parse_var("INDEX_CACHE_TTL_SECS", 20)?,
        };

        let posts_per_page: u64 = parse_var("POSTS_PER_PAGE", 10)?;
        if posts_per_page == 0 {
            return Err("POSTS_PER_PAGE must be at least 1".to_string());
        }

        let secret = match std::env::var("SESSION_SECRET") {
            Ok(value) => value,
            Err(_) if app.is_production() => {
                return Err("SESSION_SECRET must be set in production".to_string())
            }
            Err(_) => DEV_SESSION_SECRET.to_string(),
        };
        if secret.len() < MIN_SECRET_LEN {
            return Err(format!(
                "SESSION_SECRET must be at least {} bytes",
                MIN_SECRET_LEN
            ));
        }

        Ok(Config {
            app,
            database,
            cache,
            feed: FeedConfig { posts_per_page },
            session: SessionConfig {
                secret,
                ttl_hours: parse_var("SESSION_TTL_HOURS", 24 * 14)?,
            },
            media: MediaConfig {
                root: PathBuf::from(
                    std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string()),
                ),
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            },
        })
    }

    /// Development configuration with in-memory storage, used by tests
    pub fn for_tests(media_root: PathBuf) -> Self {
        Config {
            app: AppConfig {
                env: "test".to_string(),
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                url: String::new(),
                max_connections: 1,
            },
            cache: CacheConfig {
                redis_url: None,
                index_ttl_secs: 20,
            },
            feed: FeedConfig { posts_per_page: 10 },
            session: SessionConfig {
                secret: DEV_SESSION_SECRET.to_string(),
                ttl_hours: 1,
            },
            media: MediaConfig {
                root: media_root,
                max_upload_bytes: 5 * 1024 * 1024,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "APP_ENV",
        "YATUBE_HOST",
        "YATUBE_PORT",
        "STORAGE_BACKEND",
        "DATABASE_URL",
        "DATABASE_MAX_CONNECTIONS",
        "REDIS_URL",
        "INDEX_CACHE_TTL_SECS",
        "POSTS_PER_PAGE",
        "SESSION_SECRET",
        "SESSION_TTL_HOURS",
        "MEDIA_ROOT",
        "MAX_UPLOAD_BYTES",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 8000);
        assert_eq!(config.database.backend, StorageBackend::Postgres);
        assert_eq!(config.cache.redis_url, None);
        assert_eq!(config.cache.index_ttl_secs, 20);
        assert_eq!(config.feed.posts_per_page, 10);
        assert_eq!(config.media.max_upload_bytes, 5 * 1024 * 1024);
    }

    #[test]
    #[serial]
    fn test_invalid_number_is_rejected() {
        clear_env();
        std::env::set_var("YATUBE_PORT", "eighty");
        let err = Config::from_env().unwrap_err();
        assert!(err.contains("YATUBE_PORT"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_production_requires_secret_and_database() {
        clear_env();
        std::env::set_var("APP_ENV", "production");
        assert!(Config::from_env().unwrap_err().contains("SESSION_SECRET"));

        std::env::set_var("SESSION_SECRET", "x".repeat(40));
        std::env::set_var("STORAGE_BACKEND", "memory");
        assert!(Config::from_env().unwrap_err().contains("memory"));

        std::env::set_var("STORAGE_BACKEND", "postgres");
        assert!(Config::from_env().is_ok());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_short_secret_is_rejected() {
        clear_env();
        std::env::set_var("SESSION_SECRET", "short");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config::for_tests(PathBuf::from("/tmp/media"));
        let rendered = format!("{:?}", config.session);
        assert!(!rendered.contains(DEV_SESSION_SECRET));
    }
}
