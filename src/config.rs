//! Store configuration.
//!
//! Describes which backend to open and whether to put a TTL cache in front
//! of it, loaded from TOML:
//!
//! ```toml
//! [backend]
//! kind = "filesystem"
//! root = "/var/lib/app/blobs"
//! file_mode = 0o640
//!
//! [cache]
//! ttl_secs = 30
//! ```
//!
//! The object-store adapter is not configurable here since its service
//! client is supplied by the embedding application.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backends::kv::{KvStorage, Pool, RespConnection, RespConnector};
use crate::backends::{FilesystemStorage, MemoryStorage};
use crate::cache::TtlCache;
use crate::constants;
use crate::error::StorageError;
use crate::storage::Storage;

/// Cache TTLs above this many seconds produce a warning.
const LONG_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Root configuration: one backend, optionally cached.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
}

/// Backend selection, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Files under a root directory.
    Filesystem {
        root: PathBuf,
        #[serde(default = "default_file_mode")]
        file_mode: u32,
        #[serde(default = "default_dir_mode")]
        dir_mode: u32,
    },
    /// Process-local memory.
    Memory,
    /// Redis-compatible server.
    Redis {
        address: String,
        /// Namespace segment prefixed to every key.
        #[serde(default)]
        root: String,
        /// Idle connections to pool; 0 uses one dedicated connection.
        #[serde(default)]
        pool_size: usize,
    },
}

fn default_file_mode() -> u32 {
    constants::DEFAULT_FILE_MODE
}

fn default_dir_mode() -> u32 {
    constants::DEFAULT_DIR_MODE
}

/// TTL cache layer settings.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl StoreConfig {
    /// Load configuration from the specified path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Required fields are missing or have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or does not match the schema.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid store configuration")
    }

    /// Validate configuration.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails with one or more errors:
    /// - Empty filesystem root
    /// - Empty redis address
    /// - Zero or out-of-range cache TTL
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        match &self.backend {
            BackendConfig::Filesystem { root, .. } => {
                if root.as_os_str().is_empty() {
                    errors.push("backend.root cannot be empty for a filesystem backend".to_string());
                } else if !root.exists() {
                    warnings.push(format!(
                        "Storage root does not exist yet: {}\n  \
                         It will be created on the first write",
                        root.display()
                    ));
                } else if !root.is_dir() {
                    errors.push(format!(
                        "Storage root is not a directory: {}",
                        root.display()
                    ));
                }
            },
            BackendConfig::Memory => {
                if self.cache.is_some() {
                    warnings.push(
                        "Caching a memory backend only duplicates data already in memory"
                            .to_string(),
                    );
                }
            },
            BackendConfig::Redis { address, .. } => {
                if address.is_empty() {
                    errors.push("backend.address cannot be empty for a redis backend".to_string());
                }
            },
        }

        if let Some(cache) = &self.cache {
            if cache.ttl_secs == 0 {
                errors.push("cache.ttl_secs cannot be 0; omit [cache] to disable caching".to_string());
            } else if cache.ttl_secs > constants::MAX_CACHE_TTL_SECS {
                errors.push(format!(
                    "cache.ttl_secs {} exceeds the maximum of {} seconds",
                    cache.ttl_secs,
                    constants::MAX_CACHE_TTL_SECS
                ));
            } else if cache.ttl_secs > LONG_CACHE_TTL_SECS {
                warnings.push(format!(
                    "cache.ttl_secs {} is longer than a day\n  \
                     The cache is unbounded except by TTL; long TTLs keep every key read in memory",
                    cache.ttl_secs
                ));
            }
        }

        if !errors.is_empty() {
            return Err(StorageError::Config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            ))
            .into());
        }

        Ok(ValidationResult { warnings })
    }

    /// Open the configured store, wrapped in a `TtlCache` when `[cache]` is set.
    ///
    /// A redis backend with `pool_size = 0` connects immediately; a pooled one
    /// connects on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if a dedicated redis connection cannot be established.
    pub async fn open(&self) -> Result<Arc<dyn Storage>> {
        let store: Arc<dyn Storage> = match &self.backend {
            BackendConfig::Filesystem {
                root,
                file_mode,
                dir_mode,
            } => Arc::new(FilesystemStorage::with_modes(root, *file_mode, *dir_mode)),
            BackendConfig::Memory => Arc::new(MemoryStorage::new()),
            BackendConfig::Redis {
                address,
                root,
                pool_size: 0,
            } => {
                let conn = RespConnection::connect(address.as_str())
                    .await
                    .with_context(|| format!("Failed to connect to redis at {address}"))?;
                Arc::new(KvStorage::new(conn, root.clone()))
            },
            BackendConfig::Redis {
                address,
                root,
                pool_size,
            } => {
                let pool = Pool::with_max_idle(RespConnector::new(address.clone()), *pool_size);
                Arc::new(KvStorage::pooled(pool, root.clone()))
            },
        };

        tracing::debug!(backend = ?self.backend, cache = ?self.cache, "Opened store");

        Ok(match self.cache {
            Some(cache) => Arc::new(TtlCache::from_secs(store, cache.ttl_secs)),
            None => store,
        })
    }
}
