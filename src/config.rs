/// Configuration management for OID directory clients
use crate::error::{DirError, DirResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Top-level client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub profile: DirectoryProfile,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// DN layout model used by the directory for registrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    /// One `dotNotation=<oid>` RDN beneath the registration base
    TwoDimensional,
    /// One `n=<arc>` RDN per arc, most specific first
    ThreeDimensional,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::TwoDimensional => write!(f, "two-dimensional"),
            Dimension::ThreeDimensional => write!(f, "three-dimensional"),
        }
    }
}

impl FromStr for Dimension {
    type Err = DirError;

    fn from_str(s: &str) -> DirResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "two" | "2" | "2d" | "two-dimensional" => Ok(Dimension::TwoDimensional),
            "three" | "3" | "3d" | "three-dimensional" => Ok(Dimension::ThreeDimensional),
            other => Err(DirError::Config(format!("Unknown directory model: {}", other))),
        }
    }
}

/// Where registrations and registrants live in the directory tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryProfile {
    /// Registration base DNs; the first one is used when building DNs
    pub registration_bases: Vec<String>,
    pub registrant_base: String,
    pub dimension: Dimension,
}

impl DirectoryProfile {
    pub fn new(registration_base: impl Into<String>, dimension: Dimension) -> Self {
        Self {
            registration_bases: vec![registration_base.into()],
            registrant_base: default_registrant_base(),
            dimension,
        }
    }

    /// Add another registration base accepted when decoding DNs
    pub fn with_registration_base(mut self, base: impl Into<String>) -> Self {
        self.registration_bases.push(base.into());
        self
    }

    pub fn with_registrant_base(mut self, base: impl Into<String>) -> Self {
        self.registrant_base = base.into();
        self
    }

    /// Base DN new registration DNs are written beneath
    pub fn primary_registration_base(&self) -> DirResult<&str> {
        self.registration_bases
            .first()
            .map(String::as_str)
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| {
                DirError::DirectoryProfile("No registration base configured".to_string())
            })
    }
}

impl Default for DirectoryProfile {
    fn default() -> Self {
        Self {
            registration_bases: vec![default_registration_base()],
            registrant_base: default_registrant_base(),
            dimension: Dimension::ThreeDimensional,
        }
    }
}

/// Object cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable caching (default: true)
    pub enabled: bool,

    /// Maximum registration entries, 0 = unlimited
    pub max_registrations: usize,

    /// Maximum registrant entries, 0 = unlimited
    pub max_registrants: usize,

    /// TTL in minutes used when callers don't supply one (default: 30)
    pub default_ttl_minutes: i64,

    /// Directory holding cache snapshot files
    pub snapshot_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_registrations: 0,
            max_registrants: 0,
            default_ttl_minutes: 30,
            snapshot_dir: PathBuf::from("./data/cache"),
        }
    }
}

impl CacheConfig {
    /// Load from environment variables
    pub fn from_env() -> DirResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            enabled: env::var("OIDDIR_CACHE_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            max_registrations: parse_var("OIDDIR_CACHE_MAX_REGISTRATIONS", 0)?,
            max_registrants: parse_var("OIDDIR_CACHE_MAX_REGISTRANTS", 0)?,
            default_ttl_minutes: parse_var("OIDDIR_CACHE_DEFAULT_TTL", defaults.default_ttl_minutes)?,
            snapshot_dir: env::var("OIDDIR_CACHE_SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_dir),
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl DirectoryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> DirResult<Self> {
        dotenv::dotenv().ok();

        let registration_bases = env::var("OIDDIR_REGISTRATION_BASE")
            .unwrap_or_else(|_| default_registration_base())
            .split(';')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();
        let registrant_base =
            env::var("OIDDIR_REGISTRANT_BASE").unwrap_or_else(|_| default_registrant_base());
        let dimension = env::var("OIDDIR_MODEL")
            .unwrap_or_else(|_| "three".to_string())
            .parse()?;

        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let json = env::var("OIDDIR_LOG_JSON")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        Ok(DirectoryConfig {
            profile: DirectoryProfile {
                registration_bases,
                registrant_base,
                dimension,
            },
            cache: CacheConfig::from_env()?,
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> DirResult<()> {
        if self.profile.registration_bases.is_empty() {
            return Err(DirError::Config(
                "At least one registration base is required".to_string(),
            ));
        }

        if self
            .profile
            .registration_bases
            .iter()
            .any(|b| b.trim().is_empty())
        {
            return Err(DirError::Config("Registration base cannot be empty".to_string()));
        }

        if self.profile.registrant_base.trim().is_empty() {
            return Err(DirError::Config("Registrant base cannot be empty".to_string()));
        }

        if self.cache.enabled && self.cache.default_ttl_minutes <= 0 {
            return Err(DirError::Config(
                "Default cache TTL must be positive when caching is enabled".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            profile: DirectoryProfile::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_registration_base() -> String {
    "ou=Registrations,o=rA".to_string()
}

fn default_registrant_base() -> String {
    "ou=Registrants,o=rA".to_string()
}

fn parse_var<T: FromStr>(name: &str, default: T) -> DirResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| DirError::Config(format!("Invalid value for {}: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
