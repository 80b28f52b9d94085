//! Installer configuration.
//!
//! The host installer owns a key/value store (its "global storage"). This
//! crate only reads it, through [`ConfigProvider`], once at pipeline start.
//!
//! # Example
//!
//! ```rust
//! use yuno_stage3::config::{GlobalStorage, InitSystem, InstallConfig};
//!
//! let mut gs = GlobalStorage::new();
//! gs.insert("initSystem", "systemd");
//!
//! let config = InstallConfig::from_provider(&gs);
//! assert_eq!(config.init_system, InitSystem::Systemd);
//! assert_eq!(config.desktop_type, "desktop");
//! ```

use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const INIT_SYSTEM_KEY: &str = "initSystem";
pub const DESKTOP_TYPE_KEY: &str = "desktopType";
pub const ROOT_MOUNT_POINT_KEY: &str = "rootMountPoint";
pub const MIRROR_KEY: &str = "mirror";
pub const CACHE_DIR_KEY: &str = "cacheDir";

/// Primary Gentoo mirror.
pub const DEFAULT_MIRROR: &str = "https://distfiles.gentoo.org";

/// Well-known Gentoo distfiles mirrors, for `--mirror`.
pub const KNOWN_MIRRORS: &[&str] = &[
    DEFAULT_MIRROR,
    "https://gentoo.osuosl.org",
    "https://mirrors.mit.edu/gentoo-distfiles",
    "https://mirror.leaseweb.com/gentoo",
    "https://ftp.fau.de/gentoo",
    "https://ftp.jaist.ac.jp/pub/Linux/Gentoo",
    "https://mirror.bytemark.co.uk/gentoo",
    "https://mirrors.tuna.tsinghua.edu.cn/gentoo",
];

/// Path of the amd64 autobuilds on a mirror.
pub const STAGE3_PATH: &str = "/releases/amd64/autobuilds";

/// Cache for downloaded tarballs. Survives across runs.
pub const DEFAULT_CACHE_DIR: &str = "/var/cache/yuno";

pub const DEFAULT_DESKTOP_TYPE: &str = "desktop";

/// Timeout for index and checksum manifest requests.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only access to the host installer's configuration store.
pub trait ConfigProvider {
    fn value(&self, key: &str) -> Option<String>;
}

/// In-memory key/value store, optionally loaded from a flat TOML file.
#[derive(Debug, Clone, Default)]
pub struct GlobalStorage {
    values: BTreeMap<String, String>,
}

impl GlobalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Parse a flat TOML table. Strings are taken as-is, other scalars are
    /// rendered; nested tables and arrays are rejected.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = content.parse().context("invalid TOML")?;

        let mut storage = Self::new();
        for (key, value) in table {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(d) => d.to_string(),
                toml::Value::Array(_) | toml::Value::Table(_) => {
                    bail!("key '{}' must be a scalar value", key)
                }
            };
            storage.insert(key, value);
        }
        Ok(storage)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl ConfigProvider for GlobalStorage {
    fn value(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Init system chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitSystem {
    Systemd,
    #[default]
    OpenRc,
}

impl InitSystem {
    /// Only the exact string `systemd` selects systemd. Absent, empty or
    /// unrecognised values are OpenRC.
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some("systemd") => Self::Systemd,
            _ => Self::OpenRc,
        }
    }
}

impl fmt::Display for InitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Systemd => f.write_str("systemd"),
            Self::OpenRc => f.write_str("openrc"),
        }
    }
}

/// Snapshot of the user's choices, read once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    pub init_system: InitSystem,
    /// Read but does not currently influence the variant.
    pub desktop_type: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            init_system: InitSystem::default(),
            desktop_type: DEFAULT_DESKTOP_TYPE.to_string(),
        }
    }
}

impl InstallConfig {
    pub fn from_provider(provider: &dyn ConfigProvider) -> Self {
        let init_system = InitSystem::from_value(provider.value(INIT_SYSTEM_KEY).as_deref());
        let desktop_type = provider
            .value(DESKTOP_TYPE_KEY)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DESKTOP_TYPE.to_string());

        Self {
            init_system,
            desktop_type,
        }
    }
}

/// Where to fetch from and where to cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSettings {
    /// Mirror base URL, no trailing slash
    pub mirror: String,
    pub cache_dir: PathBuf,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            mirror: DEFAULT_MIRROR.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

impl StageSettings {
    pub fn from_provider(provider: &dyn ConfigProvider) -> Self {
        let defaults = Self::default();

        let mirror = provider
            .value(MIRROR_KEY)
            .map(|m| m.trim().trim_end_matches('/').to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or(defaults.mirror);

        let cache_dir = provider
            .value(CACHE_DIR_KEY)
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        Self { mirror, cache_dir }
    }

    /// Base URL of the autobuilds tree on the configured mirror.
    pub fn autobuilds_url(&self) -> String {
        format!("{}{}", self.mirror, STAGE3_PATH)
    }
}

/// Target root, if the host supplied a non-empty one.
pub fn root_mount_point(provider: &dyn ConfigProvider) -> Option<PathBuf> {
    provider
        .value(ROOT_MOUNT_POINT_KEY)
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}
