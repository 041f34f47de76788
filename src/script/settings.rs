//! Settings loading for the lifecycle's setup phase.
//!
//! The settings file is located in this order:
//! 1. `--conf=<path>`
//! 2. the `MAINT_CONFIG_FILE` environment variable
//! 3. `<install-root>/LocalSettings.toml`
//!
//! An unreadable file is fatal. The parsed TOML table is exposed read-only
//! through [`Config`], after command-line overrides have been applied.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info};
use serde::Serialize;

use super::env::Environment;
use super::errors::SetupError;
use super::job::DbType;
use crate::options::ParsedOptions;

/// File name of the default settings file under the install root.
pub const DEFAULT_SETTINGS_FILE: &str = "LocalSettings.toml";

/// Read-only configuration by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Config {
    table: toml::Table,
}

impl Config {
    #[must_use]
    pub fn from_table(table: toml::Table) -> Self {
        Self { table }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.table.get(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(toml::Value::as_str)
    }

    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(toml::Value::as_bool)
    }

    #[must_use]
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(toml::Value::as_integer)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    fn set(&mut self, key: &str, value: impl Into<toml::Value>) {
        self.table.insert(key.to_owned(), value.into());
    }
}

/// `--memory-limit` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryLimit {
    /// `max`: no limit.
    #[default]
    Unlimited,
    /// `default`: leave the limit alone.
    Unchanged,
    Bytes(u64),
}

impl FromStr for MemoryLimit {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Quotes survive some shells and wrappers.
        let limit = s.trim_matches(|c| matches!(c, '"' | '\'' | ' '));
        match limit {
            "max" | "-1" => return Ok(Self::Unlimited),
            "default" => return Ok(Self::Unchanged),
            _ => {}
        }
        let invalid = || SetupError::InvalidMemoryLimit(s.to_owned());
        let (digits, multiplier) = match limit.char_indices().last() {
            Some((i, 'k' | 'K')) => (&limit[..i], 1 << 10),
            Some((i, 'm' | 'M')) => (&limit[..i], 1 << 20),
            Some((i, 'g' | 'G')) => (&limit[..i], 1 << 30),
            _ => (limit, 1),
        };
        let base: u64 = digits.parse().map_err(|_| invalid())?;
        base.checked_mul(multiplier).map(Self::Bytes).ok_or_else(invalid)
    }
}

impl fmt::Display for MemoryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("max"),
            Self::Unchanged => f.write_str("default"),
            Self::Bytes(n) => write!(f, "{n}"),
        }
    }
}

/// `--wiki=<db>[-<prefix>]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WikiId {
    pub db: String,
    /// Empty when no prefix was given.
    pub prefix: String,
}

impl WikiId {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let (db, prefix) = value.split_once('-').unwrap_or((value, ""));
        Self {
            db: db.to_owned(),
            prefix: prefix.to_owned(),
        }
    }
}

/// The loaded settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub path: PathBuf,
    pub config: Config,
    pub wiki: Option<WikiId>,
    /// Server name from `--server`, used when no wiki ID was given.
    pub server_name: Option<String>,
    pub db_user: Option<String>,
    pub db_pass: Option<String>,
    pub db_group_default: Option<String>,
}

/// Resolve the settings file path and check it is readable.
///
/// # Errors
///
/// - [`SetupError::MissingInstallRoot`] if no path can be derived
/// - [`SetupError::UnreadableSettings`] if the file cannot be opened
pub fn settings_path(options: &ParsedOptions, env: &Environment) -> Result<PathBuf, SetupError> {
    let path = if let Some(conf) = options.value("conf") {
        PathBuf::from(conf)
    } else if let Some(file) = &env.config_file {
        file.clone()
    } else {
        env.install_root
            .as_ref()
            .ok_or(SetupError::MissingInstallRoot)?
            .join(DEFAULT_SETTINGS_FILE)
    };
    fs::File::open(&path).map_err(|source| SetupError::UnreadableSettings {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Load settings and apply command-line overrides.
///
/// # Errors
///
/// Returns [`SetupError`] if the file cannot be found, read or parsed.
pub fn load_settings(
    options: &ParsedOptions,
    env: &Environment,
    db_type: DbType,
) -> Result<Settings, SetupError> {
    let path = settings_path(options, env)?;
    info!(path = path.display().to_string(); "Loading settings");
    let mut config = read_config(&path)?;

    let wiki = options.value("wiki").map(WikiId::parse);
    let server_name = if wiki.is_none() {
        options.value("server").map(str::to_owned)
    } else {
        None
    };
    if let Some(server) = options.value("server") {
        config.set("server", server);
    }

    let (db_user, db_pass, db_group_default) = if db_type == DbType::None {
        (None, None, None)
    } else {
        (
            options.value("dbuser").map(str::to_owned),
            options.value("dbpass").map(str::to_owned),
            options.value("dbgroupdefault").map(str::to_owned),
        )
    };
    if let Some(group) = &db_group_default {
        config.set("db_group_default", group.as_str());
    }
    if db_type == DbType::Admin {
        if let Some(user) = &db_user {
            debug!(user; "Using admin credentials from the command line");
            config.set("db_user", user.as_str());
            config.set("db_password", db_pass.clone().unwrap_or_default());
        }
    }

    Ok(Settings {
        path,
        config,
        wiki,
        server_name,
        db_user,
        db_pass,
        db_group_default,
    })
}

fn read_config(path: &Path) -> Result<Config, SetupError> {
    let content = fs::read_to_string(path).map_err(|source| SetupError::UnreadableSettings {
        path: path.to_path_buf(),
        source,
    })?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| SetupError::InvalidSettings {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(Config::from_table(table))
}
