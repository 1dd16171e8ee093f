//! Local CLI cache: user settings, the last JWT and saved searches
//!
//! Files live in `$HOME/.capella-console-client` unless another directory is
//! given. Writes go through a temp file in the same directory followed by a
//! rename, so readers never see a partial file.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::CliError;
use crate::search::SearchFilters;

/// Cache directory name below `$HOME`
pub const CACHE_DIR_NAME: &str = ".capella-console-client";

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// JWT cache file name
pub const JWT_FILE: &str = "jwt.cache";

/// Saved search results file name (name to STAC ids)
pub const SAVED_RESULTS_FILE: &str = "my-searches.json";

/// Saved search queries file name (name to filters)
pub const SAVED_QUERIES_FILE: &str = "my-search-queries.json";

/// Search limit used by the CLI when neither flag nor setting is given
pub const DEFAULT_CLI_LIMIT: u64 = 50;

/// Columns shown in search result tables by default
pub const DEFAULT_SEARCH_COLUMNS: &[&str] = &[
    "id",
    "datetime",
    "instrument_mode",
    "product_type",
    "polarizations",
    "incidence_angle",
];

/// Persisted user settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Default search limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Search result table columns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_headers: Option<Vec<String>>,
    /// Default console user (email)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console_user: Option<String>,
}

impl Settings {
    /// Configured limit, or the CLI default
    pub fn effective_limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_CLI_LIMIT)
    }

    /// Configured columns, or the defaults
    pub fn effective_columns(&self) -> Vec<String> {
        self.search_headers.clone().unwrap_or_else(|| {
            DEFAULT_SEARCH_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect()
        })
    }
}

/// Which saved-search store to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavedKind {
    /// STAC ids returned by a search
    Results,
    /// Filters of a search
    Queries,
}

impl SavedKind {
    fn file_name(self) -> &'static str {
        match self {
            SavedKind::Results => SAVED_RESULTS_FILE,
            SavedKind::Queries => SAVED_QUERIES_FILE,
        }
    }

    /// Label used in messages
    pub fn label(self) -> &'static str {
        match self {
            SavedKind::Results => "saved search",
            SavedKind::Queries => "saved query",
        }
    }
}

/// Saved entries by name
pub type SavedEntries = BTreeMap<String, Value>;

/// Settings, JWT and saved-search files in one directory
#[derive(Debug, Clone)]
pub struct CliCache {
    dir: PathBuf,
}

impl CliCache {
    /// Cache rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `$HOME/.capella-console-client`, or `./.capella-console-client` without `$HOME`
    pub fn default_dir() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CACHE_DIR_NAME)
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Settings file path
    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    /// JWT file path
    pub fn jwt_path(&self) -> PathBuf {
        self.dir.join(JWT_FILE)
    }

    /// Load settings; a missing or unreadable file yields defaults
    pub fn load_settings(&self) -> Settings {
        let path = self.settings_path();
        match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("ignoring malformed settings file {}: {}", path.display(), e);
                Settings::default()
            }),
            Err(_) => Settings::default(),
        }
    }

    /// Persist `settings`
    pub fn save_settings(&self, settings: &Settings) -> Result<(), CliError> {
        let json = serde_json::to_string_pretty(settings)?;
        write_atomic(&self.settings_path(), json.as_bytes())
    }

    /// Cached JWT, if any
    pub fn load_jwt(&self) -> Option<String> {
        std::fs::read_to_string(self.jwt_path())
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Cache `jwt`
    pub fn save_jwt(&self, jwt: &str) -> Result<(), CliError> {
        write_atomic(&self.jwt_path(), jwt.as_bytes())?;
        debug!("cached JWT to {}", self.jwt_path().display());
        Ok(())
    }

    /// Remove a cached JWT
    pub fn clear_jwt(&self) -> Result<(), CliError> {
        match std::fs::remove_file(self.jwt_path()) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl CliCache {
    /// Path of the `kind` store
    pub fn saved_path(&self, kind: SavedKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// All `kind` entries; a missing or unreadable file yields none
    pub fn load_saved(&self, kind: SavedKind) -> SavedEntries {
        let path = self.saved_path(kind);
        match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("ignoring malformed {} file {}: {}", kind.label(), path.display(), e);
                SavedEntries::new()
            }),
            Err(_) => SavedEntries::new(),
        }
    }

    fn store_saved(&self, kind: SavedKind, entries: &SavedEntries) -> Result<(), CliError> {
        let json = serde_json::to_string_pretty(entries)?;
        write_atomic(&self.saved_path(kind), json.as_bytes())
    }

    /// Save `value` as `name`, replacing an entry of the same name
    pub fn save_entry(&self, kind: SavedKind, name: &str, value: Value) -> Result<(), CliError> {
        let name = checked_name(name)?;
        let mut entries = self.load_saved(kind);
        if entries.insert(name.to_string(), value).is_some() {
            info!("replaced {} '{}'", kind.label(), name);
        }
        self.store_saved(kind, &entries)
    }

    /// Save the STAC ids of a search as `name`
    pub fn save_results<S: AsRef<str>>(&self, name: &str, stac_ids: &[S]) -> Result<(), CliError> {
        let ids: Vec<&str> = stac_ids.iter().map(|id| id.as_ref()).collect();
        self.save_entry(SavedKind::Results, name, Value::from(ids))
    }

    /// Save `filters` as `name`
    pub fn save_query(&self, name: &str, filters: &SearchFilters) -> Result<(), CliError> {
        let object: Map<String, Value> = filters
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.save_entry(SavedKind::Queries, name, Value::Object(object))
    }

    /// Filters saved as `name`
    pub fn saved_query(&self, name: &str) -> Result<SearchFilters, CliError> {
        match self.load_saved(SavedKind::Queries).remove(name) {
            Some(Value::Object(object)) => Ok(object.into_iter().collect()),
            Some(_) => Err(CliError::Settings(format!(
                "saved query '{name}' is not a filter object"
            ))),
            None => Err(unknown(SavedKind::Queries, name)),
        }
    }

    /// Rename `old` to `new`; `new` must not exist yet
    pub fn rename_saved(&self, kind: SavedKind, old: &str, new: &str) -> Result<(), CliError> {
        let new = checked_name(new)?;
        let mut entries = self.load_saved(kind);
        if entries.contains_key(new) {
            return Err(CliError::InvalidArgument(format!(
                "{} '{new}' already exists",
                kind.label()
            )));
        }
        let value = entries.remove(old).ok_or_else(|| unknown(kind, old))?;
        entries.insert(new.to_string(), value);
        self.store_saved(kind, &entries)
    }

    /// Delete `names`; nothing is removed when one of them is unknown
    pub fn delete_saved(&self, kind: SavedKind, names: &[String]) -> Result<(), CliError> {
        let mut entries = self.load_saved(kind);
        if let Some(missing) = names.iter().find(|n| !entries.contains_key(n.as_str())) {
            return Err(unknown(kind, missing));
        }
        for name in names {
            entries.remove(name);
        }
        self.store_saved(kind, &entries)
    }

    /// Remove every `kind` entry
    pub fn prune_saved(&self, kind: SavedKind) -> Result<(), CliError> {
        match std::fs::remove_file(self.saved_path(kind)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn checked_name(name: &str) -> Result<&str, CliError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidArgument("name must not be empty".to_string()));
    }
    Ok(name)
}

fn unknown(kind: SavedKind, name: &str) -> CliError {
    CliError::InvalidArgument(format!("no {} named '{name}'", kind.label()))
}

/// Replace `path` with `contents` via temp file and rename
fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CliError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(contents)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file
        .persist(path)
        .map_err(|e| CliError::Settings(format!("failed to write {}: {}", path.display(), e)))?;
    Ok(())
}
