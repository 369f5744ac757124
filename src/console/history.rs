//! Query history kept per database file.
//!
//! The console records every statement the backend accepted. Entries are
//! flattened onto a single line, deduplicated, and capped at
//! [`MAX_HISTORY_ENTRIES`]. A [`HistoryStore`] persists the list across
//! sessions, keyed by the file the console was opened on.
//!
//! The default store is a JSON file at `~/.ecshell_history.json`. Its
//! location can be overridden with the `ECSHELL_HISTORY` environment
//! variable; an empty value disables persistence.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_HISTORY_ENTRIES: usize = 10;
pub const HISTORY_ENV_VAR: &str = "ECSHELL_HISTORY";
const DEFAULT_HISTORY_FILE: &str = ".ecshell_history.json";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("History file {path} is malformed: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, HistoryError>;

/// Bounded, deduplicated list of previously executed statements, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryHistory {
    entries: Vec<String>,
}

impl QueryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from persisted entries, applying the same rules as [`push`].
    ///
    /// [`push`]: QueryHistory::push
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut history = Self::new();
        for entry in entries {
            history.push(entry.as_ref());
        }
        history
    }

    /// Records `text`. Returns false when it was already present (or blank).
    pub fn push(&mut self, text: &str) -> bool {
        let normalized = normalize(text);
        if normalized.is_empty() || self.entries.contains(&normalized) {
            return false;
        }
        self.entries.push(normalized);
        if self.entries.len() > MAX_HISTORY_ENTRIES {
            let excess = self.entries.len() - MAX_HISTORY_ENTRIES;
            self.entries.drain(..excess);
        }
        true
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn to_list(&self) -> Vec<String> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collapses newlines and whitespace runs into single spaces.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Durable storage for history lists.
pub trait HistoryStore {
    fn load(&self, key: &str) -> Result<Vec<String>>;
    fn save(&mut self, key: &str, entries: &[String]) -> Result<()>;
}

/// Keeps history in memory only.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    lists: HashMap<String, Vec<String>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.lists.get(key).cloned().unwrap_or_default())
    }

    fn save(&mut self, key: &str, entries: &[String]) -> Result<()> {
        self.lists.insert(key.to_string(), entries.to_vec());
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    version: String,
    #[serde(rename = "ecsqlHistory", default)]
    ecsql_history: BTreeMap<String, Vec<String>>,
}

/// Stores history for all files in one JSON document.
#[derive(Debug, Clone)]
pub struct JsonHistoryStore {
    path: PathBuf,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<HistoryFile> {
        if !self.path.exists() {
            return Ok(HistoryFile::default());
        }
        let data = fs::read_to_string(&self.path).map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| HistoryError::Json {
            path: self.path.clone(),
            source,
        })
    }
}

impl HistoryStore for JsonHistoryStore {
    fn load(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.read()?.ecsql_history.remove(key).unwrap_or_default())
    }

    fn save(&mut self, key: &str, entries: &[String]) -> Result<()> {
        // A malformed file is left for the user to repair; its other keys are not ours to drop.
        let mut file = self.read()?;
        file.version = env!("CARGO_PKG_VERSION").to_string();
        file.ecsql_history.insert(key.to_string(), entries.to_vec());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| HistoryError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let data = serde_json::to_string_pretty(&file).map_err(|source| HistoryError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, data).map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Resolves where history is persisted, or `None` when persistence is disabled.
pub fn history_path() -> Option<PathBuf> {
    if let Ok(custom_path) = env::var(HISTORY_ENV_VAR) {
        if custom_path.is_empty() {
            return None;
        }
        return Some(PathBuf::from(custom_path));
    }

    env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(DEFAULT_HISTORY_FILE))
}

/// The key history is stored under for a database file.
pub fn history_key(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_push_normalizes_whitespace() {
        let mut history = QueryHistory::new();
        history.push("SELECT *\n  FROM   bis.Element\n\tWHERE 1 = 1;");
        assert_eq!(history.entries(), &["SELECT * FROM bis.Element WHERE 1 = 1;"]);
    }

    #[test]
    fn test_push_skips_duplicates() {
        let mut history = QueryHistory::new();
        assert!(history.push("SELECT 1;"));
        assert!(!history.push("SELECT 1;"));
        assert!(!history.push("SELECT\n1;"));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_push_skips_duplicates_anywhere_in_list() {
        let mut history = QueryHistory::new();
        history.push("SELECT 1;");
        history.push("SELECT 2;");
        assert!(!history.push("SELECT 1;"));
        assert_eq!(history.to_list(), vec!["SELECT 1;", "SELECT 2;"]);
    }

    #[test]
    fn test_history_is_capped_dropping_oldest() {
        let mut history = QueryHistory::new();
        for i in 0..25 {
            history.push(&format!("SELECT {};", i));
            assert!(history.len() <= MAX_HISTORY_ENTRIES);
        }
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history.entries()[0], "SELECT 15;");
        assert_eq!(history.entries()[9], "SELECT 24;");
    }

    #[test]
    fn test_blank_input_is_not_recorded() {
        let mut history = QueryHistory::new();
        assert!(!history.push("  \n "));
        assert!(history.is_empty());
    }

    #[test]
    fn test_from_entries_applies_rules() {
        let loaded: Vec<String> = (0..12).map(|i| format!("SELECT {};", i)).collect();
        let history = QueryHistory::from_entries(&loaded);
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history.entries()[0], "SELECT 2;");
    }

    #[test]
    fn test_json_store_round_trip_per_key() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonHistoryStore::new(dir.path().join("nested").join("history.json"));

        store.save("/a.bim", &["SELECT 1;".to_string()]).unwrap();
        store.save("/b.ecdb", &["SELECT 2;".to_string()]).unwrap();

        assert_eq!(store.load("/a.bim").unwrap(), vec!["SELECT 1;"]);
        assert_eq!(store.load("/b.ecdb").unwrap(), vec!["SELECT 2;"]);
        assert!(store.load("/c.bim").unwrap().is_empty());

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("ecsqlHistory"));
    }

    #[test]
    fn test_json_store_reports_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "not json").unwrap();
        let store = JsonHistoryStore::new(&path);
        assert!(matches!(store.load("/a.bim"), Err(HistoryError::Json { .. })));
    }

    #[test]
    fn test_save_leaves_malformed_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let damaged = r#"{"ecsqlHistory":{"/other.bim":["SELECT 9;"]},"#;
        fs::write(&path, damaged).unwrap();

        let mut store = JsonHistoryStore::new(&path);
        let result = store.save("/a.bim", &["SELECT 1;".to_string()]);

        assert!(matches!(result, Err(HistoryError::Json { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), damaged);
    }

    #[test]
    fn test_save_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, r#"{"version":"0.0.1","ecsqlHistory":{"/other.bim":["SELECT 9;"]}}"#).unwrap();

        let mut store = JsonHistoryStore::new(&path);
        store.save("/a.bim", &["SELECT 1;".to_string()]).unwrap();

        assert_eq!(store.load("/other.bim").unwrap(), vec!["SELECT 9;"]);
        assert_eq!(store.load("/a.bim").unwrap(), vec!["SELECT 1;"]);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryHistoryStore::new();
        store.save("k", &["SELECT 1;".to_string()]).unwrap();
        assert_eq!(store.load("k").unwrap(), vec!["SELECT 1;"]);
        assert!(store.load("other").unwrap().is_empty());
    }

    #[test]
    fn test_custom_history_path_from_env() {
        env::set_var(HISTORY_ENV_VAR, "/custom/history.json");
        let path = history_path();
        env::set_var(HISTORY_ENV_VAR, "");
        let disabled = history_path();
        env::remove_var(HISTORY_ENV_VAR);

        assert_eq!(path, Some(PathBuf::from("/custom/history.json")));
        assert_eq!(disabled, None);
    }
}
