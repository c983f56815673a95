//! Recent-file history.
//!
//! Entries live in a [`RecencyStore`] shared by every window. The history
//! tags its own entries with a group name and stores the encoding of the
//! file in the free-form description (`Encoding: X`) so a reopen can restore
//! it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::infrastructure::error::{AppError, Result};
use crate::app::services::text_ops::extract_filename;

pub const RECENT_GROUP: &str = "QuillPad";
pub const RECENT_ACTION_PREFIX: &str = "recent-info-";
const ENCODING_PREFIX: &str = "Encoding: ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub uri: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
    #[serde(default)]
    pub groups: Vec<String>,
    pub modified: DateTime<Utc>,
}

fn default_mime_type() -> String {
    "text/plain".to_string()
}

impl RecentEntry {
    pub fn has_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    pub fn path(&self) -> Option<PathBuf> {
        Url::parse(&self.uri).ok()?.to_file_path().ok()
    }
}

/// Storage behind the recent-file history.
pub trait RecencyStore {
    fn items(&self) -> Vec<RecentEntry>;
    /// Insert `entry`, replacing any entry with the same uri.
    fn upsert(&mut self, entry: RecentEntry) -> Result<()>;
    /// Mark an existing entry as used now.
    fn touch(&mut self, uri: &str, when: DateTime<Utc>) -> Result<()>;
    fn remove(&mut self, uri: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryRecencyStore {
    entries: Vec<RecentEntry>,
}

impl MemoryRecencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn upsert_entry(entries: &mut Vec<RecentEntry>, entry: RecentEntry) {
    match entries.iter_mut().find(|e| e.uri == entry.uri) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

fn touch_entry(entries: &mut [RecentEntry], uri: &str, when: DateTime<Utc>) -> Result<()> {
    let entry = entries
        .iter_mut()
        .find(|e| e.uri == uri)
        .ok_or_else(|| AppError::Store(format!("Could not find the item with URI '{}'", uri)))?;
    entry.modified = when;
    Ok(())
}

fn remove_entry(entries: &mut Vec<RecentEntry>, uri: &str) -> Result<()> {
    let idx = entries
        .iter()
        .position(|e| e.uri == uri)
        .ok_or_else(|| AppError::Store(format!("Could not find the item with URI '{}'", uri)))?;
    entries.remove(idx);
    Ok(())
}

impl RecencyStore for MemoryRecencyStore {
    fn items(&self) -> Vec<RecentEntry> {
        self.entries.clone()
    }

    fn upsert(&mut self, entry: RecentEntry) -> Result<()> {
        upsert_entry(&mut self.entries, entry);
        Ok(())
    }

    fn touch(&mut self, uri: &str, when: DateTime<Utc>) -> Result<()> {
        touch_entry(&mut self.entries, uri, when)
    }

    fn remove(&mut self, uri: &str) -> Result<()> {
        remove_entry(&mut self.entries, uri)
    }
}

/// Recency store kept in a JSON file.
///
/// Several processes may share one file, so every change reloads the file
/// first and replaces it atomically afterwards.
#[derive(Debug)]
pub struct JsonRecencyStore {
    path: PathBuf,
    entries: Vec<RecentEntry>,
}

fn load_entries(path: &Path) -> Option<Vec<RecentEntry>> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(entries) => Some(entries),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to parse recent history");
            None
        }
    }
}

impl JsonRecencyStore {
    pub fn open(path: PathBuf) -> Self {
        let entries = load_entries(&path).unwrap_or_default();
        Self { path, entries }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("quillpad");
        path.push("recent.json");
        path
    }

    fn reload(&mut self) {
        if let Some(entries) = load_entries(&self.path) {
            self.entries = entries;
        }
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension(format!("json.{}.tmp", std::process::id()));
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl RecencyStore for JsonRecencyStore {
    fn items(&self) -> Vec<RecentEntry> {
        load_entries(&self.path).unwrap_or_else(|| self.entries.clone())
    }

    fn upsert(&mut self, entry: RecentEntry) -> Result<()> {
        self.reload();
        upsert_entry(&mut self.entries, entry);
        self.persist()
    }

    fn touch(&mut self, uri: &str, when: DateTime<Utc>) -> Result<()> {
        self.reload();
        touch_entry(&mut self.entries, uri, when)?;
        self.persist()
    }

    fn remove(&mut self, uri: &str) -> Result<()> {
        self.reload();
        remove_entry(&mut self.entries, uri)?;
        self.persist()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentMenuItem {
    pub action_name: String,
    pub label: String,
    pub tooltip: String,
    pub uri: String,
    pub path: PathBuf,
}

pub fn file_uri(path: &Path) -> Option<String> {
    Url::from_file_path(path).ok().map(|u| u.to_string())
}

/// Encoding label stored in an entry description, if any.
pub fn encoding_from_description(description: &str) -> Option<&str> {
    description
        .strip_prefix(ENCODING_PREFIX)
        .map(str::trim)
        .filter(|enc| !enc.is_empty())
}

fn escape_underscores(label: &str) -> String {
    label.replace('_', "__")
}

pub struct RecentHistory {
    store: Box<dyn RecencyStore>,
    group: String,
    generation: u64,
}

impl RecentHistory {
    pub fn new(store: Box<dyn RecencyStore>) -> Self {
        Self {
            store,
            group: RECENT_GROUP.to_string(),
            generation: 0,
        }
    }

    /// Bumped on every change to the store made through this history.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn changed(&mut self) {
        self.generation += 1;
    }

    pub fn record(&mut self, path: &Path, encoding: &str) -> Result<()> {
        self.record_at(path, encoding, Utc::now())
    }

    pub fn record_at(&mut self, path: &Path, encoding: &str, when: DateTime<Utc>) -> Result<()> {
        let uri = file_uri(path)
            .ok_or_else(|| AppError::Store(format!("\"{}\" is not an absolute path", path.display())))?;
        let entry = RecentEntry {
            uri,
            display_name: extract_filename(&path.to_string_lossy()),
            description: Some(format!("{}{}", ENCODING_PREFIX, encoding)),
            mime_type: default_mime_type(),
            groups: vec![self.group.clone()],
            modified: when,
        };
        tracing::debug!(uri = %entry.uri, encoding, "recording recent file");
        self.store.upsert(entry)?;
        self.changed();
        Ok(())
    }

    pub fn entry(&self, uri: &str) -> Option<RecentEntry> {
        self.store.items().into_iter().find(|e| e.uri == uri)
    }

    /// Entries of this application, newest first.
    pub fn entries(&self) -> Vec<RecentEntry> {
        let mut filtered: Vec<RecentEntry> = self
            .store
            .items()
            .into_iter()
            .filter(|e| e.has_group(&self.group))
            .collect();
        filtered.sort_by(|a, b| b.modified.cmp(&a.modified));
        filtered
    }

    /// Menu items for at most `limit` existing files. Entries whose file is
    /// gone are removed from the store on the way.
    pub fn build_menu(&mut self, limit: usize, exists: impl Fn(&Path) -> bool) -> Vec<RecentMenuItem> {
        let mut items = Vec::new();

        for entry in self.entries() {
            if items.len() >= limit {
                break;
            }
            match entry.path() {
                Some(path) if exists(&path) => {
                    items.push(RecentMenuItem {
                        action_name: format!("{}{}", RECENT_ACTION_PREFIX, items.len() + 1),
                        label: escape_underscores(&entry.display_name),
                        tooltip: format!("Open '{}'", path.display()),
                        uri: entry.uri.clone(),
                        path,
                    });
                }
                _ => {
                    tracing::debug!(uri = %entry.uri, "pruning missing recent file");
                    self.forget(&entry.uri);
                }
            }
        }

        items
    }

    /// Move an entry to the front after a successful reopen.
    pub fn touch(&mut self, uri: &str) {
        match self.store.touch(uri, Utc::now()) {
            Ok(()) => self.changed(),
            Err(e) => tracing::warn!(uri, error = %e, "failed to update recent entry"),
        }
    }

    /// Best-effort removal; failures are logged and otherwise ignored.
    pub fn forget(&mut self, uri: &str) {
        match self.store.remove(uri) {
            Ok(()) => self.changed(),
            Err(e) => tracing::warn!(uri, error = %e, "failed to remove recent entry"),
        }
    }

    /// Remove every entry of this application, stopping at the first failure.
    pub fn clear(&mut self) -> Result<()> {
        let uris: Vec<String> = self
            .store
            .items()
            .into_iter()
            .filter(|e| e.has_group(&self.group))
            .map(|e| e.uri)
            .collect();

        let mut result = Ok(());
        for uri in uris {
            if let Err(e) = self.store.remove(&uri) {
                result = Err(e);
                break;
            }
        }
        self.changed();
        result
    }
}

impl std::fmt::Debug for RecentHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecentHistory")
            .field("group", &self.group)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
