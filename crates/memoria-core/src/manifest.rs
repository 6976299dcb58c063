//! The manifest: the authoritative, persisted `memo_uid -> {text, image}` node-id map (§3, §6).
//!
//! The vector stores are treated as caches reconstructible from nodes; the manifest is the
//! source of truth for what belongs to which memo. Persisted as a single indented JSON file,
//! written with write-temp-then-rename for crash safety.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Read(std::io::Error),
    #[error("manifest file contained invalid JSON: {0}")]
    Parse(serde_json::Error),
    #[error("failed to write manifest file: {0}")]
    Write(std::io::Error),
}

/// The node ids belonging to one memo, split by which store they live in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoEntry {
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub image: Vec<String>,
}

impl MemoEntry {
    pub fn total_nodes(&self) -> usize {
        self.text.len() + self.image.len()
    }
}

/// The persisted `memo_uid -> MemoEntry` map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    entries: BTreeMap<String, MemoEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the manifest from `path`. A missing file is treated as an empty manifest and
    /// logged, per §7 ("On read: treat as empty and log"); only a present-but-corrupt file is
    /// an error.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(ManifestError::Parse),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "manifest file missing, starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(ManifestError::Read(e)),
        }
    }

    /// Persists the manifest to `path` via write-temp-then-rename.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ManifestError::Write)?;
        }
        let temp_path = path.with_extension("tmp");
        let serialized = serde_json::to_string_pretty(&self.entries).map_err(ManifestError::Parse)?;
        fs::write(&temp_path, serialized).map_err(ManifestError::Write)?;
        fs::rename(&temp_path, path).map_err(ManifestError::Write)?;
        Ok(())
    }

    pub fn get(&self, memo_uid: &str) -> Option<&MemoEntry> {
        self.entries.get(memo_uid)
    }

    pub fn contains(&self, memo_uid: &str) -> bool {
        self.entries.contains_key(memo_uid)
    }

    /// Overwrites the entry for `memo_uid` wholesale (upsert is always delete-then-insert of
    /// the whole node set, never a partial edit — invariant 4 in §3).
    pub fn set(&mut self, memo_uid: impl Into<String>, entry: MemoEntry) {
        self.entries.insert(memo_uid.into(), entry);
    }

    pub fn remove(&mut self, memo_uid: &str) -> Option<MemoEntry> {
        self.entries.remove(memo_uid)
    }

    pub fn memo_count(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MemoEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("memo_vector_map.json");
        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.memo_count(), 0);
    }

    #[test]
    fn save_then_load_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("memo_vector_map.json");

        let mut manifest = Manifest::new();
        manifest.set(
            "memos/A",
            MemoEntry { text: vec!["memo:memos/A".to_string()], image: vec![] },
        );
        manifest.save(&path).unwrap();

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded.get("memos/A").unwrap().text, vec!["memo:memos/A".to_string()]);
    }

    #[test]
    fn set_overwrites_whole_entry() {
        let mut manifest = Manifest::new();
        manifest.set("memos/A", MemoEntry { text: vec!["old".to_string()], image: vec![] });
        manifest.set("memos/A", MemoEntry { text: vec!["new".to_string()], image: vec![] });
        assert_eq!(manifest.get("memos/A").unwrap().text, vec!["new".to_string()]);
    }

    #[test]
    fn remove_deletes_entry() {
        let mut manifest = Manifest::new();
        manifest.set("memos/A", MemoEntry::default());
        assert!(manifest.remove("memos/A").is_some());
        assert!(!manifest.contains("memos/A"));
    }
}
