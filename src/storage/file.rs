use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;

use super::LocalStore;

/// Local storage persisted as a single JSON object on disk.
///
/// Every call re-reads the file so that separate processes sharing the path
/// observe each other's writes; writes go through a temp file and a rename.
/// A file that no longer parses is moved to `<name>.corrupt` and the store
/// starts over empty.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tracing::debug!(path = %path.display(), "opening file store");
        Ok(FileStore {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let body = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if body.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&body) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                self.quarantine(&e)?;
                Ok(BTreeMap::new())
            }
        }
    }

    fn quarantine(&self, error: &serde_json::Error) -> anyhow::Result<()> {
        let aside = self.corrupt_path();
        tracing::warn!(
            path = %self.path.display(),
            moved_to = %aside.display(),
            %error,
            "local storage file is unparseable, starting over"
        );
        match std::fs::rename(&self.path, &aside) {
            Ok(()) => Ok(()),
            // another handle got there first
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to move aside {}", self.path.display())),
        }
    }

    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".corrupt");
        self.path.with_file_name(name)
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> anyhow::Result<()> {
        let tmp = self.path.with_extension("tmp");
        let body = serde_json::to_string_pretty(entries)?;
        std::fs::write(&tmp, body).with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("file store lock poisoned"))?;
        let mut entries = self.load()?;
        f(&mut entries);
        self.store(&entries)
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn keys(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }
}
