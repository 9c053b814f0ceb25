use crate::model::Notes;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Key under which the whole notes store is kept.
pub const NOTES_KEY: &str = "dailyCalendarNotes";

const PROJECT_DIR: &str = ".daynotes";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("failed reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed writing {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed parsing notes under {key}: {source}")]
    Parse {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed serializing notes: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Synchronous string key/value store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Keeps each key in `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let write_err = |source| StorageError::Write {
            path: path.display().to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(write_err)?;
        // Replace the value in one step so a failed write never leaves half a blob.
        let staged = path.with_extension("json.tmp");
        fs::write(&staged, value).map_err(write_err)?;
        fs::rename(&staged, &path).map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub entries: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads like [`MemoryStore`], refuses every write.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ReadOnlyStore {
    pub inner: MemoryStore,
    pub writes: usize,
}

#[cfg(test)]
impl KeyValueStore for ReadOnlyStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
        self.writes += 1;
        Err(StorageError::Write {
            path: "memory".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "quota exceeded"),
        })
    }
}

pub fn load_notes(store: &impl KeyValueStore) -> Result<Notes, StorageError> {
    let Some(raw) = store.get(NOTES_KEY)? else {
        debug!(key = NOTES_KEY, "no stored notes, starting empty");
        return Ok(Notes::default());
    };
    if raw.trim().is_empty() {
        return Ok(Notes::default());
    }
    let notes: Notes = serde_json::from_str(&raw).map_err(|source| StorageError::Parse {
        key: NOTES_KEY.to_string(),
        source,
    })?;
    info!(days = notes.days().count(), "loaded notes");
    Ok(notes)
}

pub fn save_notes(store: &mut impl KeyValueStore, notes: &Notes) -> Result<(), StorageError> {
    let serialized = serde_json::to_string(notes).map_err(StorageError::Serialize)?;
    store.set(NOTES_KEY, &serialized)?;
    debug!(bytes = serialized.len(), "saved notes");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Project,
    Global,
    Explicit,
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub dir: PathBuf,
    pub scope: StoreScope,
}

impl StoreScope {
    pub fn label(&self) -> &'static str {
        match self {
            StoreScope::Project => "project",
            StoreScope::Global => "global",
            StoreScope::Explicit => "custom",
        }
    }
}

pub fn init_project_store(cwd: &Path) -> Result<StoreLocation> {
    let dir = cwd.join(PROJECT_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("creating {:?}", dir))?;
    let mut store = FileStore::new(&dir);
    if store.get(NOTES_KEY)?.is_none() {
        save_notes(&mut store, &Notes::default())?;
    }
    Ok(StoreLocation {
        dir,
        scope: StoreScope::Project,
    })
}

/// Picks `explicit` if given, else the nearest `.daynotes` above `start`,
/// else the per-user data directory.
pub fn locate_store(explicit: Option<&Path>, start: &Path) -> Result<StoreLocation> {
    if let Some(dir) = explicit {
        return Ok(StoreLocation {
            dir: dir.to_path_buf(),
            scope: StoreScope::Explicit,
        });
    }
    if let Some(dir) = find_project_store(start) {
        return Ok(StoreLocation {
            dir,
            scope: StoreScope::Project,
        });
    }
    Ok(StoreLocation {
        dir: project_dirs()?.data_dir().to_path_buf(),
        scope: StoreScope::Global,
    })
}

pub fn current_dir() -> Result<PathBuf> {
    env::current_dir().context("reading current directory")
}

pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "daynotes").context("locating data directory")
}

fn find_project_store(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(PROJECT_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}
