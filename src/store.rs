//! Client state that survives a restart: who is logged in and whether a game
//! was in progress.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Key of the persisted [`Identity`] record.
pub const IDENTITY_KEY: &str = "battleship_user";

/// Key of the in-game marker; present with value `"true"` while in a game.
pub const IN_GAME_KEY: &str = "battleship_in_game";

/// The logged-in player as remembered between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub elo: i32,
    #[serde(rename = "sessionToken", default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt store entry {key:?}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String key/value storage with typed accessors for the two known keys.
pub trait SessionStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    fn identity(&self) -> Result<Option<Identity>, StoreError> {
        self.get(IDENTITY_KEY)
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                    key: IDENTITY_KEY.to_string(),
                    source,
                })
            })
            .transpose()
    }

    fn save_identity(&mut self, identity: &Identity) -> Result<(), StoreError> {
        let raw = serde_json::to_string(identity).map_err(|source| StoreError::Corrupt {
            key: IDENTITY_KEY.to_string(),
            source,
        })?;
        self.set(IDENTITY_KEY, raw)
    }

    fn clear_identity(&mut self) -> Result<(), StoreError> {
        self.remove(IDENTITY_KEY)
    }

    fn in_game(&self) -> bool {
        self.get(IN_GAME_KEY).as_deref() == Some("true")
    }

    fn set_in_game(&mut self, in_game: bool) -> Result<(), StoreError> {
        if in_game {
            self.set(IN_GAME_KEY, "true".to_string())
        } else {
            self.remove(IN_GAME_KEY)
        }
    }
}

/// Volatile store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object file, rewritten on every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data).map_err(|source| StoreError::Corrupt {
                key: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(&self.entries).map_err(|source| {
            StoreError::Corrupt {
                key: self.path.display().to_string(),
                source,
            }
        })?;
        fs::write(&self.path, data).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }
}
