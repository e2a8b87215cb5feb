use serde::{Serialize, de::DeserializeOwned};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub const SETTINGS_FILE: &str = "settings.json";
pub const HISTORY_FILE: &str = "history.json";
pub const EXPORT_FILE: &str = "history_export.csv";
pub const LOG_FILE: &str = "ninjaflow.log";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not encode JSON: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Directory holding settings, history and the log file.
#[derive(Clone, Debug)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Write {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    /// `$XDG_DATA_HOME/ninjaflow` (or the platform equivalent), falling back
    /// to `./ninjaflow`.
    pub fn default_root() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ninjaflow")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    /// Reads `file`, returning `Ok(None)` when it does not exist yet.
    pub fn load<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>, StoreError> {
        let path = self.path(file);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| StoreError::Parse { path, source })
    }

    /// Like [`Store::load`] but logs failures and falls back to the default.
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, file: &str) -> T {
        match self.load(file) {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                tracing::error!("{e}; using defaults");
                T::default()
            }
        }
    }

    /// Like [`Store::load`], but a file that does not parse is renamed to
    /// `<file>.bak` so the next save cannot overwrite it. Errors only when the
    /// file cannot be read or moved aside.
    pub fn load_or_backup<T: DeserializeOwned + Default>(&self, file: &str) -> Result<T, StoreError> {
        match self.load(file) {
            Ok(value) => Ok(value.unwrap_or_default()),
            Err(StoreError::Parse { path, source }) => {
                let backup = self.path(&format!("{file}.bak"));
                fs::rename(&path, &backup).map_err(|source| StoreError::Write {
                    path: backup.clone(),
                    source,
                })?;
                tracing::error!(
                    "malformed JSON in {}: {source}; moved to {}",
                    path.display(),
                    backup.display()
                );
                Ok(T::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn save<T: Serialize>(&self, file: &str, data: &T) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(data)?;
        self.write(file, &text)
    }

    pub fn write(&self, file: &str, contents: &str) -> Result<(), StoreError> {
        let path = self.path(file);
        fs::write(&path, contents).map_err(|source| StoreError::Write { path, source })
    }
}
