use std::{fs, io, path::{Path, PathBuf}};

use log::debug;

use crate::backend::interface::{KeyValueStore, Result};

/// Keeps each key in its own `<key>.json` file under a data directory.
///
/// A write lands in a temporary sibling first and is renamed over the
/// target, so readers see either the old blob or the new one.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> FileStore {
        FileStore { dir: dir.as_ref().to_owned() }
    }

    /// Creates the data directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<FileStore> {
        let store = FileStore::new(dir);
        fs::create_dir_all(&store.dir)?;
        return Ok(store);
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key.chars()
            .map(|c| if c.is_ascii_alphanumeric() || "@-_.".contains(c) { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no value stored at {}", path.display());
                Ok(None)
            },
            Err(err) => Err(err.into())
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, value)?;
        if let Err(err) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        debug!("wrote {} bytes to {}", value.len(), path.display());
        return Ok(());
    }
}
