use std::{fs, path::{Path, PathBuf}};

use anyhow::{self, Context};
use chrono::FixedOffset;
use log::debug;
use serde::{Serialize, Deserialize};
use toml;

use crate::backend::{FileStore, LocalLedgerStore, EXPENSES_KEY};
use crate::remote::{FirestoreCollection, RemoteLedgerStore};

pub const DEFAULT_CONFIG: &str = "expenses.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub key: String
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig { data_dir: PathBuf::from("data"), key: EXPENSES_KEY.to_owned() }
    }
}

impl StorageConfig {
    /// Opens the file-backed ledger, creating the data directory if needed.
    pub fn open_store(&self) -> anyhow::Result<LocalLedgerStore<FileStore>> {
        let store = FileStore::open(&self.data_dir)
            .with_context(|| format!("failed to open data directory {}", self.data_dir.display()))?;
        return Ok(LocalLedgerStore::with_key(store, &self.key));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Offset from UTC used to decide which month an expense falls in.
    pub utc_offset_minutes: i32
}

impl SummaryConfig {
    pub fn offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .with_context(|| format!("utc offset out of range: {} minutes", self.utc_offset_minutes))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { bind: "127.0.0.1:3000".to_owned() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub project_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Also push every local append to the remote collection.
    #[serde(default)]
    pub mirror_appends: bool
}

fn default_collection() -> String {
    "expenses".to_owned()
}

fn default_base_url() -> String {
    "https://firestore.googleapis.com/v1".to_owned()
}

impl RemoteConfig {
    pub fn open_store(&self) -> RemoteLedgerStore<FirestoreCollection> {
        RemoteLedgerStore::new(FirestoreCollection::new(self))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub remote: Option<RemoteConfig>
}

impl AppConfig {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str(content)
            .with_context(|| "failed to parse config file")?;
        return Ok(config);
    }

    /// Reads the config at `filepath`; a missing file gives the defaults.
    pub fn read(filepath: impl AsRef<Path>) -> anyhow::Result<Self> {
        let filepath = filepath.as_ref();
        if !filepath.exists() {
            debug!("no config at {}, using defaults", filepath.display());
            return Ok(AppConfig::default());
        }
        let file_content = fs::read_to_string(filepath)
            .with_context(|| format!("failed to read config file {}", filepath.display()))?;
        AppConfig::parse(&file_content)
    }
}
