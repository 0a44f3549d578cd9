use std::path::PathBuf;

use sled::{Config, Db};

use crate::store::SledKeyValueStore;

const STORE_PREFIX: &str = "store_";

pub struct SledStorageEngine {
    pub db: Db,
}

impl SledStorageEngine {
    pub fn with_homedir_folder(folder_name: &str) -> anyhow::Result<Self> {
        let dir = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to get home directory"))?.join(folder_name);

        Self::with_path(dir)
    }

    pub fn with_path(path: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&path)?;
        let dbpath = path.join("sled");
        let db = sled::open(&dbpath)?;
        Ok(Self { db })
    }

    pub fn new() -> anyhow::Result<Self> { Self::with_homedir_folder(".strata") }

    pub fn new_test() -> anyhow::Result<Self> {
        let db = Config::new().temporary(true).flush_every_ms(None).open()?;
        Ok(Self { db })
    }

    /// Open (or create) the named key space. Each store is its own sled tree.
    pub fn store(&self, name: &str) -> anyhow::Result<SledKeyValueStore> {
        let tree = self.db.open_tree(format!("{STORE_PREFIX}{name}"))?;
        tracing::debug!(store = name, "opened sled store");
        Ok(SledKeyValueStore::new(tree))
    }

    /// List all stores by looking for trees that start with store_
    pub fn list_stores(&self) -> Vec<String> {
        self.db
            .tree_names()
            .into_iter()
            .filter_map(|name| {
                // skip names that are not valid UTF-8
                let name = String::from_utf8(name.to_vec()).ok()?;
                name.strip_prefix(STORE_PREFIX).map(str::to_string)
            })
            .collect()
    }

    pub fn delete_store(&self, name: &str) -> anyhow::Result<bool> { Ok(self.db.drop_tree(format!("{STORE_PREFIX}{name}"))?) }
}
