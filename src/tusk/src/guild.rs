//! Per-guild document store.
//!
//! One JSON document per guild ID under a directory of its own, separate
//! from the global datasets. Guild documents go through a create-on-first-
//! interaction lifecycle: they exist in a half-configured state until setup
//! completes, and only half-configured documents may be cleaned up through
//! [`GuildStore::remove`].

use crate::config::GuildContext;
use crate::store::{read_document, write_document_atomic, StoreResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One guild's configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildData {
    /// Set once setup has completed. Guards against cleanup deleting a
    /// configured guild.
    #[serde(default)]
    pub fully_setup: bool,

    /// Whether SB-restricted items are drawable in this guild.
    #[serde(default)]
    pub is_sb_server: bool,
}

impl GuildData {
    /// The eligibility view of this guild used by the draw engine.
    pub fn context(&self) -> GuildContext {
        GuildContext {
            is_sb_server: self.is_sb_server,
        }
    }
}

/// Handle to the per-guild document directory.
pub struct GuildStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl GuildStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        GuildStore {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, guild_id: &str) -> PathBuf {
        self.dir.join(format!("{guild_id}.json"))
    }

    /// Load a guild's document.
    ///
    /// Missing (or unreadable) documents are created with default contents
    /// when `create_if_missing` is set, then re-read; otherwise `Ok(None)`
    /// is returned, which is a normal outcome rather than an error.
    pub fn get(&self, guild_id: &str, create_if_missing: bool) -> StoreResult<Option<GuildData>> {
        let _guard = self.lock.lock();
        let path = self.path(guild_id);

        if let Some(data) = read_document(&path) {
            return Ok(Some(data));
        }
        if !create_if_missing {
            return Ok(None);
        }

        write_document_atomic(&path, &GuildData::default())?;
        Ok(read_document(&path))
    }

    /// Persist a guild's document.
    pub fn save(&self, guild_id: &str, data: &GuildData) -> StoreResult<()> {
        let _guard = self.lock.lock();
        write_document_atomic(&self.path(guild_id), data)
    }

    /// Delete a guild's document if its setup was abandoned.
    ///
    /// A fully configured guild is a protected no-op here; forced deletion
    /// has to go through an explicit separate path. Returns whether a
    /// document was deleted.
    pub fn remove(&self, guild_id: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock();
        let path = self.path(guild_id);

        let Some(data) = read_document::<GuildData>(&path) else {
            return Ok(false);
        };
        if data.fully_setup {
            tracing::debug!(guild_id, "refusing to remove configured guild");
            return Ok(false);
        }

        fs::remove_file(&path)?;
        Ok(true)
    }
}
