//! Persistent key/value flags.
//!
//! Selections, kill totals, achievements and reward claims all live in a flat
//! store of integer and float flags.  [`MemoryFlagStore`] keeps them in memory
//! (tests, headless runs); [`TomlFlagStore`] mirrors them to
//! `saves/flags.toml` on [`FlagStore::flush`].

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ── Keys ──────────────────────────────────────────────────────────────────────

pub const SELECTED_MAP: &str = "SelectedMap";
pub const SELECTED_DIFFICULTY: &str = "SelectedDifficulty";
pub const SELECTED_COMBAT: &str = "SelectedCombat";
pub const TOTAL_KILLS: &str = "TotalKills";

/// `Achievement_{threshold}Kills`.
pub fn achievement_key(threshold: u32) -> String {
    format!("Achievement_{threshold}Kills")
}

pub const DEFAULT_FLAGS_PATH: &str = "saves/flags.toml";
const FLAGS_VERSION: u32 = 1;

// ── Store trait ───────────────────────────────────────────────────────────────

pub trait FlagStore {
    fn get_int(&self, key: &str, default: i32) -> i32;
    fn set_int(&mut self, key: &str, value: i32);
    fn get_float(&self, key: &str, default: f32) -> f32;
    fn set_float(&mut self, key: &str, value: f32);
    /// Persist pending writes.
    fn flush(&mut self) -> CoreResult<()>;

    /// Convenience for 0/1 flags.
    fn is_set(&self, key: &str) -> bool {
        self.get_int(key, 0) != 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlagTable {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub ints: BTreeMap<String, i32>,
    #[serde(default)]
    pub floats: BTreeMap<String, f32>,
}

impl FlagTable {
    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.ints.get(key).copied().unwrap_or(default)
    }

    fn get_float(&self, key: &str, default: f32) -> f32 {
        self.floats.get(key).copied().unwrap_or(default)
    }
}

// ── In-memory ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemoryFlagStore {
    table: FlagTable,
    flushes: u32,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `flush` was called.
    pub fn flush_count(&self) -> u32 {
        self.flushes
    }
}

impl FlagStore for MemoryFlagStore {
    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.table.get_int(key, default)
    }

    fn set_int(&mut self, key: &str, value: i32) {
        self.table.ints.insert(key.to_string(), value);
    }

    fn get_float(&self, key: &str, default: f32) -> f32 {
        self.table.get_float(key, default)
    }

    fn set_float(&mut self, key: &str, value: f32) {
        self.table.floats.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> CoreResult<()> {
        self.flushes += 1;
        Ok(())
    }
}

// ── TOML file ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TomlFlagStore {
    path: PathBuf,
    table: FlagTable,
    dirty: bool,
}

impl TomlFlagStore {
    /// Load `path`, or start empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let table = match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| CoreError::FlagStoreParse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FlagTable::default(),
            Err(source) => {
                return Err(CoreError::FlagStoreIo {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Ok(Self {
            path,
            table,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FlagStore for TomlFlagStore {
    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.table.get_int(key, default)
    }

    fn set_int(&mut self, key: &str, value: i32) {
        self.table.ints.insert(key.to_string(), value);
        self.dirty = true;
    }

    fn get_float(&self, key: &str, default: f32) -> f32 {
        self.table.get_float(key, default)
    }

    fn set_float(&mut self, key: &str, value: f32) {
        self.table.floats.insert(key.to_string(), value);
        self.dirty = true;
    }

    fn flush(&mut self) -> CoreResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let io_err = |source| CoreError::FlagStoreIo {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        self.table.version = FLAGS_VERSION;
        let serialized =
            toml::to_string_pretty(&self.table).map_err(|e| CoreError::FlagStoreParse {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        fs::write(&self.path, serialized).map_err(io_err)?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("wave_survival_flags_{}_{}", std::process::id(), name))
            .join("flags.toml")
    }

    #[test]
    fn memory_store_defaults_and_overwrites() {
        let mut store = MemoryFlagStore::new();
        assert_eq!(store.get_int(TOTAL_KILLS, 0), 0);
        store.set_int(TOTAL_KILLS, 7);
        store.set_float("Volume", 0.5);
        assert_eq!(store.get_int(TOTAL_KILLS, 0), 7);
        assert_eq!(store.get_float("Volume", 1.0), 0.5);
        assert!(!store.is_set(&achievement_key(5)));
    }

    #[test]
    fn toml_store_round_trips_through_disk() {
        let path = temp_path("round_trip");
        let _ = fs::remove_file(&path);

        let mut store = TomlFlagStore::open(&path).expect("missing file opens empty");
        store.set_int(&achievement_key(25), 1);
        store.set_int(SELECTED_DIFFICULTY, 2);
        store.flush().expect("flush writes file");

        let reopened = TomlFlagStore::open(&path).expect("written file parses");
        assert_eq!(reopened.get_int(SELECTED_DIFFICULTY, -1), 2);
        assert!(reopened.is_set("Achievement_25Kills"));

        let _ = fs::remove_dir_all(path.parent().unwrap_or(&path));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let path = temp_path("malformed");
        fs::create_dir_all(path.parent().unwrap_or(&path)).expect("temp dir");
        fs::write(&path, "ints = 3").expect("write garbage");

        assert!(matches!(
            TomlFlagStore::open(&path),
            Err(CoreError::FlagStoreParse { .. })
        ));
        let _ = fs::remove_dir_all(path.parent().unwrap_or(&path));
    }
}
