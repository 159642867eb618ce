//! Timer and history persistence
//!
//! The store is a plain key-value layout: one JSON document per key. Timers are
//! always written as a full overwrite; history appends are read-modify-write and
//! rely on the persistence writer being the only caller.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::StoreError,
    state::{HistoryRecord, Timer},
};

const TIMERS_KEY: &str = "timers";
const HISTORY_KEY: &str = "timerLogs";

/// Durable storage for the timer collection and the completion log
pub trait TimerStore: Send + Sync {
    fn load_timers(&self) -> Result<Vec<Timer>, StoreError>;
    fn save_timers(&self, timers: &[Timer]) -> Result<(), StoreError>;
    fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError>;
    fn load_history(&self) -> Result<Vec<HistoryRecord>, StoreError>;
    fn clear_history(&self) -> Result<(), StoreError>;
}

/// JSON files under a data directory, one per key
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open the store, creating the data directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::DataDir(format!("{}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        // Overlapping writes to one key must never share a temp file
        let tmp = self.dir.join(format!(".{}.{}.json.tmp", key, Uuid::new_v4().simple()));
        let content = serde_json::to_string(items)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        debug!("Wrote {} item(s) to {}", items.len(), path.display());
        Ok(())
    }
}

impl TimerStore for JsonFileStore {
    fn load_timers(&self) -> Result<Vec<Timer>, StoreError> {
        self.read(TIMERS_KEY)
    }

    fn save_timers(&self, timers: &[Timer]) -> Result<(), StoreError> {
        self.write(TIMERS_KEY, timers)
    }

    fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        let mut records: Vec<HistoryRecord> = self.read(HISTORY_KEY)?;
        records.push(record.clone());
        self.write(HISTORY_KEY, &records)
    }

    fn load_history(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        self.read(HISTORY_KEY)
    }

    fn clear_history(&self) -> Result<(), StoreError> {
        self.write::<HistoryRecord>(HISTORY_KEY, &[])
    }
}

/// In-process store. Writes can be made to fail to exercise error reporting.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<&'static str, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the stored timer collection
    pub fn with_timers(timers: &[Timer]) -> Result<Self, StoreError> {
        let store = Self::new();
        store.save_timers(timers)?;
        Ok(store)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Store a raw document, bypassing serialization
    pub fn put_raw(&self, key: &'static str, content: &str) -> Result<(), StoreError> {
        self.lock()?.insert(key, content.to_string());
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<&'static str, String>>, StoreError> {
        self.docs
            .lock()
            .map_err(|e| StoreError::DataDir(format!("memory store poisoned: {}", e)))
    }

    fn read<T: DeserializeOwned>(&self, key: &'static str) -> Result<Vec<T>, StoreError> {
        match self.lock()?.get(key) {
            Some(content) => Ok(serde_json::from_str(content)?),
            None => Ok(Vec::new()),
        }
    }

    fn write<T: Serialize>(&self, key: &'static str, items: &[T]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "storage unavailable",
            )));
        }
        let content = serde_json::to_string(items)?;
        self.lock()?.insert(key, content);
        Ok(())
    }
}

impl TimerStore for MemoryStore {
    fn load_timers(&self) -> Result<Vec<Timer>, StoreError> {
        self.read(TIMERS_KEY)
    }

    fn save_timers(&self, timers: &[Timer]) -> Result<(), StoreError> {
        self.write(TIMERS_KEY, timers)
    }

    fn append_history(&self, record: &HistoryRecord) -> Result<(), StoreError> {
        let mut records: Vec<HistoryRecord> = self.read(HISTORY_KEY)?;
        records.push(record.clone());
        self.write(HISTORY_KEY, &records)
    }

    fn load_history(&self) -> Result<Vec<HistoryRecord>, StoreError> {
        self.read(HISTORY_KEY)
    }

    fn clear_history(&self) -> Result<(), StoreError> {
        self.write::<HistoryRecord>(HISTORY_KEY, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{TimerStatus, HistoryRecord};
    use chrono::Utc;
    use uuid::Uuid;

    fn temp_store(tag: &str) -> (JsonFileStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("timer_deck_{}_{}", tag, Uuid::new_v4()));
        (JsonFileStore::open(&dir).unwrap(), dir)
    }

    fn sample_timer() -> Timer {
        Timer {
            id: Uuid::new_v4(),
            name: "Stretch".to_string(),
            category: "Health".to_string(),
            duration: 120,
            remaining_time: 60,
            status: TimerStatus::Paused,
            halfway_alert: true,
        }
    }

    #[test]
    fn test_missing_files_read_as_empty() {
        let (store, dir) = temp_store("empty");
        assert!(store.load_timers().unwrap().is_empty());
        assert!(store.load_history().unwrap().is_empty());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_timers_overwrite() {
        let (store, dir) = temp_store("timers");
        let first = vec![sample_timer(), sample_timer()];
        store.save_timers(&first).unwrap();
        let second = vec![sample_timer()];
        store.save_timers(&second).unwrap();
        assert_eq!(store.load_timers().unwrap(), second);
        let leftovers = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_history_append_and_clear() {
        let (store, dir) = temp_store("history");
        let timer = sample_timer();
        let a = HistoryRecord::for_timer(&timer, Utc::now());
        let b = HistoryRecord::for_timer(&timer, Utc::now());
        store.append_history(&a).unwrap();
        store.append_history(&b).unwrap();
        assert_eq!(store.load_history().unwrap(), vec![a, b]);

        store.clear_history().unwrap();
        assert!(store.load_history().unwrap().is_empty());
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let (store, dir) = temp_store("corrupt");
        fs::write(dir.join("timers.json"), "{not json").unwrap();
        assert!(matches!(store.load_timers(), Err(StoreError::Serialization(_))));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_memory_store_failing_writes() {
        let store = MemoryStore::with_timers(&[sample_timer()]).unwrap();
        store.set_fail_writes(true);
        assert!(matches!(store.save_timers(&[]), Err(StoreError::Io(_))));
        assert_eq!(store.load_timers().unwrap().len(), 1);

        store.set_fail_writes(false);
        store.save_timers(&[]).unwrap();
        assert!(store.load_timers().unwrap().is_empty());
    }
}
