use crate::core::config::Config;
use crate::core::error::{Error, Result};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

/// Session table holding the pending cross-navigation query.
/// Using &str for both key and value (JSON serialized)
const SESSION_TABLE: TableDefinition<&str, &str> = TableDefinition::new("session");

const HANDOFF_KEY: &str = "search_handoff";

/// Query carried over a full page navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffState {
    pub query_text: String,
    pub pending: bool,
}

impl HandoffState {
    pub fn pending(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            pending: true,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Database(format!("Failed to serialize handoff state: {}", e)))
    }

    fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Database(format!("Failed to deserialize handoff state: {}", e)))
    }
}

/// Session-scoped key-value store that survives page loads
pub struct HandoffStore {
    db: Database,
}

impl HandoffStore {
    /// Open or create the handoff store
    pub fn open(config: &Config) -> Result<Self> {
        if let Some(parent) = config.handoff_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = if config.handoff_path.exists() {
            Database::open(&config.handoff_path).map_err(|e| {
                let msg = e.to_string();
                if msg.to_lowercase().contains("lock") {
                    Error::Database("Session store is locked. Another chaptersearch process may be running.".to_string())
                } else {
                    Error::Database(format!("Failed to open session store: {}", e))
                }
            })?
        } else {
            Database::create(&config.handoff_path)
                .map_err(|e| Error::Database(format!("Failed to create session store: {}", e)))?
        };

        let write_txn = db.begin_write().map_err(|e| {
            Error::Database(format!("Failed to begin write transaction: {}", e))
        })?;
        {
            let _table = write_txn.open_table(SESSION_TABLE).map_err(|e| {
                Error::Database(format!("Failed to open table: {}", e))
            })?;
        }
        write_txn.commit().map_err(|e| {
            Error::Database(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(Self { db })
    }

    /// Store the handoff, replacing any earlier one
    pub fn put(&self, state: &HandoffState) -> Result<()> {
        let json_str = state.to_json()?;
        let write_txn = self.db.begin_write().map_err(|e| {
            Error::Database(format!("Failed to begin write transaction: {}", e))
        })?;

        {
            let mut table = write_txn.open_table(SESSION_TABLE).map_err(|e| {
                Error::Database(format!("Failed to open table: {}", e))
            })?;
            table.insert(HANDOFF_KEY, json_str.as_str()).map_err(|e| {
                Error::Database(format!("Failed to store handoff state: {}", e))
            })?;
        }

        write_txn.commit().map_err(|e| {
            Error::Database(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(())
    }

    /// Read the handoff without clearing it
    pub fn peek(&self) -> Result<Option<HandoffState>> {
        let read_txn = self.db.begin_read().map_err(|e| {
            Error::Database(format!("Failed to begin read transaction: {}", e))
        })?;

        let table = read_txn.open_table(SESSION_TABLE).map_err(|e| {
            Error::Database(format!("Failed to open table: {}", e))
        })?;

        let value = table.get(HANDOFF_KEY).map_err(|e| {
            Error::Database(format!("Failed to read handoff state: {}", e))
        })?;

        match value {
            Some(guard) => HandoffState::from_json(guard.value()).map(Some),
            None => Ok(None),
        }
    }

    /// Read and delete the handoff in one transaction; a second call sees nothing
    pub fn take(&self) -> Result<Option<HandoffState>> {
        let write_txn = self.db.begin_write().map_err(|e| {
            Error::Database(format!("Failed to begin write transaction: {}", e))
        })?;

        let json_str = {
            let mut table = write_txn.open_table(SESSION_TABLE).map_err(|e| {
                Error::Database(format!("Failed to open table: {}", e))
            })?;
            let removed = table.remove(HANDOFF_KEY).map_err(|e| {
                Error::Database(format!("Failed to clear handoff state: {}", e))
            })?;
            removed.map(|guard| guard.value().to_string())
        };

        write_txn.commit().map_err(|e| {
            Error::Database(format!("Failed to commit transaction: {}", e))
        })?;

        json_str.as_deref().map(HandoffState::from_json).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(temp_dir: &TempDir) -> HandoffStore {
        let config = Config::new(Some(temp_dir.path().join("cs"))).unwrap();
        config.init().unwrap();
        HandoffStore::open(&config).unwrap()
    }

    #[test]
    fn test_handoff_state_serialization() {
        let state = HandoffState::pending("inflation");
        let json = state.to_json().unwrap();
        assert!(json.contains("inflation"));
        assert_eq!(HandoffState::from_json(&json).unwrap(), state);
    }

    #[test]
    fn test_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);
        assert!(store.peek().unwrap().is_none());
        assert!(store.take().unwrap().is_none());
    }

    #[test]
    fn test_take_clears_state() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store.put(&HandoffState::pending("BNP")).unwrap();
        assert_eq!(store.peek().unwrap(), Some(HandoffState::pending("BNP")));

        assert_eq!(store.take().unwrap(), Some(HandoffState::pending("BNP")));
        assert!(store.take().unwrap().is_none());
        assert!(store.peek().unwrap().is_none());
    }

    #[test]
    fn test_put_replaces_previous() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir);

        store.put(&HandoffState::pending("first")).unwrap();
        store.put(&HandoffState::pending("second")).unwrap();
        assert_eq!(store.take().unwrap().unwrap().query_text, "second");
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = open_store(&temp_dir);
            store.put(&HandoffState::pending("renter")).unwrap();
        }
        let store = open_store(&temp_dir);
        assert_eq!(store.take().unwrap().unwrap().query_text, "renter");
    }
}
