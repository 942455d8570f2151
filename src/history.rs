use tracing::{debug, warn};

use crate::db::Db;
use crate::error::StoreError;
use crate::types::{ConversionRecord, HISTORY_CAP, HISTORY_KEY};

/// Newest-first conversion log, never longer than `HISTORY_CAP`.
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    entries: Vec<ConversionRecord>,
}

impl HistoryStore {
    /// Corrupt or unreadable data yields an empty history.
    pub fn load(db: &Db) -> Self {
        let raw = match db.get_setting(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::default(),
            Err(e) => {
                warn!(error = %e, "failed to read history, starting empty");
                return Self::default();
            }
        };

        match decode(&raw) {
            Ok(entries) => {
                debug!(count = entries.len(), "history loaded");
                Self { entries }
            }
            Err(e) => {
                warn!(error = %e, "resetting history");
                Self::default()
            }
        }
    }

    pub fn entries(&self) -> &[ConversionRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prepends and persists. A failed write is logged; the in-memory
    /// entry stays.
    pub fn record(&mut self, db: &Db, entry: ConversionRecord) {
        self.entries.insert(0, entry);
        self.entries.truncate(HISTORY_CAP);
        if let Err(e) = self.persist(db) {
            warn!(error = %e, "failed to persist history");
        }
    }

    /// Returns whether anything was cleared.
    pub fn clear(&mut self, db: &Db, confirmed: bool) -> bool {
        if !confirmed {
            return false;
        }
        self.entries.clear();
        if let Err(e) = db.remove_setting(HISTORY_KEY) {
            warn!(error = %e, "failed to remove persisted history");
        }
        true
    }

    fn persist(&self, db: &Db) -> anyhow::Result<()> {
        let json = serde_json::to_string(&self.entries)?;
        db.set_setting(HISTORY_KEY, &json)
    }
}

fn decode(raw: &str) -> Result<Vec<ConversionRecord>, StoreError> {
    let mut entries: Vec<ConversionRecord> =
        serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    if let Some(bad) = entries.iter().position(|r| !r.is_valid()) {
        return Err(StoreError::Corrupt(format!("entry {} out of range", bad)));
    }
    entries.truncate(HISTORY_CAP);
    Ok(entries)
}
