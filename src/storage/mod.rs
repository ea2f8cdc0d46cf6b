mod json_file;
mod memory;

pub use json_file::JsonHistoryStore;
pub use memory::MemoryHistoryStore;

use anyhow::Result;

use crate::history::HistoryRecord;

/// Outcome of reading the persisted history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryLoad {
    Loaded(Vec<HistoryRecord>),
    /// Nothing has been stored yet.
    Missing,
    /// The store exists but could not be read or parsed. Its contents are
    /// lost on the next save.
    Corrupt(String),
}

impl HistoryLoad {
    /// The stored records; missing or corrupt storage reads as empty.
    pub fn into_records(self) -> Vec<HistoryRecord> {
        match self {
            HistoryLoad::Loaded(records) => records,
            HistoryLoad::Missing | HistoryLoad::Corrupt(_) => Vec::new(),
        }
    }
}

/// Durable store for the history sequence.
///
/// The sequence is always read and written whole.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self) -> HistoryLoad;

    /// Replace the stored sequence with `records`.
    async fn save(&self, records: &[HistoryRecord]) -> Result<()>;

    /// Create an empty sequence if nothing is stored yet. Returns whether
    /// anything was created.
    async fn ensure_initialized(&self) -> Result<bool>;
}
