//! In-memory history store for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use tokio::sync::Mutex;

use super::{HistoryLoad, HistoryStore};
use crate::history::HistoryRecord;

#[derive(Debug, Clone)]
enum State {
    Empty,
    Stored(Vec<HistoryRecord>),
    Corrupt,
}

/// In-memory history store. Counts saves so tests can assert that read
/// paths never write.
#[derive(Debug)]
pub struct MemoryHistoryStore {
    state: Mutex<State>,
    saves: AtomicUsize,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Empty),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn with_records(records: Vec<HistoryRecord>) -> Self {
        Self {
            state: Mutex::new(State::Stored(records)),
            saves: AtomicUsize::new(0),
        }
    }

    /// A store whose contents cannot be parsed until the next save.
    pub fn corrupt() -> Self {
        Self {
            state: Mutex::new(State::Corrupt),
            saves: AtomicUsize::new(0),
        }
    }

    pub async fn records(&self) -> Vec<HistoryRecord> {
        match &*self.state.lock().await {
            State::Stored(records) => records.clone(),
            State::Empty | State::Corrupt => Vec::new(),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(&self) -> HistoryLoad {
        match &*self.state.lock().await {
            State::Empty => HistoryLoad::Missing,
            State::Stored(records) => HistoryLoad::Loaded(records.clone()),
            State::Corrupt => HistoryLoad::Corrupt("memory store marked corrupt".to_string()),
        }
    }

    async fn save(&self, records: &[HistoryRecord]) -> Result<()> {
        *self.state.lock().await = State::Stored(records.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn ensure_initialized(&self) -> Result<bool> {
        let mut state = self.state.lock().await;
        if matches!(*state, State::Empty) {
            *state = State::Stored(Vec::new());
            return Ok(true);
        }
        Ok(false)
    }
}
