//! An in-memory engine that keeps track of how it was used
//!
//! Clones share the same state, so a test can hand one clone to the driver and inspect another
//! after the run is over.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::engine::{EngineError, EngineErrorKind, KeyRange, StorageEngine};

/// One call made to a `MemoryEngine`, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Put { sync: bool },
    Compact(KeyRange),
    Close,
}

#[derive(Default)]
struct MemoryState {
    mem_storage: BTreeMap<Vec<u8>, Vec<u8>>,
    calls: Vec<EngineCall>,
    closed: bool,
    fail_puts_after: Option<usize>,
    fail_compactions: bool,
    fail_close: bool,
}

impl MemoryState {
    fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

#[derive(Clone, Default)]
pub struct MemoryEngine {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        MemoryEngine::default()
    }

    /// Let the first `n` puts succeed and fail every one after
    pub fn fail_puts_after(&self, n: usize) {
        self.state.borrow_mut().fail_puts_after = Some(n);
    }

    pub fn fail_compactions(&self) {
        self.state.borrow_mut().fail_compactions = true;
    }

    pub fn fail_close(&self) {
        self.state.borrow_mut().fail_close = true;
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.state.borrow().mem_storage.get(key).cloned()
    }

    /// Number of distinct keys stored
    pub fn len(&self) -> usize {
        self.state.borrow().mem_storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.state.borrow().mem_storage.keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.state.borrow().calls.clone()
    }

    pub fn puts(&self) -> usize {
        self.state.borrow().count(|c| matches!(c, EngineCall::Put { .. }))
    }

    pub fn synced_puts(&self) -> usize {
        self.state.borrow().count(|c| *c == EngineCall::Put { sync: true })
    }

    pub fn compactions(&self) -> usize {
        self.state.borrow().count(|c| matches!(c, EngineCall::Compact(_)))
    }

    pub fn closes(&self) -> usize {
        self.state.borrow().count(|c| *c == EngineCall::Close)
    }
}

impl StorageEngine for MemoryEngine {
    fn put(&mut self, key: &[u8], value: &[u8], sync: bool) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(EngineError::new(EngineErrorKind::Write, "engine is closed"));
        }
        let attempted = state.count(|c| matches!(c, EngineCall::Put { .. }));
        state.calls.push(EngineCall::Put { sync });
        if let Some(limit) = state.fail_puts_after {
            if attempted >= limit {
                return Err(EngineError::new(EngineErrorKind::Write, "injected put failure"));
            }
        }
        state.mem_storage.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn compact_range(&mut self, range: &KeyRange) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(EngineError::new(EngineErrorKind::Compact, "engine is closed"));
        }
        state.calls.push(EngineCall::Compact(range.clone()));
        if state.fail_compactions {
            return Err(EngineError::new(EngineErrorKind::Compact, "injected compaction failure"));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        state.calls.push(EngineCall::Close);
        if state.fail_close {
            return Err(EngineError::new(EngineErrorKind::Close, "injected close failure"));
        }
        Ok(())
    }
}
