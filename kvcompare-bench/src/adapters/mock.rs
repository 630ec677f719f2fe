//! In-memory `KvBackend` with failure injection, for runner and timer tests.

use crate::{BackendKind, BenchError, BenchResult, KvBackend, OpKind};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) struct MockBackend {
    kind: BackendKind,
    store: HashMap<String, String>,
    /// Per op kind: zero-based call indices that must fail.
    failures: HashMap<OpKind, HashSet<usize>>,
    calls: HashMap<OpKind, usize>,
    delay: Option<Duration>,
    reported_storage: Option<u64>,
    closed: Arc<AtomicBool>,
    history: Arc<Mutex<Vec<(OpKind, String)>>>,
}

impl MockBackend {
    pub(crate) fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            store: HashMap::new(),
            failures: HashMap::new(),
            calls: HashMap::new(),
            delay: None,
            reported_storage: None,
            closed: Arc::new(AtomicBool::new(false)),
            history: Arc::default(),
        }
    }

    pub(crate) fn fail_on(mut self, op: OpKind, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failures.entry(op).or_default().extend(calls);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn with_reported_storage(mut self, bytes: u64) -> Self {
        self.reported_storage = Some(bytes);
        self
    }

    pub(crate) fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    /// Every attempted call, in issue order.
    pub(crate) fn history(&self) -> Arc<Mutex<Vec<(OpKind, String)>>> {
        Arc::clone(&self.history)
    }

    pub(crate) fn value(&self, key: &str) -> Option<String> {
        self.store.get(key).cloned()
    }

    fn tick(&mut self, op: OpKind, key: &str) -> BenchResult<()> {
        if let Ok(mut h) = self.history.lock() {
            h.push((op, key.to_string()));
        }
        if let Some(d) = self.delay {
            std::thread::sleep(d);
        }
        let n = self.calls.entry(op).or_insert(0);
        let idx = *n;
        *n += 1;
        if self.failures.get(&op).is_some_and(|f| f.contains(&idx)) {
            return Err(BenchError::Protocol(format!("injected {} failure #{}", op.as_str(), idx)));
        }
        Ok(())
    }
}

impl KvBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn set(&mut self, key: &str, value: &str) -> BenchResult<()> {
        self.tick(OpKind::Set, key)?;
        self.store.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&mut self, key: &str) -> BenchResult<Option<String>> {
        self.tick(OpKind::Get, key)?;
        Ok(self.store.get(key).cloned())
    }

    fn delete(&mut self, key: &str) -> BenchResult<()> {
        self.tick(OpKind::Del, key)?;
        self.store.remove(key);
        Ok(())
    }

    fn reported_storage_bytes(&mut self) -> BenchResult<Option<u64>> {
        Ok(self.reported_storage)
    }

    fn close(&mut self) -> BenchResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
