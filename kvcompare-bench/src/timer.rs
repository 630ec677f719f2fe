//! Times a single adapter call and classifies it as a sample or a failure.

use crate::{KvBackend, OpKind, TestRecord};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Failed operations for one backend, across all operation kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCounter(u64);

impl ErrorCounter {
    pub const fn new() -> Self {
        Self(0)
    }

    pub fn increment(&mut self) {
        self.0 += 1;
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Issue `op` for `record` against `backend` and return the wall-clock
/// latency in milliseconds.
///
/// A failing call bumps `errors`, logs the operation and cause, and yields
/// `None` so the caller leaves it out of the sample set instead of recording
/// a zero.
pub fn measure(
    backend: &mut dyn KvBackend,
    op: OpKind,
    record: &TestRecord,
    errors: &mut ErrorCounter,
) -> Option<f64> {
    let start = Instant::now();
    let result = match op {
        OpKind::Set => backend.set(&record.key, &record.value),
        OpKind::Get => backend.get(&record.key).map(|_| ()),
        OpKind::Del => backend.delete(&record.key),
    };
    let elapsed = start.elapsed();

    match result {
        Ok(()) => Some(elapsed.as_secs_f64() * 1_000.0),
        Err(e) => {
            errors.increment();
            tracing::warn!(
                backend = backend.name(),
                op = op.as_str(),
                key = %record.key,
                "{} {} error: {}",
                backend.name(),
                op.as_str(),
                e
            );
            None
        }
    }
}
