//! Backend adapter modules.

pub mod kvrocks_adapter;
pub mod ssdb_adapter;

#[cfg(test)]
pub(crate) mod mock;
#[cfg(test)]
pub(crate) mod stub;

use crate::config::Endpoint;
use crate::{BackendKind, BenchResult, KvBackend};
use std::time::Duration;

use kvrocks_adapter::KvrocksAdapter;
use ssdb_adapter::SsdbAdapter;

/// Open and probe one backend.
pub fn open_backend(
    kind: BackendKind,
    endpoint: &Endpoint,
    timeout: Option<Duration>,
) -> BenchResult<Box<dyn KvBackend>> {
    let db: Box<dyn KvBackend> = match kind {
        BackendKind::Ssdb => Box::new(SsdbAdapter::connect(endpoint, timeout)?),
        BackendKind::Kvrocks => Box::new(KvrocksAdapter::connect(endpoint, timeout)?),
    };
    Ok(db)
}

/// Connect to `kind` at `endpoint`, reporting the outcome on the console.
///
/// Never fails: an unreachable or unserviceable backend yields `None` and the
/// run carries on without it.
pub fn connect_backend(
    kind: BackendKind,
    endpoint: &Endpoint,
    timeout: Option<Duration>,
) -> Option<Box<dyn KvBackend>> {
    match open_backend(kind, endpoint, timeout) {
        Ok(db) => {
            println!("✓ Connected to {} at {}", kind, endpoint);
            tracing::debug!(backend = kind.display_name(), %endpoint, "probe succeeded");
            Some(db)
        }
        Err(e) => {
            println!("✗ Failed to connect to {}: {}", kind, e);
            tracing::debug!(backend = kind.display_name(), %endpoint, error = %e, "connect failed");
            None
        }
    }
}
