//! KVRocks adapter (via the `redis` crate, RESP over TCP).
//!
//! One synchronous connection, reused for every operation. Replies are
//! decoded to native `String` values. An I/O error or timeout drops the
//! connection, as in the SSDB adapter.

use crate::config::Endpoint;
use crate::{BackendKind, BenchResult, KvBackend};
use redis::{Client, Commands, Connection, InfoDict};
use std::time::Duration;

pub struct KvrocksAdapter {
    conn: Option<Connection>,
}

impl KvrocksAdapter {
    /// Open a connection and verify it with a write + delete probe.
    pub fn connect(endpoint: &Endpoint, timeout: Option<Duration>) -> BenchResult<Self> {
        let client = Client::open(redis_url(endpoint))?;
        let conn = match timeout {
            Some(t) => client.get_connection_with_timeout(t)?,
            None => client.get_connection()?,
        };
        conn.set_read_timeout(timeout)?;
        conn.set_write_timeout(timeout)?;

        let mut db = Self { conn: Some(conn) };
        db.probe()?;
        Ok(db)
    }

    fn conn(&mut self) -> BenchResult<&mut Connection> {
        self.conn.as_mut().ok_or_else(|| {
            redis::RedisError::from((redis::ErrorKind::IoError, "connection closed")).into()
        })
    }

    fn check<T>(&mut self, result: redis::RedisResult<T>) -> BenchResult<T> {
        match result {
            Err(e) if e.is_io_error() || e.is_timeout() => {
                tracing::debug!(error = %e, "dropping KVRocks connection");
                self.conn = None;
                Err(e.into())
            }
            other => Ok(other?),
        }
    }
}

impl KvBackend for KvrocksAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Kvrocks
    }

    fn set(&mut self, key: &str, value: &str) -> BenchResult<()> {
        let result = self.conn()?.set::<_, _, ()>(key, value);
        self.check(result)
    }

    fn get(&mut self, key: &str) -> BenchResult<Option<String>> {
        let result = self.conn()?.get(key);
        self.check(result)
    }

    fn delete(&mut self, key: &str) -> BenchResult<()> {
        let result = self.conn()?.del::<_, ()>(key);
        self.check(result)
    }

    /// `used_memory` from `INFO memory`.
    fn reported_storage_bytes(&mut self) -> BenchResult<Option<u64>> {
        let result = redis::cmd("INFO").arg("memory").query::<InfoDict>(self.conn()?);
        Ok(self.check(result)?.get("used_memory"))
    }

    fn close(&mut self) -> BenchResult<()> {
        self.conn.take();
        Ok(())
    }
}

/// `redis://host:port/`; IPv6 literals are bracketed.
pub fn redis_url(endpoint: &Endpoint) -> String {
    if endpoint.host.contains(':') && !endpoint.host.starts_with('[') {
        format!("redis://[{}]:{}/", endpoint.host, endpoint.port)
    } else {
        format!("redis://{}:{}/", endpoint.host, endpoint.port)
    }
}
