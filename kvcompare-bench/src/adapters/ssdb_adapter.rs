//! SSDB adapter over a raw TCP connection.
//!
//! Wire format: every request and response is a sequence of blocks
//! `<len>\n<bytes>\n`, terminated by an empty line. The first response block
//! is the status (`ok`, `not_found`, `error`, `fail`, `client_error`).
//!
//! Any I/O or framing failure leaves the stream at an unknown offset (a late
//! reply may still arrive), so the connection is dropped and every later call
//! fails immediately instead of reading another request's answer.

use crate::config::Endpoint;
use crate::{BackendKind, BenchError, BenchResult, KvBackend};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Largest block accepted from the server.
pub const MAX_BLOCK_LEN: usize = 64 * 1024 * 1024;

enum Reply {
    Ok(Vec<Vec<u8>>),
    NotFound,
}

struct Conn {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Conn {
    fn send(&mut self, args: &[&[u8]]) -> io::Result<()> {
        for arg in args {
            writeln!(self.writer, "{}", arg.len())?;
            self.writer.write_all(arg)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    /// Read one block, or `None` on the terminating empty line.
    fn read_block(&mut self) -> BenchResult<Option<Vec<u8>>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(BenchError::Protocol("connection closed by server".into()));
        }
        let size = line.trim_end_matches(['\r', '\n']);
        if size.is_empty() {
            return Ok(None);
        }
        let len: usize = size
            .parse()
            .map_err(|_| BenchError::Protocol(format!("bad block length: {:?}", size)))?;
        if len > MAX_BLOCK_LEN {
            return Err(BenchError::Protocol(format!(
                "block of {} bytes too large (limit {})",
                len, MAX_BLOCK_LEN
            )));
        }

        let mut data = vec![0u8; len];
        self.reader.read_exact(&mut data)?;

        let mut end = [0u8; 1];
        self.reader.read_exact(&mut end)?;
        if end[0] == b'\r' {
            self.reader.read_exact(&mut end)?;
        }
        if end[0] != b'\n' {
            return Err(BenchError::Protocol("block not newline-terminated".into()));
        }
        Ok(Some(data))
    }

    /// One full request/response exchange; returns the raw reply blocks.
    fn exchange(&mut self, args: &[&[u8]]) -> BenchResult<Vec<Vec<u8>>> {
        self.send(args)?;
        let mut blocks = Vec::new();
        while let Some(block) = self.read_block()? {
            blocks.push(block);
        }
        if blocks.is_empty() {
            return Err(BenchError::Protocol("empty response".into()));
        }
        Ok(blocks)
    }
}

pub struct SsdbAdapter {
    /// `None` once closed or after a failed exchange.
    conn: Option<Conn>,
}

impl SsdbAdapter {
    /// Open a connection and verify it with a write + delete probe.
    pub fn connect(endpoint: &Endpoint, timeout: Option<Duration>) -> BenchResult<Self> {
        let stream = open_stream(endpoint, timeout)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;

        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);
        let mut db = Self {
            conn: Some(Conn { reader, writer }),
        };
        db.probe()?;
        Ok(db)
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn call(&mut self, args: &[&[u8]]) -> BenchResult<Reply> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| BenchError::Protocol("connection poisoned".into()))?;

        let mut blocks = match conn.exchange(args) {
            Ok(blocks) => blocks,
            Err(e) => {
                tracing::debug!(error = %e, "dropping SSDB connection");
                self.conn = None;
                return Err(e);
            }
        };

        let status = String::from_utf8_lossy(&blocks[0]).into_owned();
        match status.as_str() {
            "ok" => Ok(Reply::Ok(blocks.split_off(1))),
            "not_found" => Ok(Reply::NotFound),
            _ => {
                let detail = blocks
                    .get(1)
                    .map(|b| String::from_utf8_lossy(b).into_owned())
                    .unwrap_or_default();
                Err(BenchError::Protocol(
                    format!("SSDB error: {} {}", status, detail).trim_end().to_string(),
                ))
            }
        }
    }

    /// Run a command whose only acceptable outcome is `ok`.
    fn call_ok(&mut self, args: &[&[u8]]) -> BenchResult<()> {
        match self.call(args)? {
            Reply::Ok(_) => Ok(()),
            Reply::NotFound => Err(BenchError::Protocol(format!(
                "SSDB {}: not_found",
                String::from_utf8_lossy(args[0])
            ))),
        }
    }
}

impl KvBackend for SsdbAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Ssdb
    }

    fn set(&mut self, key: &str, value: &str) -> BenchResult<()> {
        self.call_ok(&[b"set", key.as_bytes(), value.as_bytes()])
    }

    fn get(&mut self, key: &str) -> BenchResult<Option<String>> {
        match self.call(&[b"get", key.as_bytes()])? {
            Reply::NotFound => Ok(None),
            Reply::Ok(mut blocks) => {
                if blocks.is_empty() {
                    return Err(BenchError::Protocol("get reply without value".into()));
                }
                let value = String::from_utf8(blocks.swap_remove(0))
                    .map_err(|e| BenchError::Protocol(format!("value is not UTF-8: {}", e)))?;
                Ok(Some(value))
            }
        }
    }

    fn delete(&mut self, key: &str) -> BenchResult<()> {
        self.call_ok(&[b"del", key.as_bytes()])
    }

    fn close(&mut self) -> BenchResult<()> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        let _ = conn.writer.flush();
        match conn.writer.get_ref().shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn open_stream(endpoint: &Endpoint, timeout: Option<Duration>) -> io::Result<TcpStream> {
    let Some(timeout) = timeout else {
        return TcpStream::connect(endpoint.addr());
    };

    let mut last_err = None;
    for addr in endpoint.addr().to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{} did not resolve", endpoint),
        )
    }))
}
