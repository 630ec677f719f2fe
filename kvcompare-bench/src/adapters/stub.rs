//! In-process SSDB and RESP servers for adapter and end-to-end tests.

use crate::config::Endpoint;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub(crate) type CommandLog = Arc<Mutex<Vec<Vec<String>>>>;

/// A localhost port with nothing listening on it.
pub(crate) fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// ────────────────────────────────────────────────────────────────────────────────
// SSDB
// ────────────────────────────────────────────────────────────────────────────────

/// Behaviour knobs for [`spawn_ssdb`].
#[derive(Default, Clone)]
pub(crate) struct SsdbStub {
    /// `set` of this key answers `error`.
    pub fail_key: Option<&'static str>,
    /// `get` of this key answers only after the delay.
    pub slow_key: Option<(&'static str, Duration)>,
}

fn read_ssdb_request(reader: &mut BufReader<TcpStream>) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        let line = line.trim_end();
        if line.is_empty() {
            return Some(parts);
        }
        let len: usize = line.parse().ok()?;
        let mut buf = vec![0u8; len + 1];
        reader.read_exact(&mut buf).ok()?;
        buf.pop();
        parts.push(String::from_utf8(buf).ok()?);
    }
}

fn ssdb_reply(out: &mut TcpStream, blocks: &[&str]) {
    let mut msg = String::new();
    for b in blocks {
        msg.push_str(&format!("{}\n{}\n", b.len(), b));
    }
    msg.push('\n');
    let _ = out.write_all(msg.as_bytes());
}

/// Single-connection SSDB stand-in with an in-memory store.
pub(crate) fn spawn_ssdb(stub: SsdbStub) -> (Endpoint, CommandLog) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let log: CommandLog = Arc::default();
    let seen = Arc::clone(&log);

    thread::spawn(move || {
        let Ok((mut out, _)) = listener.accept() else {
            return;
        };
        let mut reader = BufReader::new(out.try_clone().unwrap());
        let mut store: HashMap<String, String> = HashMap::new();

        while let Some(req) = read_ssdb_request(&mut reader) {
            seen.lock().unwrap().push(req.clone());
            match req.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
                ["set", k, _] if Some(*k) == stub.fail_key => {
                    ssdb_reply(&mut out, &["error", "write rejected"])
                }
                ["set", k, v] => {
                    store.insert(k.to_string(), v.to_string());
                    ssdb_reply(&mut out, &["ok", "1"]);
                }
                ["get", k] => {
                    if let Some((slow, delay)) = stub.slow_key {
                        if *k == slow {
                            thread::sleep(delay);
                        }
                    }
                    match store.get(*k) {
                        Some(v) => ssdb_reply(&mut out, &["ok", v.as_str()]),
                        None => ssdb_reply(&mut out, &["not_found"]),
                    }
                }
                ["del", k] => {
                    store.remove(*k);
                    ssdb_reply(&mut out, &["ok", "1"]);
                }
                _ => ssdb_reply(&mut out, &["client_error", "unknown command"]),
            }
        }
    });

    (Endpoint::new("127.0.0.1", port), log)
}

/// Accepts one connection, reads one request and answers with `raw` bytes.
pub(crate) fn spawn_raw(raw: &'static [u8]) -> Endpoint {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        let Ok((mut out, _)) = listener.accept() else {
            return;
        };
        let mut reader = BufReader::new(out.try_clone().unwrap());
        if read_ssdb_request(&mut reader).is_some() {
            let _ = out.write_all(raw);
        }
        let mut sink = Vec::new();
        let _ = reader.read_to_end(&mut sink);
    });

    Endpoint::new("127.0.0.1", port)
}

// ────────────────────────────────────────────────────────────────────────────────
// RESP (KVRocks)
// ────────────────────────────────────────────────────────────────────────────────

fn read_resp_command(reader: &mut BufReader<TcpStream>) -> Option<Vec<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line).ok()? == 0 {
        return None;
    }
    let n: usize = line.trim_end().strip_prefix('*')?.parse().ok()?;
    let mut parts = Vec::with_capacity(n);
    for _ in 0..n {
        let mut header = String::new();
        reader.read_line(&mut header).ok()?;
        let len: usize = header.trim_end().strip_prefix('$')?.parse().ok()?;
        let mut buf = vec![0u8; len + 2];
        reader.read_exact(&mut buf).ok()?;
        buf.truncate(len);
        parts.push(String::from_utf8(buf).ok()?);
    }
    Some(parts)
}

fn bulk(s: &str) -> String {
    format!("${}\r\n{}\r\n", s.len(), s)
}

/// Single-connection RESP2 stand-in. `INFO` reports `used_memory` when set.
pub(crate) fn spawn_resp(used_memory: Option<u64>) -> (Endpoint, CommandLog) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let log: CommandLog = Arc::default();
    let seen = Arc::clone(&log);

    thread::spawn(move || {
        let Ok((mut out, _)) = listener.accept() else {
            return;
        };
        let mut reader = BufReader::new(out.try_clone().unwrap());
        let mut store: HashMap<String, String> = HashMap::new();

        while let Some(cmd) = read_resp_command(&mut reader) {
            seen.lock().unwrap().push(cmd.clone());
            let name = cmd.first().map(|c| c.to_ascii_uppercase()).unwrap_or_default();
            let args = cmd.get(1..).unwrap_or(&[]);
            let reply = match (name.as_str(), args) {
                ("SET", [k, v]) => {
                    store.insert(k.clone(), v.clone());
                    "+OK\r\n".to_string()
                }
                ("GET", [k]) => match store.get(k) {
                    Some(v) => bulk(v),
                    None => "$-1\r\n".to_string(),
                },
                ("DEL", [k]) => format!(":{}\r\n", i64::from(store.remove(k).is_some())),
                ("INFO", _) => match used_memory {
                    Some(bytes) => bulk(&format!("# Memory\r\nused_memory:{bytes}\r\n")),
                    None => bulk("# Memory\r\n"),
                },
                ("CLIENT", _) => "+OK\r\n".to_string(),
                _ => "-ERR unknown command\r\n".to_string(),
            };
            if out.write_all(reply.as_bytes()).is_err() {
                return;
            }
        }
    });

    (Endpoint::new("127.0.0.1", port), log)
}
