//! In-process fake Redis server for integration tests
//!
//! Speaks RESP2 over a local TCP socket and implements just the commands the
//! client layer issues. `SCAN` walks the sorted keyspace `page_size` keys per
//! step, so a non-matching page comes back empty with a non-zero cursor, the
//! way a real server behaves.

#![allow(dead_code)]

use bytes::BytesMut;
use redview::cluster::calculate_slot;
use redview::protocol::{RespDecoder, RespEncoder};
use redview::RespValue;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const HOST: &str = "127.0.0.1";

/// A value stored in the fake keyspace
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    List(Vec<String>),
    Set(Vec<String>),
    ZSet(Vec<(String, f64)>),
    Hash(Vec<(String, String)>),
    Stream,
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::ZSet(_) => "zset",
            Self::Hash(_) => "hash",
            Self::Stream => "stream",
        }
    }
}

struct Redirect {
    prefix: String,
    port: u16,
    ask: bool,
}

struct State {
    data: BTreeMap<String, (Value, Option<i64>)>,
    page_size: usize,
    cluster: bool,
    password: Option<String>,
    stall_scans_after: Option<usize>,
    scans_served: usize,
    redirects: Vec<Redirect>,
    log: Vec<String>,
}

#[derive(Default)]
struct Session {
    authed: bool,
    asking: bool,
}

/// Handle to a running fake server; clones share the same state
#[derive(Clone)]
pub struct FakeRedis {
    port: u16,
    state: Arc<Mutex<State>>,
}

impl FakeRedis {
    pub async fn start() -> Self {
        let listener = TcpListener::bind((HOST, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State {
            data: BTreeMap::new(),
            page_size: 10,
            cluster: false,
            password: None,
            stall_scans_after: None,
            scans_served: 0,
            redirects: Vec::new(),
            log: Vec::new(),
        }));

        let shared = Arc::clone(&state);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, Arc::clone(&shared), port));
            }
        });

        Self { port, state }
    }

    /// Start a server that answers `CLUSTER SLOTS` with itself owning every slot
    pub async fn start_cluster() -> Self {
        let server = Self::start().await;
        server.state.lock().unwrap().cluster = true;
        server
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set(&self, key: &str, value: Value) -> &Self {
        self.state
            .lock()
            .unwrap()
            .data
            .insert(key.to_string(), (value, None));
        self
    }

    pub fn set_string(&self, key: &str, value: &str) -> &Self {
        self.set(key, Value::Str(value.to_string()))
    }

    pub fn expire(&self, key: &str, seconds: i64) -> &Self {
        if let Some(entry) = self.state.lock().unwrap().data.get_mut(key) {
            entry.1 = Some(seconds);
        }
        self
    }

    /// Fill the keyspace with `count` string keys named `{prefix}{i}`
    pub fn fill(&self, prefix: &str, count: usize) -> &Self {
        for i in 0..count {
            self.set_string(&format!("{prefix}{i:04}"), "v");
        }
        self
    }

    /// Number of keys examined per `SCAN` step
    pub fn page_size(&self, size: usize) -> &Self {
        self.state.lock().unwrap().page_size = size;
        self
    }

    pub fn require_password(&self, password: &str) -> &Self {
        self.state.lock().unwrap().password = Some(password.to_string());
        self
    }

    /// Answer the first `served` `SCAN` steps, then never reply again
    pub fn stall_scans_after(&self, served: usize) -> &Self {
        self.state.lock().unwrap().stall_scans_after = Some(served);
        self
    }

    /// Redirect keyed commands whose key starts with `prefix` to `port`
    pub fn redirect(&self, prefix: &str, port: u16, ask: bool) -> &Self {
        self.state.lock().unwrap().redirects.push(Redirect {
            prefix: prefix.to_string(),
            port,
            ask,
        });
        self
    }

    /// Every command received, rendered as space-separated tokens
    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    /// How many commands named `name` were received
    pub fn count(&self, name: &str) -> usize {
        self.log()
            .iter()
            .filter(|line| line.split(' ').next() == Some(name))
            .count()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().unwrap().data.keys().cloned().collect()
    }
}

async fn serve(mut socket: TcpStream, state: Arc<Mutex<State>>, port: u16) {
    let mut buf = BytesMut::with_capacity(4096);
    let mut session = Session::default();

    loop {
        let request = loop {
            let mut cursor = Cursor::new(&buf[..]);
            match RespDecoder::decode(&mut cursor) {
                Ok(Some(value)) => {
                    let consumed = cursor.position() as usize;
                    let _ = buf.split_to(consumed);
                    break value;
                }
                Ok(None) => {}
                Err(_) => return,
            }
            match socket.read_buf(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        };

        let tokens: Vec<String> = match request.into_array() {
            Ok(items) => items
                .iter()
                .map(|item| item.as_string().unwrap_or_default())
                .collect(),
            Err(_) => return,
        };

        let reply = state.lock().unwrap().handle(&tokens, &mut session, port);
        let Some(reply) = reply else {
            // Stalled: keep the socket open without answering
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return;
        };

        let mut out = BytesMut::new();
        if RespEncoder::encode(&reply, &mut out).is_err() {
            return;
        }
        if socket.write_all(&out).await.is_err() {
            return;
        }
    }
}

fn ok() -> RespValue {
    RespValue::SimpleString("OK".to_string())
}

fn err(msg: impl Into<String>) -> RespValue {
    RespValue::Error(msg.into())
}

fn bulk_array<'a>(items: impl IntoIterator<Item = &'a String>) -> RespValue {
    RespValue::Array(items.into_iter().map(|s| RespValue::from(s.as_str())).collect())
}

fn wrong_type() -> RespValue {
    err("WRONGTYPE Operation against a key holding the wrong kind of value")
}

fn range_bounds(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match(&pattern[1..], text) || (!text.is_empty() && glob_match(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match(&pattern[1..], &text[1..]),
        _ => false,
    }
}

/// Key position of the commands the fake understands
fn command_key<'a>(name: &str, tokens: &'a [String]) -> Option<&'a str> {
    match name {
        "GET" | "SET" | "TYPE" | "TTL" | "LRANGE" | "SMEMBERS" | "ZRANGE" | "HKEYS" | "HGET" => {
            tokens.get(1).map(String::as_str)
        }
        _ => None,
    }
}

impl State {
    fn handle(&mut self, tokens: &[String], session: &mut Session, port: u16) -> Option<RespValue> {
        self.log.push(tokens.join(" "));
        let name = tokens
            .first()
            .map(|s| s.to_ascii_uppercase())
            .unwrap_or_default();
        let arg = |i: usize| tokens.get(i).map(String::as_str).unwrap_or("");

        if let Some(password) = &self.password {
            if name == "AUTH" {
                if arg(1) == password {
                    session.authed = true;
                    return Some(ok());
                }
                return Some(err(
                    "WRONGPASS invalid username-password pair or user is disabled.",
                ));
            }
            if !session.authed {
                return Some(err("NOAUTH Authentication required."));
            }
        }

        let asking = std::mem::take(&mut session.asking);
        if let Some(key) = command_key(&name, tokens) {
            if let Some(r) = self.redirects.iter().find(|r| key.starts_with(&r.prefix)) {
                if !asking {
                    let kind = if r.ask { "ASK" } else { "MOVED" };
                    let slot = calculate_slot(key.as_bytes());
                    return Some(err(format!("{kind} {slot} {HOST}:{}", r.port)));
                }
            }
        }

        let reply = match name.as_str() {
            "PING" => RespValue::SimpleString("PONG".to_string()),
            "AUTH" => err("ERR AUTH <password> called without any password configured"),
            "SELECT" => match arg(1).parse::<u8>() {
                Ok(_) if !self.cluster => ok(),
                Ok(_) => err("ERR SELECT is not allowed in cluster mode"),
                Err(_) => err("ERR value is not an integer or out of range"),
            },
            "ASKING" => {
                session.asking = true;
                ok()
            }
            "CLUSTER" if arg(1).eq_ignore_ascii_case("SLOTS") => {
                if !self.cluster {
                    return Some(err("ERR This instance has cluster support disabled"));
                }
                RespValue::Array(vec![RespValue::Array(vec![
                    RespValue::Integer(0),
                    RespValue::Integer(16383),
                    RespValue::Array(vec![
                        RespValue::from(HOST),
                        RespValue::Integer(i64::from(port)),
                        RespValue::from("fake-node-id"),
                    ]),
                ])])
            }
            "INFO" => {
                let mode = if self.cluster { "cluster" } else { "standalone" };
                RespValue::from(format!(
                    "# Server\r\nredis_version:7.2.0\r\nredis_mode:{mode}\r\n"
                ))
            }
            "SCAN" => {
                if let Some(limit) = self.stall_scans_after {
                    if self.scans_served >= limit {
                        return None;
                    }
                }
                self.scans_served += 1;
                return Some(self.scan(tokens));
            }
            "KEYS" => bulk_array(
                self.data
                    .keys()
                    .filter(|k| glob_match(arg(1).as_bytes(), k.as_bytes())),
            ),
            "TYPE" => RespValue::SimpleString(
                self.data
                    .get(arg(1))
                    .map_or("none", |(v, _)| v.type_name())
                    .to_string(),
            ),
            "TTL" => RespValue::Integer(match self.data.get(arg(1)) {
                None => -2,
                Some((_, None)) => -1,
                Some((_, Some(ttl))) => *ttl,
            }),
            "SET" => {
                self.data
                    .insert(arg(1).to_string(), (Value::Str(arg(2).to_string()), None));
                ok()
            }
            "GET" => match self.data.get(arg(1)) {
                None => RespValue::Null,
                Some((Value::Str(s), _)) => RespValue::from(s.as_str()),
                Some(_) => wrong_type(),
            },
            "LRANGE" => match self.data.get(arg(1)) {
                None => RespValue::Array(Vec::new()),
                Some((Value::List(items), _)) => {
                    let start = arg(2).parse().unwrap_or(0);
                    let stop = arg(3).parse().unwrap_or(-1);
                    match range_bounds(items.len(), start, stop) {
                        Some((from, to)) => bulk_array(&items[from..=to]),
                        None => RespValue::Array(Vec::new()),
                    }
                }
                Some(_) => wrong_type(),
            },
            "SMEMBERS" => match self.data.get(arg(1)) {
                None => RespValue::Array(Vec::new()),
                Some((Value::Set(items), _)) => bulk_array(items),
                Some(_) => wrong_type(),
            },
            "ZRANGE" => match self.data.get(arg(1)) {
                None => RespValue::Array(Vec::new()),
                Some((Value::ZSet(items), _)) => {
                    let with_scores = arg(4).eq_ignore_ascii_case("WITHSCORES");
                    let mut out = Vec::new();
                    for (member, score) in items {
                        out.push(RespValue::from(member.as_str()));
                        if with_scores {
                            out.push(RespValue::from(score.to_string()));
                        }
                    }
                    RespValue::Array(out)
                }
                Some(_) => wrong_type(),
            },
            "HKEYS" => match self.data.get(arg(1)) {
                None => RespValue::Array(Vec::new()),
                Some((Value::Hash(fields), _)) => {
                    RespValue::Array(fields.iter().map(|(f, _)| RespValue::from(f.as_str())).collect())
                }
                Some(_) => wrong_type(),
            },
            "HGET" => match self.data.get(arg(1)) {
                None => RespValue::Null,
                Some((Value::Hash(fields), _)) => fields
                    .iter()
                    .find(|(f, _)| f == arg(2))
                    .map_or(RespValue::Null, |(_, v)| RespValue::from(v.as_str())),
                Some(_) => wrong_type(),
            },
            other => err(format!("ERR unknown command '{other}'")),
        };
        Some(reply)
    }

    fn scan(&self, tokens: &[String]) -> RespValue {
        let Ok(cursor) = tokens.get(1).map_or("", String::as_str).parse::<usize>() else {
            return err("ERR invalid cursor");
        };
        let mut pattern = "*";
        let mut i = 2;
        while i + 1 < tokens.len() {
            if tokens[i].eq_ignore_ascii_case("MATCH") {
                pattern = &tokens[i + 1];
            }
            i += 2;
        }

        let keys: Vec<&String> = self.data.keys().collect();
        let start = cursor.min(keys.len());
        let end = (start + self.page_size).min(keys.len());
        let next = if end >= keys.len() { 0 } else { end };

        let page = keys[start..end]
            .iter()
            .filter(|k| glob_match(pattern.as_bytes(), k.as_bytes()))
            .map(|k| RespValue::from(k.as_str()))
            .collect();

        RespValue::Array(vec![
            RespValue::from(next.to_string()),
            RespValue::Array(page),
        ])
    }
}
