//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use storegate::config::ConnectionConfig;
use storegate::store::{ConnectError, ConnectParams, Connector, QueryError, ReleaseError, Row, Transport};

/// Counters shared between a connector and the transports it hands out.
#[derive(Debug, Default)]
pub struct Counters {
    pub connects: AtomicU32,
    pub queries: AtomicU32,
    pub closes: AtomicU32,
}

impl Counters {
    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> u32 {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Connector that refuses the first `failures` attempts, then hands out
/// in-memory transports.
pub struct ScriptedConnector {
    pub failures: u32,
    pub hang: bool,
    pub broken_close: bool,
    pub counters: Arc<Counters>,
}

impl ScriptedConnector {
    pub fn healthy() -> Self {
        Self::failing(0)
    }

    pub fn failing(failures: u32) -> Self {
        Self {
            failures,
            hang: false,
            broken_close: false,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Every attempt hangs until the connect timeout fires.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::failing(0)
        }
    }

    pub fn with_broken_close(mut self) -> Self {
        self.broken_close = true;
        self
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _params: &ConnectParams) -> Result<Box<dyn Transport>, ConnectError> {
        let call = self.counters.connects.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        if call < self.failures {
            return Err(ConnectError::Transport("connection refused".into()));
        }
        Ok(Box::new(MemoryTransport {
            counters: Arc::clone(&self.counters),
            broken_close: self.broken_close,
        }))
    }
}

pub struct MemoryTransport {
    counters: Arc<Counters>,
    broken_close: bool,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn query(&mut self, statement: &str, params: &[Value]) -> Result<Vec<Row>, QueryError> {
        self.counters.queries.fetch_add(1, Ordering::SeqCst);
        if statement.starts_with("FAIL") {
            return Err(QueryError::Database(format!("rejected: {}", statement)));
        }
        let mut row = Row::new();
        row.insert("statement".into(), Value::from(statement));
        row.insert("params".into(), Value::from(params.to_vec()));
        Ok(vec![row])
    }

    async fn close(&mut self) -> Result<(), ReleaseError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        if self.broken_close {
            Err(ReleaseError::Transport("broken pipe".into()))
        } else {
            Ok(())
        }
    }
}

pub fn complete_config() -> ConnectionConfig {
    ConnectionConfig {
        user: Some("admin".into()),
        password: Some("secret".into()),
        host: Some("localhost".into()),
        database: Some("shop".into()),
        ..Default::default()
    }
}

/// In-memory log sink for a scoped `fmt` subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Run `f` with a plain-text subscriber writing into this sink.
    pub fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    pub fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).lines().map(str::to_owned).collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lines().into_iter().filter(|line| line.contains(" WARN ")).collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
