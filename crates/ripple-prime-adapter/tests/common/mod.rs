/*
[INPUT]:  Test configuration, mock server and scripted socket requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for ripple-prime-adapter tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ripple_prime_adapter::ws::{Connection, Connector, Incoming};
use ripple_prime_adapter::{Credentials, Environment, PrimeError, Result};
use serde_json::Value;
use tokio::sync::mpsc;
use wiremock::MockServer;

pub const TEST_API_KEY: &str = "key-1";
pub const TEST_API_SECRET: &str = "secret-1";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn test_credentials() -> Credentials {
    Credentials::new(Environment::Sandbox, TEST_API_KEY, TEST_API_SECRET)
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// In-memory connector; each connect consumes one scripted socket
#[derive(Default)]
pub struct ScriptedConnector {
    sockets: Mutex<VecDeque<mpsc::UnboundedReceiver<Incoming>>>,
    sent: Arc<Mutex<Vec<Value>>>,
    connects: AtomicUsize,
    closes: Arc<AtomicUsize>,
    pings: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a socket for the next successful connect; frames pushed on the
    /// returned sender arrive in order, dropping it closes the socket
    pub fn add_socket(&self) -> mpsc::UnboundedSender<Incoming> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sockets.lock().unwrap().push_back(rx);
        tx
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }

    /// `type` field of every frame sent so far
    pub fn sent_types(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|frame| frame.get("type").and_then(Value::as_str).map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn Connection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let inbound = self
            .sockets
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PrimeError::Connectivity("connection refused".to_string()))?;
        Ok(Box::new(ScriptedConnection {
            inbound,
            sent: self.sent.clone(),
            closes: self.closes.clone(),
            pings: self.pings.clone(),
        }))
    }
}

struct ScriptedConnection {
    inbound: mpsc::UnboundedReceiver<Incoming>,
    sent: Arc<Mutex<Vec<Value>>>,
    closes: Arc<AtomicUsize>,
    pings: Arc<AtomicUsize>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send_text(&mut self, text: String) -> Result<()> {
        let frame: Value = serde_json::from_str(&text)?;
        self.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Incoming {
        self.inbound.recv().await.unwrap_or(Incoming::Closed)
    }

    async fn ping(&mut self) -> Result<()> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn text(frame: Value) -> Incoming {
    Incoming::Text(frame.to_string())
}
