//! Scripted transport for tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Barrier, Notify};
use trackme_fetch::{RawResponse, Transport, TransportError};

/// One scripted answer.
pub enum Reply {
    /// Answer with a status and body.
    Status(u16, Vec<u8>),
    /// Fail without a response.
    NetworkDown,
    /// Never answer.
    Hang,
    /// Wait at the barrier, then answer.
    AfterBarrier(Arc<Barrier>, Box<Reply>),
    /// Wait for a notification, then answer.
    AfterNotify(Arc<Notify>, Box<Reply>),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Status(200, b"{}".to_vec())
    }

    pub fn status(code: u16) -> Self {
        Reply::Status(code, Vec::new())
    }

    pub fn tokens(access: &str, refresh: &str) -> Self {
        let body = serde_json::json!({ "access_token": access, "refresh_token": refresh });
        Reply::Status(200, body.to_string().into_bytes())
    }
}

#[derive(Default)]
pub struct MockTransport {
    script: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues `reply` for the next unanswered call to `path`.
    pub fn on(&self, path: &str, reply: Reply) -> &Self {
        self.script
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Number of calls made to `path`.
    pub fn count(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(p, _)| p == path).count()
    }

    /// Total number of calls.
    pub fn total(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Bodies sent to `path`, in call order.
    pub fn bodies(&self, path: &str) -> Vec<serde_json::Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

async fn resolve(reply: Reply) -> Result<RawResponse, TransportError> {
    let mut reply = reply;
    loop {
        reply = match reply {
            Reply::Status(status, body) => return Ok(RawResponse::new(status, body)),
            Reply::NetworkDown => return Err(TransportError::Timeout(Duration::from_secs(30))),
            Reply::Hang => std::future::pending().await,
            Reply::AfterBarrier(barrier, next) => {
                barrier.wait().await;
                *next
            }
            Reply::AfterNotify(notify, next) => {
                notify.notified().await;
                *next
            }
        };
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, path: &str, body: Vec<u8>) -> Result<RawResponse, TransportError> {
        let parsed = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        self.calls.lock().unwrap().push((path.to_string(), parsed));
        let reply = self
            .script
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| panic!("unscripted call to {path}"));
        resolve(reply).await
    }
}
