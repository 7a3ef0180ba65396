use async_trait::async_trait;
use common::Endpoint;
use jobdeck_sync::config::PollingConfig;
use jobdeck_sync::{QueryCache, Result, SyncError, Transport};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

pub enum Reply {
    Json(Value),
    Status(u16),
    /// Answers with the value once the paired sender fires (or is dropped).
    Held(Value, oneshot::Receiver<()>),
}

/// In-memory scheduler gateway keyed by `"GET /jobs?limit=20&offset=0"`-style
/// routes. Scripted replies are consumed first, then the sticky value, then 404.
#[derive(Default)]
pub struct FakeApi {
    scripted: Mutex<HashMap<String, VecDeque<Reply>>>,
    sticky: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<String>>,
    bodies: Mutex<Vec<(String, Value)>>,
}

#[allow(dead_code)]
impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, route: &str, value: Value) {
        self.sticky.lock().unwrap().insert(route.to_string(), value);
    }

    pub fn push(&self, route: &str, reply: Reply) {
        self.scripted
            .lock()
            .unwrap()
            .entry(route.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn hold(&self, route: &str, value: Value) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(route, Reply::Held(value, rx));
        tx
    }

    pub fn calls(&self, route: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == route).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn bodies(&self, route: &str) -> Vec<Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == route)
            .map(|(_, b)| b.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for FakeApi {
    async fn send(&self, endpoint: &Endpoint, body: Option<&Value>) -> Result<Value> {
        let route = endpoint.to_string();
        self.calls.lock().unwrap().push(route.clone());
        if let Some(body) = body {
            self.bodies.lock().unwrap().push((route.clone(), body.clone()));
        }

        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(&route)
            .and_then(VecDeque::pop_front);
        let reply = match scripted {
            Some(reply) => reply,
            None => match self.sticky.lock().unwrap().get(&route) {
                Some(v) => Reply::Json(v.clone()),
                None => Reply::Status(404),
            },
        };

        match reply {
            Reply::Json(v) => Ok(v),
            Reply::Status(status) => Err(SyncError::Status {
                endpoint: route,
                status,
            }),
            Reply::Held(v, rx) => {
                let _ = rx.await;
                Ok(v)
            }
        }
    }
}

#[allow(dead_code)]
pub const STATS: &str = "GET /stats";

#[allow(dead_code)]
pub fn jobs_route(page: u64) -> String {
    format!("GET /jobs?limit=20&offset={}", (page - 1) * 20)
}

#[allow(dead_code)]
pub fn dead_route(page: u64) -> String {
    format!("GET /jobs/dead?limit=20&offset={}", (page - 1) * 20)
}

#[allow(dead_code)]
pub fn job_json(id: &str, status: &str) -> Value {
    json!({
        "jobId": id,
        "type": "notification:email",
        "status": status,
        "createdAt": "2025-03-01T10:00:00Z",
        "retryCount": "0",
        "payload": "{}",
    })
}

/// A list response in the snake_case convention.
#[allow(dead_code)]
pub fn page_json(ids: &[&str], status: &str, current_page: u64, total_pages: u64) -> Value {
    let jobs: Vec<Value> = ids.iter().map(|id| job_json(id, status)).collect();
    json!({
        "jobs": jobs,
        "meta": {
            "current_page": current_page,
            "total_pages": total_pages,
            "total_records": (total_pages * 20).to_string(),
        }
    })
}

#[allow(dead_code)]
pub fn cache(api: &Arc<FakeApi>) -> Arc<QueryCache> {
    let transport: Arc<dyn Transport> = api.clone();
    Arc::new(QueryCache::new(transport, &PollingConfig::default()))
}

/// Yields to spawned tasks until `cond` holds.
#[allow(dead_code)]
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
