//! Shared harness for admin API integration tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use ridehub_observability::{spawn_system_logger, LogSinkConfig, ManualClock};
use ridehub_server::monitoring::ResourceSampler;
use ridehub_server::models::SystemLogRecord;
use ridehub_server::testing::{at, sample_snapshot, FixedSampler, MemoryStore};
use ridehub_server::{build_router, AppState, ServerConfig};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    /// App backed by an empty store, a quiet host and a clock pinned to
    /// 2024-03-10 12:00 UTC
    pub fn new() -> Self {
        Self::with_sampler(Arc::new(FixedSampler::new(sample_snapshot(10.0, 20.0, 30.0))))
    }

    pub fn with_sampler(sampler: Arc<dyn ResourceSampler>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(at(2024, 3, 10)));

        // Flush every entry as soon as it arrives
        let sink = LogSinkConfig {
            buffer_capacity: 1,
            ..LogSinkConfig::default()
        };
        let (logger, _flusher) = spawn_system_logger(store.clone(), &sink, clock.clone());

        let config = ServerConfig {
            cors_origins: vec!["*".to_string()],
            log_sink: sink,
            ..ServerConfig::default()
        };

        let state = AppState::new(store.clone(), sampler, logger, clock.clone(), config);
        let router = build_router(state.clone());

        Self {
            store,
            clock,
            state,
            router,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-admin-user", "alice");
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    /// Wait until the flusher has written a log entry under `service`
    /// matching `predicate`
    pub async fn wait_for_log<F>(&self, service: &str, predicate: F) -> SystemLogRecord
    where
        F: Fn(&SystemLogRecord) -> bool,
    {
        for _ in 0..200 {
            if let Some(record) = self
                .store
                .system_logs()
                .into_iter()
                .find(|r| r.service == service && predicate(r))
            {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no '{}' log entry matched", service);
    }
}
