#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sumoredrive::api::Credentials;
use sumoredrive::config::SearchSettings;
use sumoredrive::models::order::OrderRequest;
use sumoredrive::query::{parse_day, QueryBuilder, TimeWindow, DEFAULT_QUERY_TEMPLATE};
use sumoredrive::runner::OrderRunner;
use sumoredrive::sink::{Sink, SinkError};

pub const JOBS_PATH: &str = "/api/v1/search/jobs";

pub fn credentials(server: &MockServer) -> Credentials {
    Credentials {
        api_url: server.uri(),
        access_id: "test-id".to_string(),
        access_key: "test-key".to_string(),
    }
}

pub fn settings(page_size: u32) -> SearchSettings {
    SearchSettings {
        poll_interval: Duration::from_millis(5),
        page_size,
    }
}

pub fn runner(server: &MockServer) -> OrderRunner {
    OrderRunner::new(
        credentials(server),
        QueryBuilder::new(DEFAULT_QUERY_TEMPLATE, "UTC"),
        settings(1000),
    )
}

pub fn day_order(order_id: &str, day: &str) -> OrderRequest {
    OrderRequest {
        order_id: order_id.to_string(),
        window: TimeWindow::day(parse_day(day).unwrap(), "UTC"),
    }
}

/// Submissions whose `from` matches get `job_id`.
pub async fn mount_submit_for_from(server: &MockServer, from: &str, job_id: &str, expected: u64) {
    Mock::given(method("POST"))
        .and(path(JOBS_PATH))
        .and(body_partial_json(json!({ "from": from })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "id": job_id })))
        .expect(expected)
        .mount(server)
        .await;
}

/// Submissions whose body mentions `order_id` get `job_id`.
pub async fn mount_submit_for_order(server: &MockServer, order_id: &str, job_id: &str) {
    Mock::given(method("POST"))
        .and(path(JOBS_PATH))
        .and(body_string_contains(order_id))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "id": job_id })))
        .expect(1)
        .mount(server)
        .await;
}

pub fn status_body(state: &str, message_count: u64) -> Value {
    json!({
        "state": state,
        "messageCount": message_count,
        "recordCount": 0,
        "pendingWarnings": [],
        "pendingErrors": [],
    })
}

pub async fn mount_status(server: &MockServer, job_id: &str, state: &str, message_count: u64) {
    Mock::given(method("GET"))
        .and(path(format!("{JOBS_PATH}/{job_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(state, message_count)))
        .mount(server)
        .await;
}

pub fn messages_body(json_fields: &[&str]) -> Value {
    let messages: Vec<Value> = json_fields
        .iter()
        .map(|raw| json!({ "map": { "json": raw, "_messagetime": "1704067200000" } }))
        .collect();
    json!({ "fields": [], "messages": messages })
}

pub async fn mount_messages(server: &MockServer, job_id: &str, json_fields: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("{JOBS_PATH}/{job_id}/messages")))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(messages_body(json_fields)))
        .mount(server)
        .await;
}

pub async fn mount_delete(server: &MockServer, job_id: &str, expected: u64) {
    Mock::given(method("DELETE"))
        .and(path(format!("{JOBS_PATH}/{job_id}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(expected)
        .mount(server)
        .await;
}

/// Keeps every delivered body.
#[derive(Default)]
pub struct RecordingSink {
    pub bodies: Mutex<Vec<String>>,
}

#[async_trait]
impl Sink for RecordingSink {
    async fn deliver(&self, body: &str) -> Result<(), SinkError> {
        self.bodies.lock().unwrap().push(body.to_string());
        Ok(())
    }
}

/// Rejects every delivery with the given error.
pub struct FailingSink {
    pub queue_missing: bool,
}

#[async_trait]
impl Sink for FailingSink {
    async fn deliver(&self, _body: &str) -> Result<(), SinkError> {
        if self.queue_missing {
            Err(SinkError::QueueNotFound {
                url: "http://queue.invalid/q".to_string(),
            })
        } else {
            Err(SinkError::Other("throttled".to_string()))
        }
    }
}
