use std::net::SocketAddr;
use std::sync::Arc;

use ::common::store::{RecordOrigin, RecordOutcome, RecordStore, StoredRecord};
use ::common::testing::InMemoryRecordStore;
use mq::ReceiveOptions;
use mq::testing::InMemoryQueue;
use reqwest::Client;
use serde_json::Value;

use server::state::AppState;

pub mod routes {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/health";
    pub const INGEST: &str = "/ingest";
    pub const MESSAGES: &str = "/messages";
    pub const RECORDS: &str = "/records";
    pub const RECORD_STATS: &str = "/records/stats";
    pub const RECENT_RECORDS: &str = "/records/recent";
    pub const RECORDS_BY_SOURCE: &str = "/records/by-source";

    pub fn message(receipt_handle: &str) -> String {
        format!("/messages/{receipt_handle}")
    }

    pub fn records_by_message(message_id: &str) -> String {
        format!("/records/by-message/{message_id}")
    }
}

/// A running test server backed by in-memory doubles.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub queue: Arc<InMemoryQueue>,
    pub records: Arc<InMemoryRecordStore>,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::start(InMemoryQueue::new(), true).await
    }

    pub async fn spawn_with_queue(queue: InMemoryQueue) -> Self {
        Self::start(queue, true).await
    }

    /// Server started without a database.
    pub async fn spawn_without_records() -> Self {
        Self::start(InMemoryQueue::new(), false).await
    }

    async fn start(queue: InMemoryQueue, with_records: bool) -> Self {
        let queue = Arc::new(queue);
        let records = Arc::new(InMemoryRecordStore::new());

        let state = AppState {
            queue: queue.clone(),
            records: with_records.then(|| records.clone() as Arc<dyn RecordStore>),
            peek: ReceiveOptions::short_poll(ReceiveOptions::MAX_BATCH),
        };
        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            queue,
            records,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_raw(&self, path: &str, content_type: &str, body: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Content-Type", content_type)
            .body(body.to_string())
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_query(&self, path: &str, query: &[(&str, &str)]) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .query(query)
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Save one outcome document directly into the store.
    pub async fn save_record(
        &self,
        source_key: &str,
        message_id: &str,
        index: u64,
        ok: bool,
    ) -> StoredRecord {
        let origin = RecordOrigin::new(source_key, message_id, index);
        let original = serde_json::json!({ "n": index });
        let outcome = if ok {
            RecordOutcome::success(origin, original.clone(), original, 5)
        } else {
            RecordOutcome::failure(origin, original, "processing failed", 5)
        };
        self.records
            .save(outcome)
            .await
            .expect("Failed to save record")
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }
}
