use mq::testing::InMemoryQueue;
use serde_json::{Value, json};

use crate::common::{TestApp, routes};

mod health {
    use super::*;

    #[tokio::test]
    async fn root_answers_with_liveness_string() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::ROOT).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.text, "FC Ingestion Service is running!");
    }

    #[tokio::test]
    async fn health_reports_queue_url() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::HEALTH).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "healthy");
        assert_eq!(res.body["queue_url"], InMemoryQueue::DEFAULT_URL);
        assert!(res.body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn openapi_document_lists_admin_routes() {
        let app = TestApp::spawn().await;

        let res = app.get("/api-docs/openapi.json").await;

        assert_eq!(res.status, 200);
        let paths = res.body["paths"].as_object().unwrap();
        for path in ["/ingest", "/messages", "/messages/{receipt_handle}", "/records/stats"] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}

mod ingest {
    use super::*;

    #[tokio::test]
    async fn wraps_body_in_envelope_and_enqueues() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(routes::INGEST, &json!({"hello": "world"}))
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["success"], true);
        assert!(!res.body["message_id"].as_str().unwrap().is_empty());
        assert!(res.body["timestamp"].is_string());

        let sent = app.queue.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_id, res.body["message_id"].as_str().unwrap());

        let envelope: Value = serde_json::from_str(&sent[0].body).unwrap();
        assert_eq!(envelope["data"], json!({"hello": "world"}));
        assert_eq!(envelope["source"], "admin-api");
        assert!(envelope["id"].is_string());
        assert!(envelope["timestamp"].is_string());
        assert!(envelope.get("type").is_none());
    }

    #[tokio::test]
    async fn fifo_queue_gets_admin_message_group() {
        let app = TestApp::spawn().await;

        app.post_json(routes::INGEST, &json!([1, 2, 3])).await;

        assert_eq!(app.queue.sent()[0].group_id(), Some("admin-ingest"));
    }

    #[tokio::test]
    async fn standard_queue_gets_no_message_group() {
        let app = TestApp::spawn_with_queue(InMemoryQueue::with_url(
            "http://localhost:4566/000000000000/ingest",
        ))
        .await;

        let res = app.post_json(routes::INGEST, &json!({"a": 1})).await;

        assert_eq!(res.status, 201);
        assert_eq!(app.queue.sent()[0].group_id(), None);
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let app = TestApp::spawn().await;

        let res = app
            .post_raw(routes::INGEST, "application/json", "{not json")
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
        assert!(app.queue.sent().is_empty());
    }

    #[tokio::test]
    async fn rejects_missing_content_type() {
        let app = TestApp::spawn().await;

        let res = app.post_raw(routes::INGEST, "text/plain", "{}").await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }
}

mod messages {
    use super::*;

    #[tokio::test]
    async fn peek_decodes_bodies_and_returns_receipt_handles() {
        let app = TestApp::spawn().await;
        app.queue
            .push("m1", r#"{"type":"direct_data","data":{"x":1}}"#);
        app.queue.push("m2", "not json");

        let res = app.get(routes::MESSAGES).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["count"], 2);
        let messages = res.body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["message_id"], "m1");
        assert_eq!(messages[0]["body"]["data"], json!({"x": 1}));
        assert_eq!(messages[1]["body"], "not json");
        assert!(!messages[0]["receipt_handle"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn peeked_messages_stay_in_flight() {
        let app = TestApp::spawn().await;
        app.queue.push("m1", "{}");

        assert_eq!(app.get(routes::MESSAGES).await.body["count"], 1);
        assert_eq!(app.get(routes::MESSAGES).await.body["count"], 0);
        assert_eq!(app.queue.in_flight_count(), 1);
    }

    #[tokio::test]
    async fn delete_acknowledges_by_receipt_handle() {
        let app = TestApp::spawn().await;
        app.queue.push("m1", "{}");
        let peek = app.get(routes::MESSAGES).await;
        let handle = peek.body["messages"][0]["receipt_handle"]
            .as_str()
            .unwrap()
            .to_string();

        let res = app.delete(&routes::message(&handle)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success"], true);
        assert_eq!(res.body["message"], "Message deleted successfully");
        assert_eq!(app.queue.acked(), vec!["m1".to_string()]);
        assert!(app.queue.is_empty());
    }

    #[tokio::test]
    async fn delete_with_unknown_handle_is_a_queue_error() {
        let app = TestApp::spawn().await;

        let res = app.delete(&routes::message("no-such-handle")).await;

        assert_eq!(res.status, 502);
        assert_eq!(res.code(), "QUEUE_ERROR");
    }

    #[tokio::test]
    async fn receive_failure_is_a_queue_error() {
        let app = TestApp::spawn().await;
        app.queue.fail_next_receives(1);

        let res = app.get(routes::MESSAGES).await;

        assert_eq!(res.status, 502);
        assert_eq!(res.code(), "QUEUE_ERROR");
        assert_eq!(res.body["message"], "The message queue request failed");
    }

    #[tokio::test]
    async fn ingested_message_can_be_peeked() {
        let app = TestApp::spawn().await;
        app.post_json(routes::INGEST, &json!({"k": "v"})).await;

        let res = app.get(routes::MESSAGES).await;

        assert_eq!(res.body["count"], 1);
        assert_eq!(res.body["messages"][0]["body"]["data"], json!({"k": "v"}));
        assert_eq!(res.body["messages"][0]["body"]["source"], "admin-api");
    }
}
