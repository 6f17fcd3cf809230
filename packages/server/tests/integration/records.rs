use chrono::Utc;

use crate::common::{TestApp, routes};

mod stats {
    use super::*;

    #[tokio::test]
    async fn empty_store_has_zero_counts() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::RECORD_STATS).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 0);
        assert_eq!(res.body["successes"], 0);
        assert_eq!(res.body["errors"], 0);
        assert_eq!(res.body["avg_processing_time_ms"], 0.0);
    }

    #[tokio::test]
    async fn counts_successes_and_errors() {
        let app = TestApp::spawn().await;
        app.save_record("a.json", "M1", 0, true).await;
        app.save_record("a.json", "M1", 1, false).await;
        app.save_record("direct_message", "M2", 0, true).await;

        let res = app.get(routes::RECORD_STATS).await;

        assert_eq!(res.body["total"], 3);
        assert_eq!(res.body["successes"], 2);
        assert_eq!(res.body["errors"], 1);
        assert_eq!(res.body["avg_processing_time_ms"], 5.0);
    }

    #[tokio::test]
    async fn unavailable_without_a_database() {
        let app = TestApp::spawn_without_records().await;

        let res = app.get(routes::RECORD_STATS).await;

        assert_eq!(res.status, 503);
        assert_eq!(res.code(), "RECORDS_UNAVAILABLE");
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn recent_defaults_to_ten_newest_first() {
        let app = TestApp::spawn().await;
        for i in 0..12 {
            app.save_record("a.json", "M1", i, true).await;
        }

        let res = app.get(routes::RECENT_RECORDS).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["count"], 10);
        assert_eq!(res.body["data"][0]["record_index"], 11);
    }

    #[tokio::test]
    async fn recent_honours_limit_and_bounds() {
        let app = TestApp::spawn().await;
        for i in 0..3 {
            app.save_record("a.json", "M1", i, true).await;
        }

        let res = app
            .get_with_query(routes::RECENT_RECORDS, &[("limit", "2")])
            .await;
        assert_eq!(res.body["count"], 2);

        for bad in ["0", "101"] {
            let res = app
                .get_with_query(routes::RECENT_RECORDS, &[("limit", bad)])
                .await;
            assert_eq!(res.status, 400, "limit={bad}");
            assert_eq!(res.code(), "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn by_message_is_ordered_by_record_index() {
        let app = TestApp::spawn().await;
        for i in [2, 0, 1] {
            app.save_record("a.json", "M1", i, i != 1).await;
        }
        app.save_record("b.json", "M2", 0, true).await;

        let res = app.get(&routes::records_by_message("M1")).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["count"], 3);
        let data = res.body["data"].as_array().unwrap();
        let indexes: Vec<u64> = data
            .iter()
            .map(|d| d["record_index"].as_u64().unwrap())
            .collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(data[1]["status"], "error");
        assert_eq!(data[1]["error_message"], "processing failed");
        assert!(data[1]["processed_data"].is_null());
        assert!(data[0].get("error_message").is_none());
    }

    #[tokio::test]
    async fn by_message_without_documents_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::records_by_message("missing")).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn by_source_matches_exact_key() {
        let app = TestApp::spawn().await;
        app.save_record("incoming/a.json", "M1", 0, true).await;
        app.save_record("incoming/a.json", "M1", 1, true).await;
        app.save_record("incoming/b.json", "M2", 0, true).await;

        let res = app
            .get_with_query(routes::RECORDS_BY_SOURCE, &[("key", "incoming/a.json")])
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["count"], 2);
        assert_eq!(res.body["data"][0]["source_key"], "incoming/a.json");
    }

    #[tokio::test]
    async fn by_source_requires_a_key() {
        let app = TestApp::spawn().await;

        let empty = app
            .get_with_query(routes::RECORDS_BY_SOURCE, &[("key", " ")])
            .await;
        assert_eq!(empty.status, 400);
        assert_eq!(empty.code(), "VALIDATION_ERROR");

        let missing = app.get(routes::RECORDS_BY_SOURCE).await;
        assert_eq!(missing.status, 400);
    }
}

mod pruning {
    use super::*;

    #[tokio::test]
    async fn deletes_only_old_documents() {
        let app = TestApp::spawn().await;
        let fresh = app.save_record("a.json", "M1", 0, true).await;
        let mut old = fresh.clone();
        old.id = 1000;
        old.processing_timestamp = Utc::now() - chrono::Duration::days(45);
        app.records.insert_raw(old);

        let res = app
            .delete_with_query(routes::RECORDS, &[("older_than_days", "30")])
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["deleted"], 1);
        assert_eq!(res.body["older_than_days"], 30);
        assert_eq!(app.records.records(), vec![fresh]);
    }

    #[tokio::test]
    async fn zero_days_is_rejected() {
        let app = TestApp::spawn().await;
        app.save_record("a.json", "M1", 0, true).await;

        let res = app
            .delete_with_query(routes::RECORDS, &[("older_than_days", "0")])
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.code(), "VALIDATION_ERROR");
        assert_eq!(app.records.len(), 1);
    }
}
