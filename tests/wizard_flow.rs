//! Integration tests for the conversion wizard against a mocked remote
//! service.
//!
//! Every test spins up a fresh `mockito` server and points the orchestrator
//! at it, so the full HTTP path — request bodies, response normalization,
//! polling, error mapping — is exercised without a real service.

use anyconvert::{
    Item, ItemError, ItemPatch, ItemStatus, ItemStore, Orchestrator, OrchestratorConfig,
    ServiceClient, StoreObserver, WizardStep,
};
use mockito::Matcher;
use serde_json::json;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Orchestrator wired to a mock server, with fast polling so tests finish
/// quickly.
fn orchestrator_for(server: &mockito::Server) -> Orchestrator {
    let config = OrchestratorConfig::builder()
        .base_url(server.url())
        .user_id("u1")
        .poll_backoff_ms(10)
        .poll_max_backoff_ms(40)
        .poll_timeout_secs(5)
        .build()
        .expect("valid config");
    let client = ServiceClient::new(&config).expect("client");
    Orchestrator::with_client(config, ItemStore::in_memory(), client)
}

/// Records every status an item passes through, for transition assertions.
#[derive(Default)]
struct StatusRecorder {
    seen: Mutex<Vec<(String, ItemStatus)>>,
}

impl StoreObserver for StatusRecorder {
    fn on_item_updated(&self, item: &Item) {
        self.seen.lock().unwrap().push((item.id.clone(), item.status));
    }
}

impl StatusRecorder {
    fn statuses_of(&self, id: &str) -> Vec<ItemStatus> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(item_id, _)| item_id == id)
            .map(|(_, status)| *status)
            .collect()
    }
}

fn seeded_file_item(store: &ItemStore, id: &str, name: &str, target: &str) -> Item {
    let mut item = Item::file(id, name, 200);
    item.target_format = Some(target.to_string());
    store.add(item.clone());
    item
}

// ── Scenario A: plain file conversion ────────────────────────────────────────

#[tokio::test]
async fn file_item_converts_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let convert = server
        .mock("POST", "/convert")
        .match_body(Matcher::PartialJson(json!({
            "source_file_id": "file1",
            "target_format": "docx",
            "user_id": "u1",
        })))
        .with_status(201)
        .with_body(json!({"operation_id": "op_1", "status": "queued"}).to_string())
        .create_async()
        .await;
    let status = server
        .mock("GET", "/operations/op_1")
        .with_body(
            json!({
                "operation_id": "op_1",
                "status": "completed",
                "progress": 100,
                "result_file_id": "res1",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    seeded_file_item(orchestrator.store(), "file1", "doc.pdf", "docx");

    let summary = orchestrator.convert_all().await;
    assert_eq!(summary.total_items, 1);
    assert_eq!(summary.converted_items, 1);
    assert_eq!(summary.failed_items, 0);

    let item = orchestrator.store().get("file1").unwrap();
    assert_eq!(item.status, ItemStatus::Converted);
    assert_eq!(item.name, "doc.docx");
    assert_eq!(item.target_format.as_deref(), Some("docx"));
    assert_eq!(item.result_file_id.as_deref(), Some("res1"));

    convert.assert_async().await;
    status.assert_async().await;
}

// ── P1: status transitions never revert ─────────────────────────────────────

#[tokio::test]
async fn status_sequence_is_uploaded_converting_converted() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/convert")
        .with_status(201)
        .with_body(json!({"operation_id": "op_1"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/operations/op_1")
        .with_body(json!({"status": "completed", "progress": 100, "result_file_id": "r1"}).to_string())
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let recorder = Arc::new(StatusRecorder::default());
    orchestrator.store().subscribe(recorder.clone());
    seeded_file_item(orchestrator.store(), "f1", "doc.pdf", "txt");

    orchestrator.convert_all().await;

    let statuses = recorder.statuses_of("f1");
    assert_eq!(
        statuses,
        vec![ItemStatus::Converting, ItemStatus::Converted],
        "status must move converting → converted with no reversals"
    );
}

// ── Polling: repeated status checks until terminal ───────────────────────────

#[tokio::test]
async fn polls_repeatedly_and_times_out_on_stuck_operation() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/convert")
        .with_status(201)
        .with_body(json!({"operation_id": "op_stuck"}).to_string())
        .create_async()
        .await;
    let status = server
        .mock("GET", "/operations/op_stuck")
        .with_body(json!({"status": "processing", "progress": 40}).to_string())
        .expect_at_least(3)
        .create_async()
        .await;

    let config = OrchestratorConfig::builder()
        .base_url(server.url())
        .poll_backoff_ms(10)
        .poll_max_backoff_ms(20)
        .poll_timeout_secs(1)
        .build()
        .unwrap();
    let client = ServiceClient::new(&config).unwrap();
    let orchestrator = Orchestrator::with_client(config, ItemStore::in_memory(), client);
    seeded_file_item(orchestrator.store(), "f1", "doc.pdf", "txt");

    let summary = orchestrator.convert_all().await;
    assert_eq!(summary.failed_items, 1);
    assert!(matches!(
        summary.outcomes[0].error,
        Some(ItemError::PollTimeout { .. })
    ));
    assert_eq!(
        orchestrator.store().get("f1").unwrap().status,
        ItemStatus::Error
    );

    // The single-status-check shortcut would hit the endpoint once.
    status.assert_async().await;
}

// ── Scenario B / P3: website bundling without a bundle id ────────────────────

#[tokio::test]
async fn website_without_bundle_id_fails_without_second_phase() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/convert/website")
        .match_body(Matcher::PartialJson(json!({
            "url": "https://site.io",
            "target_format": "site_bundle",
        })))
        .with_status(201)
        .with_body(json!({"operation_id": "op_w"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/websites/op_w/status")
        .with_body(
            json!({"status": "completed", "progress": 100, "result_file_id": null}).to_string(),
        )
        .create_async()
        .await;
    let second_phase = server
        .mock("POST", "/convert")
        .expect(0)
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let mut item = Item::website("w1", "https://site.io");
    item.target_format = Some("pdf".to_string());
    orchestrator.store().add(item);

    let summary = orchestrator.convert_all().await;
    assert_eq!(summary.failed_items, 1);
    assert!(matches!(
        summary.outcomes[0].error,
        Some(ItemError::MissingBundleId { .. })
    ));
    assert_eq!(
        orchestrator.store().get("w1").unwrap().status,
        ItemStatus::Error
    );

    second_phase.assert_async().await;
}

// ── Website two-phase success ────────────────────────────────────────────────

#[tokio::test]
async fn website_converts_through_bundle_then_file_path() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/convert/website")
        .match_body(Matcher::PartialJson(json!({
            "url": "https://example.com",
            "target_format": "site_bundle",
        })))
        .with_status(201)
        .with_body(json!({"operation_id": "op_w"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/websites/op_w/status")
        .with_body(
            json!({"status": "completed", "progress": 100, "result_file_id": "bundle_1"})
                .to_string(),
        )
        .create_async()
        .await;
    let second_phase = server
        .mock("POST", "/convert")
        .match_body(Matcher::PartialJson(json!({
            "source_file_id": "bundle_1",
            "target_format": "pdf",
        })))
        .with_status(201)
        .with_body(json!({"operation_id": "op_2"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/operations/op_2")
        .with_body(
            json!({"status": "completed", "progress": 100, "result_file_id": "res9"}).to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let mut item = Item::website("w1", "https://example.com");
    item.target_format = Some("pdf".to_string());
    orchestrator.store().add(item);

    let summary = orchestrator.convert_all().await;
    assert_eq!(summary.converted_items, 1);

    let item = orchestrator.store().get("w1").unwrap();
    assert_eq!(item.status, ItemStatus::Converted);
    assert_eq!(item.result_file_id.as_deref(), Some("res9"));
    // URLs never lose their hostname dot; the format is appended.
    assert_eq!(item.name, "https://example.com.pdf");

    second_phase.assert_async().await;
}

// ── Scenario C / P2: independence of sibling items ───────────────────────────

#[tokio::test]
async fn one_failing_item_does_not_block_the_other() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/convert")
        .match_body(Matcher::PartialJson(json!({"source_file_id": "f_bad"})))
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;
    server
        .mock("POST", "/convert")
        .match_body(Matcher::PartialJson(json!({"source_file_id": "f_good"})))
        .with_status(201)
        .with_body(json!({"operation_id": "op_ok"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/operations/op_ok")
        .with_body(
            json!({"status": "completed", "progress": 100, "result_file_id": "res_ok"}).to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    seeded_file_item(orchestrator.store(), "f_bad", "bad.pdf", "docx");
    seeded_file_item(orchestrator.store(), "f_good", "good.pdf", "docx");

    let summary = orchestrator.convert_all().await;
    assert_eq!(summary.total_items, 2);
    assert_eq!(summary.converted_items, 1);
    assert_eq!(summary.failed_items, 1);

    let bad = orchestrator.store().get("f_bad").unwrap();
    assert_eq!(bad.status, ItemStatus::Error);
    let good = orchestrator.store().get("f_good").unwrap();
    assert_eq!(good.status, ItemStatus::Converted);
    assert_eq!(good.name, "good.docx");
    assert_eq!(good.result_file_id.as_deref(), Some("res_ok"));

    let failing_outcome = summary
        .outcomes
        .iter()
        .find(|o| o.item_id == "f_bad")
        .unwrap();
    assert!(matches!(
        failing_outcome.error,
        Some(ItemError::HttpStatus { status: 500, .. })
    ));
}

// ── Remote failure is surfaced as item error ─────────────────────────────────

#[tokio::test]
async fn remote_failed_status_resolves_item_to_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/convert")
        .with_status(201)
        .with_body(json!({"operation_id": "op_f"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/operations/op_f")
        .with_body(
            json!({"status": "failed", "progress": 0, "error_message": "renderer crashed"})
                .to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    seeded_file_item(orchestrator.store(), "f1", "doc.pdf", "txt");

    let summary = orchestrator.convert_all().await;
    let error = summary.outcomes[0].error.as_ref().unwrap();
    match error {
        ItemError::RemoteFailed { message } => {
            assert_eq!(message.as_deref(), Some("renderer crashed"));
        }
        other => panic!("expected RemoteFailed, got {other:?}"),
    }
}

// ── Re-entering conversion overwrites the prior terminal state ───────────────

#[tokio::test]
async fn reconversion_overwrites_previous_result() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/convert")
        .with_status(201)
        .with_body(json!({"operation_id": "op_1"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/operations/op_1")
        .with_body(
            json!({"status": "completed", "progress": 100, "result_file_id": "res2"}).to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let store = orchestrator.store();
    let mut item = Item::file("f1", "doc.pdf", 200);
    item.status = ItemStatus::Error;
    item.target_format = Some("txt".to_string());
    store.add(item.clone());

    orchestrator.convert_item(store.get("f1").unwrap()).await;

    let item = store.get("f1").unwrap();
    assert_eq!(item.status, ItemStatus::Converted);
    assert_eq!(item.result_file_id.as_deref(), Some("res2"));
    assert_eq!(item.name, "doc.txt");
}

// ── Removing an item mid-flight leaves siblings and store intact ─────────────

#[tokio::test]
async fn update_after_remove_is_harmless() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/convert")
        .with_status(201)
        .with_body(json!({"operation_id": "op_1"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/operations/op_1")
        .with_body(
            json!({"status": "completed", "progress": 100, "result_file_id": "r1"}).to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let item = seeded_file_item(orchestrator.store(), "f1", "doc.pdf", "txt");
    // Simulate the user deleting the row while the task is in flight.
    orchestrator.store().remove("f1");

    let outcome = orchestrator.convert_item(item).await;
    assert!(outcome.is_converted());
    assert!(orchestrator.store().get("f1").is_none());
    assert!(orchestrator.store().is_empty());
}

// ── P5: download id fallback ─────────────────────────────────────────────────

#[tokio::test]
async fn download_fetches_result_file_id_when_present() {
    let mut server = mockito::Server::new_async().await;
    let result_dl = server
        .mock("GET", "/download/r1")
        .with_body("converted bytes")
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let mut item = Item::file("f1", "doc.pdf", 200);
    item.result_file_id = Some("r1".to_string());

    let artifact = orchestrator.download(&item).await.unwrap();
    assert_eq!(artifact.bytes, b"converted bytes");
    result_dl.assert_async().await;
}

#[tokio::test]
async fn download_falls_back_to_item_id() {
    let mut server = mockito::Server::new_async().await;
    let own_dl = server
        .mock("GET", "/download/f1")
        .with_body("original bytes")
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let item = Item::file("f1", "doc.pdf", 200);

    let artifact = orchestrator.download(&item).await.unwrap();
    assert_eq!(artifact.bytes, b"original bytes");
    own_dl.assert_async().await;
}

#[tokio::test]
async fn download_to_honours_content_disposition_hint() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/download/f1")
        .with_header("content-disposition", "attachment; filename=\"renamed.pdf\"")
        .with_body("bytes")
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let dir = tempfile::tempdir().unwrap();
    let item = Item::file("f1", "doc.pdf", 200);

    let path = orchestrator.download_to(&item, dir.path()).await.unwrap();
    assert_eq!(path.file_name().unwrap(), "renamed.pdf");
    assert_eq!(std::fs::read(&path).unwrap(), b"bytes");
}

#[tokio::test]
async fn download_to_derives_name_from_item_when_no_hint() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/download/f1")
        .with_body("bytes")
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let dir = tempfile::tempdir().unwrap();
    let mut item = Item::file("f1", "doc.pdf", 200);
    item.target_format = Some("docx".to_string());

    let path = orchestrator.download_to(&item, dir.path()).await.unwrap();
    assert_eq!(path.file_name().unwrap(), "doc.docx");
}

// ── Upload step ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_file_tracks_normalized_item() {
    let mut server = mockito::Server::new_async().await;
    let upload = server
        .mock("POST", "/upload")
        .with_status(201)
        .with_body(
            json!({
                "file_id": "srv_9",
                "filename": "notes.txt",
                "size": 11,
                "upload_date": "2026-08-30T00:00:00Z",
            })
            .to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("notes.txt");
    std::fs::write(&file_path, "hello world").unwrap();

    let item = orchestrator.upload_file(&file_path).await.unwrap();
    assert_eq!(item.id, "srv_9");
    assert_eq!(item.status, ItemStatus::Uploaded);
    assert_eq!(item.original_format, "txt");
    assert_eq!(item.size_bytes, 11);
    assert_eq!(orchestrator.store().len(), 1);

    upload.assert_async().await;
}

#[tokio::test]
async fn upload_of_missing_file_is_fatal_and_tracks_nothing() {
    let server = mockito::Server::new_async().await;
    let orchestrator = orchestrator_for(&server);

    let err = orchestrator.upload_file("/definitely/not/here.pdf").await;
    assert!(err.is_err());
    assert!(orchestrator.store().is_empty());
}

#[tokio::test]
async fn add_website_creates_local_item() {
    let server = mockito::Server::new_async().await;
    let orchestrator = orchestrator_for(&server);

    let item = orchestrator.add_website("https://example.com");
    assert!(item.is_website);
    assert_eq!(item.size_bytes, 0);
    assert_eq!(item.original_format, "site");
    assert_eq!(item.url.as_deref(), Some("https://example.com"));
    assert_eq!(orchestrator.store().get(&item.id).unwrap().name, item.name);
}

// ── Streaming API ────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_yields_one_outcome_per_item() {
    use futures::StreamExt;

    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/convert")
        .with_status(201)
        .with_body(json!({"operation_id": "op_1"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/operations/op_1")
        .with_body(
            json!({"status": "completed", "progress": 100, "result_file_id": "r1"}).to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    seeded_file_item(orchestrator.store(), "f1", "a.pdf", "txt");
    seeded_file_item(orchestrator.store(), "f2", "b.pdf", "txt");
    // No target format: must not be converted.
    orchestrator.store().add(Item::file("f3", "c.pdf", 10));

    let outcomes: Vec<_> = anyconvert::convert_stream(&orchestrator).collect().await;
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.is_converted()));
    assert_eq!(
        orchestrator.store().get("f3").unwrap().status,
        ItemStatus::Uploaded
    );
}

// ── Client reference endpoints ───────────────────────────────────────────────

#[tokio::test]
async fn register_website_normalizes_nullable_file_id() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/upload/website")
        .match_body(Matcher::PartialJson(json!({"url": "https://site.io"})))
        .with_status(201)
        .with_body(
            json!({"file_id": null, "operation_id": 77, "status": "processing"}).to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let registration = orchestrator
        .client()
        .register_website("https://site.io", Some("site.io"), None, Some("u1"))
        .await
        .unwrap();
    assert!(registration.file_id.is_none());
    assert_eq!(registration.operation_id, "77");
}

#[tokio::test]
async fn batch_convert_submits_all_entries() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/batch-convert")
        .match_body(Matcher::PartialJson(json!({
            "operations": [
                {"source_file_id": "f1", "target_format": "pdf"},
                {"url": "https://site.io", "target_format": "txt"},
            ],
        })))
        .with_status(201)
        .with_body(
            json!({
                "batch_id": "batch_1",
                "operations": [
                    {"operation_id": "op_1", "status": "queued", "queue_position": 1},
                    {"operation_id": "op_2", "status": "queued", "queue_position": 2},
                ],
            })
            .to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let entries = vec![
        anyconvert::BatchRequestEntry {
            source_file_id: Some("f1".into()),
            url: None,
            target_format: "pdf".into(),
        },
        anyconvert::BatchRequestEntry {
            source_file_id: None,
            url: Some("https://site.io".into()),
            target_format: "txt".into(),
        },
    ];
    let batch = orchestrator
        .client()
        .batch_convert(&entries, "u1")
        .await
        .unwrap();
    assert_eq!(batch.batch_id, "batch_1");
    assert_eq!(batch.operations.len(), 2);
}

#[tokio::test]
async fn supported_conversions_round_trips() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/supported-conversions")
        .with_body(
            json!({"from_pdf": ["docx", "txt"], "from_site": ["pdf", "docx", "txt"]}).to_string(),
        )
        .create_async()
        .await;

    let orchestrator = orchestrator_for(&server);
    let formats = orchestrator.client().supported_conversions().await.unwrap();
    assert_eq!(formats["from_pdf"], vec!["docx", "txt"]);
    assert_eq!(formats["from_site"].len(), 3);
}

// ── Wizard flow with a persisted store ───────────────────────────────────────

#[tokio::test]
async fn full_wizard_flow_survives_reopen() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/convert")
        .with_status(201)
        .with_body(json!({"operation_id": "op_1"}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/operations/op_1")
        .with_body(
            json!({"status": "completed", "progress": 100, "result_file_id": "r1"}).to_string(),
        )
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("wizard.json");

    {
        let config = OrchestratorConfig::builder()
            .base_url(server.url())
            .poll_backoff_ms(10)
            .build()
            .unwrap();
        let client = ServiceClient::new(&config).unwrap();
        let store = ItemStore::open(&snapshot).unwrap();
        let orchestrator = Orchestrator::with_client(config, store, client);

        seeded_file_item(orchestrator.store(), "f1", "doc.pdf", "txt");
        orchestrator.store().set_step(WizardStep::SelectFormat);
        orchestrator.convert_all().await;
        orchestrator.store().set_step(WizardStep::Download);
    }

    // A fresh process resumes exactly where the wizard left off.
    let reopened = ItemStore::open(&snapshot).unwrap();
    assert_eq!(reopened.step(), WizardStep::Download);
    let item = reopened.get("f1").unwrap();
    assert_eq!(item.status, ItemStatus::Converted);
    assert_eq!(item.name, "doc.txt");
    assert_eq!(item.result_file_id.as_deref(), Some("r1"));

    reopened.update(
        "f1",
        ItemPatch {
            generate_graph: Some(true),
            ..Default::default()
        },
    );
    assert_eq!(reopened.get("f1").unwrap().generate_graph, Some(true));
}
