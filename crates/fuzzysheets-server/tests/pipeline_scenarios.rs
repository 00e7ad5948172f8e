// SPDX-License-Identifier: Apache-2.0

mod support;

use axum::http::StatusCode;
use fuzzysheets_model::OperationKind;
use fuzzysheets_server::FakeBackend;
use std::sync::atomic::Ordering;
use support::{body_text, files_under, get, location, session_cookie, upload_request, Harness, Part};

#[tokio::test]
async fn detect_upload_runs_backend_once_and_lists_the_result() {
    let h = Harness::new(FakeBackend::default());

    let response = h
        .send(upload_request(
            "detect",
            None,
            &[Part::File("file1", "sample.csv", b"name,city\nAnna,Lund\n")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/detect");
    let cookie = session_cookie(&response);

    assert_eq!(h.backend.run_calls.load(Ordering::Relaxed), 1);
    let calls = h.backend.calls.lock().await.clone();
    assert_eq!(calls[0].kind, OperationKind::Detect);
    assert_eq!(calls[0].inputs.len(), 1);
    assert_eq!(calls[0].inputs[0].original_name, "sample.csv");
    let stored = calls[0].inputs[0]
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .expect("stored name")
        .to_string();
    assert!(stored.starts_with("detect_"), "{stored}");
    assert!(stored.ends_with("_sample.csv"), "{stored}");
    assert_eq!(
        std::fs::read(&calls[0].inputs[0].path).expect("stored input"),
        b"name,city\nAnna,Lund\n"
    );
    assert!(calls[0].ctx.directory.starts_with("detect_"));
    assert!(h
        .path("downloads")
        .join(&calls[0].ctx.directory)
        .join("result.csv")
        .is_file());

    let page = body_text(h.send(get("/detect", Some(&cookie))).await).await;
    assert!(page.contains("result.csv"), "{page}");

    let reloaded = body_text(h.send(get("/detect", Some(&cookie))).await).await;
    assert!(!reloaded.contains("result.csv"));
}

#[tokio::test]
async fn merge_with_identical_names_is_flashed_without_running_backend() {
    let h = Harness::new(FakeBackend::default());

    let response = h
        .send(upload_request(
            "merge",
            None,
            &[
                Part::File("file1", "a.xlsx", b"PK"),
                Part::File("file2", "a.xlsx", b"PK"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/merge");
    let cookie = session_cookie(&response);

    assert_eq!(h.backend.run_calls.load(Ordering::Relaxed), 0);
    assert!(files_under(&h.path("uploads")).is_empty());

    let page = body_text(h.send(get("/merge", Some(&cookie))).await).await;
    assert!(page.contains("You must provide two different files"), "{page}");

    let again = body_text(h.send(get("/merge", Some(&cookie))).await).await;
    assert!(!again.contains("You must provide two different files"));
}

#[tokio::test]
async fn merge_with_one_input_is_incomplete() {
    let h = Harness::new(FakeBackend::default());

    let response = h
        .send(upload_request(
            "merge",
            None,
            &[
                Part::File("file1", "left.csv", b"a\n1\n"),
                Part::File("file2", "", b""),
            ],
        ))
        .await;
    let cookie = session_cookie(&response);

    assert_eq!(h.backend.run_calls.load(Ordering::Relaxed), 0);
    let page = body_text(h.send(get("/merge", Some(&cookie))).await).await;
    assert!(page.contains("You must select two csv/xlsx files or Generate spreadsheets"));
}

#[tokio::test]
async fn server_references_are_copied_with_slot_numbers() {
    let h = Harness::new(FakeBackend::default());
    std::fs::write(h.path("shared/left.csv"), b"id\n1\n").expect("left");
    std::fs::write(h.path("shared/right.csv"), b"id\n2\n").expect("right");

    let response = h
        .send(upload_request(
            "merge",
            None,
            &[
                Part::Text("server_file1", "left.csv"),
                Part::Text("server_file2", "right.csv"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let stored = files_under(&h.path("uploads"));
    assert_eq!(stored.len(), 2);
    assert!(stored[0].starts_with("merge_") && stored[0].ends_with("_1_left.csv"));
    assert!(stored[1].starts_with("merge_") && stored[1].ends_with("_2_right.csv"));
    assert!(h.path("shared/left.csv").is_file());
    assert!(h.path("shared/right.csv").is_file());
}

fn write_workbook(path: &std::path::Path, value: &str) {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "id").expect("cell");
    sheet.write_string(1, 0, value).expect("cell");
    workbook.save(path).expect("save workbook");
}

#[tokio::test]
async fn workbook_server_references_reach_backend_as_csv_copies() {
    let h = Harness::new(FakeBackend::default());
    write_workbook(&h.path("shared/a.xlsx"), "1");
    write_workbook(&h.path("shared/b.xlsx"), "2");
    let originals = [
        std::fs::read(h.path("shared/a.xlsx")).expect("a"),
        std::fs::read(h.path("shared/b.xlsx")).expect("b"),
    ];

    let response = h
        .send(upload_request(
            "merge",
            None,
            &[
                Part::Text("server_file1", "a.xlsx"),
                Part::Text("server_file2", "b.xlsx"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let stored = files_under(&h.path("uploads"));
    assert_eq!(stored.len(), 2, "{stored:?}");
    assert!(stored.iter().any(|f| f.ends_with("_1_a.csv")), "{stored:?}");
    assert!(stored.iter().any(|f| f.ends_with("_2_b.csv")), "{stored:?}");
    assert_eq!(std::fs::read(h.path("shared/a.xlsx")).expect("a"), originals[0]);
    assert_eq!(std::fs::read(h.path("shared/b.xlsx")).expect("b"), originals[1]);

    assert_eq!(h.backend.run_calls.load(Ordering::Relaxed), 1);
    let calls = h.backend.calls.lock().await.clone();
    let names: Vec<&str> = calls[0].inputs.iter().map(|i| i.original_name.as_str()).collect();
    assert_eq!(names, ["a.xlsx", "b.xlsx"]);
    for input in &calls[0].inputs {
        assert_eq!(input.path.extension().and_then(|e| e.to_str()), Some("csv"));
        assert!(input.path.is_file());
    }
    assert_eq!(
        std::fs::read_to_string(&calls[0].inputs[1].path).expect("converted"),
        "id\n2\n"
    );
}

#[tokio::test]
async fn repeated_upload_field_uses_the_first_file() {
    let h = Harness::new(FakeBackend::default());

    let response = h
        .send(upload_request(
            "detect",
            None,
            &[
                Part::File("file1", "first.csv", b"a\n1\n"),
                Part::File("file1", "second.csv", b"a\n2\n"),
            ],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let calls = h.backend.calls.lock().await.clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].inputs[0].original_name, "first.csv");
    assert_eq!(
        std::fs::read(&calls[0].inputs[0].path).expect("stored input"),
        b"a\n1\n"
    );
}

#[tokio::test]
async fn missing_server_reference_is_flashed() {
    let h = Harness::new(FakeBackend::default());

    let response = h
        .send(upload_request(
            "detect",
            None,
            &[Part::Text("server_file1", "../outside.csv")],
        ))
        .await;
    let cookie = session_cookie(&response);

    assert_eq!(h.backend.run_calls.load(Ordering::Relaxed), 0);
    let page = body_text(h.send(get("/detect", Some(&cookie))).await).await;
    assert!(page.contains("is not available"), "{page}");
}

#[tokio::test]
async fn empty_detect_submission_generates_a_spreadsheet() {
    let h = Harness::new(FakeBackend::default());

    let response = h
        .send(upload_request("detect", None, &[Part::Text("q", "5")]))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cookie = session_cookie(&response);

    assert_eq!(h.backend.run_calls.load(Ordering::Relaxed), 0);
    let generated = files_under(&h.path("downloads"));
    assert_eq!(generated.len(), 1);
    assert!(generated[0].starts_with("generate_"));
    assert!(generated[0].ends_with("/generated_spreadsheet.csv"));

    let page = body_text(h.send(get("/detect", Some(&cookie))).await).await;
    assert!(page.contains("generated_spreadsheet.csv"));

    let download = h
        .send(get(&format!("/downloads/{}", generated[0]), Some(&cookie)))
        .await;
    assert_eq!(download.status(), StatusCode::OK);
    let csv = body_text(download).await;
    assert!(csv.starts_with("id,first_name,last_name,email,city,phone"));
}

#[tokio::test]
async fn empty_merge_submission_generates_two_spreadsheets() {
    let h = Harness::new(FakeBackend::default());

    h.send(upload_request("merge", None, &[])).await;

    let generated = files_under(&h.path("downloads"));
    assert_eq!(generated.len(), 2);
    assert!(generated[0].ends_with("/generated_spreadsheet1.csv"));
    assert!(generated[1].ends_with("/generated_spreadsheet2.csv"));
}

#[tokio::test]
async fn out_of_range_row_count_is_a_bad_request() {
    let h = Harness::new(FakeBackend::default());

    for q in ["0", "1001000", "many"] {
        let response = h
            .send(upload_request("detect", None, &[Part::Text("q", q)]))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "q={q}");
    }
    assert!(files_under(&h.path("downloads")).is_empty());
}

#[tokio::test]
async fn unknown_operation_is_not_found() {
    let h = Harness::new(FakeBackend::default());
    let response = h
        .send(upload_request("split", None, &[Part::Text("q", "5")]))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn backend_failure_renders_apology_and_is_logged() {
    let h = Harness::new(FakeBackend::failing("matcher crashed"));

    let response = h
        .send(upload_request(
            "detect",
            None,
            &[Part::File("file1", "sample.csv", b"a\n1\n")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let page = body_text(response).await;
    assert!(page.contains("500"));

    let lines = h.errorlog_lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["code"], 500);
    assert_eq!(lines[0]["path"], "/upload/detect");
    assert_eq!(lines[0]["endpoint"], "/upload/:kind");
}

#[tokio::test]
async fn new_submission_clears_previous_results() {
    let h = Harness::new(FakeBackend::default());

    let first = h
        .send(upload_request(
            "detect",
            None,
            &[Part::File("file1", "one.csv", b"a\n1\n")],
        ))
        .await;
    let cookie = session_cookie(&first);

    h.send(upload_request(
        "detect",
        Some(&cookie),
        &[Part::File("file1", "two.txt", b"a\n1\n")],
    ))
    .await;

    let page = body_text(h.send(get("/detect", Some(&cookie))).await).await;
    assert!(!page.contains("result.csv"));
    assert!(page.contains("The input file must have a csv or xlsx extension."));
}
