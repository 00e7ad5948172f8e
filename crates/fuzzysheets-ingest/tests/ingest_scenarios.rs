// SPDX-License-Identifier: Apache-2.0

use std::fs;

use bytes::Bytes;
use chrono::NaiveDate;
use fuzzysheets_ingest::{
    evaluate, materialize, IngestError, Rejection, RequestPrefix, StorageLayout, Verdict,
};
use fuzzysheets_model::{InputSlot, OperationKind, UploadedFile};
use proptest::prelude::*;
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

fn prefix(kind: OperationKind) -> RequestPrefix {
    RequestPrefix::new(kind, NaiveDate::from_ymd_opt(2024, 5, 17).expect("date"), "kqzvw")
}

#[test]
fn merge_of_two_server_files_copies_both_and_leaves_originals() {
    let tmp = tempdir().expect("tmp");
    let shared = tmp.path().join("shared");
    fs::create_dir_all(&shared).expect("mkdir");
    fs::write(shared.join("left.csv"), b"id,name\n1,ann\n").expect("write");
    fs::write(shared.join("right.csv"), b"id,name\n2,bo\n").expect("write");
    let layout = StorageLayout::new(tmp.path().join("uploads"), &shared);
    let slots = vec![
        InputSlot::ServerRef("left.csv".to_string()),
        InputSlot::ServerRef("right.csv".to_string()),
    ];

    assert_eq!(evaluate(OperationKind::Merge, &slots), Verdict::Accept);
    let inputs = materialize(&slots, &layout, &prefix(OperationKind::Merge)).expect("materialize");

    let names: Vec<String> = inputs
        .iter()
        .map(|i| i.path.file_name().expect("name").to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        [
            "merge_2024_05_17_kqzvw_1_left.csv",
            "merge_2024_05_17_kqzvw_2_right.csv"
        ]
    );
    assert_eq!(inputs[0].original_name, "left.csv");
    assert!(shared.join("left.csv").exists());
    assert!(shared.join("right.csv").exists());
    assert_eq!(fs::read(&inputs[1].path).expect("read"), b"id,name\n2,bo\n");
}

#[test]
fn uploaded_workbook_is_normalized_during_materialization() {
    let tmp = tempdir().expect("tmp");
    let staging = tmp.path().join("book.xlsx");
    let mut workbook = Workbook::new();
    workbook
        .add_worksheet()
        .write_string(0, 0, "city")
        .expect("cell");
    workbook.save(&staging).expect("save");
    let data = fs::read(&staging).expect("read workbook");

    let layout = StorageLayout::new(tmp.path().join("uploads"), tmp.path());
    let slots = vec![
        InputSlot::Upload(UploadedFile::new("cities.xlsx", Bytes::from(data))),
        InputSlot::Upload(UploadedFile::new("towns.csv", Bytes::from_static(b"city\nOslo\n"))),
    ];
    assert_eq!(evaluate(OperationKind::Merge, &slots), Verdict::Accept);

    let inputs = materialize(&slots, &layout, &prefix(OperationKind::Merge)).expect("materialize");

    assert_eq!(
        inputs[0].path,
        layout.upload_dir.join("merge_2024_05_17_kqzvw_1_cities.csv")
    );
    assert!(!layout
        .upload_dir
        .join("merge_2024_05_17_kqzvw_1_cities.xlsx")
        .exists());
    assert_eq!(fs::read_to_string(&inputs[0].path).expect("csv"), "city\n");
    assert_eq!(inputs[0].original_name, "cities.xlsx");
}

#[test]
fn corrupt_workbook_surfaces_as_conversion_rejection() {
    let tmp = tempdir().expect("tmp");
    let layout = StorageLayout::new(tmp.path().join("uploads"), tmp.path());
    let slots = vec![InputSlot::Upload(UploadedFile::new(
        "broken.xlsx",
        Bytes::from_static(b"not a workbook"),
    ))];

    let err = materialize(&slots, &layout, &prefix(OperationKind::Detect)).expect_err("corrupt");
    match err {
        IngestError::Rejected(rejection @ Rejection::Conversion(_)) => {
            assert!(rejection.to_string().starts_with("Error converting Excel file: "));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn server_reference_escaping_the_root_is_rejected_by_name() {
    let tmp = tempdir().expect("tmp");
    let shared = tmp.path().join("shared");
    fs::create_dir_all(&shared).expect("mkdir");
    fs::write(tmp.path().join("secret.csv"), b"a\n").expect("write");
    let layout = StorageLayout::new(tmp.path().join("uploads"), &shared);
    let slots = vec![InputSlot::ServerRef("../secret.csv".to_string())];

    let err = materialize(&slots, &layout, &prefix(OperationKind::Detect)).expect_err("escape");
    assert_eq!(
        err.to_string(),
        "Server file '../secret.csv' is not available"
    );
}

proptest! {
    #[test]
    fn any_other_extension_is_rejected(stem in "[a-z]{1,8}", ext in "[a-z]{1,4}") {
        prop_assume!(ext != "csv" && ext != "xlsx");
        let slots = vec![InputSlot::ServerRef(format!("{stem}.{ext}"))];
        prop_assert_eq!(
            evaluate(OperationKind::Detect, &slots),
            Verdict::Reject(Rejection::BadExtension(OperationKind::Detect))
        );
    }

    #[test]
    fn identical_pairs_are_never_accepted(name in "[a-z]{1,8}\\.(csv|xlsx|txt)") {
        let slots = vec![
            InputSlot::ServerRef(name.clone()),
            InputSlot::Upload(UploadedFile::new(name, Bytes::from_static(b"x"))),
        ];
        prop_assert_eq!(
            evaluate(OperationKind::Merge, &slots),
            Verdict::Reject(Rejection::DuplicateNames)
        );
    }
}
