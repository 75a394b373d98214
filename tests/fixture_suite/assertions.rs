//! Result assertion helpers against real query output.

use crate::common::*;
use docfix_fixture::assertions::{
    check_document_metadata, check_record_content, check_single_list_result,
    check_single_stream_result,
};
use proptest::prelude::*;

const WORKS: [&str; 5] = [
    "Starry Night",
    "Sunflowers",
    "Bedroom in Arles",
    "Portrait of Dr Gachet",
    "Sorrow",
];

fn record(works: &[&str]) -> JsonObject {
    let content = json!({
        "firstName": "Vincent",
        "secondName": "Willem",
        "lastName": "Van Gogh",
        "notableWorks": works,
    });
    let mut record = JsonObject::new();
    record.insert("mybucket".into(), content);
    record
}

// ============================================================================
// Content
// ============================================================================

proptest! {
    #[test]
    fn notable_works_in_any_order(works in Just(WORKS.to_vec()).prop_shuffle()) {
        prop_assert!(check_record_content(&record(&works), "mybucket").is_ok());
    }

    #[test]
    fn unexpected_work_rejected(
        works in Just(WORKS.to_vec()).prop_shuffle(),
        slot in 0usize..5,
        title in "[A-Za-z ]{1,24}",
    ) {
        prop_assume!(!WORKS.contains(&title.as_str()));
        let mut works: Vec<&str> = works.into_iter().collect();
        works[slot] = title.as_str();
        prop_assert!(check_record_content(&record(&works), "mybucket").is_err());
    }

    #[test]
    fn wrong_size_rejected(len in 0usize..10) {
        prop_assume!(len != 5);
        let works: Vec<&str> = WORKS.iter().cycle().take(len).copied().collect();
        prop_assert!(check_record_content(&record(&works), "mybucket").is_err());
    }
}

#[test]
fn provisioned_rows_pass_every_shape() {
    let cluster = TestCluster::new(NodeConfig::default());
    let fixture = cluster.ctx.ready().unwrap();
    let procs = DocumentProcedures::new(fixture.bucket).with_consistency(ScanConsistency::RequestPlus);
    let statement = "select * from mybucket where lastName = 'Van Gogh'";

    let record = procs.query(statement).unwrap().next().unwrap();
    assert_single_list_result(&record.to_map(), "mybucket");
    assert_single_stream_result(procs.query(statement).unwrap(), "mybucket");
    assert_record_content(&record.query_result[0], "mybucket");

    let content = &record.query_result[0]["mybucket"];
    assert_document_content(
        &content["firstName"],
        &content["secondName"],
        &content["lastName"],
        &content["notableWorks"],
    );
}

#[test]
fn extra_row_fails_list_and_stream_checks() {
    let cluster = TestCluster::new(NodeConfig::default());
    let fixture = cluster.ctx.ready().unwrap();
    fixture
        .bucket
        .upsert(
            "artist:vincent_copy",
            record(&WORKS)["mybucket"].as_object().unwrap().clone(),
            WriteOptions::default(),
        )
        .unwrap();

    let procs = DocumentProcedures::new(fixture.bucket).with_consistency(ScanConsistency::RequestPlus);
    let statement = "select * from mybucket where lastName = 'Van Gogh'";
    let record = procs.query(statement).unwrap().next().unwrap();
    assert_eq!(record.query_result.len(), 2);
    assert!(check_single_list_result(&record.to_map(), "mybucket").is_err());
    assert!(check_single_stream_result(procs.query(statement).unwrap(), "mybucket").is_err());
}

// ============================================================================
// Metadata
// ============================================================================

#[test]
fn metadata_matches_stored_document() {
    let cluster = TestCluster::new(NodeConfig::default());
    let fixture = cluster.ctx.ready().unwrap();
    let doc = DocumentProcedures::new(fixture.bucket)
        .get("artist:vincent_van_gogh")
        .unwrap()
        .unwrap();
    assert_document_metadata(&fixture.snapshot, &doc.id, doc.expiry, doc.cas, &doc.mutation_token);
}

#[test]
fn metadata_changes_after_rewrite() {
    let cluster = TestCluster::new(NodeConfig::default());
    let fixture = cluster.ctx.ready().unwrap();
    let procs = DocumentProcedures::new(fixture.bucket);
    let before = fixture.snapshot.clone();

    let rewritten = procs
        .upsert(
            "artist:vincent_van_gogh",
            &serde_json::to_string(&record(&WORKS)["mybucket"]).unwrap(),
        )
        .unwrap();

    let err = check_document_metadata(
        &before,
        &rewritten.id,
        rewritten.expiry,
        rewritten.cas,
        &rewritten.mutation_token,
    )
    .unwrap_err();
    assert!(err.starts_with("cas:"), "{}", err);

    let mut token = before.mutation_token_map();
    token.insert("vbucketUUID".into(), json!(0));
    assert!(check_document_metadata(&before, &before.id, before.expiry, before.cas, &token).is_err());
}

#[test]
#[should_panic(expected = "record has no map under `otherbucket`")]
fn record_under_wrong_bucket_panics() {
    assert_record_content(&record(&WORKS), "otherbucket");
}
